//! Configuration loading, env substitution, env overrides and validation.
//!
//! Config files: `webp2u.toml`, `webp2u.yaml` or `webp2u.json`.
//! Searched in `./` then `~/.config/webp2u/`.
//!
//! `${ENV_VAR}` references in the raw file text are substituted before
//! parsing, and the `WEBP2U_TOKEN` variable overrides the bot token.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{
        TOKEN_ENV_VAR, apply_env_overrides, config_dir, discover_and_load, find_config_file,
        load_config,
    },
    schema::{FfmpegConfig, MediaConfig, TelegramConfig, Webp2uConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
