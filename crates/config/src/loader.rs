use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    Error, Result,
    env_subst::substitute_env,
    schema::Webp2uConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["webp2u.toml", "webp2u.yaml", "webp2u.yml", "webp2u.json"];

/// Environment variable carrying the bot token.
pub const TOKEN_ENV_VAR: &str = "WEBP2U_TOKEN";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<Webp2uConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./webp2u.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/webp2u/webp2u.{toml,yaml,yml,json}` (user-global)
///
/// Returns `Webp2uConfig::default()` if no config file is found or the one
/// found cannot be loaded.
pub fn discover_and_load() -> Webp2uConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    Webp2uConfig::default()
}

/// Apply process environment overrides on top of a loaded config.
pub fn apply_env_overrides(config: &mut Webp2uConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut Webp2uConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(token) = lookup(TOKEN_ENV_VAR).filter(|t| !t.trim().is_empty()) {
        debug!(var = TOKEN_ENV_VAR, "bot token taken from environment");
        config.telegram.token = Secret::new(token);
    }
}

/// First existing config file in the standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/webp2u/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "webp2u").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> Result<Webp2uConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        other => Err(Error::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}
