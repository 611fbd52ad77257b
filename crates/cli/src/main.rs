mod config_commands;
mod convert_commands;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
    webp2u_config::{TOKEN_ENV_VAR, Webp2uConfig},
    webp2u_media::{FfmpegEngine, Pipeline},
};

#[derive(Parser)]
#[command(name = "webp2u", about = "webp2u: webp/webm links re-posted as photos and videos")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and ~/.config/webp2u/).
    #[arg(long, global = true, env = "WEBP2U_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Telegram bot (default when no subcommand is provided).
    Run,
    /// Convert links locally and write the results to a directory.
    Convert(convert_commands::ConvertArgs),
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Explicit `--config` errors propagate; a discovered file that fails to
/// load falls back to defaults. Environment overrides apply either way.
fn load_config(cli: &Cli) -> anyhow::Result<(Webp2uConfig, Option<PathBuf>)> {
    let (mut config, source) = match &cli.config {
        Some(path) => (webp2u_config::load_config(path)?, Some(path.clone())),
        None => (
            webp2u_config::discover_and_load(),
            webp2u_config::find_config_file(),
        ),
    };
    webp2u_config::apply_env_overrides(&mut config);
    Ok((config, source))
}

async fn run_bot(config: Webp2uConfig) -> anyhow::Result<()> {
    if !config.telegram.has_token() {
        anyhow::bail!("no bot token configured: set {TOKEN_ENV_VAR} or telegram.token");
    }
    if webp2u_config::validate(&config).has_errors() {
        anyhow::bail!("invalid configuration, run `webp2u config check` for details");
    }
    if !FfmpegEngine::from_config(&config.media.ffmpeg).is_available() {
        warn!("ffmpeg not found, video links will fail to convert");
    }

    let pipeline = Arc::new(Pipeline::from_config(&config.media)?);
    let (cancel, polling) = webp2u_telegram::start_polling(config.telegram, pipeline)
        .await
        .context("failed to connect to telegram")?;

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("shutting down");
            cancel.cancel();
        },
        () = cancel.cancelled() => {},
    }

    polling.await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "webp2u starting");

    let (config, source) = load_config(&cli)?;

    match cli.command {
        None | Some(Commands::Run) => run_bot(config).await,
        Some(Commands::Convert(args)) => {
            convert_commands::handle_convert(args, &config.media).await
        },
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, &config, source.as_deref())
        },
    }
}
