use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use sitefeed_common::observability::{LogConfig, LogFormat, init_logging};
use sitefeed_config::{LogSettings, SitefeedConfig, SitefeedConfigLoader};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "sitefeed")]
#[command(about = "GitHub activity feed ingestion and HTML sanitizing")]
#[command(version)]
struct Cli {
    /// Configuration file path (optional; env wins)
    #[arg(short, long, default_value = "sitefeed.yaml", env = "SITEFEED_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch, filter and print the validated feed
    Fetch {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Sanitize an HTML fragment read from stdin
    Sanitize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins)
    let cfg: SitefeedConfig = SitefeedConfigLoader::new()
        .with_optional_file(&cli.config)
        .load()?;

    // 2) Logging from the `log` section
    let log_path = init_logging(log_config(&cfg.log)?)?;
    tracing::debug!(path = %log_path.display(), "app.logging.ready");

    match cli.command {
        Command::Fetch { format } => commands::fetch(cfg.feed, format).await,
        Command::Sanitize => commands::sanitize_stdin(),
    }
}

fn log_config(settings: &LogSettings) -> Result<LogConfig> {
    let format: LogFormat = settings.format.parse().map_err(anyhow::Error::msg)?;
    Ok(LogConfig {
        log_dir: settings.dir.as_ref().map(PathBuf::from),
        emit_stderr: settings.stderr,
        format,
        default_filter: settings.filter.clone(),
        ..LogConfig::default()
    })
}
