// lpad/src/main.rs
use std::fs;
use std::process;

use clap::Parser;
use colored::Colorize;
use lpad_common::config::Config;
use lpad_common::error::{ErrorCategory, LpadError, Result as LpadResult};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

mod cli;
mod ui;

use cli::CliArgs;

#[tokio::main]
async fn main() -> LpadResult<()> {
    let cli_args = CliArgs::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: Could not load launcher configuration: {}", "Error".red().bold(), e);
            eprintln!(
                "{} Put a launcher.toml with version_url and archive_url next to the launcher, or set LPAD_VERSION_URL and LPAD_ARCHIVE_URL.",
                "Hint:".yellow()
            );
            process::exit(2);
        }
    };

    init_logging(&config, cli_args.verbose);

    let command = cli_args.command.unwrap_or_default();
    debug!("Running command {:?} from {}", command, config.launcher_dir.display());

    if let Err(e) = command.run(&config).await {
        error!("Command failed: {:#}", e);
        report_error(&e, &config);
        process::exit(1);
    }

    debug!("Command completed successfully.");
    Ok(())
}

fn init_logging(config: &Config, verbose: u8) {
    let level_filter = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let max_log_level = level_filter.into_level().unwrap_or(tracing::Level::INFO);

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("LPAD_LOG")
        .from_env_lossy();

    if verbose == 0 {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .without_time()
            .try_init();
        return;
    }

    let log_dir = config.logs_dir();
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!(
            "{} Failed to create log directory {}: {}",
            "Warning:".yellow(),
            log_dir.display(),
            e
        );
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .without_time()
            .try_init();
        return;
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, "lpad.log");
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);
    let stderr_writer = std::io::stderr.with_max_level(max_log_level);
    let file_writer = non_blocking_appender.with_max_level(max_log_level);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(stderr_writer.and(file_writer))
        .with_ansi(true)
        .without_time()
        .try_init();

    // Flushes on drop; must outlive every log call.
    Box::leak(Box::new(guard));

    debug!(
        "Verbose logging enabled. Writing logs to: {}/lpad.log",
        log_dir.display()
    );
}

fn report_error(e: &LpadError, config: &Config) {
    eprintln!("{}: {}", "Error".red().bold(), e);
    let hint = match (e, e.category()) {
        (LpadError::Cancelled, _) => None,
        (LpadError::ExecutableMissing(_), _) => {
            Some("Run `lpad update` to reinstall the application.".to_string())
        }
        (_, ErrorCategory::Network) => {
            Some("Check your internet connection, then run the launcher again.".to_string())
        }
        (_, ErrorCategory::Permission) => Some(
            "Pick a folder you can write to with `lpad location set <dir>`.".to_string(),
        ),
        (_, ErrorCategory::Install) => {
            Some("Run `lpad update` to retry the installation.".to_string())
        }
        (_, ErrorCategory::Configuration) => Some(format!(
            "Check launcher.toml in {}.",
            config.launcher_dir.display()
        )),
        (_, ErrorCategory::Launch) | (_, ErrorCategory::Internal) => None,
    };
    if let Some(hint) = hint {
        eprintln!("{} {}", "Hint:".yellow(), hint);
    }
}
