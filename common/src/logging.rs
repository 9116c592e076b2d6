use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::str::FromStr;

/// Overrides `logging.output` when set.
pub const LOG_ENV_VAR: &str = "TASKQ_LOG";

pub fn setup_logging(config: &LoggingConfig) -> Result<()> {
    let level = log::LevelFilter::from_str(&config.level)
        .with_context(|| format!("Invalid log level: {}", config.level))?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d][%H:%M:%S"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    let output = std::env::var_os(LOG_ENV_VAR)
        .map(Into::into)
        .or_else(|| config.output.clone());
    if let Some(path) = output {
        dispatch = dispatch.chain(
            fern::log_file(&path).with_context(|| format!("Failed to open log file: {:?}", path))?,
        );
    }

    dispatch.apply()?;
    Ok(())
}
