//! Startup orchestration.
//!
//! # Responsibilities
//! - Parse command line flags
//! - Load and validate configuration, then apply flag overrides
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Flags win over the config file, the file wins over defaults
//! - Overrides are validated again, so a bad flag fails like a bad file

use std::path::PathBuf;

use clap::Parser;

use crate::config::validation::validate_config;
use crate::config::{load_config, ConfigError, ServerConfig};

/// Command line flags of the relay binary.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "notice-relay")]
#[command(about = "Accepts TCP requests, raises them as notifications and echoes them back")]
pub struct StartupArgs {
    /// TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Port to listen on.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// IPv4 address to bind.
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Build the effective configuration from `args`.
pub fn resolve_config(args: &StartupArgs) -> Result<ServerConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    apply_overrides(&mut config, args);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn apply_overrides(config: &mut ServerConfig, args: &StartupArgs) {
    if let Some(port) = args.port {
        config.listener.port = port;
    }
    if let Some(bind) = &args.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(level) = &args.log_level {
        config.observability.log_level = level.clone();
    }
}
