// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PWS Gateway - HTTP endpoint for personal weather stations
//!
//! Accepts uploads in the Wunderground PWS protocol, converts units, logs
//! each reading to a per-device JSON file, relays the raw request upstream
//! and mirrors the readings into FHEM.
//!
//! # Usage
//!
//! ```bash
//! # Write an example configuration
//! pws-gateway gen-config --output pws.toml
//!
//! # Check it
//! pws-gateway validate --config pws.toml
//!
//! # Serve on port 8080
//! pws-gateway --config pws.toml --port 8080
//! ```
//!
//! # Endpoints
//!
//! - `GET /weatherstation/updateweatherstation.php` - Station upload (always `success`)
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/info` - Gateway info

mod handlers;
mod routes;

use axum::Router;
use clap::{Parser, Subcommand};
use pws_core::{IngestPipeline, Settings};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Default upload path used by station firmware.
pub const DEFAULT_INGEST_PATH: &str = "/weatherstation/updateweatherstation.php";

/// PWS upload gateway
#[derive(Parser, Debug)]
#[command(name = "pws-gateway")]
#[command(about = "PWS upload gateway - JSON log, upstream relay and FHEM sync")]
#[command(version)]
struct Args {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP server port
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// Upload path stations are configured with
    #[arg(long, default_value = DEFAULT_INGEST_PATH)]
    ingest_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "pws.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Shared application state
pub struct AppState {
    pipeline: IngestPipeline,
    ingest_path: String,
}

impl AppState {
    fn new(pipeline: IngestPipeline, ingest_path: String) -> Self {
        Self {
            pipeline,
            ingest_path,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Some(cmd) = args.command {
        return match cmd {
            Commands::GenConfig { output } => cmd_gen_config(output),
            Commands::Validate { config } => cmd_validate(config),
        };
    }

    let settings = load_settings(args.config.as_ref())?;
    let stages = settings.enabled_stages();
    let pipeline = IngestPipeline::new(Arc::new(settings))?;
    let state = Arc::new(AppState::new(pipeline, args.ingest_path.clone()));

    let app = build_router(state);

    let addr = format!("{}:{}", args.bind, args.port);
    info!("PWS Gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("HTTP server: http://{}{}", addr, args.ingest_path);
    info!("Stages: {}", stages.join(", "));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings, pws_core::ConfigError> {
    match path {
        Some(path) => Settings::from_file(path),
        None => {
            let settings = Settings::default();
            settings.validate()?;
            Ok(settings)
        }
    }
}

fn build_router(state: Arc<AppState>) -> Router {
    routes::api_routes()
        .merge(routes::ingest_routes(&state.ingest_path))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn example_settings() -> Settings {
    Settings {
        forward_server: "rtupdate.wunderground.com".into(),
        ..Default::default()
    }
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let toml_str = toml::to_string_pretty(&example_settings())?;

    let content = format!(
        r#"# PWS Gateway Configuration
# Generated by pws-gateway gen-config

{}
"#,
        toml_str
    );

    std::fs::write(&output, content)?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    match Settings::from_file(&config_path) {
        Ok(settings) => {
            println!("Configuration valid!");
            println!();
            println!("Device:  {}", settings.device);
            println!("Stages:  {}", settings.enabled_stages().join(", "));
            if settings.json_data_log {
                println!("Log dir: {}", settings.json_data_logdir.display());
            }
            if settings.forward_data {
                println!("Relay:   http://{}", settings.forward_server);
            }
            if settings.fhem_data_log {
                println!("FHEM:    {}:{}", settings.fhem_server, settings.fhem_port);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_settings_are_valid() {
        let settings = example_settings();
        assert!(settings.validate().is_ok());

        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed = Settings::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_gen_config_then_validate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pws.toml");
        cmd_gen_config(path.clone()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# PWS Gateway Configuration"));
        assert!(Settings::from_file(&path).is_ok());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["pws-gateway", "--config", "pws.toml", "--port", "9000"]);
        assert_eq!(args.port, 9000);
        assert_eq!(args.ingest_path, DEFAULT_INGEST_PATH);
        assert_eq!(args.config, Some(PathBuf::from("pws.toml")));

        let args = Args::parse_from(["pws-gateway", "validate", "--config", "x.toml"]);
        assert!(matches!(args.command, Some(Commands::Validate { .. })));
    }

    #[test]
    fn test_default_settings_need_forward_server() {
        assert!(load_settings(None).is_err());
    }
}
