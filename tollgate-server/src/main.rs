//! Tollgate license server and administration CLI.
//!
//! Usage:
//!   tollgate --config tollgate.toml serve --port 4100
//!   tollgate generate license.json
//!   tollgate key upload key.json
//!
//! Every command reads the same configuration file. Administrative commands
//! work directly against the configured store and print JSON on stdout.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tollgate_license::LicenseService;
use tollgate_server::{build_router, build_service, AppState, ServerConfig};
use tollgate_types::{KeySpec, LicenseDraft};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "tollgate", version)]
#[command(about = "License token server and key vault")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "tollgate.toml")]
    config: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Port to listen on, overriding the configuration
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Sign and store a license described by a JSON file
    Generate { file: PathBuf },
    /// Show a stored license
    Get(Lookup),
    /// Mark a license active
    Activate { id: String },
    /// Mark a license inactive
    Inactivate { id: String },
    /// Delete a license
    Delete { id: String },
    /// Verify a license token
    Verify { token: String },
    /// Manage signing keys
    #[command(subcommand)]
    Key(KeyCommand),
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct Lookup {
    /// License id
    #[arg(long)]
    id: Option<String>,

    /// License token
    #[arg(long)]
    token: Option<String>,
}

#[derive(Subcommand, Debug)]
enum KeyCommand {
    /// Register the key described by a JSON file
    Upload { file: PathBuf },
    /// List stored keys
    List,
    /// Delete a stored key
    Delete { id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ServerConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let service = build_service(&config)
        .await
        .context("opening the license store")?;

    match cli.command {
        Command::Serve { port } => serve(&config, service, port).await,
        Command::Generate { file } => {
            let draft: LicenseDraft = read_json(&file).await?;
            print_json(&service.generate(&draft).await?)
        }
        Command::Get(Lookup { id, token }) => {
            let license = match (id, token) {
                (Some(id), _) => service.get(&id).await?,
                (None, Some(token)) => service.get_by_token(&token).await?,
                (None, None) => anyhow::bail!("either --id or --token is required"),
            };
            print_json(&license)
        }
        Command::Activate { id } => {
            service.activate(&id).await?;
            print_json(&serde_json::json!({ "message": "Activated" }))
        }
        Command::Inactivate { id } => {
            service.inactivate(&id).await?;
            print_json(&serde_json::json!({ "message": "Inactivated" }))
        }
        Command::Delete { id } => {
            service.delete(&id).await?;
            print_json(&serde_json::json!({ "message": "Deleted" }))
        }
        Command::Verify { token } => {
            let verdict = service.verify_token(&token).await?;
            print_json(&verdict)?;
            if !verdict.valid {
                anyhow::bail!(
                    "license is not valid: {}",
                    verdict.reason.unwrap_or_default()
                );
            }
            Ok(())
        }
        Command::Key(command) => run_key(&service, command).await,
    }
}

async fn run_key(service: &LicenseService, command: KeyCommand) -> Result<()> {
    let vault = service.vault();
    match command {
        KeyCommand::Upload { file } => {
            let spec: KeySpec = read_json(&file).await?;
            let id = vault.upload(&spec).await?;
            print_json(&serde_json::json!({ "id": id }))
        }
        KeyCommand::List => print_json(&vault.list().await?),
        KeyCommand::Delete { id } => {
            vault.delete(&id).await?;
            print_json(&serde_json::json!({ "message": "Deleted" }))
        }
    }
}

async fn serve(config: &ServerConfig, service: LicenseService, port: Option<u16>) -> Result<()> {
    let state = AppState::new(service, config.control_secret()?);
    let port = port.unwrap_or(config.port);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!("Tollgate listening on {}", addr);
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    info!("Tollgate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
