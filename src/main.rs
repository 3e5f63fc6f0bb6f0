#![forbid(unsafe_code)]

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use client_status_dashboard::access::Credentials;
use client_status_dashboard::config::AppConfig;
use client_status_dashboard::init_tracing;
use client_status_dashboard::models::UpdateDateRequest;
use client_status_dashboard::service::DashboardService;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "client-status")]
#[command(about = "Client SRA/NVA project status backed by ClickUp")]
struct Cli {
    /// Dotenv file consulted after the process environment.
    #[arg(long, global = true, default_value = ".env")]
    env_file: PathBuf,
    /// Admin API key, when one is configured.
    #[arg(long, global = true, default_value = "")]
    key: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull every task in the configured list into the local store.
    Sync,
    /// Render one client's dashboard as JSON.
    Dashboard {
        sf_id: String,
        #[arg(long)]
        sig: String,
        /// Include admin edit metadata.
        #[arg(long, default_value_t = false)]
        admin: bool,
        /// Evaluate statuses as of this `YYYY-MM-DD` date instead of today.
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Print the signed status link for a client.
    Link { sf_id: String },
    /// Admin portfolio of all stored projects.
    Projects {
        #[arg(long, default_value_t = false)]
        refresh: bool,
    },
    /// Edit a date: a field-mapped metric key or `override:<slug>.ecd`.
    SetDate {
        sf_id: String,
        #[arg(long)]
        sig: String,
        #[arg(long, default_value = "")]
        metric_key: String,
        #[arg(long, default_value = "")]
        override_key: String,
        /// `YYYY-MM-DD`, empty to clear.
        #[arg(long, default_value = "")]
        value: String,
    },
    /// Process a ClickUp webhook payload read from a file or `-` for stdin.
    Webhook {
        #[arg(long, default_value = "")]
        token: String,
        payload: PathBuf,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_payload(path: &Path) -> anyhow::Result<serde_json::Value> {
    let raw = if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    // Unparseable bodies are treated as empty payloads.
    Ok(serde_json::from_str(&raw).unwrap_or_else(|_| serde_json::json!({})))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env_file(&cli.env_file).context("loading configuration")?;
    init_tracing(&config.log_dir).context("initializing logging")?;
    let service = DashboardService::from_config(config)?;

    match cli.command {
        Commands::Sync => {
            let synced = service.manual_sync(&cli.key).await?;
            print_json(&serde_json::json!({ "ok": true, "synced_clients": synced }))
        }
        Commands::Dashboard {
            sf_id,
            sig,
            admin,
            today,
        } => {
            let credentials = if admin {
                Credentials::admin(&sig, &cli.key)
            } else {
                Credentials {
                    admin_key: cli.key.clone(),
                    ..Credentials::client(&sig)
                }
            };
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            let view = service.client_dashboard(&sf_id, &credentials, today).await?;
            print_json(&view)
        }
        Commands::Link { sf_id } => print_json(&service.signed_link(&cli.key, &sf_id)?),
        Commands::Projects { refresh } => print_json(&service.portfolio(&cli.key, refresh).await?),
        Commands::SetDate {
            sf_id,
            sig,
            metric_key,
            override_key,
            value,
        } => {
            let request = UpdateDateRequest {
                metric_key,
                override_key,
                value,
            };
            let edit_id = service
                .update_date(&sf_id, &Credentials::admin(&sig, &cli.key), &request)
                .await?;
            print_json(&serde_json::json!({ "ok": true, "edit_id": edit_id }))
        }
        Commands::Webhook { token, payload } => {
            let payload = read_payload(&payload)?;
            print_json(&service.handle_webhook(&token, &payload).await?)
        }
    }
}
