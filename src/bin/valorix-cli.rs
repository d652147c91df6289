use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use valorix_api::config::loader::hydrate_env_file;
use valorix_api::{DerivedConfig, Settings};

#[derive(Parser)]
#[command(name = "valorix-cli")]
#[command(about = "Operator CLI for the Valorix evaluation API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved settings and derived mappings (secrets redacted)
    Config {
        /// Env file to load instead of ./.env
        #[arg(long)]
        env_file: Option<PathBuf>,
    },
    /// Query a running instance's health endpoint
    Health {
        #[arg(short, long, default_value = "http://localhost:8000")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config { env_file } => {
            hydrate_env_file(env_file.as_deref())?;
            let settings = Settings::from_vars(std::env::vars())?;
            let report = json!({
                "settings": settings,
                "derived": DerivedConfig::from_settings(&settings),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Health { url } => check_health(&url).await?,
    }

    Ok(())
}

/// Fails when the instance does not answer `/health` with a success status.
async fn check_health(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let res = reqwest::get(format!("{}/health", url.trim_end_matches('/'))).await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Err(format!("API returned status {}", status).into());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
