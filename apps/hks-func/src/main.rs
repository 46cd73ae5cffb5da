//! `hks-func`: CLI for Hexabase serverless functions.
//!
//! Thin wrapper over the control-plane HTTP API. Scope (organization,
//! workspace, project) and credentials come from the environment so scripts
//! and CI stay flag-free:
//!
//! ```text
//! HKS_API_URL   control plane base URL (default http://localhost:8080)
//! HKS_TOKEN     bearer access token
//! HKS_ORG       organization id
//! HKS_WORKSPACE workspace id
//! HKS_PROJECT   project id
//! ```

mod client;

use clap::{Parser, Subcommand};
use client::{ApiClient, Scope};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "hks-func", about = "Manage Hexabase serverless functions", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List functions in the current project
    List,
    /// Show one function
    Get { function_id: Uuid },
    /// Create a function from a spec file (JSON)
    Create {
        /// Path to a JSON function spec
        spec: std::path::PathBuf,
    },
    /// Delete a function
    Delete { function_id: Uuid },
    /// Deploy a new version from a source file
    Deploy {
        function_id: Uuid,
        /// Path to the source code file
        source: std::path::PathBuf,
    },
    /// Invoke a function synchronously with a JSON payload
    Invoke {
        function_id: Uuid,
        /// Inline JSON payload (defaults to null)
        #[arg(long)]
        payload: Option<String>,
    },
    /// Tail recent logs
    Logs {
        function_id: Uuid,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// Roll the active version back to its predecessor
    Rollback { function_id: Uuid },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let scope = Scope::from_env()?;
    let client = ApiClient::new(scope)?;

    match cli.command {
        Command::List => {
            let functions = client.list_functions().await?;
            println!("{}", serde_json::to_string_pretty(&functions)?);
        }
        Command::Get { function_id } => {
            let function = client.get_function(function_id).await?;
            println!("{}", serde_json::to_string_pretty(&function)?);
        }
        Command::Create { spec } => {
            let raw = std::fs::read_to_string(&spec)?;
            let spec: serde_json::Value = serde_json::from_str(&raw)?;
            let function = client.create_function(spec).await?;
            println!("{}", serde_json::to_string_pretty(&function)?);
        }
        Command::Delete { function_id } => {
            client.delete_function(function_id).await?;
            eprintln!("deleted {function_id}");
        }
        Command::Deploy { function_id, source } => {
            let source_code = std::fs::read_to_string(&source)?;
            let version = client.deploy_version(function_id, source_code).await?;
            println!("{}", serde_json::to_string_pretty(&version)?);
        }
        Command::Invoke { function_id, payload } => {
            let payload = match payload {
                Some(raw) => serde_json::from_str(&raw)?,
                None => serde_json::Value::Null,
            };
            let response = client.invoke(function_id, payload).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Logs { function_id, limit } => {
            let logs = client.logs(function_id, limit).await?;
            for entry in logs {
                println!(
                    "{} {}",
                    entry["timestamp"].as_str().unwrap_or_default(),
                    entry["message"].as_str().unwrap_or_default()
                );
            }
        }
        Command::Rollback { function_id } => {
            let function = client.rollback(function_id).await?;
            println!("{}", serde_json::to_string_pretty(&function)?);
        }
    }

    Ok(())
}
