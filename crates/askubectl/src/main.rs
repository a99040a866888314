//! Askube control - CLI client for the askubed daemon.

mod client;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;

use client::DaemonClient;

#[derive(Parser)]
#[command(name = "askubectl")]
#[command(about = "Ask questions about your Kubernetes cluster", long_about = None)]
#[command(version)]
struct Cli {
    /// Daemon base URL
    #[arg(long, default_value = "http://127.0.0.1:7870")]
    daemon: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a natural-language question about the cluster
    Ask {
        /// The question; quoting is optional
        question: Vec<String>,
    },

    /// List namespaces via the daemon's connection check
    Namespaces,

    /// Show daemon health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = DaemonClient::new(cli.daemon);

    match cli.command {
        Commands::Ask { question } => {
            let question = question.join(" ");
            if question.trim().is_empty() {
                bail!("no question provided");
            }
            let response = client.ask(&question).await?;
            println!("{}", response.answer);
        }
        Commands::Namespaces => {
            let namespaces = client.namespaces().await?;
            for namespace in namespaces {
                println!("{}", namespace);
            }
        }
        Commands::Health => {
            let health = client.health().await?;
            println!(
                "{} v{}, up {}s",
                health.status.green(),
                health.version,
                health.uptime_seconds
            );
        }
    }

    Ok(())
}
