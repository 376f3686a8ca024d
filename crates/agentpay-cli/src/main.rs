//! AgentPay CLI - Session keys, policies and paid HTTP from the terminal
//!
//! # Quick Start
//!
//! ```bash
//! # Issue a session key for Base, valid for 24 hours
//! agentpay session generate --chain-id 8453 --duration 24h
//!
//! # Check a policy document before storing it
//! agentpay policy validate ./policy.json --encode
//!
//! # Fetch a resource, paying a 402 with the session key
//! AGENTPAY_SESSION_KEY=... AGENTPAY_MAX_PER_PERIOD=1000000 agentpay fetch https://api.example.com/report
//! ```

use std::time::Duration;

use clap::{Parser, Subcommand};

mod commands;
mod display;

use commands::{fetch, policy, session};

/// AgentPay CLI - Delegated payments for AI agents
#[derive(Parser)]
#[command(name = "agentpay")]
#[command(author = "AgentPay Contributors")]
#[command(version)]
#[command(about = "Session keys, spending policies and x402 payments for AI agents", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue and inspect session keys
    Session {
        #[command(subcommand)]
        action: SessionCommands,
    },

    /// Work with policy documents
    Policy {
        #[command(subcommand)]
        action: PolicyCommands,
    },

    /// Fetch a URL, paying HTTP 402 responses with a session key
    Fetch {
        /// Target URL
        url: String,

        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Request body
        #[arg(short, long)]
        data: Option<String>,

        /// Extra request header, `name: value`
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Serialized session key (hex)
        #[arg(long, env = "AGENTPAY_SESSION_KEY", hide_env_values = true)]
        key: String,

        /// Report the 402 instead of paying it
        #[arg(long)]
        no_pay: bool,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Generate a new session key
    Generate {
        /// Chain the key is bound to (defaults to AGENTPAY_CHAIN_ID or 8453)
        #[arg(long)]
        chain_id: Option<u64>,

        /// Validity from now, e.g. `30m`, `24h`, `7days`
        #[arg(long, value_parser = humantime_serde::re::humantime::parse_duration)]
        duration: Option<Duration>,
    },

    /// Decode a serialized key and check whether it can sign now
    Inspect {
        /// Serialized session key (hex)
        #[arg(env = "AGENTPAY_SESSION_KEY", hide_env_values = true)]
        key: String,
    },
}

#[derive(Subcommand)]
enum PolicyCommands {
    /// Parse and validate a JSON policy document
    Validate {
        /// Path to the policy file
        file: String,

        /// Also print the ABI encoding
        #[arg(long)]
        encode: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = agentpay_sdk::AgentPayConfig::from_env()?;

    match cli.command {
        Commands::Session { action } => match action {
            SessionCommands::Generate { chain_id, duration } => {
                session::generate(
                    chain_id.unwrap_or(config.chain_id),
                    duration.unwrap_or(config.session_duration),
                )?;
            }
            SessionCommands::Inspect { key } => {
                session::inspect(&key)?;
            }
        },

        Commands::Policy { action } => match action {
            PolicyCommands::Validate { file, encode } => {
                policy::validate_file(&file, encode)?;
            }
        },

        Commands::Fetch {
            url,
            method,
            data,
            headers,
            key,
            no_pay,
        } => {
            agentpay_sdk::init_tracing(&config.logging)?;
            let request = fetch::FetchRequest {
                url,
                method,
                body: data,
                headers,
            };
            fetch::run(&config, request, &key, !no_pay).await?;
        }
    }

    Ok(())
}
