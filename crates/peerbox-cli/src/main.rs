//! Peerbox CLI
//!
//! Command-line interface for provisioning IXP peering sessions from
//! PeeringDB data into NetBox.
//!
//! # Usage
//!
//! ```bash
//! peerbox profile 64511
//! peerbox common 64511
//! peerbox provision 64511
//! peerbox config set netbox_url https://netbox.example.net
//! ```

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod render;
mod term;

#[derive(Parser)]
#[command(name = "peerbox")]
#[command(version = "0.1.0")]
#[command(about = "IXP peering provisioning from PeeringDB into NetBox", long_about = None)]
struct Cli {
    /// NetBox instance URL
    #[arg(long, env = "NETBOX_URL")]
    netbox_url: Option<String>,

    /// NetBox API token
    #[arg(long, env = "NETBOX_TOKEN")]
    netbox_token: Option<String>,

    /// PeeringDB API key; anonymous access without it
    #[arg(long, env = "PEERINGDB_API_KEY")]
    peeringdb_key: Option<String>,

    /// The operator's own AS number
    #[arg(long, env = "PEERBOX_OPERATOR_ASN")]
    operator_asn: Option<u32>,

    /// BGP peer group new sessions attach to
    #[arg(long, env = "PEERBOX_PEER_GROUP")]
    peer_group: Option<String>,

    /// Profile name from config file
    #[arg(long, short)]
    profile: Option<String>,

    /// Log progress details to stderr
    #[arg(long, short)]
    verbose: bool,

    /// Log wire-level details to stderr
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the registry profile of an ASN
    Profile { asn: u32 },
    /// List exchanges shared with a peer ASN
    Common { asn: u32 },
    /// Provision peering sessions with a peer ASN
    Provision { asn: u32 },
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set configuration value
    Set { key: String, value: String },
    /// Get configuration value
    Get { key: String },
    /// List all configuration
    List,
    /// Initialize configuration
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let file = config::Config::load(cli.profile.as_deref()).unwrap_or_default();
    let settings = commands::Settings::new(
        cli.netbox_url.or(file.netbox_url),
        cli.netbox_token.or(file.netbox_token),
        cli.peeringdb_key.or(file.peeringdb_api_key),
        cli.operator_asn.or(file.operator_asn),
        cli.peer_group.or(file.peer_group),
    );

    let result = match cli.command {
        Commands::Profile { asn } => commands::profile::handle(asn, &settings).await.map(|_| 0),
        Commands::Common { asn } => commands::common::handle(asn, &settings).await.map(|_| 0),
        Commands::Provision { asn } => commands::provision::handle(asn, &settings).await,
        Commands::Config { action } => commands::config::handle(action).await.map(|_| 0),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
