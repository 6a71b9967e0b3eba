use std::sync::Arc;

use clap::{Parser, Subcommand};

use chalkline_core::config::Config;
use chalkline_relay::RelayState;
use chalkline_relay::access::AllowAll;

#[derive(Parser)]
#[command(
    name = "chalkline",
    about = "Real-time session relay for collaborative whiteboards",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Port to listen on (default: 7180)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default config file if none exists
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config
    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(Config::config_path);
    let config = Config::load(&config_path)?;

    // Initialize logging: RUST_LOG wins, otherwise --verbose or the config file
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.log_level()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
    tracing::debug!(config = %config_path.display(), "Configuration loaded");

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or_else(|| config.server_port());
            let state = Arc::new(RelayState::new(Arc::new(config), Arc::new(AllowAll)));
            chalkline_relay::start_relay(state, port).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::Init => {
                if config_path.exists() {
                    println!("Config already exists at {}", config_path.display());
                } else {
                    if let Some(parent) = config_path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    Config::default().save(&config_path)?;
                    println!("Wrote default config to {}", config_path.display());
                }
            }
        },
    }

    Ok(())
}
