mod commands;
mod factory;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "vantage",
    about = "Vantage — multi-chain portfolio & yield scanner.\nDiscovers wallet holdings and DeFi positions, values them in USD, and surfaces better yields.",
    version,
    propagate_version = true
)]
struct Cli {
    #[arg(long, short = 'o', global = true, default_value = "table")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a wallet's portfolio: balances + DeFi positions, valued in USD.
    Portfolio {
        /// Wallet address (0x… or base58).
        address: String,
        /// Comma-separated chain subset (default: all supported).
        #[arg(long, value_delimiter = ',')]
        chains: Option<Vec<String>>,
    },

    /// Analyze a wallet's portfolio for better yields and idle assets.
    Yield {
        /// Wallet address (0x… or base58).
        address: String,
        /// Comma-separated chain subset (default: all supported).
        #[arg(long, value_delimiter = ',')]
        chains: Option<Vec<String>>,
    },

    /// List supported chains and their RPC endpoints.
    Chains,

    /// List registered protocol adapters.
    Protocols,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,vantage_core=info,vantage_cli=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app = factory::build()?;

    match cli.command {
        Commands::Portfolio { address, chains } => {
            commands::portfolio::run(&app, &address, chains, cli.output).await
        }
        Commands::Yield { address, chains } => {
            commands::yield_scan::run(&app, &address, chains, cli.output).await
        }
        Commands::Chains => commands::chains::run(&app, cli.output),
        Commands::Protocols => commands::protocols::run(&app, cli.output),
    }
}
