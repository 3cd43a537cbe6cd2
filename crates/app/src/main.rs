use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

#[derive(Parser, Debug)]
#[command(name = "einzug", version, about = "Import bank statement CSVs into your budget")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a statement file and upload its transactions.
    Import {
        file: PathBuf,
        /// Filename to use for dialect matching when the file was renamed
        /// in transit.
        #[arg(long)]
        original_name: Option<String>,
        /// Budget id or name (defaults to the configured budget, or the sole
        /// budget on the account).
        #[arg(long)]
        budget: Option<String>,
        /// Account id or name (same resolution as --budget).
        #[arg(long)]
        account: Option<String>,
        /// Parse and print the transactions without uploading.
        #[arg(long)]
        dry_run: bool,
    },
    /// Check that a file is structurally importable, without uploading.
    Check {
        file: PathBuf,
        #[arg(long)]
        original_name: Option<String>,
    },
    /// List the budgets visible to the configured token.
    Budgets,
    /// List the open accounts of a budget.
    Accounts {
        #[arg(long)]
        budget: Option<String>,
    },
    /// List known bank dialects, or show which one a filename resolves to.
    Dialects {
        #[arg(long, value_name = "FILENAME")]
        matches: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let config = config::Config::load()?;

    match cli.command {
        Command::Import { file, original_name, budget, account, dry_run } => {
            commands::import(&config, &file, original_name.as_deref(), budget, account, dry_run)
                .await
        }
        Command::Check { file, original_name } => {
            commands::check(&config, &file, original_name.as_deref())
        }
        Command::Budgets => commands::budgets(&config).await,
        Command::Accounts { budget } => commands::accounts(&config, budget).await,
        Command::Dialects { matches } => commands::dialects(&config, matches.as_deref()),
    }
}
