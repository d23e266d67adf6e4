//! CLI parser and dispatch.

mod config_cmd;
mod harvest;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use photoharvest::config::HarvestConfig;
use photoharvest::harvest::PhotoCategory;

#[derive(Parser)]
#[command(name = "photoharvest")]
#[command(about = "Harvest photos from lazily rendered listing pages")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to ./photoharvest.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest photos from one or more listings and print them as JSON
    Harvest {
        /// Listing ids to harvest
        #[arg(required = true)]
        ids: Vec<String>,
        /// Photo categories to harvest (default: all)
        #[arg(long = "category", value_delimiter = ',')]
        categories: Vec<PhotoCategory>,
        /// Directory downloaded photos are written to (overrides config)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Account to sign in with before harvesting
        #[arg(long, env = "PHOTOHARVEST_USERNAME")]
        username: Option<String>,
        /// Password for --username
        #[arg(long, env = "PHOTOHARVEST_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Do not store the signed-in session for later runs
        #[arg(long)]
        no_remember: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = HarvestConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Harvest {
            ids,
            categories,
            out,
            username,
            password,
            no_remember,
        } => {
            let credentials = match (username, password) {
                (Some(username), Some(password)) => Some(photoharvest::session::Credentials {
                    username,
                    password,
                }),
                (None, None) => None,
                _ => anyhow::bail!("--username and --password must be given together"),
            };
            let options = harvest::HarvestOptions {
                ids,
                categories: if categories.is_empty() {
                    PhotoCategory::ALL.to_vec()
                } else {
                    categories
                },
                out_dir: out.unwrap_or_else(|| config.output.photos_dir.clone()),
                credentials,
                remember: !no_remember,
            };
            harvest::cmd_harvest(&config, options).await
        }
        Commands::Config => config_cmd::cmd_config_show(&config),
    }
}
