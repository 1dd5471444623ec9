use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod config;
mod error;
mod fieldtype;
mod finder;
mod index;
mod query;
mod schema;
mod selector;

use config::Config;

#[derive(Parser)]
#[command(name = "pf")]
#[command(author, version, about = "pagefinder - query a page tree with selectors")]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Path to schema.yaml
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new site (schema.yaml and pages.db)
    Init {
        /// Directory to create the site in
        path: PathBuf,
    },

    /// Import templates and pages from a YAML file
    Seed {
        /// Seed file
        file: PathBuf,
    },

    /// Find pages matching a selector
    Find {
        /// Selector, e.g. "template=product, price>100, sort=-created"
        selector: String,

        /// Return at most one page (hidden pages included)
        #[arg(long)]
        one: bool,

        /// Do not filter by status
        #[arg(long)]
        all_status: bool,

        /// Page number used when the selector has a limit but no start
        #[arg(long)]
        page: Option<i64>,

        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the SQL a selector compiles to
    Explain {
        selector: String,

        /// Compile as a single-page lookup
        #[arg(long)]
        one: bool,
    },

    /// Show database statistics
    Stats,

    /// Create the default config file and print its path
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let default_level = config.log_level.clone().unwrap_or_else(|| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let db_path = config.database_path(cli.db);
    let schema_path = config.schema_path(cli.schema);

    match cli.command {
        Commands::Init { path } => cli::commands::init(&path),
        Commands::Seed { file } => cli::commands::seed(&db_path, &schema_path, &file),
        Commands::Find {
            selector,
            one,
            all_status,
            page,
            json,
        } => {
            let args = cli::commands::FindArgs {
                one,
                all_status,
                page,
                json,
            };
            cli::commands::find(&db_path, &schema_path, &config, &selector, &args)
        }
        Commands::Explain { selector, one } => {
            cli::commands::explain(&db_path, &schema_path, &config, &selector, one)
        }
        Commands::Stats => cli::commands::stats(&db_path, &schema_path),
        Commands::Config => {
            let path = Config::create_default()?;
            println!("Config: {}", path.display());
            Ok(())
        }
    }
}
