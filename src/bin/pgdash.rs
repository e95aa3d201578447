//! pgdash command-line entry point.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;

use pgdash::commands;
use pgdash::config::Config;
use pgdash::migrate::MigrationDir;

#[derive(Parser)]
#[command(name = "pgdash", version, about = "PostgreSQL migration admin backend")]
struct Cli {
    /// Config file (defaults to ./pgdash.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database connection URL
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Directory holding migration .sql files
    #[arg(long, env = "PGDASH_MIGRATIONS_DIR", global = true)]
    migrations_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP admin API
    Serve {
        #[arg(long, env = "PGDASH_HOST")]
        host: Option<String>,
        #[arg(short, long, env = "PGDASH_PORT")]
        port: Option<u16>,
        /// Comma-separated allowed CORS origins
        #[arg(long, env = "PGDASH_CORS_ORIGINS")]
        cors_origins: Option<String>,
    },
    /// List migrations, oldest first
    List,
    /// Show current revision and pending count
    Status,
    /// Apply all pending migrations
    Upgrade,
    /// Roll back one migration
    Downgrade,
    /// Create a new migration file revising the current head
    New {
        /// Short description, used for the file name
        message: String,
    },
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(url) = &self.database_url {
            config.database_url = url.clone();
        }
        if let Some(dir) = &self.migrations_dir {
            config.migrations_dir = dir.clone();
        }
        if let Commands::Serve {
            host,
            port,
            cors_origins,
        } = &self.command
        {
            if let Some(host) = host {
                config.api_host = host.clone();
            }
            if let Some(port) = port {
                config.api_port = *port;
            }
            if let Some(origins) = cors_origins {
                config.cors_origins = origins.clone();
            }
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "pgdash=debug,tower_http=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.config()?;
    init_tracing(config.debug);

    match cli.command {
        Commands::Serve { .. } => commands::serve(&config).await,
        Commands::List => commands::migrate_list(&commands::pg_service(&config)?).await,
        Commands::Status => commands::migrate_status(&commands::pg_service(&config)?).await,
        Commands::Upgrade => commands::migrate_up(&commands::pg_service(&config)?).await,
        Commands::Downgrade => commands::migrate_down(&commands::pg_service(&config)?).await,
        Commands::New { message } => {
            commands::migrate_create(&MigrationDir::new(&config.migrations_dir), &message)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
