mod config;
mod plan_cmds;
mod quote_cmds;
mod serve_cmd;
#[cfg(test)]
mod test_util;
mod user_cmds;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use turfquote_core::catalog::Catalog;
use turfquote_db::pool::{self, SetupReport};

use config::TurfquoteConfig;

#[derive(Parser)]
#[command(
    name = "turfquote",
    about = "Instant quotes and seasonal plan pricing for lawn care"
)]
struct Cli {
    /// Database URL (overrides TURFQUOTE_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Catalog TOML file (overrides TURFQUOTE_CATALOG env var)
    #[arg(long, global = true)]
    catalog: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a turfquote config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/turfquote")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the turfquote database and run migrations
    DbInit,
    /// List services with estimates for a property size
    Services {
        /// Lawn size in square feet
        #[arg(long)]
        sq_ft: Option<String>,
    },
    /// Price a selection of services
    Quote {
        /// Lawn size in square feet
        #[arg(long)]
        sq_ft: Option<String>,
        /// Service ID to include (repeatable)
        #[arg(long = "service", required = true)]
        services: Vec<String>,
        /// Print the quote as JSON
        #[arg(long)]
        json: bool,
    },
    /// Seasonal subscription plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// User records
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Start the HTTP API
    Serve {
        /// Address to bind (default from config, else 127.0.0.1)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (default from config, else 3000)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// List seasonal plans and their features
    List,
    /// Price a plan for a property size
    Price {
        /// Plan slug (e.g. premium-green-package)
        slug: String,
        /// Lawn size in square feet
        #[arg(long)]
        sq_ft: Option<String>,
        /// Print the price as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user record
    Create {
        /// Identity provider user ID
        external_id: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },
    /// Show a user record
    Show {
        /// Identity provider user ID
        external_id: String,
    },
    /// Change a user's subscription tier
    SetTier {
        /// Identity provider user ID
        external_id: String,
        /// free, basic, or premium
        tier: String,
    },
}

/// Execute the `turfquote init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();
    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let secret = config::generate_webhook_secret();
    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_owned(),
        },
        identity: config::IdentitySection {
            webhook_secret: Some(secret.clone()),
        },
        ..config::ConfigFile::default()
    };
    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  identity.webhook_secret = {}...{}", &secret[..8], &secret[56..]);
    println!();
    println!("Next: run `turfquote db-init` to create and migrate the database.");
    Ok(())
}

/// Execute the `turfquote db-init` command: create database and run migrations.
async fn cmd_db_init(resolved: &TurfquoteConfig) -> anyhow::Result<()> {
    println!("Initializing turfquote database...");
    let report = pool::prepare_database(&resolved.db_config).await?;
    print!("{}", render_setup_report(&report));
    Ok(())
}

fn render_setup_report(report: &SetupReport) -> String {
    let mut out = if report.created {
        format!("Created database {}.\n", report.database)
    } else {
        format!("Database {} already exists.\n", report.database)
    };
    out.push_str(&format!(
        "Schema up to date ({} migrations). Users by tier:\n",
        report.migrations
    ));
    for (tier, count) in &report.users_by_tier {
        out.push_str(&format!("  {tier}: {count}\n"));
    }
    out.push_str("turfquote db-init complete.\n");
    out
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    // `init` runs before any config exists, so resolution is deferred to
    // the commands that need it.
    let resolve =
        || TurfquoteConfig::resolve(cli.database_url.as_deref(), cli.catalog.as_deref());
    let load_catalog =
        |resolved: &TurfquoteConfig| Catalog::load_or_builtin(resolved.catalog_path.as_deref());

    match cli.command {
        Commands::Init { db_url, force } => cmd_init(&db_url, force)?,
        Commands::DbInit => cmd_db_init(&resolve()?).await?,
        Commands::Services { sq_ft } => {
            let catalog = load_catalog(&resolve()?)?;
            quote_cmds::run_services(&catalog, sq_ft.as_deref())?;
        }
        Commands::Quote {
            sq_ft,
            services,
            json,
        } => {
            let catalog = load_catalog(&resolve()?)?;
            quote_cmds::run_quote(&catalog, sq_ft.as_deref(), &services, json)?;
        }
        Commands::Plan { command } => {
            let catalog = load_catalog(&resolve()?)?;
            plan_cmds::run_plan_command(command, &catalog)?;
        }
        Commands::User { command } => {
            let resolved = resolve()?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = user_cmds::run_user_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Serve { bind, port } => {
            let resolved = resolve()?;
            let catalog = load_catalog(&resolved)?;
            let db_pool = pool::create_lazy_pool(&resolved.db_config)?;
            if resolved.webhook_secret.is_none() {
                tracing::warn!("no webhook secret configured; identity webhooks are disabled");
            }
            let state = serve_cmd::AppState {
                pool: db_pool.clone(),
                catalog: Arc::new(catalog),
                webhook_secret: resolved.webhook_secret.map(Arc::new),
            };
            let bind = bind.unwrap_or(resolved.bind);
            let port = port.unwrap_or(resolved.port);
            let result = serve_cmd::run_serve(state, &bind, port).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
