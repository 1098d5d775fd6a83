use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use db::{ConnectOpts, DbHandle};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs, Environment};
use std::path::{Path, PathBuf};
use std::time::Duration;

use api_ingress::{ApiIngress, ApiIngressConfig};
use users::contract::model::NewUser;
use users::UsersModule;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const MEMORY_DSN: &str = "sqlite::memory:";

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps in-memory DSNs as-is.
/// - Non-sqlite DSNs pass through untouched.
/// - Normalizes backslashes into forward slashes (important on Windows).
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path) -> Result<String> {
    let Some(rest) = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))
    else {
        return Ok(dsn.to_string());
    };

    let (path_str, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };

    if path_str == ":memory:"
        || (path_str.is_empty() && query.is_some_and(|q| q.contains("mode=memory")))
    {
        return Ok(dsn.to_string());
    }
    if path_str.is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }

    let mut p = PathBuf::from(path_str);
    if p.is_relative() {
        p = base_dir.join(p);
    }

    // Rebuild DSN with absolute path and normalized slashes
    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// Users Server - minimal users CRUD service
#[derive(Parser)]
#[command(name = "users-server")]
#[command(about = "Users Server - minimal users CRUD service")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Runtime environment: development, testing or production
    #[arg(short, long = "env", value_name = "NAME")]
    environment: Option<Environment>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory SQLite database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
    /// Drop and recreate the users table
    RecreateDb,
    /// Insert sample users
    SeedDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // CLI args passed down to config/app
    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        environment: cli.environment,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;

    // Apply CLI overrides (port / environment / verbosity)
    config.apply_cli_overrides(&args);

    // Print config and exit if requested
    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    // Initialize logging
    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!(environment = %config.environment, "Users Server starting");

    // Execute command
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(config, args),
        Commands::RecreateDb => recreate_db(config, args).await,
        Commands::SeedDb => seed_db(config, args).await,
    }
}

/// Final DSN for this process: `--mock` wins, then the configured chain.
fn resolve_dsn(config: &AppConfig, args: &CliArgs) -> Result<String> {
    if args.mock {
        return Ok(MEMORY_DSN.to_string());
    }
    let dsn = config.resolve_database_url()?;
    absolutize_sqlite_dsn(&dsn, Path::new(&config.server.home_dir))
}

fn connect_opts(config: &AppConfig) -> ConnectOpts {
    let defaults = ConnectOpts::default();
    ConnectOpts {
        max_conns: config.database.max_conns.or(defaults.max_conns),
        acquire_timeout: Some(Duration::from_secs(5)),
        busy_timeout: config
            .database
            .busy_timeout_ms
            .map(|ms| Duration::from_millis(u64::from(ms)))
            .unwrap_or(defaults.busy_timeout),
        create_sqlite_dirs: true,
        ..defaults
    }
}

/// Connect and make sure the `users` table exists.
async fn open_module(config: &AppConfig, args: &CliArgs) -> Result<(DbHandle, UsersModule)> {
    let dsn = resolve_dsn(config, args)?;
    tracing::info!(
        "Connecting to database: {}",
        db::redact_credentials_in_dsn(&dsn)
    );

    let db = DbHandle::connect(&dsn, connect_opts(config))
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected DB backend: {:?}", db.engine());

    let module = UsersModule::new(&db);
    module.ensure_schema().await?;
    Ok((db, module))
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Initializing modules...");

    let (db, module) = open_module(&config, &args).await?;

    let ingress = ApiIngress::new(ApiIngressConfig::from(&config.server));
    let router = ingress.build_router(module.router());
    let listener = ingress.bind().await?;

    let served = ingress
        .serve(listener, router, async {
            if let Err(e) = api_ingress::wait_for_shutdown().await {
                tracing::error!(error = %e, "Signal handling failed");
            }
        })
        .await;

    db.close().await;
    tracing::info!("Users Server stopped");
    served
}

fn check_config(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Checking configuration...");

    // AppConfig::load_* already normalized & created home_dir
    let dsn = resolve_dsn(&config, &args)?;
    DbHandle::detect(&dsn)?;
    ApiIngressConfig::from(&config.server)
        .bind_addr
        .parse::<std::net::SocketAddr>()
        .context("Invalid server bind address")?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("Database: {}", db::redact_credentials_in_dsn(&dsn));
    println!("Server config:");
    println!("{}", config.to_yaml()?);

    Ok(())
}

async fn recreate_db(config: AppConfig, args: CliArgs) -> Result<()> {
    let (db, module) = open_module(&config, &args).await?;
    module.recreate_schema().await?;
    db.close().await;
    println!("Database recreated");
    Ok(())
}

async fn seed_db(config: AppConfig, args: CliArgs) -> Result<()> {
    let (db, module) = open_module(&config, &args).await?;
    let client = module.client();

    for (username, email) in [
        ("michael", "michael@mherman.org"),
        ("fletcher", "fletcher@notreal.com"),
    ] {
        match client.create_user(NewUser::new(username, email)).await {
            Ok(user) => println!("Added user {} ({})", user.username, user.email),
            Err(users::contract::UsersError::Conflict { email }) => {
                println!("Skipped {email}: already present")
            }
            Err(e) => {
                db.close().await;
                return Err(e.into());
            }
        }
    }

    db.close().await;
    Ok(())
}
