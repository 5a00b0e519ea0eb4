use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use api_ingress::ApiIngressConfig;
use axum::Router;
use clap::{Parser, Subcommand};
use runtime::{AppConfig, CliArgs, DatabaseConfig, IN_MEMORY_DSN as MEMORY_DSN};
use schedule::{ScheduleConfig, ScheduleModule};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use url::Url;

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps in-memory DSNs as `sqlite::memory:`.
/// - Normalizes backslashes into forward slashes.
/// - Adds `mode=rwc` so a missing database file is created.
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if dsn.eq_ignore_ascii_case(MEMORY_DSN) || dsn.eq_ignore_ascii_case("sqlite://:memory:") {
        return Ok(MEMORY_DSN.to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    if let Some(dir) = p.parent() {
        if create_dirs {
            std::fs::create_dir_all(dir)?;
        }
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    match query {
        Some(q) if q.contains("mode=") => {
            out.push('?');
            out.push_str(q);
        }
        Some(q) => {
            out.push('?');
            out.push_str(q);
            out.push_str("&mode=rwc");
        }
        None => out.push_str("?mode=rwc"),
    }
    Ok(out)
}

/// Timetable Server - personal class schedule and exam tracker
#[derive(Parser)]
#[command(name = "timetable-server")]
#[command(about = "Timetable Server - personal class schedule and exam tracker")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory SQLite database instead of the configured one
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
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, &config.home_dir());
    tracing::info!("Timetable Server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config),
    }
}

/// Detect DB backend from URL scheme.
fn detect_from_dsn(cfg: &DatabaseConfig) -> Result<&'static str> {
    let raw = cfg.url.trim();
    if raw.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }
    if raw.eq_ignore_ascii_case(MEMORY_DSN) {
        return Ok("sqlite");
    }

    let url = Url::parse(raw).map_err(|e| anyhow!("Invalid database DSN '{}': {}", raw, e))?;

    match url.scheme() {
        "sqlite" => Ok("sqlite"),
        "postgres" | "postgresql" => Ok("postgres"),
        other => Err(anyhow!("Unsupported database type: {}", other)),
    }
}

/// Final DSN to connect with. Sqlite paths are made absolute against the
/// home directory, other URLs pass through.
fn resolve_dsn(config: &AppConfig, db_config: &DatabaseConfig) -> Result<String> {
    let backend = detect_from_dsn(db_config)?;
    let dsn = db_config.url.trim().to_string();
    if backend == "sqlite" {
        absolutize_sqlite_dsn(&dsn, &config.home_dir(), true)
    } else {
        Ok(dsn)
    }
}

async fn connect(dsn: &str, db_config: &DatabaseConfig) -> Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(dsn.to_string());
    opts.acquire_timeout(Duration::from_secs(5))
        .sqlx_logging(false);

    // Each pooled in-memory connection is a separate database.
    let max_conns = if dsn == MEMORY_DSN {
        Some(1)
    } else {
        db_config.max_conns
    };
    if let Some(max) = max_conns {
        opts.max_connections(max);
    }

    if dsn.starts_with("sqlite") {
        let busy = db_config.busy_timeout_ms.unwrap_or(5000);
        opts.map_sqlx_sqlite_opts(move |o| o.busy_timeout(Duration::from_millis(u64::from(busy))));
    }

    tracing::info!("Connecting to database: {}", dsn);
    Database::connect(opts)
        .await
        .with_context(|| format!("failed to connect to database '{dsn}'"))
}

async fn bind_address(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("invalid bind address {host}:{port}"))?
        .next()
        .ok_or_else(|| anyhow!("invalid bind address {host}:{port}: no addresses resolved"))
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Initializing modules...");

    let schedule_cfg: ScheduleConfig = config.module_config("schedule")?;
    let ingress_cfg: ApiIngressConfig = config.module_config("api_ingress")?;

    let db_config = config.database.clone().unwrap_or_else(|| {
        tracing::warn!("No database section configured, using the default SQLite file");
        DatabaseConfig::default()
    });
    let dsn = resolve_dsn(&config, &db_config)?;
    let db = connect(&dsn, &db_config).await?;
    ScheduleModule::migrate(&db).await?;

    let module = ScheduleModule::new(db, schedule_cfg);
    let router = api_ingress::build_router(module.register_rest(Router::new()), &ingress_cfg);

    let addr = bind_address(&config.server.host, config.server.port).await?;
    api_ingress::serve(router, addr).await
}

fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    config.module_config::<ScheduleConfig>("schedule")?;
    config.module_config::<ApiIngressConfig>("api_ingress")?;
    if let Some(db) = config.database.as_ref() {
        detect_from_dsn(db)?;
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("Server config:");
    println!("{}", config.to_yaml()?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_sqlite_paths_land_under_home() {
        let tmp = tempfile::tempdir().unwrap();
        let dsn = absolutize_sqlite_dsn("sqlite://database/t.db", tmp.path(), true).unwrap();
        let expected = tmp
            .path()
            .join("database/t.db")
            .to_string_lossy()
            .replace('\\', "/");
        assert_eq!(dsn, format!("sqlite://{expected}?mode=rwc"));
        assert!(tmp.path().join("database").is_dir());
    }

    #[test]
    fn existing_mode_is_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let dsn = absolutize_sqlite_dsn("sqlite://t.db?mode=ro", tmp.path(), false).unwrap();
        assert!(dsn.ends_with("t.db?mode=ro"));
        assert_eq!(
            absolutize_sqlite_dsn("sqlite://:memory:", tmp.path(), false).unwrap(),
            MEMORY_DSN
        );
    }

    #[test]
    fn backends_from_scheme() {
        let cfg = |url: &str| DatabaseConfig {
            url: url.into(),
            max_conns: None,
            busy_timeout_ms: None,
        };
        assert_eq!(detect_from_dsn(&cfg("sqlite://x.db")).unwrap(), "sqlite");
        assert_eq!(detect_from_dsn(&cfg("postgres://u@h/db")).unwrap(), "postgres");
        assert!(detect_from_dsn(&cfg("mysql://u@h/db")).is_err());
        assert!(detect_from_dsn(&cfg("sqlite3://x.db")).is_err());
        assert!(detect_from_dsn(&cfg("  ")).is_err());
    }
}
