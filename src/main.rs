use std::env;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use orgtree::store::{DepartmentStore, SeaOrmStore};
use orgtree::{db, Config, HierarchyEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "-help" || arg == "--help") {
        println!("Usage: orgtree [OPTIONS]");
        println!("Options:");
        println!("  -config <path>  Path to configuration file (default: ./etc/orgtree.toml)");
        println!("  -list           Print the department tree as JSON (default)");
        println!("  -check          Audit hierarchy invariants, exit 1 on violations");
        println!("  -help, --help   Print this help message");
        return Ok(());
    }

    let config_path = args
        .iter()
        .skip_while(|arg| arg.as_str() != "-config")
        .nth(1)
        .map(|s| s.to_string())
        .unwrap_or_else(|| "./etc/orgtree.toml".to_string());
    let check = args.iter().any(|arg| arg == "-check");

    // Load configuration first (before logging init)
    let config = Config::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Could not load config file: {}, using defaults", e);
        Config::default()
    });

    // Priority: RUST_LOG env var > config file > default "info"
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    info!("Loading configuration from: {}", config_path);

    let conn = db::init_database(&config.database).await.map_err(|e| {
        tracing::error!("Database initialization failed: {}", e);
        anyhow::anyhow!("Database initialization failed: {}", e)
    })?;

    let engine = HierarchyEngine::new(config.hierarchy.clone());
    let mut store = SeaOrmStore::begin(&conn).await?;

    if check {
        let violations = engine.audit_hierarchy(&store).await?;
        store.rollback().await?;
        println!("{}", serde_json::to_string_pretty(&violations)?);
        if !violations.is_empty() {
            std::process::exit(1);
        }
        info!("Hierarchy is consistent");
    } else {
        let tree = engine.list_departments(&store).await?;
        store.rollback().await?;
        println!("{}", serde_json::to_string_pretty(&tree)?);
    }

    Ok(())
}
