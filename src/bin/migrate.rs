//! Standalone database tool: `migrate` (default), `check`, `reset`.

use anyhow::{anyhow, Result};
use std::env;
use std::io;
use std::path::Path;

use raid_train_bot::database::connection::DatabaseManager;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:./data/trains.db".to_string());

    let args: Vec<String> = env::args().collect();
    match args.get(1).map(|s| s.as_str()).unwrap_or("migrate") {
        "migrate" | "up" => cmd_migrate(&database_url).await,
        "check" => cmd_check(&database_url).await,
        "reset" => cmd_reset(&database_url).await,
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_help();
            std::process::exit(1);
        }
    }
}

async fn cmd_migrate(database_url: &str) -> Result<()> {
    println!("🚂 Raid Train Bot database migration");
    println!("📊 Database: {}", mask_url(database_url));

    ensure_parent_dir(database_url)?;

    let db = connect(database_url).await?;
    match db.run_migrations().await {
        Ok(()) => println!("✅ Schema is up to date."),
        Err(e) => {
            eprintln!("❌ Migration failed: {e}");
            std::process::exit(1);
        }
    }
    Ok(())
}

async fn cmd_check(database_url: &str) -> Result<()> {
    println!("🔍 Checking {}", mask_url(database_url));

    let db = connect(database_url).await?;
    let tables = sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE '_sqlx%' ORDER BY name",
    )
    .fetch_all(&db.pool)
    .await?;

    if tables.is_empty() {
        println!("⚠️  No tables found. Run 'migrate up' to create the schema.");
        return Ok(());
    }

    println!("✅ Connected. Tables:");
    for table in tables {
        let rows: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&db.pool)
            .await?;
        println!("  • {table} ({rows} rows)");
    }
    Ok(())
}

async fn cmd_reset(database_url: &str) -> Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite:") else {
        return Err(anyhow!("Reset is only supported for SQLite databases"));
    };

    println!("⚠️  This deletes ALL train and raid data. Continue? (yes/no)");
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    if input.trim().to_lowercase() != "yes" {
        println!("Reset cancelled.");
        return Ok(());
    }

    if Path::new(db_path).exists() {
        std::fs::remove_file(db_path)?;
        println!("🗑  Deleted {db_path}");
    }
    cmd_migrate(database_url).await
}

async fn connect(database_url: &str) -> Result<DatabaseManager> {
    DatabaseManager::new(database_url)
        .await
        .map_err(|e| anyhow!("Failed to connect to database: {e}"))
}

fn ensure_parent_dir(database_url: &str) -> Result<()> {
    if let Some(db_path) = database_url.strip_prefix("sqlite:") {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.exists() {
                println!("📁 Creating directory {}", parent.display());
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}

fn mask_url(url: &str) -> String {
    // Keep full filesystem paths out of logs.
    match url
        .strip_prefix("sqlite:")
        .and_then(|path| Path::new(path).file_name())
    {
        Some(filename) => format!("sqlite:.../{}", filename.to_string_lossy()),
        None => url.to_string(),
    }
}

fn print_help() {
    println!("🚂 Raid Train Bot database tool");
    println!();
    println!("USAGE:");
    println!("    migrate [COMMAND]");
    println!();
    println!("COMMANDS:");
    println!("    migrate, up    Apply pending migrations (default)");
    println!("    check          Show connection status and table row counts");
    println!("    reset          Delete the SQLite file and rebuild the schema");
    println!("    help           Show this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    DATABASE_URL   Connection string (default: sqlite:./data/trains.db)");
}
