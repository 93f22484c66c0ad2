use colored::*;
use migration::Migrator;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::prelude::*;
use std::io::{self, Write};
use std::time::Instant;

const STATUS_COLUMN: usize = 80;

async fn connect(url: &str) -> Result<DatabaseConnection, String> {
    Database::connect(url)
        .await
        .map_err(|e| format!("database connection failed: {e}"))
}

/// Applies every pending migration, printing one status line per migration.
pub async fn run_all_migrations(url: &str) -> Result<(), String> {
    let db = connect(url).await?;
    let pending = Migrator::get_pending_migrations(&db)
        .await
        .map_err(|e| format!("failed to read migration status: {e}"))?;

    if pending.is_empty() {
        println!("{}", "Nothing to migrate".dimmed());
        return Ok(());
    }

    println!("Running {} migration(s)...", pending.len());

    for migration in pending {
        let name = migration.name().to_string();
        let label = format!("Applying {}", name.bold());
        let dots = ".".repeat(STATUS_COLUMN.saturating_sub(label.len()));
        print!("{label}{dots} ");
        io::stdout().flush().ok();

        let start = Instant::now();
        if let Err(e) = Migrator::up(&db, Some(1)).await {
            println!("{}", "failed".red());
            return Err(format!("{name}: {e}"));
        }
        let time_str = format!("({:.2?})", start.elapsed()).dimmed();
        println!("{} {}", "done".green(), time_str);
    }
    Ok(())
}

/// Lists applied and pending migrations.
pub async fn print_status(url: &str) -> Result<(), String> {
    let db = connect(url).await?;
    let applied = Migrator::get_applied_migrations(&db)
        .await
        .map_err(|e| format!("failed to read migration status: {e}"))?;
    let pending = Migrator::get_pending_migrations(&db)
        .await
        .map_err(|e| format!("failed to read migration status: {e}"))?;

    for m in &applied {
        println!("{} {}", "applied".green(), m.name());
    }
    for m in &pending {
        println!("{} {}", "pending".yellow(), m.name());
    }
    Ok(())
}
