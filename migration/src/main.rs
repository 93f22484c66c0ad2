use std::{env, fs, path::Path, process};

mod runner;

/// `migration [up|fresh|clean|status]`; `up` is the default.
#[tokio::main]
async fn main() {
    let target = util::config::database_path();
    let command = env::args().nth(1).unwrap_or_else(|| "up".into());

    let result = match command.as_str() {
        "clean" => remove_db_file(&target),
        "fresh" => match remove_db_file(&target) {
            Ok(()) => runner::run_all_migrations(&database_url(&target)).await,
            Err(e) => Err(e),
        },
        "status" => runner::print_status(&database_url(&target)).await,
        "up" => runner::run_all_migrations(&database_url(&target)).await,
        other => Err(format!("unknown command `{other}` (expected up, fresh, clean or status)")),
    };

    if let Err(e) = result {
        eprintln!("{e}");
        process::exit(1);
    }
}

/// Full DSNs pass through; plain paths become a read-write-create SQLite URL.
fn database_url(target: &str) -> String {
    if target.starts_with("sqlite:") {
        return target.to_string();
    }
    if let Some(parent) = Path::new(target).parent() {
        let _ = fs::create_dir_all(parent);
    }
    format!("sqlite://{target}?mode=rwc")
}

fn remove_db_file(target: &str) -> Result<(), String> {
    if target.starts_with("sqlite:") {
        return Err("`clean` and `fresh` need a plain DATABASE_PATH, not a DSN".into());
    }
    let path = Path::new(target);
    if !path.exists() {
        println!("Database does not exist: {}", path.display());
        return Ok(());
    }
    fs::remove_file(path).map_err(|e| format!("failed to delete {}: {e}", path.display()))?;
    println!("Deleted database: {}", path.display());
    Ok(())
}
