use api::routes::app;
use api::scheduler::spawn_schedulers;
use api::state::AppState;
use migration::{Migrator, MigratorTrait};
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_appender::rolling;
use util::config;

#[tokio::main]
async fn main() {
    let _log_guard = init_logging(&config::log_file(), &config::log_level());

    if let Err(e) = run().await {
        error!(error = %e, "Server stopped");
        eprintln!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect().await?;
    Migrator::up(&db, None).await?;

    let state = AppState::from_config(db);
    if config::scheduler_enabled() {
        spawn_schedulers(state.clone());
    }

    let app = app(state);

    let addr: SocketAddr = format!("{}:{}", config::host(), config::port()).parse()?;
    info!(%addr, env = %config::env(), "Starting {}", config::project_name());
    println!("Starting {} on http://{addr}", config::project_name());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

fn init_logging(log_file: &str, log_level: &str) -> tracing_appender::non_blocking::WorkerGuard {
    use std::fs;
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    fs::create_dir_all("logs").ok();

    let file_appender = rolling::daily("logs", log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let stdout_layer = config::log_to_stdout().then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(true)
    });

    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("api=info,services=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    guard
}
