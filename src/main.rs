use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::info;

use assess::catalog::FileExamCatalog;
use assess::config::EngineConfig;
use assess::evaluator::Evaluator;
use assess::finalizer::{
    MemorySubmissionStore, RedisSubmissionStore, SubmissionFinalizer, SubmissionStore,
};
use assess::languages::LanguageTable;
use assess::sandbox::PistonClient;
use assess::session::SessionController;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("assess=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let config = EngineConfig::from_env()?;

    let languages = match &config.languages_path {
        Some(path) => {
            let table = LanguageTable::load(path)?;
            info!("Loaded language configurations from {}", path.display());
            table
        }
        None => LanguageTable::embedded()?,
    };

    info!("Starting assessment engine...");

    let sandbox = PistonClient::new(config.sandbox.clone())
        .context("Failed to create sandbox client")?;
    info!("Sandbox service at {}", config.sandbox.base_url);

    let store: Arc<dyn SubmissionStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisSubmissionStore::connect(url).await?),
        None => {
            info!("REDIS_URL not set, keeping submissions in memory");
            Arc::new(MemorySubmissionStore::new())
        }
    };

    let catalog = FileExamCatalog::load(&config.exams_path)?;

    let evaluator = Evaluator::new(Arc::new(sandbox), Arc::new(languages), &config.sandbox);
    let finalizer = SubmissionFinalizer::new(Arc::new(evaluator), store);
    let retention = chrono::Duration::from_std(config.session_retention)
        .context("SESSION_RETENTION_SECS is out of range")?;
    let controller = Arc::new(
        SessionController::new(Arc::new(catalog), Arc::new(finalizer)).with_retention(retention),
    );

    // Deadline clock
    let ticker = Arc::clone(&controller);
    let tick_interval = config.tick_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let finalized = ticker.tick_all(Utc::now()).await;
            if finalized > 0 {
                info!("Deadline tick finalized {} sessions", finalized);
            }
        }
    });

    let app = assess::api::router(controller);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Assessment engine stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
