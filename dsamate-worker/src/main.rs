//! # DSAMate Worker
//!
//! Mails the Problem of the Day to subscribed users once per UTC day.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/dsamate POTD_SEND_HOUR_UTC=3 cargo run -p dsamate-worker
//! ```

use dsamate_shared::catalog::questions::QuestionCatalog;
use dsamate_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig},
};
use dsamate_worker::{config::WorkerConfig, scheduler::PotdScheduler};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dsamate_worker=debug,dsamate_shared=info".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(
        "DSAMate Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = WorkerConfig::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database_url.clone(),
        max_connections: config.max_connections,
        ..Default::default()
    })
    .await?;
    run_migrations(&pool).await?;

    let scheduler = PotdScheduler::new(
        pool.clone(),
        config.mail.build_mailer()?,
        Arc::new(QuestionCatalog::bundled()?),
        config.public_base_url.clone(),
        config.schedule,
    );

    let token = scheduler.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Shutdown signal received");
        token.cancel();
    });

    scheduler.run().await;

    close_pool(pool).await;
    Ok(())
}
