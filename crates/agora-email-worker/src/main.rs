mod config;
mod mailer;
mod processor;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use agora_core::queue::SqliteEmailQueue;
use agora_core::shutdown::shutdown_signal;
use agora_db::Database;

use crate::config::WorkerConfig;
use crate::mailer::SmtpMailer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora_email_worker=debug".into()),
        )
        .init();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    let db = Arc::new(Database::open(&config.db_path)?);
    let queue = SqliteEmailQueue::new(db, config.queue.clone());
    let mailer = SmtpMailer::new(&config.smtp)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    info!("Email worker started, polling every {:?}", config.poll_interval);
    processor::run(queue, &mailer, config.poll_interval, shutdown_rx).await;

    Ok(())
}
