mod config;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use agora_api::state::{AppStateInner, Components};
use agora_core::password::PasswordHasher;
use agora_core::pending::InMemoryPendingUpdates;
use agora_core::queue::SqliteEmailQueue;
use agora_core::shutdown::shutdown_signal;
use agora_core::tokens::TokenIssuer;
use agora_core::uploads::{ImageFolder, ImageStore};
use agora_db::Database;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora=debug,agora_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    let db = Arc::new(Database::open(&config.db_path)?);
    let images = ImageStore::new(config.web_root.clone()).await?;
    let avatars_dir = images.folder_path(ImageFolder::Avatars);
    let post_images_dir = images.folder_path(ImageFolder::PostImages);

    let state = Arc::new(AppStateInner::new(Components {
        db: Arc::clone(&db),
        queue: Arc::new(SqliteEmailQueue::new(Arc::clone(&db), config.email_queue.clone())),
        pending: Arc::new(InMemoryPendingUpdates::new()),
        passwords: PasswordHasher::new(config.password_pepper.clone()),
        tokens: TokenIssuer::new(config.jwt_secret.clone(), config.public_url.clone()),
        images,
        public_url: config.public_url.clone(),
    }));

    if let Some(admin) = config.admin {
        let bootstrap = Arc::clone(&state);
        let created = tokio::task::spawn_blocking(move || {
            bootstrap.users.ensure_admin(&admin.username, &admin.email, &admin.password)
        })
        .await??;
        if !created {
            info!("Admin account already present");
        }
    }

    let app = Router::new()
        .merge(agora_api::router(state))
        .nest_service("/avatars", ServeDir::new(avatars_dir))
        .nest_service("/images", ServeDir::new(post_images_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Agora server listening on {}", config.addr);
    info!("Public URL: {}, email queue: {}", config.public_url, config.email_queue);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
