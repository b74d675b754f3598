//! DABRO Pesantren Portal Backend
//!
//! REST backend for the Darul Abror pesantren portal: news publishing,
//! tuition payment tracking, activity logs, student and guardian records,
//! and guardian-to-staff chat, with SQLite persistence and filesystem
//! object storage.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod feed;
mod models;
mod storage;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use feed::MessageFeed;
use models::{Permissions, Role};
use storage::Storage;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub storage: Arc<Storage>,
    pub feed: MessageFeed,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting DABRO Portal Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Storage path: {:?}", config.storage_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Initialize object storage
    tokio::fs::create_dir_all(&config.storage_path).await?;
    let storage = Arc::new(Storage::new(
        config.storage_path.clone(),
        config.public_base_url.clone(),
    ));

    // Create application state
    let state = AppState {
        repo,
        storage,
        feed: MessageFeed::new(),
        config: Arc::new(config.clone()),
    };

    seed_admin(&state).await?;

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Seed the bootstrap admin account on first start.
///
/// Runs only when no admin exists yet and `DABRO_ADMIN_PASSWORD` is set, so
/// restarting never touches existing accounts.
async fn seed_admin(state: &AppState) -> Result<(), errors::AppError> {
    if state.repo.has_admin().await? {
        return Ok(());
    }

    let Some(password) = &state.config.admin_password else {
        tracing::warn!(
            "No admin account exists and DABRO_ADMIN_PASSWORD is not set; admin endpoints are unreachable"
        );
        return Ok(());
    };

    let salt = auth::generate_salt();
    let password_hash = auth::hash_password(&state.config.auth_pepper, &salt, password);

    let user = state
        .repo
        .create_user(
            "Admin Pesantren",
            &state.config.admin_email,
            None,
            None,
            Role::Admin,
            Some(&Permissions::full()),
            &password_hash,
            &salt,
        )
        .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "seeded admin account");
    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Auth
        .route("/auth/register", post(api::register))
        .route("/auth/login", post(api::login))
        .route("/auth/logout", post(api::logout))
        .route("/auth/me", get(api::me))
        // Berita
        .route("/berita", get(api::list_berita))
        .route("/berita", post(api::create_berita))
        .route("/berita/{id}", get(api::get_berita))
        .route("/berita/{id}", put(api::update_berita))
        .route("/berita/{id}", delete(api::delete_berita))
        // Santri
        .route("/santri", get(api::list_santri))
        .route("/santri", post(api::create_santri))
        .route("/santri/{id}", get(api::get_santri))
        .route("/santri/{id}", put(api::update_santri))
        .route("/santri/{id}", delete(api::delete_santri))
        // Pembayaran
        .route("/pembayaran", get(api::list_pembayaran))
        .route("/pembayaran", post(api::create_pembayaran))
        .route("/pembayaran/jenis", get(api::list_jenis))
        .route("/pembayaran/jenis", post(api::create_jenis))
        .route("/pembayaran/{id}", get(api::get_pembayaran))
        .route("/pembayaran/{id}", delete(api::delete_pembayaran))
        .route("/pembayaran/{id}/verify", put(api::verify_pembayaran))
        .route("/pembayaran/{id}/bukti", post(api::upload_bukti))
        // Keaktifan
        .route("/keaktifan", get(api::list_keaktifan))
        .route("/keaktifan", post(api::create_keaktifan))
        .route("/keaktifan/{id}", get(api::get_keaktifan))
        .route("/keaktifan/{id}", put(api::update_keaktifan))
        .route("/keaktifan/{id}", delete(api::delete_keaktifan))
        // Chat
        .route("/chat", get(api::chat_summaries))
        .route("/chat", post(api::send_message))
        .route("/chat/poll", get(api::poll_messages))
        .route("/chat/messages/{id}", put(api::edit_message))
        .route("/chat/messages/{id}", delete(api::delete_message))
        .route("/chat/{counterpart}", get(api::get_thread))
        // Profile
        .route("/profile", get(api::get_profile))
        .route("/profile", put(api::update_profile))
        // Users (admin console)
        .route("/users", get(api::list_users))
        .route("/users", post(api::create_user))
        .route("/users/{id}", put(api::update_user))
        .route("/users/{id}", delete(api::delete_user))
        .route("/users/{id}/role", put(api::set_user_role));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .nest_service("/files", ServeDir::new(state.storage.root()))
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
