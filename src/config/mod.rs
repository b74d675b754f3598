//! Configuration module for the DABRO backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Root directory for uploaded objects (one subdirectory per bucket)
    pub storage_path: PathBuf,
    /// Base URL used to build durable public URLs for stored objects
    pub public_base_url: String,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Server-side pepper mixed into password hashes
    pub auth_pepper: String,
    /// Session lifetime in hours
    pub session_ttl_hours: i64,
    /// Bootstrap admin account, seeded on first start when a password is set
    pub admin_email: String,
    pub admin_password: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("DABRO_DB_PATH")
            .unwrap_or_else(|_| "./data/app.sqlite".to_string())
            .into();

        let storage_path = env::var("DABRO_STORAGE_PATH")
            .unwrap_or_else(|_| "./data/storage".to_string())
            .into();

        let bind_addr: SocketAddr = env::var("DABRO_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid DABRO_BIND_ADDR format");

        let public_base_url = env::var("DABRO_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}", bind_addr));

        let log_level = env::var("DABRO_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let auth_pepper =
            env::var("DABRO_AUTH_PEPPER").unwrap_or_else(|_| "dabro-dev-pepper".to_string());

        let session_ttl_hours = env::var("DABRO_SESSION_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(72);

        let admin_email =
            env::var("DABRO_ADMIN_EMAIL").unwrap_or_else(|_| "admin@darulabror.com".to_string());

        let admin_password = env::var("DABRO_ADMIN_PASSWORD").ok();

        Self {
            db_path,
            storage_path,
            public_base_url,
            bind_addr,
            log_level,
            auth_pepper,
            session_ttl_hours,
            admin_email,
            admin_password,
        }
    }
}
