//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all portal data.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            nama TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            no_hp TEXT,
            alamat TEXT,
            foto_url TEXT,
            role TEXT NOT NULL DEFAULT 'wali',
            permissions TEXT,
            password_hash TEXT NOT NULL,
            salt TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            expires_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS santri (
            id TEXT PRIMARY KEY,
            nama TEXT NOT NULL,
            tgl_lahir TEXT,
            alamat TEXT,
            kelas TEXT,
            kamar TEXT,
            wali_id TEXT REFERENCES users(id) ON DELETE SET NULL,
            foto_url TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS berita (
            id TEXT PRIMARY KEY,
            judul TEXT NOT NULL,
            konten TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'draft',
            gambar_url TEXT,
            admin_id TEXT NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jenis_pembayaran (
            id TEXT PRIMARY KEY,
            nama_pembayaran TEXT NOT NULL,
            jumlah_default INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pembayaran (
            id TEXT PRIMARY KEY,
            santri_id TEXT NOT NULL REFERENCES santri(id) ON DELETE CASCADE,
            jenis_id TEXT NOT NULL REFERENCES jenis_pembayaran(id),
            periode TEXT NOT NULL,
            jumlah INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'belum',
            metode_pembayaran TEXT,
            bukti_url TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS keaktifan (
            id TEXT PRIMARY KEY,
            santri_id TEXT NOT NULL REFERENCES santri(id) ON DELETE CASCADE,
            nama_kegiatan TEXT NOT NULL,
            tanggal_kegiatan TEXT NOT NULL,
            kategori TEXT NOT NULL,
            status TEXT NOT NULL,
            keterangan TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            sender_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            receiver_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            message TEXT NOT NULL,
            is_edited INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_santri_wali ON santri(wali_id);
        CREATE INDEX IF NOT EXISTS idx_berita_status ON berita(status, created_at);
        CREATE INDEX IF NOT EXISTS idx_pembayaran_santri ON pembayaran(santri_id, status);
        CREATE INDEX IF NOT EXISTS idx_keaktifan_santri ON keaktifan(santri_id, tanggal_kegiatan);
        CREATE INDEX IF NOT EXISTS idx_messages_pair ON messages(sender_id, receiver_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
