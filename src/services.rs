use sqlx::{PgPool, Pool, Postgres};
use std::env;
use log::info;

pub async fn init_db_pool() -> Pool<Postgres> {
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to database")
}

pub async fn run_migrations(pool: &PgPool) {
    sqlx::migrate!()
        .run(pool)
        .await
        .expect("Failed to run database migrations");
}

/// SQLSTATE 23505, raised by Postgres when an INSERT or UPDATE trips a
/// UNIQUE constraint.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

/// Directory uploaded media is written to and served from.
pub fn upload_dir() -> String {
    env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string())
}

pub async fn ensure_upload_dir() {
    let dir = upload_dir();
    if tokio::fs::metadata(&dir).await.is_err() {
        tokio::fs::create_dir_all(&dir)
            .await
            .expect("Failed to create upload directory");
        info!("Created upload directory at {}", dir);
    }
}
