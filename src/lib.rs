pub mod auth;
pub mod channels;
pub mod comments;
pub mod engagement;
pub mod handlers;
pub mod models;
pub mod oauth;
pub mod services;
pub mod uploads;
pub mod validate;
pub mod videos;

use sqlx::PgPool;

pub struct AppState {
    pub db_pool: PgPool,
    pub http_client: reqwest::Client,
}
