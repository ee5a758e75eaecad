use actix_cors::Cors;
use actix_web::{http, web, App, HttpServer};
use dotenv::dotenv;
use log::info;

use video_sharing_backend::{handlers, services, AppState};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let db_pool = services::init_db_pool().await;
    services::run_migrations(&db_pool).await;
    services::ensure_upload_dir().await;

    let http_client = reqwest::Client::new();

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(4000);

    info!("Starting HTTP server on 0.0.0.0:{}", port);
    HttpServer::new(move || {
        let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());

        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
            .supports_credentials();

        // Add each origin from the comma-separated list
        for origin in allowed_origins.split(',') {
            cors = cors.allowed_origin(origin.trim());
        }

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(AppState {
                db_pool: db_pool.clone(),
                http_client: http_client.clone(),
            }))
            .configure(handlers::configure_routes)
            .service(actix_files::Files::new("/uploads", services::upload_dir()))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
