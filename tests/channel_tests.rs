use actix_web::{test, web, App};
use dotenv::dotenv;
use sqlx::PgPool;
use uuid::Uuid;

use video_sharing_backend::{auth, handlers, services, AppState};

async fn setup_test_app() -> Option<(
    impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    >,
    PgPool,
)> {
    dotenv().ok();
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set; skipping database-backed test");
        return None;
    }

    let db_pool = services::init_db_pool().await;
    services::run_migrations(&db_pool).await;
    services::ensure_upload_dir().await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AppState {
                db_pool: db_pool.clone(),
                http_client: reqwest::Client::new(),
            }))
            .configure(handlers::configure_routes),
    )
    .await;
    Some((app, db_pool))
}

async fn seed_user(pool: &PgPool) -> (i32, String) {
    let unique = Uuid::new_v4().to_string();
    let email = format!("seed_{}@example.com", &unique[..8]);
    let id: i32 = sqlx::query_scalar(
        "INSERT INTO users (username, name, email) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(format!("user_{}", &unique[..8]))
    .bind("Seed User")
    .bind(&email)
    .fetch_one(pool)
    .await
    .unwrap();
    let token = auth::issue_token(id, &email).unwrap();
    (id, token)
}

const BOUNDARY: &str = "----vsb-test-boundary";

fn multipart_body(parts: &[(&str, Option<(&str, &str)>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file {
            Some((filename, content_type)) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, filename, content_type
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

#[actix_web::test]
async fn test_create_channel_with_self_subscription() {
    let Some((app, pool)) = setup_test_app().await else { return };
    let (user_id, token) = seed_user(&pool).await;

    let handle = format!("channel-{}", Uuid::new_v4());
    let body = multipart_body(&[
        ("channelName", None, b"My Channel"),
        ("description", None, b"A channel about things"),
        ("handle", None, handle.as_bytes()),
        (
            "channelThumbnail",
            Some(("thumb.png", "image/png")),
            b"\x89PNG fake image bytes",
        ),
    ]);

    let req = test::TestRequest::post()
        .uri("/api/channels")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .insert_header(("Content-Type", multipart_content_type()))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let json: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let channel = &json["channel"];
    assert_eq!(channel["channel_name"], "My Channel");
    assert_eq!(channel["subscribers"], 1);
    assert!(channel["thumbnail_url"].as_str().unwrap().contains("/uploads/"));
    let channel_id = channel["id"].as_i64().unwrap() as i32;

    // The owner is self-subscribed from the start
    let subscription_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM subscriptions WHERE channel_id = $1 AND user_id = $2",
    )
    .bind(channel_id)
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(subscription_count, 1);

    // Detail view: owner name joined in, viewer's subscription state resolved
    let req = test::TestRequest::get()
        .uri(&format!("/api/channels/{}", channel_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let detail: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(detail["owner_name"], "Seed User");
    assert_eq!(detail["user_subscribed"], true);

    // Anonymous viewers are never subscribed
    let req = test::TestRequest::get()
        .uri(&format!("/api/channels/{}", channel_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let detail: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(detail["user_subscribed"], false);
}

#[actix_web::test]
async fn test_create_channel_requires_auth() {
    let Some((app, _pool)) = setup_test_app().await else { return };

    let body = multipart_body(&[("channelName", None, b"No Auth")]);
    let req = test::TestRequest::post()
        .uri("/api/channels")
        .insert_header(("Content-Type", multipart_content_type()))
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);
}

#[actix_web::test]
async fn test_update_channel_enforces_ownership() {
    let Some((app, pool)) = setup_test_app().await else { return };
    let (_owner_id, owner_token) = seed_user(&pool).await;
    let (_other_id, other_token) = seed_user(&pool).await;

    let body = multipart_body(&[("channelName", None, b"Owned Channel")]);
    let req = test::TestRequest::post()
        .uri("/api/channels")
        .insert_header(("Authorization", format!("Bearer {}", owner_token)))
        .insert_header(("Content-Type", multipart_content_type()))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let json: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let channel_id = json["channel"]["id"].as_i64().unwrap();

    // A different user may not edit it
    let body = multipart_body(&[("channelName", None, b"Hijacked")]);
    let req = test::TestRequest::put()
        .uri(&format!("/api/channels/{}", channel_id))
        .insert_header(("Authorization", format!("Bearer {}", other_token)))
        .insert_header(("Content-Type", multipart_content_type()))
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    // The owner may
    let body = multipart_body(&[("channelName", None, b"Renamed Channel")]);
    let req = test::TestRequest::put()
        .uri(&format!("/api/channels/{}", channel_id))
        .insert_header(("Authorization", format!("Bearer {}", owner_token)))
        .insert_header(("Content-Type", multipart_content_type()))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let json: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(json["channel"]["channel_name"], "Renamed Channel");
    // Untouched fields survive a partial update
    assert_eq!(json["channel"]["description"], "");
}

#[actix_web::test]
async fn test_duplicate_handle_rejected() {
    let Some((app, pool)) = setup_test_app().await else { return };
    let (_user_id, token) = seed_user(&pool).await;

    let handle = format!("taken-{}", Uuid::new_v4());
    let body = multipart_body(&[
        ("channelName", None, b"First Channel"),
        ("handle", None, handle.as_bytes()),
    ]);
    let req = test::TestRequest::post()
        .uri("/api/channels")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .insert_header(("Content-Type", multipart_content_type()))
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    // A second channel cannot claim the same handle
    let body = multipart_body(&[
        ("channelName", None, b"Second Channel"),
        ("handle", None, handle.as_bytes()),
    ]);
    let req = test::TestRequest::post()
        .uri("/api/channels")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .insert_header(("Content-Type", multipart_content_type()))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let json: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(json["error"], "Handle already in use");

    // Nor can an edit move another channel onto it
    let body = multipart_body(&[("channelName", None, b"Third Channel")]);
    let req = test::TestRequest::post()
        .uri("/api/channels")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .insert_header(("Content-Type", multipart_content_type()))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let json: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let other_id = json["channel"]["id"].as_i64().unwrap();

    let body = multipart_body(&[("handle", None, handle.as_bytes())]);
    let req = test::TestRequest::put()
        .uri(&format!("/api/channels/{}", other_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .insert_header(("Content-Type", multipart_content_type()))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let json: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(json["error"], "Handle already in use");
}

#[actix_web::test]
async fn test_user_channels_empty_list() {
    let Some((app, pool)) = setup_test_app().await else { return };
    let (user_id, _token) = seed_user(&pool).await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}/channels", user_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let json: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(json, serde_json::json!([]));
}

#[actix_web::test]
async fn test_channel_not_found() {
    let Some((app, _pool)) = setup_test_app().await else { return };

    let req = test::TestRequest::get()
        .uri("/api/channels/999999999")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}
