use actix_multipart::Multipart;
use actix_web::{get, post, put, web, HttpRequest, HttpResponse};
use futures::TryStreamExt;
use log::error;
use serde_json::json;

use crate::auth::authenticate;
use crate::models::{Channel, ChannelDetail};
use crate::services::{is_unique_violation, upload_dir};
use crate::uploads::{self, UploadError};
use crate::AppState;

#[derive(Default)]
struct ChannelForm {
    channel_name: Option<String>,
    description: Option<String>,
    handle: Option<String>,
    banner_url: Option<String>,
    thumbnail_url: Option<String>,
}

/// Drain the multipart payload: text fields plus the optional
/// channelBanner / channelThumbnail images.
async fn read_channel_form(mut payload: Multipart) -> Result<ChannelForm, UploadError> {
    let dir = upload_dir();
    let mut form = ChannelForm::default();

    while let Some(mut field) = payload.try_next().await? {
        let name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();
        match name.as_str() {
            "channelName" => form.channel_name = Some(uploads::read_text(&mut field).await?),
            "description" => form.description = Some(uploads::read_text(&mut field).await?),
            "handle" => form.handle = Some(uploads::read_text(&mut field).await?),
            "channelBanner" | "channelThumbnail" => {
                if !uploads::is_image(&field) {
                    return Err(UploadError::WrongType(
                        "Only image files are allowed".to_string(),
                    ));
                }
                let saved = uploads::save_file(&mut field, &dir).await?;
                if name == "channelBanner" {
                    form.banner_url = Some(saved.url);
                } else {
                    form.thumbnail_url = Some(saved.url);
                }
            }
            // Unknown fields are drained and ignored.
            _ => {
                uploads::read_text(&mut field).await?;
            }
        }
    }
    Ok(form)
}

#[post("/api/channels")]
async fn create_channel(
    payload: Multipart,
    state: web::Data<AppState>,
    http_req: HttpRequest,
) -> HttpResponse {
    let claims = match authenticate(&http_req) {
        Some(claims) => claims,
        None => {
            return HttpResponse::Unauthorized().json(json!({
                "error": "Unauthorized: Invalid or missing token"
            }));
        }
    };

    let form = match read_channel_form(payload).await {
        Ok(form) => form,
        Err(e) => return e.to_response(),
    };

    let channel_name = form
        .channel_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "Unnamed Channel".to_string());
    let handle = form
        .handle
        .filter(|handle| !handle.trim().is_empty())
        .unwrap_or_else(|| format!("channel-{}", chrono::Utc::now().timestamp_millis()));

    // The owner starts out self-subscribed, so the channel is created with
    // one subscriber and a matching subscription record.
    let mut tx = match state.db_pool.begin().await {
        Ok(tx) => tx,
        Err(e) => {
            error!("Error opening transaction: {:?}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }));
        }
    };

    let inserted = sqlx::query_as::<_, Channel>(
        "INSERT INTO channels (owner_id, channel_name, handle, description, banner_url, thumbnail_url, subscribers)
         VALUES ($1, $2, $3, $4, $5, $6, 1) RETURNING *",
    )
    .bind(claims.user_id)
    .bind(&channel_name)
    .bind(&handle)
    .bind(form.description.unwrap_or_default())
    .bind(&form.banner_url)
    .bind(&form.thumbnail_url)
    .fetch_one(&mut tx)
    .await;

    let channel = match inserted {
        Ok(channel) => channel,
        Err(e) if is_unique_violation(&e) => {
            return HttpResponse::BadRequest().json(json!({
                "error": "Handle already in use"
            }));
        }
        Err(e) => {
            error!("Error creating channel: {:?}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }));
        }
    };

    let subscription = sqlx::query(
        "INSERT INTO subscriptions (user_id, channel_id) VALUES ($1, $2)",
    )
    .bind(claims.user_id)
    .bind(channel.id)
    .execute(&mut tx)
    .await;

    if let Err(e) = subscription {
        error!("Error creating self-subscription: {:?}", e);
        return HttpResponse::InternalServerError().json(json!({
            "error": "Internal server error"
        }));
    }

    if let Err(e) = tx.commit().await {
        error!("Error committing channel creation: {:?}", e);
        return HttpResponse::InternalServerError().json(json!({
            "error": "Internal server error"
        }));
    }

    HttpResponse::Created().json(json!({
        "message": "Channel created successfully",
        "channel": channel
    }))
}

#[put("/api/channels/{channel_id}")]
async fn update_channel(
    path: web::Path<i32>,
    payload: Multipart,
    state: web::Data<AppState>,
    http_req: HttpRequest,
) -> HttpResponse {
    let claims = match authenticate(&http_req) {
        Some(claims) => claims,
        None => {
            return HttpResponse::Unauthorized().json(json!({
                "error": "Unauthorized: Invalid or missing token"
            }));
        }
    };

    let channel_id = path.into_inner();
    let existing = sqlx::query_as::<_, Channel>("SELECT * FROM channels WHERE id = $1")
        .bind(channel_id)
        .fetch_optional(&state.db_pool)
        .await;

    let existing = match existing {
        Ok(Some(channel)) => channel,
        Ok(None) => {
            return HttpResponse::NotFound().json(json!({
                "error": "Channel not found"
            }));
        }
        Err(e) => {
            error!("Error fetching channel: {:?}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }));
        }
    };

    if existing.owner_id != claims.user_id {
        return HttpResponse::Forbidden().json(json!({
            "error": "You don't have permission to edit this channel"
        }));
    }

    let form = match read_channel_form(payload).await {
        Ok(form) => form,
        Err(e) => return e.to_response(),
    };

    let result = sqlx::query_as::<_, Channel>(
        "UPDATE channels SET
            channel_name = COALESCE($1, channel_name),
            description = COALESCE($2, description),
            handle = COALESCE($3, handle),
            banner_url = COALESCE($4, banner_url),
            thumbnail_url = COALESCE($5, thumbnail_url)
         WHERE id = $6 RETURNING *",
    )
    .bind(form.channel_name.filter(|v| !v.trim().is_empty()))
    .bind(form.description)
    .bind(form.handle.filter(|v| !v.trim().is_empty()))
    .bind(form.banner_url)
    .bind(form.thumbnail_url)
    .bind(channel_id)
    .fetch_one(&state.db_pool)
    .await;

    match result {
        Ok(channel) => HttpResponse::Ok().json(json!({
            "message": "Channel updated successfully",
            "channel": channel
        })),
        Err(e) if is_unique_violation(&e) => HttpResponse::BadRequest().json(json!({
            "error": "Handle already in use"
        })),
        Err(e) => {
            error!("Error updating channel: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

#[get("/api/channels/{channel_id}")]
async fn get_channel(
    path: web::Path<i32>,
    state: web::Data<AppState>,
    http_req: HttpRequest,
) -> HttpResponse {
    let channel_id = path.into_inner();
    // Anonymous viewers bind NULL, so the EXISTS never matches.
    let viewer_id: Option<i32> = authenticate(&http_req).map(|c| c.user_id);

    let result = sqlx::query_as::<_, ChannelDetail>(
        "SELECT c.id, c.owner_id, c.channel_name, c.handle, c.description,
                c.banner_url, c.thumbnail_url, c.subscribers,
                u.name AS owner_name,
                EXISTS(SELECT 1 FROM subscriptions s
                       WHERE s.channel_id = c.id AND s.user_id = $2) AS user_subscribed
         FROM channels c JOIN users u ON u.id = c.owner_id
         WHERE c.id = $1",
    )
    .bind(channel_id)
    .bind(viewer_id)
    .fetch_optional(&state.db_pool)
    .await;

    match result {
        Ok(Some(channel)) => HttpResponse::Ok().json(channel),
        Ok(None) => HttpResponse::NotFound().json(json!({
            "error": "Channel not found"
        })),
        Err(e) => {
            error!("Error fetching channel: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

#[get("/api/users/{user_id}/channels")]
async fn get_user_channels(path: web::Path<i32>, state: web::Data<AppState>) -> HttpResponse {
    let user_id = path.into_inner();
    let result = sqlx::query_as::<_, Channel>(
        "SELECT * FROM channels WHERE owner_id = $1 ORDER BY created_at ASC",
    )
    .bind(user_id)
    .fetch_all(&state.db_pool)
    .await;

    match result {
        Ok(channels) => HttpResponse::Ok().json(channels),
        Err(e) => {
            error!("Error fetching user channels: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_channel)
        .service(update_channel)
        .service(get_channel)
        .service(get_user_channels);
}
