use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use futures::TryStreamExt;
use log::{error, info};
use serde::Deserialize;
use serde_json::json;

use crate::auth::authenticate;
use crate::models::{UpdateVideoRequest, Video};
use crate::services::upload_dir;
use crate::uploads::{self, UploadError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VideoListQuery {
    pub category: Option<String>,
}

#[get("/api/videos")]
async fn get_videos(
    query: web::Query<VideoListQuery>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let result = match &query.category {
        Some(category) => {
            sqlx::query_as::<_, Video>(
                "SELECT * FROM videos WHERE category = $1 ORDER BY upload_date DESC",
            )
            .bind(category)
            .fetch_all(&state.db_pool)
            .await
        }
        None => {
            sqlx::query_as::<_, Video>("SELECT * FROM videos ORDER BY upload_date DESC")
                .fetch_all(&state.db_pool)
                .await
        }
    };

    match result {
        Ok(videos) => HttpResponse::Ok().json(videos),
        Err(e) => {
            error!("Error fetching videos: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

#[get("/api/videos/{id}")]
async fn get_video(path: web::Path<i32>, state: web::Data<AppState>) -> HttpResponse {
    let video_id = path.into_inner();

    // Fetching a video counts as a view.
    let result = sqlx::query_as::<_, Video>(
        "UPDATE videos SET views = views + 1 WHERE id = $1 RETURNING *",
    )
    .bind(video_id)
    .fetch_optional(&state.db_pool)
    .await;

    match result {
        Ok(Some(video)) => HttpResponse::Ok().json(video),
        Ok(None) => HttpResponse::NotFound().json(json!({
            "error": "Video not found"
        })),
        Err(e) => {
            error!("Error fetching video: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

#[get("/api/channels/{channel_id}/videos")]
async fn get_channel_videos(path: web::Path<i32>, state: web::Data<AppState>) -> HttpResponse {
    let channel_id = path.into_inner();
    let result = sqlx::query_as::<_, Video>(
        "SELECT * FROM videos WHERE channel_id = $1 ORDER BY upload_date DESC",
    )
    .bind(channel_id)
    .fetch_all(&state.db_pool)
    .await;

    match result {
        Ok(videos) => HttpResponse::Ok().json(videos),
        Err(e) => {
            error!("Error fetching channel videos: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

#[derive(Default)]
struct VideoForm {
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    video_url: Option<String>,
    thumbnail_url: Option<String>,
}

async fn read_video_form(mut payload: Multipart) -> Result<VideoForm, UploadError> {
    let dir = upload_dir();
    let mut form = VideoForm::default();

    while let Some(mut field) = payload.try_next().await? {
        let name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();
        match name.as_str() {
            "title" => form.title = Some(uploads::read_text(&mut field).await?),
            "description" => form.description = Some(uploads::read_text(&mut field).await?),
            "category" => form.category = Some(uploads::read_text(&mut field).await?),
            "videoFile" => {
                if !uploads::is_video(&field) {
                    return Err(UploadError::WrongType(
                        "Only video files are allowed for videoFile".to_string(),
                    ));
                }
                form.video_url = Some(uploads::save_file(&mut field, &dir).await?.url);
            }
            "thumbnail" => {
                if !uploads::is_image(&field) {
                    return Err(UploadError::WrongType(
                        "Only image files are allowed for thumbnail".to_string(),
                    ));
                }
                form.thumbnail_url = Some(uploads::save_file(&mut field, &dir).await?.url);
            }
            _ => {
                uploads::read_text(&mut field).await?;
            }
        }
    }
    Ok(form)
}

/// Resolve a channel's owner, distinguishing missing channels from
/// database failures.
async fn channel_owner(
    pool: &sqlx::PgPool,
    channel_id: i32,
) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar("SELECT owner_id FROM channels WHERE id = $1")
        .bind(channel_id)
        .fetch_optional(pool)
        .await
}

#[post("/api/channels/{channel_id}/videos")]
async fn upload_video(
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
    match channel_owner(&state.db_pool, channel_id).await {
        Ok(Some(owner_id)) if owner_id == claims.user_id => {}
        Ok(Some(_)) => {
            return HttpResponse::Forbidden().json(json!({
                "error": "You don't have permission to upload to this channel"
            }));
        }
        Ok(None) => {
            return HttpResponse::NotFound().json(json!({
                "error": "Channel not found"
            }));
        }
        Err(e) => {
            error!("Error fetching channel owner: {:?}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }));
        }
    }

    let form = match read_video_form(payload).await {
        Ok(form) => form,
        Err(e) => return e.to_response(),
    };

    let video_url = match form.video_url {
        Some(url) => url,
        None => {
            return HttpResponse::BadRequest().json(json!({
                "error": "A videoFile upload is required"
            }));
        }
    };

    let title = form
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    let result = sqlx::query_as::<_, Video>(
        "INSERT INTO videos (channel_id, title, description, video_url, thumbnail_url, category)
         VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'Other')) RETURNING *",
    )
    .bind(channel_id)
    .bind(&title)
    .bind(form.description.unwrap_or_default())
    .bind(&video_url)
    .bind(&form.thumbnail_url)
    .bind(form.category.filter(|c| !c.trim().is_empty()))
    .fetch_one(&state.db_pool)
    .await;

    match result {
        Ok(video) => {
            info!("Uploaded video {} to channel {}", video.id, channel_id);
            HttpResponse::Created().json(json!({
                "message": "Video uploaded successfully",
                "video": video
            }))
        }
        Err(e) => {
            error!("Error saving uploaded video: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

enum Ownership {
    Missing,
    NotOwner,
    Owned,
}

/// Ownership gate shared by update and delete: the caller must own the
/// channel the video belongs to.
async fn video_ownership(
    pool: &sqlx::PgPool,
    video_id: i32,
    user_id: i32,
) -> Result<Ownership, sqlx::Error> {
    let owner: Option<i32> = sqlx::query_scalar(
        "SELECT c.owner_id FROM videos v JOIN channels c ON c.id = v.channel_id WHERE v.id = $1",
    )
    .bind(video_id)
    .fetch_optional(pool)
    .await?;

    Ok(match owner {
        None => Ownership::Missing,
        Some(owner_id) if owner_id == user_id => Ownership::Owned,
        Some(_) => Ownership::NotOwner,
    })
}

#[put("/api/videos/{id}")]
async fn update_video(
    path: web::Path<i32>,
    req: web::Json<UpdateVideoRequest>,
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

    let video_id = path.into_inner();
    match video_ownership(&state.db_pool, video_id, claims.user_id).await {
        Ok(Ownership::Missing) => {
            return HttpResponse::NotFound().json(json!({
                "error": "Video not found"
            }));
        }
        Ok(Ownership::NotOwner) => {
            return HttpResponse::Forbidden().json(json!({
                "error": "You don't have permission to edit this video"
            }));
        }
        Ok(Ownership::Owned) => {}
        Err(e) => {
            error!("Error checking video ownership: {:?}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }));
        }
    }

    let result = sqlx::query_as::<_, Video>(
        "UPDATE videos SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            category = COALESCE($3, category)
         WHERE id = $4 RETURNING *",
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(&req.category)
    .bind(video_id)
    .fetch_one(&state.db_pool)
    .await;

    match result {
        Ok(video) => HttpResponse::Ok().json(json!({
            "message": "Video updated successfully",
            "video": video
        })),
        Err(e) => {
            error!("Error updating video: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

#[delete("/api/videos/{id}")]
async fn delete_video(
    path: web::Path<i32>,
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

    let video_id = path.into_inner();
    match video_ownership(&state.db_pool, video_id, claims.user_id).await {
        Ok(Ownership::Missing) => {
            return HttpResponse::NotFound().json(json!({
                "error": "Video not found"
            }));
        }
        Ok(Ownership::NotOwner) => {
            return HttpResponse::Forbidden().json(json!({
                "error": "You don't have permission to delete this video"
            }));
        }
        Ok(Ownership::Owned) => {}
        Err(e) => {
            error!("Error checking video ownership: {:?}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }));
        }
    }

    // Comments and opinion records go with the video (ON DELETE CASCADE).
    let result = sqlx::query("DELETE FROM videos WHERE id = $1")
        .bind(video_id)
        .execute(&state.db_pool)
        .await;

    match result {
        Ok(_) => HttpResponse::Ok().json(json!({
            "message": "Video deleted successfully"
        })),
        Err(e) => {
            error!("Error deleting video: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_videos)
        .service(get_video)
        .service(get_channel_videos)
        .service(upload_video)
        .service(update_video)
        .service(delete_video);
}
