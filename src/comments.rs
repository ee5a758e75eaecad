use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use log::error;
use serde_json::json;

use crate::auth::authenticate;
use crate::models::{Comment, CommentRequest};
use crate::AppState;

#[get("/api/videos/{video_id}/comments")]
async fn get_comments(path: web::Path<i32>, state: web::Data<AppState>) -> HttpResponse {
    let video_id = path.into_inner();
    let result = sqlx::query_as::<_, Comment>(
        "SELECT * FROM comments WHERE video_id = $1 ORDER BY created_at DESC",
    )
    .bind(video_id)
    .fetch_all(&state.db_pool)
    .await;

    match result {
        Ok(comments) => HttpResponse::Ok().json(comments),
        Err(e) => {
            error!("Error fetching comments: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

#[post("/api/videos/{video_id}/comments")]
async fn post_comment(
    path: web::Path<i32>,
    req: web::Json<CommentRequest>,
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

    if req.text.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Comment text is required"
        }));
    }

    let video_id = path.into_inner();
    let video_exists: Result<Option<i32>, sqlx::Error> =
        sqlx::query_scalar("SELECT id FROM videos WHERE id = $1")
            .bind(video_id)
            .fetch_optional(&state.db_pool)
            .await;

    match video_exists {
        Ok(Some(_)) => {}
        Ok(None) => {
            return HttpResponse::NotFound().json(json!({
                "error": "Video not found"
            }));
        }
        Err(e) => {
            error!("Error checking video: {:?}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }));
        }
    }

    let result = sqlx::query_as::<_, Comment>(
        "INSERT INTO comments (video_id, user_id, text) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(video_id)
    .bind(claims.user_id)
    .bind(req.text.trim())
    .fetch_one(&state.db_pool)
    .await;

    match result {
        Ok(comment) => HttpResponse::Created().json(json!({
            "message": "Comment added successfully",
            "comment": comment
        })),
        Err(e) => {
            error!("Error posting comment: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

#[put("/api/videos/{video_id}/comments/{comment_id}")]
async fn update_comment(
    path: web::Path<(i32, i32)>,
    req: web::Json<CommentRequest>,
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

    if req.text.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Comment text is required"
        }));
    }

    let (video_id, comment_id) = path.into_inner();

    // Authorship and video scoping in one statement: only the author's own
    // comment on this video matches.
    let result = sqlx::query_as::<_, Comment>(
        "UPDATE comments SET text = $1, edited_at = NOW()
         WHERE id = $2 AND video_id = $3 AND user_id = $4 RETURNING *",
    )
    .bind(req.text.trim())
    .bind(comment_id)
    .bind(video_id)
    .bind(claims.user_id)
    .fetch_optional(&state.db_pool)
    .await;

    match result {
        Ok(Some(comment)) => HttpResponse::Ok().json(json!({
            "message": "Comment updated successfully",
            "comment": comment
        })),
        Ok(None) => HttpResponse::NotFound().json(json!({
            "error": "Comment not found or you don't have permission to update this comment"
        })),
        Err(e) => {
            error!("Error updating comment: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

#[delete("/api/videos/{video_id}/comments/{comment_id}")]
async fn delete_comment(
    path: web::Path<(i32, i32)>,
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

    let (video_id, comment_id) = path.into_inner();
    let result = sqlx::query(
        "DELETE FROM comments WHERE id = $1 AND video_id = $2 AND user_id = $3",
    )
    .bind(comment_id)
    .bind(video_id)
    .bind(claims.user_id)
    .execute(&state.db_pool)
    .await;

    match result {
        Ok(done) if done.rows_affected() > 0 => HttpResponse::Ok().json(json!({
            "message": "Comment deleted successfully"
        })),
        Ok(_) => HttpResponse::NotFound().json(json!({
            "error": "Comment not found or you don't have permission to delete this comment"
        })),
        Err(e) => {
            error!("Error deleting comment: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_comments)
        .service(post_comment)
        .service(update_comment)
        .service(delete_comment);
}
