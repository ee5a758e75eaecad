use actix_web::{web, HttpRequest, HttpResponse, get, post};
use log::error;
use serde_json::json;

use crate::auth::{authenticate, issue_token};
use crate::models::{LoginRequest, RegisterRequest, User};
use crate::services::is_unique_violation;
use crate::validate::{is_valid_name, is_valid_password};
use crate::AppState;

#[post("/api/auth/register")]
async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> HttpResponse {
    if req.username.trim().is_empty()
        || req.name.trim().is_empty()
        || req.email.trim().is_empty()
        || req.password.is_empty()
    {
        return HttpResponse::BadRequest().json(json!({
            "error": "All fields (username, name, email, password) are required"
        }));
    }

    if !is_valid_name(&req.name) {
        return HttpResponse::BadRequest().json(json!({
            "error": "Name must contain only letters and spaces"
        }));
    }

    if !is_valid_password(&req.password) {
        return HttpResponse::BadRequest().json(json!({
            "error": "Password must be 8-15 characters and include an uppercase letter, a lowercase letter, a number and a special character"
        }));
    }

    let existing: Result<Option<i32>, sqlx::Error> =
        sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
            .bind(&req.email)
            .fetch_optional(&state.db_pool)
            .await;

    match existing {
        Ok(Some(_)) => {
            return HttpResponse::BadRequest().json(json!({
                "error": "Email already in use"
            }));
        }
        Ok(None) => {}
        Err(e) => {
            error!("Error checking for existing user: {:?}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }));
        }
    }

    let hashed_password = match bcrypt::hash(&req.password, bcrypt::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(e) => {
            error!("Error hashing password: {:?}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }));
        }
    };

    let result = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, name, email, password) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(&req.username)
    .bind(&req.name)
    .bind(&req.email)
    .bind(&hashed_password)
    .fetch_one(&state.db_pool)
    .await;

    match result {
        Ok(user) => match issue_token(user.id, &user.email) {
            Ok(token) => HttpResponse::Created().json(json!({
                "message": "User registered successfully",
                "user": user,
                "token": token
            })),
            Err(e) => {
                error!("Error issuing token: {:?}", e);
                HttpResponse::InternalServerError().json(json!({
                    "error": "Internal server error"
                }))
            }
        },
        // Email is pre-checked above, so a unique violation here is the
        // username column.
        Err(e) if is_unique_violation(&e) => HttpResponse::BadRequest().json(json!({
            "error": "Username already in use"
        })),
        Err(e) => {
            error!("Error registering user: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

#[post("/api/auth/login")]
async fn login(req: web::Json<LoginRequest>, state: web::Data<AppState>) -> HttpResponse {
    let result = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&req.email)
        .fetch_one(&state.db_pool)
        .await;

    let user = match result {
        Ok(user) => user,
        Err(_) => {
            return HttpResponse::BadRequest().json(json!({
                "error": "Invalid email or password"
            }));
        }
    };

    // OAuth-only accounts have no password hash to compare against.
    let verified = user
        .password
        .as_deref()
        .map(|hash| bcrypt::verify(&req.password, hash).unwrap_or(false))
        .unwrap_or(false);

    if !verified {
        return HttpResponse::BadRequest().json(json!({
            "error": "Invalid email or password"
        }));
    }

    match issue_token(user.id, &user.email) {
        Ok(token) => HttpResponse::Ok().json(json!({
            "message": "Login successful",
            "user": user,
            "token": token
        })),
        Err(e) => {
            error!("Error issuing token: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

#[get("/api/auth/me")]
async fn current_user(state: web::Data<AppState>, http_req: HttpRequest) -> HttpResponse {
    let claims = match authenticate(&http_req) {
        Some(claims) => claims,
        None => {
            return HttpResponse::Unauthorized().json(json!({
                "error": "Unauthorized: Invalid or missing token"
            }));
        }
    };

    let result = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(claims.user_id)
        .fetch_optional(&state.db_pool)
        .await;

    match result {
        Ok(Some(user)) => HttpResponse::Ok().json(user),
        Ok(None) => HttpResponse::NotFound().json(json!({
            "error": "User not found"
        })),
        Err(e) => {
            error!("Error fetching current user: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

#[get("/api/status")]
async fn status() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "running"
    }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register)
        .service(login)
        .service(current_user)
        .service(status)
        .configure(crate::channels::configure)
        .configure(crate::videos::configure)
        .configure(crate::comments::configure)
        .configure(crate::engagement::configure)
        .configure(crate::oauth::configure);
}
