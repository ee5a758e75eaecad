use actix_web::{get, web, HttpResponse};
use log::{error, info};
use serde::Deserialize;
use std::env;

use crate::auth::issue_token;
use crate::models::User;
use crate::AppState;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

fn frontend_url() -> String {
    env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string())
}

fn callback_url() -> String {
    let base = env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:4000".to_string());
    format!("{}/auth/google/callback", base.trim_end_matches('/'))
}

fn redirect_to(location: String) -> HttpResponse {
    HttpResponse::Found()
        .append_header((actix_web::http::header::LOCATION, location))
        .finish()
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Redirect the browser to Google's consent screen.
#[get("/auth/google")]
async fn google_auth() -> HttpResponse {
    let client_id = env::var("GOOGLE_CLIENT_ID").unwrap_or_default();
    let url = format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}",
        GOOGLE_AUTH_URL,
        urlencoding::encode(&client_id),
        urlencoding::encode(&callback_url()),
        urlencoding::encode("profile email"),
    );
    redirect_to(url)
}

/// Find-or-create the user for a Google profile; links the Google id onto
/// an existing account that registered with the same email.
async fn upsert_google_user(pool: &sqlx::PgPool, info: &UserInfo, email: &str) -> Result<User, sqlx::Error> {
    let existing = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    match existing {
        None => {
            let display_name = info.name.clone().unwrap_or_else(|| email.to_string());
            // Derived username: profile name, lowercased and de-spaced,
            // plus a random suffix to dodge collisions.
            let base: String = display_name
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase();
            let suffix: String = uuid::Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(6)
                .collect();
            let username = format!("{}{}", base, suffix);

            sqlx::query_as::<_, User>(
                "INSERT INTO users (username, name, email, google_id, avatar_url)
                 VALUES ($1, $2, $3, $4, $5) RETURNING *",
            )
            .bind(&username)
            .bind(&display_name)
            .bind(email)
            .bind(&info.sub)
            .bind(&info.picture)
            .fetch_one(pool)
            .await
        }
        Some(user) if user.google_id.is_none() => {
            sqlx::query_as::<_, User>(
                "UPDATE users SET google_id = $1, avatar_url = COALESCE(avatar_url, $2)
                 WHERE id = $3 RETURNING *",
            )
            .bind(&info.sub)
            .bind(&info.picture)
            .bind(user.id)
            .fetch_one(pool)
            .await
        }
        Some(user) => Ok(user),
    }
}

/// Exchange the authorization code, fetch the profile, upsert the user and
/// hand the SPA a JWT via redirect.
#[get("/auth/google/callback")]
async fn google_callback(
    query: web::Query<CallbackQuery>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let frontend = frontend_url();

    let code = match (&query.code, &query.error) {
        (Some(code), _) => code.clone(),
        (None, error) => {
            error!("Google auth denied: {:?}", error);
            return redirect_to(format!("{}/login?error=google_auth_failed", frontend));
        }
    };

    let client_id = env::var("GOOGLE_CLIENT_ID").unwrap_or_default();
    let client_secret = env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default();
    let redirect_uri = callback_url();
    let token_result = state
        .http_client
        .post(GOOGLE_TOKEN_URL)
        .form(&[
            ("code", code.as_str()),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await;

    let token: TokenResponse = match token_result {
        Ok(resp) if resp.status().is_success() => match resp.json().await {
            Ok(token) => token,
            Err(e) => {
                error!("Error decoding Google token response: {:?}", e);
                return redirect_to(format!("{}/login?error=authentication_error", frontend));
            }
        },
        Ok(resp) => {
            error!("Google token exchange failed with status {}", resp.status());
            return redirect_to(format!("{}/login?error=authentication_error", frontend));
        }
        Err(e) => {
            error!("Error exchanging Google auth code: {:?}", e);
            return redirect_to(format!("{}/login?error=authentication_error", frontend));
        }
    };

    let userinfo_result = state
        .http_client
        .get(GOOGLE_USERINFO_URL)
        .bearer_auth(&token.access_token)
        .send()
        .await;

    let info: UserInfo = match userinfo_result {
        Ok(resp) if resp.status().is_success() => match resp.json().await {
            Ok(info) => info,
            Err(e) => {
                error!("Error decoding Google userinfo: {:?}", e);
                return redirect_to(format!("{}/login?error=authentication_error", frontend));
            }
        },
        Ok(resp) => {
            error!("Google userinfo failed with status {}", resp.status());
            return redirect_to(format!("{}/login?error=authentication_error", frontend));
        }
        Err(e) => {
            error!("Error fetching Google userinfo: {:?}", e);
            return redirect_to(format!("{}/login?error=authentication_error", frontend));
        }
    };

    let email = match &info.email {
        Some(email) => email.clone(),
        None => {
            error!("Google profile {} has no email", info.sub);
            return redirect_to(format!("{}/login?error=authentication_error", frontend));
        }
    };

    let user = match upsert_google_user(&state.db_pool, &info, &email).await {
        Ok(user) => user,
        Err(e) => {
            error!("Error upserting Google user: {:?}", e);
            return redirect_to(format!("{}/login?error=authentication_error", frontend));
        }
    };

    let jwt = match issue_token(user.id, &user.email) {
        Ok(jwt) => jwt,
        Err(e) => {
            error!("Error issuing token after Google login: {:?}", e);
            return redirect_to(format!("{}/login?error=authentication_error", frontend));
        }
    };

    info!("Google login for user {}", user.id);
    let user_data = serde_json::to_string(&user).unwrap_or_default();
    redirect_to(format!(
        "{}?token={}&userData={}",
        frontend,
        urlencoding::encode(&jwt),
        urlencoding::encode(&user_data)
    ))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(google_auth).service(google_callback);
}
