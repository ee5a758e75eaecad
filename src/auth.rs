use actix_web::HttpRequest;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::env;

use crate::models::Claims;

pub fn jwt_secret() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| "secure_jwt_secret_key_12345".to_string())
}

/// Issue a 24-hour token carrying the user's id and email.
pub fn issue_token(user_id: i32, email: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        user_id,
        email: email.to_string(),
        exp: (chrono::Utc::now().naive_utc() + chrono::Duration::hours(24))
            .and_utc()
            .timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret().as_ref()),
    )
}

pub fn verify_token(token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret().as_ref()),
        &Validation::default(),
    )
    .ok()
    .map(|decoded| decoded.claims)
}

/// Extract and verify the Bearer token from the Authorization header.
pub fn authenticate(req: &HttpRequest) -> Option<Claims> {
    let auth_header = req.headers().get(actix_web::http::header::AUTHORIZATION);
    auth_header
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .and_then(verify_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let token = issue_token(42, "user@example.com").unwrap();
        let claims = verify_token(&token).expect("token should verify");
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.email, "user@example.com");
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verify_token("not.a.token").is_none());
        assert!(verify_token("").is_none());
    }
}
