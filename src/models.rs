use serde::{Deserialize, Serialize};
use chrono::NaiveDateTime;
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    #[serde(skip_serializing)]
    pub google_id: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Channel {
    pub id: i32,
    pub owner_id: i32,
    pub channel_name: String,
    pub handle: String,
    pub description: String,
    pub banner_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub subscribers: i32,
    pub created_at: Option<NaiveDateTime>,
}

/// Channel as returned by the detail endpoint: joined with the owner's
/// display name, plus whether the requesting user is subscribed.
#[derive(Debug, Serialize, FromRow)]
pub struct ChannelDetail {
    pub id: i32,
    pub owner_id: i32,
    pub channel_name: String,
    pub handle: String,
    pub description: String,
    pub banner_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub subscribers: i32,
    pub owner_name: String,
    pub user_subscribed: bool,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Video {
    pub id: i32,
    pub channel_id: i32,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub category: String,
    pub views: i32,
    pub likes: i32,
    pub dislikes: i32,
    pub upload_date: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Comment {
    pub id: i32,
    pub video_id: i32,
    pub user_id: i32,
    pub text: String,
    pub created_at: NaiveDateTime,
    pub edited_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateVideoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpinionRequest {
    #[serde(rename = "videoId")]
    pub video_id: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    #[serde(rename = "channelId")]
    pub channel_id: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub email: String,
    pub exp: usize,
}
