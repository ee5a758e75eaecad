use actix_web::{post, get, web, HttpRequest, HttpResponse};
use log::error;
use serde_json::json;
use sqlx::PgPool;

use crate::auth::authenticate;
use crate::models::{OpinionRequest, SubscriptionRequest};
use crate::AppState;

/// Maps one parent counter column to the record state it counts.
/// `state_value` is `None` when every record counts (subscriptions).
pub struct CounterMapping {
    pub parent_column: &'static str,
    pub state_value: Option<&'static str>,
}

/// Describes where per-actor state records live and which denormalized
/// counters on the parent entity mirror them.
pub struct ActorStateDescriptor {
    pub record_table: &'static str,
    pub actor_column: &'static str,
    pub target_column: &'static str,
    pub target_table: &'static str,
    pub state_column: Option<&'static str>,
    pub counters: &'static [CounterMapping],
}

pub const VIDEO_OPINIONS: ActorStateDescriptor = ActorStateDescriptor {
    record_table: "video_opinions",
    actor_column: "user_id",
    target_column: "video_id",
    target_table: "videos",
    state_column: Some("opinion"),
    counters: &[
        CounterMapping { parent_column: "likes", state_value: Some("like") },
        CounterMapping { parent_column: "dislikes", state_value: Some("dislike") },
    ],
};

pub const CHANNEL_SUBSCRIPTIONS: ActorStateDescriptor = ActorStateDescriptor {
    record_table: "subscriptions",
    actor_column: "user_id",
    target_column: "channel_id",
    target_table: "channels",
    state_column: None,
    counters: &[CounterMapping { parent_column: "subscribers", state_value: None }],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredState {
    /// The actor's record should exist, carrying this state value when the
    /// record table has a state column.
    Present(Option<&'static str>),
    /// The actor's record should not exist.
    Absent,
}

pub fn parse_opinion_action(action: &str) -> Option<DesiredState> {
    match action {
        "like" => Some(DesiredState::Present(Some("like"))),
        "dislike" => Some(DesiredState::Present(Some("dislike"))),
        "remove" => Some(DesiredState::Absent),
        _ => None,
    }
}

pub fn parse_subscription_action(action: &str) -> Option<DesiredState> {
    match action {
        "subscribe" => Some(DesiredState::Present(None)),
        "unsubscribe" => Some(DesiredState::Absent),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngagementError {
    #[error("target not found")]
    TargetNotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Reconcile an actor's state toward a target and the target's denormalized
/// counters, in one transaction.
///
/// The parent row is locked first so concurrent toggles on the same target
/// serialize instead of racing the count-and-write. Removing an absent
/// record is a no-op; setting the same state twice is idempotent.
///
/// Returns the recomputed `(parent_column, count)` pairs.
pub async fn apply_actor_state(
    pool: &PgPool,
    actor_id: i32,
    target_id: i32,
    desc: &ActorStateDescriptor,
    desired: DesiredState,
) -> Result<Vec<(&'static str, i64)>, EngagementError> {
    let mut tx = pool.begin().await?;

    let target: Option<i32> = sqlx::query_scalar(&format!(
        "SELECT id FROM {} WHERE id = $1 FOR UPDATE",
        desc.target_table
    ))
    .bind(target_id)
    .fetch_optional(&mut tx)
    .await?;

    if target.is_none() {
        return Err(EngagementError::TargetNotFound);
    }

    match desired {
        DesiredState::Absent => {
            sqlx::query(&format!(
                "DELETE FROM {} WHERE {} = $1 AND {} = $2",
                desc.record_table, desc.actor_column, desc.target_column
            ))
            .bind(actor_id)
            .bind(target_id)
            .execute(&mut tx)
            .await?;
        }
        DesiredState::Present(state) => match (desc.state_column, state) {
            (Some(column), Some(value)) => {
                sqlx::query(&format!(
                    "INSERT INTO {table} ({actor}, {target}, {column}) VALUES ($1, $2, $3)
                     ON CONFLICT ({actor}, {target}) DO UPDATE SET {column} = EXCLUDED.{column}",
                    table = desc.record_table,
                    actor = desc.actor_column,
                    target = desc.target_column,
                    column = column,
                ))
                .bind(actor_id)
                .bind(target_id)
                .bind(value)
                .execute(&mut tx)
                .await?;
            }
            _ => {
                sqlx::query(&format!(
                    "INSERT INTO {table} ({actor}, {target}) VALUES ($1, $2)
                     ON CONFLICT ({actor}, {target}) DO NOTHING",
                    table = desc.record_table,
                    actor = desc.actor_column,
                    target = desc.target_column,
                ))
                .bind(actor_id)
                .bind(target_id)
                .execute(&mut tx)
                .await?;
            }
        },
    }

    let mut counts = Vec::with_capacity(desc.counters.len());
    for counter in desc.counters {
        let count: i64 = match (desc.state_column, counter.state_value) {
            (Some(column), Some(value)) => {
                sqlx::query_scalar(&format!(
                    "SELECT COUNT(*) FROM {} WHERE {} = $1 AND {} = $2",
                    desc.record_table, desc.target_column, column
                ))
                .bind(target_id)
                .bind(value)
                .fetch_one(&mut tx)
                .await?
            }
            _ => {
                sqlx::query_scalar(&format!(
                    "SELECT COUNT(*) FROM {} WHERE {} = $1",
                    desc.record_table, desc.target_column
                ))
                .bind(target_id)
                .fetch_one(&mut tx)
                .await?
            }
        };

        sqlx::query(&format!(
            "UPDATE {} SET {} = $1 WHERE id = $2",
            desc.target_table, counter.parent_column
        ))
        .bind(count as i32)
        .bind(target_id)
        .execute(&mut tx)
        .await?;

        counts.push((counter.parent_column, count));
    }

    tx.commit().await?;
    Ok(counts)
}

fn counts_json(message: &str, counts: &[(&'static str, i64)]) -> serde_json::Value {
    let mut body = json!({ "message": message });
    for (column, count) in counts {
        body[column] = json!(count);
    }
    body
}

#[post("/api/opinions/{action}")]
async fn update_opinion(
    path: web::Path<String>,
    req: web::Json<OpinionRequest>,
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

    let action = path.into_inner();
    let desired = match parse_opinion_action(&action) {
        Some(desired) => desired,
        None => {
            return HttpResponse::BadRequest().json(json!({
                "error": format!("Invalid opinion action: {}", action)
            }));
        }
    };

    match apply_actor_state(&state.db_pool, claims.user_id, req.video_id, &VIDEO_OPINIONS, desired)
        .await
    {
        Ok(counts) => HttpResponse::Ok().json(counts_json("Opinion saved", &counts)),
        Err(EngagementError::TargetNotFound) => HttpResponse::NotFound().json(json!({
            "error": "Video not found"
        })),
        Err(e) => {
            error!("Error updating opinion: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

#[post("/api/subscriptions/{action}")]
async fn update_subscription(
    path: web::Path<String>,
    req: web::Json<SubscriptionRequest>,
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

    let action = path.into_inner();
    let desired = match parse_subscription_action(&action) {
        Some(desired) => desired,
        None => {
            return HttpResponse::BadRequest().json(json!({
                "error": format!("Invalid subscription action: {}", action)
            }));
        }
    };

    match apply_actor_state(
        &state.db_pool,
        claims.user_id,
        req.channel_id,
        &CHANNEL_SUBSCRIPTIONS,
        desired,
    )
    .await
    {
        Ok(counts) => HttpResponse::Ok().json(counts_json("Subscription saved", &counts)),
        Err(EngagementError::TargetNotFound) => HttpResponse::NotFound().json(json!({
            "error": "Channel not found"
        })),
        Err(e) => {
            error!("Error updating subscription: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

/// The requesting user's current opinion for a video, `null` when none.
#[get("/api/interactions/{video_id}")]
async fn get_interaction(
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
    let result: Result<Option<String>, sqlx::Error> = sqlx::query_scalar(
        "SELECT opinion FROM video_opinions WHERE user_id = $1 AND video_id = $2",
    )
    .bind(claims.user_id)
    .bind(video_id)
    .fetch_optional(&state.db_pool)
    .await;

    match result {
        Ok(opinion) => HttpResponse::Ok().json(json!({ "interactionType": opinion })),
        Err(e) => {
            error!("Error fetching interaction: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(update_opinion)
        .service(update_subscription)
        .service(get_interaction);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opinion_actions_parse() {
        assert_eq!(parse_opinion_action("like"), Some(DesiredState::Present(Some("like"))));
        assert_eq!(
            parse_opinion_action("dislike"),
            Some(DesiredState::Present(Some("dislike")))
        );
        assert_eq!(parse_opinion_action("remove"), Some(DesiredState::Absent));
        assert_eq!(parse_opinion_action("love"), None);
    }

    #[test]
    fn subscription_actions_parse() {
        assert_eq!(parse_subscription_action("subscribe"), Some(DesiredState::Present(None)));
        assert_eq!(parse_subscription_action("unsubscribe"), Some(DesiredState::Absent));
        assert_eq!(parse_subscription_action("follow"), None);
    }

    #[test]
    fn every_opinion_counter_maps_a_state() {
        for counter in VIDEO_OPINIONS.counters {
            assert!(counter.state_value.is_some());
        }
        assert!(CHANNEL_SUBSCRIPTIONS.counters[0].state_value.is_none());
    }
}
