//! Session store and token endpoints.
//!
//! Tokens are opaque random strings, not JWTs: the session row is the source
//! of truth. `login` issues a fresh access/refresh pair, `refresh` rotates
//! both, which also invalidates the old access token.

use api_types::user::{Login, Refresh, TokenPair};
use axum::{Json, extract::State};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveValue, DatabaseConnection, QueryFilter, entity::prelude::*};
use uuid::Uuid;

use engine::EngineError;

use crate::{ServerError, server::ServerState, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub access_token: String,
    pub refresh_token: String,
    pub username: String,
    pub access_expires_at: DateTimeUtc,
    pub refresh_expires_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

fn access_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(1)
}

fn refresh_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(30)
}

async fn issue(db: &DatabaseConnection, username: &str) -> Result<TokenPair, ServerError> {
    let now = Utc::now();

    // Keep the table from growing without bound: sessions past their
    // refresh expiry can never be used again.
    Entity::delete_many()
        .filter(Column::Username.eq(username))
        .filter(Column::RefreshExpiresAt.lt(now))
        .exec(db)
        .await
        .map_err(EngineError::from)?;

    let session = ActiveModel {
        access_token: ActiveValue::Set(new_token()),
        refresh_token: ActiveValue::Set(new_token()),
        username: ActiveValue::Set(username.to_string()),
        access_expires_at: ActiveValue::Set(access_expiry(now)),
        refresh_expires_at: ActiveValue::Set(refresh_expiry(now)),
    }
    .insert(db)
    .await
    .map_err(EngineError::from)?;

    Ok(TokenPair {
        access_token: session.access_token,
        refresh_token: session.refresh_token,
        expires_at: session.access_expires_at,
    })
}

pub async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<Login>,
) -> Result<Json<TokenPair>, ServerError> {
    let user = state
        .engine
        .find_user(&payload.username)
        .await?
        .ok_or(ServerError::Unauthorized)?;

    if !user::verify_password(&payload.password, &user.password_hash) {
        return Err(ServerError::Unauthorized);
    }

    let pair = issue(&state.db, &user.username).await?;
    Ok(Json(pair))
}

pub async fn refresh(
    State(state): State<ServerState>,
    Json(payload): Json<Refresh>,
) -> Result<Json<TokenPair>, ServerError> {
    let session = Entity::find()
        .filter(Column::RefreshToken.eq(payload.refresh_token.as_str()))
        .one(&state.db)
        .await
        .map_err(EngineError::from)?
        .ok_or(ServerError::Unauthorized)?;

    let username = session.username.clone();
    let expired = session.refresh_expires_at < Utc::now();

    // Rotation: the presented pair dies either way.
    session
        .delete(&state.db)
        .await
        .map_err(EngineError::from)?;

    if expired {
        return Err(ServerError::Unauthorized);
    }

    let pair = issue(&state.db, &username).await?;
    Ok(Json(pair))
}
