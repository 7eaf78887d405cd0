//! User registration and profile endpoints.

use api_types::user::{Register, UserView};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode};

use crate::{ServerError, server::ServerState};

const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn hash_password(password: &str) -> Result<String, ServerError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| {
            tracing::error!("password hashing failed: {err}");
            ServerError::Generic("failed to process password".to_string())
        })
}

pub(crate) fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<Register>,
) -> Result<(StatusCode, Json<UserView>), ServerError> {
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServerError::Generic(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .engine
        .register_user(&payload.username, &password_hash)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserView {
            username: user.username,
            created_at: user.created_at,
        }),
    ))
}

pub async fn me(Extension(user): Extension<engine::User>) -> Json<UserView> {
    Json(UserView {
        username: user.username,
        created_at: user.created_at,
    })
}
