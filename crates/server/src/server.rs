use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{balances, exchanges, sessions, user};
use engine::{Engine, users};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

/// Resolves the bearer access token to a user and attaches it to the request.
///
/// Expired sessions are treated the same as unknown tokens; clients recover
/// through `/auth/refresh`.
async fn auth(
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = auth_header.ok_or(StatusCode::UNAUTHORIZED)?;
    let token = auth_header.token();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let session = sessions::Entity::find_by_id(token)
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let session = match session {
        Some(session) if session.access_expires_at > Utc::now() => session,
        _ => return Err(StatusCode::UNAUTHORIZED),
    };

    let user = users::Entity::find()
        .filter(users::Column::Username.eq(session.username.as_str()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let user = match user {
        Some(user) => engine::User::from(user),
        None => return Err(StatusCode::UNAUTHORIZED),
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub(crate) fn router(state: ServerState) -> Router {
    Router::new()
        .route("/users/me", get(user::me))
        .route("/balances", get(balances::list))
        .route("/exchanges", post(exchanges::create).get(exchanges::list))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .route("/users", post(user::register))
        .route("/auth/login", post(sessions::login))
        .route("/auth/refresh", post(sessions::refresh))
        .with_state(state)
}

pub async fn run(engine: Engine, db: DatabaseConnection) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use engine::{Currency, EngineError, RateProvider};

    struct FakeRates;

    #[async_trait]
    impl RateProvider for FakeRates {
        async fn rate(&self, source: Currency, target: Currency) -> Result<f64, EngineError> {
            match (source, target) {
                (Currency::Usd, Currency::Eur) => Ok(0.9),
                _ => Err(EngineError::UnsupportedCurrency(format!(
                    "{source}->{target}"
                ))),
            }
        }
    }

    async fn test_router() -> Router {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder()
            .database(db.clone())
            .rates(Arc::new(FakeRates))
            .build()
            .await
            .unwrap();
        router(ServerState {
            engine: Arc::new(engine),
            db,
        })
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn register_and_login(app: &Router, username: &str) -> (String, String) {
        let (status, _) = send(
            app,
            "POST",
            "/users",
            None,
            Some(json!({"username": username, "password": "hunter42"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"username": username, "password": "hunter42"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        (
            body["access_token"].as_str().unwrap().to_string(),
            body["refresh_token"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn register_returns_created_user() {
        let app = test_router().await;
        let (status, body) = send(
            &app,
            "POST",
            "/users",
            None,
            Some(json!({"username": "alice", "password": "hunter42"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["username"], "alice");
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let app = test_router().await;
        let (status, _) = send(
            &app,
            "POST",
            "/users",
            None,
            Some(json!({"username": "alice", "password": "abc"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_username_is_conflict() {
        let app = test_router().await;
        register_and_login(&app, "alice").await;

        let (status, _) = send(
            &app,
            "POST",
            "/users",
            None,
            Some(json!({"username": "alice", "password": "hunter42"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let app = test_router().await;
        register_and_login(&app, "alice").await;

        let (status, _) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"username": "alice", "password": "wrong-pass"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn protected_routes_require_a_valid_token() {
        let app = test_router().await;

        // Missing header and unknown token both read as unauthenticated.
        let (status, _) = send(&app, "GET", "/balances", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, "GET", "/balances", Some("bogus"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn exchange_flow_moves_balances_and_writes_history() {
        let app = test_router().await;
        let (access, _) = register_and_login(&app, "alice").await;

        let (status, body) = send(&app, "GET", "/balances", Some(&access), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balances"][0]["currency"], "USD");
        assert_eq!(body["balances"][0]["amount"], "1000.00");

        let (status, body) = send(
            &app,
            "POST",
            "/exchanges",
            Some(&access),
            Some(json!({"source": "USD", "target": "EUR", "amount": "50"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["fee_minor"], 100);
        assert_eq!(body["converted_minor"], 4410);

        let (status, body) = send(&app, "GET", "/balances", Some(&access), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balances"][0]["currency"], "EUR");
        assert_eq!(body["balances"][0]["amount"], "44.10");
        assert_eq!(body["balances"][1]["currency"], "USD");
        assert_eq!(body["balances"][1]["amount"], "950.00");

        let (status, body) = send(
            &app,
            "GET",
            "/exchanges?currency_code=EUR&limit=10",
            Some(&access),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["exchanges"].as_array().unwrap().len(), 1);
        assert!(body["next_cursor"].is_null());
    }

    #[tokio::test]
    async fn exchange_beyond_balance_is_unprocessable() {
        let app = test_router().await;
        let (access, _) = register_and_login(&app, "alice").await;

        let (status, _) = send(
            &app,
            "POST",
            "/exchanges",
            Some(&access),
            Some(json!({"source": "USD", "target": "EUR", "amount": "5000"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unsupported_pair_is_unprocessable() {
        let app = test_router().await;
        let (access, _) = register_and_login(&app, "alice").await;

        let (status, _) = send(
            &app,
            "POST",
            "/exchanges",
            Some(&access),
            Some(json!({"source": "USD", "target": "CHF", "amount": "50"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn login_purges_expired_sessions() {
        use chrono::Duration;
        use sea_orm::{ActiveModelTrait, ActiveValue, IntoActiveModel};

        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder()
            .database(db.clone())
            .rates(Arc::new(FakeRates))
            .build()
            .await
            .unwrap();
        let app = router(ServerState {
            engine: Arc::new(engine),
            db: db.clone(),
        });

        register_and_login(&app, "alice").await;

        // Backdate the session past its refresh expiry, then log in again.
        for session in sessions::Entity::find().all(&db).await.unwrap() {
            let mut stale = session.into_active_model();
            stale.access_expires_at = ActiveValue::Set(Utc::now() - Duration::days(31));
            stale.refresh_expires_at = ActiveValue::Set(Utc::now() - Duration::days(1));
            stale.update(&db).await.unwrap();
        }

        let (status, _) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"username": "alice", "password": "hunter42"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // Only the freshly issued session survives.
        let remaining = sessions::Entity::find().all(&db).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].refresh_expires_at > Utc::now());
    }

    #[tokio::test]
    async fn refresh_rotates_the_session() {
        let app = test_router().await;
        let (access, refresh) = register_and_login(&app, "alice").await;

        let (status, body) = send(
            &app,
            "POST",
            "/auth/refresh",
            None,
            Some(json!({"refresh_token": refresh})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let new_access = body["access_token"].as_str().unwrap().to_string();
        assert_ne!(new_access, access);

        // The rotated-away pair is dead.
        let (status, _) = send(&app, "GET", "/balances", Some(&access), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(
            &app,
            "POST",
            "/auth/refresh",
            None,
            Some(json!({"refresh_token": refresh})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, "GET", "/balances", Some(&new_access), None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
