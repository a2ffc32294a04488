use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::auth::dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest};
use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::{NewUser, User};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "invalid username or password";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn required(value: Option<String>, name: &str) -> ApiResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ApiError::Validation(format!("missing required field: {name}"))),
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let username = required(payload.username, "username")?;
    let email = required(payload.email, "email")?.to_lowercase();
    let password = required(payload.password, "password")?;
    let phone = required(payload.phone, "phone")?;

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::Validation("invalid email".into()));
    }
    if password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::Validation("password too short".into()));
    }

    // Pre-insert existence checks. Not atomic with the insert: two concurrent
    // registrations can both pass and collide.
    if User::find_by_username(&state.store, &username).await?.is_some() {
        warn!(%username, "username already registered");
        return Err(ApiError::Validation("username already registered".into()));
    }
    if User::find_by_email(&state.store, &email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(ApiError::Validation("email already registered".into()));
    }
    if User::find_by_phone(&state.store, &phone).await?.is_some() {
        warn!(%phone, "phone already registered");
        return Err(ApiError::Validation("phone already registered".into()));
    }

    let hashed_password =
        hash_password(&password).map_err(|e| ApiError::Internal(e.to_string()))?;

    let user = User::create(
        &state.store,
        NewUser {
            username,
            email,
            phone,
            full_name: payload.full_name,
            hashed_password,
        },
    )
    .await?;

    // Sign from the committed row only, so a signing failure never hands out
    // a token for a row that was not created.
    let keys = JwtKeys::from_ref(&state);
    let access_token = keys
        .sign(&user.id)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            access_token,
            token_type: "bearer".into(),
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let username = required(payload.username, "username")?;
    let password = required(payload.password, "password")?;

    // Unknown username and wrong password answer identically so the response
    // carries no enumeration signal.
    let user = match User::find_by_username(&state.store, &username).await? {
        Some(u) => u,
        None => {
            warn!(%username, "login unknown username");
            return Err(ApiError::Auth(INVALID_CREDENTIALS.into()));
        }
    };

    if !verify_password(&password, &user.hashed_password) {
        warn!(%username, user_id = %user.id, "login invalid password");
        return Err(ApiError::Auth(INVALID_CREDENTIALS.into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys
        .sign(&user.id)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        token_type: "bearer".into(),
        user: PublicUser::from(&user),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_app;
    use crate::auth::repo::user_row;
    use crate::state::test_state;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn post_json(
        app: axum::Router,
        uri: &str,
        body: Value,
    ) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn register_payload() -> Value {
        json!({
            "username": "alice",
            "email": "a@x.com",
            "password": "pw123456",
            "phone": "555-0100",
        })
    }

    fn mock_no_user(column: &'static str, value: &str) -> Mock {
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(query_param(column, format!("eq.{value}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
    }

    #[tokio::test]
    async fn register_returns_created_and_a_verifiable_token() {
        let server = MockServer::start().await;
        mock_no_user("username", "alice").mount(&server).await;
        mock_no_user("email", "a@x.com").mount(&server).await;
        mock_no_user("phone", "555-0100").mount(&server).await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/users"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!([user_row("u1", "alice")])),
            )
            .mount(&server)
            .await;

        let state = test_state(&server.uri());
        let keys = JwtKeys::from_ref(&state);
        let (status, body) =
            post_json(build_app(state), "/api/auth/register", register_payload()).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["token_type"], "bearer");
        assert_eq!(body["user"]["username"], "alice");
        assert!(body["user"].get("hashed_password").is_none());

        let claims = keys
            .verify(body["access_token"].as_str().unwrap())
            .expect("token verifies");
        assert_eq!(claims.sub, "u1");
    }

    #[tokio::test]
    async fn register_rejects_duplicate_username_without_inserting() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(query_param("username", "eq.alice"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([user_row("u1", "alice")])),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/users"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let (status, body) = post_json(
            build_app(test_state(&server.uri())),
            "/api/auth/register",
            register_payload(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");
    }

    #[tokio::test]
    async fn register_rejects_duplicate_phone() {
        let server = MockServer::start().await;
        mock_no_user("username", "alice").mount(&server).await;
        mock_no_user("email", "a@x.com").mount(&server).await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(query_param("phone", "eq.555-0100"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([user_row("u9", "bob")])),
            )
            .mount(&server)
            .await;

        let (status, _) = post_json(
            build_app(test_state(&server.uri())),
            "/api/auth/register",
            register_payload(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_rejects_missing_fields() {
        let app = build_app(test_state("http://127.0.0.1:1"));
        let (status, body) = post_json(
            app,
            "/api/auth/register",
            json!({"username": "alice", "password": "pw123456"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");
    }

    #[tokio::test]
    async fn register_surfaces_store_failure_as_500() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let (status, body) = post_json(
            build_app(test_state(&server.uri())),
            "/api/auth/register",
            register_payload(),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "remote store error");
    }

    async fn login_attempt(server: &MockServer, body: Value) -> (StatusCode, Value) {
        post_json(build_app(test_state(&server.uri())), "/api/auth/login", body).await
    }

    #[tokio::test]
    async fn login_with_correct_credentials_returns_verifiable_token() {
        let server = MockServer::start().await;
        let mut row = user_row("u1", "alice");
        row["hashed_password"] = json!(hash_password("pw123456").unwrap());
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(query_param("username", "eq.alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
            .mount(&server)
            .await;

        let state = test_state(&server.uri());
        let keys = JwtKeys::from_ref(&state);
        let (status, body) = post_json(
            build_app(state),
            "/api/auth/login",
            json!({"username": "alice", "password": "pw123456"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let claims = keys
            .verify(body["access_token"].as_str().unwrap())
            .expect("token verifies");
        assert_eq!(claims.sub, "u1");
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let server = MockServer::start().await;
        let mut row = user_row("u1", "alice");
        row["hashed_password"] = json!(hash_password("pw123456").unwrap());
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(query_param("username", "eq.alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(query_param("username", "eq.nobody"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let (wrong_pw_status, wrong_pw_body) = login_attempt(
            &server,
            json!({"username": "alice", "password": "wrong-password"}),
        )
        .await;
        let (unknown_status, unknown_body) = login_attempt(
            &server,
            json!({"username": "nobody", "password": "pw123456"}),
        )
        .await;

        assert_eq!(wrong_pw_status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_pw_body, unknown_body);
    }

    #[tokio::test]
    async fn login_rejects_missing_password() {
        let app = build_app(test_state("http://127.0.0.1:1"));
        let (status, _) = post_json(app, "/api/auth/login", json!({"username": "alice"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
