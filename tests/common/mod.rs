#![allow(dead_code)]

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{test, web, App};
use serde_json::{json, Value};
use std::sync::Arc;
use tasksphere::auth::{AuthMiddleware, LoginResponse, PasswordHasher, TokenIssuer};
use tasksphere::repository::MemoryStore;
use tasksphere::{routes, AppState};
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration_test_secret";

/// Auth details for a registered and logged-in user.
pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.token))
    }
}

pub fn test_state() -> AppState {
    let tokens = TokenIssuer::new(TEST_SECRET, chrono::Duration::hours(1)).unwrap();
    AppState::in_memory(
        MemoryStore::new(),
        PasswordHasher::new(4), // bcrypt's (private) MIN_COST
        Arc::new(tokens),
    )
}

/// Builds the full application around `state`, wired as in `main.rs`.
pub async fn init_app(
    state: AppState,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
    Error = actix_web::Error,
> {
    let tokens = state.tokens();
    test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(routes::health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware::new(tokens))
                    .configure(routes::config),
            ),
    )
    .await
}

pub async fn register_and_login_user(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
    >,
    username: &str,
    email: &str,
    password: &str,
) -> Result<TestUser, String> {
    let req_register = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": username,
            "email": email,
            "password": password
        }))
        .to_request();
    let resp_register = test::call_service(app, req_register).await;
    let status = resp_register.status();
    if !status.is_success() {
        let body = test::read_body(resp_register).await;
        return Err(format!(
            "Failed to register user. Status: {}. Body: {}",
            status,
            String::from_utf8_lossy(&body)
        ));
    }

    let req_login = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": username, "password": password }))
        .to_request();
    let resp_login = test::call_service(app, req_login).await;
    let status = resp_login.status();
    let body = test::read_body(resp_login).await;
    if !status.is_success() {
        return Err(format!(
            "Failed to log in. Status: {}. Body: {}",
            status,
            String::from_utf8_lossy(&body)
        ));
    }

    let login: LoginResponse = serde_json::from_slice(&body)
        .map_err(|e| format!("Failed to parse login response: {}", e))?;

    Ok(TestUser {
        id: login.user_id,
        username: login.username,
        token: login.token,
    })
}

/// Reads a response body as JSON, or `Value::Null` when it is empty.
pub async fn json_body(
    resp: actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
) -> Value {
    let bytes = test::read_body(resp).await;
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            panic!("Body is not JSON ({}): {}", e, String::from_utf8_lossy(&bytes))
        })
    }
}
