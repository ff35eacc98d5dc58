use crate::{
    auth::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
    error::AppError,
    state::AppState,
};
use actix_web::{post, web, HttpResponse, Responder};
use validator::Validate;

/// Register a new user
///
/// Creates a new account with the `USER` role. The response carries the public
/// profile only; log in separately to obtain a token.
///
/// ## Responses:
/// - `201 Created`: `{"message": ..., "user": UserProfile}`.
/// - `400 Bad Request`: The username or email is already registered, or the body is malformed.
/// - `422 Unprocessable Entity`: Field validation failed.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;

    let user = state
        .identity
        .register(
            &register_data.username,
            &register_data.email,
            &register_data.password,
            register_data.profile(),
        )
        .await?;

    Ok(HttpResponse::Created().json(RegisterResponse {
        message: "User registered successfully".to_string(),
        user: user.into(),
    }))
}

/// Login user
///
/// Checks the username and password and returns a bearer token.
///
/// ## Responses:
/// - `200 OK`: `{"token", "user_id", "username", "role"}`.
/// - `401 Unauthorized`: Unknown username or wrong password; the two are not distinguished.
/// - `422 Unprocessable Entity`: Empty username or password.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let session = state
        .identity
        .authenticate(&login_data.username, &login_data.password)
        .await?;

    Ok(HttpResponse::Ok().json(LoginResponse::from(session)))
}
