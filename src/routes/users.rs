use crate::{auth::AuthenticatedUser, error::AppError, models::UserProfile, state::AppState};
use actix_web::{get, web, HttpResponse, Responder};

/// Returns the caller's own profile.
///
/// ## Responses:
/// - `200 OK`: The `UserProfile` of the token's subject.
/// - `401 Unauthorized`: Missing or invalid token.
/// - `404 Not Found`: The account no longer exists.
#[get("/profile")]
pub async fn profile(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let record = state
        .users
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(HttpResponse::Ok().json(UserProfile::from(record)))
}
