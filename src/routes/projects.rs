use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{Project, ProjectInput, ProjectStatus},
    state::AppState,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: String,
}

fn not_found() -> AppError {
    AppError::NotFound("Project not found".into())
}

/// Creates a project owned by the caller.
///
/// ## Responses:
/// - `201 Created`: The new `Project`.
/// - `422 Unprocessable Entity`: Name empty or too long.
#[post("")]
pub async fn create_project(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    project_data: web::Json<ProjectInput>,
) -> Result<impl Responder, AppError> {
    project_data.validate()?;

    let project = Project::new(project_data.into_inner(), user.id);
    let project = state.projects.create(project).await?;

    Ok(HttpResponse::Created().json(project))
}

#[get("")]
pub async fn get_projects(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(state.projects.find_all().await?))
}

/// Projects created by the caller.
#[get("/my-projects")]
pub async fn my_projects(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(state.projects.find_by_creator(user.id).await?))
}

/// Case-insensitive substring search on the project name.
#[get("/search")]
pub async fn search_projects(
    state: web::Data<AppState>,
    query: web::Query<NameQuery>,
) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(state.projects.search_by_name(&query.name).await?))
}

/// `status` is matched case-insensitively; an unknown value is a 400.
#[get("/status/{status}")]
pub async fn projects_by_status(
    state: web::Data<AppState>,
    status: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let status: ProjectStatus = status.parse()?;
    Ok(HttpResponse::Ok().json(state.projects.find_by_status(status).await?))
}

#[get("/{id}")]
pub async fn get_project(
    state: web::Data<AppState>,
    project_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let project = state
        .projects
        .find_by_id(project_id.into_inner())
        .await?
        .ok_or_else(not_found)?;

    Ok(HttpResponse::Ok().json(project))
}

/// Replaces the project's editable fields.
///
/// ## Responses:
/// - `200 OK`: The updated `Project`.
/// - `404 Not Found`: No project with this id.
/// - `422 Unprocessable Entity`: Validation failed.
#[put("/{id}")]
pub async fn update_project(
    state: web::Data<AppState>,
    project_id: web::Path<Uuid>,
    project_data: web::Json<ProjectInput>,
) -> Result<impl Responder, AppError> {
    project_data.validate()?;

    let project = state
        .projects
        .update(project_id.into_inner(), project_data.into_inner())
        .await?
        .ok_or_else(not_found)?;

    Ok(HttpResponse::Ok().json(project))
}

/// Deletes a project. Its tasks are kept and lose their project link.
#[delete("/{id}")]
pub async fn delete_project(
    state: web::Data<AppState>,
    project_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    if state.projects.delete(project_id.into_inner()).await? {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(not_found())
    }
}
