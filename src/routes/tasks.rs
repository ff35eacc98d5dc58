use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{Task, TaskInput, TaskPriority, TaskStatus},
    state::AppState,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(rename = "searchTerm")]
    pub search_term: String,
}

fn not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}

/// Creates a new task for the authenticated user.
///
/// The task's `created_by` is set to the caller. `project_id` and
/// `assignee_id`, when given, must reference existing rows.
///
/// ## Request Body:
/// A JSON object matching the `TaskInput` struct, including:
/// - `title`: The title of the task (required, 1 to 200 characters).
/// - `description` (optional): At most 1000 characters.
/// - `priority` (optional): `LOW`, `MEDIUM`, `HIGH` or `URGENT`. Defaults to `MEDIUM`.
/// - `status` (optional): `TODO`, `IN_PROGRESS`, `IN_REVIEW`, `COMPLETED` or `CANCELLED`. Defaults to `TODO`.
/// - `due_date`, `project_id`, `assignee_id` (optional).
///
/// ## Responses:
/// - `201 Created`: Returns the newly created `Task` object as JSON.
/// - `400 Bad Request`: Malformed body, or a reference to a missing project or user.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `422 Unprocessable Entity`: If input validation on `TaskInput` fails.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = Task::new(task_data.into_inner(), user.id);
    let task = state.tasks.create(task).await?;

    Ok(HttpResponse::Created().json(task))
}

/// Lists every task, newest first.
#[get("")]
pub async fn get_tasks(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(state.tasks.find_all().await?))
}

#[get("/my-tasks")]
pub async fn my_tasks(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(state.tasks.find_by_creator(user.id).await?))
}

#[get("/assigned-to-me")]
pub async fn assigned_to_me(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(state.tasks.find_by_assignee(user.id).await?))
}

/// Matches `searchTerm` against title and description, ignoring case.
#[get("/search")]
pub async fn search_tasks(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(state.tasks.search(&query.search_term).await?))
}

#[get("/status/{status}")]
pub async fn tasks_by_status(
    state: web::Data<AppState>,
    status: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let status: TaskStatus = status.parse()?;
    Ok(HttpResponse::Ok().json(state.tasks.find_by_status(status).await?))
}

#[get("/priority/{priority}")]
pub async fn tasks_by_priority(
    state: web::Data<AppState>,
    priority: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let priority: TaskPriority = priority.parse()?;
    Ok(HttpResponse::Ok().json(state.tasks.find_by_priority(priority).await?))
}

#[get("/assignee/{assignee_id}")]
pub async fn tasks_by_assignee(
    state: web::Data<AppState>,
    assignee_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let tasks = state.tasks.find_by_assignee(assignee_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

#[get("/project/{project_id}")]
pub async fn tasks_by_project(
    state: web::Data<AppState>,
    project_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let tasks = state.tasks.find_by_project(project_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Retrieves a specific task by its ID.
///
/// ## Responses:
/// - `200 OK`: Returns the `Task` object as JSON.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `404 Not Found`: If the task with the given ID does not exist.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = state
        .tasks
        .find_by_id(task_id.into_inner())
        .await?
        .ok_or_else(not_found)?;

    Ok(HttpResponse::Ok().json(task))
}

/// Updates an existing task.
///
/// Every editable field is taken from the body; omitted `priority` and
/// `status` keep their current values.
///
/// ## Responses:
/// - `200 OK`: Returns the updated `Task` object as JSON.
/// - `400 Bad Request`: A reference to a missing project or user.
/// - `404 Not Found`: If the task with the given ID does not exist.
/// - `422 Unprocessable Entity`: If input validation on `TaskInput` fails.
#[put("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    task_id: web::Path<Uuid>,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = state
        .tasks
        .update(task_id.into_inner(), task_data.into_inner())
        .await?
        .ok_or_else(not_found)?;

    Ok(HttpResponse::Ok().json(task))
}

/// Deletes a task by its ID.
///
/// ## Responses:
/// - `204 No Content`: On successful deletion.
/// - `404 Not Found`: If the task with the given ID does not exist.
#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    if !state.tasks.delete(task_id.into_inner()).await? {
        return Err(not_found());
    }

    Ok(HttpResponse::NoContent().finish())
}
