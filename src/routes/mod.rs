pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod users;

use actix_web::web;

use crate::error::AppError;

/// Registers everything served under `/api`.
///
/// Fixed paths such as `/my-tasks` must be registered before `/{id}`, which
/// would otherwise capture them.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(
        web::scope("/auth")
            .service(auth::login)
            .service(auth::register),
    )
    .service(web::scope("/users").service(users::profile))
    .service(
        web::scope("/projects")
            .service(projects::create_project)
            .service(projects::get_projects)
            .service(projects::my_projects)
            .service(projects::search_projects)
            .service(projects::projects_by_status)
            .service(projects::get_project)
            .service(projects::update_project)
            .service(projects::delete_project),
    )
    .service(
        web::scope("/tasks")
            .service(tasks::create_task)
            .service(tasks::get_tasks)
            .service(tasks::my_tasks)
            .service(tasks::assigned_to_me)
            .service(tasks::search_tasks)
            .service(tasks::tasks_by_status)
            .service(tasks::tasks_by_priority)
            .service(tasks::tasks_by_assignee)
            .service(tasks::tasks_by_project)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::delete_task),
    );
}
