pub mod project;
pub mod task;
pub mod user;

pub use project::{Project, ProjectInput, ProjectStatus};
pub use task::{Task, TaskInput, TaskPriority, TaskStatus};
pub use user::{Profile, Role, User, UserProfile};

/// Returned when a path segment does not name a known enum variant.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
