//!
//! # Data Access
//!
//! One trait per entity, each exposing named query methods. Two backends
//! implement every trait:
//!
//! - [`postgres::PgStore`] runs the queries against a Postgres pool and relies on
//!   table constraints for uniqueness and referential integrity.
//! - [`memory::MemoryStore`] keeps everything in hash maps behind a single
//!   `RwLock`, performing the same checks while holding the write lock.
//!
//! Both report failures as [`StoreError`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

use crate::models::{
    Project, ProjectInput, ProjectStatus, Task, TaskInput, TaskPriority, TaskStatus, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// The user fields that carry a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::Username => f.write_str("username"),
            UniqueField::Email => f.write_str("email"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An insert would have duplicated a unique field.
    #[error("a user with this {0} already exists")]
    Conflict(UniqueField),
    /// A foreign key points at a row that does not exist.
    #[error("referenced {0} does not exist")]
    InvalidReference(&'static str),
    /// The backing store failed or is unreachable.
    #[error("database error: {0}")]
    Database(String),
}

/// Credential store. `insert` must enforce username and email uniqueness
/// atomically and report a violation as [`StoreError::Conflict`].
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn exists_by_username(&self, username: &str) -> Result<bool, StoreError>;

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError>;

    async fn insert(&self, user: User) -> Result<User, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create(&self, project: Project) -> Result<Project, StoreError>;

    async fn find_all(&self) -> Result<Vec<Project>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>, StoreError>;

    async fn find_by_creator(&self, user_id: Uuid) -> Result<Vec<Project>, StoreError>;

    /// Case-insensitive substring match on the project name.
    async fn search_by_name(&self, name: &str) -> Result<Vec<Project>, StoreError>;

    async fn find_by_status(&self, status: ProjectStatus) -> Result<Vec<Project>, StoreError>;

    /// Returns `None` when no project has this id.
    async fn update(&self, id: Uuid, input: ProjectInput) -> Result<Option<Project>, StoreError>;

    /// Returns `false` when no project has this id.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: Task) -> Result<Task, StoreError>;

    async fn find_all(&self) -> Result<Vec<Task>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    async fn find_by_creator(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError>;

    async fn find_by_assignee(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError>;

    /// Case-insensitive substring match on title or description.
    async fn search(&self, term: &str) -> Result<Vec<Task>, StoreError>;

    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError>;

    async fn find_by_priority(&self, priority: TaskPriority) -> Result<Vec<Task>, StoreError>;

    async fn find_by_project(&self, project_id: Uuid) -> Result<Vec<Task>, StoreError>;

    async fn update(&self, id: Uuid, input: TaskInput) -> Result<Option<Task>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}
