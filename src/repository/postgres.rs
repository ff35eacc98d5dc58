use async_trait::async_trait;
use log::info;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::{ProjectRepository, StoreError, TaskRepository, UniqueField, UserRepository};
use crate::models::{
    Project, ProjectInput, ProjectStatus, Task, TaskInput, TaskPriority, TaskStatus, User,
};

// Constraint names are fixed in migrations/0001_init.sql.
const USERNAME_CONSTRAINT: &str = "users_username_key";
const EMAIL_CONSTRAINT: &str = "users_email_key";
const TASK_PROJECT_FK: &str = "tasks_project_id_fkey";

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, first_name, last_name, created_at, updated_at";
const PROJECT_COLUMNS: &str =
    "id, name, description, status, start_date, end_date, created_by, created_at, updated_at";
const TASK_COLUMNS: &str = "id, title, description, priority, status, due_date, project_id, \
     assignee_id, created_by, created_at, updated_at";

/// Translates unique and foreign-key violations into their domain meaning.
impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(db_error) = &error {
            if db_error.is_unique_violation() {
                match db_error.constraint() {
                    Some(USERNAME_CONSTRAINT) => return StoreError::Conflict(UniqueField::Username),
                    Some(EMAIL_CONSTRAINT) => return StoreError::Conflict(UniqueField::Email),
                    _ => {}
                }
            }
            if db_error.is_foreign_key_violation() {
                return match db_error.constraint() {
                    Some(TASK_PROJECT_FK) => StoreError::InvalidReference("project"),
                    _ => StoreError::InvalidReference("user"),
                };
            }
        }
        StoreError::Database(error.to_string())
    }
}

/// Escapes LIKE wildcards so the term is matched literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Postgres-backed implementation of every repository trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies pending migrations from `migrations/`.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {}", e)))?;
        info!("Database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn exists_by_username(&self, username: &str) -> Result<bool, StoreError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {cols}",
            cols = USER_COLUMNS
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

fn select_projects(clause: &str) -> String {
    format!(
        "SELECT {} FROM projects {} ORDER BY created_at DESC",
        PROJECT_COLUMNS, clause
    )
}

fn select_tasks(clause: &str) -> String {
    format!(
        "SELECT {} FROM tasks {} ORDER BY created_at DESC",
        TASK_COLUMNS, clause
    )
}

#[async_trait]
impl ProjectRepository for PgStore {
    async fn create(&self, project: Project) -> Result<Project, StoreError> {
        let sql = format!(
            "INSERT INTO projects ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {cols}",
            cols = PROJECT_COLUMNS
        );
        let created = sqlx::query_as::<_, Project>(&sql)
            .bind(project.id)
            .bind(&project.name)
            .bind(&project.description)
            .bind(project.status)
            .bind(project.start_date)
            .bind(project.end_date)
            .bind(project.created_by)
            .bind(project.created_at)
            .bind(project.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn find_all(&self) -> Result<Vec<Project>, StoreError> {
        let projects = sqlx::query_as::<_, Project>(&select_projects(""))
            .fetch_all(&self.pool)
            .await?;
        Ok(projects)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        let sql = format!("SELECT {} FROM projects WHERE id = $1", PROJECT_COLUMNS);
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }

    async fn find_by_creator(&self, user_id: Uuid) -> Result<Vec<Project>, StoreError> {
        let projects = sqlx::query_as::<_, Project>(&select_projects("WHERE created_by = $1"))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(projects)
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<Project>, StoreError> {
        let projects = sqlx::query_as::<_, Project>(&select_projects("WHERE name ILIKE $1"))
            .bind(like_pattern(name))
            .fetch_all(&self.pool)
            .await?;
        Ok(projects)
    }

    async fn find_by_status(&self, status: ProjectStatus) -> Result<Vec<Project>, StoreError> {
        let projects = sqlx::query_as::<_, Project>(&select_projects("WHERE status = $1"))
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        Ok(projects)
    }

    async fn update(&self, id: Uuid, input: ProjectInput) -> Result<Option<Project>, StoreError> {
        let sql = format!(
            "UPDATE projects
             SET name = $1, description = $2, status = COALESCE($3, status),
                 start_date = $4, end_date = $5, updated_at = NOW()
             WHERE id = $6
             RETURNING {}",
            PROJECT_COLUMNS
        );
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.status)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TaskRepository for PgStore {
    async fn create(&self, task: Task) -> Result<Task, StoreError> {
        let sql = format!(
            "INSERT INTO tasks ({cols})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {cols}",
            cols = TASK_COLUMNS
        );
        let created = sqlx::query_as::<_, Task>(&sql)
            .bind(task.id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.priority)
            .bind(task.status)
            .bind(task.due_date)
            .bind(task.project_id)
            .bind(task.assignee_id)
            .bind(task.created_by)
            .bind(task.created_at)
            .bind(task.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn find_all(&self) -> Result<Vec<Task>, StoreError> {
        let tasks = sqlx::query_as::<_, Task>(&select_tasks(""))
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn find_by_creator(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let tasks = sqlx::query_as::<_, Task>(&select_tasks("WHERE created_by = $1"))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    async fn find_by_assignee(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let tasks = sqlx::query_as::<_, Task>(&select_tasks("WHERE assignee_id = $1"))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    async fn search(&self, term: &str) -> Result<Vec<Task>, StoreError> {
        let sql = select_tasks("WHERE title ILIKE $1 OR description ILIKE $1");
        let tasks = sqlx::query_as::<_, Task>(&sql)
            .bind(like_pattern(term))
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError> {
        let tasks = sqlx::query_as::<_, Task>(&select_tasks("WHERE status = $1"))
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    async fn find_by_priority(&self, priority: TaskPriority) -> Result<Vec<Task>, StoreError> {
        let tasks = sqlx::query_as::<_, Task>(&select_tasks("WHERE priority = $1"))
            .bind(priority)
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    async fn find_by_project(&self, project_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let tasks = sqlx::query_as::<_, Task>(&select_tasks("WHERE project_id = $1"))
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    async fn update(&self, id: Uuid, input: TaskInput) -> Result<Option<Task>, StoreError> {
        let sql = format!(
            "UPDATE tasks
             SET title = $1, description = $2, priority = COALESCE($3, priority),
                 status = COALESCE($4, status), due_date = $5, project_id = $6,
                 assignee_id = $7, updated_at = NOW()
             WHERE id = $8
             RETURNING {}",
            TASK_COLUMNS
        );
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.priority)
            .bind(input.status)
            .bind(input.due_date)
            .bind(input.project_id)
            .bind(input.assignee_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
