use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ProjectRepository, StoreError, TaskRepository, UniqueField, UserRepository};
use crate::models::{
    Project, ProjectInput, ProjectStatus, Task, TaskInput, TaskPriority, TaskStatus, User,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    projects: HashMap<Uuid, Project>,
    tasks: HashMap<Uuid, Task>,
}

impl Tables {
    /// Mirrors the foreign keys on `tasks`.
    fn check_task_refs(
        &self,
        project_id: Option<Uuid>,
        assignee_id: Option<Uuid>,
    ) -> Result<(), StoreError> {
        if let Some(project_id) = project_id {
            if !self.projects.contains_key(&project_id) {
                return Err(StoreError::InvalidReference("project"));
            }
        }
        if let Some(assignee_id) = assignee_id {
            if !self.users.contains_key(&assignee_id) {
                return Err(StoreError::InvalidReference("user"));
            }
        }
        Ok(())
    }
}

/// Newest first, matching the `ORDER BY created_at DESC` of the SQL backend.
fn newest_first<T>(rows: impl Iterator<Item = T>, created_at: fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut rows: Vec<T> = rows.collect();
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    rows
}

fn collect_projects<'a>(rows: impl Iterator<Item = &'a Project>) -> Vec<Project> {
    newest_first(rows.cloned(), |p: &Project| p.created_at)
}

fn collect_tasks<'a>(rows: impl Iterator<Item = &'a Task>) -> Vec<Task> {
    newest_first(rows.cloned(), |t: &Task| t.created_at)
}

/// Process-local store used by the test suite and by the server when no
/// `DATABASE_URL` is configured. Every write runs under one write lock, so
/// uniqueness and reference checks are atomic with the insert.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn exists_by_username(&self, username: &str) -> Result<bool, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().any(|u| u.username == username))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().any(|u| u.email == email))
    }

    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(UniqueField::Username));
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(UniqueField::Email));
        }

        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn create(&self, project: Project) -> Result<Project, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&project.created_by) {
            return Err(StoreError::InvalidReference("user"));
        }
        tables.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn find_all(&self) -> Result<Vec<Project>, StoreError> {
        let tables = self.tables.read().await;
        Ok(collect_projects(tables.projects.values()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.projects.get(&id).cloned())
    }

    async fn find_by_creator(&self, user_id: Uuid) -> Result<Vec<Project>, StoreError> {
        let tables = self.tables.read().await;
        Ok(collect_projects(
            tables.projects.values().filter(|p| p.created_by == user_id),
        ))
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<Project>, StoreError> {
        let needle = name.to_lowercase();
        let tables = self.tables.read().await;
        Ok(collect_projects(
            tables
                .projects
                .values()
                .filter(|p| p.name.to_lowercase().contains(&needle)),
        ))
    }

    async fn find_by_status(&self, status: ProjectStatus) -> Result<Vec<Project>, StoreError> {
        let tables = self.tables.read().await;
        Ok(collect_projects(
            tables.projects.values().filter(|p| p.status == status),
        ))
    }

    async fn update(&self, id: Uuid, input: ProjectInput) -> Result<Option<Project>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.projects.get_mut(&id).map(|project| {
            project.apply(input);
            project.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.projects.remove(&id).is_none() {
            return Ok(false);
        }
        // ON DELETE SET NULL
        for task in tables.tasks.values_mut() {
            if task.project_id == Some(id) {
                task.project_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn create(&self, task: Task) -> Result<Task, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&task.created_by) {
            return Err(StoreError::InvalidReference("user"));
        }
        tables.check_task_refs(task.project_id, task.assignee_id)?;
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_all(&self) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.read().await;
        Ok(collect_tasks(tables.tasks.values()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.tasks.get(&id).cloned())
    }

    async fn find_by_creator(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.read().await;
        Ok(collect_tasks(
            tables.tasks.values().filter(|t| t.created_by == user_id),
        ))
    }

    async fn find_by_assignee(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.read().await;
        Ok(collect_tasks(
            tables
                .tasks
                .values()
                .filter(|t| t.assignee_id == Some(user_id)),
        ))
    }

    async fn search(&self, term: &str) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.read().await;
        Ok(collect_tasks(tables.tasks.values().filter(|t| t.matches(term))))
    }

    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.read().await;
        Ok(collect_tasks(
            tables.tasks.values().filter(|t| t.status == status),
        ))
    }

    async fn find_by_priority(&self, priority: TaskPriority) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.read().await;
        Ok(collect_tasks(
            tables.tasks.values().filter(|t| t.priority == priority),
        ))
    }

    async fn find_by_project(&self, project_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.read().await;
        Ok(collect_tasks(
            tables
                .tasks
                .values()
                .filter(|t| t.project_id == Some(project_id)),
        ))
    }

    async fn update(&self, id: Uuid, input: TaskInput) -> Result<Option<Task>, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.tasks.contains_key(&id) {
            return Ok(None);
        }
        tables.check_task_refs(input.project_id, input.assignee_id)?;
        Ok(tables.tasks.get_mut(&id).map(|task| {
            task.apply(input);
            task.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.tasks.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Profile;

    fn user(username: &str, email: &str) -> User {
        User::new(username, email, "hash".to_string(), Profile::default())
    }

    fn task_input(title: &str) -> TaskInput {
        TaskInput {
            title: title.to_string(),
            description: None,
            priority: None,
            status: None,
            due_date: None,
            project_id: None,
            assignee_id: None,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_username_and_email() {
        let store = MemoryStore::new();
        store.insert(user("alice", "a@x.com")).await.unwrap();

        match store.insert(user("alice", "other@x.com")).await {
            Err(StoreError::Conflict(UniqueField::Username)) => {}
            other => panic!("Expected username conflict, got {:?}", other),
        }
        match store.insert(user("bob", "a@x.com")).await {
            Err(StoreError::Conflict(UniqueField::Email)) => {}
            other => panic!("Expected email conflict, got {:?}", other),
        }

        assert!(store.exists_by_username("alice").await.unwrap());
        assert!(!store.exists_by_username("bob").await.unwrap());
        assert!(store.exists_by_email("a@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_task_references_are_checked() {
        let store = MemoryStore::new();
        let owner = store.insert(user("owner", "o@x.com")).await.unwrap();

        let mut input = task_input("Dangling");
        input.assignee_id = Some(Uuid::new_v4());
        match TaskRepository::create(&store, Task::new(input, owner.id)).await {
            Err(StoreError::InvalidReference("user")) => {}
            other => panic!("Expected invalid reference, got {:?}", other),
        }

        let mut input = task_input("No project");
        input.project_id = Some(Uuid::new_v4());
        match TaskRepository::create(&store, Task::new(input, owner.id)).await {
            Err(StoreError::InvalidReference("project")) => {}
            other => panic!("Expected invalid reference, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_deleting_project_detaches_tasks() {
        let store = MemoryStore::new();
        let owner = store.insert(user("owner", "o@x.com")).await.unwrap();
        let project = ProjectRepository::create(
            &store,
            Project::new(
                ProjectInput {
                    name: "Launch".to_string(),
                    description: None,
                    status: None,
                    start_date: None,
                    end_date: None,
                },
                owner.id,
            ),
        )
        .await
        .unwrap();

        let mut input = task_input("Ship it");
        input.project_id = Some(project.id);
        let task = TaskRepository::create(&store, Task::new(input, owner.id))
            .await
            .unwrap();

        assert!(ProjectRepository::delete(&store, project.id).await.unwrap());
        let task = TaskRepository::find_by_id(&store, task.id)
            .await
            .unwrap()
            .unwrap();
        assert!(task.project_id.is_none());
        assert!(!ProjectRepository::delete(&store, project.id).await.unwrap());
    }
}
