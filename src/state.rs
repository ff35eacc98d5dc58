use std::sync::Arc;

use crate::auth::{IdentityService, PasswordHasher, TokenIssuer};
use crate::repository::{MemoryStore, PgStore, ProjectRepository, TaskRepository, UserRepository};

/// Shared handler state, registered once as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub identity: IdentityService,
    pub users: Arc<dyn UserRepository>,
    pub projects: Arc<dyn ProjectRepository>,
    pub tasks: Arc<dyn TaskRepository>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserRepository>,
        projects: Arc<dyn ProjectRepository>,
        tasks: Arc<dyn TaskRepository>,
        hasher: PasswordHasher,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            identity: IdentityService::new(users.clone(), hasher, tokens),
            users,
            projects,
            tasks,
        }
    }

    pub fn in_memory(store: MemoryStore, hasher: PasswordHasher, tokens: Arc<TokenIssuer>) -> Self {
        let store = Arc::new(store);
        Self::new(store.clone(), store.clone(), store, hasher, tokens)
    }

    pub fn postgres(store: PgStore, hasher: PasswordHasher, tokens: Arc<TokenIssuer>) -> Self {
        let store = Arc::new(store);
        Self::new(store.clone(), store.clone(), store, hasher, tokens)
    }

    pub fn tokens(&self) -> Arc<TokenIssuer> {
        self.identity.tokens().clone()
    }
}
