use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::password::{PasswordError, PasswordHasher};
use super::token::TokenIssuer;
use crate::models::{Profile, User};
use crate::repository::{StoreError, UniqueField, UserRepository};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Username is already taken!")]
    UsernameTaken,
    #[error("Email is already in use!")]
    EmailTaken,
    /// Covers both an unknown username and a wrong password.
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Password must be at most 72 bytes")]
    PasswordTooLong,
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Hashing, signing or a blocking task failed.
    #[error("internal error: {0}")]
    Internal(String),
}

/// The result of a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Registration and authentication on top of the credential store.
///
/// Holds no mutable state of its own; clones share the store and issuer.
#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    tokens: Arc<TokenIssuer>,
    /// Checked against on an unknown username so that both login failures
    /// pay for one bcrypt verification. Built on first use.
    decoy_hash: Arc<OnceCell<String>>,
}

const DECOY_PASSWORD: &str = "tasksphere-decoy-credential";

impl IdentityService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: PasswordHasher,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn tokens(&self) -> &Arc<TokenIssuer> {
        &self.tokens
    }

    /// Creates a new account with the default role.
    ///
    /// The existence checks give the common case a clean answer, but the store's
    /// unique constraints are what actually guard against concurrent registrations:
    /// a conflict on insert is reported the same way as a failed check.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        profile: Profile,
    ) -> Result<User, IdentityError> {
        if self.users.exists_by_username(username).await? {
            debug!("Registration rejected: username {} is taken", username);
            return Err(IdentityError::UsernameTaken);
        }
        if self.users.exists_by_email(email).await? {
            debug!("Registration rejected: email for {} is in use", username);
            return Err(IdentityError::EmailTaken);
        }

        let password_hash = self.hash_password(password).await?;
        let user = User::new(username, email, password_hash, profile);

        let user = self.users.insert(user).await.map_err(|e| match e {
            StoreError::Conflict(UniqueField::Username) => IdentityError::UsernameTaken,
            StoreError::Conflict(UniqueField::Email) => IdentityError::EmailTaken,
            other => IdentityError::Store(other),
        })?;

        info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Checks a username/password pair and issues an access token.
    ///
    /// The user is looked up exactly once; the returned [`Session`] carries the
    /// record the password was checked against.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let user = match self.users.find_by_username(username).await? {
            Some(user) => user,
            None => {
                let decoy = self
                    .decoy_hash
                    .get_or_try_init(|| self.hash_password(DECOY_PASSWORD))
                    .await?;
                self.verify_password(password, decoy).await?;
                debug!("Login failed: no such user {}", username);
                return Err(IdentityError::InvalidCredentials);
            }
        };

        if !self.verify_password(password, &user.password_hash).await? {
            debug!("Login failed: wrong password for {}", username);
            return Err(IdentityError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(user.id, &user.username, user.role)
            .map_err(|e| {
                error!("Failed to sign token for {}: {}", user.username, e);
                IdentityError::Internal(e.to_string())
            })?;

        info!("User {} logged in", user.username);
        Ok(Session { token, user })
    }

    async fn hash_password(&self, password: &str) -> Result<String, IdentityError> {
        let hasher = self.hasher;
        let password = password.to_string();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| IdentityError::Internal(e.to_string()))?
            .map_err(|e| match e {
                PasswordError::TooLong(_) => IdentityError::PasswordTooLong,
                PasswordError::Bcrypt(e) => IdentityError::Internal(e.to_string()),
            })
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, IdentityError> {
        let hasher = self.hasher;
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| IdentityError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::AuthError;
    use crate::repository::MemoryStore;
    use async_trait::async_trait;
    use chrono::Duration;
    use futures::future::join_all;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn service_with(users: Arc<dyn UserRepository>) -> IdentityService {
        let tokens = TokenIssuer::new("identity_test_secret", Duration::hours(1)).unwrap();
        IdentityService::new(
            users,
            PasswordHasher::new(4 /* bcrypt's (private) MIN_COST */),
            Arc::new(tokens),
        )
    }

    fn profile(first: &str, last: &str) -> Profile {
        Profile {
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
        }
    }

    /// Answers "not taken" to every existence check, as if another request
    /// had registered the same name between the check and the insert.
    struct RacingStore(MemoryStore);

    #[async_trait]
    impl UserRepository for RacingStore {
        async fn exists_by_username(&self, _: &str) -> Result<bool, StoreError> {
            Ok(false)
        }

        async fn exists_by_email(&self, _: &str) -> Result<bool, StoreError> {
            Ok(false)
        }

        async fn insert(&self, user: User) -> Result<User, StoreError> {
            self.0.insert(user).await
        }

        async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
            self.0.find_by_username(username).await
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            self.0.find_by_id(id).await
        }
    }

    #[tokio::test]
    async fn test_register_then_authenticate_scenario() {
        let store = MemoryStore::new();
        let service = service_with(Arc::new(store.clone()));

        let alice = service
            .register("alice", "a@x.com", "secret1", profile("A", "L"))
            .await
            .unwrap();
        assert_eq!(alice.username, "alice");
        assert_eq!(alice.first_name.as_deref(), Some("A"));
        assert_ne!(alice.password_hash, "secret1");

        let dup = service
            .register("alice", "b@x.com", "secret2", profile("B", "M"))
            .await;
        assert!(matches!(dup, Err(IdentityError::UsernameTaken)));
        // Nothing was written for the rejected attempt.
        assert!(!store.exists_by_email("b@x.com").await.unwrap());

        let wrong = service.authenticate("alice", "wrong").await;
        assert!(matches!(wrong, Err(IdentityError::InvalidCredentials)));

        let session = service.authenticate("alice", "secret1").await.unwrap();
        assert_eq!(session.user.id, alice.id);
        let claims = service.tokens().verify(&session.token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.uid, alice.id);
    }

    #[tokio::test]
    async fn test_register_rejects_taken_email() {
        let service = service_with(Arc::new(MemoryStore::new()));
        service
            .register("alice", "a@x.com", "secret1", Profile::default())
            .await
            .unwrap();

        let result = service
            .register("bob", "a@x.com", "secret2", Profile::default())
            .await;
        assert!(matches!(result, Err(IdentityError::EmailTaken)));
        assert!(matches!(
            service.authenticate("bob", "secret2").await,
            Err(IdentityError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_negative_auth_is_indistinguishable() {
        let service = service_with(Arc::new(MemoryStore::new()));
        service
            .register("alice", "a@x.com", "secret1", Profile::default())
            .await
            .unwrap();

        let wrong_password = service.authenticate("alice", "nope").await.unwrap_err();
        let unknown_user = service.authenticate("nobody", "secret1").await.unwrap_err();

        assert!(matches!(wrong_password, IdentityError::InvalidCredentials));
        assert!(matches!(unknown_user, IdentityError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_password_prefix_does_not_authenticate() {
        let store = MemoryStore::new();
        let service = service_with(Arc::new(store.clone()));
        let prefix = "a".repeat(72);

        let too_long = service
            .register("alice", "a@x.com", &format!("{}X", prefix), Profile::default())
            .await;
        assert!(matches!(too_long, Err(IdentityError::PasswordTooLong)));
        assert!(!store.exists_by_username("alice").await.unwrap());

        service
            .register("alice", "a@x.com", &prefix, Profile::default())
            .await
            .unwrap();
        let result = service
            .authenticate("alice", &format!("{}Y", prefix))
            .await;
        assert!(matches!(result, Err(IdentityError::InvalidCredentials)));
        assert!(service.authenticate("alice", &prefix).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_user_still_runs_a_verification() {
        let service = service_with(Arc::new(MemoryStore::new()));
        assert!(!service.decoy_hash.initialized());

        let result = service.authenticate("nobody", "secret1").await;
        assert!(matches!(result, Err(IdentityError::InvalidCredentials)));
        let decoy = service.decoy_hash.get().unwrap();
        assert!(service.hasher.verify(DECOY_PASSWORD, decoy));

        // Clones share the decoy.
        assert!(service.clone().decoy_hash.initialized());
    }

    #[tokio::test]
    async fn test_insert_conflict_maps_to_taken() {
        let service = service_with(Arc::new(RacingStore(MemoryStore::new())));
        service
            .register("alice", "a@x.com", "secret1", Profile::default())
            .await
            .unwrap();

        let same_name = service
            .register("alice", "other@x.com", "secret1", Profile::default())
            .await;
        assert!(matches!(same_name, Err(IdentityError::UsernameTaken)));

        let same_email = service
            .register("bob", "a@x.com", "secret1", Profile::default())
            .await;
        assert!(matches!(same_email, Err(IdentityError::EmailTaken)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_admit_one() {
        let store = MemoryStore::new();
        let service = service_with(Arc::new(store.clone()));

        let attempts = (0..8).map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                let email = format!("alice{}@x.com", i);
                service
                    .register("alice", &email, "secret1", Profile::default())
                    .await
            })
        });
        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, IdentityError::UsernameTaken)));
    }

    #[tokio::test]
    async fn test_session_token_is_rejected_by_other_issuer() {
        let service = service_with(Arc::new(MemoryStore::new()));
        service
            .register("alice", "a@x.com", "secret1", Profile::default())
            .await
            .unwrap();
        let session = service.authenticate("alice", "secret1").await.unwrap();

        let other = TokenIssuer::new("some_other_secret", Duration::hours(1)).unwrap();
        assert_eq!(other.verify(&session.token), Err(AuthError::BadSignature));
    }
}
