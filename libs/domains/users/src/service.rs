use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{UserError, UserResult};
use crate::hasher::CredentialHasher;
use crate::models::{CreateUser, LoginRequest, Role, UpdateUser, User, UserResponse, UserStats};
use crate::repository::UserRepository;

/// User lifecycle, authentication and statistics on top of a [`UserRepository`].
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
    hasher: CredentialHasher,
    deadline: Option<Duration>,
}

impl<R: UserRepository> Clone for UserService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            hasher: self.hasher.clone(),
            deadline: self.deadline,
        }
    }
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
            hasher: CredentialHasher::new(),
            deadline: None,
        }
    }

    pub fn with_hasher(mut self, hasher: CredentialHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Bound every store call; an elapsed deadline is `StoreUnavailable`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    async fn store<T, F>(&self, operation: &'static str, call: F) -> UserResult<T>
    where
        F: Future<Output = UserResult<T>>,
    {
        let Some(deadline) = self.deadline else {
            return call.await;
        };

        tokio::time::timeout(deadline, call).await.unwrap_or_else(|_| {
            tracing::warn!(operation, ?deadline, "Store call exceeded deadline");
            Err(UserError::StoreUnavailable(format!(
                "{} timed out after {:?}",
                operation, deadline
            )))
        })
    }

    /// Argon2 work runs on the blocking pool, off the async workers.
    async fn blocking<T, F>(&self, work: F) -> UserResult<T>
    where
        F: FnOnce(CredentialHasher) -> UserResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let hasher = self.hasher.clone();

        tokio::task::spawn_blocking(move || work(hasher))
            .await
            .map_err(|e| UserError::Hashing(format!("hashing task failed: {}", e)))?
    }

    pub async fn create_user(&self, input: CreateUser) -> UserResult<UserResponse> {
        input.validate()?;
        let role = parse_role(input.role.as_deref().filter(|r| !r.is_empty()))?;

        if self
            .store("is_email_taken", self.repository.is_email_taken(&input.email, None))
            .await?
        {
            return Err(UserError::EmailTaken(input.email));
        }

        let CreateUser {
            name,
            email,
            password,
            ..
        } = input;
        let password_hash = self.blocking(move |hasher| hasher.hash(&password)).await?;
        let user = User::new(name, email, password_hash, role);

        let created = self.store("create", self.repository.create(user)).await?;
        tracing::info!(user_id = %created.id, role = %created.role, "Created user");
        Ok(created.into())
    }

    /// Returns soft-deleted users as well; check `deleted_at` for activity.
    pub async fn get_user(&self, id: Uuid) -> UserResult<UserResponse> {
        self.store("get_by_id", self.repository.get_by_id(id))
            .await?
            .map(Into::into)
            .ok_or(UserError::NotFound(id))
    }

    pub async fn get_user_by_email(&self, email: &str) -> UserResult<UserResponse> {
        self.store("get_by_email", self.repository.get_by_email(email))
            .await?
            .map(Into::into)
            .ok_or_else(|| UserError::EmailNotFound(email.to_string()))
    }

    pub async fn list_users(&self) -> UserResult<Vec<UserResponse>> {
        let users = self.store("list", self.repository.list(None)).await?;
        Ok(users.into_iter().map(Into::into).collect())
    }

    /// Rejects anything but `admin` / `client` before touching the store.
    pub async fn list_users_by_role(&self, role: &str) -> UserResult<Vec<UserResponse>> {
        let role = parse_role(Some(role))?;
        let users = self.store("list", self.repository.list(Some(role))).await?;
        Ok(users.into_iter().map(Into::into).collect())
    }

    pub async fn update_user(&self, id: Uuid, input: UpdateUser) -> UserResult<UserResponse> {
        input.validate()?;

        let mut user = self
            .store("get_by_id", self.repository.get_by_id(id))
            .await?
            .ok_or(UserError::NotFound(id))?;

        if let Some(name) = input.name() {
            user.name = name.to_string();
        }

        if let Some(email) = input.email().filter(|email| *email != user.email) {
            if self
                .store("is_email_taken", self.repository.is_email_taken(email, Some(id)))
                .await?
            {
                return Err(UserError::EmailTaken(email.to_string()));
            }
            user.email = email.to_string();
        }

        if let Some(password) = input.password().map(str::to_string) {
            user.password_hash = self.blocking(move |hasher| hasher.hash(&password)).await?;
        }

        if let Some(role) = input.role() {
            user.role = parse_role(Some(role))?;
        }

        user.updated_at = Utc::now();

        let updated = self.store("update", self.repository.update(user)).await?;
        tracing::info!(user_id = %id, "Updated user");
        Ok(updated.into())
    }

    /// Soft delete; an unknown or already deleted id is `NotFound`.
    pub async fn delete_user(&self, id: Uuid) -> UserResult<()> {
        let affected = self.store("soft_delete", self.repository.soft_delete(id)).await?;
        if affected == 0 {
            return Err(UserError::NotFound(id));
        }

        tracing::info!(user_id = %id, "Soft-deleted user");
        Ok(())
    }

    /// Clears `deleted_at`. Restoring an active user succeeds as a no-op.
    pub async fn restore_user(&self, id: Uuid) -> UserResult<()> {
        let matched = self.store("restore", self.repository.restore(id)).await?;
        if matched == 0 {
            return Err(UserError::NotFound(id));
        }

        tracing::info!(user_id = %id, "Restored user");
        Ok(())
    }

    /// Unknown email and wrong password fail identically, and both pay for
    /// one Argon2 verification.
    pub async fn authenticate(&self, input: LoginRequest) -> UserResult<UserResponse> {
        input.validate()?;
        let LoginRequest { email, password } = input;

        let Some(user) = self
            .store("get_by_email", self.repository.get_by_email(&email))
            .await?
        else {
            if let Err(e) = self
                .blocking(move |hasher| hasher.verify_decoy(&password))
                .await
            {
                tracing::warn!(error = %e, "Decoy verification failed");
            }
            tracing::debug!("Login rejected");
            return Err(UserError::InvalidCredentials);
        };

        let stored = user.password_hash.clone();
        let matches = self
            .blocking(move |hasher| hasher.verify(&stored, &password))
            .await?;

        if !matches {
            tracing::debug!(user_id = %user.id, "Login rejected");
            return Err(UserError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User authenticated");
        Ok(user.into())
    }

    /// Active users
    pub async fn count(&self) -> UserResult<u64> {
        self.store("count", self.repository.count(None)).await
    }

    pub async fn count_by_role(&self, role: &str) -> UserResult<u64> {
        let role = parse_role(Some(role))?;
        self.store("count", self.repository.count(Some(role))).await
    }

    /// Three independent reads, not a snapshot.
    pub async fn stats(&self) -> UserResult<UserStats> {
        Ok(UserStats {
            total: self.count().await?,
            admins: self.store("count", self.repository.count(Some(Role::Admin))).await?,
            clients: self.store("count", self.repository.count(Some(Role::Client))).await?,
        })
    }
}

/// `None` means the default role.
fn parse_role(role: Option<&str>) -> UserResult<Role> {
    match role {
        None => Ok(Role::default()),
        Some(raw) => Role::from_str(raw).map_err(|_| UserError::InvalidRole(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryUserRepository, MockUserRepository};
    use mockall::predicate::eq;

    fn fast_hasher() -> CredentialHasher {
        CredentialHasher::with_params(256, 1, 1).unwrap()
    }

    fn service_with<R: UserRepository>(repo: R) -> UserService<R> {
        UserService::new(repo).with_hasher(fast_hasher())
    }

    fn in_memory() -> UserService<InMemoryUserRepository> {
        service_with(InMemoryUserRepository::new())
    }

    fn ann() -> CreateUser {
        CreateUser {
            name: "Ann".into(),
            email: "ann@x.com".into(),
            password: "secret1".into(),
            role: None,
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    fn stored(email: &str, password_hash: String) -> User {
        User::new("Ann".into(), email.into(), password_hash, Role::Client)
    }

    #[tokio::test]
    async fn test_create_user_defaults_to_client() {
        let mut mock = MockUserRepository::new();
        mock.expect_is_email_taken()
            .times(1)
            .returning(|_, _| Ok(false));
        mock.expect_create()
            .times(1)
            .withf(|user| user.role == Role::Client && user.password_hash != "secret1")
            .returning(|user| Ok(user));

        let created = service_with(mock).create_user(ann()).await.unwrap();

        assert_eq!(created.name, "Ann");
        assert_eq!(created.role, Role::Client);
        assert!(created.deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_create_user_with_taken_email() {
        let mut mock = MockUserRepository::new();
        mock.expect_is_email_taken()
            .times(1)
            .returning(|_, _| Ok(true));
        mock.expect_create().never();

        let result = service_with(mock).create_user(ann()).await;
        assert!(matches!(result, Err(UserError::EmailTaken(email)) if email == "ann@x.com"));
    }

    #[tokio::test]
    async fn test_create_user_invalid_input_never_reaches_store() {
        let mut mock = MockUserRepository::new();
        mock.expect_is_email_taken().never();
        mock.expect_create().never();

        let input = CreateUser {
            name: "A".into(),
            email: "nope".into(),
            ..ann()
        };
        let result = service_with(mock).create_user(input).await;

        let Err(UserError::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert_eq!(errors.field_errors().len(), 2);
    }

    #[tokio::test]
    async fn test_store_constraint_violation_surfaces_as_taken() {
        // The pre-check passes but the insert loses the race
        let mut mock = MockUserRepository::new();
        mock.expect_is_email_taken().returning(|_, _| Ok(false));
        mock.expect_create()
            .returning(|user| Err(UserError::EmailTaken(user.email)));

        let result = service_with(mock).create_user(ann()).await;
        assert!(matches!(result, Err(UserError::EmailTaken(_))));
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let id = Uuid::now_v7();
        let mut mock = MockUserRepository::new();
        mock.expect_get_by_id()
            .with(eq(id))
            .times(1)
            .returning(|_| Ok(None));

        let result = service_with(mock).get_user(id).await;
        assert!(matches!(result, Err(UserError::NotFound(missing)) if missing == id));
    }

    #[tokio::test]
    async fn test_get_user_by_email_not_found() {
        let mut mock = MockUserRepository::new();
        mock.expect_get_by_email().returning(|_| Ok(None));

        let result = service_with(mock).get_user_by_email("ghost@x.com").await;
        assert!(matches!(result, Err(UserError::EmailNotFound(email)) if email == "ghost@x.com"));
    }

    #[tokio::test]
    async fn test_list_by_unknown_role_is_rejected_before_store() {
        let mut mock = MockUserRepository::new();
        mock.expect_list().never();

        let result = service_with(mock).list_users_by_role("superuser").await;
        assert!(matches!(result, Err(UserError::InvalidRole(role)) if role == "superuser"));
    }

    #[tokio::test]
    async fn test_list_by_role_filters_in_store() {
        let mut mock = MockUserRepository::new();
        mock.expect_list()
            .with(eq(Some(Role::Admin)))
            .times(1)
            .returning(|_| Ok(vec![]));

        let users = service_with(mock).list_users_by_role("admin").await.unwrap();
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_user_is_not_found() {
        let id = Uuid::now_v7();
        let mut mock = MockUserRepository::new();
        mock.expect_soft_delete()
            .with(eq(id))
            .returning(|_| Ok(0));

        let result = service_with(mock).delete_user(id).await;
        assert!(matches!(result, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_restore_unknown_user_is_not_found() {
        let mut mock = MockUserRepository::new();
        mock.expect_restore().returning(|_| Ok(0));

        let result = service_with(mock).restore_user(Uuid::now_v7()).await;
        assert!(matches!(result, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_authenticate_failures_are_indistinguishable() {
        let hash = fast_hasher().hash("secret1").unwrap();
        let mut mock = MockUserRepository::new();
        mock.expect_get_by_email()
            .times(2)
            .returning(move |email| {
                Ok((email == "ann@x.com").then(|| stored("ann@x.com", hash.clone())))
            });
        let service = service_with(mock);

        let wrong_password = service
            .authenticate(login("ann@x.com", "wrong"))
            .await
            .unwrap_err();
        let unknown_email = service
            .authenticate(login("ghost@x.com", "secret1"))
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, UserError::InvalidCredentials));
        assert!(matches!(unknown_email, UserError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_authenticate_unknown_email_still_verifies() {
        let mut mock = MockUserRepository::new();
        mock.expect_get_by_email().times(1).returning(|_| Ok(None));
        let service = service_with(mock);

        assert!(service.hasher.decoy.get().is_none());

        let result = service.authenticate(login("ghost@x.com", "secret1")).await;

        assert!(matches!(result, Err(UserError::InvalidCredentials)));
        assert!(service.hasher.decoy.get().is_some());
    }

    #[tokio::test]
    async fn test_hashing_runs_on_blocking_pool() {
        let service = service_with(MockUserRepository::new());
        let runtime_thread = std::thread::current().id();

        let worker_thread = service
            .blocking(|_| Ok(std::thread::current().id()))
            .await
            .unwrap();

        assert_ne!(worker_thread, runtime_thread);
    }

    #[tokio::test]
    async fn test_update_unknown_user_is_not_found() {
        let id = Uuid::now_v7();
        let mut mock = MockUserRepository::new();
        mock.expect_get_by_id()
            .with(eq(id))
            .times(1)
            .returning(|_| Ok(None));
        mock.expect_is_email_taken().never();
        mock.expect_update().never();

        let update = UpdateUser {
            name: Some("Annie".into()),
            ..Default::default()
        };
        let result = service_with(mock).update_user(id, update).await;
        assert!(matches!(result, Err(UserError::NotFound(missing)) if missing == id));
    }

    #[tokio::test]
    async fn test_authenticate_with_corrupt_hash_is_fatal() {
        let mut mock = MockUserRepository::new();
        mock.expect_get_by_email()
            .returning(|email| Ok(Some(stored(email, "garbage".into()))));

        let result = service_with(mock)
            .authenticate(login("ann@x.com", "secret1"))
            .await;
        assert!(matches!(result, Err(UserError::Hashing(_))));
    }

    #[tokio::test]
    async fn test_update_with_taken_email() {
        let existing = stored("ann@x.com", "hash".into());
        let id = existing.id;
        let mut mock = MockUserRepository::new();
        mock.expect_get_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        mock.expect_is_email_taken()
            .withf(move |_, exclude| *exclude == Some(id))
            .returning(|_, _| Ok(true));
        mock.expect_update().never();

        let update = UpdateUser {
            email: Some("bob@x.com".into()),
            ..Default::default()
        };
        let result = service_with(mock).update_user(id, update).await;
        assert!(matches!(result, Err(UserError::EmailTaken(email)) if email == "bob@x.com"));
    }

    #[tokio::test]
    async fn test_update_same_email_skips_uniqueness_check() {
        let existing = stored("ann@x.com", "hash".into());
        let id = existing.id;
        let mut mock = MockUserRepository::new();
        mock.expect_get_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        mock.expect_is_email_taken().never();
        mock.expect_update().returning(|user| Ok(user));

        let update = UpdateUser {
            email: Some("ann@x.com".into()),
            ..Default::default()
        };
        assert!(service_with(mock).update_user(id, update).await.is_ok());
    }

    #[tokio::test]
    async fn test_store_deadline_maps_to_unavailable() {
        let mut mock = MockUserRepository::new();
        mock.expect_count().returning(|_| Ok(1));
        let service = service_with(mock).with_deadline(Duration::from_millis(50));

        assert_eq!(service.count().await.unwrap(), 1);

        let slow = service
            .store("count", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(0u64)
            })
            .await;
        assert!(matches!(slow, Err(UserError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_stats_combines_counts() {
        let mut mock = MockUserRepository::new();
        mock.expect_count().with(eq(None)).returning(|_| Ok(5));
        mock.expect_count()
            .with(eq(Some(Role::Admin)))
            .returning(|_| Ok(2));
        mock.expect_count()
            .with(eq(Some(Role::Client)))
            .returning(|_| Ok(3));

        let stats = service_with(mock).stats().await.unwrap();
        assert_eq!(
            stats,
            UserStats {
                total: 5,
                admins: 2,
                clients: 3
            }
        );
    }

    #[tokio::test]
    async fn test_update_empty_name_keeps_existing() {
        let service = in_memory();
        let created = service.create_user(ann()).await.unwrap();

        let updated = service
            .update_user(
                created.id,
                UpdateUser {
                    name: Some(String::new()),
                    role: Some("admin".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Ann");
        assert_eq!(updated.role, Role::Admin);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_password_changes_credentials() {
        let service = in_memory();
        let created = service.create_user(ann()).await.unwrap();

        service
            .update_user(
                created.id,
                UpdateUser {
                    password: Some("changed1".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(service.authenticate(login("ann@x.com", "secret1")).await.is_err());
        assert!(service.authenticate(login("ann@x.com", "changed1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_then_restore_preserves_fields() {
        let service = in_memory();
        let created = service.create_user(ann()).await.unwrap();

        service.delete_user(created.id).await.unwrap();
        service.restore_user(created.id).await.unwrap();

        assert_eq!(service.get_user(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_restore_active_user_is_noop_success() {
        let service = in_memory();
        let created = service.create_user(ann()).await.unwrap();

        service.restore_user(created.id).await.unwrap();
        assert_eq!(service.get_user(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_second_create_with_same_email_fails() {
        let service = in_memory();
        service.create_user(ann()).await.unwrap();

        let result = service
            .create_user(CreateUser {
                name: "Annette".into(),
                ..ann()
            })
            .await;
        assert!(matches!(result, Err(UserError::EmailTaken(_))));
    }

    #[tokio::test]
    async fn test_deleted_email_cannot_be_reregistered_and_owner_restores() {
        let service = in_memory();
        let owner = service.create_user(ann()).await.unwrap();
        service.delete_user(owner.id).await.unwrap();

        let result = service
            .create_user(CreateUser {
                name: "Ann Two".into(),
                ..ann()
            })
            .await;
        assert!(matches!(result, Err(UserError::EmailTaken(email)) if email == "ann@x.com"));

        service.restore_user(owner.id).await.unwrap();
        assert!(service.get_user(owner.id).await.unwrap().deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_user_lifecycle_scenario() {
        let service = in_memory();
        let clients_before = service.count_by_role("client").await.unwrap();

        let ann = service.create_user(ann()).await.unwrap();
        assert_eq!(ann.role, Role::Client);
        assert_eq!(
            service.count_by_role("client").await.unwrap(),
            clients_before + 1
        );

        let authed = service
            .authenticate(login("ann@x.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(authed.id, ann.id);
        assert!(matches!(
            service.authenticate(login("ann@x.com", "wrong")).await,
            Err(UserError::InvalidCredentials)
        ));

        service.delete_user(ann.id).await.unwrap();
        assert!(service.list_users().await.unwrap().iter().all(|u| u.id != ann.id));

        let deleted = service.get_user(ann.id).await.unwrap();
        assert_eq!(deleted.name, "Ann");
        assert!(deleted.deleted_at.is_some());

        service.restore_user(ann.id).await.unwrap();
        assert!(service.list_users().await.unwrap().iter().any(|u| u.id == ann.id));
    }
}
