use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{Role, User};

/// Persistence boundary for users.
///
/// Reads by id or email see soft-deleted rows too; `list` and `count` only
/// see active ones. Email is unique across every row, soft-deleted ones
/// included, and an implementation must reject a write that would break that
/// with [`UserError::EmailTaken`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> UserResult<User>;

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>>;

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>>;

    /// Active users, oldest first
    async fn list(&self, role: Option<Role>) -> UserResult<Vec<User>>;

    /// Replaces every stored field except `deleted_at`
    async fn update(&self, user: User) -> UserResult<User>;

    /// Sets `deleted_at` on an active user. Returns the rows affected.
    async fn soft_delete(&self, id: Uuid) -> UserResult<u64>;

    /// Clears `deleted_at` whether or not it was set. Returns the rows matched.
    /// Never conflicts, since a soft-deleted row keeps its address.
    async fn restore(&self, id: Uuid) -> UserResult<u64>;

    /// Whether an active user other than `exclude_id` holds `email`
    async fn is_email_taken(&self, email: &str, exclude_id: Option<Uuid>) -> UserResult<bool>;

    async fn count(&self, role: Option<Role>) -> UserResult<u64>;
}

/// In-process store with the same visibility and uniqueness rules as the
/// PostgreSQL one.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Any row holding `email`, deleted or not; mirrors the unique index
fn holder<'a>(
    users: &'a HashMap<Uuid, User>,
    email: &str,
    exclude_id: Option<Uuid>,
) -> Option<&'a User> {
    users
        .values()
        .find(|u| u.email == email && Some(u.id) != exclude_id)
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> UserResult<User> {
        let mut users = self.users.write().await;

        if holder(&users, &user.email, None).is_some() {
            return Err(UserError::EmailTaken(user.email));
        }

        users.insert(user.id, user.clone());
        tracing::debug!(user_id = %user.id, "Inserted user");
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(holder(&users, email, None).cloned())
    }

    async fn list(&self, role: Option<Role>) -> UserResult<Vec<User>> {
        let users = self.users.read().await;

        let mut result: Vec<User> = users
            .values()
            .filter(|u| u.is_active() && role.is_none_or(|r| u.role == r))
            .cloned()
            .collect();
        result.sort_by_key(|u| (u.created_at, u.id));

        Ok(result)
    }

    async fn update(&self, user: User) -> UserResult<User> {
        let mut users = self.users.write().await;

        let Some(stored) = users.get(&user.id) else {
            return Err(UserError::NotFound(user.id));
        };
        let deleted_at = stored.deleted_at;

        if holder(&users, &user.email, Some(user.id)).is_some() {
            return Err(UserError::EmailTaken(user.email));
        }

        let user = User { deleted_at, ..user };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn soft_delete(&self, id: Uuid) -> UserResult<u64> {
        let mut users = self.users.write().await;

        match users.get_mut(&id) {
            Some(user) if user.is_active() => {
                user.deleted_at = Some(Utc::now());
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn restore(&self, id: Uuid) -> UserResult<u64> {
        let mut users = self.users.write().await;

        match users.get_mut(&id) {
            Some(user) => {
                user.deleted_at = None;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn is_email_taken(&self, email: &str, exclude_id: Option<Uuid>) -> UserResult<bool> {
        let users = self.users.read().await;

        let taken = users
            .values()
            .any(|u| u.is_active() && u.email == email && Some(u.id) != exclude_id);

        Ok(taken)
    }

    async fn count(&self, role: Option<Role>) -> UserResult<u64> {
        let users = self.users.read().await;

        let count = users
            .values()
            .filter(|u| u.is_active() && role.is_none_or(|r| u.role == r))
            .count();

        Ok(count as u64)
    }
}
