use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Select, SqlErr,
};
use uuid::Uuid;

use crate::{
    entity::{self, Column, Entity},
    error::{UserError, UserResult},
    models::{Role, User},
    repository::UserRepository,
};

/// sea-orm backed store over the `users` table.
///
/// Email uniqueness is enforced by the `ux_users_email` unique index, which
/// covers soft-deleted rows; violations surface as `EmailTaken`.
#[derive(Clone)]
pub struct PgUserRepository {
    db: DatabaseConnection,
}

impl PgUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn active(role: Option<Role>) -> Select<Entity> {
        let mut query = Entity::find().filter(Column::DeletedAt.is_null());
        if let Some(role) = role {
            query = query.filter(Column::Role.eq(role));
        }
        query
    }
}

/// Translates driver errors, treating a unique violation as a taken email.
fn map_db_err(err: DbErr, email: Option<&str>) -> UserError {
    if let (Some(SqlErr::UniqueConstraintViolation(_)), Some(email)) = (err.sql_err(), email) {
        return UserError::EmailTaken(email.to_string());
    }

    match err {
        DbErr::ConnectionAcquire(e) => UserError::StoreUnavailable(e.to_string()),
        DbErr::RecordNotUpdated => UserError::Store("no row updated".to_string()),
        other => {
            tracing::error!(error = %other, "Database error");
            UserError::Store(other.to_string())
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> UserResult<User> {
        let email = user.email.clone();
        let model = entity::ActiveModel::from(user)
            .insert(&self.db)
            .await
            .map_err(|e| map_db_err(e, Some(&email)))?;

        tracing::debug!(user_id = %model.id, "Inserted user");
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let model = Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| map_db_err(e, None))?;

        Ok(model.map(Into::into))
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let model = Entity::find()
            .filter(Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(|e| map_db_err(e, None))?;

        Ok(model.map(Into::into))
    }

    async fn list(&self, role: Option<Role>) -> UserResult<Vec<User>> {
        let models = Self::active(role)
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| map_db_err(e, None))?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update(&self, user: User) -> UserResult<User> {
        let id = user.id;
        let email = user.email.clone();

        let model = entity::ActiveModel::from(user)
            .update(&self.db)
            .await
            .map_err(|e| match e {
                DbErr::RecordNotUpdated => UserError::NotFound(id),
                other => map_db_err(other, Some(&email)),
            })?;

        Ok(model.into())
    }

    async fn soft_delete(&self, id: Uuid) -> UserResult<u64> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();

        let result = Entity::update_many()
            .col_expr(Column::DeletedAt, Expr::value(now))
            .filter(Column::Id.eq(id))
            .filter(Column::DeletedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(|e| map_db_err(e, None))?;

        Ok(result.rows_affected)
    }

    async fn restore(&self, id: Uuid) -> UserResult<u64> {
        let result = Entity::update_many()
            .col_expr(
                Column::DeletedAt,
                Expr::value(Option::<sea_orm::prelude::DateTimeWithTimeZone>::None),
            )
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| map_db_err(e, None))?;

        Ok(result.rows_affected)
    }

    async fn is_email_taken(&self, email: &str, exclude_id: Option<Uuid>) -> UserResult<bool> {
        let mut condition = Condition::all()
            .add(Column::Email.eq(email))
            .add(Column::DeletedAt.is_null());
        if let Some(id) = exclude_id {
            condition = condition.add(Column::Id.ne(id));
        }

        let holders = Entity::find()
            .filter(condition)
            .count(&self.db)
            .await
            .map_err(|e| map_db_err(e, None))?;

        Ok(holders > 0)
    }

    async fn count(&self, role: Option<Role>) -> UserResult<u64> {
        Self::active(role)
            .count(&self.db)
            .await
            .map_err(|e| map_db_err(e, None))
    }
}
