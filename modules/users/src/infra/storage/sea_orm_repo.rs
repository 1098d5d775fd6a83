//! SeaORM-backed repository implementation for the domain port.
//!
//! This struct is generic over `C: ConnectionTrait`, so you can construct it
//! with a `DatabaseConnection` **or** a transactional connection.

use anyhow::Context;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, QueryOrder, Set, SqlErr};

use crate::contract::model::{NewUser, User, UserId};
use crate::domain::repo::{RepoError, UsersRepository};
use crate::infra::storage::entity::{ActiveModel as UserAM, Column, Entity as UserEntity};

/// SeaORM repository impl.
/// Holds a connection object; its lifetime/ownership is up to the caller.
pub struct SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[async_trait::async_trait]
impl<C> UsersRepository for SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn create(&self, new_user: NewUser) -> Result<User, RepoError> {
        let email = new_user.email.clone();
        let m = UserAM {
            username: Set(new_user.username),
            email: Set(new_user.email),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        match m.insert(&self.conn).await {
            Ok(model) => Ok(model.into()),
            Err(e) if is_unique_violation(&e) => Err(RepoError::DuplicateEmail { email }),
            Err(e) => Err(RepoError::Storage(
                anyhow::Error::new(e).context("insert failed"),
            )),
        }
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepoError> {
        let found = UserEntity::find_by_id(id.0)
            .one(&self.conn)
            .await
            .context("find_by_id failed")?;
        Ok(found.map(Into::into))
    }

    async fn list_all(&self) -> Result<Vec<User>, RepoError> {
        let rows = UserEntity::find()
            .order_by_asc(Column::Id)
            .all(&self.conn)
            .await
            .context("list_all failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
