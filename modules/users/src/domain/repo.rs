use async_trait::async_trait;
use thiserror::Error;

use crate::contract::model::{NewUser, User, UserId};

#[derive(Debug, Error)]
pub enum RepoError {
    /// The unique constraint on `email` rejected the insert.
    #[error("email '{email}' is already registered")]
    DuplicateEmail { email: String },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Port for the domain layer: persistence operations the domain needs.
/// Object-safe and async-friendly via `async_trait`.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// Insert a user in a single constrained statement; the store assigns
    /// `id` and `created_at`.
    async fn create(&self, new_user: NewUser) -> Result<User, RepoError>;
    /// Load a user by id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepoError>;
    /// All users, ascending by id.
    async fn list_all(&self) -> Result<Vec<User>, RepoError>;
}
