use async_trait::async_trait;

use crate::contract::{
    error::UsersError,
    model::{NewUser, User, UserId},
};

/// In-process API of the users module (used by the CLI seeding command and
/// by anything else that lives in the same binary).
#[async_trait]
pub trait UsersApi: Send + Sync {
    async fn create_user(&self, new_user: NewUser) -> Result<User, UsersError>;

    async fn get_user(&self, id: UserId) -> Result<User, UsersError>;

    /// All users in creation order.
    async fn list_users(&self) -> Result<Vec<User>, UsersError>;
}
