use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::contract::model::{NewUser, User, UserId};
use crate::domain::error::DomainError;
use crate::domain::repo::UsersRepository;

/// Domain service with business rules for user management.
/// Depends only on the repository port, not on infra types.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn UsersRepository>,
}

impl Service {
    pub fn new(repo: Arc<dyn UsersRepository>) -> Self {
        Self { repo }
    }

    #[instrument(
        name = "users.service.create_user",
        skip(self, new_user),
        fields(email = %new_user.email)
    )]
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, DomainError> {
        info!("Creating new user");

        Self::validate_new_user(&new_user)?;

        // Email uniqueness is decided by the store's constraint, not here.
        let user = self.repo.create(new_user).await?;

        info!(user_id = %user.id, "Successfully created user");
        Ok(user)
    }

    #[instrument(name = "users.service.get_user", skip(self), fields(user_id = %id))]
    pub async fn get_user(&self, id: UserId) -> Result<User, DomainError> {
        debug!("Getting user by id");

        let user = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(id))?;

        debug!("Successfully retrieved user");
        Ok(user)
    }

    /// Look a user up by a raw path segment. Anything that is not a positive
    /// integer cannot name a user and is reported as not found.
    #[instrument(name = "users.service.get_user_by_key", skip(self))]
    pub async fn get_user_by_key(&self, key: &str) -> Result<User, DomainError> {
        match key.trim().parse::<i32>() {
            Ok(raw) if raw > 0 => self.get_user(UserId(raw)).await,
            _ => {
                debug!("Key is not a valid user id");
                Err(DomainError::user_not_found(key))
            }
        }
    }

    #[instrument(name = "users.service.list_users", skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>, DomainError> {
        debug!("Listing users");

        let users = self.repo.list_all().await?;

        debug!("Successfully listed {} users", users.len());
        Ok(users)
    }

    fn validate_new_user(new_user: &NewUser) -> Result<(), DomainError> {
        if new_user.username.trim().is_empty() {
            return Err(DomainError::validation("username", "is required"));
        }
        if new_user.email.trim().is_empty() {
            return Err(DomainError::validation("email", "is required"));
        }
        Ok(())
    }
}
