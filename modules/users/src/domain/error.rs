use std::fmt::Display;

use thiserror::Error;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    /// `id` is the raw key that was looked up; it may not even be numeric.
    #[error("User not found: {id}")]
    UserNotFound { id: String },

    #[error("User with email '{email}' already exists")]
    EmailAlreadyExists { email: String },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn user_not_found(id: impl Display) -> Self {
        Self::UserNotFound { id: id.to_string() }
    }

    pub fn email_already_exists(email: String) -> Self {
        Self::EmailAlreadyExists { email }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }
}

impl From<crate::domain::repo::RepoError> for DomainError {
    fn from(e: crate::domain::repo::RepoError) -> Self {
        use crate::domain::repo::RepoError;
        match e {
            RepoError::DuplicateEmail { email } => Self::email_already_exists(email),
            // keep the whole chain, it only ends up in logs
            RepoError::Storage(source) => Self::database(format!("{source:#}")),
        }
    }
}
