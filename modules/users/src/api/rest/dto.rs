use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contract::model::{NewUser, User};

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAIL: &str = "fail";

/// `{ "status": ..., "message": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub status: String,
    pub message: String,
}

impl MessageEnvelope {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_FAIL.to_string(),
            message: message.into(),
        }
    }
}

/// `{ "status": "success", "data": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub status: String,
    pub data: T,
}

impl<T> DataEnvelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            data,
        }
    }
}

/// REST DTO for user representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// REST DTO for user list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListDto {
    pub users: Vec<UserDto>,
}

/// REST DTO for creating a new user.
///
/// Both fields are optional on the wire so a missing field is reported as
/// an invalid payload by the service rather than as a deserialization error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateUserReq {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id.0,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

impl From<CreateUserReq> for NewUser {
    fn from(req: CreateUserReq) -> Self {
        Self {
            username: req.username.unwrap_or_default(),
            email: req.email.unwrap_or_default(),
        }
    }
}
