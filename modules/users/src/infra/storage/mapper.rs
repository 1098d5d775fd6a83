use crate::contract::model::{User, UserId};
use crate::infra::storage::entity::Model as UserEntity;

impl From<UserEntity> for User {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: UserId(entity.id),
            username: entity.username,
            email: entity.email,
            created_at: entity.created_at,
        }
    }
}
