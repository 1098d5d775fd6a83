//! Table bootstrap straight from the entity definition.

use sea_orm::{sea_query::Table, ConnectionTrait, DbErr, Schema};
use tracing::info;

use crate::infra::storage::entity::Entity as UserEntity;

/// `CREATE TABLE IF NOT EXISTS users (...)` for the connected backend.
pub async fn ensure_schema<C: ConnectionTrait>(conn: &C) -> Result<(), DbErr> {
    let backend = conn.get_database_backend();
    let mut stmt = Schema::new(backend).create_table_from_entity(UserEntity);
    stmt.if_not_exists();

    conn.execute(backend.build(&stmt)).await?;
    info!("users table ready");
    Ok(())
}

/// `DROP TABLE IF EXISTS users`.
pub async fn drop_schema<C: ConnectionTrait>(conn: &C) -> Result<(), DbErr> {
    let backend = conn.get_database_backend();
    let stmt = Table::drop().table(UserEntity).if_exists().to_owned();

    conn.execute(backend.build(&stmt)).await?;
    info!("users table dropped");
    Ok(())
}
