use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::api::{rest, web};
use crate::contract::client::UsersApi;
use crate::domain::service::Service;
use crate::gateways::local::UsersLocalClient;
use crate::infra::storage::{schema, SeaOrmUsersRepository};

/// Wiring for the users module: repository -> service -> REST/web/local client.
#[derive(Clone)]
pub struct UsersModule {
    conn: DatabaseConnection,
    service: Arc<Service>,
}

impl UsersModule {
    /// Build the module on top of an open database handle.
    pub fn new(db: &db::DbHandle) -> Self {
        Self::from_connection(db.sea())
    }

    pub fn from_connection(conn: DatabaseConnection) -> Self {
        let repo = SeaOrmUsersRepository::new(conn.clone());
        let service = Arc::new(Service::new(Arc::new(repo)));
        Self { conn, service }
    }

    /// Create the `users` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        schema::ensure_schema(&self.conn).await?;
        Ok(())
    }

    /// Drop and recreate the `users` table. All data is lost.
    pub async fn recreate_schema(&self) -> anyhow::Result<()> {
        info!("Recreating users table");
        schema::drop_schema(&self.conn).await?;
        schema::ensure_schema(&self.conn).await?;
        Ok(())
    }

    /// Connection the module's repository runs on.
    pub fn connection(&self) -> DatabaseConnection {
        self.conn.clone()
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    /// In-process client backed by the same service.
    pub fn client(&self) -> Arc<dyn UsersApi> {
        Arc::new(UsersLocalClient::new(self.service.clone()))
    }

    /// REST API and server-rendered page, ready to be merged into the host router.
    pub fn router(&self) -> Router {
        info!("Registering users routes");
        let router = rest::routes::register_routes(Router::new(), self.service.clone());
        web::register_routes(router, self.service.clone())
    }
}
