use std::sync::Arc;

use axum::{routing::get, Extension, Router};

use crate::api::rest::handlers;
use crate::domain::service::Service;

/// JSON API under `/users`.
pub fn register_routes(router: Router, service: Arc<Service>) -> Router {
    router
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        // static segment wins over `{id}`
        .route("/users/ping", get(handlers::ping))
        .route("/users/{id}", get(handlers::get_user))
        .layer(Extension(service))
}
