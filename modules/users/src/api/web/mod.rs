//! Server-rendered index page with a create form.

pub mod handlers;
pub mod page;

use std::sync::Arc;

use axum::{routing::get, Extension, Router};

use crate::domain::service::Service;

pub fn register_routes(router: Router, service: Arc<Service>) -> Router {
    router
        .route("/", get(handlers::index).post(handlers::create_from_form))
        .layer(Extension(service))
}
