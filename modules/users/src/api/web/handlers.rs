use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, Form},
    response::{Html, Redirect},
    Extension,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::api::rest::error::ApiError;
use crate::api::web::page::render_index;
use crate::contract::model::NewUser;
use crate::domain::service::Service;

#[derive(Debug, Default, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
}

pub async fn index(Extension(svc): Extension<Arc<Service>>) -> Result<Html<String>, ApiError> {
    let users = svc.list_users().await?;
    Ok(Html(render_index(&users)))
}

/// Best-effort create from the index form; always lands back on `/`.
pub async fn create_from_form(
    Extension(svc): Extension<Arc<Service>>,
    form: Result<Form<UserForm>, FormRejection>,
) -> Redirect {
    match form {
        Ok(Form(form)) => match svc.create_user(NewUser::new(form.username, form.email)).await {
            Ok(user) => info!(user_id = %user.id, "User created from form"),
            Err(e) => warn!(error = %e, "Form submission did not create a user"),
        },
        Err(rejection) => warn!(error = %rejection, "Unreadable form submission"),
    }

    Redirect::to("/")
}
