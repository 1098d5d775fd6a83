use axum::{http::StatusCode, response::Json};
use serde_json::{json, Value};

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "pong!"
    }))
}

/// Envelope for requests that matched no route.
pub async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "status": "fail",
            "message": "Resource not found"
        })),
    )
}
