use axum::Json;
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

pub const SERVICE_NAME: &str = "Organization Manager API";
pub const SERVICE_VERSION: &str = "1.0.0";

pub async fn root() -> Json<Value> {
    Json(json!({ "message": SERVICE_NAME, "version": SERVICE_VERSION }))
}

pub async fn health() -> Json<Value> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(json!({ "status": "healthy", "timestamp": timestamp }))
}
