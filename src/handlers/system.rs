use super::AppState;
use super::extract::ApiQuery;
use crate::credentials::Credentials;
use crate::error::AppError;
use crate::models::{HealthResponse, VisitorResponse};
use axum::{Json, extract::State};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

pub async fn hello() -> Json<Value> {
    Json(json!({ "message": "Hello from server!" }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let config = &state.config;
    let envs = HashMap::from([
        ("NODE_ENV".to_string(), config.node_env.clone()),
        ("INSTANCE_DOMAIN".to_string(), config.instance_domain.clone()),
        ("INTERACTIVE_KEY".to_string(), config.interactive_key.clone()),
        ("S3_BUCKET".to_string(), config.s3_bucket.clone()),
    ]);

    Json(HealthResponse {
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        status: "OK".to_string(),
        server_start_date: state.started_at,
        envs,
    })
}

pub async fn get_visitor(
    State(state): State<Arc<AppState>>,
    ApiQuery(credentials): ApiQuery<Credentials>,
) -> Result<Json<VisitorResponse>, AppError> {
    let session = credentials.resolve(state.config.interactive_key.as_deref())?;

    Ok(Json(VisitorResponse {
        visitor: session.visitor(&state.config),
        success: true,
    }))
}
