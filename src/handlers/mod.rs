mod extract;
mod poll;
mod system;
mod vote;

use crate::config::Config;
use crate::credentials::Session;
use crate::db::{DataObject, Database, LockId, LockTag, StoreError};
use crate::error::AppError;
use crate::models::Poll;
use crate::voting::reconcile;
use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

pub struct AppState {
    pub database: Arc<Database>,
    pub config: Config,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(database: Arc<Database>, config: Config) -> Arc<Self> {
        Arc::new(Self {
            database,
            config,
            started_at: Utc::now(),
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::PUT, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(system::hello))
        .route("/system/health", get(system::health))
        .route("/visitor", get(system::get_visitor))
        .route("/poll", get(poll::get_poll).put(poll::update_poll))
        .route("/vote", post(vote::vote))
        .route("/admin/reset", post(poll::reset_poll))
        .layer(cors)
        .with_state(state)
}

// --- Data object helpers shared by the poll routes ---

fn poll_to_object(poll: &Poll) -> Result<DataObject, StoreError> {
    to_object(poll)
}

fn to_object<T: Serialize>(value: &T) -> Result<DataObject, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        Value::Array(_) => Err(StoreError::NotAnObject("array")),
        _ => Err(StoreError::NotAnObject("scalar")),
    }
}

fn poll_from_object(data: DataObject) -> Result<Poll, StoreError> {
    Ok(serde_json::from_value(Value::Object(data))?)
}

/// Fetches the asset's poll, writing the default poll first if the asset has
/// never been initialized.
async fn load_poll(state: &AppState, session: &Session) -> Result<Poll, AppError> {
    let context = "Error getting poll from dropped asset";

    if let Some(data) = state
        .database
        .fetch_data_object(&session.asset_id)
        .await
        .map_err(AppError::store(context))?
    {
        if data.contains_key("displayMode") {
            return poll_from_object(data).map_err(AppError::store(context));
        }
    }

    let lock_id = LockId::bucketed(&session.asset_id, LockTag::Init, Utc::now(), state.config.init_lock_window);
    let default = poll_to_object(&reconcile::reset()).map_err(AppError::store(context))?;

    match state
        .database
        .set_data_object_if_absent(&session.asset_id, default, &lock_id)
        .await
    {
        Ok(true) => info!("Initialized poll data object for asset {}", session.asset_id),
        Ok(false) => {}
        // Someone else is initializing it right now
        Err(StoreError::LockConflict(lock)) => debug!("Init lock {} already held", lock),
        Err(e) => return Err(AppError::store("Error initializing dropped asset data object")(e)),
    }

    let data = state
        .database
        .fetch_data_object(&session.asset_id)
        .await
        .map_err(AppError::store(context))?
        .unwrap_or_default();

    poll_from_object(data).map_err(AppError::store(context))
}
