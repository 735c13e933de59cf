//! 路由模块

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/mapping", post(handlers::propose_mapping))
        .route("/api/copy", post(handlers::run_copy))
        .route("/api/health", get(handlers::health_check))
}
