//! 目录服务路由模块

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/catalog/databases", post(handlers::list_databases))
        .route("/api/catalog/tables", post(handlers::list_tables))
        .route("/api/catalog/columns", post(handlers::list_columns))
        .route("/api/catalog/test", post(handlers::test_connection))
        .route("/api/health", get(handlers::health_check))
}
