//! 表数据复制服务
//!
//! 提供列映射建议与一次性表复制：
//! - 按列名生成默认映射并应用用户修改
//! - 读取源表映射列，逐行写入目标表
//!
//! 二进制 `copy-service` 提供 HTTP 接口，`datacopy` 为读取配置文件的命令行版本。

pub mod executor;
pub mod handlers;
pub mod mapping;
pub mod routes;
pub mod service;
pub mod state;

use axum::{middleware, routing::get, Json, Router};
use common::middleware::request_id_middleware;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

pub use state::AppState;

pub const SERVICE_NAME: &str = "copy-service";
pub const DEFAULT_PORT: u16 = 8082;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "复制服务 API",
        version = "0.1.0",
        description = "按列映射复制表数据的微服务"
    ),
    paths(
        handlers::propose_mapping,
        handlers::run_copy,
        handlers::health_check,
    ),
    components(schemas(
        common::models::ConnectionTarget,
        common::models::Engine,
        common::models::AuthMode,
        common::models::TableSelection,
        common::models::MappingOverride,
        common::models::MappingRequest,
        common::models::MappingRow,
        common::models::MappingProposal,
        common::models::CopyRequest,
        common::models::CopyOutcome,
        common::models::CopyReport,
        common::models::NothingToCopyReason,
        handlers::HealthResponse,
    )),
    tags(
        (name = "copy", description = "映射与复制端点"),
        (name = "health", description = "健康检查端点")
    )
)]
pub struct ApiDoc;

/// Builds the service router with CORS, tracing and request-id layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
