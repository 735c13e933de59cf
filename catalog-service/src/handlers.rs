//! Handler模块

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use common::errors::AppError;
use common::extract::AppJson;
use common::middleware::RequestId;
use common::models::catalog::{ColumnsRequest, TableColumns};
use common::models::connection::ConnectionTarget;
use common::response::ApiResponse;

use crate::service::{CatalogService, CatalogServiceTrait};
use crate::state::AppState;
use crate::SERVICE_NAME;

/// 列出服务器上的数据库
#[utoipa::path(
    post,
    path = "/api/catalog/databases",
    tag = "catalog",
    request_body = ConnectionTarget,
    responses(
        (status = 200, description = "数据库列表", body = ApiResponse<Vec<String>>),
        (status = 400, description = "连接参数无效"),
        (status = 502, description = "无法连接数据库")
    )
)]
pub async fn list_databases(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    AppJson(target): AppJson<ConnectionTarget>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let service = CatalogService::new(state.connector);
    let data = service.list_databases(target).await?;
    Ok(Json(
        ApiResponse::ok_with_service(data, SERVICE_NAME).with_request_id(request_id.0),
    ))
}

/// 列出所选数据库中的基础表
#[utoipa::path(
    post,
    path = "/api/catalog/tables",
    tag = "catalog",
    request_body = ConnectionTarget,
    responses(
        (status = 200, description = "数据表列表（schema.table）", body = ApiResponse<Vec<String>>),
        (status = 400, description = "未选择数据库"),
        (status = 502, description = "无法连接数据库")
    )
)]
pub async fn list_tables(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    AppJson(target): AppJson<ConnectionTarget>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let service = CatalogService::new(state.connector);
    let data = service.list_tables(target).await?;
    Ok(Json(
        ApiResponse::ok_with_service(data, SERVICE_NAME).with_request_id(request_id.0),
    ))
}

/// 列出表的列
#[utoipa::path(
    post,
    path = "/api/catalog/columns",
    tag = "catalog",
    request_body = ColumnsRequest,
    responses(
        (status = 200, description = "列名（按序号）", body = ApiResponse<TableColumns>),
        (status = 400, description = "表名无效")
    )
)]
pub async fn list_columns(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    AppJson(req): AppJson<ColumnsRequest>,
) -> Result<Json<ApiResponse<TableColumns>>, AppError> {
    let service = CatalogService::new(state.connector);
    let data = service.list_columns(req).await?;
    Ok(Json(
        ApiResponse::ok_with_service(data, SERVICE_NAME).with_request_id(request_id.0),
    ))
}

/// 测试数据库连接
///
/// 连接失败时仍返回 200，错误放在响应体中。
#[utoipa::path(
    post,
    path = "/api/catalog/test",
    tag = "catalog",
    request_body = ConnectionTarget,
    responses(
        (status = 200, description = "连接测试结果", body = ApiResponse<ConnectionTestResult>)
    )
)]
pub async fn test_connection(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    AppJson(target): AppJson<ConnectionTarget>,
) -> Json<ApiResponse<ConnectionTestResult>> {
    let target_label = target.label();
    let service = CatalogService::new(state.connector);
    let result = match service.test(target).await {
        Ok(latency_ms) => ConnectionTestResult {
            target: target_label,
            success: true,
            latency_ms: Some(latency_ms),
            error: None,
        },
        Err(e) => {
            tracing::warn!(target_db = %target_label, error = %e, "连接测试失败");
            ConnectionTestResult {
                target: target_label,
                success: false,
                latency_ms: None,
                error: Some(e.to_string()),
            }
        }
    };
    Json(ApiResponse::ok_with_service(result, SERVICE_NAME).with_request_id(request_id.0))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// 连接测试结果
#[derive(Serialize, ToSchema)]
pub struct ConnectionTestResult {
    /// 服务器/数据库标签
    pub target: String,
    pub success: bool,
    /// 连接延迟（毫秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}
