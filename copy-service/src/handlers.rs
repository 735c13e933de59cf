//! Handler模块

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use common::errors::AppError;
use common::extract::AppJson;
use common::middleware::RequestId;
use common::models::transfer::{CopyReport, CopyRequest, MappingProposal, MappingRequest};
use common::response::ApiResponse;

use crate::service::{CopyService, CopyServiceTrait};
use crate::state::AppState;
use crate::SERVICE_NAME;

/// 生成列映射建议
///
/// 按列名精确匹配生成默认映射，再依次应用 `overrides`。
#[utoipa::path(
    post,
    path = "/api/mapping",
    tag = "copy",
    request_body = MappingRequest,
    responses(
        (status = 200, description = "映射表格", body = ApiResponse<MappingProposal>),
        (status = 400, description = "表名或列名无效"),
        (status = 502, description = "无法连接数据库")
    )
)]
pub async fn propose_mapping(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    AppJson(req): AppJson<MappingRequest>,
) -> Result<Json<ApiResponse<MappingProposal>>, AppError> {
    let service = CopyService::new(state.connector);
    let data = service.propose(req).await?;
    Ok(Json(
        ApiResponse::ok_with_service(data, SERVICE_NAME).with_request_id(request_id.0),
    ))
}

/// 执行复制
#[utoipa::path(
    post,
    path = "/api/copy",
    tag = "copy",
    request_body = CopyRequest,
    responses(
        (status = 200, description = "复制结果（含无操作情况）", body = ApiResponse<CopyReport>),
        (status = 400, description = "请求无效"),
        (status = 500, description = "语句执行失败"),
        (status = 502, description = "无法连接数据库")
    )
)]
pub async fn run_copy(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    AppJson(req): AppJson<CopyRequest>,
) -> Result<Json<ApiResponse<CopyReport>>, AppError> {
    let service = CopyService::new(state.connector);
    let report = service.copy(req).await?;
    let duration_ms = report.duration_ms;
    Ok(Json(
        ApiResponse::ok_with_service(report, SERVICE_NAME)
            .with_request_id(request_id.0)
            .with_duration(duration_ms),
    ))
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

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}
