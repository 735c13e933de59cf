//! 表复制服务模块

use std::time::Instant;

use async_trait::async_trait;
use validator::Validate;

use common::db::{release, Connector};
use common::errors::AppResult;
use common::models::connection::ConnectionTarget;
use common::models::transfer::{
    CopyOutcome, CopyReport, CopyRequest, MappingProposal, MappingRequest, NothingToCopyReason,
};
use common::utils::TableName;

use crate::executor::copy_with_mapping;
use crate::mapping::build_proposal;

/// 复制服务 Trait
#[async_trait]
pub trait CopyServiceTrait: Send + Sync {
    /// 读取两端列并生成默认映射（可叠加用户修改）
    async fn propose(&self, req: MappingRequest) -> AppResult<MappingProposal>;

    /// 按映射执行一次复制
    async fn copy(&self, req: CopyRequest) -> AppResult<CopyReport>;
}

/// 表数据复制服务
pub struct CopyService {
    connector: Connector,
}

impl CopyService {
    pub fn new(connector: Connector) -> Self {
        Self { connector }
    }

    async fn read_columns(&self, target: &ConnectionTarget, table: &TableName) -> AppResult<Vec<String>> {
        target.require_database()?;
        let mut session = self.connector.open(target).await?;
        let result = session.list_columns(table).await;
        release(session).await;
        result
    }
}

#[async_trait]
impl CopyServiceTrait for CopyService {
    async fn propose(&self, req: MappingRequest) -> AppResult<MappingProposal> {
        req.validate()?;
        let source_table = TableName::parse(&req.source.table)?;
        let destination_table = TableName::parse(&req.destination.table)?;

        let source_columns = self.read_columns(&req.source.connection, &source_table).await?;
        let destination_columns = self
            .read_columns(&req.destination.connection, &destination_table)
            .await?;

        let proposal = build_proposal(&source_columns, &destination_columns, &req.overrides)?;
        tracing::info!(
            source = %source_table,
            destination = %destination_table,
            mapped = proposal.mapping.len(),
            "生成列映射"
        );
        Ok(proposal)
    }

    async fn copy(&self, req: CopyRequest) -> AppResult<CopyReport> {
        let start = Instant::now();
        req.validate()?;
        let source_table = TableName::parse(&req.source.table)?;
        let destination_table = TableName::parse(&req.destination.table)?;

        // 映射为空时不打开任何连接
        if req.mapping.is_empty() {
            let outcome = CopyOutcome::NothingToDo {
                reason: NothingToCopyReason::NoColumnsMapped,
            };
            return Ok(CopyReport::new(outcome, start.elapsed().as_millis() as u64));
        }

        req.source.connection.require_database()?;
        req.destination.connection.require_database()?;

        let mut source = self.connector.open(&req.source.connection).await?;
        let mut destination = match self.connector.open(&req.destination.connection).await {
            Ok(session) => session,
            Err(e) => {
                release(source).await;
                return Err(e);
            }
        };

        let result = copy_with_mapping(
            source.as_mut(),
            destination.as_mut(),
            &source_table,
            &destination_table,
            &req.mapping,
        )
        .await;
        release(source).await;
        release(destination).await;

        let outcome = result?;
        let report = CopyReport::new(outcome, start.elapsed().as_millis() as u64);
        tracing::info!(rows = report.outcome.rows_copied(), duration_ms = report.duration_ms, "{}", report.message);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::errors::AppError;
    use common::models::mapping::ColumnMapping;
    use common::models::transfer::TableSelection;

    fn unreachable_server(table: &str) -> TableSelection {
        TableSelection {
            connection: ConnectionTarget::sql_server("localhost,1", Some("HR")),
            table: table.into(),
        }
    }

    #[tokio::test]
    async fn test_empty_mapping_never_connects() {
        let service = CopyService::new(Connector::default());
        let report = service
            .copy(CopyRequest {
                source: unreachable_server("dbo.Employees"),
                destination: unreachable_server("dbo.Staff"),
                mapping: ColumnMapping::new(),
            })
            .await
            .unwrap();
        assert_eq!(report.message, "No columns mapped. Nothing to copy.");
        assert_eq!(report.outcome.rows_copied(), 0);
    }

    #[tokio::test]
    async fn test_bad_table_name_rejected_before_connecting() {
        let service = CopyService::new(Connector::default());
        let err = service
            .copy(CopyRequest {
                source: unreachable_server("dbo."),
                destination: unreachable_server("dbo.Staff"),
                mapping: ColumnMapping::from_pairs([("Name", "FullName")]).unwrap(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidIdentifier(_)));
    }
}
