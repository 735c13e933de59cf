//! Shared data models for all services.

pub mod catalog;
pub mod connection;
pub mod mapping;
pub mod transfer;

// Re-export commonly used types
pub use catalog::{ColumnsRequest, TableColumns};
pub use connection::{AuthMode, ConnectionTarget, Engine};
pub use mapping::ColumnMapping;
pub use transfer::{
    CopyOutcome, CopyReport, CopyRequest, MappingOverride, MappingProposal, MappingRequest,
    MappingRow, NothingToCopyReason, TableSelection,
};
