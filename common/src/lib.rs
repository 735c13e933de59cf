//! Shared building blocks for the table copy services.
//!
//! - `config`: environment and profile-file configuration
//! - `errors`: the `AppError` type returned by every layer
//! - `response`: the JSON envelope used by all HTTP endpoints
//! - `extract`: `AppJson`, a JSON body extractor that rejects through `AppError`
//! - `middleware`: request-id propagation
//! - `models`: request/response models shared between services
//! - `db`: connection factory, SQL dialects and database sessions
//! - `utils`: identifier parsing and quoting

pub mod config;
pub mod db;
pub mod errors;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;

pub use errors::{AppError, AppResult};
