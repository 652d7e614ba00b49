//! Centralized error handling for IPTV Manager
//!
//! # Error Categories
//!
//! - **Source Errors**: transport timeouts, empty replies, unsupported
//!   envelope versions, incomplete records, missing files, fetch failures
//! - **Application Errors**: configuration, persistence and publishing
//!
//! # Usage
//!
//! ```rust
//! use iptv_manager::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Source Results
pub type SourceResult<T> = Result<T, SourceError>;
