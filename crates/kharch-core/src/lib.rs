//! kharch-core
//!
//! Settlement engine and expense services for Kharch.
//! Depends on kharch-domain. No CLI, no terminal I/O; persistence is reached only through the `storage` traits.

pub mod aggregator;
pub mod audit;
pub mod balance_service;
pub mod error;
pub mod expense_service;
pub mod format;
pub mod settlement_service;
pub mod stats_service;
pub mod storage;
pub mod summary_service;

pub use aggregator::*;
pub use audit::*;
pub use balance_service::*;
pub use error::CoreError;
pub use expense_service::*;
pub use settlement_service::*;
pub use stats_service::*;
pub use summary_service::*;
