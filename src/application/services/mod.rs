//! Application services

pub mod chart;
pub mod storage;

pub use chart::{BoardExport, ChartService};
pub use storage::{ChartDocument, StorageService};
