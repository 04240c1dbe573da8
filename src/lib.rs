//! Org-chart hierarchy engine
//!
//! Builds reporting forests from flat person records, filters them, lays them
//! out as top-down trees and tracks the viewport and pointer interaction a
//! canvas front end needs.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
