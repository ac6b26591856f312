//! Data models module
//!
//! Contains the data structures shared across the application:
//! - Dependency records read from pip or requirements files
//! - Scan and advice reports
//! - Scan history records

pub mod dependency;
pub mod report;
pub mod scan;
