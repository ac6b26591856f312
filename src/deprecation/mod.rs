//! Deprecation detection module
//!
//! Flags installed versions that should not be kept around:
//! - BelowMinimumVersion: older than the minimum supported release
//! - UnparseableVersion: a tracked package with a non-numeric version
//! - PreRelease: alpha/beta/rc/dev builds
//! - DeprecatedName: package name marks it as deprecated or legacy

pub mod detector;
pub mod types;

pub use detector::{check_dependency, check_deprecation_status, summarize};
pub use types::{DependencyStatus, DeprecationRules, FindingType, HealthState, ScanSummary};
