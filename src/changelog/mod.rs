//! Changelog module
//!
//! Splits release notes into per-version sections and flags entries that
//! announce breaking changes:
//! - Removal: APIs or modules removed
//! - Rename: APIs renamed or moved
//! - DroppedSupport: Python versions or platforms no longer supported
//! - Incompatible: other backwards-incompatible behaviour changes
//! - Deprecation: features scheduled for removal

pub mod breaking;
pub mod parser;

pub use breaking::{detect_breaking_changes, BreakingChange, BreakingKind};
pub use parser::{parse_changelog, sections_between, ChangelogSection};
