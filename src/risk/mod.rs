//! Upgrade risk module
//!
//! Scores how likely an upgrade is to break the project, combining the size
//! of the version jump, breaking changelog entries, and whether the project
//! touches the affected symbols.

pub mod engine;
pub mod types;

// Re-export commonly used types
pub use engine::assess;
pub use types::{Action, AdvisorSummary, RiskAssessment, RiskInput, RiskLevel, RiskSettings};
