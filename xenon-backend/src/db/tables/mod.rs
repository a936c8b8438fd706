//! Database table modules - extend Database with per-table methods

pub mod agent_thoughts; // agent_thoughts
pub mod reports;        // reports
