//! Roster reconciliation engine.
//!
//! Decides, for two independently sourced collections of person records
//! (one pulled from a vendor roster API, one parsed from an administrator
//! import spreadsheet), which records refer to the same real person. The
//! engine is synchronous and side-effect-free beyond diagnostic logging;
//! file and network I/O belong to its callers.

pub mod matching;
pub mod models;
pub mod normalize;
pub mod utils;

pub use matching::{match_records, unmatched_audit};
pub use models::{ImportRow, MatchDecision, MatchOutcome, PersonKind, PersonRecord};
