pub mod core;
pub mod matching;

pub use core::{ImportRow, NormalizedIdentity, PersonKind, PersonRecord};
pub use matching::{
    MatchDecision, MatchMethodStats, MatchOutcome, RecordDecision, UnmatchedAudit,
};
