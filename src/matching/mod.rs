pub mod engine;
pub mod placeholder;
pub mod recency;

pub use engine::{match_records, unmatched_audit};
pub use placeholder::is_placeholder_identity;
pub use recency::{pick_best, NEW_ACCOUNT_WINDOW_DAYS, RECENCY_WINDOW_DAYS};
