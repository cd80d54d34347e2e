// src/models/matching.rs

use serde::{Deserialize, Serialize};

use super::core::PersonRecord;

/// Per-vendor-record outcome of one reconciliation pass, in descending
/// strategy priority. A record gets exactly one decision per pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchDecision {
    MatchedByBirthdate,
    MatchedByLogin,
    MatchedByNameSingle,
    MatchedByNameRecency,
    /// Whole-population mode: the import sheet asked for everyone, so the
    /// record was included without going through the tiers.
    IncludedExportAll,
    ExcludedPlaceholder,
    Unmatched,
}

impl MatchDecision {
    pub fn is_match(&self) -> bool {
        matches!(
            self,
            MatchDecision::MatchedByBirthdate
                | MatchDecision::MatchedByLogin
                | MatchDecision::MatchedByNameSingle
                | MatchDecision::MatchedByNameRecency
                | MatchDecision::IncludedExportAll
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchDecision::MatchedByBirthdate => "matched-by-birthdate",
            MatchDecision::MatchedByLogin => "matched-by-login",
            MatchDecision::MatchedByNameSingle => "matched-by-name-single",
            MatchDecision::MatchedByNameRecency => "matched-by-name-recency",
            MatchDecision::IncludedExportAll => "included-export-all",
            MatchDecision::ExcludedPlaceholder => "excluded-placeholder",
            MatchDecision::Unmatched => "unmatched",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDecision {
    pub record_id: String,
    pub decision: MatchDecision,
}

/// Counters describing one pass, broken down by decision.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchMethodStats {
    pub vendor_records_total: usize,
    pub import_rows_total: usize,
    pub import_rows_usable: usize,
    pub matched_by_birthdate: usize,
    pub matched_by_login: usize,
    pub matched_by_name_single: usize,
    pub matched_by_name_recency: usize,
    pub included_export_all: usize,
    pub excluded_placeholders: usize,
    pub unmatched: usize,
}

impl MatchMethodStats {
    pub fn record(&mut self, decision: MatchDecision) {
        match decision {
            MatchDecision::MatchedByBirthdate => self.matched_by_birthdate += 1,
            MatchDecision::MatchedByLogin => self.matched_by_login += 1,
            MatchDecision::MatchedByNameSingle => self.matched_by_name_single += 1,
            MatchDecision::MatchedByNameRecency => self.matched_by_name_recency += 1,
            MatchDecision::IncludedExportAll => self.included_export_all += 1,
            MatchDecision::ExcludedPlaceholder => self.excluded_placeholders += 1,
            MatchDecision::Unmatched => self.unmatched += 1,
        }
    }

    pub fn matched_total(&self) -> usize {
        self.matched_by_birthdate
            + self.matched_by_login
            + self.matched_by_name_single
            + self.matched_by_name_recency
            + self.included_export_all
    }
}

/// The sole output artifact of the engine: the matched subset (vendor input
/// order preserved), the per-record decisions, and pass counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub matched: Vec<PersonRecord>,
    pub matched_count: usize,
    pub decisions: Vec<RecordDecision>,
    pub stats: MatchMethodStats,
    /// True when the import sheet requested "export everyone except
    /// placeholders" and the tiers were bypassed.
    pub export_all_mode: bool,
}

/// Diagnostic summary of the vendor records a pass left unmatched.
/// Consumed by callers that want a human-reviewable leftovers report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnmatchedAudit {
    pub names: Vec<String>,
    pub count: usize,
    /// Unmatched records created within [`NEW_ACCOUNT_WINDOW_DAYS`] of the
    /// injected now. A freshly created account that still failed to match
    /// usually means the import sheet misspelled it.
    ///
    /// [`NEW_ACCOUNT_WINDOW_DAYS`]: crate::matching::recency::NEW_ACCOUNT_WINDOW_DAYS
    pub recently_created: usize,
}
