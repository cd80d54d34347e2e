// src/matching/engine.rs - Tiered vendor/import record reconciliation

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::models::{
    ImportRow, MatchDecision, MatchMethodStats, MatchOutcome, NormalizedIdentity, PersonKind,
    PersonRecord, RecordDecision, UnmatchedAudit,
};
use crate::normalize::{detect_format, normalize_date, normalize_name, DateFormat};

use super::placeholder::is_placeholder_identity;
use super::recency::{parse_created_at, pick_best, NEW_ACCOUNT_WINDOW_DAYS};

/// Lookup structures built once per pass from the import sheet.
struct ImportLookups {
    /// (name_key, birth_key) pairs for rows carrying both.
    name_birth: HashSet<(String, String)>,
    /// (name_key, login_key) pairs for rows carrying both. Teacher-only.
    name_login: HashSet<(String, String)>,
    /// name_key -> rows sharing it. Fallback signal for the name-only tier.
    by_name: HashMap<String, Vec<usize>>,
    usable_rows: usize,
}

impl ImportLookups {
    fn build(import_rows: &[ImportRow], kind: PersonKind, hint: Option<DateFormat>) -> Self {
        let mut name_birth = HashSet::new();
        let mut name_login = HashSet::new();
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        let mut usable_rows = 0usize;

        for (idx, row) in import_rows.iter().enumerate() {
            let name_key = normalize_name(&row.name);
            if name_key.is_empty() {
                continue;
            }
            usable_rows += 1;

            if let Some(birth_key) = row
                .birth_date
                .as_deref()
                .map(|raw| normalize_date(raw, hint))
                .filter(|key| !key.is_empty())
            {
                name_birth.insert((name_key.clone(), birth_key));
            }
            if kind == PersonKind::Teacher {
                if let Some(login_key) = row
                    .login
                    .as_deref()
                    .map(normalize_login)
                    .filter(|key| !key.is_empty())
                {
                    name_login.insert((name_key.clone(), login_key));
                }
            }
            by_name.entry(name_key).or_default().push(idx);
        }

        ImportLookups {
            name_birth,
            name_login,
            by_name,
            usable_rows,
        }
    }
}

fn normalize_login(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn vendor_identity(
    record: &PersonRecord,
    kind: PersonKind,
    hint: Option<DateFormat>,
) -> NormalizedIdentity {
    NormalizedIdentity {
        name_key: normalize_name(&record.name),
        birth_key: record
            .birth_date
            .as_deref()
            .map(|raw| normalize_date(raw, hint))
            .filter(|key| !key.is_empty()),
        login_key: if kind == PersonKind::Teacher {
            record
                .login
                .as_deref()
                .map(normalize_login)
                .filter(|key| !key.is_empty())
        } else {
            None
        },
    }
}

/// Whole-population signal: at least one import row names the placeholder
/// identity, meaning the administrator wants everyone exported.
fn import_requests_everyone(import_rows: &[ImportRow]) -> bool {
    import_rows
        .iter()
        .any(|row| is_placeholder_identity(&row.name))
}

/// Reconcile vendor records against import rows and decide, per vendor
/// record, whether qualifying import evidence exists.
///
/// Three strategies apply in strict priority order: name+birthdate,
/// name+login (teacher only), then name-only with recency arbitration for
/// same-name groups. When the import sheet contains a placeholder row the
/// pass switches to whole-population mode instead and includes every
/// non-placeholder record directly; the mode is selected once, before
/// iterating.
///
/// `now` is injected so repeated calls with unchanged inputs are
/// bit-identical. Matched output preserves vendor input order. Malformed
/// field data never errors; it degrades into non-matching keys.
pub fn match_records(
    vendor_records: &[PersonRecord],
    import_rows: &[ImportRow],
    kind: PersonKind,
    window_days: i64,
    now: DateTime<Utc>,
) -> Result<MatchOutcome> {
    let export_all = import_requests_everyone(import_rows);

    // Each column's date format is inferred independently; vendor and
    // import sheets routinely disagree.
    let vendor_hint = detect_format(
        &vendor_records
            .iter()
            .filter_map(|r| r.birth_date.as_deref())
            .collect::<Vec<_>>(),
    );
    let import_hint = detect_format(
        &import_rows
            .iter()
            .filter_map(|r| r.birth_date.as_deref())
            .collect::<Vec<_>>(),
    );
    debug!(
        "Date format inference: vendor={:?} ({:.0}%), import={:?} ({:.0}%)",
        vendor_hint.format,
        vendor_hint.confidence_percent,
        import_hint.format,
        import_hint.confidence_percent
    );

    let lookups = ImportLookups::build(import_rows, kind, import_hint.column_hint());

    let identities: Vec<NormalizedIdentity> = vendor_records
        .iter()
        .map(|record| vendor_identity(record, kind, vendor_hint.column_hint()))
        .collect();

    // Same-name ambiguity groups over the vendor side, built once per pass.
    let mut vendor_by_name: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, identity) in identities.iter().enumerate() {
        if identity.has_name() {
            vendor_by_name
                .entry(identity.name_key.as_str())
                .or_default()
                .push(idx);
        }
    }

    let mut decisions: Vec<MatchDecision> = vec![MatchDecision::Unmatched; vendor_records.len()];

    if export_all {
        info!(
            "📋 Import sheet requested whole-population export; bypassing match tiers for {} {} records",
            vendor_records.len(),
            kind.as_str()
        );
        for (idx, record) in vendor_records.iter().enumerate() {
            decisions[idx] = if is_placeholder_identity(&record.name) {
                MatchDecision::ExcludedPlaceholder
            } else {
                MatchDecision::IncludedExportAll
            };
        }
    } else {
        // Once a same-name group's ambiguous slot is consumed, siblings
        // stay unmatched for the rest of the pass.
        let mut consumed_names: HashSet<&str> = HashSet::new();

        for (idx, record) in vendor_records.iter().enumerate() {
            if decisions[idx] != MatchDecision::Unmatched {
                // Already selected by an earlier sibling's tie-break.
                continue;
            }

            if kind == PersonKind::Teacher && is_placeholder_identity(&record.name) {
                decisions[idx] = MatchDecision::ExcludedPlaceholder;
                continue;
            }

            let identity = &identities[idx];
            if !identity.has_name() {
                continue;
            }
            let name_key = identity.name_key.as_str();

            // Tier 1: name + birthdate. Least ambiguous signal available.
            if let Some(birth_key) = &identity.birth_key {
                if lookups
                    .name_birth
                    .contains(&(identity.name_key.clone(), birth_key.clone()))
                {
                    decisions[idx] = MatchDecision::MatchedByBirthdate;
                    continue;
                }
            }

            // Tier 2: name + login identifier.
            if let Some(login_key) = &identity.login_key {
                if lookups
                    .name_login
                    .contains(&(identity.name_key.clone(), login_key.clone()))
                {
                    decisions[idx] = MatchDecision::MatchedByLogin;
                    continue;
                }
            }

            // Tier 3: name-only, arbitrated by recency when ambiguous.
            if !lookups.by_name.contains_key(name_key) {
                continue;
            }
            let group = &vendor_by_name[name_key];
            if group.len() == 1 {
                decisions[idx] = MatchDecision::MatchedByNameSingle;
                continue;
            }
            if consumed_names.contains(name_key) {
                continue;
            }
            // Only still-undecided siblings compete for the ambiguous slot;
            // a decision won at a higher tier is never overwritten.
            let open: Vec<usize> = group
                .iter()
                .copied()
                .filter(|&i| decisions[i] == MatchDecision::Unmatched)
                .collect();
            let candidates: Vec<&PersonRecord> =
                open.iter().map(|&i| &vendor_records[i]).collect();
            if let Some(winner) = pick_best(&candidates, window_days, now) {
                let winner_idx = open
                    .iter()
                    .copied()
                    .find(|&i| vendor_records[i].id == winner.id)
                    .unwrap_or(idx);
                decisions[winner_idx] = MatchDecision::MatchedByNameRecency;
            }
            consumed_names.insert(name_key);
        }
    }

    let mut stats = MatchMethodStats {
        vendor_records_total: vendor_records.len(),
        import_rows_total: import_rows.len(),
        import_rows_usable: lookups.usable_rows,
        ..Default::default()
    };
    for decision in &decisions {
        stats.record(*decision);
    }

    let matched: Vec<PersonRecord> = vendor_records
        .iter()
        .zip(&decisions)
        .filter(|(_, decision)| decision.is_match())
        .map(|(record, _)| record.clone())
        .collect();
    let matched_count = stats.matched_total();
    debug_assert_eq!(matched_count, matched.len());

    info!(
        "Matching pass complete ({}): {}/{} matched ({} birthdate, {} login, {} name-single, {} name-recency, {} export-all), {} placeholders excluded, {} unmatched",
        kind.as_str(),
        matched_count,
        vendor_records.len(),
        stats.matched_by_birthdate,
        stats.matched_by_login,
        stats.matched_by_name_single,
        stats.matched_by_name_recency,
        stats.included_export_all,
        stats.excluded_placeholders,
        stats.unmatched
    );

    Ok(MatchOutcome {
        matched,
        matched_count,
        decisions: vendor_records
            .iter()
            .zip(&decisions)
            .map(|(record, decision)| RecordDecision {
                record_id: record.id.clone(),
                decision: *decision,
            })
            .collect(),
        stats,
        export_all_mode: export_all,
    })
}

/// Name/count summary of the records a pass left unmatched, for human
/// review downstream. `recently_created` flags accounts younger than
/// [`NEW_ACCOUNT_WINDOW_DAYS`]; a brand-new account that still failed to
/// match usually points at a typo in the import sheet.
pub fn unmatched_audit(
    vendor_records: &[PersonRecord],
    outcome: &MatchOutcome,
    now: DateTime<Utc>,
) -> UnmatchedAudit {
    let unmatched_ids: HashSet<&str> = outcome
        .decisions
        .iter()
        .filter(|d| d.decision == MatchDecision::Unmatched)
        .map(|d| d.record_id.as_str())
        .collect();

    let mut names = Vec::new();
    let mut recently_created = 0usize;
    for record in vendor_records {
        if !unmatched_ids.contains(record.id.as_str()) {
            continue;
        }
        names.push(record.name.clone());
        if let Some(created) = record.created_at.as_deref().and_then(parse_created_at) {
            let age_days = (now - created).num_days();
            if (0..=NEW_ACCOUNT_WINDOW_DAYS).contains(&age_days) {
                recently_created += 1;
            }
        }
    }

    UnmatchedAudit {
        count: names.len(),
        names,
        recently_created,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::recency::RECENCY_WINDOW_DAYS;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 15, 12, 0, 0).unwrap()
    }

    fn vendor(id: &str, name: &str) -> PersonRecord {
        PersonRecord {
            id: id.to_string(),
            name: name.to_string(),
            birth_date: None,
            login: None,
            created_at: None,
            kind: PersonKind::Student,
        }
    }

    fn row(name: &str) -> ImportRow {
        ImportRow {
            name: name.to_string(),
            birth_date: None,
            login: None,
        }
    }

    fn run(
        vendor_records: &[PersonRecord],
        import_rows: &[ImportRow],
        kind: PersonKind,
    ) -> MatchOutcome {
        match_records(vendor_records, import_rows, kind, RECENCY_WINDOW_DAYS, now()).unwrap()
    }

    #[test]
    fn test_tier1_name_and_birthdate_accent_insensitive() {
        let mut record = vendor("v1", "Tran Thi B");
        record.birth_date = Some("24/12/1995".to_string());
        let mut import = row("Trần Thị B");
        import.birth_date = Some("24/12/1995".to_string());

        let outcome = run(&[record], &[import], PersonKind::Student);
        assert_eq!(outcome.matched_count, 1);
        assert_eq!(
            outcome.decisions[0].decision,
            MatchDecision::MatchedByBirthdate
        );
    }

    #[test]
    fn test_tier1_beats_tier2() {
        let record = PersonRecord {
            id: "v1".to_string(),
            name: "Pham Van D".to_string(),
            birth_date: Some("01/09/1990".to_string()),
            login: Some("pvd@school".to_string()),
            created_at: None,
            kind: PersonKind::Teacher,
        };
        let import = ImportRow {
            name: "Phạm Văn D".to_string(),
            birth_date: Some("01/09/1990".to_string()),
            login: Some("PVD@school".to_string()),
        };

        let outcome = run(&[record], &[import], PersonKind::Teacher);
        assert_eq!(
            outcome.decisions[0].decision,
            MatchDecision::MatchedByBirthdate
        );
    }

    #[test]
    fn test_tier2_login_teacher_only() {
        let make = |kind| PersonRecord {
            id: "v1".to_string(),
            name: "Pham Van D".to_string(),
            birth_date: None,
            login: Some("pvd@school".to_string()),
            created_at: None,
            kind,
        };
        let import = ImportRow {
            name: "Pham Van D".to_string(),
            birth_date: None,
            login: Some("pvd@school".to_string()),
        };

        let outcome = run(&[make(PersonKind::Teacher)], &[import.clone()], PersonKind::Teacher);
        assert_eq!(outcome.decisions[0].decision, MatchDecision::MatchedByLogin);

        // For students the login path is off; the name-only tier catches it
        // instead since the name is unique.
        let outcome = run(&[make(PersonKind::Student)], &[import], PersonKind::Student);
        assert_eq!(
            outcome.decisions[0].decision,
            MatchDecision::MatchedByNameSingle
        );
    }

    #[test]
    fn test_tier3_single_name() {
        let outcome = run(
            &[vendor("v1", "Le Van C")],
            &[row("Lê Văn C")],
            PersonKind::Student,
        );
        assert_eq!(
            outcome.decisions[0].decision,
            MatchDecision::MatchedByNameSingle
        );
    }

    #[test]
    fn test_tier3_recency_arbitration() {
        let mut old = vendor("v-old", "Le Van C");
        old.created_at = Some("2024-08-06 08:00:00".to_string()); // 40 days old
        let mut fresh = vendor("v-new", "Le Van C");
        fresh.created_at = Some("2024-09-10 08:00:00".to_string()); // 5 days old

        let outcome = run(
            &[old.clone(), fresh.clone()],
            &[row("Le Van C")],
            PersonKind::Student,
        );
        assert_eq!(outcome.matched_count, 1);
        assert_eq!(outcome.matched[0].id, "v-new");
        assert_eq!(outcome.decisions[0].decision, MatchDecision::Unmatched);
        assert_eq!(
            outcome.decisions[1].decision,
            MatchDecision::MatchedByNameRecency
        );
    }

    #[test]
    fn test_recency_arbitration_never_overwrites_higher_tier() {
        // The freshest sibling already matched on birthdate; the tie-break
        // over the same-name group must not relabel it, and the remaining
        // sibling claims the name-only slot instead.
        let mut a = vendor("a", "Tran Thi Mai");
        a.birth_date = Some("24/12/1995".to_string());
        a.created_at = Some("2024-09-10 08:00:00".to_string()); // 5 days old
        let b = vendor("b", "Tran Thi Mai");

        let mut import = row("Trần Thị Mai");
        import.birth_date = Some("24/12/1995".to_string());

        let outcome = run(&[a, b], &[import], PersonKind::Student);
        assert_eq!(
            outcome.decisions[0].decision,
            MatchDecision::MatchedByBirthdate
        );
        assert_eq!(
            outcome.decisions[1].decision,
            MatchDecision::MatchedByNameRecency
        );
        assert_eq!(outcome.stats.matched_by_birthdate, 1);
        assert_eq!(outcome.matched_count, outcome.stats.matched_total());
    }

    #[test]
    fn test_ambiguous_group_slot_consumed_once() {
        // Three same-name records, none inside the window: the fallback
        // picks the first and the other two stay unmatched.
        let a = vendor("a", "Le Van C");
        let b = vendor("b", "Le Van C");
        let c = vendor("c", "Le Van C");
        let outcome = run(&[a, b, c], &[row("Le Van C")], PersonKind::Student);
        assert_eq!(outcome.matched_count, 1);
        assert_eq!(outcome.matched[0].id, "a");
        assert_eq!(outcome.stats.unmatched, 2);
    }

    #[test]
    fn test_placeholder_never_matched() {
        let record = vendor("v1", "GVCN Lop 10A");
        let record = PersonRecord {
            kind: PersonKind::Teacher,
            ..record
        };
        let outcome = run(&[record], &[row("GVCN Lop 10A")], PersonKind::Teacher);
        // The placeholder import row flips the pass into whole-population
        // mode, and even there the placeholder vendor record stays out.
        assert!(outcome.export_all_mode);
        assert_eq!(
            outcome.decisions[0].decision,
            MatchDecision::ExcludedPlaceholder
        );
        assert!(outcome.matched.is_empty());
    }

    #[test]
    fn test_export_all_mode_includes_everyone_else() {
        let records = vec![
            vendor("v1", "Tran Thi B"),
            vendor("v2", "Le Van C"),
            PersonRecord {
                kind: PersonKind::Teacher,
                ..vendor("v3", "GVCN 12A")
            },
        ];
        let outcome = run(&records, &[row("Giáo viên chủ nhiệm")], PersonKind::Teacher);
        assert!(outcome.export_all_mode);
        assert_eq!(outcome.matched_count, 2);
        assert_eq!(outcome.stats.included_export_all, 2);
        assert_eq!(outcome.stats.excluded_placeholders, 1);
    }

    #[test]
    fn test_empty_import_yields_zero_matches() {
        let outcome = run(&[vendor("v1", "Tran Thi B")], &[], PersonKind::Student);
        assert!(!outcome.export_all_mode);
        assert!(outcome.matched.is_empty());
        assert_eq!(outcome.matched_count, 0);
    }

    #[test]
    fn test_rows_without_usable_name_are_discarded() {
        let outcome = run(
            &[vendor("v1", "Tran Thi B")],
            &[row("   "), row("!!!")],
            PersonKind::Student,
        );
        assert_eq!(outcome.stats.import_rows_usable, 0);
        assert_eq!(outcome.matched_count, 0);
    }

    #[test]
    fn test_output_preserves_vendor_order() {
        let records = vec![
            vendor("v1", "A Aa"),
            vendor("v2", "B Bb"),
            vendor("v3", "C Cc"),
        ];
        let rows = vec![row("C Cc"), row("A Aa"), row("B Bb")];
        let outcome = run(&records, &rows, PersonKind::Student);
        let ids: Vec<&str> = outcome.matched.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "v2", "v3"]);
    }

    #[test]
    fn test_idempotence() {
        let mut record = vendor("v1", "Tran Thi B");
        record.birth_date = Some("24/12/1995".to_string());
        let mut fresh = vendor("v2", "Le Van C");
        fresh.created_at = Some("2024-09-10 08:00:00".to_string());
        let older = vendor("v3", "Le Van C");
        let records = vec![record, fresh, older];
        let rows = vec![
            ImportRow {
                name: "Trần Thị B".to_string(),
                birth_date: Some("24/12/1995".to_string()),
                login: None,
            },
            row("Le Van C"),
        ];

        let first = run(&records, &rows, PersonKind::Student);
        let second = run(&records, &rows, PersonKind::Student);
        let first_ids: Vec<&str> = first.matched.iter().map(|r| r.id.as_str()).collect();
        let second_ids: Vec<&str> = second.matched.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(first_ids, second_ids);
        assert_eq!(first.matched_count, second.matched_count);
    }

    #[test]
    fn test_unmatched_audit() {
        let mut fresh = vendor("v1", "Moi Tao");
        fresh.created_at = Some("2024-09-14 08:00:00".to_string()); // 1 day old
        let stale = vendor("v2", "Khong Khop");
        let records = vec![fresh, stale];

        let outcome = run(&records, &[], PersonKind::Student);
        let audit = unmatched_audit(&records, &outcome, now());
        assert_eq!(audit.count, 2);
        assert_eq!(audit.recently_created, 1);
        assert!(audit.names.contains(&"Moi Tao".to_string()));
    }
}
