// src/matching/recency.rs - Creation-timestamp arbitration for same-name groups

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::debug;

use crate::models::PersonRecord;

/// Maximum age, in days, a same-name candidate's creation timestamp may
/// have to win the tie-break. Accounts created in response to the current
/// import land inside this window.
pub const RECENCY_WINDOW_DAYS: i64 = 30;

/// A much narrower window used to flag accounts created moments before a
/// run in the unmatched audit. Kept distinct from [`RECENCY_WINDOW_DAYS`];
/// the two serve different purposes.
pub const NEW_ACCOUNT_WINDOW_DAYS: i64 = 2;

/// Best-effort parse of a vendor creation timestamp. The API has been seen
/// emitting RFC 3339, space-separated datetimes, and bare dates.
pub fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Select, among several vendor records sharing a normalized name, the one
/// most plausibly created in response to the current import.
///
/// Candidates with a parseable creation timestamp aged between zero and
/// `window_days` days (relative to the injected `now`) compete; the most
/// recent wins, ties going to the first encountered in input order. When
/// no candidate falls inside the window the first candidate in input order
/// is returned rather than nothing, so an ambiguous group never silently
/// loses all of its accounts. `None` only for an empty group.
pub fn pick_best<'a>(
    candidates: &[&'a PersonRecord],
    window_days: i64,
    now: DateTime<Utc>,
) -> Option<&'a PersonRecord> {
    let mut best: Option<(&'a PersonRecord, DateTime<Utc>)> = None;

    for &candidate in candidates {
        let created = match candidate.created_at.as_deref().and_then(parse_created_at) {
            Some(ts) => ts,
            None => continue,
        };
        let age_days = (now - created).num_days();
        if !(0..=window_days).contains(&age_days) {
            continue;
        }
        match best {
            Some((_, best_ts)) if created <= best_ts => {}
            _ => best = Some((candidate, created)),
        }
    }

    if let Some((winner, created)) = best {
        debug!(
            "Recency tie-break: picked '{}' (created {}) among {} candidates",
            winner.id,
            created,
            candidates.len()
        );
        return Some(winner);
    }

    // Nothing inside the window: keep the group's first record instead of
    // dropping a real account.
    candidates.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PersonKind;
    use chrono::TimeZone;

    fn record(id: &str, created_at: Option<&str>) -> PersonRecord {
        PersonRecord {
            id: id.to_string(),
            name: "Le Van C".to_string(),
            birth_date: None,
            login: None,
            created_at: created_at.map(|s| s.to_string()),
            kind: PersonKind::Student,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_most_recent_in_window_wins() {
        let five_days = record("a", Some("2024-09-10 08:00:00"));
        let forty_days = record("b", Some("2024-08-06 08:00:00"));
        let picked = pick_best(&[&forty_days, &five_days], RECENCY_WINDOW_DAYS, now()).unwrap();
        assert_eq!(picked.id, "a");
    }

    #[test]
    fn test_future_timestamps_are_outside_window() {
        let future = record("a", Some("2024-09-20 08:00:00"));
        let recent = record("b", Some("2024-09-12 08:00:00"));
        let picked = pick_best(&[&future, &recent], RECENCY_WINDOW_DAYS, now()).unwrap();
        assert_eq!(picked.id, "b");
    }

    #[test]
    fn test_tie_goes_to_first_in_input_order() {
        let first = record("a", Some("2024-09-10 08:00:00"));
        let second = record("b", Some("2024-09-10 08:00:00"));
        let picked = pick_best(&[&first, &second], RECENCY_WINDOW_DAYS, now()).unwrap();
        assert_eq!(picked.id, "a");
    }

    #[test]
    fn test_falls_back_to_first_candidate_when_window_empty() {
        let old1 = record("a", Some("2023-01-01 00:00:00"));
        let old2 = record("b", None);
        let picked = pick_best(&[&old1, &old2], RECENCY_WINDOW_DAYS, now()).unwrap();
        assert_eq!(picked.id, "a");
    }

    #[test]
    fn test_empty_group() {
        assert!(pick_best(&[], RECENCY_WINDOW_DAYS, now()).is_none());
    }

    #[test]
    fn test_parse_created_at_shapes() {
        assert!(parse_created_at("2024-09-10T08:00:00Z").is_some());
        assert!(parse_created_at("2024-09-10 08:00:00").is_some());
        assert!(parse_created_at("2024-09-10").is_some());
        assert!(parse_created_at("soon").is_none());
    }
}
