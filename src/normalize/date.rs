// src/normalize/date.rs - Ambiguous date format inference and canonicalization
//
// Administrator sheets arrive with day-first, month-first, and ISO dates
// mixed across files (rarely within one column). Format is inferred once
// per column from a sample of values, then applied to every value in it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use chrono::NaiveDate;

/// How many non-empty column values the detector looks at.
pub const MAX_FORMAT_SAMPLES: usize = 20;

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2030;

/// Trailing time-of-day, e.g. "24/12/1995 00:00:00". Vendors append these
/// to what is logically a plain birth date.
static TIME_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[T ]?\d{1,2}:\d{2}(:\d{2})?\s*$").unwrap());

static TIME_OF_DAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,2}:\d{2}(:\d{2})?").unwrap());

/// number-separator-number-separator-4-digit-year
static NUM_NUM_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4})$").unwrap());

/// number-separator-number-separator-2-digit-year
static NUM_NUM_YY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{2})$").unwrap());

/// 4-digit-year-separator-number-separator-number
static YEAR_NUM_NUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[/-](\d{1,2})[/-](\d{1,2})$").unwrap());

/// Textual shapes tried after the numeric heuristics, against the raw
/// (time-stripped) value since symbol cleaning removes letters.
const TEXTUAL_DATE_PATTERNS: [&str; 7] = [
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d-%b-%Y",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateFormat {
    /// DD/MM/YYYY
    DayFirst,
    /// MM/DD/YYYY
    MonthFirst,
    /// YYYY-MM-DD
    Iso,
}

/// Per-format sample tallies accumulated by [`detect_format`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatScores {
    pub day_first: u32,
    pub month_first: u32,
    pub iso: u32,
    /// Samples carrying an embedded time-of-day. These detect as day-first
    /// once the time portion is stripped.
    pub embedded_time: u32,
}

/// Outcome of column-wide format inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDetection {
    pub format: Option<DateFormat>,
    pub confidence_percent: f64,
    pub scores: FormatScores,
    pub samples_analyzed: usize,
}

impl FormatDetection {
    /// The column-wide format to apply, or `None` when confidence is too
    /// low and callers should fall back to per-value heuristics.
    pub fn column_hint(&self) -> Option<DateFormat> {
        if self.confidence_percent > 50.0 {
            self.format
        } else {
            None
        }
    }
}

/// Statistically infer which date format a column of raw strings uses.
///
/// Looks at up to [`MAX_FORMAT_SAMPLES`] non-empty values. A component
/// greater than 12 pins the format (+2 to the forced bucket); a fully
/// ambiguous `N-sep-N-sep-YYYY` contributes +1 to both day-first and
/// month-first. Confidence is the winning bucket's score as a percentage
/// of samples analyzed, capped at 100.
pub fn detect_format<S: AsRef<str>>(column_samples: &[S]) -> FormatDetection {
    let mut scores = FormatScores::default();
    let mut analyzed = 0usize;

    for sample in column_samples
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .take(MAX_FORMAT_SAMPLES)
    {
        analyzed += 1;

        if TIME_OF_DAY_RE.is_match(sample) && sample.contains(['/', '-']) {
            scores.embedded_time += 1;
            continue;
        }

        let cleaned = clean_for_parse(sample);
        if let Some(caps) = NUM_NUM_YEAR_RE.captures(&cleaned) {
            let first: u32 = caps[1].parse().unwrap_or(0);
            let second: u32 = caps[2].parse().unwrap_or(0);
            if first > 12 {
                scores.day_first += 2;
            } else if second > 12 {
                scores.month_first += 2;
            } else {
                scores.day_first += 1;
                scores.month_first += 1;
            }
        } else if YEAR_NUM_NUM_RE.is_match(&cleaned) {
            scores.iso += 2;
        }
    }

    // Embedded-time samples count toward day-first.
    let buckets = [
        (scores.day_first + scores.embedded_time, DateFormat::DayFirst),
        (scores.month_first, DateFormat::MonthFirst),
        (scores.iso, DateFormat::Iso),
    ];
    // Strictly-greater comparison so a day-first vs month-first tie
    // resolves day-first, matching the rosters this engine was built for.
    let mut best_score = 0u32;
    let mut best_format = None;
    for (score, format) in buckets {
        if score > best_score {
            best_score = score;
            best_format = Some(format);
        }
    }

    let (format, confidence_percent) = if analyzed == 0 || best_score == 0 {
        (None, 0.0)
    } else {
        let pct = (best_score as f64 / analyzed as f64) * 100.0;
        (best_format, pct.min(100.0))
    };

    FormatDetection {
        format,
        confidence_percent,
        scores,
        samples_analyzed: analyzed,
    }
}

/// Normalize a raw date string to the canonical `YYYY-MM-DD` key.
///
/// With a `format_hint` the value is parsed strictly under that format
/// (day > 31, month > 12, or year outside [1900, 2030] is rejected).
/// Without one, a best-effort chain is tried: day-first 4-digit year, ISO,
/// day-first 2-digit year (00-49 -> 2000s, 50-99 -> 1900s), then the
/// textual patterns.
///
/// When nothing parses the return value is the lowercase, symbol-stripped
/// original, so equal unparseable inputs still compare equal without ever
/// colliding with a real date key. Never errors.
pub fn normalize_date(raw: &str, format_hint: Option<DateFormat>) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let without_time = TIME_SUFFIX_RE.replace(trimmed, "");
    let without_time = without_time.trim();
    let cleaned = clean_for_parse(without_time);

    let parsed = match format_hint {
        Some(format) => parse_with_format(&cleaned, format),
        None => parse_heuristic(&cleaned, without_time),
    };

    match parsed {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => fallback_key(trimmed),
    }
}

/// Strict parse under one known column format.
fn parse_with_format(cleaned: &str, format: DateFormat) -> Option<NaiveDate> {
    match format {
        DateFormat::DayFirst => {
            if let Some(caps) = NUM_NUM_YEAR_RE.captures(cleaned) {
                return build_date(caps[3].parse().ok()?, caps[2].parse().ok()?, caps[1].parse().ok()?);
            }
            let caps = NUM_NUM_YY_RE.captures(cleaned)?;
            build_date(
                expand_two_digit_year(caps[3].parse().ok()?),
                caps[2].parse().ok()?,
                caps[1].parse().ok()?,
            )
        }
        DateFormat::MonthFirst => {
            if let Some(caps) = NUM_NUM_YEAR_RE.captures(cleaned) {
                return build_date(caps[3].parse().ok()?, caps[1].parse().ok()?, caps[2].parse().ok()?);
            }
            let caps = NUM_NUM_YY_RE.captures(cleaned)?;
            build_date(
                expand_two_digit_year(caps[3].parse().ok()?),
                caps[1].parse().ok()?,
                caps[2].parse().ok()?,
            )
        }
        DateFormat::Iso => {
            let caps = YEAR_NUM_NUM_RE.captures(cleaned)?;
            build_date(caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)
        }
    }
}

/// Best-effort per-value parse when no column-wide format was inferred.
fn parse_heuristic(cleaned: &str, raw_without_time: &str) -> Option<NaiveDate> {
    if let Some(date) = parse_with_format(cleaned, DateFormat::DayFirst)
        .or_else(|| parse_with_format(cleaned, DateFormat::Iso))
    {
        return Some(date);
    }
    for pattern in TEXTUAL_DATE_PATTERNS {
        if let Ok(date) = NaiveDate::parse_from_str(raw_without_time, pattern) {
            if (MIN_YEAR..=MAX_YEAR).contains(&chrono::Datelike::year(&date)) {
                return Some(date);
            }
        }
    }
    None
}

fn build_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn expand_two_digit_year(yy: i32) -> i32 {
    if yy <= 49 {
        2000 + yy
    } else {
        1900 + yy
    }
}

/// Retain only digits and date separators; drops letters, spaces, dots.
fn clean_for_parse(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '/' || *c == '-')
        .collect()
}

/// Comparison key for values that never parsed: lowercase with symbols
/// stripped. Equal garbage compares equal; it can never take the shape of
/// a valid `YYYY-MM-DD` key.
fn fallback_key(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '/' || *c == '-')
        .collect()
}
