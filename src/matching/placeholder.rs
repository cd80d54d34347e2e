// src/matching/placeholder.rs

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Stand-in role labels some school rosters use in place of a real person,
/// most commonly the homeroom-teacher abbreviation "GVCN" (giáo viên chủ
/// nhiệm). Accounts named like this must never be treated as identities.
const PLACEHOLDER_PATTERNS: [&str; 4] = [
    "GVCN",
    "GIAO VIEN CHU NHIEM",
    "GV CHU NHIEM",
    "HOMEROOM TEACHER",
];

/// True when the name contains a known placeholder pattern.
///
/// Case- and accent-insensitive containment; no partial-match scoring.
/// "GVCN Lop 10A", "gvcn lớp 10a" and "Giáo viên chủ nhiệm" all flag.
pub fn is_placeholder_identity(name: &str) -> bool {
    let folded = fold_upper(name);
    PLACEHOLDER_PATTERNS
        .iter()
        .any(|pattern| folded.contains(pattern))
}

/// Uppercase, trimmed, diacritics removed.
fn fold_upper(name: &str) -> String {
    name.trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(|c| c.to_uppercase())
        .map(|c| if c == 'Đ' { 'D' } else { c })
        .collect()
}
