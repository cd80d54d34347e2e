// src/normalize/name.rs - Free-text person name canonicalization

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonicalize a free-text person name into a comparison key.
///
/// Steps, in order: lowercase, trim, NFD-decompose and drop combining
/// diacritical marks, strip everything that is not a word character or a
/// space, collapse whitespace runs, trim again. `"Nguyễn Văn A"` and
/// `"nguyen van a"` produce the same key.
///
/// Empty input yields an empty string. Never panics.
pub fn normalize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        for lc in ch.to_lowercase() {
            // Vietnamese đ decomposes to itself; map it by hand so
            // "Trần Văn Đức" and "tran van duc" agree.
            let lc = if lc == 'đ' { 'd' } else { lc };
            if lc.is_alphanumeric() || lc == '_' {
                out.push(lc);
            } else if lc.is_whitespace() {
                if !out.is_empty() && !out.ends_with(' ') {
                    out.push(' ');
                }
            }
        }
    }
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out
}
