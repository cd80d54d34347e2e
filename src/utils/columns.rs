// src/utils/columns.rs - Import spreadsheet column location
//
// Administrator sheets have no fixed header row; columns are found by
// case- and accent-insensitive keyword matching against a small fixed
// vocabulary of header synonyms.

use crate::normalize::normalize_name;

/// Header keywords, in folded form (lowercase, accents stripped).
const LOGIN_HEADER_KEYWORDS: [&str; 4] = ["username", "user name", "login", "tai khoan"];
const BIRTH_HEADER_KEYWORDS: [&str; 4] = ["birth", "date of birth", "dob", "ngay sinh"];
const NAME_HEADER_KEYWORDS: [&str; 3] = ["full name", "ho ten", "name"];

/// Located column indices for one import sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportColumns {
    pub name: Option<usize>,
    pub birth_date: Option<usize>,
    pub login: Option<usize>,
}

impl ImportColumns {
    /// Locate the name, birth-date, and login columns in a header row.
    ///
    /// Login is resolved first so that a "Username" header is never
    /// claimed by the name keywords it happens to contain.
    pub fn locate<S: AsRef<str>>(headers: &[S]) -> Self {
        let folded: Vec<String> = headers
            .iter()
            .map(|h| normalize_name(h.as_ref()))
            .collect();

        let login = find_column(&folded, &LOGIN_HEADER_KEYWORDS, &[]);
        let skip = login.map(|i| vec![i]).unwrap_or_default();
        let birth_date = find_column(&folded, &BIRTH_HEADER_KEYWORDS, &skip);
        let name = find_column(&folded, &NAME_HEADER_KEYWORDS, &skip);

        ImportColumns {
            name,
            birth_date,
            login,
        }
    }
}

fn find_column(folded_headers: &[String], keywords: &[&str], skip: &[usize]) -> Option<usize> {
    folded_headers.iter().enumerate().find_map(|(idx, header)| {
        if skip.contains(&idx) || header.is_empty() {
            return None;
        }
        keywords
            .iter()
            .any(|kw| header.contains(kw))
            .then_some(idx)
    })
}
