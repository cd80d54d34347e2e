// src/models/core.rs

use serde::{Deserialize, Serialize};

/// Which roster population a record belongs to. The vendor API serves
/// teachers and students from separate endpoints, so every record carries
/// its kind explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonKind {
    Teacher,
    Student,
}

impl PersonKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonKind::Teacher => "teacher",
            PersonKind::Student => "student",
        }
    }
}

/// A person entry retrieved from the vendor roster API.
///
/// These are read-only inputs to the reconciliation engine: they are never
/// mutated, only copied into the matched output. All optional fields arrive
/// as raw vendor-encoded strings; normalization happens per pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    pub kind: PersonKind,
}

/// A row parsed from the administrator import spreadsheet.
///
/// The login column is only populated for teacher sheets. Rows whose name
/// normalizes to empty are discarded before matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRow {
    pub name: String,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub login: Option<String>,
}

/// Canonicalized comparison keys derived from one record or row.
///
/// Ephemeral: built at the start of a matching pass and dropped with it,
/// never persisted or displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedIdentity {
    pub name_key: String,
    pub birth_key: Option<String>,
    pub login_key: Option<String>,
}

impl NormalizedIdentity {
    pub fn has_name(&self) -> bool {
        !self.name_key.is_empty()
    }
}
