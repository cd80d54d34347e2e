use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use log::info;
use uuid::Uuid;

use reconcile_lib::matching::{match_records, unmatched_audit};
use reconcile_lib::models::{ImportRow, PersonKind, PersonRecord};
use reconcile_lib::utils::{load_env, ImportColumns, ReconcileConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Teacher,
    Student,
}

impl From<KindArg> for PersonKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Teacher => PersonKind::Teacher,
            KindArg::Student => PersonKind::Student,
        }
    }
}

/// Reconcile vendor roster records against an administrator import sheet.
#[derive(Parser, Debug)]
#[command(name = "reconcile")]
struct Cli {
    /// Vendor records file (JSON array of person records)
    #[arg(long)]
    vendor_file: PathBuf,

    /// Administrator import sheet (CSV with a header row)
    #[arg(long)]
    import_file: PathBuf,

    /// Which population to reconcile
    #[arg(long, value_enum)]
    kind: KindArg,

    /// Where to write the matched records (JSON)
    #[arg(long, default_value = "matched.json")]
    output: PathBuf,

    /// Optional path for the unmatched audit summary (JSON)
    #[arg(long)]
    audit: Option<PathBuf>,

    /// Reference time for the recency tie-break (RFC 3339). Defaults to
    /// the current time; pin it to reproduce a past run exactly.
    #[arg(long)]
    now: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    load_env();

    let cli = Cli::parse();
    let config = ReconcileConfig::from_env();
    config.log_config();

    let run_id = Uuid::new_v4().to_string();
    let kind: PersonKind = cli.kind.into();
    info!("Starting reconciliation run {} ({})", run_id, kind.as_str());

    let now: DateTime<Utc> = match &cli.now {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .context("--now must be an RFC 3339 timestamp")?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let load_start = Instant::now();
    let vendor_records = load_vendor_records(&cli.vendor_file, kind)?;
    let import_rows = load_import_rows(&cli.import_file)?;
    info!(
        "Loaded {} vendor records and {} import rows in {:.2?}",
        vendor_records.len(),
        import_rows.len(),
        load_start.elapsed()
    );

    let match_start = Instant::now();
    let outcome = match_records(
        &vendor_records,
        &import_rows,
        kind,
        config.recency_window_days,
        now,
    )?;
    let match_duration = match_start.elapsed();

    let matched_json = serde_json::to_string_pretty(&outcome.matched)
        .context("Failed to serialize matched records")?;
    std::fs::write(&cli.output, matched_json)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    let audit = unmatched_audit(&vendor_records, &outcome, now);
    if let Some(audit_path) = &cli.audit {
        let audit_json =
            serde_json::to_string_pretty(&audit).context("Failed to serialize unmatched audit")?;
        std::fs::write(audit_path, audit_json)
            .with_context(|| format!("Failed to write {}", audit_path.display()))?;
    }

    info!("=== Reconciliation Summary ===");
    info!("Run ID: {}", run_id);
    info!("Kind: {}", kind.as_str());
    if outcome.export_all_mode {
        info!("📋 Mode: whole-population export (tiers bypassed)");
    }
    info!(
        "Matched: {}/{} ({} birthdate, {} login, {} name-single, {} name-recency)",
        outcome.matched_count,
        outcome.stats.vendor_records_total,
        outcome.stats.matched_by_birthdate,
        outcome.stats.matched_by_login,
        outcome.stats.matched_by_name_single,
        outcome.stats.matched_by_name_recency
    );
    info!(
        "Excluded placeholders: {}, unmatched: {} ({} recently created)",
        outcome.stats.excluded_placeholders, audit.count, audit.recently_created
    );
    info!("Matching time: {:.2?}", match_duration);
    info!("Matched records written to {}", cli.output.display());

    Ok(())
}

fn load_vendor_records(path: &PathBuf, kind: PersonKind) -> Result<Vec<PersonRecord>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let records: Vec<PersonRecord> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse vendor records from {}", path.display()))?;
    // The vendor API serves kinds from separate endpoints, but exported
    // files get concatenated by hand often enough to be worth filtering.
    Ok(records.into_iter().filter(|r| r.kind == kind).collect())
}

fn load_import_rows(path: &PathBuf) -> Result<Vec<ImportRow>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("Import sheet has no header row")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let columns = ImportColumns::locate(&headers);
    let name_idx = match columns.name {
        Some(idx) => idx,
        None => bail!(
            "Could not locate a name column in import sheet headers: {:?}",
            headers
        ),
    };

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to read import sheet row")?;
        let field = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| record.get(i))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let name = match field(Some(name_idx)) {
            Some(name) => name,
            None => continue, // no usable name, discard before matching
        };
        rows.push(ImportRow {
            name,
            birth_date: field(columns.birth_date),
            login: field(columns.login),
        });
    }
    Ok(rows)
}
