//! `lmatch map`: header detection and column mapping for one ledger.

use std::path::PathBuf;

use ledgermatch_io::json::MappingStore;
use ledgermatch_recon::pipeline::{prepare, SourceSettings};
use ledgermatch_recon::{CanonicalSchema, Domain};

use crate::CliError;

pub fn cmd_map(
    file: PathBuf,
    domain: Domain,
    sheet: Option<String>,
    min_confidence: f64,
    json_output: bool,
    save: Option<PathBuf>,
) -> Result<(), CliError> {
    if !(0.0..=1.0).contains(&min_confidence) {
        return Err(CliError::args(format!(
            "--min-confidence must be between 0 and 1, got {min_confidence}"
        )));
    }

    let raw = ledgermatch_io::read_table(&file, sheet.as_deref()).map_err(CliError::io)?;
    if raw.is_empty() {
        return Err(CliError::io(format!("{}: no rows", file.display()))
            .with_hint("check the sheet name, or that the file is not empty"));
    }

    let schema = CanonicalSchema::for_domain(domain);
    let settings = SourceSettings {
        min_confidence,
        ..SourceSettings::default()
    };
    let prepared = prepare(&raw, &schema, &settings, None);

    let saved = match save {
        Some(dir) => Some(
            MappingStore::new(dir)
                .save(&prepared.to_persisted())
                .map_err(CliError::io)?,
        ),
        None => None,
    };

    let confidence = prepared
        .report
        .as_ref()
        .map(|r| r.confidence.clone())
        .unwrap_or_default();

    if json_output {
        let fields: Vec<serde_json::Value> = schema
            .fields
            .iter()
            .map(|f| {
                serde_json::json!({
                    "field": f.name,
                    "label": prepared.mapping.get(&f.name),
                    "confidence": confidence.get(&f.name).copied().unwrap_or(0.0),
                })
            })
            .collect();
        let unmapped: Vec<&str> = schema
            .fields
            .iter()
            .filter(|f| !prepared.mapping.is_mapped(&f.name))
            .map(|f| f.name.as_str())
            .collect();
        let output = serde_json::json!({
            "file": file.display().to_string(),
            "domain": domain,
            "header_row": prepared.header_row,
            "rows": prepared.table.len(),
            "fields": fields,
            "unmapped": unmapped,
        });
        let text = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{text}");
    } else {
        println!("header row: {} (0-based)", prepared.header_row);
        println!("data rows:  {}", prepared.table.len());
        println!();
        let width = schema.fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
        for f in &schema.fields {
            let score = confidence.get(&f.name).copied().unwrap_or(0.0);
            match prepared.mapping.get(&f.name) {
                Some(label) => println!("  {:<width$}  {:.2}  {}", f.name, score, label),
                None => println!("  {:<width$}  {:.2}  (unmapped)", f.name, score),
            }
        }
    }

    if let Some(path) = saved {
        eprintln!("saved mapping to {}", path.display());
    }
    Ok(())
}
