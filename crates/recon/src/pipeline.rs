//! Locate → map → canonicalize for one source, and report assembly.

use serde::{Deserialize, Serialize};

use crate::canonical::{canonicalize, CanonicalTable};
use crate::engine::ReconOptions;
use crate::locate::{locate, refine};
use crate::mapper::{map_fields, FieldMapping, MappingReport, DEFAULT_MIN_CONFIDENCE};
use crate::model::{ReconMeta, ReconOutcome, ReconReport};
use crate::schema::{CanonicalSchema, Domain};
use crate::table::{TableSource, TableView};

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub min_confidence: f64,
    /// Explicit header row; skips detection.
    pub header_row: Option<usize>,
    /// Manual mapping entries, applied over the automatic mapping.
    pub overrides: FieldMapping,
    /// Step past sparse title rows after detection.
    pub refine_header: bool,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            header_row: None,
            overrides: FieldMapping::new(),
            refine_header: true,
        }
    }
}

/// A header row and mapping saved from an earlier run of the same source shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedMapping {
    pub domain: Domain,
    pub header_row: usize,
    pub columns: FieldMapping,
}

#[derive(Debug, Clone)]
pub struct PreparedSource {
    pub header_row: usize,
    pub mapping: FieldMapping,
    /// `None` when the mapping came from the cache.
    pub report: Option<MappingReport>,
    pub table: CanonicalTable,
    pub from_cache: bool,
}

impl PreparedSource {
    pub fn to_persisted(&self) -> PersistedMapping {
        PersistedMapping {
            domain: self.table.domain,
            header_row: self.header_row,
            columns: self.mapping.clone(),
        }
    }
}

/// Turn one raw source into a canonical table.
///
/// A usable `cached` mapping skips both detection steps. Manual overrides
/// always win over detected or cached entries.
pub fn prepare<S: TableSource + ?Sized>(
    source: &S,
    schema: &CanonicalSchema,
    settings: &SourceSettings,
    cached: Option<&PersistedMapping>,
) -> PreparedSource {
    let rows = source.row_count();
    let cached = cached.filter(|c| usable_cache(c, schema.domain, rows, settings.header_row));

    let (header_row, mut mapping, report, from_cache) = match cached {
        Some(c) => {
            log::debug!("{}: using cached mapping at row {}", schema.domain, c.header_row);
            (c.header_row, c.columns.clone(), None, true)
        }
        None => {
            let header_row = detect_header(source, settings, schema.domain);
            let labels = source
                .view_at(header_row)
                .map(|v| v.named_labels())
                .unwrap_or_default();
            let report = map_fields(&labels, schema, settings.min_confidence);
            (header_row, report.mapping.clone(), Some(report), false)
        }
    };
    mapping.overlay(&settings.overrides);

    let view = source
        .view_at(header_row)
        .unwrap_or_else(|| TableView::owned(header_row, Vec::new()));
    let table = canonicalize(&view, &mapping, schema);

    log::info!(
        "{}: header at row {header_row}, {} of {} fields mapped, {} rows",
        schema.domain,
        mapping.len(),
        schema.fields.len(),
        table.len()
    );

    PreparedSource {
        header_row,
        mapping,
        report,
        table,
        from_cache,
    }
}

fn usable_cache(cache: &PersistedMapping, domain: Domain, rows: usize, explicit: Option<usize>) -> bool {
    if cache.domain != domain {
        log::warn!(
            "cached mapping is for '{}', not '{domain}'; detecting again",
            cache.domain
        );
        return false;
    }
    if cache.header_row >= rows {
        log::warn!(
            "{domain}: cached header row {} is beyond the {rows}-row table; detecting again",
            cache.header_row
        );
        return false;
    }
    if explicit.is_some_and(|row| row != cache.header_row) {
        log::warn!("{domain}: cached header row differs from the configured one; ignoring cache");
        return false;
    }
    true
}

fn detect_header<S: TableSource + ?Sized>(source: &S, settings: &SourceSettings, domain: Domain) -> usize {
    if let Some(row) = settings.header_row {
        if row < source.row_count() {
            return row;
        }
        log::warn!(
            "{domain}: header row {row} is beyond the {}-row table; detecting instead",
            source.row_count()
        );
    }
    let offset = locate(source);
    if settings.refine_header {
        refine(source, offset)
    } else {
        offset
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

pub fn build_report(
    name: &str,
    a: &PreparedSource,
    b: &PreparedSource,
    options: &ReconOptions,
    outcome: ReconOutcome,
) -> ReconReport {
    ReconReport {
        meta: ReconMeta {
            name: name.to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            strategy: options.strategy,
            allow_many_to_one: options.allow_many_to_one,
            header_row_a: a.header_row,
            header_row_b: b.header_row,
        },
        outcome,
    }
}
