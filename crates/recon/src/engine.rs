use std::collections::{HashMap, HashSet};

use crate::canonical::{CanonicalRow, CanonicalTable};
use crate::coerce::{coerce_amount, CoerceStatus};
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::model::{
    FieldDelta, KeyNormalization, MatchKey, MatchStrategy, ReconOutcome, ReconRecord, ReconSummary,
};

/// Differences are rounded to this many decimals before the tolerance test.
const DIFFERENCE_DECIMALS: i32 = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct ReconOptions {
    pub match_key: MatchKey,
    /// Fields compared numerically; must exist under the same name in both tables.
    pub tolerance_fields: Vec<String>,
    /// A paired row is matched when every `|a - b|` is strictly below this.
    pub tolerance: f64,
    /// When true, one B row may pair with several A rows.
    pub allow_many_to_one: bool,
    pub normalization: KeyNormalization,
    pub strategy: MatchStrategy,
}

impl Default for ReconOptions {
    fn default() -> Self {
        Self {
            match_key: MatchKey::new([
                ("tax-registration-id", "supplier-tax-registration-id"),
                ("invoice-number", "invoice-number"),
            ]),
            tolerance_fields: ["taxable-value", "integrated-tax", "central-tax", "state-tax", "cess"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            tolerance: 0.01,
            allow_many_to_one: true,
            normalization: KeyNormalization::default(),
            strategy: MatchStrategy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Pair the rows of `a` with rows of `b` by key and classify each pair.
///
/// Every A row selects the first B row (in table order) with an equal key.
/// Output keeps A order for matched, mismatched and A-only records, and B
/// order for B-only records.
pub fn reconcile(
    a: &CanonicalTable,
    b: &CanonicalTable,
    options: &ReconOptions,
) -> Result<ReconOutcome, ReconError> {
    let plan = Plan::new(a, b, options)?;

    let keys_a: Vec<Vec<String>> = a.rows.iter().map(|r| plan.key(r, &plan.key_a)).collect();
    let keys_b: Vec<Vec<String>> = b.rows.iter().map(|r| plan.key(r, &plan.key_b)).collect();

    let selected = match options.strategy {
        MatchStrategy::Scan => select_scan(&keys_a, &keys_b, options.allow_many_to_one),
        MatchStrategy::Indexed => select_indexed(&keys_a, &keys_b, options.allow_many_to_one),
    };

    let mut claimed = vec![false; b.rows.len()];
    let mut failures = 0;
    let mut outcome = ReconOutcome {
        matched: Vec::new(),
        mismatched: Vec::new(),
        only_in_a: Vec::new(),
        only_in_b: Vec::new(),
        summary: ReconSummary::default(),
    };

    for (row_a, choice) in a.rows.iter().zip(&selected) {
        let Some(j) = *choice else {
            outcome.only_in_a.push(ReconRecord::OnlyInA { a: row_a.clone() });
            continue;
        };
        claimed[j] = true;
        let row_b = &b.rows[j];

        let (deltas, row_failures) = plan.compare(row_a, row_b);
        failures += row_failures;

        let within = deltas.iter().all(|d| d.difference.abs() < options.tolerance);
        let record = if within {
            ReconRecord::Matched {
                a: row_a.clone(),
                b: row_b.clone(),
                deltas,
            }
        } else {
            ReconRecord::Mismatched {
                a: row_a.clone(),
                b: row_b.clone(),
                deltas,
            }
        };
        if within {
            outcome.matched.push(record);
        } else {
            outcome.mismatched.push(record);
        }
    }

    // Many-to-one: B-only means no A row shares the key. Strict: never consumed.
    let keys_in_a: HashSet<&[String]> = keys_a.iter().map(|k| k.as_slice()).collect();
    let mut unclaimed_b = 0;
    for (j, row_b) in b.rows.iter().enumerate() {
        if claimed[j] {
            continue;
        }
        if options.allow_many_to_one && keys_in_a.contains(keys_b[j].as_slice()) {
            unclaimed_b += 1;
            continue;
        }
        outcome.only_in_b.push(ReconRecord::OnlyInB { b: row_b.clone() });
    }

    outcome.summary = compute_summary(a, b, &plan.tolerance_fields, &outcome, unclaimed_b, failures);

    log::info!(
        "reconciled {} A rows against {} B rows: {} matched, {} mismatched, {} only in A, {} only in B",
        a.len(),
        b.len(),
        outcome.summary.matched,
        outcome.summary.mismatched,
        outcome.summary.only_in_a,
        outcome.summary.only_in_b,
    );
    if unclaimed_b > 0 {
        log::warn!("{unclaimed_b} B row(s) share a key with A but were not selected");
    }

    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Validation + column plan
// ---------------------------------------------------------------------------

struct Plan {
    key_a: Vec<usize>,
    key_b: Vec<usize>,
    /// (field, column in A, column in B)
    tolerance: Vec<(String, usize, usize)>,
    tolerance_fields: Vec<String>,
    normalization: KeyNormalization,
}

fn column(table: &CanonicalTable, side: &str, field: &str) -> Result<usize, ReconError> {
    table
        .fields
        .iter()
        .position(|f| f == field)
        .ok_or_else(|| ReconError::UnknownField {
            table: format!("{side} ({})", table.domain),
            field: field.to_string(),
        })
}

impl Plan {
    fn new(a: &CanonicalTable, b: &CanonicalTable, options: &ReconOptions) -> Result<Self, ReconError> {
        if options.match_key.is_empty() {
            return Err(ReconError::EmptyMatchKey);
        }
        if !options.tolerance.is_finite() || options.tolerance < 0.0 {
            return Err(ReconError::InvalidTolerance(options.tolerance));
        }

        let mut key_a = Vec::with_capacity(options.match_key.pairs.len());
        let mut key_b = Vec::with_capacity(options.match_key.pairs.len());
        for (field_a, field_b) in &options.match_key.pairs {
            key_a.push(column(a, "A", field_a)?);
            key_b.push(column(b, "B", field_b)?);
        }

        let mut tolerance = Vec::new();
        let mut tolerance_fields = Vec::new();
        for field in &options.tolerance_fields {
            if tolerance_fields.contains(field) {
                continue;
            }
            tolerance.push((field.clone(), column(a, "A", field)?, column(b, "B", field)?));
            tolerance_fields.push(field.clone());
        }

        Ok(Self {
            key_a,
            key_b,
            tolerance,
            tolerance_fields,
            normalization: options.normalization,
        })
    }

    fn key(&self, row: &CanonicalRow, columns: &[usize]) -> Vec<String> {
        columns
            .iter()
            .map(|&c| {
                let text = row.values().get(c).map(|cell| cell.display()).unwrap_or_default();
                if self.normalization.case_insensitive {
                    text.to_lowercase()
                } else {
                    text
                }
            })
            .collect()
    }

    /// Deltas for every tolerance field, plus the number of cells that failed
    /// to coerce.
    fn compare(&self, row_a: &CanonicalRow, row_b: &CanonicalRow) -> (Vec<FieldDelta>, usize) {
        let mut failures = 0;
        let mut deltas = Vec::with_capacity(self.tolerance.len());

        for (field, col_a, col_b) in &self.tolerance {
            let mut side = |row: &CanonicalRow, col: usize| {
                let amount = row.values().get(col).map(coerce_amount);
                match amount {
                    Some(amount) => {
                        if amount.status == CoerceStatus::Failed {
                            failures += 1;
                            log::debug!(
                                "row {}: '{field}' is not numeric; counted as 0",
                                row.source_row
                            );
                        }
                        amount.value
                    }
                    None => 0.0,
                }
            };
            let va = side(row_a, *col_a);
            let vb = side(row_b, *col_b);
            deltas.push(FieldDelta {
                field: field.clone(),
                a: va,
                b: vb,
                difference: round_difference(va - vb),
            });
        }
        (deltas, failures)
    }
}

pub(crate) fn round_difference(d: f64) -> f64 {
    let scale = 10f64.powi(DIFFERENCE_DECIMALS);
    (d * scale).round() / scale
}

// ---------------------------------------------------------------------------
// Selection strategies
// ---------------------------------------------------------------------------

/// For every A row, the index of the selected B row.
fn select_scan(keys_a: &[Vec<String>], keys_b: &[Vec<String>], many_to_one: bool) -> Vec<Option<usize>> {
    let mut consumed = vec![false; keys_b.len()];
    keys_a
        .iter()
        .map(|key| {
            let j = (0..keys_b.len())
                .find(|&j| keys_b[j] == *key && (many_to_one || !consumed[j]))?;
            if !many_to_one {
                consumed[j] = true;
            }
            Some(j)
        })
        .collect()
}

fn select_indexed(
    keys_a: &[Vec<String>],
    keys_b: &[Vec<String>],
    many_to_one: bool,
) -> Vec<Option<usize>> {
    let mut index: HashMap<&[String], Vec<usize>> = HashMap::new();
    for (j, key) in keys_b.iter().enumerate() {
        index.entry(key.as_slice()).or_default().push(j);
    }
    // Next unconsumed position within each key's row list.
    let mut cursor: HashMap<&[String], usize> = HashMap::new();

    keys_a
        .iter()
        .map(|key| {
            let rows = index.get(key.as_slice())?;
            if many_to_one {
                return rows.first().copied();
            }
            let next = cursor.entry(key.as_slice()).or_insert(0);
            let j = rows.get(*next).copied()?;
            *next += 1;
            Some(j)
        })
        .collect()
}
