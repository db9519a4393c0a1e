use std::fmt;

use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalRow;

// ---------------------------------------------------------------------------
// Match key
// ---------------------------------------------------------------------------

/// Ordered `(field in A, field in B)` pairs that identify the same invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchKey {
    pub pairs: Vec<(String, String)>,
}

impl MatchKey {
    pub fn new<A: Into<String>, B: Into<String>>(pairs: impl IntoIterator<Item = (A, B)>) -> Self {
        Self {
            pairs: pairs.into_iter().map(|(a, b)| (a.into(), b.into())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// How key text is normalized before comparison. Whitespace is always trimmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyNormalization {
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Nested loop over B for every A row.
    Scan,
    /// B grouped by key up front.
    #[default]
    Indexed,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scan => write!(f, "scan"),
            Self::Indexed => write!(f, "indexed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Tolerance-field comparison of one paired row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDelta {
    pub field: String,
    pub a: f64,
    pub b: f64,
    /// `a - b`, rounded to six decimals.
    pub difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconRecord {
    Matched {
        a: CanonicalRow,
        b: CanonicalRow,
        deltas: Vec<FieldDelta>,
    },
    Mismatched {
        a: CanonicalRow,
        b: CanonicalRow,
        deltas: Vec<FieldDelta>,
    },
    OnlyInA {
        a: CanonicalRow,
    },
    OnlyInB {
        b: CanonicalRow,
    },
}

impl ReconRecord {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Matched { .. } => "matched",
            Self::Mismatched { .. } => "mismatched",
            Self::OnlyInA { .. } => "only_in_a",
            Self::OnlyInB { .. } => "only_in_b",
        }
    }

    pub fn a(&self) -> Option<&CanonicalRow> {
        match self {
            Self::Matched { a, .. } | Self::Mismatched { a, .. } | Self::OnlyInA { a } => Some(a),
            Self::OnlyInB { .. } => None,
        }
    }

    pub fn b(&self) -> Option<&CanonicalRow> {
        match self {
            Self::Matched { b, .. } | Self::Mismatched { b, .. } | Self::OnlyInB { b } => Some(b),
            Self::OnlyInA { .. } => None,
        }
    }

    pub fn deltas(&self) -> &[FieldDelta] {
        match self {
            Self::Matched { deltas, .. } | Self::Mismatched { deltas, .. } => deltas,
            Self::OnlyInA { .. } | Self::OnlyInB { .. } => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldTotal {
    pub field: String,
    pub total_a: f64,
    pub total_b: f64,
    /// Sum of differences over paired rows only.
    pub difference: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconSummary {
    pub rows_a: usize,
    pub rows_b: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub only_in_a: usize,
    pub only_in_b: usize,
    /// B rows sharing a key with A that no A row selected.
    pub unclaimed_b: usize,
    pub coercion_failures: usize,
    pub field_totals: Vec<FieldTotal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconOutcome {
    pub matched: Vec<ReconRecord>,
    pub mismatched: Vec<ReconRecord>,
    pub only_in_a: Vec<ReconRecord>,
    pub only_in_b: Vec<ReconRecord>,
    pub summary: ReconSummary,
}

impl ReconOutcome {
    /// Anything other than clean matches.
    pub fn has_differences(&self) -> bool {
        !(self.mismatched.is_empty() && self.only_in_a.is_empty() && self.only_in_b.is_empty())
    }

    /// Matched, mismatched, A-only, then B-only records.
    pub fn records(&self) -> impl Iterator<Item = &ReconRecord> {
        self.matched
            .iter()
            .chain(&self.mismatched)
            .chain(&self.only_in_a)
            .chain(&self.only_in_b)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub name: String,
    pub engine_version: String,
    pub run_at: String,
    pub strategy: MatchStrategy,
    pub allow_many_to_one: bool,
    pub header_row_a: usize,
    pub header_row_b: usize,
}

/// An outcome with the run metadata, as handed to exporters.
#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    #[serde(flatten)]
    pub outcome: ReconOutcome,
}
