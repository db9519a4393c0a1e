use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::CanonicalSchema;
use crate::similarity::ratio;

/// A field is mapped only when its best score is strictly above this.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.4;

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Canonical field name → source column label. At most one label per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping(BTreeMap<String, String>);

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(|s| s.as_str())
    }

    /// Returns the label previously mapped to `field`, if any.
    pub fn insert(&mut self, field: impl Into<String>, label: impl Into<String>) -> Option<String> {
        self.0.insert(field.into(), label.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.0.remove(field)
    }

    pub fn is_mapped(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(f, l)| (f.as_str(), l.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries of `other` replace entries of `self`.
    pub fn overlay(&mut self, other: &FieldMapping) {
        for (field, label) in other.iter() {
            self.0.insert(field.to_string(), label.to_string());
        }
    }
}

impl From<BTreeMap<String, String>> for FieldMapping {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, String)> for FieldMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Automatic mapping
// ---------------------------------------------------------------------------

/// Result of [`map_fields`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingReport {
    pub mapping: FieldMapping,
    /// Best score seen per field, mapped or not.
    pub confidence: BTreeMap<String, f64>,
    /// Fields left unmapped, in schema order.
    pub unmapped: Vec<String>,
}

/// Map every canonical field to the header label most similar to one of
/// its synonyms.
///
/// Ties go to the first label, then the first synonym. Several fields may
/// end up on the same label.
pub fn map_fields(labels: &[String], schema: &CanonicalSchema, min_confidence: f64) -> MappingReport {
    let mut mapping = FieldMapping::new();
    let mut confidence = BTreeMap::new();
    let mut unmapped = Vec::new();

    for spec in &schema.fields {
        let mut best: Option<(&str, f64)> = None;
        for label in labels {
            for synonym in &spec.synonyms {
                let score = ratio(label, synonym);
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((label.as_str(), score));
                }
            }
        }

        let score = best.map_or(0.0, |(_, s)| s);
        confidence.insert(spec.name.clone(), score);

        match best {
            Some((label, score)) if score > min_confidence => {
                log::debug!("{}: '{}' -> '{label}' ({score:.2})", schema.domain, spec.name);
                mapping.insert(spec.name.clone(), label);
            }
            _ => unmapped.push(spec.name.clone()),
        }
    }

    if !unmapped.is_empty() {
        log::warn!(
            "{}: {} field(s) unmapped: {}",
            schema.domain,
            unmapped.len(),
            unmapped.join(", ")
        );
    }

    MappingReport {
        mapping,
        confidence,
        unmapped,
    }
}
