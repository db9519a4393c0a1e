use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Domains
// ---------------------------------------------------------------------------

/// Which kind of extract a table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Internal purchase register.
    Register,
    /// Third-party tax-filing statement.
    Statement,
}

impl Domain {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Statement => "statement",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "register" => Ok(Self::Register),
            "statement" => Ok(Self::Statement),
            other => Err(format!(
                "unknown domain '{other}' (expected 'register' or 'statement')"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Date,
    Amount,
    Rate,
}

impl FieldKind {
    /// Amounts and rates can be compared with a tolerance.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Amount | Self::Rate)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub synonyms: Vec<String>,
}

impl FieldSpec {
    fn new(name: &str, kind: FieldKind, synonyms: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Ordered canonical fields of one domain, each with its header synonyms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalSchema {
    pub domain: Domain,
    pub fields: Vec<FieldSpec>,
}

impl CanonicalSchema {
    pub fn register() -> Self {
        use FieldKind::*;
        Self {
            domain: Domain::Register,
            fields: vec![
                FieldSpec::new(
                    "tax-registration-id",
                    Text,
                    &["gstin", "gstin/uin", "gst number", "gst no", "tax registration id"],
                ),
                FieldSpec::new(
                    "party-name",
                    Text,
                    &["party name", "name of party", "vendor", "supplier name", "party"],
                ),
                FieldSpec::new("state", Text, &["state", "state name", "place"]),
                FieldSpec::new(
                    "invoice-number",
                    Text,
                    &["invoice no", "inv no", "invoice number", "bill no", "voucher no"],
                ),
                FieldSpec::new(
                    "invoice-date",
                    Date,
                    &["invoice date", "inv date", "bill date", "date"],
                ),
                FieldSpec::new("tax-rate", Rate, &["rate", "tax rate", "gst rate", "rate %"]),
                FieldSpec::new(
                    "taxable-value",
                    Amount,
                    &["taxable value", "taxable amt", "taxable amount", "assessable value"],
                ),
                FieldSpec::new(
                    "integrated-tax",
                    Amount,
                    &["igst", "integrated tax", "igst amount"],
                ),
                FieldSpec::new("central-tax", Amount, &["cgst", "central tax", "cgst amount"]),
                FieldSpec::new(
                    "state-tax",
                    Amount,
                    &["sgst", "sgst/utgst", "state tax", "sgst amount"],
                ),
                FieldSpec::new("cess", Amount, &["cess", "cess amount"]),
            ],
        }
    }

    pub fn statement() -> Self {
        use FieldKind::*;
        Self {
            domain: Domain::Statement,
            fields: vec![
                FieldSpec::new(
                    "supplier-tax-registration-id",
                    Text,
                    &["gstin of supplier", "supplier gstin", "gstin", "gst number"],
                ),
                FieldSpec::new(
                    "supplier-name",
                    Text,
                    &["trade/legal name", "supplier name", "trade name", "legal name"],
                ),
                FieldSpec::new(
                    "invoice-number",
                    Text,
                    &["invoice number", "invoice no", "inv no", "document number"],
                ),
                FieldSpec::new(
                    "invoice-type",
                    Text,
                    &["invoice type", "type", "document type"],
                ),
                FieldSpec::new(
                    "invoice-date",
                    Date,
                    &["invoice date", "inv date", "document date", "date"],
                ),
                FieldSpec::new(
                    "invoice-value",
                    Amount,
                    &["invoice value", "invoice value(₹)", "total value"],
                ),
                FieldSpec::new("place-of-supply", Text, &["place of supply", "pos"]),
                FieldSpec::new("tax-rate", Rate, &["rate", "rate(%)", "tax rate"]),
                FieldSpec::new(
                    "taxable-value",
                    Amount,
                    &["taxable value", "taxable value (₹)", "taxable amt"],
                ),
                FieldSpec::new(
                    "integrated-tax",
                    Amount,
                    &["integrated tax", "igst", "integrated tax(₹)"],
                ),
                FieldSpec::new(
                    "central-tax",
                    Amount,
                    &["central tax", "cgst", "central tax(₹)"],
                ),
                FieldSpec::new(
                    "state-tax",
                    Amount,
                    &["state/ut tax", "sgst", "state tax", "state/ut tax(₹)"],
                ),
                FieldSpec::new("cess", Amount, &["cess", "cess(₹)"]),
                FieldSpec::new(
                    "credit-eligibility",
                    Text,
                    &["itc availability", "itc available", "eligibility", "itc"],
                ),
            ],
        }
    }

    pub fn for_domain(domain: Domain) -> Self {
        match domain {
            Domain::Register => Self::register(),
            Domain::Statement => Self::statement(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Append configured synonyms. Every key must name a field of this schema.
    pub fn with_extra_synonyms(
        mut self,
        extra: &BTreeMap<String, Vec<String>>,
    ) -> Result<Self, ReconError> {
        for (name, synonyms) in extra {
            let domain = self.domain;
            let spec = self
                .fields
                .iter_mut()
                .find(|f| &f.name == name)
                .ok_or_else(|| ReconError::UnknownField {
                    table: domain.to_string(),
                    field: name.clone(),
                })?;
            for synonym in synonyms {
                let synonym = synonym.trim().to_lowercase();
                if !synonym.is_empty() && !spec.synonyms.contains(&synonym) {
                    spec.synonyms.push(synonym);
                }
            }
        }
        Ok(self)
    }
}
