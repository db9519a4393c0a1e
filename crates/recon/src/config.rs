use std::collections::BTreeMap;

use serde::Deserialize;

use crate::engine::ReconOptions;
use crate::error::ReconError;
use crate::mapper::{FieldMapping, DEFAULT_MIN_CONFIDENCE};
use crate::model::{KeyNormalization, MatchKey, MatchStrategy};
use crate::pipeline::SourceSettings;
use crate::schema::{CanonicalSchema, Domain};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    pub sources: SourcesConfig,
    #[serde(rename = "match", default)]
    pub matching: MatchConfig,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub a: SourceConfig,
    pub b: SourceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Path relative to the config file.
    pub file: String,
    pub domain: Domain,
    #[serde(default)]
    pub sheet: Option<String>,
    /// Zero-based header row; skips detection when set.
    #[serde(default)]
    pub header_row: Option<usize>,
    #[serde(default = "default_true")]
    pub refine_header: bool,
    /// Manual overrides, field = label.
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
    #[serde(default)]
    pub synonyms: BTreeMap<String, Vec<String>>,
}

impl SourceConfig {
    /// The domain schema with this source's extra synonyms.
    pub fn schema(&self) -> Result<CanonicalSchema, ReconError> {
        CanonicalSchema::for_domain(self.domain).with_extra_synonyms(&self.synonyms)
    }

    pub fn settings(&self, mapping: &MappingConfig) -> SourceSettings {
        SourceSettings {
            min_confidence: mapping.min_confidence,
            header_row: self.header_row,
            overrides: FieldMapping::from(self.columns.clone()),
            refine_header: self.refine_header,
        }
    }
}

// ---------------------------------------------------------------------------
// Match + Tolerance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MatchConfig {
    /// `[field in A, field in B]` pairs.
    #[serde(default = "default_key")]
    pub key: Vec<(String, String)>,
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default = "default_true")]
    pub allow_many_to_one: bool,
    #[serde(default)]
    pub strategy: MatchStrategy,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            key: default_key(),
            case_insensitive: false,
            allow_many_to_one: true,
            strategy: MatchStrategy::default(),
        }
    }
}

fn default_key() -> Vec<(String, String)> {
    ReconOptions::default().match_key.pairs
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToleranceConfig {
    #[serde(default = "default_tolerance_fields")]
    pub fields: Vec<String>,
    #[serde(default = "default_amount")]
    pub amount: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            fields: default_tolerance_fields(),
            amount: default_amount(),
        }
    }
}

fn default_tolerance_fields() -> Vec<String> {
    ReconOptions::default().tolerance_fields
}

fn default_amount() -> f64 {
    ReconOptions::default().tolerance
}

// ---------------------------------------------------------------------------
// Mapping + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MappingConfig {
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Directory of persisted mappings, relative to the config file.
    #[serde(default)]
    pub cache_dir: Option<String>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            cache_dir: None,
        }
    }
}

fn default_min_confidence() -> f64 {
    DEFAULT_MIN_CONFIDENCE
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub xlsx: Option<String>,
    #[serde(default)]
    pub sqlite: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let schema_a = self.sources.a.schema()?;
        let schema_b = self.sources.b.schema()?;

        for (side, source) in [("a", &self.sources.a), ("b", &self.sources.b)] {
            if source.file.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "sources.{side}: file must not be empty"
                )));
            }
        }

        if self.matching.key.is_empty() {
            return Err(ReconError::EmptyMatchKey);
        }
        for (field_a, field_b) in &self.matching.key {
            require_field(&schema_a, "a", field_a)?;
            require_field(&schema_b, "b", field_b)?;
        }

        if !self.tolerance.amount.is_finite() || self.tolerance.amount < 0.0 {
            return Err(ReconError::InvalidTolerance(self.tolerance.amount));
        }
        for field in &self.tolerance.fields {
            for (side, schema) in [("a", &schema_a), ("b", &schema_b)] {
                let spec = require_field(schema, side, field)?;
                if !spec.kind.is_numeric() {
                    return Err(ReconError::ConfigValidation(format!(
                        "tolerance field '{field}' is not numeric in sources.{side} ({})",
                        schema.domain
                    )));
                }
            }
        }

        let confidence = self.mapping.min_confidence;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ReconError::ConfigValidation(format!(
                "mapping.min_confidence must be between 0 and 1, got {confidence}"
            )));
        }

        for (side, source, schema) in [
            ("a", &self.sources.a, &schema_a),
            ("b", &self.sources.b, &schema_b),
        ] {
            for field in source.columns.keys() {
                require_field(schema, side, field)?;
            }
        }

        Ok(())
    }

    /// Engine options described by the `[match]` and `[tolerance]` sections.
    pub fn to_options(&self) -> ReconOptions {
        ReconOptions {
            match_key: MatchKey {
                pairs: self.matching.key.clone(),
            },
            tolerance_fields: self.tolerance.fields.clone(),
            tolerance: self.tolerance.amount,
            allow_many_to_one: self.matching.allow_many_to_one,
            normalization: KeyNormalization {
                case_insensitive: self.matching.case_insensitive,
            },
            strategy: self.matching.strategy,
        }
    }
}

fn require_field<'s>(
    schema: &'s CanonicalSchema,
    side: &str,
    field: &str,
) -> Result<&'s crate::schema::FieldSpec, ReconError> {
    schema.field(field).ok_or_else(|| ReconError::UnknownField {
        table: format!("sources.{side} ({})", schema.domain),
        field: field.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name = "April purchases"

[sources.a]
file = "purchase.csv"
domain = "register"

[sources.b]
file = "statement.csv"
domain = "statement"
"#;

    #[test]
    fn parse_minimal_uses_defaults() {
        let config = ReconConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.name, "April purchases");
        assert_eq!(config.sources.a.domain, Domain::Register);
        assert!(config.sources.a.refine_header);
        assert!(config.sources.b.header_row.is_none());
        assert_eq!(config.matching.key.len(), 2);
        assert!(config.matching.allow_many_to_one);
        assert_eq!(config.tolerance.amount, 0.01);
        assert_eq!(config.tolerance.fields.len(), 5);
        assert_eq!(config.mapping.min_confidence, 0.4);
        assert!(config.output.json.is_none());

        assert_eq!(config.to_options(), ReconOptions::default());
    }

    #[test]
    fn parse_full() {
        let input = r#"
name = "Full"

[sources.a]
file = "purchase.xlsx"
domain = "register"
sheet = "Sheet1"
header_row = 6
refine_header = false

[sources.a.columns]
"invoice-number" = "Bill No"

[sources.a.synonyms]
"taxable-value" = ["assessable value", "net amount"]

[sources.b]
file = "statement.xlsx"
domain = "statement"

[match]
key = [["invoice-number", "invoice-number"]]
case_insensitive = true
allow_many_to_one = false
strategy = "scan"

[tolerance]
fields = ["taxable-value"]
amount = 1.0

[mapping]
min_confidence = 0.6
cache_dir = ".ledgermatch"

[output]
json = "result.json"
xlsx = "report.xlsx"
sqlite = "recon.db"
"#;
        let config = ReconConfig::from_toml(input).unwrap();
        let a = &config.sources.a;
        assert_eq!(a.sheet.as_deref(), Some("Sheet1"));
        assert_eq!(a.header_row, Some(6));
        assert_eq!(a.columns["invoice-number"], "Bill No");

        let schema = a.schema().unwrap();
        let synonyms = &schema.field("taxable-value").unwrap().synonyms;
        assert!(synonyms.contains(&"net amount".to_string()));

        let settings = a.settings(&config.mapping);
        assert_eq!(settings.min_confidence, 0.6);
        assert_eq!(settings.overrides.get("invoice-number"), Some("Bill No"));
        assert!(!settings.refine_header);

        let options = config.to_options();
        assert_eq!(options.match_key.pairs.len(), 1);
        assert!(options.normalization.case_insensitive);
        assert!(!options.allow_many_to_one);
        assert_eq!(options.strategy, MatchStrategy::Scan);
        assert_eq!(options.tolerance, 1.0);

        assert_eq!(config.mapping.cache_dir.as_deref(), Some(".ledgermatch"));
        assert_eq!(config.output.sqlite.as_deref(), Some("recon.db"));
    }

    #[test]
    fn rejects_unknown_domain() {
        let input = MINIMAL.replace("domain = \"statement\"", "domain = \"ledger\"");
        assert!(matches!(
            ReconConfig::from_toml(&input),
            Err(ReconError::ConfigParse(_))
        ));
    }

    #[test]
    fn rejects_key_field_missing_from_domain() {
        // Both sides are registers, so the default key's B field does not exist.
        let input = MINIMAL.replace("domain = \"statement\"", "domain = \"register\"");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert_eq!(
            err,
            ReconError::UnknownField {
                table: "sources.b (register)".into(),
                field: "supplier-tax-registration-id".into()
            }
        );
    }

    #[test]
    fn rejects_empty_key() {
        let input = format!("{MINIMAL}\n[match]\nkey = []\n");
        assert_eq!(ReconConfig::from_toml(&input).unwrap_err(), ReconError::EmptyMatchKey);
    }

    #[test]
    fn rejects_text_tolerance_field() {
        let input = format!(
            "{MINIMAL}\n[match]\nkey = [[\"invoice-number\", \"invoice-number\"]]\n\n[tolerance]\nfields = [\"invoice-date\"]\n"
        );
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, ReconError::ConfigValidation(msg) if msg.contains("invoice-date")));
    }

    #[test]
    fn rejects_negative_tolerance() {
        let input = format!("{MINIMAL}\n[tolerance]\namount = -0.5\n");
        assert_eq!(
            ReconConfig::from_toml(&input).unwrap_err(),
            ReconError::InvalidTolerance(-0.5)
        );
    }

    #[test]
    fn rejects_confidence_out_of_range() {
        let input = format!("{MINIMAL}\n[mapping]\nmin_confidence = 1.5\n");
        assert!(matches!(
            ReconConfig::from_toml(&input),
            Err(ReconError::ConfigValidation(_))
        ));
    }

    #[test]
    fn rejects_override_for_unknown_field() {
        let input = MINIMAL.replace(
            "domain = \"register\"\n",
            "domain = \"register\"\n\n[sources.a.columns]\n\"voucher\" = \"Voucher\"\n",
        );
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, ReconError::UnknownField { field, .. } if field == "voucher"));
    }

    #[test]
    fn rejects_synonyms_for_unknown_field() {
        let input = MINIMAL.replace(
            "domain = \"statement\"\n",
            "domain = \"statement\"\n\n[sources.b.synonyms]\n\"party-name\" = [\"vendor\"]\n",
        );
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, ReconError::UnknownField { field, .. } if field == "party-name"));
    }

    #[test]
    fn rejects_missing_sources() {
        let err = ReconConfig::from_toml("name = \"x\"\n").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }
}
