use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::mapper::FieldMapping;
use crate::schema::{CanonicalSchema, Domain};
use crate::table::{Cell, TableView, MISSING};

// ---------------------------------------------------------------------------
// Canonical rows
// ---------------------------------------------------------------------------

/// One source row projected onto the canonical field set.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRow {
    /// Absolute row index in the raw table.
    pub source_row: usize,
    fields: Arc<[String]>,
    values: Vec<Cell>,
}

impl CanonicalRow {
    pub fn get(&self, field: &str) -> Option<&Cell> {
        let idx = self.fields.iter().position(|f| f == field)?;
        self.values.get(idx)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    pub fn is_blank(&self) -> bool {
        self.values.iter().all(Cell::is_empty)
    }
}

impl Serialize for CanonicalRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Values<'a>(&'a CanonicalRow);

        impl Serialize for Values<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.values.len()))?;
                for (field, value) in self.0.fields.iter().zip(&self.0.values) {
                    map.serialize_entry(field, value)?;
                }
                map.end()
            }
        }

        let mut row = serializer.serialize_struct("CanonicalRow", 2)?;
        row.serialize_field("source_row", &self.source_row)?;
        row.serialize_field("values", &Values(self))?;
        row.end()
    }
}

// ---------------------------------------------------------------------------
// Canonical table
// ---------------------------------------------------------------------------

/// Every row carries exactly `fields`, in schema order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalTable {
    pub domain: Domain,
    pub fields: Vec<String>,
    pub rows: Vec<CanonicalRow>,
    /// Mapped fields whose label was not found in the header.
    pub unresolved: Vec<String>,
}

impl CanonicalTable {
    /// Build a table from already-aligned values. Blank rows are dropped and
    /// short rows are padded with the missing marker.
    pub fn from_rows(domain: Domain, fields: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let shared: Arc<[String]> = fields.clone().into();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(idx, mut values)| {
                values.resize(fields.len(), MISSING);
                CanonicalRow {
                    source_row: idx,
                    fields: Arc::clone(&shared),
                    values,
                }
            })
            .filter(|row| !row.is_blank())
            .collect();
        Self {
            domain,
            fields,
            rows,
            unresolved: Vec::new(),
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Project the body of `view` onto `schema` through `mapping`.
///
/// Unmapped fields and labels missing from the header yield the missing
/// marker. Rows where every field is missing are dropped.
pub fn canonicalize(view: &TableView<'_>, mapping: &FieldMapping, schema: &CanonicalSchema) -> CanonicalTable {
    let labels = view.header_labels();
    let columns: HashMap<&str, usize> = labels
        .iter()
        .enumerate()
        .map(|(idx, label)| (label.as_str(), idx))
        .collect();

    let mut unresolved = Vec::new();
    let plan: Vec<Option<usize>> = schema
        .fields
        .iter()
        .map(|spec| {
            let label = mapping.get(&spec.name)?;
            let col = columns.get(label).copied();
            if col.is_none() {
                log::warn!(
                    "{}: '{}' is mapped to '{label}', which is not in the header",
                    schema.domain,
                    spec.name
                );
                unresolved.push(spec.name.clone());
            }
            col
        })
        .collect();

    let fields: Arc<[String]> = schema.field_names().into();
    let body = view.body();
    let mut rows = Vec::with_capacity(body.len());

    for (idx, source) in body.iter().enumerate() {
        let values: Vec<Cell> = plan
            .iter()
            .map(|col| match col.and_then(|c| source.get(c)) {
                Some(cell) if !cell.is_empty() => cell.clone(),
                _ => MISSING,
            })
            .collect();
        if values.iter().all(Cell::is_empty) {
            continue;
        }
        rows.push(CanonicalRow {
            source_row: view.offset + 1 + idx,
            fields: Arc::clone(&fields),
            values,
        });
    }

    log::debug!(
        "{}: {} of {} body rows kept",
        schema.domain,
        rows.len(),
        body.len()
    );

    CanonicalTable {
        domain: schema.domain,
        fields: fields.to_vec(),
        rows,
        unresolved,
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Destination for canonical tables (a database, a directory of files...).
pub trait TableSink {
    type Error;

    /// Store `table` under `name`, replacing any previous table of that name.
    fn write(&mut self, table: &CanonicalTable, name: &str) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{RawTable, TableSource};

    fn raw() -> RawTable {
        RawTable::from_csv_str(
            "Purchase Register,,,\n\
             GST Number,Vendor,Inv No,Taxable Amt\n\
             07ABCDE1234F1Z5,Acme,INV001,1000\n\
             ,,,\n\
             27PQRSX9876L1Z2,Beta,INV002,\n",
            b',',
        )
        .unwrap()
    }

    fn mapping() -> FieldMapping {
        [
            ("tax-registration-id", "GST Number"),
            ("party-name", "Vendor"),
            ("invoice-number", "Inv No"),
            ("taxable-value", "Taxable Amt"),
        ]
        .into_iter()
        .map(|(f, l)| (f.to_string(), l.to_string()))
        .collect()
    }

    #[test]
    fn projects_onto_schema() {
        let table = raw();
        let view = table.view_at(1).unwrap();
        let schema = CanonicalSchema::register();
        let canon = canonicalize(&view, &mapping(), &schema);

        assert_eq!(canon.fields, schema.field_names());
        assert_eq!(canon.len(), 2);
        for row in &canon.rows {
            assert_eq!(row.values().len(), schema.fields.len());
        }

        let first = &canon.rows[0];
        assert_eq!(first.source_row, 2);
        assert_eq!(first.get("party-name"), Some(&Cell::text("Acme")));
        assert_eq!(first.get("taxable-value"), Some(&Cell::text("1000")));
        assert_eq!(first.get("cess"), Some(&MISSING));
        assert_eq!(first.get("no-such-field"), None);

        // Blank row 3 dropped, order kept.
        assert_eq!(canon.rows[1].source_row, 4);
        assert_eq!(canon.rows[1].get("taxable-value"), Some(&MISSING));
    }

    #[test]
    fn empty_mapping_drops_every_row() {
        let table = raw();
        let view = table.view_at(1).unwrap();
        let canon = canonicalize(&view, &FieldMapping::new(), &CanonicalSchema::register());
        assert!(canon.is_empty());
        assert_eq!(canon.fields.len(), 11);
    }

    #[test]
    fn unknown_label_is_unresolved() {
        let table = raw();
        let view = table.view_at(1).unwrap();
        let mut m = mapping();
        m.insert("cess", "Cess Amount");
        let canon = canonicalize(&view, &m, &CanonicalSchema::register());
        assert_eq!(canon.unresolved, vec!["cess"]);
        assert!(canon.rows.iter().all(|r| r.get("cess") == Some(&MISSING)));
    }

    #[test]
    fn two_fields_may_share_a_column() {
        let table = raw();
        let view = table.view_at(1).unwrap();
        let mut m = mapping();
        m.insert("state", "Vendor");
        let canon = canonicalize(&view, &m, &CanonicalSchema::register());
        assert_eq!(canon.rows[0].get("state"), canon.rows[0].get("party-name"));
    }

    #[test]
    fn row_serializes_with_field_names() {
        let canon = CanonicalTable::from_rows(
            Domain::Register,
            vec!["invoice-number".into(), "cess".into()],
            vec![vec![Cell::text("INV1"), Cell::Number(2.5)], vec![Cell::text("INV2")]],
        );
        let json = serde_json::to_value(&canon.rows[1]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"source_row": 1, "values": {"invoice-number": "INV2", "cess": null}})
        );
    }

    #[test]
    fn from_rows_drops_blank_rows() {
        let canon = CanonicalTable::from_rows(
            Domain::Statement,
            vec!["invoice-number".into()],
            vec![vec![Cell::Empty], vec![Cell::text("X")]],
        );
        assert_eq!(canon.len(), 1);
        assert_eq!(canon.rows[0].source_row, 1);
    }
}
