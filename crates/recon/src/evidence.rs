use crate::canonical::CanonicalTable;
use crate::coerce::coerce_amount;
use crate::engine::round_difference;
use crate::model::{FieldTotal, ReconOutcome, ReconSummary};

/// Compute summary statistics from classified records.
pub fn compute_summary(
    a: &CanonicalTable,
    b: &CanonicalTable,
    tolerance_fields: &[String],
    outcome: &ReconOutcome,
    unclaimed_b: usize,
    coercion_failures: usize,
) -> ReconSummary {
    let field_totals = tolerance_fields
        .iter()
        .map(|field| {
            let difference: f64 = outcome
                .matched
                .iter()
                .chain(&outcome.mismatched)
                .flat_map(|r| r.deltas())
                .filter(|d| &d.field == field)
                .map(|d| d.difference)
                .sum();
            FieldTotal {
                field: field.clone(),
                total_a: column_total(a, field),
                total_b: column_total(b, field),
                difference: round_difference(difference),
            }
        })
        .collect();

    ReconSummary {
        rows_a: a.len(),
        rows_b: b.len(),
        matched: outcome.matched.len(),
        mismatched: outcome.mismatched.len(),
        only_in_a: outcome.only_in_a.len(),
        only_in_b: outcome.only_in_b.len(),
        unclaimed_b,
        coercion_failures,
        field_totals,
    }
}

fn column_total(table: &CanonicalTable, field: &str) -> f64 {
    let total: f64 = table
        .rows
        .iter()
        .filter_map(|row| row.get(field))
        .map(|cell| coerce_amount(cell).value)
        .sum();
    round_difference(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{reconcile, ReconOptions};
    use crate::model::MatchKey;
    use crate::schema::Domain;
    use crate::table::Cell;

    fn table(domain: Domain, rows: Vec<(&str, f64)>) -> CanonicalTable {
        CanonicalTable::from_rows(
            domain,
            vec!["invoice-number".into(), "cess".into()],
            rows.into_iter()
                .map(|(inv, cess)| vec![Cell::text(inv), Cell::Number(cess)])
                .collect(),
        )
    }

    #[test]
    fn summary_counts_and_totals() {
        let a = table(Domain::Register, vec![("1", 10.0), ("2", 5.0), ("3", 1.0)]);
        let b = table(Domain::Statement, vec![("1", 10.0), ("2", 4.5), ("4", 2.0)]);
        let options = ReconOptions {
            match_key: MatchKey::new([("invoice-number", "invoice-number")]),
            tolerance_fields: vec!["cess".into()],
            ..ReconOptions::default()
        };
        let outcome = reconcile(&a, &b, &options).unwrap();
        let summary = &outcome.summary;

        assert_eq!(summary.rows_a, 3);
        assert_eq!(summary.rows_b, 3);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.mismatched, 1);
        assert_eq!(summary.only_in_a, 1);
        assert_eq!(summary.only_in_b, 1);

        let cess = &summary.field_totals[0];
        assert_eq!(cess.field, "cess");
        assert_eq!(cess.total_a, 16.0);
        assert_eq!(cess.total_b, 16.5);
        assert_eq!(cess.difference, 0.5);
    }
}
