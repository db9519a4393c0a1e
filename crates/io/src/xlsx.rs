// Spreadsheet import (xlsx, xls, xlsb, ods) and report export (xlsx only)
//
// Import: the first (or named) worksheet as a raw cell grid; no header handling.
// Export: a presentation snapshot of a reconciliation report. Not read back.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

use ledgermatch_recon::canonical::CanonicalRow;
use ledgermatch_recon::model::{ReconRecord, ReconReport, ReconSummary};
use ledgermatch_recon::schema::{CanonicalSchema, FieldKind};
use ledgermatch_recon::table::{Cell, RawTable};

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Read one worksheet into a [`RawTable`]. `sheet = None` takes the first.
pub fn import(path: &Path, sheet: Option<&str>) -> Result<RawTable, String> {
    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| format!("Failed to open spreadsheet: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err("Spreadsheet contains no sheets".to_string());
    }

    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|s| s.as_str() == name)
            .cloned()
            .ok_or_else(|| {
                format!(
                    "Sheet '{}' not found (available: {})",
                    name,
                    sheet_names.join(", ")
                )
            })?,
        None => sheet_names[0].clone(),
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    // Range start offset (data may not begin at A1)
    let (start_row, start_col) = range.start().unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; start_col as usize];
        cells.extend(row.iter().map(convert));
        rows.push(cells);
    }

    log::debug!(
        "read {} rows from sheet '{}' of {}",
        rows.len(),
        sheet_name,
        path.display()
    );
    Ok(RawTable::new(rows))
}

fn convert(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s.as_str()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        // Store as TRUE/FALSE text, the way a spreadsheet displays it
        Data::Bool(b) => Cell::text(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => Cell::text(format!("#{:?}", e)),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) => Cell::Date(dt.date()),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => match parse_iso_date(s) {
            Some(d) => Cell::Date(d),
            None => Cell::text(s.as_str()),
        },
        Data::DurationIso(s) => Cell::text(s.as_str()),
    }
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let date_part = s.get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Write a report as a workbook with Summary, Matched, Mismatched,
/// Only in A and Only in B sheets.
pub fn export_report(
    path: &Path,
    report: &ReconReport,
    schema_a: &CanonicalSchema,
    schema_b: &CanonicalSchema,
) -> Result<(), String> {
    let mut workbook = Workbook::new();
    let styles = Styles::new();
    let outcome = &report.outcome;

    let summary = add_sheet(&mut workbook, "Summary")?;
    write_summary(summary, report, &styles)?;

    let paired = [
        ("Matched", &outcome.matched),
        ("Mismatched", &outcome.mismatched),
    ];
    for (name, records) in paired {
        let ws = add_sheet(&mut workbook, name)?;
        write_paired(ws, records, schema_a, schema_b, &styles)?;
    }

    let ws = add_sheet(&mut workbook, "Only in A")?;
    let rows: Vec<&CanonicalRow> = outcome.only_in_a.iter().filter_map(ReconRecord::a).collect();
    write_single(ws, &rows, schema_a, &styles)?;

    let ws = add_sheet(&mut workbook, "Only in B")?;
    let rows: Vec<&CanonicalRow> = outcome.only_in_b.iter().filter_map(ReconRecord::b).collect();
    write_single(ws, &rows, schema_b, &styles)?;

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;
    log::info!("wrote report workbook {}", path.display());
    Ok(())
}

struct Styles {
    header: Format,
    amount: Format,
    percent: Format,
}

impl Styles {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            amount: Format::new().set_num_format("#,##0.00"),
            percent: Format::new().set_num_format("0.0%"),
        }
    }
}

fn add_sheet<'w>(workbook: &'w mut Workbook, name: &str) -> Result<&'w mut Worksheet, String> {
    workbook
        .add_worksheet()
        .set_name(name)
        .map_err(|e| format!("Failed to create sheet '{}': {}", name, e))
}

fn xerr(e: rust_xlsxwriter::XlsxError) -> String {
    format!("Failed to write cell: {}", e)
}

fn write_header(ws: &mut Worksheet, labels: &[String], styles: &Styles) -> Result<(), String> {
    for (col, label) in labels.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, label, &styles.header)
            .map_err(xerr)?;
        ws.set_column_width(col as u16, 16).map_err(xerr)?;
    }
    ws.set_freeze_panes(1, 0).map_err(xerr)?;
    Ok(())
}

fn write_cell(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    kind: FieldKind,
    styles: &Styles,
) -> Result<(), String> {
    match cell {
        Cell::Empty => {}
        Cell::Number(n) if kind == FieldKind::Amount => {
            ws.write_number_with_format(row, col, *n, &styles.amount)
                .map_err(xerr)?;
        }
        Cell::Number(n) => {
            ws.write_number(row, col, *n).map_err(xerr)?;
        }
        Cell::Text(_) | Cell::Date(_) => {
            ws.write_string(row, col, cell.display()).map_err(xerr)?;
        }
    }
    Ok(())
}

fn write_row(
    ws: &mut Worksheet,
    row: u32,
    first_col: u16,
    source: &CanonicalRow,
    schema: &CanonicalSchema,
    styles: &Styles,
) -> Result<(), String> {
    // Spreadsheet row numbers are 1-based
    ws.write_number(row, first_col, (source.source_row + 1) as f64)
        .map_err(xerr)?;
    for (i, spec) in schema.fields.iter().enumerate() {
        let cell = source.get(&spec.name).unwrap_or(&Cell::Empty);
        write_cell(ws, row, first_col + 1 + i as u16, cell, spec.kind, styles)?;
    }
    Ok(())
}

fn write_summary(ws: &mut Worksheet, report: &ReconReport, styles: &Styles) -> Result<(), String> {
    let meta = &report.meta;
    let s = &report.outcome.summary;

    let text_rows = [
        ("Name", meta.name.clone()),
        ("Engine version", meta.engine_version.clone()),
        ("Run at", meta.run_at.clone()),
        ("Strategy", meta.strategy.to_string()),
        ("Many-to-one", meta.allow_many_to_one.to_string()),
    ];
    let count_rows = [
        ("Header row A", meta.header_row_a + 1),
        ("Header row B", meta.header_row_b + 1),
        ("Rows in A", s.rows_a),
        ("Rows in B", s.rows_b),
        ("Unclaimed in B", s.unclaimed_b),
        ("Coercion failures", s.coercion_failures),
    ];

    let mut row = 0u32;
    for (label, value) in text_rows {
        ws.write_string_with_format(row, 0, label, &styles.header)
            .map_err(xerr)?;
        ws.write_string(row, 1, value).map_err(xerr)?;
        row += 1;
    }
    for (label, value) in count_rows {
        ws.write_string_with_format(row, 0, label, &styles.header)
            .map_err(xerr)?;
        ws.write_number(row, 1, value as f64).map_err(xerr)?;
        row += 1;
    }

    row += 1;
    for (col, label) in ["Category", "Count", "Percentage"].iter().enumerate() {
        ws.write_string_with_format(row, col as u16, *label, &styles.header)
            .map_err(xerr)?;
    }
    for (label, count, share) in class_shares(s) {
        row += 1;
        ws.write_string(row, 0, label).map_err(xerr)?;
        ws.write_number(row, 1, count as f64).map_err(xerr)?;
        ws.write_number_with_format(row, 2, share, &styles.percent)
            .map_err(xerr)?;
    }

    row += 2;
    for (col, label) in ["Field", "Total A", "Total B", "Difference"].iter().enumerate() {
        ws.write_string_with_format(row, col as u16, *label, &styles.header)
            .map_err(xerr)?;
    }
    for total in &s.field_totals {
        row += 1;
        ws.write_string(row, 0, &total.field).map_err(xerr)?;
        ws.write_number_with_format(row, 1, total.total_a, &styles.amount)
            .map_err(xerr)?;
        ws.write_number_with_format(row, 2, total.total_b, &styles.amount)
            .map_err(xerr)?;
        ws.write_number_with_format(row, 3, total.difference, &styles.amount)
            .map_err(xerr)?;
    }

    ws.set_column_width(0, 20).map_err(xerr)?;
    ws.set_column_width(1, 28).map_err(xerr)?;
    Ok(())
}

/// Count and share of each record class, then a `Total` line.
/// Shares are fractions of the total; all zero when there are no records.
fn class_shares(s: &ReconSummary) -> Vec<(&'static str, usize, f64)> {
    let classes = [
        ("Matched", s.matched),
        ("Mismatched", s.mismatched),
        ("Only in A", s.only_in_a),
        ("Only in B", s.only_in_b),
    ];
    let total: usize = classes.iter().map(|(_, n)| n).sum();
    let share = |n: usize| if total == 0 { 0.0 } else { n as f64 / total as f64 };

    let mut lines: Vec<_> = classes.iter().map(|&(label, n)| (label, n, share(n))).collect();
    lines.push(("Total", total, share(total)));
    lines
}

fn write_paired(
    ws: &mut Worksheet,
    records: &[ReconRecord],
    schema_a: &CanonicalSchema,
    schema_b: &CanonicalSchema,
    styles: &Styles,
) -> Result<(), String> {
    let delta_fields: Vec<String> = records
        .first()
        .map(|r| r.deltas().iter().map(|d| d.field.clone()).collect())
        .unwrap_or_default();

    let mut labels = vec!["A row".to_string()];
    labels.extend(schema_a.fields.iter().map(|f| format!("A {}", f.name)));
    labels.push("B row".to_string());
    labels.extend(schema_b.fields.iter().map(|f| format!("B {}", f.name)));
    labels.extend(delta_fields.iter().map(|f| format!("{f} difference")));
    write_header(ws, &labels, styles)?;

    let b_col = 1 + schema_a.fields.len() as u16;
    let delta_col = b_col + 1 + schema_b.fields.len() as u16;

    for (i, record) in records.iter().enumerate() {
        let row = 1 + i as u32;
        if let Some(a) = record.a() {
            write_row(ws, row, 0, a, schema_a, styles)?;
        }
        if let Some(b) = record.b() {
            write_row(ws, row, b_col, b, schema_b, styles)?;
        }
        for (j, delta) in record.deltas().iter().enumerate() {
            ws.write_number_with_format(row, delta_col + j as u16, delta.difference, &styles.amount)
                .map_err(xerr)?;
        }
    }
    Ok(())
}

fn write_single(
    ws: &mut Worksheet,
    rows: &[&CanonicalRow],
    schema: &CanonicalSchema,
    styles: &Styles,
) -> Result<(), String> {
    let mut labels = vec!["Row".to_string()];
    labels.extend(schema.field_names());
    write_header(ws, &labels, styles)?;

    for (i, source) in rows.iter().enumerate() {
        write_row(ws, 1 + i as u32, 0, source, schema, styles)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgermatch_recon::engine::{reconcile, ReconOptions};
    use ledgermatch_recon::pipeline::{build_report, prepare, SourceSettings};
    use rust_xlsxwriter::ExcelDateTime;
    use tempfile::tempdir;

    #[test]
    fn import_first_sheet_with_title_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("purchase.xlsx");

        let mut wb = Workbook::new();
        let ws = wb.add_worksheet().set_name("Register").unwrap();
        ws.write_string(0, 0, "Purchase Register").unwrap();
        ws.write_string(2, 0, "GSTIN").unwrap();
        ws.write_string(2, 1, "Taxable Value").unwrap();
        ws.write_string(3, 0, "07ABCDE1234F1Z5").unwrap();
        ws.write_number(3, 1, 1000.5).unwrap();
        ws.write_boolean(3, 2, true).unwrap();
        let date = ExcelDateTime::from_ymd(2024, 4, 1).unwrap();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        ws.write_datetime_with_format(3, 3, &date, &date_format).unwrap();
        wb.save(&path).unwrap();

        let table = import(&path, None).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.rows()[0][0], Cell::text("Purchase Register"));
        assert!(table.rows()[1].iter().all(Cell::is_empty));
        assert_eq!(table.rows()[3][1], Cell::Number(1000.5));
        assert_eq!(table.rows()[3][2], Cell::text("TRUE"));
        assert_eq!(
            table.rows()[3][3],
            Cell::Date(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap())
        );
    }

    #[test]
    fn import_named_sheet_and_offset_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("two.xlsx");

        let mut wb = Workbook::new();
        wb.add_worksheet().set_name("Cover").unwrap().write_string(0, 0, "x").unwrap();
        let ws = wb.add_worksheet().set_name("Data").unwrap();
        ws.write_string(1, 2, "GSTIN").unwrap();
        wb.save(&path).unwrap();

        let table = import(&path, Some("Data")).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1][2], Cell::text("GSTIN"));
        assert_eq!(table.rows()[1][0], Cell::Empty);

        let err = import(&path, Some("Missing")).unwrap_err();
        assert!(err.contains("Cover, Data"), "{err}");
    }

    #[test]
    fn iso_dates() {
        assert_eq!(
            parse_iso_date("2024-04-01T00:00:00"),
            NaiveDate::from_ymd_opt(2024, 4, 1)
        );
        assert_eq!(parse_iso_date("01-04-2024"), None);
        assert_eq!(parse_iso_date("2024"), None);
    }

    #[test]
    fn export_report_sheets() {
        let a_csv = "GSTIN,Party Name,Invoice No,Invoice Date,Taxable Value\n\
                     07A,Acme,1,2024-04-01,100\n\
                     07A,Acme,2,2024-04-02,200\n";
        let b_csv = "GSTIN of supplier,Trade/Legal name,Invoice number,Invoice Date,Taxable Value\n\
                     07A,Acme,1,01-04-2024,100\n\
                     07A,Acme,3,03-04-2024,50\n";
        let schema_a = CanonicalSchema::register();
        let schema_b = CanonicalSchema::statement();
        let a = prepare(
            &RawTable::from_csv_str(a_csv, b',').unwrap(),
            &schema_a,
            &SourceSettings::default(),
            None,
        );
        let b = prepare(
            &RawTable::from_csv_str(b_csv, b',').unwrap(),
            &schema_b,
            &SourceSettings::default(),
            None,
        );
        let options = ReconOptions::default();
        let outcome = reconcile(&a.table, &b.table, &options).unwrap();
        let report = build_report("export test", &a, &b, &options, outcome);

        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        export_report(&path, &report, &schema_a, &schema_b).unwrap();

        let mut wb: Sheets<_> = open_workbook_auto(&path).unwrap();
        assert_eq!(
            wb.sheet_names().to_vec(),
            vec!["Summary", "Matched", "Mismatched", "Only in A", "Only in B"]
        );

        let summary = wb.worksheet_range("Summary").unwrap();
        assert_eq!(summary.get_value((0, 1)), Some(&Data::String("export test".into())));

        let class_row = |label: &str| -> Vec<Data> {
            summary
                .rows()
                .find(|r| r.first() == Some(&Data::String(label.into())))
                .unwrap_or_else(|| panic!("no '{label}' line"))
                .to_vec()
        };
        assert_eq!(class_row("Matched")[1], Data::Float(1.0));
        match class_row("Matched")[2] {
            Data::Float(share) => assert!((share - 1.0 / 3.0).abs() < 1e-9),
            ref other => panic!("share is not a number: {other:?}"),
        }
        assert_eq!(class_row("Total")[1], Data::Float(3.0));
        assert_eq!(class_row("Total")[2], Data::Float(1.0));

        let matched = wb.worksheet_range("Matched").unwrap();
        assert_eq!(matched.get_value((0, 0)), Some(&Data::String("A row".into())));
        // One matched pair below the header
        assert_eq!(matched.get_size().0, 2);

        let only_a = wb.worksheet_range("Only in A").unwrap();
        assert_eq!(only_a.get_value((1, 0)), Some(&Data::Float(3.0)));
    }

    #[test]
    fn class_shares_sum_to_total() {
        let summary = ReconSummary {
            matched: 3,
            mismatched: 1,
            only_in_a: 0,
            only_in_b: 4,
            ..ReconSummary::default()
        };
        let lines = class_shares(&summary);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], ("Matched", 3, 0.375));
        assert_eq!(lines[2], ("Only in A", 0, 0.0));
        assert_eq!(lines[4], ("Total", 8, 1.0));

        let empty = class_shares(&ReconSummary::default());
        assert!(empty.iter().all(|&(_, n, share)| n == 0 && share == 0.0));
    }
}
