// Pick a reader by file extension

use std::path::Path;

use ledgermatch_recon::RawTable;

/// Read a ledger extract. `sheet` only applies to spreadsheet formats.
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<RawTable, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" | "txt" => crate::csv::import(path),
        "tsv" | "tab" => crate::csv::import_tsv(path),
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => crate::xlsx::import(path, sheet),
        "" => Err(format!("{}: file has no extension", path.display())),
        other => Err(format!("{}: unsupported file type '.{other}'", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgermatch_recon::Cell;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn dispatches_on_extension() {
        let dir = tempdir().unwrap();
        let csv = dir.path().join("a.CSV");
        fs::write(&csv, "x;y\n1;2\n").unwrap();
        let table = read_table(&csv, None).unwrap();
        assert_eq!(table.rows()[1][1], Cell::text("2"));

        let tsv = dir.path().join("a.tsv");
        fs::write(&tsv, "x\ty\n1\t2\n").unwrap();
        assert_eq!(read_table(&tsv, Some("ignored")).unwrap().len(), 2);
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = read_table(Path::new("ledger.pdf"), None).unwrap_err();
        assert!(err.contains("unsupported file type '.pdf'"), "{err}");
        assert!(read_table(Path::new("ledger"), None).is_err());
    }
}
