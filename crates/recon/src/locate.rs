use crate::table::{Cell, TableSource};

/// A real header has at least this many columns.
pub const MIN_COLUMNS: usize = 5;

/// The first body row under a real header has at least this many values.
pub const MIN_POPULATED_CELLS: usize = 5;

/// Rows with at most this many values are title lines to [`refine`].
pub const MAX_TITLE_CELLS: usize = 1;

fn populated(row: &[Cell]) -> usize {
    row.iter().filter(|c| !c.is_empty()).count()
}

/// Find the row at which the data table starts.
///
/// Accepts the first offset whose view is at least [`MIN_COLUMNS`] wide and
/// whose first body row holds at least [`MIN_POPULATED_CELLS`] values.
/// Returns 0 when nothing qualifies.
pub fn locate<S: TableSource + ?Sized>(source: &S) -> usize {
    let total = source.row_count();

    for offset in 0..total {
        let Some(view) = source.view_at(offset) else {
            break;
        };
        if view.column_count() < MIN_COLUMNS {
            continue;
        }
        let body_cells = view.body().first().map(|row| populated(row)).unwrap_or(0);
        if body_cells >= MIN_POPULATED_CELLS {
            log::debug!("table located at offset {offset} ({body_cells} populated cells below)");
            return offset;
        }
    }

    if total > 0 {
        log::warn!("no table header qualified in {total} rows; using row 0");
    }
    0
}

/// Step down from a located offset past sparse title rows.
///
/// [`locate`] accepts the row directly above the first fully populated row,
/// which on extracts with a title block is the last title line rather than
/// the header. While the row at `offset` is blank or a one-cell title line
/// and the next row is populated, the next row is taken as the header.
/// Rows with two or more labels are kept, however narrow.
pub fn refine<S: TableSource + ?Sized>(source: &S, offset: usize) -> usize {
    let mut offset = offset;
    while let Some(view) = source.view_at(offset) {
        let header_cells = populated(view.header());
        let next_cells = view.body().first().map(|row| populated(row)).unwrap_or(0);
        if header_cells > MAX_TITLE_CELLS || next_cells < MIN_POPULATED_CELLS {
            break;
        }
        offset += 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{RawTable, TableView};

    fn csv(s: &str) -> RawTable {
        RawTable::from_csv_str(s, b',').unwrap()
    }

    const TITLED: &str = "\
Purchase Register,,,,,
Period: April,,,,,
,,,,,
GSTIN,Party,Invoice No,Date,Taxable,IGST
07ABCDE1234F1Z5,Acme,INV001,2024-04-01,1000,180
";

    #[test]
    fn accepts_row_above_first_populated_row() {
        assert_eq!(locate(&csv(TITLED)), 2);
    }

    #[test]
    fn refine_moves_to_header() {
        let table = csv(TITLED);
        assert_eq!(refine(&table, locate(&table)), 3);
    }

    #[test]
    fn refine_keeps_populated_header() {
        let table = csv("a,b,c,d,e\n1,2,3,4,5\n");
        assert_eq!(refine(&table, 0), 0);
        assert_eq!(refine(&RawTable::default(), 0), 0);
    }

    #[test]
    fn header_at_top() {
        let table = csv("a,b,c,d,e\n1,2,3,4,5\n");
        assert_eq!(locate(&table), 0);
    }

    #[test]
    fn empty_table_is_zero() {
        assert_eq!(locate(&RawTable::default()), 0);
    }

    #[test]
    fn nothing_qualifies_is_zero() {
        // Wide enough, but the body never has five values.
        let table = csv("a,b,c,d,e\n1,2,,,\n3,,,,\n");
        assert_eq!(locate(&table), 0);
        // Populated, but too narrow.
        let narrow = csv("a,b,c\n1,2,3\n");
        assert_eq!(locate(&narrow), 0);
    }

    #[test]
    fn four_populated_cells_do_not_qualify() {
        let table = csv("x,,,,,\na,b,c,d,,\np,q,r,s,t,\n");
        assert_eq!(locate(&table), 1);
    }

    #[test]
    fn narrow_preamble_is_skipped() {
        let table = csv("x\ny\nh1,h2,h3,h4,h5\n");
        // The first body row under offset 0 holds a single value; offset 1
        // sees the five-column row beneath it.
        assert_eq!(locate(&table), 1);
        assert_eq!(refine(&table, 1), 2);
    }

    #[test]
    fn refine_keeps_narrow_header() {
        // Four labels over six-value data rows is still the header.
        let table = csv(
            "Purchase Register,,,,,\n\
             GSTIN,Party Name,Invoice No,Taxable Value,,\n\
             07A,Acme,INV001,1000,180,0\n\
             27P,Beta,INV002,500,90,0\n",
        );
        assert_eq!(locate(&table), 1);
        assert_eq!(refine(&table, 1), 1);
    }

    #[test]
    fn refine_keeps_two_cell_row() {
        let table = csv("Period,April,,,,\na,b,c,d,e,f\n1,2,3,4,5,6\n");
        assert_eq!(refine(&table, 0), 0);
    }

    struct Reparsing(Vec<Vec<Cell>>);

    impl TableSource for Reparsing {
        fn row_count(&self) -> usize {
            self.0.len()
        }

        fn view_at(&self, offset: usize) -> Option<TableView<'_>> {
            (offset < self.0.len()).then(|| TableView::owned(offset, self.0[offset..].to_vec()))
        }
    }

    #[test]
    fn owned_views_locate_like_borrowed() {
        let table = csv(TITLED);
        let reparsing = Reparsing(table.rows().to_vec());
        assert_eq!(locate(&reparsing), locate(&table));
        assert_eq!(refine(&reparsing, 2), 3);
    }
}
