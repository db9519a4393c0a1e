// SQLite storage for canonical tables

use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use ledgermatch_recon::canonical::{CanonicalTable, TableSink};
use ledgermatch_recon::schema::CanonicalSchema;
use ledgermatch_recon::table::Cell;

/// Writes each canonical table to its own SQLite table.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    pub fn in_memory() -> Result<Self, rusqlite::Error> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_value(cell: &Cell) -> Value {
    match cell {
        Cell::Empty => Value::Null,
        Cell::Number(n) => Value::Real(*n),
        Cell::Text(s) => Value::Text(s.trim().to_string()),
        Cell::Date(_) => Value::Text(cell.display()),
    }
}

impl TableSink for SqliteSink {
    type Error = rusqlite::Error;

    /// Drops and recreates `name`. Amount and rate fields get REAL affinity,
    /// everything else TEXT.
    fn write(&mut self, table: &CanonicalTable, name: &str) -> Result<(), Self::Error> {
        let schema = CanonicalSchema::for_domain(table.domain);
        let mut columns = vec!["source_row INTEGER NOT NULL".to_string()];
        for field in &table.fields {
            let affinity = match schema.field(field) {
                Some(spec) if spec.kind.is_numeric() => "REAL",
                _ => "TEXT",
            };
            columns.push(format!("{} {affinity}", quote_ident(field)));
        }

        let table_name = quote_ident(name);
        let placeholders = vec!["?"; table.fields.len() + 1].join(", ");

        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {table_name}"), [])?;
        tx.execute(
            &format!("CREATE TABLE {table_name} ({})", columns.join(", ")),
            [],
        )?;
        {
            let mut stmt = tx.prepare(&format!("INSERT INTO {table_name} VALUES ({placeholders})"))?;
            for row in &table.rows {
                let mut values = Vec::with_capacity(row.values().len() + 1);
                values.push(Value::Integer(row.source_row as i64));
                values.extend(row.values().iter().map(sql_value));
                stmt.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;

        log::info!("stored {} rows in table {name}", table.len());
        Ok(())
    }
}
