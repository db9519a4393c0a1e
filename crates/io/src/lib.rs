// File I/O around the reconciliation engine

pub mod csv;
pub mod json;
pub mod load;
pub mod sqlite;
pub mod xlsx;

pub use load::read_table;
