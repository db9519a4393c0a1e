//! `ledgermatch-recon`: invoice ledger reconciliation engine.
//!
//! Pure engine crate: locates the data table in a loosely structured extract,
//! maps its columns onto a canonical schema and reconciles two canonical
//! tables. No CLI or file IO dependencies.

pub mod canonical;
pub mod coerce;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod locate;
pub mod mapper;
pub mod model;
pub mod pipeline;
pub mod schema;
pub mod similarity;
pub mod table;

pub use canonical::{canonicalize, CanonicalRow, CanonicalTable, TableSink};
pub use config::ReconConfig;
pub use engine::{reconcile, ReconOptions};
pub use error::ReconError;
pub use locate::locate;
pub use mapper::{map_fields, FieldMapping, MappingReport, DEFAULT_MIN_CONFIDENCE};
pub use model::{MatchKey, MatchStrategy, ReconOutcome, ReconRecord, ReconReport, ReconSummary};
pub use pipeline::{prepare, PersistedMapping, PreparedSource, SourceSettings};
pub use schema::{CanonicalSchema, Domain, FieldKind};
pub use table::{Cell, RawTable, TableSource, TableView};
