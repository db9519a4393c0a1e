//! `lmatch recon`: config-driven register vs statement reconciliation.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use ledgermatch_io::json::{write_report_json, MappingStore};
use ledgermatch_io::sqlite::SqliteSink;
use ledgermatch_recon::config::SourceConfig;
use ledgermatch_recon::pipeline::{build_report, prepare, PreparedSource};
use ledgermatch_recon::{reconcile, ReconConfig, TableSink};

use crate::exit_codes::{EXIT_IO, EXIT_RECON_DIFFERENCES, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_RUNTIME};
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Run reconciliation from a TOML config file
    #[command(after_help = "\
Examples:
  lmatch recon run april.recon.toml
  lmatch recon run april.recon.toml --json
  lmatch recon run april.recon.toml --output result.json --xlsx report.xlsx
  lmatch recon run april.recon.toml --no-cache")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file (overrides [output].json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write an xlsx report (overrides [output].xlsx)
        #[arg(long)]
        xlsx: Option<PathBuf>,

        /// Detect headers and mappings again instead of reading the cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  lmatch recon validate april.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run { config, json, output, xlsx, no_cache } => {
            cmd_recon_run(config, json, output, xlsx, no_cache)
        }
        ReconCommands::Validate { config } => cmd_recon_validate(config),
    }
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn load_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        recon_err(EXIT_IO, format!("cannot read config {}: {e}", config_path.display()))
    })?;
    ReconConfig::from_toml(&config_str).map_err(|e| recon_err(EXIT_RECON_INVALID_CONFIG, e.to_string()))
}

fn cmd_recon_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    xlsx_file: Option<PathBuf>,
    no_cache: bool,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;

    // Resolve file paths relative to config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let store = config
        .mapping
        .cache_dir
        .as_ref()
        .map(|dir| MappingStore::new(base_dir.join(dir)));

    // Cache files are keyed by domain; with two sources of one domain only A uses it.
    let store_b = if config.sources.a.domain == config.sources.b.domain {
        if store.is_some() {
            log::warn!(
                "sources.a and sources.b are both '{}'; mapping cache applies to sources.a only",
                config.sources.a.domain
            );
        }
        None
    } else {
        store.as_ref()
    };

    let a = prepare_source("a", &config.sources.a, &config, base_dir, store.as_ref(), no_cache)?;
    let b = prepare_source("b", &config.sources.b, &config, base_dir, store_b, no_cache)?;

    let options = config.to_options();
    let outcome = reconcile(&a.table, &b.table, &options)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, e.to_string()))?;
    let report = build_report(&config.name, &a, &b, &options, outcome);

    // Output
    let json_path = output_file.or_else(|| config.output.json.as_ref().map(|p| base_dir.join(p)));
    if let Some(ref path) = json_path {
        write_report_json(path, &report).map_err(|e| recon_err(EXIT_IO, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    let xlsx_path = xlsx_file.or_else(|| config.output.xlsx.as_ref().map(|p| base_dir.join(p)));
    if let Some(ref path) = xlsx_path {
        let schema_a = source_schema("a", &config.sources.a)?;
        let schema_b = source_schema("b", &config.sources.b)?;
        ledgermatch_io::xlsx::export_report(path, &report, &schema_a, &schema_b)
            .map_err(|e| recon_err(EXIT_IO, format!("cannot write report: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if let Some(ref db) = config.output.sqlite {
        let path = base_dir.join(db);
        let mut sink = SqliteSink::open(&path)
            .map_err(|e| recon_err(EXIT_IO, format!("cannot open {}: {e}", path.display())))?;
        sink.write(&a.table, "source_a")
            .and_then(|_| sink.write(&b.table, "source_b"))
            .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("sqlite: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    // Human summary to stderr
    let s = &report.outcome.summary;
    eprintln!(
        "recon '{}': {} rows in A, {} rows in B; {} matched, {} mismatched, {} only in A, {} only in B",
        config.name, s.rows_a, s.rows_b, s.matched, s.mismatched, s.only_in_a, s.only_in_b,
    );
    if s.unclaimed_b > 0 {
        eprintln!("note: {} statement row(s) shared a key with an already matched row", s.unclaimed_b);
    }
    if s.coercion_failures > 0 {
        eprintln!("note: {} amount cell(s) could not be read as numbers", s.coercion_failures);
    }

    if report.outcome.has_differences() {
        return Err(recon_err(EXIT_RECON_DIFFERENCES, "differences found"));
    }
    Ok(())
}

fn source_schema(side: &str, source: &SourceConfig) -> Result<ledgermatch_recon::CanonicalSchema, CliError> {
    source
        .schema()
        .map_err(|e| recon_err(EXIT_RECON_INVALID_CONFIG, format!("sources.{side}: {e}")))
}

fn prepare_source(
    side: &str,
    source: &SourceConfig,
    config: &ReconConfig,
    base_dir: &Path,
    store: Option<&MappingStore>,
    no_cache: bool,
) -> Result<PreparedSource, CliError> {
    let schema = source_schema(side, source)?;
    let path = base_dir.join(&source.file);
    let raw = ledgermatch_io::read_table(&path, source.sheet.as_deref())
        .map_err(|e| recon_err(EXIT_IO, format!("sources.{side}: {e}")))?;

    let cached = match store {
        Some(store) if !no_cache => store.load(source.domain).unwrap_or_else(|e| {
            log::warn!("ignoring mapping cache: {e}");
            None
        }),
        _ => None,
    };

    let prepared = prepare(&raw, &schema, &source.settings(&config.mapping), cached.as_ref());

    if let Some(store) = store {
        if !prepared.from_cache {
            match store.save(&prepared.to_persisted()) {
                Ok(path) => log::info!("sources.{side}: cached mapping at {}", path.display()),
                Err(e) => log::warn!("sources.{side}: cannot cache mapping: {e}"),
            }
        }
    }

    if prepared.table.is_empty() {
        log::warn!("sources.{side}: {} has no data rows", path.display());
    }
    Ok(prepared)
}

fn cmd_recon_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "valid: recon '{}' ({} vs {}) on {} key pair(s), {} tolerance field(s)",
        config.name,
        config.sources.a.domain,
        config.sources.b.domain,
        config.matching.key.len(),
        config.tolerance.fields.len(),
    );
    Ok(())
}
