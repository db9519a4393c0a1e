// ledgermatch CLI - reconcile a purchase register against a filing statement

mod exit_codes;
mod map;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

use exit_codes::{EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};
use ledgermatch_recon::Domain;

#[derive(Parser)]
#[command(name = "lmatch")]
#[command(about = "Locate, map and reconcile invoice ledgers")]
#[command(version)]
struct Cli {
    /// More log output on stderr (repeat for debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Config-driven reconciliation of two ledgers
    Recon {
        #[command(subcommand)]
        command: recon::ReconCommands,
    },

    /// Detect the header row and column mapping of one ledger
    #[command(after_help = "\
Examples:
  lmatch map purchase.xlsx --domain register
  lmatch map 2b.csv --domain statement --json
  lmatch map purchase.xlsx --domain register --save .ledgermatch")]
    Map {
        /// Ledger file (csv, tsv, xlsx, xls, xlsb, ods)
        file: PathBuf,

        /// Canonical schema to map onto (register or statement)
        #[arg(long, value_parser = parse_domain)]
        domain: Domain,

        /// Worksheet name (spreadsheets only; first sheet by default)
        #[arg(long)]
        sheet: Option<String>,

        /// Minimum similarity for a column to be accepted
        #[arg(long, default_value_t = ledgermatch_recon::DEFAULT_MIN_CONFIDENCE)]
        min_confidence: f64,

        /// Output JSON to stdout instead of a table
        #[arg(long)]
        json: bool,

        /// Save the detected mapping into this cache directory
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn parse_domain(s: &str) -> Result<Domain, String> {
    s.parse()
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::ERROR
    } else {
        match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            _ => LevelFilter::DEBUG,
        }
    };
    // Also installs the `log` bridge, so library records reach stderr.
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Recon { command } => recon::cmd_recon(command),
        Commands::Map {
            file,
            domain,
            sheet,
            min_confidence,
            json,
            save,
        } => map::cmd_map(file, domain, sheet, min_confidence, json, save),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
