// cnpj - registry extracts to Parquet, then a root lookup exported to a spreadsheet

mod exit_codes;
mod progress;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use indicatif::MultiProgress;
use cnpj_io::IoError;
use cnpj_pipeline::{
    run_generate, run_ingest, run_lookup, run_pipeline, PipelineConfig, PipelineError, Progress,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use exit_codes::{pipeline_exit_code, EXIT_ERROR, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "cnpj")]
#[command(about = "Convert CNPJ registry extracts to Parquet and export companies by identifier root")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Pipeline config (TOML). Built-in defaults apply when omitted.
    #[arg(long, short = 'c', global = true, env = "CNPJ_CONFIG")]
    config: Option<PathBuf>,

    /// Only warnings and errors, no progress bars
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every raw extract in the input directory to Parquet
    #[command(after_help = "\
Examples:
  cnpj ingest
  cnpj ingest --input dados/ --output parquet/
  cnpj ingest --combined empresas.parquet --json > ingest.json")]
    Ingest {
        /// Directory of raw extracts (overrides ingest.input_dir)
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,

        /// Directory for Parquet files (overrides ingest.output_dir)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Also write every row to one combined file with this name
        #[arg(long, value_name = "NAME")]
        combined: Option<String>,

        /// Print the ingest report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Export the companies whose CNPJ root appears in the candidate file
    #[command(after_help = "\
Examples:
  cnpj lookup
  cnpj lookup --candidates cnpj/cnpjs.xlsx --sheet Duplinhas --export nome_cnpj.xlsx
  cnpj lookup --candidates lista.csv --digits-only --export hits.csv --json")]
    Lookup {
        /// Candidate file, .xlsx/.xls/.ods or delimited text (overrides lookup.candidates)
        #[arg(long)]
        candidates: Option<PathBuf>,

        /// Directory of Parquet files to scan (overrides lookup.columnar_dir)
        #[arg(long)]
        columnar: Option<PathBuf>,

        /// Output spreadsheet, .xlsx or .csv (overrides lookup.export)
        #[arg(long, short = 'o')]
        export: Option<PathBuf>,

        /// Worksheet holding the candidates
        #[arg(long)]
        sheet: Option<String>,

        /// Scan only the combined file written by ingest
        #[arg(long)]
        use_combined: bool,

        /// Strip punctuation from candidates (11.222.333/0001-81)
        #[arg(long)]
        digits_only: bool,

        /// Print the lookup report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Ingest, then look up (the whole pipeline)
    Run {
        /// Print both reports as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Write a file of random, valid CNPJs with distinct roots
    Generate {
        /// Number of identifiers (overrides generate.count)
        #[arg(long, short = 'n')]
        count: Option<usize>,

        /// Seed for a reproducible file
        #[arg(long)]
        seed: Option<u64>,

        /// Output file (overrides generate.output)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Check the config and print it with paths resolved
    Validate {
        /// Print as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_logging(quiet: bool, verbose: bool, multi: MultiProgress) {
    let default = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // stderr keeps stdout clean for --json
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(move || progress::LogWriter::new(multi.clone()))
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let multi = MultiProgress::new();
    init_logging(cli.quiet, cli.verbose, multi.clone());

    let result = run(cli, multi);

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                log::error!("{message}");
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {hint}");
            }
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli, multi: MultiProgress) -> Result<(), CliError> {
    let mut config = load_config(cli.config.as_deref())?;
    let mut silent = ();
    let mut bars = progress::Bars::new(multi);
    let progress: &mut dyn Progress = if cli.quiet { &mut silent } else { &mut bars };

    match cli.command {
        Commands::Ingest { input, output, combined, json } => {
            let ingest = &mut config.ingest;
            override_with(&mut ingest.input_dir, input);
            override_with(&mut ingest.output_dir, output);
            if combined.is_some() {
                ingest.combined_file = combined;
            }
            ingest.validate()?;

            let report = run_ingest(&config.ingest, progress)?;
            log::info!(
                "ingested {} file(s), {} rows into {}",
                report.files.len(),
                report.total_rows,
                report.output_dir.display()
            );
            if json {
                print_json(&report)?;
            }
        }
        Commands::Lookup { candidates, columnar, export, sheet, use_combined, digits_only, json } => {
            let lookup = &mut config.lookup;
            override_with(&mut lookup.candidates, candidates);
            override_with(&mut lookup.columnar_dir, columnar);
            override_with(&mut lookup.export, export);
            if sheet.is_some() {
                lookup.sheet = sheet;
            }
            lookup.use_combined |= use_combined;
            lookup.digits_only |= digits_only;
            config.validate()?;

            let report = run_lookup(&config.lookup, config.combined_file(), progress)?;
            log::info!(
                "{} of {} rows matched {} root(s); wrote {}",
                report.matched,
                report.rows_scanned,
                report.root_count,
                report.export.display()
            );
            if json {
                print_json(&report)?;
            }
        }
        Commands::Run { json } => {
            let report = run_pipeline(&config, progress)?;
            log::info!(
                "pipeline finished: {} rows ingested, {} matched, wrote {}",
                report.ingest.total_rows,
                report.lookup.matched,
                report.lookup.export.display()
            );
            if json {
                print_json(&report)?;
            }
        }
        Commands::Generate { count, seed, output, json } => {
            let generate = &mut config.generate;
            override_with(&mut generate.count, count);
            override_with(&mut generate.output, output);
            if seed.is_some() {
                generate.seed = seed;
            }

            let report = run_generate(&config.generate)?;
            log::info!("generated {} identifiers in {}", report.count, report.output.display());
            if json {
                print_json(&report)?;
            }
        }
        Commands::Validate { json } => {
            config.validate()?;
            if json {
                print_json(&config)?;
            } else {
                let text = toml::to_string_pretty(&config)
                    .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot render config: {e}")))?;
                print!("{text}");
            }
            log::info!("config is valid");
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, CliError> {
    match path {
        Some(path) => {
            let config = PipelineConfig::load(path)?;
            log::debug!("loaded config from {}", path.display());
            Ok(config)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn override_with<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot serialize report: {e}")))?;
    println!("{text}");
    Ok(())
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<PipelineError> for CliError {
    fn from(err: PipelineError) -> Self {
        let error = CliError::new(pipeline_exit_code(&err), err.to_string());
        match &err {
            PipelineError::MissingDirectory(_) => {
                error.with_hint("check the directories in the config, or run `cnpj ingest` before `cnpj lookup`")
            }
            PipelineError::Io(IoError::FieldCount { expected, .. }) => error.with_hint(format!(
                "raw extracts have no header and exactly {expected} fields; check ingest.delimiter and ingest.schema"
            )),
            PipelineError::Io(IoError::Encoding { .. }) => {
                error.with_hint("set ingest.encoding to the encoding the extracts were written in")
            }
            PipelineError::Io(IoError::MissingColumn { .. }) => {
                error.with_hint("lookup.identifier_column and lookup.name_column must match the ingested columns")
            }
            _ => error,
        }
    }
}
