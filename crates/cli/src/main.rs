mod config;
mod logging;
mod report;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tally_eval::{check_store, Verdict};
use tally_storage::seed::seed_sample_data;
use tally_storage::{ObjectStore, SqliteObjectStore, StorageError};

use config::{Overrides, ReportFormat, TallyConfig};

/// Exit status when the aggregate is within the threshold.
const EXIT_COMPLIANT: i32 = 0;
/// Exit status when the aggregate exceeds the threshold.
const EXIT_NON_COMPLIANT: i32 = 1;
/// Exit status when no verdict could be produced (store or config failure).
const EXIT_FATAL: i32 = 2;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Catalogue compliance checker.
#[derive(Parser)]
#[command(
    name = "tally",
    version,
    about = "Sum declared usage across catalogued objects and check it against a limit"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log debug detail to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the object store, optionally seeding it with sample objects
    Init {
        /// Path to the object store (overrides the config file)
        #[arg(long)]
        store: Option<PathBuf>,
        /// Delete any existing store file first
        #[arg(long)]
        fresh: bool,
        /// Insert the sample catalogue
        #[arg(long)]
        seed: bool,
    },

    /// Aggregate usage, write the report, and exit non-zero when over the limit
    Check(CheckArgs),

    /// Fresh store, sample data, then check
    Run(CheckArgs),
}

#[derive(Args, Debug, Default)]
struct CheckArgs {
    /// Compliance threshold (percent)
    #[arg(long, allow_negative_numbers = true)]
    threshold: Option<f64>,
    /// Discriminator value of the objects to aggregate
    #[arg(long)]
    target_type: Option<String>,
    /// Path to the object store
    #[arg(long)]
    store: Option<PathBuf>,
    /// Path of the written report
    #[arg(long)]
    report: Option<PathBuf>,
    /// Report format
    #[arg(long, value_enum)]
    format: Option<ReportFormat>,
}

impl CheckArgs {
    fn into_overrides(self) -> Overrides {
        Overrides {
            threshold: self.threshold,
            target_type: self.target_type,
            store: self.store,
            report: self.report,
            format: self.format,
        }
    }
}

fn main() {
    let Cli {
        output,
        quiet,
        verbose,
        config,
        command,
    } = Cli::parse();
    logging::init(verbose, quiet);
    let config_path = config.as_deref();

    let code = match command {
        Commands::Init { store, fresh, seed } => {
            let overrides = Overrides {
                store,
                ..Overrides::default()
            };
            let config = load_config(config_path, overrides, output, quiet);
            cmd_init(&config, fresh, seed, output, quiet)
        }
        Commands::Check(args) => {
            let config = load_config(config_path, args.into_overrides(), output, quiet);
            cmd_check(&config, output, quiet)
        }
        Commands::Run(args) => {
            let config = load_config(config_path, args.into_overrides(), output, quiet);
            cmd_run(&config, output, quiet)
        }
    };
    process::exit(code);
}

fn load_config(
    path: Option<&Path>,
    overrides: Overrides,
    output: OutputFormat,
    quiet: bool,
) -> TallyConfig {
    match TallyConfig::load(path).and_then(|c| c.with_overrides(overrides)) {
        Ok(config) => config,
        Err(msg) => {
            report_error(&format!("configuration error: {}", msg), output, quiet);
            process::exit(EXIT_FATAL);
        }
    }
}

/// Open (or recreate) the store and optionally seed it.
/// Returns `(inserted, total)` object counts.
fn prepare_store(
    config: &TallyConfig,
    fresh: bool,
    seed: bool,
) -> Result<(usize, usize), StorageError> {
    let store_config = config.store_config();
    let store = if fresh {
        SqliteObjectStore::open_fresh(&store_config)?
    } else {
        SqliteObjectStore::open(&store_config)?
    };
    let inserted = if seed { seed_sample_data(&store)? } else { 0 };
    Ok((inserted, store.count_records()?))
}

fn cmd_init(
    config: &TallyConfig,
    fresh: bool,
    seed: bool,
    output: OutputFormat,
    quiet: bool,
) -> i32 {
    let (inserted, total) = match prepare_store(config, fresh, seed) {
        Ok(counts) => counts,
        Err(e) => {
            report_error(&format!("store error: {}", e), output, quiet);
            return EXIT_FATAL;
        }
    };
    if !quiet {
        let path = config.store.path.display().to_string();
        match output {
            OutputFormat::Json => println!(
                "{}",
                serde_json::json!({ "store": path, "inserted": inserted, "total": total })
            ),
            OutputFormat::Text => println!(
                "Initialized {} ({} inserted, {} objects total)",
                path, inserted, total
            ),
        }
    }
    EXIT_COMPLIANT
}

fn cmd_run(config: &TallyConfig, output: OutputFormat, quiet: bool) -> i32 {
    match prepare_store(config, true, true) {
        Ok((inserted, _)) => {
            tracing::info!(inserted, "prepared fresh sample store");
            cmd_check(config, output, quiet)
        }
        Err(e) => {
            report_error(&format!("store error: {}", e), output, quiet);
            EXIT_FATAL
        }
    }
}

fn cmd_check(config: &TallyConfig, output: OutputFormat, quiet: bool) -> i32 {
    // The store is dropped (and its connection closed) at the end of this
    // block, before any report I/O.
    let verdict = {
        let store = match SqliteObjectStore::open_existing(&config.store_config()) {
            Ok(s) => s,
            Err(e) => {
                report_error(&format!("store error: {}", e), output, quiet);
                return EXIT_FATAL;
            }
        };
        match check_store(&store, &config.policy()) {
            Ok(v) => v,
            Err(e) => {
                report_error(&format!("store error: {}", e), output, quiet);
                return EXIT_FATAL;
            }
        }
    };

    let rendered = report::render(&verdict, config.report.format);
    let written = match report::write_report(&config.report.path, &rendered) {
        Ok(()) => true,
        // The verdict stands even when the report cannot be saved.
        Err(e) => {
            report_error(&format!("report error: {}", e), output, quiet);
            false
        }
    };

    if !quiet {
        print_summary(&verdict, config, written, output);
    }

    if verdict.is_compliant {
        EXIT_COMPLIANT
    } else {
        EXIT_NON_COMPLIANT
    }
}

fn print_summary(verdict: &Verdict, config: &TallyConfig, written: bool, output: OutputFormat) {
    match output {
        OutputFormat::Json => println!("{}", report::render_json(verdict)),
        OutputFormat::Text => {
            println!("Compliance Check");
            println!("================");
            println!();
            println!("  Target type:  {}", verdict.target_type);
            println!("  Threshold:    {:.2}%", verdict.threshold);
            println!(
                "  Total usage:  {:.2}% across {} record(s)",
                verdict.total_usage,
                verdict.datasets.len()
            );
            if verdict.is_compliant {
                println!(
                    "  Status:       {} ({:.2}% headroom)",
                    verdict.status_label(),
                    verdict.headroom()
                );
            } else {
                println!(
                    "  Status:       {} (exceeded by {:.2}%)",
                    verdict.status_label(),
                    verdict.exceeded_by
                );
            }
            if !verdict.issues.is_empty() {
                println!(
                    "  Skipped:      {} record(s) with bad data",
                    verdict.issues.len()
                );
            }
            if written {
                println!("  Report:       {}", config.report.path.display());
            }
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
