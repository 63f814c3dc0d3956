// apaper - audit working papers from payment exports, headless

mod exit_codes;
mod generate;
mod inspect;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use auditpaper_report::ReportError;
use clap::{Args, Parser, Subcommand};

use exit_codes::{exit_code_for, EXIT_CONFIG, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "apaper")]
#[command(about = "Populate audit working-paper templates from payment exports")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Run config (default: <config dir>/auditpaper/config.toml when present)
    #[arg(long, global = true, env = "APAPER_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write working papers for one export
    #[command(after_help = "\
Examples:
  apaper generate export.csv --report tp3 --template TP3.xlsx --out papers
  apaper generate export.xlsx --report all --folders
  apaper generate export.csv --report tp2 --json | jq .sheets")]
    Generate {
        /// Payment export (csv, xlsx or xls)
        input: PathBuf,

        /// Report to produce: tp1, tp2, tp3, tp4, or all configured
        #[arg(long, short = 'r', default_value = "all")]
        report: String,

        /// Template workbook (only with a single --report)
        #[arg(long, short = 't')]
        template: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,

        /// Print the document report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Write working papers for many exports in parallel
    #[command(after_help = "\
Exit code 8 means at least one document failed; every other document was
still written.

Examples:
  apaper batch exports/*.csv --folders --out clients
  apaper batch a.csv b.csv --report tp3 --template TP3.xlsx --json")]
    Batch {
        /// Payment exports
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Report to produce: tp1, tp2, tp3, tp4, or all configured
        #[arg(long, short = 'r', default_value = "all")]
        report: String,

        /// Template workbook (only with a single --report)
        #[arg(long, short = 't')]
        template: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,

        /// Print one JSON object per document on stdout
        #[arg(long)]
        json: bool,
    },

    /// Company, periods and totals of an export after filtering
    #[command(after_help = "\
Examples:
  apaper summary export.csv
  apaper summary export.xlsx --json")]
    Summary {
        /// Payment export (csv, xlsx or xls)
        input: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Sheets, merges, conditional rules and configured markers of a template
    #[command(after_help = "\
Examples:
  apaper inspect templates/TP3.xlsx
  apaper inspect templates/TP3.xlsx --report tp3 --json")]
    Inspect {
        /// Template workbook
        template: PathBuf,

        /// Check the markers configured for this report
        #[arg(long, short = 'r')]
        report: Option<String>,

        #[arg(long)]
        json: bool,
    },
}

/// Output settings shared by `generate` and `batch`; each overrides the
/// config value of the same name.
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Output directory
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Name written into the sign-off cell
    #[arg(long, env = "APAPER_CONSULTANT")]
    pub consultant: Option<String>,

    /// Create the per-company folder layout
    #[arg(long)]
    pub folders: bool,

    /// Reporting templates copied into each company folder
    #[arg(long, value_name = "DIR")]
    pub report_templates: Option<PathBuf>,

    /// Sign-off date, YYYY-MM-DD (default: today)
    #[arg(long)]
    pub date: Option<String>,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nreports: tp1 tp2 tp3 tp4",
    )
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Generate { input, report, template, output, json } => {
            generate::cmd_generate(config, input, &report, template, &output, json)
        }
        Commands::Batch { inputs, report, template, output, json } => {
            generate::cmd_batch(config, inputs, &report, template, &output, json)
        }
        Commands::Summary { input, json } => inspect::cmd_summary(config, &input, json),
        Commands::Inspect { template, report, json } => {
            inspect::cmd_inspect(config, &template, report.as_deref(), json)
        }
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

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReportError> for CliError {
    fn from(err: ReportError) -> Self {
        let code = exit_code_for(err.kind());
        let hint = match err.kind() {
            auditpaper_report::ErrorKind::MissingField => {
                Some("check the export's header row against the report's columns".to_string())
            }
            auditpaper_report::ErrorKind::MarkerNotFound => {
                Some("marker text must match a template cell exactly; see `apaper inspect`".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}
