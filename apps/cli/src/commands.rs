//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use mkkos_core::CodeTable;
use mkkos_core::pipeline::{MakeKosResult, ProgressReporter};
use mkkos_core::scan::{ScanProgress, ScanSummary};
use mkkos_shared::{AppConfig, EncodingOptions, KosConfig, init_config, load_config};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// mkkos: make a Key Object Selection document.
#[derive(Parser)]
#[command(
    name = "mkkos",
    version,
    about = "Create a DICOM Key Object Selection document referencing the given instances.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Create a document from DICOM files and directories.
    Create(CreateArgs),

    /// List the code table.
    Codes {
        /// Code table file (defaults to the configured or built-in table).
        #[arg(long)]
        code_config: Option<PathBuf>,

        /// Print the table as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments of `mkkos create`.
#[derive(Args)]
pub(crate) struct CreateArgs {
    /// Document title code, e.g. 113000 or DCM-113000.
    #[arg(long)]
    pub title: String,

    /// Document title modifier code.
    #[arg(long)]
    pub modifier: Option<String>,

    /// Key object description text.
    #[arg(long)]
    pub desc: Option<String>,

    /// Code table file.
    #[arg(long)]
    pub code_config: Option<PathBuf>,

    /// Series Number of the document (default 999).
    #[arg(long)]
    pub series_no: Option<String>,

    /// Instance Number of the document (default 1).
    #[arg(long)]
    pub inst_no: Option<String>,

    /// Output file.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Omit preamble and file meta information.
    #[arg(short = 'F', long, conflicts_with = "transfer_syntax")]
    pub no_fmi: bool,

    /// Transfer syntax UID of the dataset (default Explicit VR Little Endian).
    #[arg(short, long)]
    pub transfer_syntax: Option<String>,

    /// Encode group length elements.
    #[arg(long)]
    pub group_len: bool,

    /// Encode sequences with explicit length.
    #[arg(long)]
    pub expl_seq_len: bool,

    /// Encode empty sequences with undefined length.
    #[arg(long)]
    pub undef_empty_seq_len: bool,

    /// Encode items with explicit length.
    #[arg(long)]
    pub expl_item_len: bool,

    /// Encode empty items with undefined length.
    #[arg(long)]
    pub undef_empty_item_len: bool,

    /// DICOM files or directories to reference.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

impl CreateArgs {
    /// Merge these flags over the loaded config.
    fn to_kos_config(&self, config: &AppConfig) -> KosConfig {
        let mut kos = KosConfig::from(config);
        kos.output = self.output.clone();
        kos.no_fmi = self.no_fmi;
        kos.transfer_syntax = self.transfer_syntax.clone();
        kos.document_title = self.title.clone();
        kos.document_title_modifier = self.modifier.clone();
        kos.key_object_description = self.desc.clone();
        if let Some(series_no) = &self.series_no {
            kos.series_number = series_no.clone();
        }
        if let Some(inst_no) = &self.inst_no {
            kos.instance_number = inst_no.clone();
        }
        if let Some(code_config) = &self.code_config {
            kos.code_config = Some(code_config.clone());
        }
        kos.encoding = self.encoding(config.encoding);
        kos
    }

    fn encoding(&self, mut encoding: EncodingOptions) -> EncodingOptions {
        encoding.group_length |= self.group_len;
        encoding.undefined_sequence_length &= !self.expl_seq_len;
        encoding.undefined_empty_sequence_length |= self.undef_empty_seq_len;
        encoding.undefined_item_length &= !self.expl_item_len;
        encoding.undefined_empty_item_length |= self.undef_empty_item_len;
        encoding
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "mkkos=info",
        1 => "mkkos=debug",
        _ => "mkkos=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Create(args) => cmd_create(&args),
        Command::Codes { code_config, json } => cmd_codes(code_config.as_deref(), json),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

fn cmd_create(args: &CreateArgs) -> Result<()> {
    let config = load_config()?;
    let kos_config = args.to_kos_config(&config);

    info!(
        title = %kos_config.document_title,
        output = %kos_config.output.display(),
        inputs = args.inputs.len(),
        "creating key object selection document"
    );

    let reporter = CliProgress::new();
    let result = mkkos_core::make_kos(&kos_config, &args.inputs, &reporter);
    reporter.spinner.finish_and_clear();
    let result = result?;

    println!();
    println!("  Scanned:    {} files", result.scan.files);
    println!("  Referenced: {}", result.referenced);
    if result.skipped > 0 {
        println!("  Skipped:    {} (missing UIDs)", result.skipped);
    }
    if result.scan.failed > 0 {
        println!("  Failed:     {} (unreadable or not DICOM)", result.scan.failed);
    }
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();
    println!(
        "Key Object Selection Document stored to {}",
        result.output.display()
    );

    Ok(())
}

fn cmd_codes(code_config: Option<&Path>, json: bool) -> Result<()> {
    let path = match code_config {
        Some(path) => Some(path.to_path_buf()),
        None => load_config()?.defaults.code_config.map(PathBuf::from),
    };
    let codes = CodeTable::load_or_builtin(path.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&codes)?);
        return Ok(());
    }

    let width = codes.iter().map(|(code, _)| code.len()).max().unwrap_or(0);
    for (code, meaning) in codes.iter() {
        println!("  {code:<width$}  {meaning}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ScanProgress for CliProgress {
    fn file(&self, path: &Path, current: usize) {
        self.spinner
            .set_message(format!("Reading [{current}] {}", path.display()));
    }

    fn scanned(&self, summary: &ScanSummary) {
        self.spinner.set_message(format!(
            "Scanned {} files ({} parsed)",
            summary.files, summary.parsed
        ));
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _result: &MakeKosResult) {
        self.spinner.finish_and_clear();
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)
        .map_err(|e| eyre!("failed to render config: {e}"))?;
    println!("{toml_str}");
    Ok(())
}
