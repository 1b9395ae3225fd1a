//! End-to-end `create` pipeline: codes → scan → aggregate → write.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use mkkos_shared::{KosConfig, Result};

use crate::aggregator::KosBuilder;
use crate::codes::CodeTable;
use crate::document::KosSettings;
use crate::encoder::WriteOptions;
use crate::scan::{self, ScanProgress, ScanSummary};

/// Result of the `make_kos` pipeline.
#[derive(Debug)]
pub struct MakeKosResult {
    /// Path of the written document.
    pub output: PathBuf,
    /// Scan counts.
    pub scan: ScanSummary,
    /// Instances referenced by the document.
    pub referenced: usize,
    /// Parsed files lacking one of the required identifiers.
    pub skipped: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: ScanProgress {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &MakeKosResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ScanProgress for SilentProgress {
    fn file(&self, _path: &std::path::Path, _current: usize) {}
    fn scanned(&self, _summary: &ScanSummary) {}
}

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &MakeKosResult) {}
}

/// Run the full `create` pipeline.
///
/// 1. Validate settings and resolve codes
/// 2. Scan inputs, referencing every complete instance
/// 3. Write the document
#[instrument(skip_all, fields(output = %config.output.display(), inputs = inputs.len()))]
pub fn make_kos(
    config: &KosConfig,
    inputs: &[PathBuf],
    progress: &dyn ProgressReporter,
) -> Result<MakeKosResult> {
    let start = Instant::now();

    // --- Phase 1: Settings ---
    progress.phase("Resolving codes");
    config.validate()?;
    let opts = WriteOptions::from_config(config)?;
    let codes = CodeTable::load_or_builtin(config.code_config.as_deref())?;
    let settings = KosSettings::resolve(config, &codes)?;

    // --- Phase 2: Scan ---
    progress.phase("Scanning instances");
    let mut builder = KosBuilder::new(settings);
    let summary = scan::scan(inputs, progress, |_, inst| builder.add_instance(&inst))?;

    info!(
        files = summary.files,
        parsed = summary.parsed,
        failed = summary.failed,
        referenced = builder.accepted(),
        skipped = builder.skipped(),
        "scan complete"
    );

    // --- Phase 3: Write ---
    progress.phase("Writing document");
    builder.write_file(&config.output, &opts)?;

    let result = MakeKosResult {
        output: config.output.clone(),
        scan: summary,
        referenced: builder.accepted(),
        skipped: builder.skipped(),
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        output = %result.output.display(),
        referenced = result.referenced,
        elapsed_ms = result.elapsed.as_millis(),
        "create pipeline complete"
    );

    Ok(result)
}
