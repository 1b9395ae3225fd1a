//! Instance discovery: walks input paths and parses every file found.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use mkkos_dicom::{Attributes, read_file};
use mkkos_shared::Result;

/// Counts from one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Files visited.
    pub files: usize,
    /// Files parsed and handed to the callback.
    pub parsed: usize,
    /// Unreadable entries and files that are not DICOM.
    pub failed: usize,
}

/// Progress callback for reporting scan status.
pub trait ScanProgress {
    /// Called before a file is parsed.
    fn file(&self, path: &Path, current: usize);
    /// Called when the scan completes.
    fn scanned(&self, summary: &ScanSummary);
}

/// Parse every file under `inputs` and pass each dataset to `on_instance`.
///
/// Files are taken as given; directories are walked recursively in file
/// name order. Entries that cannot be read or parsed are logged and
/// counted. An error from `on_instance` aborts the scan.
pub fn scan<P, F>(inputs: &[PathBuf], progress: &P, mut on_instance: F) -> Result<ScanSummary>
where
    P: ScanProgress + ?Sized,
    F: FnMut(&Path, Attributes) -> Result<()>,
{
    let mut summary = ScanSummary::default();

    for input in inputs {
        let walker = WalkDir::new(input)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(input = %input.display(), error = %e, "cannot access entry");
                    summary.failed += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            summary.files += 1;
            progress.file(path, summary.files);

            match read_file(path) {
                Ok(inst) => {
                    summary.parsed += 1;
                    on_instance(path, inst)?;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to parse file, skipping");
                    summary.failed += 1;
                }
            }
        }
    }

    debug!(?summary, "scan complete");
    progress.scanned(&summary);
    Ok(summary)
}
