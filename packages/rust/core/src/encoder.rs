//! Serializing a finished document to a sink or file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, instrument, warn};

use mkkos_dicom::{Attributes, DicomWriter, TransferSyntax, create_file_meta_information};
use mkkos_shared::{EncodingOptions, KosConfig, MkKosError, Result};

/// How the document is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Omit preamble and file meta information.
    pub no_fmi: bool,
    /// Transfer syntax of the dataset body.
    pub transfer_syntax: TransferSyntax,
    pub encoding: EncodingOptions,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            no_fmi: false,
            transfer_syntax: TransferSyntax::explicit_vr_little_endian(),
            encoding: EncodingOptions::default(),
        }
    }
}

impl WriteOptions {
    /// Options for `config`. Without file meta information the body
    /// defaults to Implicit VR Little Endian, otherwise to Explicit VR
    /// Little Endian.
    pub fn from_config(config: &KosConfig) -> Result<Self> {
        let transfer_syntax = match (&config.transfer_syntax, config.no_fmi) {
            (Some(uid), _) => TransferSyntax::from_uid(uid)?,
            (None, true) => TransferSyntax::implicit_vr_little_endian(),
            (None, false) => TransferSyntax::explicit_vr_little_endian(),
        };
        Ok(Self {
            no_fmi: config.no_fmi,
            transfer_syntax,
            encoding: config.encoding,
        })
    }
}

/// Write `kos` to `sink` and return the flushed sink.
///
/// The document is only read.
pub fn write_kos<W: Write>(kos: &Attributes, sink: W, opts: &WriteOptions) -> Result<W> {
    let fmi = if opts.no_fmi {
        None
    } else {
        Some(create_file_meta_information(kos, opts.transfer_syntax.uid())?)
    };

    let mut writer = DicomWriter::new(sink, &opts.transfer_syntax, opts.encoding);
    writer.write_dataset(fmi.as_ref(), kos)?;
    writer.finish()
}

/// Write `kos` to a new file at `path`.
///
/// A partially written file is removed when encoding or flushing fails.
#[instrument(skip_all, fields(path = %path.display(), ts = %opts.transfer_syntax.uid()))]
pub fn write_kos_file(kos: &Attributes, path: &Path, opts: &WriteOptions) -> Result<()> {
    let file = File::create(path).map_err(|e| MkKosError::io(path, e))?;

    let written = write_kos(kos, BufWriter::new(file), opts).and_then(|out| {
        let file = out.into_inner().map_err(|e| MkKosError::io(path, e.into_error()))?;
        file.sync_all().map_err(|e| MkKosError::io(path, e))
    });

    match written {
        Ok(()) => {
            debug!("document written");
            Ok(())
        }
        Err(e) => {
            if let Err(remove_err) = std::fs::remove_file(path) {
                warn!(error = %remove_err, "failed to remove partial output");
            }
            Err(e)
        }
    }
}
