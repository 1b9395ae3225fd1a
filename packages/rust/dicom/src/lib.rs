//! DICOM data model and binary codec for mkkos.
//!
//! - [`Attributes`]: the ordered tag → value tree used for every dataset and item
//! - [`tags`]: the tags this tool reads or writes, plus a small VR dictionary
//! - [`DicomWriter`]: dataset/file encoder honoring [`EncodingOptions`](mkkos_shared::EncodingOptions)
//! - [`read_file`]: Part 10 reader feeding instance trees to the aggregator

mod attributes;
mod reader;
mod tag;
mod transfer_syntax;
pub mod uid;
mod vr;
mod writer;

pub use attributes::{Attributes, Element, Sequence, Value};
pub use reader::{read_dataset, read_file};
pub use tag::{Tag, tags};
pub use transfer_syntax::{Encoding, TransferSyntax};
pub use vr::Vr;
pub use writer::{DicomWriter, create_file_meta_information};

/// Length field value marking a sequence or item closed by a delimiter.
pub(crate) const UNDEFINED_LENGTH: u32 = 0xFFFF_FFFF;
