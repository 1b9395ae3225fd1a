//! Key Object Selection document assembly for mkkos.
//!
//! This crate resolves document codes, scans input instances, folds them
//! into one document and writes it (see [`pipeline::make_kos`]).

pub mod aggregator;
pub mod codes;
pub mod document;
pub mod encoder;
pub mod pipeline;
pub mod scan;

pub use aggregator::{DocumentState, KosBuilder};
pub use codes::{Code, CodeTable};
pub use pipeline::{MakeKosResult, ProgressReporter, SilentProgress, make_kos};
