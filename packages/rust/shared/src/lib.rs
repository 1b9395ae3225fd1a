//! Shared error model and configuration for mkkos.
//!
//! This crate is the foundation depended on by all other mkkos crates.
//! It provides:
//! - [`MkKosError`]: the unified error type
//! - Configuration ([`AppConfig`], [`KosConfig`], [`EncodingOptions`], config loading)

pub mod config;
pub mod error;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_INSTANCE_NUMBER, DEFAULT_SERIES_NUMBER, DefaultsConfig, EncodingOptions,
    KosConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{MkKosError, Result};
