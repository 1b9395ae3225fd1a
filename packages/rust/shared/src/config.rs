//! Application configuration for mkkos.
//!
//! User config lives at `~/.mkkos/mkkos.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MkKosError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "mkkos.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".mkkos";

/// Series Number of the generated document unless overridden.
pub const DEFAULT_SERIES_NUMBER: &str = "999";

/// Instance Number of the generated document unless overridden.
pub const DEFAULT_INSTANCE_NUMBER: &str = "1";

// ---------------------------------------------------------------------------
// Config structs (matching mkkos.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Dataset encoding options.
    #[serde(default)]
    pub encoding: EncodingOptions,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Series Number (IS) of the generated document.
    #[serde(default = "default_series_number")]
    pub series_number: String,

    /// Instance Number (IS) of the generated document.
    #[serde(default = "default_instance_number")]
    pub instance_number: String,

    /// Code table file; the built-in table is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_config: Option<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            series_number: default_series_number(),
            instance_number: default_instance_number(),
            code_config: None,
        }
    }
}

fn default_series_number() -> String {
    DEFAULT_SERIES_NUMBER.into()
}
fn default_instance_number() -> String {
    DEFAULT_INSTANCE_NUMBER.into()
}

/// `[encoding]` section: how sequences, items and groups are delimited in
/// the dataset body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingOptions {
    /// Emit `(gggg,0000)` group length elements.
    #[serde(default)]
    pub group_length: bool,

    /// Encode non-empty sequences with undefined length.
    #[serde(default = "default_true")]
    pub undefined_sequence_length: bool,

    /// Encode empty sequences with undefined length.
    #[serde(default)]
    pub undefined_empty_sequence_length: bool,

    /// Encode non-empty items with undefined length.
    #[serde(default = "default_true")]
    pub undefined_item_length: bool,

    /// Encode empty items with undefined length.
    #[serde(default)]
    pub undefined_empty_item_length: bool,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            group_length: false,
            undefined_sequence_length: true,
            undefined_empty_sequence_length: false,
            undefined_item_length: true,
            undefined_empty_item_length: false,
        }
    }
}

impl EncodingOptions {
    /// Every sequence and item with an explicit length, no group lengths.
    pub fn explicit_lengths() -> Self {
        Self {
            group_length: false,
            undefined_sequence_length: false,
            undefined_empty_sequence_length: false,
            undefined_item_length: false,
            undefined_empty_item_length: false,
        }
    }

    /// Whether a sequence with `items` items is written with undefined length.
    pub fn undefined_sequence(&self, items: usize) -> bool {
        if items == 0 {
            self.undefined_empty_sequence_length
        } else {
            self.undefined_sequence_length
        }
    }

    /// Whether an item with `elements` elements is written with undefined length.
    pub fn undefined_item(&self, elements: usize) -> bool {
        if elements == 0 {
            self.undefined_empty_item_length
        } else {
            self.undefined_item_length
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Kos config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime settings for one document build, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct KosConfig {
    /// Output file.
    pub output: PathBuf,
    /// Omit the preamble and file meta information block.
    pub no_fmi: bool,
    /// Transfer syntax UID of the dataset body. `None` selects the default
    /// for the chosen `no_fmi` mode.
    pub transfer_syntax: Option<String>,
    /// Series Number of the document.
    pub series_number: String,
    /// Instance Number of the document.
    pub instance_number: String,
    /// Free text attached as a Key Object Description content item.
    pub key_object_description: Option<String>,
    /// Code string of the document title (required).
    pub document_title: String,
    /// Code string of the document title modifier.
    pub document_title_modifier: Option<String>,
    /// Code table file; `None` uses the built-in table.
    pub code_config: Option<PathBuf>,
    /// Sequence/item/group length encoding.
    pub encoding: EncodingOptions,
}

impl From<&AppConfig> for KosConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            output: PathBuf::new(),
            no_fmi: false,
            transfer_syntax: None,
            series_number: config.defaults.series_number.clone(),
            instance_number: config.defaults.instance_number.clone(),
            key_object_description: None,
            document_title: String::new(),
            document_title_modifier: None,
            code_config: config.defaults.code_config.as_ref().map(PathBuf::from),
            encoding: config.encoding,
        }
    }
}

impl KosConfig {
    /// Reject settings that cannot produce a document.
    pub fn validate(&self) -> Result<()> {
        if self.document_title.trim().is_empty() {
            return Err(MkKosError::config("a document title code is required"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(MkKosError::config("an output file is required"));
        }
        if self.no_fmi && self.transfer_syntax.is_some() {
            return Err(MkKosError::config(
                "a transfer syntax cannot be chosen when the file meta information is omitted",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.mkkos/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| MkKosError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.mkkos/mkkos.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MkKosError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| MkKosError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MkKosError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MkKosError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MkKosError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
