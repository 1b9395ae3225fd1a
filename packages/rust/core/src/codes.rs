//! Code table and code item construction.
//!
//! The table maps short code strings to code meanings. A code string is
//! `<scheme>-<value>`, or a bare value in the `DCM` coding scheme.

use std::collections::BTreeMap;
use std::path::Path;

use mkkos_dicom::{Attributes, Vr, tags};
use mkkos_shared::{MkKosError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Coding scheme of code strings without a scheme prefix.
pub const DEFAULT_SCHEME: &str = "DCM";

/// Separates the coding scheme from the code value.
const SEPARATOR: char = '-';

/// Table shipped with the tool, used when no code config is given.
const BUILTIN_CODES: &str = include_str!("../resources/codes.toml");

/// A coded concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    pub scheme: String,
    pub value: String,
    pub meaning: String,
}

impl Code {
    /// The code as a sequence item (Code Value, Coding Scheme Designator,
    /// Code Meaning).
    pub fn to_item(&self) -> Attributes {
        let mut item = Attributes::new();
        item.set_string(tags::CODE_VALUE, Vr::SH, self.value.as_str());
        item.set_string(tags::CODING_SCHEME_DESIGNATOR, Vr::SH, self.scheme.as_str());
        item.set_string(tags::CODE_MEANING, Vr::LO, self.meaning.as_str());
        item
    }
}

/// Code string → code meaning lookup table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeTable {
    #[serde(default)]
    codes: BTreeMap<String, String>,
}

impl CodeTable {
    /// The built-in table.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_CODES)
            .map_err(|e| MkKosError::config(format!("built-in code table: {e}")))
    }

    /// Parse a table from TOML with a `[codes]` section.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| MkKosError::config(e.to_string()))
    }

    /// Load a table from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MkKosError::io(path, e))?;
        let table = Self::from_toml_str(&content).map_err(|e| {
            MkKosError::config(format!("failed to parse {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), codes = table.len(), "loaded code table");
        Ok(table)
    }

    /// Load `path` if given, otherwise the built-in table.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Entries in code string order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.codes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Resolve a code string to a code.
    ///
    /// Fails with [`MkKosError::UndefinedCode`] if the string is not in the table.
    pub fn resolve(&self, code: &str) -> Result<Code> {
        let meaning = self
            .codes
            .get(code)
            .ok_or_else(|| MkKosError::undefined_code(code))?;

        let (scheme, value) = match code.split_once(SEPARATOR) {
            Some((scheme, value)) => (scheme, value),
            None => (DEFAULT_SCHEME, code),
        };

        Ok(Code {
            scheme: scheme.to_string(),
            value: value.to_string(),
            meaning: meaning.clone(),
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CodeTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            codes: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
