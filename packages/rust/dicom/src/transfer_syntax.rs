//! Transfer syntaxes understood by the reader and writer.

use mkkos_shared::{MkKosError, Result};

use crate::uid;

/// Byte-level encoding of a dataset body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    ImplicitVrLittleEndian,
    ExplicitVrLittleEndian,
    ExplicitVrBigEndian,
}

impl Encoding {
    pub fn is_explicit_vr(self) -> bool {
        !matches!(self, Encoding::ImplicitVrLittleEndian)
    }

    pub fn is_big_endian(self) -> bool {
        matches!(self, Encoding::ExplicitVrBigEndian)
    }
}

/// A transfer syntax UID together with the body encoding it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSyntax {
    uid: String,
    encoding: Encoding,
}

impl TransferSyntax {
    pub fn implicit_vr_little_endian() -> Self {
        Self {
            uid: uid::IMPLICIT_VR_LITTLE_ENDIAN.into(),
            encoding: Encoding::ImplicitVrLittleEndian,
        }
    }

    pub fn explicit_vr_little_endian() -> Self {
        Self {
            uid: uid::EXPLICIT_VR_LITTLE_ENDIAN.into(),
            encoding: Encoding::ExplicitVrLittleEndian,
        }
    }

    /// Resolve a transfer syntax UID.
    ///
    /// Any syntactically valid UID other than the uncompressed and deflated
    /// syntaxes is taken to be an encapsulated syntax, whose non-pixel data
    /// is Explicit VR Little Endian.
    pub fn from_uid(uid: &str) -> Result<Self> {
        let uid = uid.trim_end_matches(['\0', ' ']);
        let encoding = match uid {
            uid::IMPLICIT_VR_LITTLE_ENDIAN => Encoding::ImplicitVrLittleEndian,
            uid::EXPLICIT_VR_LITTLE_ENDIAN => Encoding::ExplicitVrLittleEndian,
            uid::EXPLICIT_VR_BIG_ENDIAN => Encoding::ExplicitVrBigEndian,
            uid::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN => {
                return Err(MkKosError::unsupported(
                    "Deflated Explicit VR Little Endian transfer syntax",
                ));
            }
            other if uid::is_valid_uid(other) => Encoding::ExplicitVrLittleEndian,
            other => {
                return Err(MkKosError::validation(format!(
                    "'{other}' is not a valid transfer syntax UID"
                )));
            }
        };
        Ok(Self {
            uid: uid.to_string(),
            encoding,
        })
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}
