//! Value representations.

use std::fmt;

/// Value representation of a data element.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vr {
    AE,
    AS,
    AT,
    CS,
    DA,
    DS,
    DT,
    FD,
    FL,
    IS,
    LO,
    LT,
    OB,
    OD,
    OF,
    OL,
    OV,
    OW,
    PN,
    SH,
    SL,
    SQ,
    SS,
    ST,
    SV,
    TM,
    UC,
    UI,
    UL,
    UN,
    UR,
    US,
    UT,
    UV,
}

/// Every VR with its two-letter code, in declaration order.
const CODES: [(Vr, [u8; 2]); 34] = [
    (Vr::AE, *b"AE"),
    (Vr::AS, *b"AS"),
    (Vr::AT, *b"AT"),
    (Vr::CS, *b"CS"),
    (Vr::DA, *b"DA"),
    (Vr::DS, *b"DS"),
    (Vr::DT, *b"DT"),
    (Vr::FD, *b"FD"),
    (Vr::FL, *b"FL"),
    (Vr::IS, *b"IS"),
    (Vr::LO, *b"LO"),
    (Vr::LT, *b"LT"),
    (Vr::OB, *b"OB"),
    (Vr::OD, *b"OD"),
    (Vr::OF, *b"OF"),
    (Vr::OL, *b"OL"),
    (Vr::OV, *b"OV"),
    (Vr::OW, *b"OW"),
    (Vr::PN, *b"PN"),
    (Vr::SH, *b"SH"),
    (Vr::SL, *b"SL"),
    (Vr::SQ, *b"SQ"),
    (Vr::SS, *b"SS"),
    (Vr::ST, *b"ST"),
    (Vr::SV, *b"SV"),
    (Vr::TM, *b"TM"),
    (Vr::UC, *b"UC"),
    (Vr::UI, *b"UI"),
    (Vr::UL, *b"UL"),
    (Vr::UN, *b"UN"),
    (Vr::UR, *b"UR"),
    (Vr::US, *b"US"),
    (Vr::UT, *b"UT"),
    (Vr::UV, *b"UV"),
];

impl Vr {
    /// Two-letter code as written in explicit VR encodings.
    pub fn code(self) -> [u8; 2] {
        CODES[self as usize].1
    }

    /// Parse the two-letter code of an explicit VR header.
    pub fn from_code(code: [u8; 2]) -> Option<Self> {
        CODES
            .iter()
            .find(|(_, vr_code)| *vr_code == code)
            .map(|(vr, _)| *vr)
    }

    /// Explicit VR headers of these VRs carry two reserved bytes and a
    /// 32-bit length.
    pub fn has_long_header(self) -> bool {
        matches!(
            self,
            Vr::OB
                | Vr::OD
                | Vr::OF
                | Vr::OL
                | Vr::OV
                | Vr::OW
                | Vr::SQ
                | Vr::SV
                | Vr::UC
                | Vr::UN
                | Vr::UR
                | Vr::UT
                | Vr::UV
        )
    }

    /// Character-string VRs.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            Vr::AE
                | Vr::AS
                | Vr::CS
                | Vr::DA
                | Vr::DS
                | Vr::DT
                | Vr::IS
                | Vr::LO
                | Vr::LT
                | Vr::PN
                | Vr::SH
                | Vr::ST
                | Vr::TM
                | Vr::UC
                | Vr::UI
                | Vr::UR
                | Vr::UT
        )
    }

    /// Byte appended to reach an even value length.
    pub fn padding(self) -> u8 {
        if self.is_text() && self != Vr::UI {
            b' '
        } else {
            0
        }
    }

    /// Size of the numeric unit that is byte-swapped between little and big
    /// endian; 1 for values that are never swapped.
    pub fn swap_unit(self) -> usize {
        match self {
            Vr::AT | Vr::OW | Vr::SS | Vr::US => 2,
            Vr::FL | Vr::OF | Vr::OL | Vr::SL | Vr::UL => 4,
            Vr::FD | Vr::OD | Vr::OV | Vr::SV | Vr::UV => 8,
            _ => 1,
        }
    }

    /// Reverse the byte order of every numeric unit in `bytes`.
    pub(crate) fn swapped(self, bytes: &[u8]) -> Vec<u8> {
        let unit = self.swap_unit();
        let mut out = bytes.to_vec();
        if unit > 1 {
            for chunk in out.chunks_exact_mut(unit) {
                chunk.reverse();
            }
        }
        out
    }
}

impl fmt::Display for Vr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b] = self.code();
        write!(f, "{}{}", a as char, b as char)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_roundtrip_for_every_vr() {
        for (vr, code) in CODES {
            assert_eq!(vr.code(), code);
            assert_eq!(Vr::from_code(code), Some(vr));
        }
        assert_eq!(Vr::UT.code(), *b"UT");
        assert_eq!(Vr::CS.to_string(), "CS");
        assert_eq!(Vr::from_code(*b"ZZ"), None);
    }

    #[test]
    fn header_forms() {
        assert!(Vr::SQ.has_long_header());
        assert!(Vr::UT.has_long_header());
        assert!(!Vr::UI.has_long_header());
        assert!(!Vr::UL.has_long_header());
    }

    #[test]
    fn padding_bytes() {
        assert_eq!(Vr::UI.padding(), 0);
        assert_eq!(Vr::CS.padding(), b' ');
        assert_eq!(Vr::OB.padding(), 0);
    }

    #[test]
    fn swapping_by_unit() {
        assert_eq!(Vr::US.swapped(&[1, 2, 3, 4]), vec![2, 1, 4, 3]);
        assert_eq!(Vr::UL.swapped(&[1, 2, 3, 4]), vec![4, 3, 2, 1]);
        assert_eq!(Vr::OB.swapped(&[1, 2, 3, 4]), vec![1, 2, 3, 4]);
    }
}
