//! Attribute tags.

use std::fmt;

use crate::vr::Vr;

/// A data element tag: group number in the high 16 bits, element number in
/// the low 16 bits. Ordering is numeric, which is also the encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub u32);

impl Tag {
    pub const fn new(group: u16, element: u16) -> Self {
        Self(((group as u32) << 16) | element as u32)
    }

    pub const fn group(self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub const fn element(self) -> u16 {
        self.0 as u16
    }

    /// `(gggg,0000)` elements carry the byte length of their group.
    pub const fn is_group_length(self) -> bool {
        self.element() == 0
    }

    /// The group length tag of this tag's group.
    pub const fn group_length_tag(self) -> Tag {
        Tag::new(self.group(), 0)
    }

    /// Default VR for implicit VR decoding.
    pub fn dictionary_vr(self) -> Vr {
        tags::vr_of(self)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.group(), self.element())
    }
}

/// Tags read from scanned instances or written into the document.
pub mod tags {
    use super::Tag;
    use crate::vr::Vr;

    pub const FILE_META_INFORMATION_GROUP_LENGTH: Tag = Tag(0x0002_0000);
    pub const FILE_META_INFORMATION_VERSION: Tag = Tag(0x0002_0001);
    pub const MEDIA_STORAGE_SOP_CLASS_UID: Tag = Tag(0x0002_0002);
    pub const MEDIA_STORAGE_SOP_INSTANCE_UID: Tag = Tag(0x0002_0003);
    pub const TRANSFER_SYNTAX_UID: Tag = Tag(0x0002_0010);
    pub const IMPLEMENTATION_CLASS_UID: Tag = Tag(0x0002_0012);
    pub const IMPLEMENTATION_VERSION_NAME: Tag = Tag(0x0002_0013);

    pub const SPECIFIC_CHARACTER_SET: Tag = Tag(0x0008_0005);
    pub const SOP_CLASS_UID: Tag = Tag(0x0008_0016);
    pub const SOP_INSTANCE_UID: Tag = Tag(0x0008_0018);
    pub const STUDY_DATE: Tag = Tag(0x0008_0020);
    pub const CONTENT_DATE: Tag = Tag(0x0008_0023);
    pub const STUDY_TIME: Tag = Tag(0x0008_0030);
    pub const CONTENT_TIME: Tag = Tag(0x0008_0033);
    pub const ACCESSION_NUMBER: Tag = Tag(0x0008_0050);
    pub const ISSUER_OF_ACCESSION_NUMBER_SEQUENCE: Tag = Tag(0x0008_0051);
    pub const MODALITY: Tag = Tag(0x0008_0060);
    pub const REFERRING_PHYSICIAN_NAME: Tag = Tag(0x0008_0090);
    pub const CODE_VALUE: Tag = Tag(0x0008_0100);
    pub const CODING_SCHEME_DESIGNATOR: Tag = Tag(0x0008_0102);
    pub const CODE_MEANING: Tag = Tag(0x0008_0104);
    pub const MAPPING_RESOURCE: Tag = Tag(0x0008_0105);
    pub const REFERENCED_PERFORMED_PROCEDURE_STEP_SEQUENCE: Tag = Tag(0x0008_1111);
    pub const REFERENCED_SERIES_SEQUENCE: Tag = Tag(0x0008_1115);
    pub const REFERENCED_SOP_SEQUENCE: Tag = Tag(0x0008_1199);
    pub const REFERENCED_SOP_CLASS_UID: Tag = Tag(0x0008_1150);
    pub const REFERENCED_SOP_INSTANCE_UID: Tag = Tag(0x0008_1155);

    pub const PATIENT_NAME: Tag = Tag(0x0010_0010);
    pub const PATIENT_ID: Tag = Tag(0x0010_0020);
    pub const ISSUER_OF_PATIENT_ID: Tag = Tag(0x0010_0021);
    pub const PATIENT_BIRTH_DATE: Tag = Tag(0x0010_0030);
    pub const PATIENT_SEX: Tag = Tag(0x0010_0040);

    pub const STUDY_INSTANCE_UID: Tag = Tag(0x0020_000D);
    pub const SERIES_INSTANCE_UID: Tag = Tag(0x0020_000E);
    pub const STUDY_ID: Tag = Tag(0x0020_0010);
    pub const SERIES_NUMBER: Tag = Tag(0x0020_0011);
    pub const INSTANCE_NUMBER: Tag = Tag(0x0020_0013);

    pub const SAMPLES_PER_PIXEL: Tag = Tag(0x0028_0002);
    pub const PHOTOMETRIC_INTERPRETATION: Tag = Tag(0x0028_0004);
    pub const ROWS: Tag = Tag(0x0028_0010);
    pub const COLUMNS: Tag = Tag(0x0028_0011);

    pub const LOCAL_NAMESPACE_ENTITY_ID: Tag = Tag(0x0040_0031);
    pub const UNIVERSAL_ENTITY_ID: Tag = Tag(0x0040_0032);
    pub const UNIVERSAL_ENTITY_ID_TYPE: Tag = Tag(0x0040_0033);
    pub const CURRENT_REQUESTED_PROCEDURE_EVIDENCE_SEQUENCE: Tag = Tag(0x0040_A375);
    pub const RELATIONSHIP_TYPE: Tag = Tag(0x0040_A010);
    pub const VALUE_TYPE: Tag = Tag(0x0040_A040);
    pub const CONCEPT_NAME_CODE_SEQUENCE: Tag = Tag(0x0040_A043);
    pub const CONTINUITY_OF_CONTENT: Tag = Tag(0x0040_A050);
    pub const TEXT_VALUE: Tag = Tag(0x0040_A160);
    pub const CONCEPT_CODE_SEQUENCE: Tag = Tag(0x0040_A168);
    pub const CONTENT_TEMPLATE_SEQUENCE: Tag = Tag(0x0040_A504);
    pub const CONTENT_SEQUENCE: Tag = Tag(0x0040_A730);
    pub const TEMPLATE_IDENTIFIER: Tag = Tag(0x0040_DB00);

    pub const WAVEFORM_SEQUENCE: Tag = Tag(0x5400_0100);

    pub const PIXEL_DATA: Tag = Tag(0x7FE0_0010);

    pub const ITEM: Tag = Tag(0xFFFE_E000);
    pub const ITEM_DELIMITATION_ITEM: Tag = Tag(0xFFFE_E00D);
    pub const SEQUENCE_DELIMITATION_ITEM: Tag = Tag(0xFFFE_E0DD);

    /// VR used when decoding implicit VR data. Tags outside this table
    /// decode as UN.
    pub fn vr_of(tag: Tag) -> Vr {
        if tag.is_group_length() {
            return Vr::UL;
        }
        match tag {
            FILE_META_INFORMATION_VERSION => Vr::OB,
            MEDIA_STORAGE_SOP_CLASS_UID
            | MEDIA_STORAGE_SOP_INSTANCE_UID
            | TRANSFER_SYNTAX_UID
            | IMPLEMENTATION_CLASS_UID
            | SOP_CLASS_UID
            | SOP_INSTANCE_UID
            | REFERENCED_SOP_CLASS_UID
            | REFERENCED_SOP_INSTANCE_UID
            | STUDY_INSTANCE_UID
            | SERIES_INSTANCE_UID => Vr::UI,
            IMPLEMENTATION_VERSION_NAME | ACCESSION_NUMBER | CODE_VALUE
            | CODING_SCHEME_DESIGNATOR | STUDY_ID => Vr::SH,
            SPECIFIC_CHARACTER_SET | MODALITY | MAPPING_RESOURCE | PATIENT_SEX
            | PHOTOMETRIC_INTERPRETATION | RELATIONSHIP_TYPE | VALUE_TYPE
            | CONTINUITY_OF_CONTENT | TEMPLATE_IDENTIFIER | UNIVERSAL_ENTITY_ID_TYPE => Vr::CS,
            STUDY_DATE | CONTENT_DATE | PATIENT_BIRTH_DATE => Vr::DA,
            STUDY_TIME | CONTENT_TIME => Vr::TM,
            REFERRING_PHYSICIAN_NAME | PATIENT_NAME => Vr::PN,
            CODE_MEANING | PATIENT_ID | ISSUER_OF_PATIENT_ID => Vr::LO,
            SERIES_NUMBER | INSTANCE_NUMBER => Vr::IS,
            TEXT_VALUE | LOCAL_NAMESPACE_ENTITY_ID | UNIVERSAL_ENTITY_ID => Vr::UT,
            SAMPLES_PER_PIXEL | ROWS | COLUMNS => Vr::US,
            ISSUER_OF_ACCESSION_NUMBER_SEQUENCE
            | REFERENCED_PERFORMED_PROCEDURE_STEP_SEQUENCE
            | REFERENCED_SERIES_SEQUENCE
            | REFERENCED_SOP_SEQUENCE
            | CURRENT_REQUESTED_PROCEDURE_EVIDENCE_SEQUENCE
            | CONCEPT_NAME_CODE_SEQUENCE
            | CONCEPT_CODE_SEQUENCE
            | CONTENT_TEMPLATE_SEQUENCE
            | CONTENT_SEQUENCE
            | WAVEFORM_SEQUENCE => Vr::SQ,
            PIXEL_DATA => Vr::OW,
            _ => Vr::UN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_and_element() {
        let tag = tags::STUDY_INSTANCE_UID;
        assert_eq!(tag.group(), 0x0020);
        assert_eq!(tag.element(), 0x000D);
        assert_eq!(Tag::new(0x0020, 0x000D), tag);
        assert_eq!(tag.to_string(), "(0020,000D)");
    }

    #[test]
    fn ordering_is_numeric() {
        assert!(tags::SOP_CLASS_UID < tags::STUDY_INSTANCE_UID);
        assert!(tags::CONTENT_SEQUENCE < tags::WAVEFORM_SEQUENCE);
        assert!(tags::PIXEL_DATA < tags::ITEM);
    }

    #[test]
    fn dictionary_lookup() {
        assert_eq!(tags::vr_of(tags::PATIENT_NAME), Vr::PN);
        assert_eq!(tags::vr_of(tags::CONTENT_SEQUENCE), Vr::SQ);
        assert_eq!(tags::vr_of(Tag::new(0x0008, 0x0000)), Vr::UL);
        assert_eq!(tags::vr_of(Tag::new(0x0009, 0x1001)), Vr::UN);
    }

    #[test]
    fn issuer_item_elements_have_dictionary_vrs() {
        assert_eq!(tags::vr_of(tags::LOCAL_NAMESPACE_ENTITY_ID), Vr::UT);
        assert_eq!(tags::vr_of(tags::UNIVERSAL_ENTITY_ID), Vr::UT);
        assert_eq!(tags::vr_of(tags::UNIVERSAL_ENTITY_ID_TYPE), Vr::CS);
    }
}
