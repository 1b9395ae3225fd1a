//! Key Object Selection document construction.
//!
//! [`create_kos`] builds the root dataset from the first accepted instance;
//! the item builders here produce the evidence and content items the
//! aggregator appends afterwards.

use chrono::NaiveDateTime;
use tracing::debug;

use mkkos_dicom::{Attributes, Tag, Vr, tags, uid};
use mkkos_shared::{KosConfig, Result};

use crate::codes::{Code, CodeTable};

/// Patient and study attributes copied from the first instance.
pub const PATIENT_AND_STUDY_ATTRS: [Tag; 13] = [
    tags::SPECIFIC_CHARACTER_SET,
    tags::STUDY_DATE,
    tags::STUDY_TIME,
    tags::ACCESSION_NUMBER,
    tags::ISSUER_OF_ACCESSION_NUMBER_SEQUENCE,
    tags::REFERRING_PHYSICIAN_NAME,
    tags::PATIENT_NAME,
    tags::PATIENT_ID,
    tags::ISSUER_OF_PATIENT_ID,
    tags::PATIENT_BIRTH_DATE,
    tags::PATIENT_SEX,
    tags::STUDY_INSTANCE_UID,
    tags::STUDY_ID,
];

/// Concept name of the document title modifier content item.
pub const DOCUMENT_TITLE_MODIFIER: &str = "DCM-113011";

/// Concept name of the key object description content item.
pub const KEY_OBJECT_DESCRIPTION: &str = "DCM-113012";

/// Mapping resource and identifier of the Key Object Selection template.
const TEMPLATE_MAPPING_RESOURCE: &str = "DCMR";
const TEMPLATE_IDENTIFIER: &str = "2010";

/// Value Type (0040,A040) of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Container,
    Image,
    Waveform,
    Composite,
    Code,
    Text,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Container => "CONTAINER",
            ValueType::Image => "IMAGE",
            ValueType::Waveform => "WAVEFORM",
            ValueType::Composite => "COMPOSITE",
            ValueType::Code => "CODE",
            ValueType::Text => "TEXT",
        }
    }
}

/// Relationship Type (0040,A010) of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipType {
    Contains,
    HasConceptMod,
}

impl RelationshipType {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationshipType::Contains => "CONTAINS",
            RelationshipType::HasConceptMod => "HAS CONCEPT MOD",
        }
    }
}

/// Attribute whose presence decides the value type, in priority order.
const CLASSIFIERS: [(Tag, ValueType); 2] = [
    (tags::PHOTOMETRIC_INTERPRETATION, ValueType::Image),
    (tags::WAVEFORM_SEQUENCE, ValueType::Waveform),
];

/// Value type of the content item referencing `inst`.
pub fn value_type_of(inst: &Attributes) -> ValueType {
    CLASSIFIERS
        .iter()
        .find(|(tag, _)| inst.contains(*tag))
        .map_or(ValueType::Composite, |(_, value_type)| *value_type)
}

/// Document settings with every code already resolved.
#[derive(Debug, Clone)]
pub struct KosSettings {
    pub document_title: Code,
    /// Modifier code and the concept name it is attached with.
    pub document_title_modifier: Option<(Code, Code)>,
    /// Description text and the concept name it is attached with.
    pub key_object_description: Option<(Code, String)>,
    pub series_number: String,
    pub instance_number: String,
}

impl KosSettings {
    /// Resolve the configured code strings against `codes`.
    ///
    /// Every lookup happens here, so an undefined code is reported before
    /// any input is read.
    pub fn resolve(config: &KosConfig, codes: &CodeTable) -> Result<Self> {
        config.validate()?;

        let document_title = codes.resolve(&config.document_title)?;
        let document_title_modifier = match &config.document_title_modifier {
            Some(modifier) => Some((codes.resolve(DOCUMENT_TITLE_MODIFIER)?, codes.resolve(modifier)?)),
            None => None,
        };
        let key_object_description = match &config.key_object_description {
            Some(text) => Some((codes.resolve(KEY_OBJECT_DESCRIPTION)?, text.clone())),
            None => None,
        };

        debug!(
            title = %document_title.meaning,
            modifier = document_title_modifier.as_ref().map(|(_, code)| code.meaning.as_str()),
            "resolved document codes"
        );

        Ok(Self {
            document_title,
            document_title_modifier,
            key_object_description,
            series_number: config.series_number.clone(),
            instance_number: config.instance_number.clone(),
        })
    }
}

/// Build the root document from the first accepted instance.
///
/// Evidence and content sequences are created empty, except for the
/// optional modifier and description items which lead the content sequence.
pub fn create_kos(first: &Attributes, settings: &KosSettings, now: NaiveDateTime) -> Attributes {
    let mut attrs = Attributes::from_selected(first, &PATIENT_AND_STUDY_ATTRS);
    attrs.set_string(tags::SOP_CLASS_UID, Vr::UI, uid::KEY_OBJECT_SELECTION_DOCUMENT_STORAGE);
    attrs.set_string(tags::SOP_INSTANCE_UID, Vr::UI, uid::create_uid());
    attrs.set_date_time(tags::CONTENT_DATE, Vr::DA, now);
    attrs.set_date_time(tags::CONTENT_TIME, Vr::TM, now);
    attrs.set_string(tags::MODALITY, Vr::CS, "KO");
    attrs.set_null(tags::REFERENCED_PERFORMED_PROCEDURE_STEP_SEQUENCE, Vr::SQ);
    attrs.set_string(tags::SERIES_INSTANCE_UID, Vr::UI, uid::create_uid());
    attrs.set_string(tags::SERIES_NUMBER, Vr::IS, settings.series_number.as_str());
    attrs.set_string(tags::INSTANCE_NUMBER, Vr::IS, settings.instance_number.as_str());
    attrs.set_string(tags::VALUE_TYPE, Vr::CS, ValueType::Container.as_str());
    attrs.set_string(tags::CONTINUITY_OF_CONTENT, Vr::CS, "SEPARATE");
    attrs
        .new_sequence(tags::CONCEPT_NAME_CODE_SEQUENCE, 1)
        .push(settings.document_title.to_item());
    attrs.new_sequence(tags::CURRENT_REQUESTED_PROCEDURE_EVIDENCE_SEQUENCE, 1);
    attrs
        .new_sequence(tags::CONTENT_TEMPLATE_SEQUENCE, 1)
        .push(template_identifier());

    let content = attrs.new_sequence(tags::CONTENT_SEQUENCE, 1);
    if let Some((concept_name, modifier)) = &settings.document_title_modifier {
        content.push(document_title_modifier(concept_name, modifier));
    }
    if let Some((concept_name, text)) = &settings.key_object_description {
        content.push(key_object_description(concept_name, text));
    }
    attrs
}

/// Referenced SOP item.
pub fn ref_sop(sop_class_uid: &str, sop_instance_uid: &str) -> Attributes {
    let mut item = Attributes::new();
    item.set_string(tags::REFERENCED_SOP_CLASS_UID, Vr::UI, sop_class_uid);
    item.set_string(tags::REFERENCED_SOP_INSTANCE_UID, Vr::UI, sop_instance_uid);
    item
}

/// CONTAINS content item referencing one instance.
pub fn content_item(value_type: ValueType, ref_sop: Attributes) -> Attributes {
    let mut item = Attributes::new();
    item.set_string(tags::RELATIONSHIP_TYPE, Vr::CS, RelationshipType::Contains.as_str());
    item.set_string(tags::VALUE_TYPE, Vr::CS, value_type.as_str());
    item.new_sequence(tags::REFERENCED_SOP_SEQUENCE, 1).push(ref_sop);
    item
}

fn template_identifier() -> Attributes {
    let mut item = Attributes::new();
    item.set_string(tags::MAPPING_RESOURCE, Vr::CS, TEMPLATE_MAPPING_RESOURCE);
    item.set_string(tags::TEMPLATE_IDENTIFIER, Vr::CS, TEMPLATE_IDENTIFIER);
    item
}

fn document_title_modifier(concept_name: &Code, modifier: &Code) -> Attributes {
    let mut item = Attributes::new();
    item.set_string(
        tags::RELATIONSHIP_TYPE,
        Vr::CS,
        RelationshipType::HasConceptMod.as_str(),
    );
    item.set_string(tags::VALUE_TYPE, Vr::CS, ValueType::Code.as_str());
    item.new_sequence(tags::CONCEPT_NAME_CODE_SEQUENCE, 1)
        .push(concept_name.to_item());
    item.new_sequence(tags::CONCEPT_CODE_SEQUENCE, 1)
        .push(modifier.to_item());
    item
}

fn key_object_description(concept_name: &Code, text: &str) -> Attributes {
    let mut item = Attributes::new();
    item.set_string(tags::RELATIONSHIP_TYPE, Vr::CS, RelationshipType::Contains.as_str());
    item.set_string(tags::VALUE_TYPE, Vr::CS, ValueType::Text.as_str());
    item.new_sequence(tags::CONCEPT_NAME_CODE_SEQUENCE, 1)
        .push(concept_name.to_item());
    item.set_string(tags::TEXT_VALUE, Vr::UT, text);
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mkkos_shared::AppConfig;

    fn codes() -> CodeTable {
        CodeTable::builtin().unwrap()
    }

    fn config() -> KosConfig {
        let mut config = KosConfig::from(&AppConfig::default());
        config.document_title = "113000".into();
        config.output = "kos.dcm".into();
        config
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
    }

    fn first_instance() -> Attributes {
        let mut inst = Attributes::new();
        inst.set_string(tags::SPECIFIC_CHARACTER_SET, Vr::CS, "ISO_IR 192");
        inst.set_string(tags::SOP_CLASS_UID, Vr::UI, "1.2.840.10008.5.1.4.1.1.2");
        inst.set_string(tags::SOP_INSTANCE_UID, Vr::UI, "1.2.3.1.1");
        inst.set_string(tags::MODALITY, Vr::CS, "CT");
        inst.set_string(tags::PATIENT_NAME, Vr::PN, "Doe^Jane");
        inst.set_string(tags::PATIENT_ID, Vr::LO, "PID-1");
        inst.set_string(tags::STUDY_INSTANCE_UID, Vr::UI, "1.2.3");
        inst.set_string(tags::SERIES_INSTANCE_UID, Vr::UI, "1.2.3.1");
        inst.set_string(tags::SERIES_NUMBER, Vr::IS, "4");
        inst
    }

    #[test]
    fn classification_priority() {
        let mut inst = Attributes::new();
        assert_eq!(value_type_of(&inst), ValueType::Composite);

        inst.new_sequence(tags::WAVEFORM_SEQUENCE, 1);
        assert_eq!(value_type_of(&inst), ValueType::Waveform);

        inst.set_string(tags::PHOTOMETRIC_INTERPRETATION, Vr::CS, "MONOCHROME2");
        assert_eq!(value_type_of(&inst), ValueType::Image);

        inst.remove(tags::WAVEFORM_SEQUENCE);
        assert_eq!(value_type_of(&inst), ValueType::Image);
    }

    #[test]
    fn settings_resolve_all_codes_up_front() {
        let mut config = config();
        config.document_title_modifier = Some("111212".into());
        config.key_object_description = Some("bad exposure".into());

        let settings = KosSettings::resolve(&config, &codes()).unwrap();
        assert_eq!(settings.document_title.meaning, "Of Interest");
        let (concept, modifier) = settings.document_title_modifier.unwrap();
        assert_eq!(concept.value, "113011");
        assert_eq!(modifier.meaning, "Over exposed");
        let (concept, text) = settings.key_object_description.unwrap();
        assert_eq!(concept.value, "113012");
        assert_eq!(text, "bad exposure");
    }

    #[test]
    fn settings_fail_on_undefined_code() {
        let mut config = config();
        config.document_title = "999999".into();
        let err = KosSettings::resolve(&config, &codes()).unwrap_err();
        assert!(err.is_configuration());

        let mut config = self::config();
        config.key_object_description = Some("text".into());
        let table: CodeTable = [("113000", "Of Interest")].into_iter().collect();
        let err = KosSettings::resolve(&config, &table).unwrap_err();
        assert!(err.to_string().contains(KEY_OBJECT_DESCRIPTION));
    }

    #[test]
    fn create_kos_copies_only_patient_and_study_attributes() {
        let settings = KosSettings::resolve(&config(), &codes()).unwrap();
        let kos = create_kos(&first_instance(), &settings, now());

        assert_eq!(kos.get_string(tags::PATIENT_NAME), Some("Doe^Jane"));
        assert_eq!(kos.get_string(tags::PATIENT_ID), Some("PID-1"));
        assert_eq!(kos.get_string(tags::STUDY_INSTANCE_UID), Some("1.2.3"));
        assert_eq!(kos.get_string(tags::SPECIFIC_CHARACTER_SET), Some("ISO_IR 192"));
        assert!(!kos.contains(tags::PATIENT_SEX));

        assert_eq!(kos.get_string(tags::MODALITY), Some("KO"));
        assert_eq!(kos.get_string(tags::SERIES_NUMBER), Some("999"));
        assert_eq!(kos.get_string(tags::INSTANCE_NUMBER), Some("1"));
        assert_eq!(
            kos.get_string(tags::SOP_CLASS_UID),
            Some(uid::KEY_OBJECT_SELECTION_DOCUMENT_STORAGE)
        );
        assert_ne!(kos.get_string(tags::SOP_INSTANCE_UID), Some("1.2.3.1.1"));
        assert_ne!(kos.get_string(tags::SERIES_INSTANCE_UID), Some("1.2.3.1"));
        assert!(uid::is_valid_uid(kos.get_string(tags::SERIES_INSTANCE_UID).unwrap()));
    }

    #[test]
    fn create_kos_structure() {
        let settings = KosSettings::resolve(&config(), &codes()).unwrap();
        let kos = create_kos(&first_instance(), &settings, now());

        assert_eq!(kos.get_string(tags::VALUE_TYPE), Some("CONTAINER"));
        assert_eq!(kos.get_string(tags::CONTINUITY_OF_CONTENT), Some("SEPARATE"));
        assert!(kos.contains(tags::REFERENCED_PERFORMED_PROCEDURE_STEP_SEQUENCE));
        assert!(kos.contains(tags::CONTENT_DATE));
        assert!(kos.contains(tags::CONTENT_TIME));

        let title = kos.sequence(tags::CONCEPT_NAME_CODE_SEQUENCE).unwrap();
        assert_eq!(title.len(), 1);
        assert_eq!(title.get(0).unwrap().get_string(tags::CODE_VALUE), Some("113000"));

        let template = kos.sequence(tags::CONTENT_TEMPLATE_SEQUENCE).unwrap();
        let template = template.get(0).unwrap();
        assert_eq!(template.get_string(tags::MAPPING_RESOURCE), Some("DCMR"));
        assert_eq!(template.get_string(tags::TEMPLATE_IDENTIFIER), Some("2010"));

        assert!(kos.sequence(tags::CURRENT_REQUESTED_PROCEDURE_EVIDENCE_SEQUENCE).unwrap().is_empty());
        assert!(kos.sequence(tags::CONTENT_SEQUENCE).unwrap().is_empty());
    }

    #[test]
    fn modifier_and_description_lead_content() {
        let mut config = config();
        config.document_title = "113001".into();
        config.document_title_modifier = Some("111210".into());
        config.key_object_description = Some("blurred".into());
        let settings = KosSettings::resolve(&config, &codes()).unwrap();
        let kos = create_kos(&first_instance(), &settings, now());

        let content = kos.sequence(tags::CONTENT_SEQUENCE).unwrap();
        assert_eq!(content.len(), 2);

        let modifier = content.get(0).unwrap();
        assert_eq!(modifier.get_string(tags::RELATIONSHIP_TYPE), Some("HAS CONCEPT MOD"));
        assert_eq!(modifier.get_string(tags::VALUE_TYPE), Some("CODE"));
        let name = modifier.sequence(tags::CONCEPT_NAME_CODE_SEQUENCE).unwrap();
        assert_eq!(name.get(0).unwrap().get_string(tags::CODE_VALUE), Some("113011"));
        let concept = modifier.sequence(tags::CONCEPT_CODE_SEQUENCE).unwrap();
        assert_eq!(concept.get(0).unwrap().get_string(tags::CODE_MEANING), Some("Motion blur"));

        let description = content.get(1).unwrap();
        assert_eq!(description.get_string(tags::RELATIONSHIP_TYPE), Some("CONTAINS"));
        assert_eq!(description.get_string(tags::VALUE_TYPE), Some("TEXT"));
        assert_eq!(description.get_string(tags::TEXT_VALUE), Some("blurred"));
        assert_eq!(description.get(tags::TEXT_VALUE).map(|e| e.vr), Some(Vr::UT));
    }

    #[test]
    fn content_item_references_instance() {
        let item = content_item(ValueType::Waveform, ref_sop("1.2.840.10008.5.1.4.1.1.9.1.1", "1.2.9"));
        assert_eq!(item.get_string(tags::RELATIONSHIP_TYPE), Some("CONTAINS"));
        assert_eq!(item.get_string(tags::VALUE_TYPE), Some("WAVEFORM"));
        let refs = item.sequence(tags::REFERENCED_SOP_SEQUENCE).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs.get(0).unwrap().get_string(tags::REFERENCED_SOP_INSTANCE_UID), Some("1.2.9"));
    }
}
