//! Folding scanned instances into one Key Object Selection document.

use std::path::Path;

use chrono::Local;
use tracing::{debug, info};

use mkkos_dicom::{Attributes, Sequence, Vr, tags};
use mkkos_shared::{MkKosError, Result};

use crate::document::{self, KosSettings};
use crate::encoder::{WriteOptions, write_kos_file};

/// Lifecycle of the document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentState {
    /// No instance with all four identifiers has been seen.
    Absent,
    /// Created from the first accepted instance and still growing.
    Building(Attributes),
    /// Written; no further changes.
    Finalized(Attributes),
}

/// Identifiers an instance must carry to be referenced.
struct InstanceIds<'a> {
    study: &'a str,
    series: &'a str,
    sop_instance: &'a str,
    sop_class: &'a str,
}

impl<'a> InstanceIds<'a> {
    fn of(inst: &'a Attributes) -> Option<Self> {
        Some(Self {
            study: inst.get_string(tags::STUDY_INSTANCE_UID)?,
            series: inst.get_string(tags::SERIES_INSTANCE_UID)?,
            sop_instance: inst.get_string(tags::SOP_INSTANCE_UID)?,
            sop_class: inst.get_string(tags::SOP_CLASS_UID)?,
        })
    }
}

/// Builds the document one instance at a time.
///
/// Instances are referenced in call order. Study and series entries are
/// shared by UID; instance references are appended as given, so the same
/// instance added twice is referenced twice.
#[derive(Debug)]
pub struct KosBuilder {
    settings: KosSettings,
    state: DocumentState,
    accepted: usize,
    skipped: usize,
}

impl KosBuilder {
    pub fn new(settings: KosSettings) -> Self {
        Self {
            settings,
            state: DocumentState::Absent,
            accepted: 0,
            skipped: 0,
        }
    }

    /// Reference `inst` in the evidence and content sequences.
    ///
    /// Instances lacking any of the Study, Series, SOP Instance or SOP
    /// Class UIDs are skipped. The first accepted instance creates the
    /// document.
    pub fn add_instance(&mut self, inst: &Attributes) -> Result<()> {
        if matches!(self.state, DocumentState::Finalized(_)) {
            return Err(MkKosError::Finalized);
        }

        let Some(ids) = InstanceIds::of(inst) else {
            self.skipped += 1;
            debug!("instance lacks study, series or SOP identifiers, skipping");
            return Ok(());
        };

        if matches!(self.state, DocumentState::Absent) {
            let kos = document::create_kos(inst, &self.settings, Local::now().naive_local());
            info!(study = ids.study, "document created from first instance");
            self.state = DocumentState::Building(kos);
        }
        let DocumentState::Building(kos) = &mut self.state else {
            return Err(MkKosError::Finalized);
        };

        let evidence = kos.ensure_sequence(tags::CURRENT_REQUESTED_PROCEDURE_EVIDENCE_SEQUENCE, 1);
        evidence_series(evidence, ids.study, ids.series)
            .push(document::ref_sop(ids.sop_class, ids.sop_instance));

        let value_type = document::value_type_of(inst);
        kos.ensure_sequence(tags::CONTENT_SEQUENCE, 1).push(document::content_item(
            value_type,
            document::ref_sop(ids.sop_class, ids.sop_instance),
        ));

        self.accepted += 1;
        debug!(
            sop_instance = ids.sop_instance,
            value_type = value_type.as_str(),
            "instance referenced"
        );
        Ok(())
    }

    /// The document, once created.
    pub fn document(&self) -> Option<&Attributes> {
        match &self.state {
            DocumentState::Absent => None,
            DocumentState::Building(kos) | DocumentState::Finalized(kos) => Some(kos),
        }
    }

    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    /// Instances referenced so far.
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Instances skipped for missing identifiers.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Write the document to `path` and finalize it.
    ///
    /// Fails with [`MkKosError::EmptyResult`] before touching `path` when no
    /// instance was accepted. A failed write leaves the document building.
    pub fn write_file(&mut self, path: &Path, opts: &WriteOptions) -> Result<()> {
        let kos = match &self.state {
            DocumentState::Absent => return Err(MkKosError::EmptyResult),
            DocumentState::Finalized(_) => return Err(MkKosError::Finalized),
            DocumentState::Building(kos) => kos,
        };
        write_kos_file(kos, path, opts)?;

        if let DocumentState::Building(kos) =
            std::mem::replace(&mut self.state, DocumentState::Absent)
        {
            self.state = DocumentState::Finalized(kos);
        }
        Ok(())
    }

    /// Take the document out of the builder, finalized or not.
    pub fn into_document(self) -> Option<Attributes> {
        match self.state {
            DocumentState::Absent => None,
            DocumentState::Building(kos) | DocumentState::Finalized(kos) => Some(kos),
        }
    }
}

/// Referenced SOP sequence of the series entry, creating the study and
/// series entries on first use.
fn evidence_series<'a>(evidence: &'a mut Sequence, study: &str, series: &str) -> &'a mut Sequence {
    evidence
        .get_or_add_item(tags::STUDY_INSTANCE_UID, Vr::UI, study)
        .ensure_sequence(tags::REFERENCED_SERIES_SEQUENCE, 10)
        .get_or_add_item(tags::SERIES_INSTANCE_UID, Vr::UI, series)
        .ensure_sequence(tags::REFERENCED_SOP_SEQUENCE, 100)
}
