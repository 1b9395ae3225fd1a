//! Dataset and Part 10 file encoder.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Write;

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use chrono::NaiveDateTime;
use mkkos_shared::{EncodingOptions, MkKosError, Result};
use tracing::debug;

use crate::UNDEFINED_LENGTH;
use crate::attributes::{Attributes, Element, Value};
use crate::tag::{Tag, tags};
use crate::transfer_syntax::{Encoding, TransferSyntax};
use crate::uid;
use crate::vr::Vr;

/// Bytes of the zero preamble preceding `DICM`.
const PREAMBLE_LEN: usize = 128;

/// Encoded size of a `(gggg,0000)` UL element in any transfer syntax.
const GROUP_LENGTH_ELEMENT_LEN: u32 = 12;

/// Encoded size of an item/sequence tag plus its length field.
const ITEM_HEADER_LEN: u32 = 8;

/// Build the file meta information for `dataset` encoded with `transfer_syntax_uid`.
pub fn create_file_meta_information(
    dataset: &Attributes,
    transfer_syntax_uid: &str,
) -> Result<Attributes> {
    let sop_class = dataset
        .get_string(tags::SOP_CLASS_UID)
        .ok_or_else(|| MkKosError::validation("dataset lacks SOP Class UID"))?;
    let sop_instance = dataset
        .get_string(tags::SOP_INSTANCE_UID)
        .ok_or_else(|| MkKosError::validation("dataset lacks SOP Instance UID"))?;

    let mut fmi = Attributes::new();
    fmi.set_bytes(tags::FILE_META_INFORMATION_VERSION, Vr::OB, vec![0x00, 0x01]);
    fmi.set_string(tags::MEDIA_STORAGE_SOP_CLASS_UID, Vr::UI, sop_class);
    fmi.set_string(tags::MEDIA_STORAGE_SOP_INSTANCE_UID, Vr::UI, sop_instance);
    fmi.set_string(tags::TRANSFER_SYNTAX_UID, Vr::UI, transfer_syntax_uid);
    fmi.set_string(tags::IMPLEMENTATION_CLASS_UID, Vr::UI, uid::IMPLEMENTATION_CLASS_UID);
    fmi.set_string(
        tags::IMPLEMENTATION_VERSION_NAME,
        Vr::SH,
        uid::IMPLEMENTATION_VERSION_NAME,
    );
    Ok(fmi)
}

/// Writes datasets to a byte sink.
///
/// The body encoding comes from the transfer syntax given at construction,
/// or from the Transfer Syntax UID of the file meta information when one is
/// written.
pub struct DicomWriter<W: Write> {
    out: W,
    encoding: Encoding,
    options: EncodingOptions,
}

impl<W: Write> DicomWriter<W> {
    pub fn new(out: W, transfer_syntax: &TransferSyntax, options: EncodingOptions) -> Self {
        Self::with_encoding(out, transfer_syntax.encoding(), options)
    }

    fn with_encoding(out: W, encoding: Encoding, options: EncodingOptions) -> Self {
        Self {
            out,
            encoding,
            options,
        }
    }

    /// Write `dataset`, preceded by preamble, `DICM` and `fmi` when given.
    pub fn write_dataset(&mut self, fmi: Option<&Attributes>, dataset: &Attributes) -> Result<()> {
        if let Some(fmi) = fmi {
            let ts_uid = fmi.get_string(tags::TRANSFER_SYNTAX_UID).ok_or_else(|| {
                MkKosError::validation("file meta information lacks Transfer Syntax UID")
            })?;
            self.encoding = TransferSyntax::from_uid(ts_uid)?.encoding();
            self.write_file_meta_information(fmi)?;
        }
        debug!(encoding = ?self.encoding, options = ?self.options, "writing dataset");
        self.write_elements(dataset)
    }

    /// Flush and return the sink.
    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_file_meta_information(&mut self, fmi: &Attributes) -> Result<()> {
        self.out.write_all(&[0u8; PREAMBLE_LEN])?;
        self.out.write_all(b"DICM")?;

        let mut meta = DicomWriter::with_encoding(
            &mut self.out,
            Encoding::ExplicitVrLittleEndian,
            EncodingOptions::explicit_lengths(),
        );
        let group_len = meta.dataset_len(fmi);
        meta.write_header(tags::FILE_META_INFORMATION_GROUP_LENGTH, Vr::UL, 4)?;
        meta.write_u32(group_len)?;
        meta.write_elements(fmi)
    }

    // -----------------------------------------------------------------------
    // Lengths
    // -----------------------------------------------------------------------

    fn header_len(&self, vr: Vr) -> u32 {
        if self.encoding.is_explicit_vr() && vr.has_long_header() {
            12
        } else {
            8
        }
    }

    fn element_len(&self, element: &Element) -> u32 {
        let value_len = match items_of(element) {
            Some(items) => self.sequence_value_len(items),
            None => padded_len(raw_value(self.encoding, element).len()),
        };
        self.header_len(element.vr) + value_len
    }

    /// Length of a sequence's value including a trailing delimiter if any.
    fn sequence_value_len(&self, items: &[Attributes]) -> u32 {
        let body: u32 = items.iter().map(|item| self.item_len(item)).sum();
        if self.options.undefined_sequence(items.len()) {
            body + ITEM_HEADER_LEN
        } else {
            body
        }
    }

    fn item_len(&self, item: &Attributes) -> u32 {
        let delimiter = if self.options.undefined_item(body_elements(item).count()) {
            ITEM_HEADER_LEN
        } else {
            0
        };
        ITEM_HEADER_LEN + self.dataset_len(item) + delimiter
    }

    fn dataset_len(&self, attrs: &Attributes) -> u32 {
        let groups = if self.options.group_length {
            self.group_lengths(attrs).len() as u32 * GROUP_LENGTH_ELEMENT_LEN
        } else {
            0
        };
        let elements: u32 = body_elements(attrs)
            .map(|(_, element)| self.element_len(element))
            .sum();
        groups + elements
    }

    fn group_lengths(&self, attrs: &Attributes) -> BTreeMap<u16, u32> {
        let mut lengths = BTreeMap::new();
        for (tag, element) in body_elements(attrs) {
            *lengths.entry(tag.group()).or_insert(0) += self.element_len(element);
        }
        lengths
    }

    // -----------------------------------------------------------------------
    // Encoding
    // -----------------------------------------------------------------------

    fn write_elements(&mut self, attrs: &Attributes) -> Result<()> {
        let group_lengths = if self.options.group_length {
            self.group_lengths(attrs)
        } else {
            BTreeMap::new()
        };

        let mut current_group = None;
        for (tag, element) in body_elements(attrs) {
            if current_group != Some(tag.group()) {
                current_group = Some(tag.group());
                if let Some(&len) = group_lengths.get(&tag.group()) {
                    self.write_header(tag.group_length_tag(), Vr::UL, 4)?;
                    self.write_u32(len)?;
                }
            }
            self.write_element(tag, element)?;
        }
        Ok(())
    }

    fn write_element(&mut self, tag: Tag, element: &Element) -> Result<()> {
        if let Some(items) = items_of(element) {
            return self.write_sequence(tag, items);
        }

        let value = raw_value(self.encoding, element);
        self.write_header(tag, element.vr, padded_len(value.len()))?;
        self.out.write_all(&value)?;
        if value.len() % 2 == 1 {
            self.out.write_all(&[element.vr.padding()])?;
        }
        Ok(())
    }

    fn write_sequence(&mut self, tag: Tag, items: &[Attributes]) -> Result<()> {
        let undefined = self.options.undefined_sequence(items.len());
        let len = if undefined {
            UNDEFINED_LENGTH
        } else {
            self.sequence_value_len(items)
        };

        self.write_header(tag, Vr::SQ, len)?;
        for item in items {
            self.write_item(item)?;
        }
        if undefined {
            self.write_tag(tags::SEQUENCE_DELIMITATION_ITEM)?;
            self.write_u32(0)?;
        }
        Ok(())
    }

    fn write_item(&mut self, item: &Attributes) -> Result<()> {
        let undefined = self.options.undefined_item(body_elements(item).count());
        let len = if undefined {
            UNDEFINED_LENGTH
        } else {
            self.dataset_len(item)
        };

        self.write_tag(tags::ITEM)?;
        self.write_u32(len)?;
        self.write_elements(item)?;
        if undefined {
            self.write_tag(tags::ITEM_DELIMITATION_ITEM)?;
            self.write_u32(0)?;
        }
        Ok(())
    }

    fn write_header(&mut self, tag: Tag, vr: Vr, len: u32) -> Result<()> {
        self.write_tag(tag)?;
        if !self.encoding.is_explicit_vr() {
            self.write_u32(len)?;
            return Ok(());
        }

        self.out.write_all(&vr.code())?;
        if vr.has_long_header() {
            self.write_u16(0)?;
            self.write_u32(len)?;
        } else {
            let short = u16::try_from(len).map_err(|_| {
                MkKosError::validation(format!("{tag} {vr} value of {len} bytes is too long"))
            })?;
            self.write_u16(short)?;
        }
        Ok(())
    }

    fn write_tag(&mut self, tag: Tag) -> Result<()> {
        self.write_u16(tag.group())?;
        self.write_u16(tag.element())
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        if self.encoding.is_big_endian() {
            self.out.write_u16::<BigEndian>(value)?;
        } else {
            self.out.write_u16::<LittleEndian>(value)?;
        }
        Ok(())
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        if self.encoding.is_big_endian() {
            self.out.write_u32::<BigEndian>(value)?;
        } else {
            self.out.write_u32::<LittleEndian>(value)?;
        }
        Ok(())
    }
}

/// Elements written to the stream; stored group lengths are regenerated,
/// never copied.
fn body_elements(attrs: &Attributes) -> impl Iterator<Item = (Tag, &Element)> {
    attrs.iter().filter(|(tag, _)| !tag.is_group_length())
}

/// Items of a sequence element. A null SQ element is an empty sequence.
fn items_of(element: &Element) -> Option<&[Attributes]> {
    match &element.value {
        Value::Sequence(seq) => Some(seq.as_slice()),
        Value::Null if element.vr == Vr::SQ => Some(&[]),
        _ => None,
    }
}

/// Unpadded value bytes of a non-sequence element in the target byte order.
fn raw_value(encoding: Encoding, element: &Element) -> Cow<'_, [u8]> {
    match &element.value {
        Value::Str(s) => Cow::Borrowed(s.as_bytes()),
        Value::Bytes(bytes) if encoding.is_big_endian() && element.vr.swap_unit() > 1 => {
            Cow::Owned(element.vr.swapped(bytes))
        }
        Value::Bytes(bytes) => Cow::Borrowed(bytes),
        Value::DateTime(dt) => Cow::Owned(format_date_time(element.vr, dt).into_bytes()),
        Value::Null | Value::Sequence(_) => Cow::Borrowed(&[]),
    }
}

fn format_date_time(vr: Vr, dt: &NaiveDateTime) -> String {
    match vr {
        Vr::DA => dt.format("%Y%m%d").to_string(),
        Vr::TM => dt.format("%H%M%S%.3f").to_string(),
        _ => dt.format("%Y%m%d%H%M%S%.3f").to_string(),
    }
}

fn padded_len(len: usize) -> u32 {
    (len + (len & 1)) as u32
}
