//! Part 10 file and bare dataset reader.
//!
//! Parsing stops at Pixel Data: the aggregator only needs identifiers,
//! demographics and the presence of a few attributes.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use mkkos_shared::{MkKosError, Result};
use tracing::trace;

use crate::UNDEFINED_LENGTH;
use crate::attributes::{Attributes, Sequence, Value};
use crate::tag::{Tag, tags};
use crate::transfer_syntax::{Encoding, TransferSyntax};
use crate::vr::Vr;

/// Preamble plus `DICM` magic.
const HEAD_LEN: usize = 132;

/// Read the dataset of a DICOM file, with or without preamble and file
/// meta information.
pub fn read_file(path: &Path) -> Result<Attributes> {
    let file = File::open(path).map_err(|e| MkKosError::io(path, e))?;
    read_dataset(BufReader::new(file))
}

/// Read a dataset from a byte stream, with or without preamble and file
/// meta information.
pub fn read_dataset<R: BufRead>(mut src: R) -> Result<Attributes> {
    let mut head = Vec::with_capacity(HEAD_LEN);
    (&mut src).take(HEAD_LEN as u64).read_to_end(&mut head)?;

    if head.len() == HEAD_LEN && &head[128..] == b"DICM" {
        return read_stream(src, true);
    }

    let has_meta = stream_start(&head)? == 0x0002;
    read_stream(Cursor::new(head).chain(src), has_meta)
}

/// Group number of the first element of a bare stream, rejecting data
/// that does not look like a dataset.
fn stream_start(head: &[u8]) -> Result<u16> {
    if head.len() < 8 {
        return Err(MkKosError::parse("not a DICOM stream: too short"));
    }
    let group = u16::from_le_bytes([head[0], head[1]]);
    if group != 0x0002 && group != 0x0008 {
        return Err(MkKosError::parse(format!(
            "not a DICOM stream: unexpected first group {group:04X}"
        )));
    }
    Ok(group)
}

fn read_stream<R: BufRead>(src: R, has_meta: bool) -> Result<Attributes> {
    let mut parser = Parser::new(src, Encoding::ExplicitVrLittleEndian);
    if has_meta {
        let fmi = parser.read_file_meta_information()?;
        let ts_uid = fmi.get_string(tags::TRANSFER_SYNTAX_UID).ok_or_else(|| {
            MkKosError::parse("file meta information lacks Transfer Syntax UID")
        })?;
        parser.encoding = TransferSyntax::from_uid(ts_uid)?.encoding();
    } else {
        parser.encoding = parser.guess_encoding()?;
    }
    trace!(encoding = ?parser.encoding, "reading dataset");
    parser.read_dataset(Bound::Eof, Some(tags::PIXEL_DATA))
}

/// Where a dataset ends.
#[derive(Debug, Clone, Copy)]
enum Bound {
    Eof,
    Length(u64),
    Delimited,
    /// Up to the first element of another group.
    Group(u16),
}

struct Parser<R> {
    src: R,
    pos: u64,
    encoding: Encoding,
    /// Raw tag bytes read past the end of a [`Bound::Group`] dataset.
    pending: Option<[u8; 4]>,
}

impl<R: BufRead> Parser<R> {
    fn new(src: R, encoding: Encoding) -> Self {
        Self {
            src,
            pos: 0,
            encoding,
            pending: None,
        }
    }

    /// Explicit VR when the first element header carries a known VR code.
    fn guess_encoding(&mut self) -> Result<Encoding> {
        let buf = self.src.fill_buf()?;
        if buf.len() >= 6 && Vr::from_code([buf[4], buf[5]]).is_some() {
            Ok(Encoding::ExplicitVrLittleEndian)
        } else {
            Ok(Encoding::ImplicitVrLittleEndian)
        }
    }

    fn read_file_meta_information(&mut self) -> Result<Attributes> {
        let tag = self.read_tag()?;
        if tag != tags::FILE_META_INFORMATION_GROUP_LENGTH {
            // Without a group length the meta block ends with group 0002.
            trace!(%tag, "file meta information lacks group length");
            self.unread_tag(tag);
            return self.read_dataset(Bound::Group(0x0002), None);
        }
        let (_, len) = self.read_header(tag)?;
        if len != 4 {
            return Err(MkKosError::parse("malformed file meta information group length"));
        }
        let group_len = self.read_u32()?;
        let end = self.pos + u64::from(group_len);
        self.read_dataset(Bound::Length(end), None)
    }

    fn read_dataset(&mut self, bound: Bound, stop_at: Option<Tag>) -> Result<Attributes> {
        let mut attrs = Attributes::new();
        loop {
            match bound {
                Bound::Length(end) if self.pos >= end => break,
                Bound::Eof if self.pending.is_none() && self.src.fill_buf()?.is_empty() => break,
                _ => {}
            }

            let tag = self.read_tag()?;
            if let Bound::Group(group) = bound {
                if tag.group() != group {
                    self.unread_tag(tag);
                    break;
                }
            }
            if tag == tags::ITEM_DELIMITATION_ITEM {
                self.read_u32()?;
                if matches!(bound, Bound::Delimited) {
                    break;
                }
                return Err(MkKosError::parse(format!(
                    "unexpected item delimiter at offset {}",
                    self.pos
                )));
            }
            if stop_at.is_some_and(|stop| tag >= stop) {
                break;
            }

            let (vr, len) = self.read_header(tag)?;
            let (vr, value) = self.read_value(tag, vr, len)?;
            attrs.set(tag, vr, value);
        }
        Ok(attrs)
    }

    fn read_header(&mut self, tag: Tag) -> Result<(Vr, u32)> {
        if !self.encoding.is_explicit_vr() {
            let len = self.read_u32()?;
            return Ok((tag.dictionary_vr(), len));
        }

        let mut code = [0u8; 2];
        self.read_exact(&mut code)?;
        let vr = Vr::from_code(code);
        match vr {
            Some(vr) if !vr.has_long_header() => {
                let len = self.read_u16()?;
                Ok((vr, u32::from(len)))
            }
            _ => {
                self.read_u16()?;
                let len = self.read_u32()?;
                Ok((vr.unwrap_or(Vr::UN), len))
            }
        }
    }

    fn read_value(&mut self, tag: Tag, vr: Vr, len: u32) -> Result<(Vr, Value)> {
        if vr == Vr::SQ {
            return Ok((Vr::SQ, Value::Sequence(self.read_sequence(len)?)));
        }
        if len == UNDEFINED_LENGTH {
            if vr != Vr::UN {
                return Err(MkKosError::parse(format!(
                    "{tag} {vr} has undefined length"
                )));
            }
            // UN of undefined length is a sequence in Implicit VR Little Endian.
            let outer = self.encoding;
            self.encoding = Encoding::ImplicitVrLittleEndian;
            let seq = self.read_sequence(len);
            self.encoding = outer;
            return Ok((Vr::SQ, Value::Sequence(seq?)));
        }

        let bytes = self.read_bytes(len)?;
        Ok((vr, self.decode(vr, bytes)))
    }

    fn read_sequence(&mut self, len: u32) -> Result<Sequence> {
        let end = (len != UNDEFINED_LENGTH).then(|| self.pos + u64::from(len));
        let mut seq = Sequence::default();
        loop {
            if end.is_some_and(|end| self.pos >= end) {
                break;
            }

            let tag = self.read_tag()?;
            let item_len = self.read_u32()?;
            match tag {
                tags::SEQUENCE_DELIMITATION_ITEM => break,
                tags::ITEM => {
                    let bound = if item_len == UNDEFINED_LENGTH {
                        Bound::Delimited
                    } else {
                        Bound::Length(self.pos + u64::from(item_len))
                    };
                    seq.push(self.read_dataset(bound, None)?);
                }
                other => {
                    return Err(MkKosError::parse(format!(
                        "expected item, found {other} at offset {}",
                        self.pos
                    )));
                }
            }
        }
        Ok(seq)
    }

    fn decode(&self, vr: Vr, bytes: Vec<u8>) -> Value {
        if bytes.is_empty() {
            return Value::Null;
        }
        if vr.is_text() {
            return match String::from_utf8(bytes) {
                Ok(mut s) => {
                    let trimmed = s.trim_end_matches(['\0', ' ']).len();
                    s.truncate(trimmed);
                    Value::Str(s)
                }
                Err(e) => Value::Bytes(e.into_bytes()),
            };
        }
        if self.encoding.is_big_endian() && vr.swap_unit() > 1 {
            return Value::Bytes(vr.swapped(&bytes));
        }
        Value::Bytes(bytes)
    }

    fn read_tag(&mut self) -> Result<Tag> {
        let mut raw = [0u8; 4];
        match self.pending.take() {
            Some(pending) => {
                raw = pending;
                self.pos += 4;
            }
            None => self.read_exact(&mut raw)?,
        }
        let (group, element) = if self.encoding.is_big_endian() {
            (BigEndian::read_u16(&raw[..2]), BigEndian::read_u16(&raw[2..]))
        } else {
            (LittleEndian::read_u16(&raw[..2]), LittleEndian::read_u16(&raw[2..]))
        };
        Ok(Tag::new(group, element))
    }

    /// Push `tag` back as the raw bytes it was read from, to be decoded
    /// again under the then current encoding.
    fn unread_tag(&mut self, tag: Tag) {
        let mut raw = [0u8; 4];
        if self.encoding.is_big_endian() {
            BigEndian::write_u16(&mut raw[..2], tag.group());
            BigEndian::write_u16(&mut raw[2..], tag.element());
        } else {
            LittleEndian::write_u16(&mut raw[..2], tag.group());
            LittleEndian::write_u16(&mut raw[2..], tag.element());
        }
        self.pending = Some(raw);
        self.pos -= 4;
    }

    fn read_u16(&mut self) -> Result<u16> {
        let value = if self.encoding.is_big_endian() {
            self.src.read_u16::<BigEndian>()
        } else {
            self.src.read_u16::<LittleEndian>()
        }
        .map_err(truncated)?;
        self.pos += 2;
        Ok(value)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let value = if self.encoding.is_big_endian() {
            self.src.read_u32::<BigEndian>()
        } else {
            self.src.read_u32::<LittleEndian>()
        }
        .map_err(truncated)?;
        self.pos += 4;
        Ok(value)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.src.read_exact(buf).map_err(truncated)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    fn read_bytes(&mut self, len: u32) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        (&mut self.src).take(u64::from(len)).read_to_end(&mut buf)?;
        if buf.len() != len as usize {
            return Err(MkKosError::parse(format!(
                "value of {len} bytes truncated at offset {}",
                self.pos + buf.len() as u64
            )));
        }
        self.pos += u64::from(len);
        Ok(buf)
    }
}

fn truncated(e: io::Error) -> MkKosError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        MkKosError::parse("unexpected end of data")
    } else {
        MkKosError::Stream(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uid;
    use crate::writer::{DicomWriter, create_file_meta_information};
    use mkkos_shared::EncodingOptions;

    fn instance() -> Attributes {
        let mut attrs = Attributes::new();
        attrs.set_string(tags::SOP_CLASS_UID, Vr::UI, "1.2.840.10008.5.1.4.1.1.7");
        attrs.set_string(tags::SOP_INSTANCE_UID, Vr::UI, "1.2.3.4.5");
        attrs.set_string(tags::PATIENT_NAME, Vr::PN, "Doe^Jane");
        attrs.set_string(tags::STUDY_INSTANCE_UID, Vr::UI, "1.2.3");
        attrs.set_bytes(tags::ROWS, Vr::US, vec![0x00, 0x02]);
        let issuer = attrs.new_sequence(tags::ISSUER_OF_ACCESSION_NUMBER_SEQUENCE, 1);
        let mut item = Attributes::new();
        item.set_string(tags::CODE_VALUE, Vr::SH, "HOSP");
        issuer.push(item);
        attrs
    }

    fn encode(attrs: &Attributes, ts_uid: &str, with_meta: bool, options: EncodingOptions) -> Vec<u8> {
        let ts = TransferSyntax::from_uid(ts_uid).unwrap();
        let mut writer = DicomWriter::new(Vec::new(), &ts, options);
        let fmi = with_meta.then(|| create_file_meta_information(attrs, ts_uid).unwrap());
        writer.write_dataset(fmi.as_ref(), attrs).unwrap();
        writer.finish().unwrap()
    }

    #[test]
    fn reads_part10_file_in_each_uncompressed_syntax() {
        let original = instance();
        for ts in [
            uid::EXPLICIT_VR_LITTLE_ENDIAN,
            uid::IMPLICIT_VR_LITTLE_ENDIAN,
            uid::EXPLICIT_VR_BIG_ENDIAN,
        ] {
            let bytes = encode(&original, ts, true, EncodingOptions::default());
            let parsed = read_dataset(Cursor::new(bytes)).unwrap();
            assert_eq!(parsed, original, "transfer syntax {ts}");
        }
    }

    #[test]
    fn reads_meta_block_without_group_length() {
        let original = instance();
        for ts in [uid::EXPLICIT_VR_LITTLE_ENDIAN, uid::EXPLICIT_VR_BIG_ENDIAN] {
            let mut bytes = encode(&original, ts, true, EncodingOptions::default());
            // Drop the (0002,0000) UL element right after `DICM`.
            assert_eq!(&bytes[132..136], &[0x02, 0x00, 0x00, 0x00]);
            bytes.drain(132..144);

            let parsed = read_dataset(Cursor::new(bytes)).unwrap();
            assert_eq!(parsed, original, "transfer syntax {ts}");
        }
    }

    #[test]
    fn reads_bare_dataset_with_explicit_lengths() {
        let original = instance();
        for ts in [uid::EXPLICIT_VR_LITTLE_ENDIAN, uid::IMPLICIT_VR_LITTLE_ENDIAN] {
            let bytes = encode(&original, ts, false, EncodingOptions::explicit_lengths());
            let parsed = read_dataset(Cursor::new(bytes)).unwrap();
            assert_eq!(parsed, original, "transfer syntax {ts}");
        }
    }

    #[test]
    fn stops_at_pixel_data() {
        let mut attrs = instance();
        attrs.set_bytes(tags::PIXEL_DATA, Vr::OW, vec![0u8; 16]);
        attrs.set_string(Tag::new(0x7FE1, 0x0010), Vr::LO, "after pixels");
        let bytes = encode(&attrs, uid::EXPLICIT_VR_LITTLE_ENDIAN, true, EncodingOptions::default());

        let parsed = read_dataset(Cursor::new(bytes)).unwrap();
        assert!(!parsed.contains(tags::PIXEL_DATA));
        assert!(!parsed.contains(Tag::new(0x7FE1, 0x0010)));
        assert_eq!(parsed.get_string(tags::PATIENT_NAME), Some("Doe^Jane"));
    }

    #[test]
    fn non_utf8_text_is_kept_as_bytes() {
        let mut attrs = Attributes::new();
        attrs.set_string(tags::SPECIFIC_CHARACTER_SET, Vr::CS, "ISO_IR 100");
        attrs.set_bytes(tags::PATIENT_NAME, Vr::PN, b"M\xfcller^Hans".to_vec());
        let bytes = encode(&attrs, uid::EXPLICIT_VR_LITTLE_ENDIAN, false, EncodingOptions::default());

        let parsed = read_dataset(Cursor::new(bytes)).unwrap();
        let element = parsed.get(tags::PATIENT_NAME).unwrap();
        assert_eq!(element.vr, Vr::PN);
        assert_eq!(element.value, Value::Bytes(b"M\xfcller^Hans ".to_vec()));
        assert_eq!(parsed.get_string(tags::PATIENT_NAME), None);
    }

    #[test]
    fn undefined_length_un_is_read_as_sequence() {
        let mut bytes = vec![0x09, 0x00, 0x10, 0x10, b'U', b'N', 0, 0, 0xFF, 0xFF, 0xFF, 0xFF];
        bytes.extend([0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF]);
        bytes.extend([0x08, 0x00, 0x00, 0x01, 4, 0, 0, 0]);
        bytes.extend(b"1234");
        bytes.extend([0xFE, 0xFF, 0x0D, 0xE0, 0, 0, 0, 0]);
        bytes.extend([0xFE, 0xFF, 0xDD, 0xE0, 0, 0, 0, 0]);
        let mut head = vec![0x08, 0x00, 0x60, 0x00, b'C', b'S', 2, 0, b'O', b'T'];
        head.extend(bytes);

        let parsed = read_dataset(Cursor::new(head)).unwrap();
        let seq = parsed.sequence(Tag::new(0x0009, 0x1010)).unwrap();
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.get(0).unwrap().get_string(tags::CODE_VALUE), Some("1234"));
    }

    #[test]
    fn rejects_non_dicom_and_truncated_input() {
        let err = read_dataset(Cursor::new(b"just some text file".to_vec())).unwrap_err();
        assert!(err.to_string().contains("not a DICOM stream"));

        let mut bytes = encode(&instance(), uid::EXPLICIT_VR_LITTLE_ENDIAN, true, EncodingOptions::default());
        bytes.truncate(bytes.len() - 3);
        let err = read_dataset(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, MkKosError::Parse { .. }));
    }

    #[test]
    fn rejects_deflated_input() {
        let mut fmi = Attributes::new();
        fmi.set_string(tags::TRANSFER_SYNTAX_UID, Vr::UI, uid::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN);
        let mut writer = DicomWriter::new(
            Vec::new(),
            &TransferSyntax::explicit_vr_little_endian(),
            EncodingOptions::default(),
        );
        // The writer cannot produce deflated output either.
        assert!(writer.write_dataset(Some(&fmi), &instance()).is_err());

        let mut bytes = vec![0u8; 128];
        bytes.extend(b"DICM");
        let uid_bytes = b"1.2.840.10008.1.2.1.99";
        bytes.extend([0x02, 0x00, 0x00, 0x00, b'U', b'L', 4, 0]);
        bytes.extend(((8 + uid_bytes.len()) as u32).to_le_bytes());
        bytes.extend([0x02, 0x00, 0x10, 0x00, b'U', b'I', uid_bytes.len() as u8, 0]);
        bytes.extend(uid_bytes);

        let err = read_dataset(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, MkKosError::Unsupported { .. }));
    }
}
