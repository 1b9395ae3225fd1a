//! Ordered attribute tree.
//!
//! [`Attributes`] keeps its elements sorted by tag, so iteration order is
//! encoding order at every nesting level. Nested datasets live in a
//! [`Sequence`] owned by their parent element.

use std::collections::BTreeMap;
use std::slice;

use chrono::NaiveDateTime;

use crate::tag::Tag;
use crate::vr::Vr;

/// Payload of a data element.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Character string (multiple values separated by `\`).
    Str(String),
    /// Raw bytes: binary values (little endian) or text that is not UTF-8.
    Bytes(Vec<u8>),
    /// Wall-clock timestamp, rendered according to the element VR.
    DateTime(NaiveDateTime),
    /// Present with zero length.
    Null,
    /// Nested items.
    Sequence(Sequence),
}

/// A data element: VR plus value.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub vr: Vr,
    pub value: Value,
}

/// Ordered list of items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequence {
    items: Vec<Attributes>,
}

impl Sequence {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, item: Attributes) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Attributes> {
        self.items.get(index)
    }

    pub fn iter(&self) -> slice::Iter<'_, Attributes> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Attributes] {
        &self.items
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<'_, Attributes> {
        self.items.iter_mut()
    }

    /// Find the first item whose `tag` holds exactly `value`, appending a new
    /// item `{tag: value}` when none does.
    pub fn get_or_add_item(&mut self, tag: Tag, vr: Vr, value: &str) -> &mut Attributes {
        let found = self
            .items
            .iter()
            .position(|item| item.get_string(tag) == Some(value));

        let index = match found {
            Some(index) => index,
            None => {
                let mut item = Attributes::new();
                item.set_string(tag, vr, value);
                self.items.push(item);
                self.items.len() - 1
            }
        };
        &mut self.items[index]
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Attributes;
    type IntoIter = slice::Iter<'a, Attributes>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Attributes> for Sequence {
    fn from_iter<I: IntoIterator<Item = Attributes>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// A dataset or sequence item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    elements: BTreeMap<Tag, Element>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the listed tags from `other`, keeping VR and value. Tags missing
    /// from `other` are left out.
    pub fn from_selected(other: &Attributes, selection: &[Tag]) -> Self {
        let mut attrs = Self::new();
        for tag in selection {
            if let Some(element) = other.elements.get(tag) {
                attrs.elements.insert(*tag, element.clone());
            }
        }
        attrs
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.elements.contains_key(&tag)
    }

    pub fn get(&self, tag: Tag) -> Option<&Element> {
        self.elements.get(&tag)
    }

    /// String value of `tag`; `None` when absent, empty or not a string.
    pub fn get_string(&self, tag: Tag) -> Option<&str> {
        match self.elements.get(&tag).map(|e| &e.value) {
            Some(Value::Str(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn sequence(&self, tag: Tag) -> Option<&Sequence> {
        match self.elements.get(&tag).map(|e| &e.value) {
            Some(Value::Sequence(seq)) => Some(seq),
            _ => None,
        }
    }

    pub fn sequence_mut(&mut self, tag: Tag) -> Option<&mut Sequence> {
        match self.elements.get_mut(&tag).map(|e| &mut e.value) {
            Some(Value::Sequence(seq)) => Some(seq),
            _ => None,
        }
    }

    /// Elements in ascending tag order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, &Element)> {
        self.elements.iter().map(|(tag, element)| (*tag, element))
    }

    pub fn set(&mut self, tag: Tag, vr: Vr, value: Value) {
        self.elements.insert(tag, Element { vr, value });
    }

    pub fn set_string(&mut self, tag: Tag, vr: Vr, value: impl Into<String>) {
        self.set(tag, vr, Value::Str(value.into()));
    }

    pub fn set_bytes(&mut self, tag: Tag, vr: Vr, value: Vec<u8>) {
        self.set(tag, vr, Value::Bytes(value));
    }

    pub fn set_null(&mut self, tag: Tag, vr: Vr) {
        self.set(tag, vr, Value::Null);
    }

    pub fn set_date_time(&mut self, tag: Tag, vr: Vr, value: NaiveDateTime) {
        self.set(tag, vr, Value::DateTime(value));
    }

    pub fn remove(&mut self, tag: Tag) -> Option<Element> {
        self.elements.remove(&tag)
    }

    /// Create an empty sequence at `tag`, replacing whatever was there.
    pub fn new_sequence(&mut self, tag: Tag, capacity: usize) -> &mut Sequence {
        self.elements.remove(&tag);
        self.ensure_sequence(tag, capacity)
    }

    /// Return the sequence at `tag`, creating it if missing or if the element
    /// holds a non-sequence value.
    pub fn ensure_sequence(&mut self, tag: Tag, capacity: usize) -> &mut Sequence {
        let element = self.elements.entry(tag).or_insert(Element {
            vr: Vr::SQ,
            value: Value::Null,
        });
        if !matches!(element.value, Value::Sequence(_)) {
            element.vr = Vr::SQ;
            element.value = Value::Sequence(Sequence::with_capacity(capacity));
        }
        match &mut element.value {
            Value::Sequence(seq) => seq,
            _ => unreachable!("element at {tag} was just set to a sequence"),
        }
    }
}
