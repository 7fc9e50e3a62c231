//! Buffer attachments and creation attributes.
//!
//! Attachments are key/value metadata carried by a buffer. Entries tagged
//! [`AttachmentMode::ShouldPropagate`] are inherited by copies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known attribute keys understood by the heap allocator.
pub mod keys {
    /// Byte alignment of every row (integer, power of two).
    pub const BYTES_PER_ROW_ALIGNMENT: &str = "BytesPerRowAlignment";
}

/// Value of a single attachment or creation attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttachmentValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl AttachmentValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for AttachmentValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for AttachmentValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for AttachmentValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for AttachmentValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for AttachmentValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Attribute dictionary passed to allocators and returned by attachment queries.
pub type AttributeMap = BTreeMap<String, AttachmentValue>;

/// Whether an attachment is inherited by copies of its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttachmentMode {
    ShouldPropagate,
    ShouldNotPropagate,
}

/// Attachment store of a single buffer.
#[derive(Debug, Clone, Default)]
pub struct Attachments {
    entries: BTreeMap<String, (AttachmentValue, AttachmentMode)>,
}

impl Attachments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace an attachment.
    pub fn set(&mut self, key: impl Into<String>, value: AttachmentValue, mode: AttachmentMode) {
        self.entries.insert(key.into(), (value, mode));
    }

    pub fn get(&self, key: &str) -> Option<(&AttachmentValue, AttachmentMode)> {
        self.entries.get(key).map(|(v, m)| (v, *m))
    }

    pub fn remove(&mut self, key: &str) -> Option<AttachmentValue> {
        self.entries.remove(key).map(|(v, _)| v)
    }

    pub fn remove_all(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All attachments with the given mode, as a plain attribute map.
    pub fn filtered(&self, mode: AttachmentMode) -> AttributeMap {
        self.entries
            .iter()
            .filter(|(_, (_, m))| *m == mode)
            .map(|(k, (v, _))| (k.clone(), v.clone()))
            .collect()
    }
}
