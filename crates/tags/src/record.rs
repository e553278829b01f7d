//! Generic kernel attribute record.

use serde::{Deserialize, Serialize};

/// The shape in which the kernel persists any attribute: an ordered string
/// list and an ordered integer list.
///
/// The first string is the attribute's type marker. The kernel stores and
/// returns records without interpreting the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub strings: Vec<String>,
    pub ints: Vec<i32>,
}

impl AttributeRecord {
    /// Create an empty record carrying `marker` as its type
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            strings: vec![marker.into()],
            ints: Vec::new(),
        }
    }

    /// Type marker, if the record has one
    pub fn character_type(&self) -> Option<&str> {
        self.strings.first().map(String::as_str)
    }
}
