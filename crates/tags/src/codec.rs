//! Conversion between an [`EntityTagStore`] and the kernel's generic
//! [`AttributeRecord`].
//!
//! ## Record layout
//!
//! ```text
//! strings: [marker, name_1, name_2, ..., name_n]
//! ints:    [n, len_1, words_1..., len_2, words_2..., ..., len_n, words_n...]
//! ```
//!
//! Each payload of `len_i` bytes is packed into `ceil(len_i / 4)` native-endian
//! 32-bit words. The unused bytes of the final word are zero.

use std::collections::HashSet;

use igeom_base::TagValueType;
use tracing::{info, trace};

use crate::error::TagError;
use crate::record::AttributeRecord;
use crate::registry::TagRegistry;
use crate::store::EntityTagStore;

const WORD_SIZE: usize = std::mem::size_of::<i32>();

/// Number of 32-bit words holding `byte_length` bytes
pub fn word_count(byte_length: usize) -> usize {
    byte_length.div_ceil(WORD_SIZE)
}

/// A tag entry read back from a record, not yet bound to a handle
#[derive(Debug)]
struct DecodedTag {
    name: String,
    payload: Vec<u8>,
}

/// Encoder/decoder for tag attribute records carrying a given type marker
#[derive(Debug, Clone)]
pub struct AttributeCodec {
    marker: String,
}

impl AttributeCodec {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Whether `record` was produced by this codec
    pub fn recognizes(&self, record: &AttributeRecord) -> bool {
        record.character_type() == Some(self.marker.as_str())
    }

    /// Serialize every tag in `store`, in ascending handle order
    pub fn encode(
        &self,
        store: &EntityTagStore,
        registry: &TagRegistry,
    ) -> Result<AttributeRecord, TagError> {
        let mut record = AttributeRecord::new(self.marker.as_str());
        record.ints.push(to_word(store.len())?);

        for (handle, payload) in store.get_all() {
            let name = registry.name_of(handle)?;
            record.strings.push(name.to_string());
            record.ints.push(to_word(payload.len())?);

            let start = record.ints.len();
            record.ints.resize(start + word_count(payload.len()), 0);
            let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut record.ints[start..]);
            bytes[..payload.len()].copy_from_slice(payload);
        }
        Ok(record)
    }

    /// Populate `store` from `record`.
    ///
    /// Returns `Ok(false)` without touching anything when the record carries
    /// another attribute type. Tag names unknown to `registry` are registered
    /// as [`TagValueType::Bytes`] tags, so loading a model can add user tags.
    /// On error neither the store nor the registry is modified.
    pub fn decode(
        &self,
        record: &AttributeRecord,
        registry: &mut TagRegistry,
        store: &mut EntityTagStore,
    ) -> Result<bool, TagError> {
        if !self.recognizes(record) {
            trace!(
                "Skipping attribute record of type {:?}",
                record.character_type()
            );
            return Ok(false);
        }

        let decoded = self.parse(record)?;

        // Reject anything the registration pass could fail on before changing anything
        let mut seen = HashSet::with_capacity(decoded.len());
        for tag in &decoded {
            if tag.name.is_empty() {
                return Err(malformed("empty tag name"));
            }
            if !seen.insert(tag.name.as_str()) {
                return Err(malformed(&format!("tag {:?} appears twice", tag.name)));
            }
            if let Ok(handle) = registry.handle_for(&tag.name) {
                if handle.is_preset() {
                    return Err(malformed(&format!("preset tag {:?} in record", tag.name)));
                }
                let expected = registry.size_of(handle)?;
                if expected != tag.payload.len() {
                    return Err(TagError::InvalidArgument(format!(
                        "persisted tag {:?} has {} bytes, registered size is {}",
                        tag.name,
                        tag.payload.len(),
                        expected
                    )));
                }
            }
        }

        for tag in decoded {
            let handle = match registry.handle_for(&tag.name) {
                Ok(handle) => handle,
                Err(TagError::TagNotFound(_)) => {
                    info!(
                        "Registering tag {:?} ({} bytes) found in persisted attribute",
                        tag.name,
                        tag.payload.len()
                    );
                    registry.create_tag(&tag.name, tag.payload.len(), TagValueType::Bytes, None)?
                }
                Err(err) => return Err(err),
            };
            store.set_shallow(handle, tag.payload);
        }
        Ok(true)
    }

    fn parse(&self, record: &AttributeRecord) -> Result<Vec<DecodedTag>, TagError> {
        let count = record
            .ints
            .first()
            .copied()
            .ok_or_else(|| malformed("missing tag count"))
            .and_then(from_word)?;

        if record.strings.len() != count + 1 {
            return Err(malformed(&format!(
                "{} tag names for {} tags",
                record.strings.len() - 1,
                count
            )));
        }

        let mut words = record.ints[1..].iter();
        let mut decoded = Vec::with_capacity(count);
        for name in &record.strings[1..] {
            let byte_length = words
                .next()
                .ok_or_else(|| malformed("truncated tag length"))
                .and_then(|w| from_word(*w))?;
            if byte_length == 0 {
                return Err(malformed(&format!("tag {:?} has zero length", name)));
            }

            let word_total = word_count(byte_length);
            let slice = words.as_slice();
            if slice.len() < word_total {
                return Err(malformed(&format!("truncated payload for tag {:?}", name)));
            }
            let bytes: &[u8] = bytemuck::cast_slice(&slice[..word_total]);

            let mut payload = Vec::new();
            payload.try_reserve_exact(byte_length)?;
            payload.extend_from_slice(&bytes[..byte_length]);
            decoded.push(DecodedTag {
                name: name.clone(),
                payload,
            });

            if word_total > 0 {
                words.nth(word_total - 1);
            }
        }

        if words.next().is_some() {
            return Err(malformed("trailing data after last tag"));
        }
        Ok(decoded)
    }
}

fn malformed(detail: &str) -> TagError {
    TagError::InvalidArgument(format!("malformed tag attribute: {}", detail))
}

fn to_word(value: usize) -> Result<i32, TagError> {
    i32::try_from(value)
        .map_err(|_| TagError::InvalidArgument(format!("{} does not fit a record word", value)))
}

fn from_word(word: i32) -> Result<usize, TagError> {
    usize::try_from(word).map_err(|_| malformed(&format!("negative length {}", word)))
}
