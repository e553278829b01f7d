//! Per-entity tag value storage.

use std::collections::BTreeMap;

use crate::error::TagError;
use crate::types::TagHandle;

/// Tag values set on one entity
///
/// Each handle owns exactly one buffer whose length is the tag's declared
/// byte length. Iteration is in ascending handle order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityTagStore {
    values: BTreeMap<TagHandle, Vec<u8>>,
}

impl EntityTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `data` into the buffer for `handle`, allocating it on first use.
    ///
    /// `byte_length` is the registry's declared size for `handle`.
    pub fn set(
        &mut self,
        handle: TagHandle,
        data: &[u8],
        byte_length: usize,
    ) -> Result<(), TagError> {
        if data.len() != byte_length {
            return Err(TagError::InvalidArgument(format!(
                "value for tag {} has {} bytes, expected {}",
                handle.raw(),
                data.len(),
                byte_length
            )));
        }

        match self.values.get_mut(&handle) {
            Some(buffer) if buffer.len() == byte_length => buffer.copy_from_slice(data),
            _ => {
                let mut buffer = Vec::new();
                buffer.try_reserve_exact(byte_length)?;
                buffer.extend_from_slice(data);
                self.values.insert(handle, buffer);
            }
        }
        Ok(())
    }

    /// Move an already built buffer into the store, dropping any previous one
    pub fn set_shallow(&mut self, handle: TagHandle, buffer: Vec<u8>) {
        self.values.insert(handle, buffer);
    }

    pub fn get(&self, handle: TagHandle) -> Option<&[u8]> {
        self.values.get(&handle).map(Vec::as_slice)
    }

    pub fn contains(&self, handle: TagHandle) -> bool {
        self.values.contains_key(&handle)
    }

    /// Remove the value for `handle`; returns whether one was present
    pub fn remove(&mut self, handle: TagHandle) -> bool {
        self.values.remove(&handle).is_some()
    }

    /// All `(handle, value)` pairs in ascending handle order
    pub fn get_all(&self) -> impl Iterator<Item = (TagHandle, &[u8])> {
        self.values.iter().map(|(h, v)| (*h, v.as_slice()))
    }

    pub fn handles(&self) -> impl Iterator<Item = TagHandle> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_read_back() {
        let mut store = EntityTagStore::new();
        store.set(TagHandle(1), &[1, 2, 3, 4, 5, 6, 7, 8], 8).unwrap();

        assert_eq!(store.get(TagHandle(1)), Some(&[1, 2, 3, 4, 5, 6, 7, 8][..]));
        assert_eq!(store.len(), 1);

        // Overwrite in place
        store.set(TagHandle(1), &[9; 8], 8).unwrap();
        assert_eq!(store.get(TagHandle(1)), Some(&[9u8; 8][..]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_set_rejects_wrong_length() {
        let mut store = EntityTagStore::new();
        let err = store.set(TagHandle(2), &[1, 2, 3], 4).unwrap_err();
        assert!(matches!(err, TagError::InvalidArgument(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_shallow_replaces() {
        let mut store = EntityTagStore::new();
        store.set(TagHandle(3), &[0; 4], 4).unwrap();
        store.set_shallow(TagHandle(3), vec![1, 1, 1, 1, 1, 1, 1]);
        assert_eq!(store.get(TagHandle(3)), Some(&[1u8; 7][..]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_all_ascending() {
        let mut store = EntityTagStore::new();
        store.set(TagHandle(5), &[5], 1).unwrap();
        store.set(TagHandle(1), &[1], 1).unwrap();
        store.set(TagHandle(3), &[3], 1).unwrap();

        let handles: Vec<i64> = store.get_all().map(|(h, _)| h.raw()).collect();
        assert_eq!(handles, vec![1, 3, 5]);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut store = EntityTagStore::new();
        store.set(TagHandle(1), &[1], 1).unwrap();
        store.set(TagHandle(2), &[2], 1).unwrap();

        assert!(store.remove(TagHandle(1)));
        assert!(!store.remove(TagHandle(1)));
        assert!(store.contains(TagHandle(2)));

        store.clear();
        assert!(store.is_empty());
    }
}
