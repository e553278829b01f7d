//! Tag registry: names, handles and descriptors of preset and user tags.

use std::collections::HashMap;

use igeom_base::TagValueType;
use igeom_config::DEFAULT_NAME_TAG_LENGTH;
use tracing::debug;

use crate::error::TagError;
use crate::types::{PresetTag, TagDescriptor, TagHandle, TagRef};

/// Owner of every tag descriptor in a session.
///
/// User descriptors are append-only, so a handle stays valid for the
/// registry's lifetime. Deactivated descriptors keep their slot and are
/// reused when a tag with the same name is created again.
#[derive(Debug, Clone)]
pub struct TagRegistry {
    /// Preset table; slot 0 is the sentinel
    presets: Vec<TagDescriptor>,
    /// User table; handle `h` lives at index `h - 1`
    user: Vec<TagDescriptor>,
    names: HashMap<String, TagHandle>,
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::with_name_length(DEFAULT_NAME_TAG_LENGTH)
    }
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry whose `NAME` preset holds `name_length` bytes
    pub fn with_name_length(name_length: usize) -> Self {
        let mut presets = Vec::with_capacity(PresetTag::ALL.len() + 1);
        let mut sentinel = TagDescriptor::new("", 0, TagValueType::Bytes);
        sentinel.active = false;
        presets.push(sentinel);

        let mut names = HashMap::new();
        for preset in PresetTag::ALL {
            let byte_length = match preset {
                PresetTag::Name => name_length,
                PresetTag::MeshSize => std::mem::size_of::<f64>(),
                _ => std::mem::size_of::<i32>(),
            };
            presets.push(TagDescriptor::new(
                preset.tag_name(),
                byte_length,
                preset.value_type(),
            ));
            names.insert(preset.tag_name().to_string(), TagHandle::from(preset));
        }

        Self {
            presets,
            user: Vec::new(),
            names,
        }
    }

    /// Register a user tag.
    ///
    /// Fails with [`TagError::TagAlreadyExists`] while a tag of that name is
    /// active. A deactivated tag of the same name gives its handle back,
    /// with the descriptor overwritten.
    pub fn create_tag(
        &mut self,
        name: &str,
        byte_length: usize,
        value_type: TagValueType,
        default_value: Option<&[u8]>,
    ) -> Result<TagHandle, TagError> {
        if name.is_empty() {
            return Err(TagError::InvalidArgument("tag name is empty".to_string()));
        }
        if byte_length == 0 {
            return Err(TagError::InvalidArgument(format!(
                "tag {:?} must have a non-zero size",
                name
            )));
        }
        if i32::try_from(byte_length).is_err() {
            return Err(TagError::InvalidArgument(format!(
                "tag {:?} size {} exceeds {} bytes",
                name,
                byte_length,
                i32::MAX
            )));
        }
        let default_value = match default_value {
            Some(value) if value.len() != byte_length => {
                return Err(TagError::InvalidArgument(format!(
                    "default for tag {:?} has {} bytes, expected {}",
                    name,
                    value.len(),
                    byte_length
                )));
            }
            Some(value) => {
                let mut buffer = Vec::new();
                buffer.try_reserve_exact(byte_length)?;
                buffer.extend_from_slice(value);
                Some(buffer)
            }
            None => None,
        };

        let mut descriptor = TagDescriptor::new(name, byte_length, value_type);
        if let Some(value) = default_value {
            descriptor = descriptor.with_default(value);
        }

        if let Some(&handle) = self.names.get(name) {
            let existing = self.descriptor_mut(handle)?;
            if existing.active {
                return Err(TagError::TagAlreadyExists(name.to_string()));
            }
            debug!(
                "Reusing tag handle {} for {:?} ({} -> {} bytes)",
                handle.raw(),
                name,
                existing.byte_length,
                byte_length
            );
            *existing = descriptor;
            return Ok(handle);
        }

        self.user.push(descriptor);
        let handle = TagHandle::from_user_index(self.user.len() - 1);
        self.names.insert(name.to_string(), handle);
        debug!("Created tag {:?} with handle {} ({} bytes)", name, handle.raw(), byte_length);
        Ok(handle)
    }

    /// Handle of the active tag called `name`
    pub fn handle_for(&self, name: &str) -> Result<TagHandle, TagError> {
        self.names
            .get(name)
            .copied()
            .filter(|h| self.descriptor(*h).is_ok_and(|d| d.active))
            .ok_or_else(|| TagError::TagNotFound(name.to_string()))
    }

    /// Decode a raw handle into the namespace it addresses
    pub fn resolve(&self, handle: TagHandle) -> Result<TagRef, TagError> {
        let raw = handle.raw();
        if raw > 0 {
            let index = (raw - 1) as usize;
            if index < self.user.len() {
                return Ok(TagRef::User(index));
            }
        } else if let Some(preset) = usize::try_from(raw.unsigned_abs())
            .ok()
            .and_then(PresetTag::from_slot)
        {
            return Ok(TagRef::Preset(preset));
        }
        Err(TagError::InvalidTagHandle(handle))
    }

    /// Descriptor of any issued handle, active or not
    pub fn descriptor(&self, handle: TagHandle) -> Result<&TagDescriptor, TagError> {
        match self.resolve(handle)? {
            TagRef::Preset(preset) => Ok(&self.presets[preset.slot()]),
            TagRef::User(index) => Ok(&self.user[index]),
        }
    }

    fn descriptor_mut(&mut self, handle: TagHandle) -> Result<&mut TagDescriptor, TagError> {
        match self.resolve(handle)? {
            TagRef::Preset(preset) => Ok(&mut self.presets[preset.slot()]),
            TagRef::User(index) => Ok(&mut self.user[index]),
        }
    }

    /// Descriptor of an active tag; deactivated tags read as not found
    pub fn active_descriptor(&self, handle: TagHandle) -> Result<&TagDescriptor, TagError> {
        let descriptor = self.descriptor(handle)?;
        if descriptor.active {
            Ok(descriptor)
        } else {
            Err(TagError::TagNotFound(descriptor.name.clone()))
        }
    }

    /// Size in bytes of one value of `handle`
    pub fn size_of(&self, handle: TagHandle) -> Result<usize, TagError> {
        Ok(self.descriptor(handle)?.byte_length)
    }

    pub fn name_of(&self, handle: TagHandle) -> Result<&str, TagError> {
        Ok(self.descriptor(handle)?.name.as_str())
    }

    pub fn type_of(&self, handle: TagHandle) -> Result<TagValueType, TagError> {
        Ok(self.descriptor(handle)?.value_type)
    }

    /// Mark a user tag inactive so its name and slot can be reused
    pub fn deactivate(&mut self, handle: TagHandle) -> Result<(), TagError> {
        if let TagRef::Preset(preset) = self.resolve(handle)? {
            return Err(TagError::NotSupported(format!(
                "preset tag {} cannot be destroyed",
                preset.tag_name()
            )));
        }
        let descriptor = self.descriptor_mut(handle)?;
        if !descriptor.active {
            return Err(TagError::TagNotFound(descriptor.name.clone()));
        }
        descriptor.active = false;
        descriptor.default_value = None;
        debug!("Deactivated tag {:?} (handle {})", descriptor.name, handle.raw());
        Ok(())
    }

    /// Number of user slots ever issued, active or not
    pub fn user_tag_count(&self) -> usize {
        self.user.len()
    }

    /// Handles of all active user tags, ascending
    pub fn active_handles(&self) -> Vec<TagHandle> {
        self.user
            .iter()
            .enumerate()
            .filter(|(_, d)| d.active)
            .map(|(i, _)| TagHandle::from_user_index(i))
            .collect()
    }
}
