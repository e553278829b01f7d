//! Tag coordinator: the entry point bindings call into.
//!
//! Ties the [`TagRegistry`] to the per-entity [`EntityTagStore`]s and to the
//! kernel's native fields. Preset tags are served from the kernel, user tags
//! from the stores. Tag values set without an entity land on the interface
//! group, which is created on first use.

use std::collections::HashMap;

use igeom_base::TagValueType;
use igeom_config::SessionConfig;
use tracing::{debug, info, warn};

use crate::codec::AttributeCodec;
use crate::error::TagError;
use crate::kernel::GeometryKernel;
use crate::record::AttributeRecord;
use crate::registry::TagRegistry;
use crate::store::EntityTagStore;
use crate::types::{EntityId, PresetTag, TagDescriptor, TagHandle, TagRef};

/// Tag state of one geometry session
#[derive(Debug)]
pub struct TagCoordinator<K: GeometryKernel> {
    config: SessionConfig,
    registry: TagRegistry,
    codec: AttributeCodec,
    stores: HashMap<EntityId, EntityTagStore>,
    interface_group: Option<EntityId>,
    kernel: K,
}

impl<K: GeometryKernel> TagCoordinator<K> {
    pub fn new(kernel: K) -> Self {
        Self::with_config(kernel, SessionConfig::default())
    }

    pub fn with_config(kernel: K, config: SessionConfig) -> Self {
        debug!(
            "Tag session for engine {} (marker {:?})",
            config.engine.as_deref().unwrap_or("default"),
            config.attribute_marker
        );
        Self {
            registry: TagRegistry::with_name_length(config.name_tag_length),
            codec: AttributeCodec::new(config.attribute_marker.as_str()),
            stores: HashMap::new(),
            interface_group: None,
            kernel,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.kernel
    }

    pub fn into_kernel(self) -> K {
        self.kernel
    }

    /// Tag values held for `entity`, if any were ever set
    pub fn entity_store(&self, entity: EntityId) -> Option<&EntityTagStore> {
        self.stores.get(&entity)
    }

    // ------------------------------------------------------------------
    // Tag definitions
    // ------------------------------------------------------------------

    pub fn create_tag(
        &mut self,
        name: &str,
        byte_length: usize,
        value_type: TagValueType,
        default_value: Option<&[u8]>,
    ) -> Result<TagHandle, TagError> {
        self.registry
            .create_tag(name, byte_length, value_type, default_value)
    }

    pub fn tag_handle(&self, name: &str) -> Result<TagHandle, TagError> {
        self.registry.handle_for(name)
    }

    pub fn tag_size(&self, handle: TagHandle) -> Result<usize, TagError> {
        self.registry.size_of(handle)
    }

    pub fn tag_name(&self, handle: TagHandle) -> Result<&str, TagError> {
        self.registry.name_of(handle)
    }

    pub fn tag_type(&self, handle: TagHandle) -> Result<TagValueType, TagError> {
        self.registry.type_of(handle)
    }

    /// Destroy a user tag.
    ///
    /// Without `forced`, a tag that still has values on some entity is
    /// reported as [`TagError::TagInUse`]. With it, those values are dropped.
    pub fn destroy_tag(&mut self, handle: TagHandle, forced: bool) -> Result<(), TagError> {
        if let TagRef::Preset(preset) = self.registry.resolve(handle)? {
            return Err(TagError::NotSupported(format!(
                "preset tag {} cannot be destroyed",
                preset.tag_name()
            )));
        }
        let name = self.registry.active_descriptor(handle)?.name.clone();

        let in_use = self.stores.values().any(|store| store.contains(handle));
        if in_use && !forced {
            return Err(TagError::TagInUse(name));
        }

        self.stores.retain(|_, store| {
            store.remove(handle);
            !store.is_empty()
        });
        self.registry.deactivate(handle)
    }

    // ------------------------------------------------------------------
    // Interface group
    // ------------------------------------------------------------------

    /// The model-level group receiving tag values set without an entity
    pub fn interface_group(&mut self) -> Result<EntityId, TagError> {
        if let Some(group) = self.existing_interface_group() {
            self.interface_group = Some(group);
            return Ok(group);
        }

        let group = self
            .kernel
            .construct_group(&self.config.interface_group_name)?;
        info!(
            "Created interface group {:?} as {:?}",
            self.config.interface_group_name, group
        );
        self.interface_group = Some(group);
        Ok(group)
    }

    fn existing_interface_group(&self) -> Option<EntityId> {
        self.interface_group
            .filter(|group| self.kernel.contains(*group))
            .or_else(|| self.kernel.find_by_name(&self.config.interface_group_name))
    }

    /// Resolve a write target, creating the interface group if needed
    fn target(&mut self, entity: Option<EntityId>) -> Result<EntityId, TagError> {
        match entity {
            None => self.interface_group(),
            Some(entity) if self.kernel.contains(entity) => Ok(entity),
            Some(entity) => Err(TagError::InvalidEntityHandle(entity)),
        }
    }

    /// Resolve a read target; `None` if the interface group does not exist yet
    fn existing_target(&self, entity: Option<EntityId>) -> Result<Option<EntityId>, TagError> {
        match entity {
            None => Ok(self.existing_interface_group()),
            Some(entity) if self.kernel.contains(entity) => Ok(Some(entity)),
            Some(entity) => Err(TagError::InvalidEntityHandle(entity)),
        }
    }

    // ------------------------------------------------------------------
    // Writing
    // ------------------------------------------------------------------

    /// Set one value of `handle` on each entity.
    ///
    /// `values` holds one record of the tag's size per entity. Every entity
    /// is processed even after a failure; the last failure is returned, so
    /// the error does not say which entity failed.
    pub fn set_arr_data(
        &mut self,
        entities: &[Option<EntityId>],
        handle: TagHandle,
        values: &[u8],
    ) -> Result<(), TagError> {
        let tag = self.registry.resolve(handle)?;
        let byte_length = self.registry.active_descriptor(handle)?.byte_length;
        if byte_length == 0 {
            return Err(TagError::InvalidArgument(format!(
                "tag {} has zero size",
                handle.raw()
            )));
        }

        let expected = entities.len().checked_mul(byte_length).ok_or_else(|| {
            TagError::InvalidArgument(format!(
                "{} values of {} bytes overflow the batch size",
                entities.len(),
                byte_length
            ))
        })?;
        if values.len() != expected {
            return Err(TagError::BadArrayDimension {
                expected,
                actual: values.len(),
            });
        }

        let mut last_error = None;
        for (target, value) in entities.iter().zip(values.chunks_exact(byte_length)) {
            if let Err(err) = self.write_value(*target, tag, handle, value, byte_length) {
                warn!("Failed to set tag {} on {:?}: {}", handle.raw(), target, err);
                last_error = Some(err);
            }
        }

        match last_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Set the value of `handle` on a single entity (or the interface group)
    pub fn set_data(
        &mut self,
        entity: Option<EntityId>,
        handle: TagHandle,
        value: &[u8],
    ) -> Result<(), TagError> {
        let byte_length = self.registry.active_descriptor(handle)?.byte_length;
        if value.len() != byte_length {
            return Err(TagError::InvalidArgument(format!(
                "value has {} bytes, tag {} holds {}",
                value.len(),
                handle.raw(),
                byte_length
            )));
        }
        self.set_arr_data(&[entity], handle, value)
    }

    pub fn set_int_data(
        &mut self,
        entity: Option<EntityId>,
        handle: TagHandle,
        value: i32,
    ) -> Result<(), TagError> {
        self.set_data(entity, handle, bytemuck::bytes_of(&value))
    }

    pub fn set_dbl_data(
        &mut self,
        entity: Option<EntityId>,
        handle: TagHandle,
        value: f64,
    ) -> Result<(), TagError> {
        self.set_data(entity, handle, bytemuck::bytes_of(&value))
    }

    fn write_value(
        &mut self,
        target: Option<EntityId>,
        tag: TagRef,
        handle: TagHandle,
        value: &[u8],
        byte_length: usize,
    ) -> Result<(), TagError> {
        let entity = self.target(target)?;
        match tag {
            TagRef::Preset(preset) => self.write_preset(entity, preset, value),
            TagRef::User(_) => {
                let store = self.stores.entry(entity).or_default();
                let result = store.set(handle, value, byte_length);
                if store.is_empty() {
                    self.stores.remove(&entity);
                }
                result
            }
        }
    }

    fn write_preset(
        &mut self,
        entity: EntityId,
        preset: PresetTag,
        value: &[u8],
    ) -> Result<(), TagError> {
        if !preset.is_writable() {
            return Err(TagError::NotSupported(format!(
                "preset tag {} is read-only",
                preset.tag_name()
            )));
        }

        // NUL-terminated or exactly fills the fixed-length buffer
        let end = value.iter().position(|&b| b == 0).unwrap_or(value.len());
        let name = std::str::from_utf8(&value[..end]).map_err(|_| {
            TagError::InvalidArgument("entity name is not valid UTF-8".to_string())
        })?;
        self.kernel.set_entity_name(entity, name)?;
        debug!("Named {:?} {:?}", entity, name);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------

    /// Values of `handle` for each entity, densely packed.
    ///
    /// An entity without its own value reads the tag's default. Reading stops
    /// at the first entity that has neither.
    pub fn get_arr_data(
        &self,
        entities: &[Option<EntityId>],
        handle: TagHandle,
    ) -> Result<Vec<u8>, TagError> {
        let tag = self.registry.resolve(handle)?;
        let descriptor = self.registry.active_descriptor(handle)?;

        let total = entities.len().checked_mul(descriptor.byte_length).ok_or_else(|| {
            TagError::InvalidArgument(format!(
                "{} values of {} bytes overflow the batch size",
                entities.len(),
                descriptor.byte_length
            ))
        })?;
        let mut out = Vec::new();
        out.try_reserve_exact(total)?;
        for target in entities {
            self.read_value_into(*target, tag, handle, descriptor, &mut out)?;
        }
        Ok(out)
    }

    pub fn get_data(
        &self,
        entity: Option<EntityId>,
        handle: TagHandle,
    ) -> Result<Vec<u8>, TagError> {
        self.get_arr_data(&[entity], handle)
    }

    pub fn get_int_data(
        &self,
        entity: Option<EntityId>,
        handle: TagHandle,
    ) -> Result<i32, TagError> {
        let bytes = self.get_data(entity, handle)?;
        read_pod::<i32>(&bytes, handle)
    }

    pub fn get_dbl_data(
        &self,
        entity: Option<EntityId>,
        handle: TagHandle,
    ) -> Result<f64, TagError> {
        let bytes = self.get_data(entity, handle)?;
        read_pod::<f64>(&bytes, handle)
    }

    fn read_value_into(
        &self,
        target: Option<EntityId>,
        tag: TagRef,
        handle: TagHandle,
        descriptor: &TagDescriptor,
        out: &mut Vec<u8>,
    ) -> Result<(), TagError> {
        let entity = self.existing_target(target)?;
        match tag {
            TagRef::Preset(preset) => {
                let entity = entity.ok_or_else(|| {
                    TagError::TagNotFound(format!("{} on interface group", descriptor.name))
                })?;
                self.read_preset(entity, preset, descriptor.byte_length, out)
            }
            TagRef::User(_) => {
                let value = entity
                    .and_then(|e| self.stores.get(&e))
                    .and_then(|store| store.get(handle))
                    .or(descriptor.default_value.as_deref())
                    .ok_or_else(|| {
                        TagError::TagNotFound(format!("{} on {:?}", descriptor.name, target))
                    })?;
                out.extend_from_slice(value);
                Ok(())
            }
        }
    }

    fn read_preset(
        &self,
        entity: EntityId,
        preset: PresetTag,
        byte_length: usize,
        out: &mut Vec<u8>,
    ) -> Result<(), TagError> {
        match preset {
            PresetTag::Name => {
                let name = self.kernel.entity_name(entity)?.unwrap_or_default();
                let bytes = &name.as_bytes()[..name.len().min(byte_length)];
                out.extend_from_slice(bytes);
                out.resize(out.len() + byte_length - bytes.len(), 0);
            }
            PresetTag::GlobalId => {
                out.extend_from_slice(bytemuck::bytes_of(&self.kernel.global_id(entity)?))
            }
            PresetTag::UniqueId => {
                out.extend_from_slice(bytemuck::bytes_of(&self.kernel.unique_id(entity)?))
            }
            PresetTag::MeshInterval => {
                out.extend_from_slice(bytemuck::bytes_of(&self.kernel.mesh_interval(entity)?))
            }
            PresetTag::MeshSize => {
                out.extend_from_slice(bytemuck::bytes_of(&self.kernel.mesh_size(entity)?))
            }
            PresetTag::SizeFirmness => {
                let firmness = self.kernel.size_firmness(entity)? as i32;
                out.extend_from_slice(bytemuck::bytes_of(&firmness))
            }
        }
        Ok(())
    }

    /// Handles of the user tags that have a value on `entity`, ascending
    pub fn get_all_tags(&self, entity: Option<EntityId>) -> Result<Vec<TagHandle>, TagError> {
        let handles = self
            .existing_target(entity)?
            .and_then(|e| self.stores.get(&e))
            .map(|store| store.handles().collect())
            .unwrap_or_default();
        Ok(handles)
    }

    // ------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------

    /// Remove the value of a user tag from each entity.
    ///
    /// Same error policy as [`set_arr_data`](Self::set_arr_data): all
    /// entities are processed and the last failure is returned.
    pub fn rmv_arr_tag(
        &mut self,
        entities: &[Option<EntityId>],
        handle: TagHandle,
    ) -> Result<(), TagError> {
        if let TagRef::Preset(preset) = self.registry.resolve(handle)? {
            return Err(TagError::NotSupported(format!(
                "preset tag {} cannot be removed",
                preset.tag_name()
            )));
        }
        self.registry.active_descriptor(handle)?;

        let mut last_error = None;
        for target in entities {
            if let Err(err) = self.remove_value(*target, handle) {
                warn!("Failed to remove tag {} from {:?}: {}", handle.raw(), target, err);
                last_error = Some(err);
            }
        }

        match last_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn rmv_tag(
        &mut self,
        entity: Option<EntityId>,
        handle: TagHandle,
    ) -> Result<(), TagError> {
        self.rmv_arr_tag(&[entity], handle)
    }

    fn remove_value(
        &mut self,
        target: Option<EntityId>,
        handle: TagHandle,
    ) -> Result<(), TagError> {
        let entity = self.existing_target(target)?;
        let present = entity
            .and_then(|e| self.stores.get(&e))
            .is_some_and(|store| store.contains(handle));
        let Some(entity) = entity.filter(|_| present) else {
            let name = self.registry.name_of(handle)?;
            return Err(TagError::TagNotFound(format!("{} on {:?}", name, target)));
        };

        if let Some(store) = self.stores.get_mut(&entity) {
            store.remove(handle);
            if store.is_empty() {
                self.stores.remove(&entity);
                debug!("Dropped empty tag attribute of {:?}", entity);
            }
        }
        Ok(())
    }

    /// Forget every tag value of `entity`, as when the kernel resets or
    /// deletes its attributes
    pub fn reset_entity(&mut self, entity: EntityId) -> bool {
        let removed = self.stores.remove(&entity).is_some();
        if removed {
            debug!("Reset tag attribute of {:?}", entity);
        }
        removed
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Attribute records for every entity holding tag values, ordered by
    /// entity id
    pub fn save_attributes(&self) -> Result<Vec<(EntityId, AttributeRecord)>, TagError> {
        let mut entities: Vec<EntityId> = self
            .stores
            .iter()
            .filter(|(_, store)| !store.is_empty())
            .map(|(entity, _)| *entity)
            .collect();
        entities.sort();

        let mut records = Vec::with_capacity(entities.len());
        for entity in entities {
            let record = self.codec.encode(&self.stores[&entity], &self.registry)?;
            records.push((entity, record));
        }
        debug!("Encoded tag attributes of {} entities", records.len());
        Ok(records)
    }

    /// Restore one persisted attribute onto `entity`.
    ///
    /// Returns `Ok(false)` for records of another attribute type.
    pub fn restore_attribute(
        &mut self,
        entity: EntityId,
        record: &AttributeRecord,
    ) -> Result<bool, TagError> {
        if !self.kernel.contains(entity) {
            return Err(TagError::InvalidEntityHandle(entity));
        }

        let mut store = self.stores.remove(&entity).unwrap_or_default();
        let result = self.codec.decode(record, &mut self.registry, &mut store);
        if !store.is_empty() {
            self.stores.insert(entity, store);
        }
        result
    }

    /// Restore a batch of persisted attributes, returning how many were tag
    /// attributes
    pub fn restore_attributes<I>(&mut self, records: I) -> Result<usize, TagError>
    where
        I: IntoIterator<Item = (EntityId, AttributeRecord)>,
    {
        let mut restored = 0;
        for (entity, record) in records {
            if self.restore_attribute(entity, &record)? {
                restored += 1;
            }
        }
        info!("Restored tag attributes on {} entities", restored);
        Ok(restored)
    }
}

fn read_pod<T: bytemuck::Pod>(bytes: &[u8], handle: TagHandle) -> Result<T, TagError> {
    if bytes.len() != std::mem::size_of::<T>() {
        return Err(TagError::InvalidArgument(format!(
            "tag {} holds {} bytes, not {}",
            handle.raw(),
            bytes.len(),
            std::mem::size_of::<T>()
        )));
    }
    Ok(bytemuck::pod_read_unaligned(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::error_code;
    use crate::kernel::InMemoryKernel;
    use igeom_base::{EntityType, ErrorCode};

    fn session() -> (TagCoordinator<InMemoryKernel>, EntityId, EntityId) {
        let mut kernel = InMemoryKernel::new();
        let a = kernel.create_entity(EntityType::Face);
        let b = kernel.create_entity(EntityType::Edge);
        (TagCoordinator::new(kernel), a, b)
    }

    fn name_buffer(name: &str, length: usize) -> Vec<u8> {
        let mut buffer = name.as_bytes().to_vec();
        buffer.resize(length, 0);
        buffer
    }

    #[test]
    fn test_create_set_and_read_back() {
        let (mut tags, a, _) = session();

        let err = tags.create_tag("NAME", 32, TagValueType::Bytes, None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TagAlreadyExists);

        let weight = tags.create_tag("MESH_WEIGHT", 8, TagValueType::Double, None).unwrap();
        assert!(weight.raw() > 0);
        assert_eq!(tags.tag_size(weight).unwrap(), 8);
        assert_eq!(tags.tag_handle("MESH_WEIGHT").unwrap(), weight);

        let value = 2.5f64.to_ne_bytes();
        tags.set_arr_data(&[Some(a)], weight, &value).unwrap();
        assert_eq!(tags.entity_store(a).unwrap().get(weight), Some(&value[..]));
        assert_eq!(tags.get_dbl_data(Some(a), weight).unwrap(), 2.5);
    }

    #[test]
    fn test_name_on_interface_group() {
        let (mut tags, _, _) = session();
        let name = tags.tag_handle("NAME").unwrap();

        tags.set_arr_data(&[None], name, &name_buffer("Widget1", 32)).unwrap();
        let group = tags.interface_group().unwrap();
        assert_eq!(
            tags.kernel().entity(group).unwrap().name.as_deref(),
            Some("Widget1")
        );

        tags.set_data(None, name, &name_buffer("Widget2", 32)).unwrap();
        assert_eq!(tags.interface_group().unwrap(), group);
        assert_eq!(tags.kernel().group_count(), 1);
        assert_eq!(tags.get_data(None, name).unwrap(), name_buffer("Widget2", 32));
    }

    #[test]
    fn test_full_length_name_without_terminator() {
        let (mut tags, a, _) = session();
        let name = tags.tag_handle("NAME").unwrap();
        let full = [b'x'; 32];

        tags.set_data(Some(a), name, &full).unwrap();
        let expected = "x".repeat(32);
        assert_eq!(tags.kernel().entity(a).unwrap().name.as_deref(), Some(expected.as_str()));
        assert_eq!(tags.get_data(Some(a), name).unwrap(), full.to_vec());
    }

    #[test]
    fn test_read_only_presets() {
        let (mut tags, a, b) = session();
        for preset in [
            PresetTag::GlobalId,
            PresetTag::UniqueId,
            PresetTag::MeshInterval,
            PresetTag::MeshSize,
            PresetTag::SizeFirmness,
        ] {
            let handle = TagHandle::from(preset);
            let size = tags.tag_size(handle).unwrap();
            let err = tags
                .set_arr_data(&[Some(a), Some(b)], handle, &vec![0; 2 * size])
                .unwrap_err();
            assert_eq!(err.code(), ErrorCode::NotSupported);
        }
    }

    #[test]
    fn test_preset_reads_come_from_kernel() {
        let (mut tags, a, _) = session();
        tags.kernel_mut().entity_mut(a).unwrap().mesh_size = 0.25;
        tags.kernel_mut().entity_mut(a).unwrap().mesh_interval = 6;

        let global = tags.kernel().global_id(a).unwrap();
        let read_int = |preset| tags.get_int_data(Some(a), TagHandle::from(preset)).unwrap();
        assert_eq!(read_int(PresetTag::GlobalId), global);
        assert_eq!(read_int(PresetTag::MeshInterval), 6);
        assert_eq!(read_int(PresetTag::SizeFirmness), 0);

        let size = tags.get_dbl_data(Some(a), TagHandle::from(PresetTag::MeshSize));
        assert_eq!(size.unwrap(), 0.25);
    }

    #[test]
    fn test_batch_continues_after_failure() {
        let (mut tags, a, b) = session();
        let missing = EntityId(999);
        let flag = tags.create_tag("FLAG", 4, TagValueType::Integer, None).unwrap();

        let mut values = Vec::new();
        values.extend_from_slice(&1i32.to_ne_bytes());
        values.extend_from_slice(&2i32.to_ne_bytes());
        let err = tags.set_arr_data(&[Some(missing), Some(a)], flag, &values).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidEntityHandle);
        assert_eq!(tags.get_int_data(Some(a), flag).unwrap(), 2);

        // Only the last failure is reported
        let name = tags.tag_handle("NAME").unwrap();
        let mut values = vec![0xffu8; 32];
        values.extend(name_buffer("edge", 32));
        values.extend(name_buffer("ghost", 32));
        let err = tags
            .set_arr_data(&[Some(a), Some(b), Some(missing)], name, &values)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidEntityHandle);
        assert_eq!(tags.kernel().entity(b).unwrap().name.as_deref(), Some("edge"));
    }

    #[test]
    fn test_mixed_preset_and_user_writes() {
        let (mut tags, a, b) = session();
        let flag = tags.create_tag("FLAG", 4, TagValueType::Integer, None).unwrap();

        let err = tags
            .set_int_data(Some(a), TagHandle::from(PresetTag::GlobalId), 5)
            .unwrap_err();
        tags.set_int_data(Some(b), flag, 9).unwrap();

        assert_eq!(err.code(), ErrorCode::NotSupported);
        assert_eq!(tags.get_int_data(Some(b), flag).unwrap(), 9);
        assert!(tags.entity_store(a).is_none());
    }

    #[test]
    fn test_bad_array_dimension() {
        let (mut tags, a, b) = session();
        let flag = tags.create_tag("FLAG", 4, TagValueType::Integer, None).unwrap();

        let err = tags.set_arr_data(&[Some(a), Some(b)], flag, &[0; 4]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadArrayDimension);
        assert!(tags.entity_store(a).is_none());

        let err = tags.set_data(Some(a), flag, &[0; 3]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);

        let err = tags.set_dbl_data(Some(a), flag, 1.0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_defaults_and_missing_values() {
        let (mut tags, a, b) = session();
        let with_default = tags
            .create_tag("COUNT", 4, TagValueType::Integer, Some(&3i32.to_ne_bytes()[..]))
            .unwrap();
        let without = tags.create_tag("BARE", 4, TagValueType::Integer, None).unwrap();

        assert_eq!(tags.get_int_data(Some(a), with_default).unwrap(), 3);
        tags.set_int_data(Some(a), with_default, 4).unwrap();
        assert_eq!(tags.get_int_data(Some(a), with_default).unwrap(), 4);
        assert_eq!(tags.get_int_data(Some(b), with_default).unwrap(), 3);

        let err = tags.get_data(Some(a), without).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TagNotFound);
        // No interface group yet; reads do not create one
        assert_eq!(tags.get_int_data(None, with_default).unwrap(), 3);
        assert_eq!(tags.kernel().group_count(), 0);
    }

    #[test]
    fn test_get_arr_data_packs_values() {
        let (mut tags, a, b) = session();
        let pair = tags.create_tag("PAIR", 2, TagValueType::Bytes, None).unwrap();
        tags.set_arr_data(&[Some(a), Some(b)], pair, &[1, 2, 3, 4]).unwrap();

        assert_eq!(tags.get_arr_data(&[Some(b), Some(a)], pair).unwrap(), vec![3, 4, 1, 2]);
        assert_eq!(tags.get_all_tags(Some(a)).unwrap(), vec![pair]);
    }

    #[test]
    fn test_remove_drops_empty_attribute() {
        let (mut tags, a, _) = session();
        let first = tags.create_tag("FIRST", 1, TagValueType::Bytes, None).unwrap();
        let second = tags.create_tag("SECOND", 1, TagValueType::Bytes, None).unwrap();
        tags.set_data(Some(a), first, &[1]).unwrap();
        tags.set_data(Some(a), second, &[2]).unwrap();

        tags.rmv_tag(Some(a), first).unwrap();
        assert_eq!(tags.get_all_tags(Some(a)).unwrap(), vec![second]);

        tags.rmv_tag(Some(a), second).unwrap();
        assert!(tags.entity_store(a).is_none());

        let err = tags.rmv_tag(Some(a), second).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TagNotFound);

        let err = tags.rmv_tag(Some(a), tags.tag_handle("NAME").unwrap()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotSupported);
    }

    #[test]
    fn test_destroy_tag() {
        let (mut tags, a, _) = session();
        let flag = tags.create_tag("FLAG", 4, TagValueType::Integer, None).unwrap();
        tags.set_int_data(Some(a), flag, 1).unwrap();

        let err = tags.destroy_tag(flag, false).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TagInUse);

        tags.destroy_tag(flag, true).unwrap();
        assert!(tags.entity_store(a).is_none());
        assert_eq!(tags.tag_handle("FLAG").unwrap_err().code(), ErrorCode::TagNotFound);
        assert_eq!(tags.set_int_data(Some(a), flag, 1).unwrap_err().code(), ErrorCode::TagNotFound);

        let again = tags.create_tag("FLAG", 8, TagValueType::Double, None).unwrap();
        assert_eq!(again, flag);
        assert_eq!(tags.tag_size(again).unwrap(), 8);
        assert_eq!(tags.registry().user_tag_count(), 1);

        let err = tags.destroy_tag(TagHandle::from(PresetTag::Name), true).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotSupported);
    }

    #[test]
    fn test_reset_entity() {
        let (mut tags, a, _) = session();
        let flag = tags.create_tag("FLAG", 4, TagValueType::Integer, None).unwrap();
        tags.set_int_data(Some(a), flag, 1).unwrap();

        assert!(tags.reset_entity(a));
        assert!(!tags.reset_entity(a));
        assert!(tags.get_all_tags(Some(a)).unwrap().is_empty());
    }

    #[test]
    fn test_save_and_restore_through_kernel() {
        let (mut tags, a, b) = session();
        let four = tags.create_tag("FOUR", 4, TagValueType::Integer, None).unwrap();
        let seven = tags.create_tag("SEVEN", 7, TagValueType::Bytes, None).unwrap();
        tags.set_int_data(Some(a), four, -17).unwrap();
        tags.set_data(Some(a), seven, b"payload").unwrap();
        tags.set_data(Some(b), seven, b"edgeval").unwrap();
        tags.set_int_data(None, four, 77).unwrap();

        let records = tags.save_attributes().unwrap();
        assert_eq!(records.len(), 3);
        let json = tags.kernel().save_model(&records).unwrap();

        let (kernel, attributes) = InMemoryKernel::load_model(&json).unwrap();
        let mut restored = TagCoordinator::new(kernel);
        assert_eq!(restored.restore_attributes(attributes).unwrap(), 3);

        // Tags were unknown to the new session and registered as bytes
        let four = restored.tag_handle("FOUR").unwrap();
        let seven = restored.tag_handle("SEVEN").unwrap();
        assert_eq!(restored.tag_type(four).unwrap(), TagValueType::Bytes);
        assert_eq!(restored.tag_size(seven).unwrap(), 7);

        assert_eq!(restored.get_int_data(Some(a), four).unwrap(), -17);
        assert_eq!(restored.get_data(Some(a), seven).unwrap(), b"payload".to_vec());
        assert_eq!(restored.get_data(Some(b), seven).unwrap(), b"edgeval".to_vec());
        // Interface group is found again by its reserved name
        assert_eq!(restored.get_int_data(None, four).unwrap(), 77);
        assert_eq!(restored.kernel().group_count(), 1);
    }

    #[test]
    fn test_restore_ignores_foreign_records() {
        let (mut tags, a, _) = session();
        let mut record = AttributeRecord::new("ENTITY_NAME");
        record.strings.push("shaft".to_string());

        assert!(!tags.restore_attribute(a, &record).unwrap());
        assert!(tags.entity_store(a).is_none());
        assert_eq!(tags.registry().user_tag_count(), 0);

        let err = tags.restore_attribute(EntityId(404), &record).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidEntityHandle);
    }

    #[test]
    fn test_config_controls_reserved_names() {
        let mut kernel = InMemoryKernel::new();
        let a = kernel.create_entity(EntityType::Region);
        let config = SessionConfig::from_options(
            ";interface_group=MODEL;name_length=8;attribute_marker=MY_TAGS;",
        )
        .unwrap();
        let mut tags = TagCoordinator::with_config(kernel, config);

        let name = tags.tag_handle("NAME").unwrap();
        assert_eq!(tags.tag_size(name).unwrap(), 8);

        let flag = tags.create_tag("FLAG", 1, TagValueType::Bytes, None).unwrap();
        tags.set_data(None, flag, &[1]).unwrap();
        assert!(tags.kernel().find_by_name("MODEL").is_some());

        tags.set_data(Some(a), flag, &[2]).unwrap();
        let records = tags.save_attributes().unwrap();
        assert!(records.iter().all(|(_, r)| r.character_type() == Some("MY_TAGS")));
    }

    #[test]
    fn test_oversized_batch_is_rejected() {
        let mut kernel = InMemoryKernel::new();
        let a = kernel.create_entity(EntityType::Face);
        let b = kernel.create_entity(EntityType::Face);
        let config = SessionConfig {
            name_tag_length: usize::MAX,
            ..SessionConfig::default()
        };
        let mut tags = TagCoordinator::with_config(kernel, config);
        let name = tags.tag_handle("NAME").unwrap();

        let result = tags.set_arr_data(&[Some(a), Some(b)], name, &[]);
        assert_eq!(error_code(&result), ErrorCode::InvalidArgument);
        let result = tags.get_arr_data(&[Some(a), Some(b)], name);
        assert_eq!(error_code(&result), ErrorCode::InvalidArgument);
        assert_eq!(tags.kernel().entity(a).unwrap().name, None);
    }

    #[test]
    fn test_stored_values_match_registered_size() {
        let (mut tags, a, b) = session();
        let triple = tags.create_tag("TRIPLE", 3, TagValueType::Bytes, None).unwrap();

        let result = tags.set_arr_data(&[Some(a), Some(b)], triple, b"abcdef");
        assert_eq!(error_code(&result), ErrorCode::Success);
        for entity in [a, b] {
            let stored = tags.entity_store(entity).unwrap().get(triple).unwrap();
            assert_eq!(stored.len(), tags.tag_size(triple).unwrap());
        }
        assert_eq!(tags.get_arr_data(&[Some(b), Some(a)], triple).unwrap(), b"defabc");
    }
}
