//! InMemoryKernel: deterministic stand-in for the solid modeling kernel.
//!
//! Holds bare entity records (no geometry) with the native fields the tag
//! layer reads and writes, and models the kernel's save/load cycle by
//! persisting entities together with their attribute records as JSON.

use std::collections::BTreeMap;

use igeom_base::EntityType;
use serde::{Deserialize, Serialize};

use super::{GeometryKernel, KernelError};
use crate::record::AttributeRecord;
use crate::types::{EntityId, SizeFirmness};

/// What an in-memory entity stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryEntityKind {
    Geometry(EntityType),
    Group,
}

impl MemoryEntityKind {
    fn counter_slot(self) -> usize {
        match self {
            Self::Geometry(ty) => ty.dimension() as usize,
            Self::Group => 4,
        }
    }
}

/// Native fields of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntity {
    pub kind: MemoryEntityKind,
    pub name: Option<String>,
    pub global_id: i32,
    pub mesh_interval: i32,
    pub mesh_size: f64,
    pub size_firmness: SizeFirmness,
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedEntity {
    id: EntityId,
    entity: MemoryEntity,
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedAttribute {
    entity: EntityId,
    record: AttributeRecord,
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedModel {
    next_id: u64,
    global_counters: [i32; 5],
    entities: Vec<SavedEntity>,
    attributes: Vec<SavedAttribute>,
}

/// Deterministic in-memory geometry kernel
#[derive(Debug, Clone)]
pub struct InMemoryKernel {
    next_id: u64,
    /// Next global id per entity kind (vertex, edge, face, region, group)
    global_counters: [i32; 5],
    entities: BTreeMap<EntityId, MemoryEntity>,
}

impl Default for InMemoryKernel {
    fn default() -> Self {
        Self {
            next_id: 1,
            global_counters: [1; 5],
            entities: BTreeMap::new(),
        }
    }
}

impl InMemoryKernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a geometric entity of the given type
    pub fn create_entity(&mut self, entity_type: EntityType) -> EntityId {
        self.insert(MemoryEntityKind::Geometry(entity_type), None)
    }

    fn insert(&mut self, kind: MemoryEntityKind, name: Option<String>) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;

        let counter = &mut self.global_counters[kind.counter_slot()];
        let global_id = *counter;
        *counter += 1;

        self.entities.insert(
            id,
            MemoryEntity {
                kind,
                name,
                global_id,
                mesh_interval: 1,
                mesh_size: 0.0,
                size_firmness: SizeFirmness::default(),
            },
        );
        id
    }

    pub fn delete_entity(&mut self, entity: EntityId) -> bool {
        self.entities.remove(&entity).is_some()
    }

    pub fn entity(&self, entity: EntityId) -> Option<&MemoryEntity> {
        self.entities.get(&entity)
    }

    pub fn entity_mut(&mut self, entity: EntityId) -> Result<&mut MemoryEntity, KernelError> {
        self.entities
            .get_mut(&entity)
            .ok_or(KernelError::UnknownEntity(entity))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn group_count(&self) -> usize {
        self.entities
            .values()
            .filter(|e| e.kind == MemoryEntityKind::Group)
            .count()
    }

    fn get(&self, entity: EntityId) -> Result<&MemoryEntity, KernelError> {
        self.entities
            .get(&entity)
            .ok_or(KernelError::UnknownEntity(entity))
    }

    /// Serialize all entities plus the attribute records handed over by the
    /// tag layer.
    pub fn save_model(
        &self,
        attributes: &[(EntityId, AttributeRecord)],
    ) -> Result<String, KernelError> {
        for (entity, _) in attributes {
            self.get(*entity)?;
        }
        let model = SavedModel {
            next_id: self.next_id,
            global_counters: self.global_counters,
            entities: self
                .entities
                .iter()
                .map(|(id, entity)| SavedEntity {
                    id: *id,
                    entity: entity.clone(),
                })
                .collect(),
            attributes: attributes
                .iter()
                .map(|(entity, record)| SavedAttribute {
                    entity: *entity,
                    record: record.clone(),
                })
                .collect(),
        };
        Ok(serde_json::to_string(&model)?)
    }

    /// Rebuild a kernel from [`save_model`](Self::save_model) output, returning
    /// the attribute records in the order they were saved.
    pub fn load_model(
        json: &str,
    ) -> Result<(Self, Vec<(EntityId, AttributeRecord)>), KernelError> {
        let model: SavedModel = serde_json::from_str(json)?;
        let kernel = Self {
            next_id: model.next_id,
            global_counters: model.global_counters,
            entities: model
                .entities
                .into_iter()
                .map(|saved| (saved.id, saved.entity))
                .collect(),
        };
        let attributes: Vec<(EntityId, AttributeRecord)> = model
            .attributes
            .into_iter()
            .map(|saved| (saved.entity, saved.record))
            .collect();
        tracing::debug!(
            "Loaded model with {} entities, {} attribute records",
            kernel.entities.len(),
            attributes.len()
        );
        Ok((kernel, attributes))
    }
}

impl GeometryKernel for InMemoryKernel {
    fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    fn entity_name(&self, entity: EntityId) -> Result<Option<String>, KernelError> {
        Ok(self.get(entity)?.name.clone())
    }

    fn set_entity_name(&mut self, entity: EntityId, name: &str) -> Result<(), KernelError> {
        self.entity_mut(entity)?.name = Some(name.to_string());
        Ok(())
    }

    fn global_id(&self, entity: EntityId) -> Result<i32, KernelError> {
        Ok(self.get(entity)?.global_id)
    }

    fn unique_id(&self, entity: EntityId) -> Result<i32, KernelError> {
        self.get(entity)?;
        i32::try_from(entity.0)
            .map_err(|_| KernelError::Failure(format!("unique id overflow for {:?}", entity)))
    }

    fn mesh_interval(&self, entity: EntityId) -> Result<i32, KernelError> {
        Ok(self.get(entity)?.mesh_interval)
    }

    fn mesh_size(&self, entity: EntityId) -> Result<f64, KernelError> {
        Ok(self.get(entity)?.mesh_size)
    }

    fn size_firmness(&self, entity: EntityId) -> Result<SizeFirmness, KernelError> {
        Ok(self.get(entity)?.size_firmness)
    }

    fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.entities
            .iter()
            .find(|(_, e)| e.name.as_deref() == Some(name))
            .map(|(id, _)| *id)
    }

    fn construct_group(&mut self, name: &str) -> Result<EntityId, KernelError> {
        Ok(self.insert(MemoryEntityKind::Group, Some(name.to_string())))
    }
}
