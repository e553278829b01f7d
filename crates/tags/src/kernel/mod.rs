//! Geometry kernel collaborator interface.
//!
//! The tag layer never owns geometry. Everything it needs from the solid
//! modeling kernel (entity identity, native names, ids and meshing fields,
//! named groups) goes through [`GeometryKernel`].

mod memory;

pub use memory::{InMemoryKernel, MemoryEntity, MemoryEntityKind};

use igeom_base::ErrorCode;

use crate::types::{EntityId, SizeFirmness};

/// Errors reported by a geometry kernel
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("Kernel has no entity {0:?}")]
    UnknownEntity(EntityId),

    #[error("Kernel does not support {0}")]
    Unsupported(&'static str),

    #[error("Kernel failure: {0}")]
    Failure(String),

    #[error("Failed to persist model: {0}")]
    Persistence(#[from] serde_json::Error),
}

impl KernelError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownEntity(_) => ErrorCode::InvalidEntityHandle,
            Self::Unsupported(_) => ErrorCode::NotSupported,
            Self::Failure(_) | Self::Persistence(_) => ErrorCode::Failure,
        }
    }
}

/// Operations the tag layer consumes from the solid modeling kernel
pub trait GeometryKernel {
    /// Whether `entity` refers to a live entity
    fn contains(&self, entity: EntityId) -> bool;

    /// Native display name, if one has been assigned
    fn entity_name(&self, entity: EntityId) -> Result<Option<String>, KernelError>;

    fn set_entity_name(&mut self, entity: EntityId, name: &str) -> Result<(), KernelError>;

    /// Per-type id assigned by the kernel
    fn global_id(&self, entity: EntityId) -> Result<i32, KernelError>;

    /// Id unique across all entities of the session
    fn unique_id(&self, entity: EntityId) -> Result<i32, KernelError>;

    fn mesh_interval(&self, entity: EntityId) -> Result<i32, KernelError>;

    fn mesh_size(&self, entity: EntityId) -> Result<f64, KernelError>;

    fn size_firmness(&self, entity: EntityId) -> Result<SizeFirmness, KernelError>;

    /// Look up an entity by its native name
    fn find_by_name(&self, name: &str) -> Option<EntityId>;

    /// Construct a new, empty named group
    fn construct_group(&mut self, name: &str) -> Result<EntityId, KernelError>;
}
