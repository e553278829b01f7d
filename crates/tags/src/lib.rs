//! iGeom tag management
//!
//! This crate attaches named, fixed-size application data to the entities of
//! an external solid modeling kernel:
//! - [`registry::TagRegistry`] - Tag names, handles and descriptors (preset and user)
//! - [`store::EntityTagStore`] - Tag values held for one entity
//! - [`coordinator::TagCoordinator`] - Batch get/set/remove across entities
//! - [`codec::AttributeCodec`] - Tag values to and from kernel attribute records
//! - [`kernel`] - The kernel interface consumed here, plus an in-memory kernel

pub mod codec;
pub mod coordinator;
pub mod error;
pub mod kernel;
pub mod record;
pub mod registry;
pub mod store;
pub mod types;

pub use codec::*;
pub use coordinator::*;
pub use error::*;
pub use kernel::{GeometryKernel, InMemoryKernel, KernelError};
pub use record::*;
pub use registry::*;
pub use store::*;
pub use types::*;
