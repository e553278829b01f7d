//! Error types for tag operations.

use std::collections::TryReserveError;

use igeom_base::ErrorCode;

use crate::kernel::KernelError;
use crate::types::{EntityId, TagHandle};

/// Errors that can occur during tag operations.
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("Tag {0:?} already exists")]
    TagAlreadyExists(String),

    #[error("Tag not found: {0}")]
    TagNotFound(String),

    #[error("Invalid tag handle: {}", .0.raw())]
    InvalidTagHandle(TagHandle),

    #[error("Tag {0:?} is still set on one or more entities")]
    TagInUse(String),

    #[error("Invalid entity handle: {0:?}")]
    InvalidEntityHandle(EntityId),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Value array holds {actual} bytes, expected {expected}")]
    BadArrayDimension { expected: usize, actual: usize },

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Failed to allocate tag buffer: {0}")]
    MemoryAllocationFailed(#[from] TryReserveError),

    #[error(transparent)]
    Kernel(#[from] KernelError),
}

impl TagError {
    /// iBase error code reported across the binding boundary
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::TagAlreadyExists(_) => ErrorCode::TagAlreadyExists,
            Self::TagNotFound(_) => ErrorCode::TagNotFound,
            Self::InvalidTagHandle(_) => ErrorCode::InvalidTagHandle,
            Self::TagInUse(_) => ErrorCode::TagInUse,
            Self::InvalidEntityHandle(_) => ErrorCode::InvalidEntityHandle,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::BadArrayDimension { .. } => ErrorCode::BadArrayDimension,
            Self::NotSupported(_) => ErrorCode::NotSupported,
            Self::MemoryAllocationFailed(_) => ErrorCode::MemoryAllocationFailed,
            Self::Kernel(err) => err.code(),
        }
    }
}

/// Collapse an operation result into the iBase code a binding returns
pub fn error_code<T>(result: &Result<T, TagError>) -> ErrorCode {
    match result {
        Ok(_) => ErrorCode::Success,
        Err(err) => err.code(),
    }
}
