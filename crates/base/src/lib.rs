//! iBase vocabulary for the iGeom tag layer
//!
//! Defines the value types shared between the tag subsystem and any binding
//! layer that exposes it through the iBase/iGeom C interface. Numeric values
//! match the iBase enumerations so that a binding can pass them through
//! unchanged.

use serde::{Deserialize, Serialize};

/// Error codes returned across the iBase boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    #[default]
    Success = 0,
    MeshAlreadyLoaded = 1,
    NoMeshData = 2,
    FileNotFound = 3,
    FileWriteError = 4,
    NilArray = 5,
    BadArraySize = 6,
    BadArrayDimension = 7,
    InvalidEntityHandle = 8,
    InvalidEntityCount = 9,
    InvalidEntityType = 10,
    InvalidEntityTopology = 11,
    BadTypeAndTopo = 12,
    EntityCreationError = 13,
    InvalidTagHandle = 14,
    TagNotFound = 15,
    TagAlreadyExists = 16,
    TagInUse = 17,
    InvalidEntitysetHandle = 18,
    InvalidIteratorHandle = 19,
    InvalidArgument = 20,
    MemoryAllocationFailed = 21,
    NotSupported = 22,
    Failure = 23,
}

impl ErrorCode {
    const ALL: [ErrorCode; 24] = [
        Self::Success,
        Self::MeshAlreadyLoaded,
        Self::NoMeshData,
        Self::FileNotFound,
        Self::FileWriteError,
        Self::NilArray,
        Self::BadArraySize,
        Self::BadArrayDimension,
        Self::InvalidEntityHandle,
        Self::InvalidEntityCount,
        Self::InvalidEntityType,
        Self::InvalidEntityTopology,
        Self::BadTypeAndTopo,
        Self::EntityCreationError,
        Self::InvalidTagHandle,
        Self::TagNotFound,
        Self::TagAlreadyExists,
        Self::TagInUse,
        Self::InvalidEntitysetHandle,
        Self::InvalidIteratorHandle,
        Self::InvalidArgument,
        Self::MemoryAllocationFailed,
        Self::NotSupported,
        Self::Failure,
    ];

    /// Decode a raw iBase error value
    pub fn from_raw(raw: i32) -> Option<Self> {
        usize::try_from(raw).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Raw value as passed through the C interface
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// Short human-readable description, as reported by `getDescription`
    pub fn description(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::MeshAlreadyLoaded => "mesh already loaded",
            Self::NoMeshData => "no mesh data",
            Self::FileNotFound => "file not found",
            Self::FileWriteError => "file write error",
            Self::NilArray => "nil array",
            Self::BadArraySize => "bad array size",
            Self::BadArrayDimension => "bad array dimension",
            Self::InvalidEntityHandle => "invalid entity handle",
            Self::InvalidEntityCount => "invalid entity count",
            Self::InvalidEntityType => "invalid entity type",
            Self::InvalidEntityTopology => "invalid entity topology",
            Self::BadTypeAndTopo => "bad type and topology",
            Self::EntityCreationError => "entity creation error",
            Self::InvalidTagHandle => "invalid tag handle",
            Self::TagNotFound => "tag not found",
            Self::TagAlreadyExists => "tag already exists",
            Self::TagInUse => "tag in use",
            Self::InvalidEntitysetHandle => "invalid entity set handle",
            Self::InvalidIteratorHandle => "invalid iterator handle",
            Self::InvalidArgument => "invalid argument",
            Self::MemoryAllocationFailed => "memory allocation failed",
            Self::NotSupported => "not supported",
            Self::Failure => "failure",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Declared value type of a tag
///
/// The type is advisory: tag data is always stored and transferred as raw
/// bytes of the tag's declared length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum TagValueType {
    Integer = 0,
    Double = 1,
    EntityHandle = 2,
    #[default]
    Bytes = 3,
}

/// Raw tag value type outside the iBase enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Unknown tag value type: {0}")]
pub struct UnknownValueType(pub i32);

impl TryFrom<i32> for TagValueType {
    type Error = UnknownValueType;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::Integer),
            1 => Ok(Self::Double),
            2 => Ok(Self::EntityHandle),
            3 => Ok(Self::Bytes),
            other => Err(UnknownValueType(other)),
        }
    }
}

/// Topological dimension of a geometric entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum EntityType {
    Vertex = 0,
    Edge = 1,
    Face = 2,
    Region = 3,
}

impl EntityType {
    /// Topological dimension (0 for vertices through 3 for regions)
    pub fn dimension(self) -> u8 {
        self as u8
    }
}
