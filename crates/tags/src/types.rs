//! Core identifiers and descriptors of the tag subsystem.

use igeom_base::TagValueType;
use serde::{Deserialize, Serialize};

/// Type-safe identifier of a kernel entity (body, volume, face, edge, vertex or group)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

/// Opaque tag handle as exchanged with callers
///
/// Positive values are user tags (1-based). Non-positive values address the
/// preset table by negation, with 0 reserved as the "no tag" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagHandle(pub i64);

impl TagHandle {
    /// The "no tag" sentinel
    pub const NONE: TagHandle = TagHandle(0);

    pub fn raw(self) -> i64 {
        self.0
    }

    pub fn is_preset(self) -> bool {
        self.0 <= 0
    }

    pub(crate) fn from_user_index(index: usize) -> Self {
        TagHandle(index as i64 + 1)
    }
}

impl From<PresetTag> for TagHandle {
    fn from(preset: PresetTag) -> Self {
        TagHandle(-(preset as i64))
    }
}

/// Built-in tags with kernel-recognized semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PresetTag {
    /// Entity display name (fixed-length text buffer)
    Name = 1,
    /// Per-type numeric id assigned by the kernel
    GlobalId = 2,
    /// Session-unique numeric id
    UniqueId = 3,
    /// Meshing interval count
    MeshInterval = 4,
    /// Meshing size
    MeshSize = 5,
    /// Firmness of the meshing size
    SizeFirmness = 6,
}

impl PresetTag {
    pub const ALL: [PresetTag; 6] = [
        Self::Name,
        Self::GlobalId,
        Self::UniqueId,
        Self::MeshInterval,
        Self::MeshSize,
        Self::SizeFirmness,
    ];

    /// Slot in the preset table (slot 0 is the sentinel)
    pub fn slot(self) -> usize {
        self as usize
    }

    pub fn from_slot(slot: usize) -> Option<Self> {
        Self::ALL.get(slot.checked_sub(1)?).copied()
    }

    pub fn tag_name(self) -> &'static str {
        match self {
            Self::Name => "NAME",
            Self::GlobalId => "GLOBAL_ID",
            Self::UniqueId => "UNIQUE_ID",
            Self::MeshInterval => "MESH_INTERVAL",
            Self::MeshSize => "MESH_SIZE",
            Self::SizeFirmness => "SIZE_FIRMNESS",
        }
    }

    pub fn value_type(self) -> TagValueType {
        match self {
            Self::Name | Self::SizeFirmness => TagValueType::Bytes,
            Self::GlobalId | Self::UniqueId | Self::MeshInterval => TagValueType::Integer,
            Self::MeshSize => TagValueType::Double,
        }
    }

    /// Only the display name can be written through the tag interface
    pub fn is_writable(self) -> bool {
        self == Self::Name
    }
}

/// A tag handle decoded into the namespace it addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagRef {
    Preset(PresetTag),
    /// Zero-based index into the user table
    User(usize),
}

/// Metadata of one tag
#[derive(Debug, Clone, PartialEq)]
pub struct TagDescriptor {
    pub name: String,
    /// Size in bytes of one value; fixed for the lifetime of the handle
    pub byte_length: usize,
    pub value_type: TagValueType,
    pub default_value: Option<Vec<u8>>,
    pub active: bool,
}

impl TagDescriptor {
    pub fn new(name: impl Into<String>, byte_length: usize, value_type: TagValueType) -> Self {
        Self {
            name: name.into(),
            byte_length,
            value_type,
            default_value: None,
            active: true,
        }
    }

    pub fn with_default(mut self, default_value: Vec<u8>) -> Self {
        self.default_value = Some(default_value);
        self
    }
}

/// Firmness of a meshing size as reported by the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum SizeFirmness {
    #[default]
    Limp = 0,
    Soft = 1,
    Hard = 2,
}
