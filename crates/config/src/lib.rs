//! Session configuration for the iGeom tag layer
//!
//! This crate provides the single source of truth for the reserved names and
//! sizes a geometry session uses: which kernel engine to start, what the
//! interface group is called, and which marker identifies persisted tag
//! attributes.

use serde::{Deserialize, Serialize};

/// Environment variable consulted by [`SessionConfig::from_env`]
pub const ENGINE_ENV_VAR: &str = "IGEOM_ENGINE";

/// Default name of the model-level group that receives untargeted tag data
pub const DEFAULT_INTERFACE_GROUP_NAME: &str = "__IGEOM_INTERFACE_GROUP";

/// Default type marker written as the first string of a tag attribute record
pub const DEFAULT_ATTRIBUTE_MARKER: &str = "ITAPS_TAG";

/// Default byte length of the `NAME` preset tag
pub const DEFAULT_NAME_TAG_LENGTH: usize = 32;

/// Errors that can occur while reading session options
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Malformed option: {0:?}")]
    MalformedOption(String),
    #[error("Option {0:?} has an empty value")]
    EmptyValue(String),
    #[error("Name tag length must be non-zero")]
    ZeroNameLength,
}

/// Configuration for one geometry session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Kernel engine requested by the caller (`ACIS`, `OCC`, ...); `None` lets
    /// the kernel pick its default
    pub engine: Option<String>,
    /// Reserved name of the interface group
    pub interface_group_name: String,
    /// Type marker of persisted tag attribute records
    pub attribute_marker: String,
    /// Byte length of the `NAME` preset
    pub name_tag_length: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            engine: None,
            interface_group_name: DEFAULT_INTERFACE_GROUP_NAME.to_string(),
            attribute_marker: DEFAULT_ATTRIBUTE_MARKER.to_string(),
            name_tag_length: DEFAULT_NAME_TAG_LENGTH,
        }
    }
}

impl SessionConfig {
    /// Parse an iGeom option string on top of the defaults.
    ///
    /// The first character of the string is the delimiter, e.g.
    /// `";engine=OCC;"` or `"|engine=ACIS|interface_group=G"`.
    pub fn from_options(options: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_options(options)?;
        Ok(config)
    }

    /// Read the engine selection from [`ENGINE_ENV_VAR`]
    pub fn from_env() -> Self {
        Self::with_engine(std::env::var(ENGINE_ENV_VAR).ok().as_deref())
    }

    /// Defaults with `engine` selected; blank values leave the choice to the kernel
    pub fn with_engine(engine: Option<&str>) -> Self {
        let engine = engine.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string);
        Self {
            engine,
            ..Self::default()
        }
    }

    /// Overlay an option string onto this configuration
    pub fn apply_options(&mut self, options: &str) -> Result<(), ConfigError> {
        let mut chars = options.chars();
        let Some(delimiter) = chars.next() else {
            return Ok(());
        };

        for segment in chars.as_str().split(delimiter) {
            if segment.is_empty() {
                continue;
            }
            let Some((key, value)) = segment.split_once('=') else {
                return Err(ConfigError::MalformedOption(segment.to_string()));
            };
            let key = key.trim();
            let value = value.trim();
            if value.is_empty() {
                return Err(ConfigError::EmptyValue(key.to_string()));
            }
            match key {
                "engine" => self.engine = Some(value.to_string()),
                "interface_group" => self.interface_group_name = value.to_string(),
                "attribute_marker" => self.attribute_marker = value.to_string(),
                "name_length" => {
                    let length = value
                        .parse::<usize>()
                        .map_err(|_| ConfigError::MalformedOption(segment.to_string()))?;
                    if length == 0 {
                        return Err(ConfigError::ZeroNameLength);
                    }
                    self.name_tag_length = length;
                }
                other => tracing::debug!("Ignoring unknown session option {:?}", other),
            }
        }
        Ok(())
    }
}
