//! Level-load error types.
//!
//! Everything that can go wrong happens before the first tick: a level map
//! with a missing or malformed key, a vehicle graph that would not fit its
//! fixed capacities, or a terrain raster that never became available.  Once a
//! [`crate::simulation::Simulation`] exists, ticking it cannot fail.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bevy::math::IVec2;
//! use grapple_rover::error::LevelResult;
//!
//! fn load(map: &HashMap<String, String>, raster: &Raster) -> LevelResult<Simulation> {
//!     let params = LevelParams::from_map(map)?;
//!     let terrain = TerrainField::classify(raster);
//!     Simulation::new(params, terrain, IVec2::new(800, 600))
//! }
//! ```

use std::fmt;

/// A level map that cannot produce a typed [`crate::config::LevelParams`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required key is absent from the level map.
    MissingKey {
        key: &'static str,
    },

    /// A required integer key holds something that does not parse as one.
    NotAnInteger {
        key: &'static str,
        value: String,
    },

    /// The key parsed, but the value would make the physics meaningless
    /// (zero-sized level, zero mass divisor, inverted winch range, ...).
    OutOfRange {
        key: &'static str,
        value: i64,
        expected: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingKey { key } => {
                write!(f, "level map is missing required key '{}'", key)
            }
            ConfigError::NotAnInteger { key, value } => {
                write!(f, "level key '{}' = '{}' is not an integer", key, value)
            }
            ConfigError::OutOfRange {
                key,
                value,
                expected,
            } => write!(
                f,
                "level key '{}' = {} is out of range (expected {})",
                key, value, expected
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// The vehicle graph would exceed one of its fixed capacities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyError {
    ParticleCapacity { capacity: usize },
    LinkCapacity { capacity: usize },
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyError::ParticleCapacity { capacity } => {
                write!(f, "vehicle particle capacity {} exceeded", capacity)
            }
            TopologyError::LinkCapacity { capacity } => {
                write!(f, "vehicle link capacity {} exceeded", capacity)
            }
        }
    }
}

impl std::error::Error for TopologyError {}

/// Top-level error for bringing a level up.
#[derive(Debug)]
pub enum LevelLoadError {
    Config(ConfigError),
    Topology(TopologyError),

    /// The terrain raster never finished loading (decode failure, missing
    /// file, or the wait on it was abandoned).
    RasterUnavailable {
        path: String,
        reason: String,
    },

    /// The raster's sample count or size disagrees with the level's declared
    /// dimensions.
    RasterSize {
        expected: (u32, u32),
        got: (u32, u32),
    },

    /// The decoded image is in a pixel format that cannot be read as RGB.
    UnsupportedRaster {
        path: String,
    },

    /// Reading a level map file failed.
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl fmt::Display for LevelLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelLoadError::Config(err) => write!(f, "configuration error: {}", err),
            LevelLoadError::Topology(err) => write!(f, "topology error: {}", err),
            LevelLoadError::RasterUnavailable { path, reason } => {
                write!(f, "terrain raster '{}' unavailable: {}", path, reason)
            }
            LevelLoadError::RasterSize { expected, got } => write!(
                f,
                "terrain raster is {}x{}, level declares {}x{}",
                got.0, got.1, expected.0, expected.1
            ),
            LevelLoadError::UnsupportedRaster { path } => {
                write!(f, "terrain raster '{}' has an unsupported pixel format", path)
            }
            LevelLoadError::Io { path, source } => {
                write!(f, "failed to read '{}': {}", path, source)
            }
        }
    }
}

impl std::error::Error for LevelLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LevelLoadError::Config(err) => Some(err),
            LevelLoadError::Topology(err) => Some(err),
            LevelLoadError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for LevelLoadError {
    fn from(err: ConfigError) -> Self {
        LevelLoadError::Config(err)
    }
}

impl From<TopologyError> for LevelLoadError {
    fn from(err: TopologyError) -> Self {
        LevelLoadError::Topology(err)
    }
}

/// Convenience alias: a `Result` using `LevelLoadError` as the error type.
pub type LevelResult<T> = Result<T, LevelLoadError>;
