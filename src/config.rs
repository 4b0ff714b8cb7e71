//! Level physics configuration and application settings.
//!
//! Two layers, loaded at different times:
//!
//! - [`LevelParams`]: the typed, validated form of a level map (the flat
//!   `key=value` table every level ships with).  Built once per level by
//!   [`LevelParams::from_map`]; any missing or malformed key is a
//!   [`ConfigError`] and the level does not start.  There are no silent
//!   defaults at this layer.
//! - [`GameSettings`]: a Bevy [`Resource`] read from `assets/settings.toml`
//!   at startup.  Missing keys fall back to the compiled defaults, so a
//!   minimal TOML can override only what you care about.

use crate::error::ConfigError;
use bevy::math::DVec2;
use bevy::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;

/// Level map keys.  The names are the level format's, not ours.
pub mod keys {
    pub const LEVEL_WIDTH: &str = "Bild_w";
    pub const LEVEL_HEIGHT: &str = "Bild_h";
    pub const TERRAIN_IMAGE: &str = "Bild";
    pub const BACKDROP_IMAGE: &str = "Bild_c";
    pub const GOAL_X: &str = "GoalX";
    pub const GOAL_Y: &str = "GoalY";
    pub const GOAL_WIDTH: &str = "GoalWidth";
    pub const GOAL_HEIGHT: &str = "GoalHeight";
    pub const START_X: &str = "StartX";
    pub const START_Y: &str = "StartY";
    pub const SCALE_SIZE: &str = "scaleSize";
    pub const SCALE_FORCE: &str = "scaleF";
    pub const SCALE_MASS: &str = "scaleM";
    pub const MASS_HOOK: &str = "mHook";
    pub const MASS_ROPE: &str = "mRope";
    pub const MASS_WHEELS: &str = "mWheels";
    pub const MASS_AXLE: &str = "mAxis";
    pub const MASS_CORPUS: &str = "mCorpus";
    pub const ROPE_REST_LENGTH: &str = "l0Rope";
    pub const ROPE_LAUNCH_SPEED: &str = "v0Rope";
    pub const ROPE_MIN: &str = "FRopeMin";
    pub const ROPE_MAX: &str = "FRopeMax";
    pub const WHEEL_STIFFNESS: &str = "FWheels";
    pub const CORPUS_STIFFNESS: &str = "FCorpus";
    pub const ENGINE_FORCE: &str = "FEngine";
    pub const GRAVITY: &str = "Gravity";
    pub const TIMESTEP: &str = "dt";
    pub const TICK_DELAY: &str = "delay";
    pub const FRICTION_AIR: &str = "Reibung";
    pub const FRICTION_WATER: &str = "ReibungW";
}

/// The stock level map, as string pairs.
///
/// Handy for tests and as a template for new level files.
pub fn default_level_map() -> HashMap<String, String> {
    [
        (keys::LEVEL_WIDTH, "1600"),
        (keys::LEVEL_HEIGHT, "1200"),
        (keys::TERRAIN_IMAGE, "levels/long_f.png"),
        (keys::GOAL_X, "1485"),
        (keys::GOAL_Y, "370"),
        (keys::GOAL_WIDTH, "100"),
        (keys::GOAL_HEIGHT, "70"),
        (keys::START_X, "80"),
        (keys::START_Y, "1155"),
        (keys::SCALE_SIZE, "70"),
        (keys::SCALE_FORCE, "10"),
        (keys::SCALE_MASS, "100"),
        (keys::MASS_HOOK, "100"),
        (keys::MASS_ROPE, "50"),
        (keys::MASS_WHEELS, "100"),
        (keys::MASS_AXLE, "200"),
        (keys::MASS_CORPUS, "200"),
        (keys::ROPE_REST_LENGTH, "2"),
        (keys::ROPE_LAUNCH_SPEED, "1500"),
        (keys::ROPE_MIN, "100"),
        (keys::ROPE_MAX, "4000"),
        (keys::WHEEL_STIFFNESS, "5000"),
        (keys::CORPUS_STIFFNESS, "10000"),
        (keys::ENGINE_FORCE, "60"),
        (keys::GRAVITY, "70"),
        (keys::TIMESTEP, "25"),
        (keys::TICK_DELAY, "10"),
        (keys::FRICTION_AIR, "990"),
        (keys::FRICTION_WATER, "965"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Axis-aligned goal rectangle in raster coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl GoalRect {
    /// Half-open containment: `[x, x + width) × [y, y + height)`.
    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }
}

/// Typed physics constants for one level.
///
/// Raw level-map integers are converted here exactly once: percent keys are
/// divided by 100, hundredths by 100, thousandths by 1000.  Everything
/// downstream reads these fields and never re-parses strings.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelParams {
    /// Identity used for best-time records (the terrain image path).
    pub level_key: String,
    pub terrain_image: String,
    pub backdrop_image: Option<String>,

    pub level_width: i32,
    pub level_height: i32,
    pub start: DVec2,
    pub goal: GoalRect,

    pub scale_size: f64,
    pub scale_force: f64,
    pub scale_mass: f64,

    // Mass factors (force divisors) before `scale_mass`.
    pub mass_hook: f64,
    pub mass_rope: f64,
    pub mass_wheels: f64,
    pub mass_axle: f64,
    pub mass_corpus: f64,

    /// Rope link rest length before the final size scaling.
    pub rope_rest_length: f64,
    /// Speed given to the hook when a rope is fired.
    pub rope_launch_speed: f64,
    /// Winch length bounds (rope link coefficient).
    pub rope_min: f64,
    pub rope_max: f64,

    pub wheel_coefficient: f64,
    pub corpus_coefficient: f64,
    /// Per-tick engine torque factor applied to rim particles.
    pub engine_force: f64,

    pub gravity: f64,
    /// Integration step in seconds.
    pub dt: f64,
    /// Wall-clock milliseconds one tick stands for.
    pub tick_millis: u64,
    /// Per-tick velocity retention outside / inside water.
    pub friction_air: f64,
    pub friction_water: f64,
}

impl LevelParams {
    /// Validate and convert a level map.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let reader = MapReader { map };

        let level_width = reader.int_at_least(keys::LEVEL_WIDTH, 1, "> 0")?;
        let level_height = reader.int_at_least(keys::LEVEL_HEIGHT, 1, "> 0")?;

        let scale_size = 0.01 * reader.int_at_least(keys::SCALE_SIZE, 1, "> 0")? as f64;
        let scale_force = 0.01 * reader.int(keys::SCALE_FORCE)? as f64;
        let scale_mass = 0.01 * reader.int_at_least(keys::SCALE_MASS, 1, "> 0")? as f64;
        let dt = 0.001 * reader.int_at_least(keys::TIMESTEP, 1, "> 0")? as f64;

        let rope_min_raw = reader.int_at_least(keys::ROPE_MIN, 1, "> 0")?;
        let rope_max_raw = reader.int(keys::ROPE_MAX)?;
        if rope_max_raw < rope_min_raw {
            return Err(ConfigError::OutOfRange {
                key: keys::ROPE_MAX,
                value: rope_max_raw,
                expected: ">= FRopeMin",
            });
        }

        Ok(Self {
            level_key: reader.string(keys::TERRAIN_IMAGE)?,
            terrain_image: reader.string(keys::TERRAIN_IMAGE)?,
            backdrop_image: reader.optional_string(keys::BACKDROP_IMAGE),
            level_width: level_width as i32,
            level_height: level_height as i32,
            start: DVec2::new(
                reader.int(keys::START_X)? as f64,
                reader.int(keys::START_Y)? as f64,
            ),
            goal: GoalRect {
                x: reader.int(keys::GOAL_X)? as i32,
                y: reader.int(keys::GOAL_Y)? as i32,
                width: reader.int_at_least(keys::GOAL_WIDTH, 0, ">= 0")? as i32,
                height: reader.int_at_least(keys::GOAL_HEIGHT, 0, ">= 0")? as i32,
            },
            scale_size,
            scale_force,
            scale_mass,
            mass_hook: 0.01 * reader.int_at_least(keys::MASS_HOOK, 1, "> 0")? as f64,
            mass_rope: 0.01 * reader.int_at_least(keys::MASS_ROPE, 1, "> 0")? as f64,
            mass_wheels: 0.01 * reader.int_at_least(keys::MASS_WHEELS, 1, "> 0")? as f64,
            mass_axle: 0.01 * reader.int_at_least(keys::MASS_AXLE, 1, "> 0")? as f64,
            mass_corpus: 0.01 * reader.int_at_least(keys::MASS_CORPUS, 1, "> 0")? as f64,
            rope_rest_length: scale_size * reader.int(keys::ROPE_REST_LENGTH)? as f64,
            rope_launch_speed: scale_size * reader.int(keys::ROPE_LAUNCH_SPEED)? as f64,
            rope_min: scale_force * rope_min_raw as f64,
            rope_max: scale_force * rope_max_raw as f64,
            wheel_coefficient: scale_force * reader.int(keys::WHEEL_STIFFNESS)? as f64,
            corpus_coefficient: scale_force * reader.int(keys::CORPUS_STIFFNESS)? as f64,
            engine_force: 0.1 * scale_size * dt * reader.int(keys::ENGINE_FORCE)? as f64,
            gravity: reader.int(keys::GRAVITY)? as f64,
            dt,
            tick_millis: reader.int_at_least(keys::TICK_DELAY, 1, "> 0")? as u64,
            friction_air: 0.001 * reader.int_at_least(keys::FRICTION_AIR, 0, ">= 0")? as f64,
            friction_water: 0.001 * reader.int_at_least(keys::FRICTION_WATER, 0, ">= 0")? as f64,
        })
    }
}

struct MapReader<'a> {
    map: &'a HashMap<String, String>,
}

impl MapReader<'_> {
    fn string(&self, key: &'static str) -> Result<String, ConfigError> {
        self.map
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingKey { key })
    }

    fn optional_string(&self, key: &'static str) -> Option<String> {
        self.map
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn int(&self, key: &'static str) -> Result<i64, ConfigError> {
        let raw = self.map.get(key).ok_or(ConfigError::MissingKey { key })?;
        raw.trim()
            .parse::<i32>()
            .map(i64::from)
            .map_err(|_| ConfigError::NotAnInteger {
                key,
                value: raw.clone(),
            })
    }

    fn int_at_least(
        &self,
        key: &'static str,
        min: i64,
        expected: &'static str,
    ) -> Result<i64, ConfigError> {
        let value = self.int(key)?;
        if value < min {
            return Err(ConfigError::OutOfRange {
                key,
                value,
                expected,
            });
        }
        Ok(value)
    }
}

// ── Application settings ──────────────────────────────────────────────────────

/// Runtime settings for the game shell, loaded from `assets/settings.toml`.
#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub screen_width: u32,
    pub screen_height: u32,
    /// Directory scanned for `*.map` level files.
    pub levels_dir: String,
    /// Where best level times are persisted.
    pub best_times_file: String,
    /// Index into the sorted level list to start from.
    pub first_level: usize,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            screen_width: 800,
            screen_height: 600,
            levels_dir: "levels".to_string(),
            best_times_file: "best_times.toml".to_string(),
            first_level: 0,
        }
    }
}

impl GameSettings {
    pub const PATH: &'static str = "assets/settings.toml";

    /// Read settings from `path`, falling back to defaults.
    ///
    /// Runs before the app (and its log subscriber) exists, so it reports to
    /// stdout/stderr directly.  A missing file is not an error.  A malformed
    /// one is reported and ignored.
    pub fn load_or_default(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse_or_default(&contents, path),
            Err(_) => {
                println!("[SETUP] No {path} found; using compiled defaults");
                Self::default()
            }
        }
    }

    fn parse_or_default(contents: &str, path: &str) -> Self {
        match toml::from_str::<GameSettings>(contents) {
            Ok(settings) => {
                println!("[SETUP] Loaded settings from {path}");
                settings
            }
            Err(e) => {
                eprintln!("[SETUP] Failed to parse {path}: {e}; using defaults");
                Self::default()
            }
        }
    }
}
