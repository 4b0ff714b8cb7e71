//! Centralised physics and gameplay constants.
//!
//! Per-level tuning lives in the level map (see [`crate::config::LevelParams`]);
//! the values here are the fixed ones that shape the vehicle graph, the rope
//! mechanics and the camera.

// ── Vehicle topology ──────────────────────────────────────────────────────────

/// Segments per grapple rope.  Also the number of rim particles per wheel.
pub const MAX_ROPE_SEGMENTS: usize = 10;

/// Number of wheel assemblies.
pub const WHEEL_COUNT: usize = 2;

/// Number of independent rope slots.
pub const ROPE_SLOT_COUNT: usize = 2;

/// Particles in one wheel assembly (rim + hub).
pub const WHEEL_STRIDE: usize = MAX_ROPE_SEGMENTS + 1;

/// Wheel, hub and body particles.
pub const CHASSIS_PARTICLES: usize = WHEEL_COUNT * WHEEL_STRIDE + 1;

/// Fixed particle capacity of a vehicle.
pub const PARTICLE_CAPACITY: usize = CHASSIS_PARTICLES + ROPE_SLOT_COUNT * MAX_ROPE_SEGMENTS;

/// Links per wheel: one spoke, one cross-brace and one hub link per rim particle.
pub const LINKS_PER_WHEEL: usize = 3 * MAX_ROPE_SEGMENTS;

/// Fixed link capacity of a vehicle.
pub const LINK_CAPACITY: usize =
    WHEEL_COUNT * LINKS_PER_WHEEL + 3 + ROPE_SLOT_COUNT * MAX_ROPE_SEGMENTS;

/// Rim radius of a wheel before size scaling.
pub const WHEEL_RADIUS: f64 = 40.0;

/// Horizontal distance between the two hubs before size scaling.
pub const AXLE_SPACING: f64 = 80.0;

/// Cross-brace step: rim particle `i` braces to `i + 3`.
pub const BRACE_STEP: usize = 3;

// ── Rope mechanics ────────────────────────────────────────────────────────────

/// Spacing between freshly deployed rope segments along the turret direction.
pub const ROPE_DEPLOY_SPACING: f64 = 2.0;

/// Winch length multiplier applied by one wind input.
pub const WIND_FACTOR: f64 = 1.1;

/// Winch length multiplier applied by one unwind input.
pub const UNWIND_FACTOR: f64 = 0.9;

// ── Controls ──────────────────────────────────────────────────────────────────

/// Buoyancy change per up/down input.
pub const BUOYANCY_STEP: f64 = 0.15;

/// Buoyancy at spawn.
pub const INITIAL_BUOYANCY: f64 = 1.0;

/// Turret rotation per input (radians).
pub const TURRET_STEP: f64 = 0.1;

/// Turret angle at spawn: straight up in raster coordinates.
pub const INITIAL_TURRET_ANGLE: f64 = -std::f64::consts::FRAC_PI_2;

/// Submerged particles feel `(WATER_NEUTRAL_BUOYANCY - buoyancy) * g`.
pub const WATER_NEUTRAL_BUOYANCY: f64 = 0.5;

// ── Camera ────────────────────────────────────────────────────────────────────

/// Rim particles sampled for the camera lead (both wheels' rims).
pub const CAMERA_SAMPLE_COUNT: usize = 20;

/// Weight kept from the previous camera target each tick.
pub const CAMERA_SMOOTHING: f64 = 0.99;

/// Weight given to the freshly computed camera goal each tick.
pub const CAMERA_ADJUSTMENT: f64 = 0.01;

/// How far ahead of the vehicle (in mean-velocity units) the camera leads.
pub const CAMERA_VELOCITY_LEAD: f64 = 3.0;

// ── Goal ──────────────────────────────────────────────────────────────────────

/// Continuous time both nose particles must stay inside the goal rectangle.
pub const GOAL_DWELL_MS: u64 = 5000;

// ── Terrain colours (0xRRGGBB) ────────────────────────────────────────────────

pub const AIR_COLOR: u32 = 0xFF_FF_FF;
pub const WATER_COLOR: u32 = 0xA9_D3_FF;
pub const GROUND_COLOR: u32 = 0xA2_68_30;
pub const RESERVED_A_COLOR: u32 = 0x82_81_81;
pub const RESERVED_B_COLOR: u32 = 0x7A_6C_62;
