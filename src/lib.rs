//! Grapple rover
//!
//! A side-view physics game: a two-wheeled particle-spring vehicle with twin
//! grapple ropes crosses a colour-classified raster level to reach a goal.
//!
//! The simulation core (`terrain`, `topology`, `physics`, `rope`, `camera`,
//! `goal`, `simulation`) is plain Rust and can be ticked headlessly.  The
//! Bevy plugins around it handle level loading, input, persistence and
//! drawing.

pub mod camera;
pub mod config;
pub mod constants;
pub mod error;
pub mod goal;
pub mod input;
pub mod level;
pub mod physics;
pub mod rendering;
pub mod rope;
pub mod save;
pub mod simulation;
pub mod terrain;
pub mod topology;
pub mod vehicle;
