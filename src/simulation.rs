//! Simulation context and the fixed-tick plugin that drives it.
//!
//! [`Simulation`] owns one level's state: typed parameters, the terrain grid,
//! the vehicle arena, the camera and the goal timer.  [`Simulation::advance_tick`]
//! runs one tick to completion:
//!
//! | Phase | Work                                                   |
//! |-------|--------------------------------------------------------|
//! | 0     | rope slot select, buoyancy, turret                     |
//! | 1     | sample mean rim velocity for the camera lead           |
//! | 2     | rope transitions on the selected slot                  |
//! | 3     | engine                                                 |
//! | 4     | link forces                                            |
//! | 5     | integrate with terrain checks                          |
//! | 6     | camera follow                                          |
//! | 7     | advance the level clock, then the goal timer           |
//!
//! Everything observable that happened comes back as [`SimEvent`]s.  Ticking
//! a finished level is a no-op.

use crate::camera::CameraFollower;
use crate::config::LevelParams;
use crate::error::{LevelLoadError, LevelResult};
use crate::goal::{BestTimes, GoalOutcome, GoalTimer};
use crate::input::{keyboard_to_input_system, PendingInput, TickInput};
use crate::level::GameState;
use crate::physics::{apply_controls, apply_engine, integrate, mean_rim_velocity, resolve_links};
use crate::rope::{update_ropes, RopeEvent};
use crate::terrain::TerrainField;
use crate::topology::build_vehicle;
use crate::vehicle::Vehicle;
use bevy::math::{DVec2, IVec2};
use bevy::prelude::*;

/// Something the outside world may want to react to.
#[derive(Message, Debug, Clone, PartialEq)]
pub enum SimEvent {
    RopeDeployed { slot: usize },
    RopeRetracted { slot: usize },
    /// The rope's hook struck terrain and is now lodged.
    RopeBroken { slot: usize },
    GoalDwellStarted,
    GoalDwellAbandoned,
    GoalReached {
        level_key: String,
        seconds: u64,
        /// Whether `seconds` replaced the stored best time.
        new_best: bool,
    },
}

#[derive(Resource, Debug, Clone)]
pub struct Simulation {
    params: LevelParams,
    terrain: TerrainField,
    vehicle: Vehicle,
    camera: CameraFollower,
    goal: GoalTimer,
    elapsed_ms: u64,
    running: bool,
    ticks: u64,
}

impl Simulation {
    /// Bring a level up.  `screen` is the visible extent in pixels.
    pub fn new(params: LevelParams, terrain: TerrainField, screen: IVec2) -> LevelResult<Self> {
        if terrain.width() != params.level_width || terrain.height() != params.level_height {
            return Err(LevelLoadError::RasterSize {
                expected: (params.level_width as u32, params.level_height as u32),
                got: (terrain.width() as u32, terrain.height() as u32),
            });
        }

        let vehicle = build_vehicle(&params)?;
        let focus = vehicle.particles()[vehicle.camera_target()].pos;
        let camera = CameraFollower::new(
            focus,
            screen,
            IVec2::new(params.level_width, params.level_height),
        );
        let goal = GoalTimer::new(params.goal);

        Ok(Self {
            params,
            terrain,
            vehicle,
            camera,
            goal,
            elapsed_ms: 0,
            running: true,
            ticks: 0,
        })
    }

    /// Run one full tick.
    pub fn advance_tick(&mut self, input: &TickInput, best_times: &mut BestTimes) -> Vec<SimEvent> {
        let mut events = Vec::new();
        if !self.running {
            return events;
        }
        self.ticks += 1;

        apply_controls(&mut self.vehicle, input);
        let lead = mean_rim_velocity(&self.vehicle);

        match update_ropes(&mut self.vehicle, &self.params, input) {
            Some(RopeEvent::Deployed { slot }) => events.push(SimEvent::RopeDeployed { slot }),
            Some(RopeEvent::Retracted { slot }) => events.push(SimEvent::RopeRetracted { slot }),
            None => {}
        }

        if let Some(sign) = input.engine_sign() {
            apply_engine(&mut self.vehicle, self.params.engine_force, sign);
        }
        resolve_links(&mut self.vehicle, self.params.dt);
        for slot in integrate(&mut self.vehicle, &self.terrain, &self.params) {
            events.push(SimEvent::RopeBroken { slot });
        }

        let focus = self.vehicle.particles()[self.vehicle.camera_target()].pos;
        self.camera.follow(focus, lead);

        self.elapsed_ms += self.params.tick_millis;
        let nose = self.vehicle.nose().map(|index| self.vehicle.particles()[index].pos);
        match self.goal.tick(nose, self.elapsed_ms) {
            Some(GoalOutcome::DwellStarted) => events.push(SimEvent::GoalDwellStarted),
            Some(GoalOutcome::Abandoned) => events.push(SimEvent::GoalDwellAbandoned),
            Some(GoalOutcome::Reached) => {
                self.running = false;
                let seconds = self.level_seconds();
                let new_best = best_times.record(&self.params.level_key, seconds);
                info!(
                    "Level {} complete in {}s{}",
                    self.params.level_key,
                    seconds,
                    if new_best { " (new best)" } else { "" }
                );
                events.push(SimEvent::GoalReached {
                    level_key: self.params.level_key.clone(),
                    seconds,
                    new_best,
                });
            }
            Some(GoalOutcome::Outside) | Some(GoalOutcome::Dwelling { .. }) | None => {}
        }

        events
    }

    /// Top-left corner of the visible region, in raster coordinates.
    pub fn viewport(&self) -> IVec2 {
        self.camera.viewport()
    }

    /// Whole seconds since the level started.
    pub fn level_seconds(&self) -> u64 {
        self.elapsed_ms / 1000
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn params(&self) -> &LevelParams {
        &self.params
    }

    pub fn terrain(&self) -> &TerrainField {
        &self.terrain
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn goal_timer(&self) -> &GoalTimer {
        &self.goal
    }

    /// Body position, the turret pivot.
    pub fn turret_origin(&self) -> DVec2 {
        self.vehicle.particles()[self.vehicle.turret_anchor()].pos
    }
}

// ── Plugin ────────────────────────────────────────────────────────────────────

/// Registers [`SimEvent`], input latching and the fixed-tick driver.
///
/// The fixed timestep itself is set per level when the level finishes
/// loading.
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<SimEvent>()
            .init_resource::<PendingInput>()
            .init_resource::<BestTimes>()
            .add_systems(
                Update,
                keyboard_to_input_system.run_if(in_state(GameState::Playing)),
            )
            .add_systems(
                FixedUpdate,
                fixed_tick_system.run_if(in_state(GameState::Playing)),
            );
    }
}

/// Drain pending input into one simulation tick and publish its events.
pub fn fixed_tick_system(
    simulation: Option<ResMut<Simulation>>,
    mut pending: ResMut<PendingInput>,
    mut best_times: ResMut<BestTimes>,
    mut messages: MessageWriter<SimEvent>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Some(mut simulation) = simulation else {
        return;
    };

    let input = pending.drain();
    for event in simulation.advance_tick(&input, &mut best_times) {
        if matches!(event, SimEvent::GoalReached { .. }) {
            next_state.set(GameState::LevelComplete);
        }
        messages.write(event);
    }
}
