//! Constraint solver and integrator.
//!
//! One tick of vehicle physics is, in order:
//!
//! 1. [`apply_engine`]: torque-like push on every rim particle about its hub.
//! 2. [`resolve_links`]: explicit Hookean velocity correction for every active
//!    link.
//! 3. [`integrate`]: gravity or buoyancy, friction, semi-implicit Euler, then a
//!    terrain check that either rolls the particle back or breaks a rope.
//!
//! The link formula keeps the level format's naming: `coefficient` is the
//! stiffness and `rest_length` the rest length.  For rope links the winch
//! changes the coefficient, not the rest length.
//!
//! [`apply_controls`] and [`mean_rim_velocity`] run at the very start of a
//! tick, before any force is applied.

use crate::config::LevelParams;
use crate::constants::{
    BUOYANCY_STEP, CAMERA_SAMPLE_COUNT, MAX_ROPE_SEGMENTS, ROPE_SLOT_COUNT, TURRET_STEP,
    WATER_NEUTRAL_BUOYANCY, WHEEL_COUNT, WHEEL_STRIDE,
};
use crate::input::TickInput;
use crate::terrain::{TerrainClass, TerrainField};
use crate::vehicle::{RopeState, Vehicle};
use bevy::log::debug;
use bevy::math::DVec2;

/// Apply the per-tick control scalars: rope slot selection, buoyancy and
/// turret angle.
pub fn apply_controls(vehicle: &mut Vehicle, input: &TickInput) {
    if let Some(slot) = input.select_rope {
        if slot < ROPE_SLOT_COUNT {
            vehicle.selected_rope = slot;
        }
    }

    if input.buoyancy_up {
        vehicle.buoyancy += BUOYANCY_STEP;
    }
    if input.buoyancy_down {
        vehicle.buoyancy -= BUOYANCY_STEP;
    }
    vehicle.buoyancy = vehicle.buoyancy.clamp(0.0, 1.0);

    if input.turret_left {
        vehicle.turret_angle -= TURRET_STEP;
    }
    if input.turret_right {
        vehicle.turret_angle += TURRET_STEP;
    }
}

/// Mean velocity of the first rim particles, used as the camera's lead.
pub fn mean_rim_velocity(vehicle: &Vehicle) -> DVec2 {
    let sum: DVec2 = vehicle
        .particles()
        .iter()
        .take(CAMERA_SAMPLE_COUNT)
        .map(|p| p.vel)
        .sum();
    sum / CAMERA_SAMPLE_COUNT as f64
}

/// Spin both wheels.  `sign` is `+1.0` for left, `-1.0` for right.
///
/// Each rim particle gets a velocity change perpendicular to its hub offset,
/// proportional to that offset.
pub fn apply_engine(vehicle: &mut Vehicle, engine_force: f64, sign: f64) {
    let force = engine_force * sign;
    let particles = vehicle.particles_mut();
    for wheel in 0..WHEEL_COUNT {
        let base = wheel * WHEEL_STRIDE;
        let hub = particles[base + MAX_ROPE_SEGMENTS].pos;
        for rim in &mut particles[base..base + MAX_ROPE_SEGMENTS] {
            let offset = rim.pos - hub;
            rim.vel.y -= offset.x * force;
            rim.vel.x += offset.y * force;
        }
    }
}

/// Apply one explicit correction per active link.
///
/// For link `(a, b)`: `Δ = pos[a] − pos[b]`,
/// `stretch = coefficient · (|Δ| − rest_length)`; `a` loses and `b` gains
/// `dt · stretch / mass · Δ/|Δ|` in velocity.  Coincident endpoints exert
/// nothing.
pub fn resolve_links(vehicle: &mut Vehicle, dt: f64) {
    for index in 0..vehicle.links().len() {
        let link = vehicle.links()[index];
        if !link.active {
            continue;
        }

        let particles = vehicle.particles_mut();
        let delta = particles[link.a].pos - particles[link.b].pos;
        let dist = delta.length();
        if dist <= f64::EPSILON {
            continue;
        }
        let stretch = link.coefficient * (dist - link.rest_length);
        let unit = delta / dist;

        let pa = &mut particles[link.a];
        pa.vel -= dt * (stretch / pa.mass_factor) * unit;
        let pb = &mut particles[link.b];
        pb.vel += dt * (stretch / pb.mass_factor) * unit;
    }
}

/// Move every active particle one step and check it against the terrain.
///
/// Returns the rope slots whose hook struck terrain this tick (and are now
/// [`RopeState::Broken`]).
pub fn integrate(
    vehicle: &mut Vehicle,
    terrain: &TerrainField,
    params: &LevelParams,
) -> Vec<usize> {
    let mut newly_broken = Vec::new();
    let buoyancy = vehicle.buoyancy;

    for index in 0..vehicle.particles().len() {
        let hook_state = vehicle
            .hook_slot(index)
            .map(|slot| (slot, vehicle.rope(slot).state));

        let particle = &mut vehicle.particles_mut()[index];
        if !particle.active {
            continue;
        }

        if terrain.sample(particle.pos) == TerrainClass::Water {
            particle.vel.y += (WATER_NEUTRAL_BUOYANCY - buoyancy) * params.dt * params.gravity;
            particle.vel *= params.friction_water;
        } else {
            particle.vel.y += params.dt * params.gravity;
            particle.vel *= params.friction_air;
        }

        let previous = particle.pos;
        let pinned = matches!(hook_state, Some((_, RopeState::Broken)));
        if !pinned {
            particle.pos += params.dt * particle.vel;
        }

        let blocked =
            !terrain.sample(particle.pos).is_passable() || !terrain.in_bounds(particle.pos);
        if !blocked {
            continue;
        }

        match hook_state {
            Some((slot, RopeState::Active)) => {
                debug!("rope {slot} hook lodged at {:?}", particle.pos);
                newly_broken.push(slot);
            }
            Some((_, RopeState::Broken)) => {}
            _ => {
                particle.pos = previous;
                particle.vel = DVec2::ZERO;
            }
        }
    }

    for &slot in &newly_broken {
        vehicle.ropes[slot].state = RopeState::Broken;
    }
    newly_broken
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_level_map;
    use crate::terrain::Raster;
    use crate::topology::build_vehicle;

    const AIR: [u8; 3] = [0xFF, 0xFF, 0xFF];
    const WATER: [u8; 3] = [0xA9, 0xD3, 0xFF];
    const GROUND: [u8; 3] = [0xA2, 0x68, 0x30];

    fn params() -> LevelParams {
        LevelParams::from_map(&default_level_map()).expect("default map is valid")
    }

    fn open_air(params: &LevelParams) -> TerrainField {
        TerrainField::classify(&Raster::filled(
            params.level_width as u32,
            params.level_height as u32,
            AIR,
        ))
    }

    fn momentum(vehicle: &Vehicle) -> DVec2 {
        vehicle
            .particles()
            .iter()
            .filter(|p| p.active)
            .map(|p| p.vel * p.mass_factor)
            .sum()
    }

    #[test]
    fn link_forces_conserve_momentum() {
        let p = params();
        let mut vehicle = build_vehicle(&p).unwrap();
        // Stretch the front wheel so many links are under tension.
        for particle in &mut vehicle.particles_mut()[11..21] {
            particle.pos.x += 3.0;
            particle.pos.y -= 1.5;
        }
        let before = momentum(&vehicle);
        resolve_links(&mut vehicle, p.dt);
        let after = momentum(&vehicle);
        assert!((after - before).length() < 1e-6, "{before:?} -> {after:?}");
        assert!(vehicle.particles()[11].vel.length() > 0.0);
    }

    #[test]
    fn relaxed_vehicle_feels_no_link_force() {
        let p = params();
        let mut vehicle = build_vehicle(&p).unwrap();
        resolve_links(&mut vehicle, p.dt);
        for particle in vehicle.particles() {
            assert!(particle.vel.length() < 1e-9);
        }
    }

    #[test]
    fn link_force_follows_explicit_formula() {
        let p = params();
        let mut vehicle = build_vehicle(&p).unwrap();
        // Isolate the body triangle's hub-to-hub link.
        for link in vehicle.links_mut() {
            link.active = false;
        }
        vehicle.links_mut()[62].active = true;
        let rest = vehicle.links()[62].rest_length;
        let coefficient = vehicle.links()[62].coefficient;
        vehicle.particles_mut()[21].pos.x += 2.0;

        resolve_links(&mut vehicle, p.dt);

        let stretch = coefficient * 2.0;
        let rear = vehicle.particles()[10];
        let front = vehicle.particles()[21];
        // Δ points from front to rear hub, so the unit vector is (-1, 0).
        assert!((rear.vel.x - p.dt * stretch / rear.mass_factor).abs() < 1e-9);
        assert!((front.vel.x + p.dt * stretch / front.mass_factor).abs() < 1e-9);
        assert!(rest > 0.0);
    }

    #[test]
    fn coincident_link_endpoints_are_skipped() {
        let p = params();
        let mut vehicle = build_vehicle(&p).unwrap();
        for link in vehicle.links_mut() {
            link.active = false;
        }
        vehicle.links_mut()[62].active = true;
        let hub = vehicle.particles()[10].pos;
        vehicle.particles_mut()[21].pos = hub;
        resolve_links(&mut vehicle, p.dt);
        assert!(vehicle.particles()[10].vel.x.is_finite());
        assert_eq!(vehicle.particles()[10].vel, DVec2::ZERO);
    }

    #[test]
    fn blocked_particle_rolls_back_and_stops() {
        let p = params();
        let mut raster = Raster::filled(p.level_width as u32, p.level_height as u32, AIR);
        let start = p.start;
        // Ground strip just below the vehicle's lowest rim particles.
        raster.fill_rect(0, start.y as u32 + 30, p.level_width as u32, p.level_height as u32, GROUND);
        let terrain = TerrainField::classify(&raster);
        let mut vehicle = build_vehicle(&p).unwrap();

        let rim = 2; // angle 2π/5, below the hub in raster coordinates
        let before = vehicle.particles()[rim].pos;
        vehicle.particles_mut()[rim].vel = DVec2::new(0.0, 400.0);
        integrate(&mut vehicle, &terrain, &p);

        assert_eq!(vehicle.particles()[rim].pos, before);
        assert_eq!(vehicle.particles()[rim].vel, DVec2::ZERO);
    }

    #[test]
    fn leaving_the_level_counts_as_blocked() {
        let mut p = params();
        p.gravity = 0.0;
        let terrain = open_air(&p);
        let mut vehicle = build_vehicle(&p).unwrap();
        vehicle.particles_mut()[0].pos = DVec2::new(0.1, 500.0);
        vehicle.particles_mut()[0].vel = DVec2::new(-100.0, 0.0);
        integrate(&mut vehicle, &terrain, &p);
        assert_eq!(vehicle.particles()[0].pos, DVec2::new(0.1, 500.0));
        assert_eq!(vehicle.particles()[0].vel, DVec2::ZERO);
    }

    #[test]
    fn active_hook_breaks_and_keeps_position() {
        let mut p = params();
        p.gravity = 0.0;
        let mut raster = Raster::filled(p.level_width as u32, p.level_height as u32, AIR);
        raster.fill_rect(0, 0, p.level_width as u32, 100, GROUND);
        let terrain = TerrainField::classify(&raster);
        let mut vehicle = build_vehicle(&p).unwrap();

        let hook = vehicle.rope(0).hook();
        vehicle.ropes[0].state = RopeState::Active;
        for index in vehicle.rope(0).particle_range() {
            vehicle.particles_mut()[index].active = true;
        }
        vehicle.particles_mut()[hook].pos = DVec2::new(500.0, 101.0);
        vehicle.particles_mut()[hook].vel = DVec2::new(0.0, -200.0);

        let broken = integrate(&mut vehicle, &terrain, &p);

        assert_eq!(broken, vec![0]);
        assert_eq!(vehicle.rope(0).state, RopeState::Broken);
        let pos = vehicle.particles()[hook].pos;
        assert!(pos.y < 100.0, "hook stays where it struck: {pos:?}");
        assert_eq!(vehicle.rope(1).state, RopeState::Inactive);
    }

    #[test]
    fn broken_hook_does_not_move() {
        let mut p = params();
        p.gravity = 0.0;
        let terrain = open_air(&p);
        let mut vehicle = build_vehicle(&p).unwrap();
        let hook = vehicle.rope(1).hook();
        vehicle.ropes[1].state = RopeState::Broken;
        for index in vehicle.rope(1).particle_range() {
            vehicle.particles_mut()[index].active = true;
        }
        vehicle.particles_mut()[hook].pos = DVec2::new(300.0, 300.0);
        vehicle.particles_mut()[hook].vel = DVec2::new(50.0, 50.0);

        let broken = integrate(&mut vehicle, &terrain, &p);

        assert!(broken.is_empty());
        assert_eq!(vehicle.particles()[hook].pos, DVec2::new(300.0, 300.0));
        assert_eq!(vehicle.rope(1).state, RopeState::Broken);
    }

    #[test]
    fn inactive_particles_are_not_integrated() {
        let p = params();
        let terrain = open_air(&p);
        let mut vehicle = build_vehicle(&p).unwrap();
        let segment = vehicle.rope(0).first_particle;
        let before = vehicle.particles()[segment];
        integrate(&mut vehicle, &terrain, &p);
        assert_eq!(vehicle.particles()[segment], before);
    }

    #[test]
    fn water_applies_buoyancy_and_water_friction() {
        let p = params();
        let terrain = TerrainField::classify(&Raster::filled(
            p.level_width as u32,
            p.level_height as u32,
            WATER,
        ));
        let mut vehicle = build_vehicle(&p).unwrap();
        vehicle.buoyancy = 1.0;
        integrate(&mut vehicle, &terrain, &p);
        let expected = (WATER_NEUTRAL_BUOYANCY - 1.0) * p.dt * p.gravity * p.friction_water;
        assert!((vehicle.particles()[22].vel.y - expected).abs() < 1e-12);
        assert!(vehicle.particles()[22].vel.y < 0.0, "full buoyancy floats upward");
    }

    #[test]
    fn air_applies_gravity_then_friction() {
        let p = params();
        let terrain = open_air(&p);
        let mut vehicle = build_vehicle(&p).unwrap();
        let before = vehicle.particles()[22].pos;
        integrate(&mut vehicle, &terrain, &p);
        let vy = p.dt * p.gravity * p.friction_air;
        assert!((vehicle.particles()[22].vel.y - vy).abs() < 1e-12);
        assert!((vehicle.particles()[22].pos.y - (before.y + p.dt * vy)).abs() < 1e-12);
    }

    #[test]
    fn engine_spins_wheels_in_opposite_directions_for_left_and_right() {
        let p = params();
        let mut left = build_vehicle(&p).unwrap();
        let mut right = left.clone();
        apply_engine(&mut left, p.engine_force, 1.0);
        apply_engine(&mut right, p.engine_force, -1.0);

        // Rim particle 0 sits right of its hub: (h.x − p.x) < 0.
        let radius = left.particles()[0].pos.x - left.particles()[10].pos.x;
        assert!((left.particles()[0].vel.y + radius * p.engine_force).abs() < 1e-9);
        assert_eq!(left.particles()[0].vel, -right.particles()[0].vel);
        // Hubs and body are untouched.
        for index in [10, 21, 22] {
            assert_eq!(left.particles()[index].vel, DVec2::ZERO);
        }
    }

    #[test]
    fn controls_clamp_buoyancy_and_turn_turret() {
        let p = params();
        let mut vehicle = build_vehicle(&p).unwrap();
        let up = TickInput {
            buoyancy_up: true,
            ..Default::default()
        };
        apply_controls(&mut vehicle, &up);
        assert_eq!(vehicle.buoyancy, 1.0);

        let down = TickInput {
            buoyancy_down: true,
            turret_right: true,
            select_rope: Some(1),
            ..Default::default()
        };
        for _ in 0..10 {
            apply_controls(&mut vehicle, &down);
        }
        assert_eq!(vehicle.buoyancy, 0.0);
        assert_eq!(vehicle.selected_rope, 1);
        assert!((vehicle.turret_angle - (crate::constants::INITIAL_TURRET_ANGLE + 1.0)).abs() < 1e-9);

        let bogus = TickInput {
            select_rope: Some(7),
            ..Default::default()
        };
        apply_controls(&mut vehicle, &bogus);
        assert_eq!(vehicle.selected_rope, 1);
    }

    #[test]
    fn mean_rim_velocity_averages_first_twenty() {
        let p = params();
        let mut vehicle = build_vehicle(&p).unwrap();
        for particle in &mut vehicle.particles_mut()[..CAMERA_SAMPLE_COUNT] {
            particle.vel = DVec2::new(2.0, -4.0);
        }
        vehicle.particles_mut()[22].vel = DVec2::new(1000.0, 1000.0);
        assert_eq!(mean_rim_velocity(&vehicle), DVec2::new(2.0, -4.0));
    }
}
