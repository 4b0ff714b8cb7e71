//! Builds the vehicle's particle/link graph from level parameters.
//!
//! Construction order is part of the level format: the nose, camera and rope
//! anchor indices documented in [`crate::vehicle`] fall out of it.
//!
//! 1. Two wheels, rear then front.  Each gets `MAX_ROPE_SEGMENTS` rim
//!    particles at angle `π·i/5` around its hub, a spoke link to the next rim
//!    particle, a cross-brace link three ahead, then the hub particle and a
//!    link from every rim particle to it.
//! 2. The body particle between the hubs, and the body triangle
//!    (rear hub–body, front hub–body, rear hub–front hub).
//! 3. Two rope chains of inactive segments hanging off the body.
//!
//! Rest lengths are captured from the raw layout.  Only then are positions
//! scaled by `scale_size` and moved to the start point, and every rest length
//! is scaled by the same factor so the two stay consistent.

use crate::config::LevelParams;
use crate::constants::{
    AXLE_SPACING, BRACE_STEP, INITIAL_BUOYANCY, INITIAL_TURRET_ANGLE, LINK_CAPACITY,
    MAX_ROPE_SEGMENTS, PARTICLE_CAPACITY, ROPE_SLOT_COUNT, WHEEL_COUNT, WHEEL_RADIUS,
    WHEEL_STRIDE,
};
use crate::error::TopologyError;
use crate::vehicle::{ColorTag, Particle, RopeSlot, RopeState, Vehicle};
use bevy::log::debug;
use bevy::math::DVec2;
use std::f64::consts::PI;

/// Build the standard vehicle for a level.
pub fn build_vehicle(params: &LevelParams) -> Result<Vehicle, TopologyError> {
    build_vehicle_with_capacity(params, PARTICLE_CAPACITY, LINK_CAPACITY)
}

/// Build into explicit capacities.  Anything smaller than the standard
/// capacities fails with a [`TopologyError`].
pub fn build_vehicle_with_capacity(
    params: &LevelParams,
    particle_capacity: usize,
    link_capacity: usize,
) -> Result<Vehicle, TopologyError> {
    let mut vehicle = Vehicle::with_capacity(particle_capacity, link_capacity);
    let mut hubs = [0usize; WHEEL_COUNT];

    for (wheel, hub_slot) in hubs.iter_mut().enumerate() {
        let hub_x = wheel as f64 * AXLE_SPACING;
        let base = wheel * WHEEL_STRIDE;

        for i in 0..MAX_ROPE_SEGMENTS {
            let angle = PI * (i as f64 / 5.0);
            vehicle.push_particle(particle(
                DVec2::new(
                    hub_x + WHEEL_RADIUS * angle.cos(),
                    WHEEL_RADIUS * angle.sin(),
                ),
                params.mass_wheels * params.scale_mass,
            ))?;
        }
        for i in 0..MAX_ROPE_SEGMENTS {
            let spoke = base + (i + 1) % MAX_ROPE_SEGMENTS;
            let brace = base + (i + BRACE_STEP) % MAX_ROPE_SEGMENTS;
            vehicle.push_link(base + i, spoke, params.wheel_coefficient, ColorTag::Wheel)?;
            vehicle.push_link(base + i, brace, params.wheel_coefficient, ColorTag::Wheel)?;
        }

        let hub = vehicle.push_particle(particle(
            DVec2::new(hub_x, 0.0),
            params.mass_axle * params.scale_mass,
        ))?;
        for i in 0..MAX_ROPE_SEGMENTS {
            vehicle.push_link(base + i, hub, params.wheel_coefficient, ColorTag::Wheel)?;
        }
        *hub_slot = hub;
    }

    let body = vehicle.push_particle(particle(
        DVec2::new(AXLE_SPACING / 2.0, 0.0),
        params.mass_corpus * params.scale_mass,
    ))?;
    let [rear_hub, front_hub] = hubs;
    vehicle.push_link(rear_hub, body, params.corpus_coefficient, ColorTag::Body)?;
    vehicle.push_link(front_hub, body, params.corpus_coefficient, ColorTag::Body)?;
    vehicle.push_link(rear_hub, front_hub, params.corpus_coefficient, ColorTag::Body)?;

    let rope_colors = [ColorTag::RopePrimary, ColorTag::RopeSecondary];
    let mut ropes = [RopeSlot {
        first_particle: 0,
        first_link: 0,
        state: RopeState::Inactive,
    }; ROPE_SLOT_COUNT];

    for (slot, rope) in ropes.iter_mut().enumerate() {
        rope.first_particle = vehicle.particles().len();
        rope.first_link = vehicle.links().len();

        for i in 0..MAX_ROPE_SEGMENTS {
            let mass = if i == MAX_ROPE_SEGMENTS - 1 {
                params.mass_hook
            } else {
                params.mass_rope
            };
            let mut segment = particle(DVec2::splat(i as f64), mass * params.scale_mass);
            segment.active = false;
            let index = vehicle.push_particle(segment)?;

            let previous = if i == 0 { body } else { index - 1 };
            let link = vehicle.push_link(previous, index, params.rope_min, rope_colors[slot])?;
            let link = &mut vehicle.links_mut()[link];
            link.rest_length = params.rope_rest_length;
            link.active = false;
        }
    }

    for p in vehicle.particles_mut() {
        p.pos = p.pos * params.scale_size + params.start;
    }
    for link in vehicle.links_mut() {
        link.rest_length *= params.scale_size;
    }

    vehicle.ropes = ropes;
    vehicle.nose = hubs;
    vehicle.camera_target = body;
    vehicle.turret_anchor = body;
    vehicle.buoyancy = INITIAL_BUOYANCY;
    vehicle.turret_angle = INITIAL_TURRET_ANGLE;
    vehicle.selected_rope = 0;

    debug!(
        "built vehicle: {} particles, {} links",
        vehicle.particles().len(),
        vehicle.links().len()
    );
    Ok(vehicle)
}

fn particle(pos: DVec2, mass_factor: f64) -> Particle {
    Particle {
        pos,
        vel: DVec2::ZERO,
        mass_factor,
        active: true,
        color: ColorTag::Hull,
    }
}
