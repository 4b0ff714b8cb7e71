//! Grapple rope state machine.
//!
//! Each slot is `Inactive`, `Active` or `Broken`.  Every tick the selected
//! slot goes through, in order: retract, wind, unwind, deploy.  A fire
//! trigger consumed by a retract cannot also deploy in the same tick.
//!
//! `Active → Broken` happens in the integrator when the hook strikes terrain.
//! A broken rope is still deployed: its hook stays lodged, the winch still
//! works, and firing again retracts it.

use crate::config::LevelParams;
use crate::constants::{ROPE_DEPLOY_SPACING, UNWIND_FACTOR, WIND_FACTOR};
use crate::input::TickInput;
use crate::vehicle::{RopeState, Vehicle};
use bevy::math::DVec2;

/// A rope transition that happened during the rope phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RopeEvent {
    Deployed { slot: usize },
    Retracted { slot: usize },
}

/// Run the rope phase for the selected slot.
pub fn update_ropes(
    vehicle: &mut Vehicle,
    params: &LevelParams,
    input: &TickInput,
) -> Option<RopeEvent> {
    let slot = vehicle.selected_rope;
    let mut fire = input.fire_hook;
    let mut event = None;

    if fire && vehicle.rope(slot).is_deployed() {
        retract(vehicle, slot);
        fire = false;
        event = Some(RopeEvent::Retracted { slot });
    }
    if input.wind_rope && vehicle.rope(slot).is_deployed() {
        wind(vehicle, slot, params.rope_max);
    }
    if input.unwind_rope && vehicle.rope(slot).is_deployed() {
        unwind(vehicle, slot, params.rope_min);
    }
    if fire && vehicle.rope(slot).state == RopeState::Inactive {
        deploy(vehicle, slot, params);
        event = Some(RopeEvent::Deployed { slot });
    }
    event
}

/// Deactivate the slot's particles and links.
pub fn retract(vehicle: &mut Vehicle, slot: usize) {
    let rope = *vehicle.rope(slot);
    for particle in &mut vehicle.particles_mut()[rope.particle_range()] {
        particle.active = false;
    }
    for link in &mut vehicle.links_mut()[rope.link_range()] {
        link.active = false;
    }
    vehicle.ropes[slot].state = RopeState::Inactive;
}

/// Lay the rope out along the turret and launch the hook.
///
/// Segment `n` goes to `anchor + 2(n + 1)·(cos θ, sin θ)`.  Only the hook
/// carries velocity afterwards.
pub fn deploy(vehicle: &mut Vehicle, slot: usize, params: &LevelParams) {
    let rope = *vehicle.rope(slot);
    let anchor = vehicle.particles()[vehicle.turret_anchor()].pos;
    let direction = DVec2::from_angle(vehicle.turret_angle);
    let hook = rope.hook();

    for (n, index) in rope.particle_range().enumerate() {
        let particle = &mut vehicle.particles_mut()[index];
        particle.active = true;
        particle.pos = anchor + ROPE_DEPLOY_SPACING * (n + 1) as f64 * direction;
        particle.vel = if index == hook {
            params.rope_launch_speed * direction
        } else {
            DVec2::ZERO
        };
    }
    for link in &mut vehicle.links_mut()[rope.link_range()] {
        link.active = true;
        link.coefficient = params.rope_min;
    }
    vehicle.ropes[slot].state = RopeState::Active;
}

/// Tighten the winch: every rope link's coefficient grows by 10%, up to `max`.
pub fn wind(vehicle: &mut Vehicle, slot: usize, max: f64) {
    let range = vehicle.rope(slot).link_range();
    for link in &mut vehicle.links_mut()[range] {
        link.coefficient = (link.coefficient * WIND_FACTOR).min(max);
    }
}

/// Slacken the winch: every rope link's coefficient shrinks by 10%, down to `min`.
pub fn unwind(vehicle: &mut Vehicle, slot: usize, min: f64) {
    let range = vehicle.rope(slot).link_range();
    for link in &mut vehicle.links_mut()[range] {
        link.coefficient = (link.coefficient * UNWIND_FACTOR).max(min);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_level_map;
    use crate::constants::MAX_ROPE_SEGMENTS;
    use crate::topology::build_vehicle;

    fn setup() -> (Vehicle, LevelParams) {
        let params = LevelParams::from_map(&default_level_map()).expect("default map is valid");
        (build_vehicle(&params).unwrap(), params)
    }

    fn fire() -> TickInput {
        TickInput {
            fire_hook: true,
            ..Default::default()
        }
    }

    #[test]
    fn fire_deploys_along_turret() {
        let (mut vehicle, params) = setup();
        vehicle.turret_angle = 0.3;
        let anchor = vehicle.particles()[22].pos;

        let event = update_ropes(&mut vehicle, &params, &fire());

        assert_eq!(event, Some(RopeEvent::Deployed { slot: 0 }));
        assert_eq!(vehicle.rope(0).state, RopeState::Active);
        let direction = DVec2::new(0.3f64.cos(), 0.3f64.sin());
        let rope = *vehicle.rope(0);
        for (n, index) in rope.particle_range().enumerate() {
            let p = vehicle.particles()[index];
            assert!(p.active);
            let expected = anchor + 2.0 * (n + 1) as f64 * direction;
            assert!((p.pos - expected).length() < 1e-9, "segment {n}");
            if index == rope.hook() {
                assert!((p.vel.length() - params.rope_launch_speed).abs() < 1e-9);
                assert!((p.vel.normalize() - direction).length() < 1e-9);
            } else {
                assert_eq!(p.vel, DVec2::ZERO);
            }
        }
        for link in &vehicle.links()[rope.link_range()] {
            assert!(link.active);
            assert_eq!(link.coefficient, params.rope_min);
        }
        assert_eq!(vehicle.rope(1).state, RopeState::Inactive);
    }

    #[test]
    fn fire_while_deployed_retracts_exactly_one_rope() {
        let (mut vehicle, params) = setup();
        update_ropes(&mut vehicle, &params, &fire());
        vehicle.selected_rope = 1;
        update_ropes(&mut vehicle, &params, &fire());
        vehicle.selected_rope = 0;

        let event = update_ropes(&mut vehicle, &params, &fire());

        assert_eq!(event, Some(RopeEvent::Retracted { slot: 0 }));
        assert_eq!(vehicle.rope(0).state, RopeState::Inactive);
        let inactive_particles = vehicle.particles().iter().filter(|p| !p.active).count();
        let inactive_links = vehicle.links().iter().filter(|l| !l.active).count();
        assert_eq!(inactive_particles, MAX_ROPE_SEGMENTS);
        assert_eq!(inactive_links, MAX_ROPE_SEGMENTS);
        assert_eq!(vehicle.rope(1).state, RopeState::Active);
    }

    #[test]
    fn broken_rope_retracts_and_does_not_redeploy_same_tick() {
        let (mut vehicle, params) = setup();
        update_ropes(&mut vehicle, &params, &fire());
        vehicle.ropes[0].state = RopeState::Broken;

        let event = update_ropes(&mut vehicle, &params, &fire());
        assert_eq!(event, Some(RopeEvent::Retracted { slot: 0 }));
        assert_eq!(vehicle.rope(0).state, RopeState::Inactive);

        let event = update_ropes(&mut vehicle, &params, &fire());
        assert_eq!(event, Some(RopeEvent::Deployed { slot: 0 }));
    }

    #[test]
    fn winch_respects_bounds() {
        let (mut vehicle, params) = setup();
        update_ropes(&mut vehicle, &params, &fire());
        let range = vehicle.rope(0).link_range();

        let wind_input = TickInput {
            wind_rope: true,
            ..Default::default()
        };
        update_ropes(&mut vehicle, &params, &wind_input);
        for link in &vehicle.links()[range.clone()] {
            assert!((link.coefficient - params.rope_min * WIND_FACTOR).abs() < 1e-9);
        }
        for _ in 0..200 {
            update_ropes(&mut vehicle, &params, &wind_input);
        }
        for link in &vehicle.links()[range.clone()] {
            assert_eq!(link.coefficient, params.rope_max);
        }

        let unwind_input = TickInput {
            unwind_rope: true,
            ..Default::default()
        };
        for _ in 0..200 {
            update_ropes(&mut vehicle, &params, &unwind_input);
        }
        for link in &vehicle.links()[range] {
            assert_eq!(link.coefficient, params.rope_min);
        }
    }

    #[test]
    fn winch_ignores_undeployed_rope() {
        let (mut vehicle, params) = setup();
        let input = TickInput {
            wind_rope: true,
            ..Default::default()
        };
        update_ropes(&mut vehicle, &params, &input);
        let range = vehicle.rope(0).link_range();
        for link in &vehicle.links()[range] {
            assert_eq!(link.coefficient, params.rope_min);
        }
    }

    #[test]
    fn broken_rope_can_still_be_wound() {
        let (mut vehicle, params) = setup();
        update_ropes(&mut vehicle, &params, &fire());
        vehicle.ropes[0].state = RopeState::Broken;
        let input = TickInput {
            wind_rope: true,
            ..Default::default()
        };
        update_ropes(&mut vehicle, &params, &input);
        let first = vehicle.rope(0).first_link;
        assert!(vehicle.links()[first].coefficient > params.rope_min);
    }

    #[test]
    fn rope_controls_follow_selected_slot() {
        let (mut vehicle, params) = setup();
        vehicle.selected_rope = 1;
        update_ropes(&mut vehicle, &params, &fire());
        assert_eq!(vehicle.rope(0).state, RopeState::Inactive);
        assert_eq!(vehicle.rope(1).state, RopeState::Active);
    }
}
