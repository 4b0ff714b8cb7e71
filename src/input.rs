//! Player input.
//!
//! ## Pipeline
//!
//! 1. [`keyboard_to_input_system`] (`Update`): latches key presses into
//!    [`PendingInput`].  One-shot triggers are OR-ed in until a tick drains
//!    them; held keys are sampled every frame.
//! 2. The fixed-tick system takes the pending [`TickInput`] with
//!    [`PendingInput::drain`], which clears the one-shot triggers.
//!
//! The core only ever sees a [`TickInput`], so tests build one directly.
//!
//! | Key        | Field                         |
//! |------------|-------------------------------|
//! | ← / →      | `left` / `right` (held)       |
//! | `D`        | `fire_hook`                   |
//! | `1` / `2`  | `select_rope`                 |
//! | `E` / `C`  | `wind_rope` / `unwind_rope`   |
//! | ↑ / ↓      | `buoyancy_up` / `buoyancy_down` |
//! | `S` / `F`  | `turret_left` / `turret_right`  |

use bevy::prelude::*;

/// Everything the player asked for during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    pub left: bool,
    pub right: bool,
    pub fire_hook: bool,
    pub wind_rope: bool,
    pub unwind_rope: bool,
    pub select_rope: Option<usize>,
    pub buoyancy_up: bool,
    pub buoyancy_down: bool,
    pub turret_left: bool,
    pub turret_right: bool,
}

impl TickInput {
    /// `+1` while left is held (left wins over right), `-1` for right.
    pub fn engine_sign(&self) -> Option<f64> {
        if self.left {
            Some(1.0)
        } else if self.right {
            Some(-1.0)
        } else {
            None
        }
    }
}

/// Input collected between fixed ticks.
#[derive(Resource, Debug, Default, Clone)]
pub struct PendingInput(pub TickInput);

impl PendingInput {
    /// Hand the collected input to a tick.  Held keys stay latched until the
    /// next keyboard sample; one-shot triggers are consumed.
    pub fn drain(&mut self) -> TickInput {
        let input = self.0;
        self.0 = TickInput {
            left: input.left,
            right: input.right,
            ..Default::default()
        };
        input
    }
}

pub fn keyboard_to_input_system(keys: Res<ButtonInput<KeyCode>>, mut pending: ResMut<PendingInput>) {
    let input = &mut pending.0;
    input.left = keys.pressed(KeyCode::ArrowLeft);
    input.right = keys.pressed(KeyCode::ArrowRight);

    input.fire_hook |= keys.just_pressed(KeyCode::KeyD);
    input.wind_rope |= keys.just_pressed(KeyCode::KeyE);
    input.unwind_rope |= keys.just_pressed(KeyCode::KeyC);
    input.buoyancy_up |= keys.just_pressed(KeyCode::ArrowUp);
    input.buoyancy_down |= keys.just_pressed(KeyCode::ArrowDown);
    input.turret_left |= keys.just_pressed(KeyCode::KeyS);
    input.turret_right |= keys.just_pressed(KeyCode::KeyF);

    if keys.just_pressed(KeyCode::Digit1) {
        input.select_rope = Some(0);
    } else if keys.just_pressed(KeyCode::Digit2) {
        input.select_rope = Some(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_wins_over_right() {
        let both = TickInput {
            left: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(both.engine_sign(), Some(1.0));
        let right = TickInput {
            right: true,
            ..Default::default()
        };
        assert_eq!(right.engine_sign(), Some(-1.0));
        assert_eq!(TickInput::default().engine_sign(), None);
    }

    #[test]
    fn drain_consumes_triggers_but_keeps_held_keys() {
        let mut pending = PendingInput(TickInput {
            left: true,
            fire_hook: true,
            select_rope: Some(1),
            ..Default::default()
        });
        let first = pending.drain();
        assert!(first.fire_hook);
        assert_eq!(first.select_rope, Some(1));

        let second = pending.drain();
        assert!(second.left);
        assert!(!second.fire_hook);
        assert_eq!(second.select_rope, None);
    }

    #[test]
    fn keyboard_system_latches_presses_until_drained() {
        let mut world = World::new();
        world.init_resource::<PendingInput>();
        let mut keys = ButtonInput::<KeyCode>::default();
        keys.press(KeyCode::KeyD);
        keys.press(KeyCode::ArrowRight);
        keys.press(KeyCode::Digit2);
        world.insert_resource(keys);

        let mut schedule = bevy::ecs::schedule::Schedule::default();
        schedule.add_systems(keyboard_to_input_system);
        schedule.run(&mut world);

        // A later frame with the trigger released keeps the latched fire.
        world.resource_mut::<ButtonInput<KeyCode>>().clear();
        schedule.run(&mut world);

        let input = world.resource_mut::<PendingInput>().drain();
        assert!(input.fire_hook);
        assert!(input.right);
        assert_eq!(input.select_rope, Some(1));
    }
}
