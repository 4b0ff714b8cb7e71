//! The vehicle's particle/link arena.
//!
//! Particles and links live in fixed-capacity vectors and refer to each other
//! by index only.  The graph is populated once by
//! [`crate::topology::build_vehicle`] and never resized afterwards; ticks only
//! mutate positions, velocities, coefficients and `active` flags.
//!
//! ## Index layout
//!
//! | Range     | Contents                                   |
//! |-----------|--------------------------------------------|
//! | `0..10`   | rear wheel rim                             |
//! | `10`      | rear hub (nose corner)                     |
//! | `11..21`  | front wheel rim                            |
//! | `21`      | front hub (nose corner)                    |
//! | `22`      | body (camera target, turret anchor)        |
//! | `23..33`  | rope slot 0 segments, hook last            |
//! | `33..43`  | rope slot 1 segments, hook last            |

use crate::constants::{MAX_ROPE_SEGMENTS, ROPE_SLOT_COUNT};
use crate::error::TopologyError;
use bevy::math::DVec2;

/// Render-only colour tag for particles and links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorTag {
    /// Every particle.
    Hull,
    /// Wheel spokes, braces and hub links.
    Wheel,
    /// The body triangle.
    Body,
    RopePrimary,
    RopeSecondary,
}

impl ColorTag {
    pub fn rgb(self) -> [u8; 3] {
        match self {
            ColorTag::Hull => [0, 150, 0],
            ColorTag::Wheel => [255, 200, 50],
            ColorTag::Body => [255, 0, 0],
            ColorTag::RopePrimary => [0, 80, 185],
            ColorTag::RopeSecondary => [70, 170, 255],
        }
    }
}

/// A point mass ("connector").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub pos: DVec2,
    pub vel: DVec2,
    /// Divides every link impulse applied to this particle.
    pub mass_factor: f64,
    /// Inactive particles are neither integrated nor drawn.
    pub active: bool,
    pub color: ColorTag,
}

/// A force relationship between two particles ("vehicle part").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub a: usize,
    pub b: usize,
    /// Stiffness term.  For rope links this is the winch length.
    pub coefficient: f64,
    pub rest_length: f64,
    pub active: bool,
    pub color: ColorTag,
}

/// Lifecycle of one grapple rope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RopeState {
    /// Not simulated, not drawn.
    #[default]
    Inactive,
    /// Deployed; the hook flies freely.
    Active,
    /// The hook hit terrain and is pinned where it struck.  Still deployed:
    /// the rope keeps pulling and can be winched until retracted.
    Broken,
}

/// Where a rope slot's segments live in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RopeSlot {
    pub first_particle: usize,
    pub first_link: usize,
    pub state: RopeState,
}

impl RopeSlot {
    /// Particle indices of this rope, nearest the body first.
    pub fn particle_range(&self) -> std::ops::Range<usize> {
        self.first_particle..self.first_particle + MAX_ROPE_SEGMENTS
    }

    pub fn link_range(&self) -> std::ops::Range<usize> {
        self.first_link..self.first_link + MAX_ROPE_SEGMENTS
    }

    /// The hook: the rope's last segment.
    pub fn hook(&self) -> usize {
        self.first_particle + MAX_ROPE_SEGMENTS - 1
    }

    pub fn is_deployed(&self) -> bool {
        self.state != RopeState::Inactive
    }

    pub fn is_broken(&self) -> bool {
        self.state == RopeState::Broken
    }
}

/// The player vehicle: arena plus the few scalars the player steers.
#[derive(Debug, Clone)]
pub struct Vehicle {
    particles: Vec<Particle>,
    links: Vec<Link>,
    particle_capacity: usize,
    link_capacity: usize,
    pub(crate) ropes: [RopeSlot; ROPE_SLOT_COUNT],
    pub(crate) nose: [usize; 2],
    pub(crate) camera_target: usize,
    pub(crate) turret_anchor: usize,
    /// Submerged lift in `[0, 1]`.
    pub buoyancy: f64,
    /// Rope launch direction in radians (raster coordinates, y down).
    pub turret_angle: f64,
    /// Rope slot the rope controls act on.
    pub selected_rope: usize,
}

impl Vehicle {
    pub(crate) fn with_capacity(particle_capacity: usize, link_capacity: usize) -> Self {
        let unplaced = RopeSlot {
            first_particle: 0,
            first_link: 0,
            state: RopeState::Inactive,
        };
        Self {
            particles: Vec::with_capacity(particle_capacity),
            links: Vec::with_capacity(link_capacity),
            particle_capacity,
            link_capacity,
            ropes: [unplaced; ROPE_SLOT_COUNT],
            nose: [0, 0],
            camera_target: 0,
            turret_anchor: 0,
            buoyancy: 0.0,
            turret_angle: 0.0,
            selected_rope: 0,
        }
    }

    pub(crate) fn push_particle(&mut self, particle: Particle) -> Result<usize, TopologyError> {
        if self.particles.len() == self.particle_capacity {
            return Err(TopologyError::ParticleCapacity {
                capacity: self.particle_capacity,
            });
        }
        self.particles.push(particle);
        Ok(self.particles.len() - 1)
    }

    /// Add a link whose rest length is the particles' current distance.
    pub(crate) fn push_link(
        &mut self,
        a: usize,
        b: usize,
        coefficient: f64,
        color: ColorTag,
    ) -> Result<usize, TopologyError> {
        if self.links.len() == self.link_capacity {
            return Err(TopologyError::LinkCapacity {
                capacity: self.link_capacity,
            });
        }
        let rest_length = self.particles[a].pos.distance(self.particles[b].pos);
        self.links.push(Link {
            a,
            b,
            coefficient,
            rest_length,
            active: true,
            color,
        });
        Ok(self.links.len() - 1)
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn links_mut(&mut self) -> &mut [Link] {
        &mut self.links
    }

    pub fn rope(&self, slot: usize) -> &RopeSlot {
        &self.ropes[slot]
    }

    /// The two particles that must both sit in the goal.
    pub fn nose(&self) -> [usize; 2] {
        self.nose
    }

    pub fn camera_target(&self) -> usize {
        self.camera_target
    }

    pub fn turret_anchor(&self) -> usize {
        self.turret_anchor
    }

    /// The rope slot whose hook is particle `index`, if any.
    pub fn hook_slot(&self, index: usize) -> Option<usize> {
        self.ropes.iter().position(|rope| rope.hook() == index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle_at(x: f64, y: f64) -> Particle {
        Particle {
            pos: DVec2::new(x, y),
            vel: DVec2::ZERO,
            mass_factor: 1.0,
            active: true,
            color: ColorTag::Hull,
        }
    }

    #[test]
    fn link_rest_length_is_distance_at_creation() {
        let mut vehicle = Vehicle::with_capacity(2, 1);
        let a = vehicle.push_particle(particle_at(0.0, 0.0)).unwrap();
        let b = vehicle.push_particle(particle_at(3.0, 4.0)).unwrap();
        let link = vehicle.push_link(a, b, 1.0, ColorTag::Body).unwrap();
        assert_eq!(vehicle.links()[link].rest_length, 5.0);
    }

    #[test]
    fn capacities_are_enforced() {
        let mut vehicle = Vehicle::with_capacity(1, 0);
        vehicle.push_particle(particle_at(0.0, 0.0)).unwrap();
        assert_eq!(
            vehicle.push_particle(particle_at(1.0, 0.0)),
            Err(TopologyError::ParticleCapacity { capacity: 1 })
        );
        assert_eq!(
            vehicle.push_link(0, 0, 1.0, ColorTag::Body),
            Err(TopologyError::LinkCapacity { capacity: 0 })
        );
    }

    #[test]
    fn rope_slot_ranges_cover_max_segments() {
        let slot = RopeSlot {
            first_particle: 23,
            first_link: 63,
            state: RopeState::Broken,
        };
        assert_eq!(slot.particle_range(), 23..33);
        assert_eq!(slot.link_range(), 63..73);
        assert_eq!(slot.hook(), 32);
        assert!(slot.is_deployed());
        assert!(slot.is_broken());
    }
}
