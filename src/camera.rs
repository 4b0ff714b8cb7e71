//! Smoothed viewport that trails the vehicle body.

use crate::constants::{CAMERA_ADJUSTMENT, CAMERA_SMOOTHING, CAMERA_VELOCITY_LEAD};
use bevy::math::{DVec2, IVec2};

#[derive(Debug, Clone, PartialEq)]
pub struct CameraFollower {
    target: DVec2,
    viewport: IVec2,
    screen: IVec2,
    level: IVec2,
}

impl CameraFollower {
    /// Centre the camera on `focus`, with no smoothing applied yet.
    pub fn new(focus: DVec2, screen: IVec2, level: IVec2) -> Self {
        let mut camera = Self {
            target: focus - screen.as_dvec2() / 2.0,
            viewport: IVec2::ZERO,
            screen,
            level,
        };
        camera.viewport = camera.clamped();
        camera
    }

    /// Ease the target toward `focus + 3·lead − screen/2` and recompute the
    /// clamped viewport.
    pub fn follow(&mut self, focus: DVec2, lead: DVec2) {
        let half_screen = (self.screen / 2).as_dvec2();
        let goal = focus + CAMERA_VELOCITY_LEAD * lead - half_screen;
        self.target = CAMERA_SMOOTHING * self.target + CAMERA_ADJUSTMENT * goal;
        self.viewport = self.clamped();
    }

    /// Integer top-left corner of the visible region, in raster coordinates.
    pub fn viewport(&self) -> IVec2 {
        self.viewport
    }

    pub fn target(&self) -> DVec2 {
        self.target
    }

    fn clamped(&self) -> IVec2 {
        let max = (self.level - self.screen).max(IVec2::ZERO);
        self.target.as_ivec2().clamp(IVec2::ZERO, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: IVec2 = IVec2::new(800, 600);
    const LEVEL: IVec2 = IVec2::new(1600, 1200);

    #[test]
    fn starts_centred_on_focus() {
        let camera = CameraFollower::new(DVec2::new(900.0, 700.0), SCREEN, LEVEL);
        assert_eq!(camera.viewport(), IVec2::new(500, 400));
    }

    #[test]
    fn viewport_is_clamped_to_level() {
        let near_origin = CameraFollower::new(DVec2::new(10.0, 10.0), SCREEN, LEVEL);
        assert_eq!(near_origin.viewport(), IVec2::ZERO);

        let far_corner = CameraFollower::new(DVec2::new(1590.0, 1190.0), SCREEN, LEVEL);
        assert_eq!(far_corner.viewport(), IVec2::new(800, 600));
    }

    #[test]
    fn small_level_pins_viewport_at_origin() {
        let camera = CameraFollower::new(DVec2::new(300.0, 200.0), SCREEN, IVec2::new(400, 300));
        assert_eq!(camera.viewport(), IVec2::ZERO);
    }

    #[test]
    fn follow_blends_one_percent_per_tick() {
        let mut camera = CameraFollower::new(DVec2::new(900.0, 700.0), SCREEN, LEVEL);
        camera.follow(DVec2::new(1000.0, 700.0), DVec2::new(10.0, 0.0));
        // goal.x = 1000 + 30 − 400 = 630; target.x = 0.99·500 + 0.01·630.
        assert!((camera.target().x - 501.3).abs() < 1e-9);
        assert!((camera.target().y - 400.0).abs() < 1e-9);
        assert_eq!(camera.viewport().x, 501);
    }

    #[test]
    fn stationary_focus_is_a_fixed_point() {
        let focus = DVec2::new(900.0, 700.0);
        let mut camera = CameraFollower::new(focus, SCREEN, LEVEL);
        for _ in 0..1000 {
            camera.follow(focus, DVec2::ZERO);
        }
        assert!((camera.target() - DVec2::new(500.0, 400.0)).length() < 1e-6);
    }
}
