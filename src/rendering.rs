//! Drawing the level, the vehicle and the HUD.
//!
//! The simulation works in raster coordinates (origin top-left, y down).
//! Bevy's world has y up, so every raster point `(x, y)` is drawn at world
//! `(x, -y)`.  The level sprite is placed so its top-left pixel lands on the
//! world origin.
//!
//! Gizmos are immediate-mode: each frame every link and particle is redrawn
//! from the current [`Simulation`] state.

use crate::config::GameSettings;
use crate::goal::BestTimes;
use crate::level::{GameState, LevelAssets, LevelLoadFailure};
use crate::simulation::Simulation;
use crate::vehicle::ColorTag;
use bevy::math::DVec2;
use bevy::prelude::*;

const PARTICLE_RADIUS: f32 = 2.0;
const TURRET_LENGTH: f64 = 10.0;

/// Marker for the HUD text line.
#[derive(Component)]
pub struct HudText;

/// Marker for the level's background sprite; despawned between levels.
#[derive(Component)]
pub struct LevelSprite;

pub struct RenderingPlugin;

impl Plugin for RenderingPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, (setup_camera, setup_hud))
            .add_systems(OnEnter(GameState::LoadingLevel), despawn_level_sprites)
            .add_systems(OnEnter(GameState::Playing), spawn_level_sprite)
            .add_systems(
                Update,
                (camera_follow_system, draw_vehicle_system)
                    .run_if(resource_exists::<Simulation>),
            )
            .add_systems(Update, hud_text_system);
    }
}

/// Raster coordinates to Bevy world coordinates.
#[inline]
pub fn raster_to_world(pos: DVec2) -> Vec2 {
    Vec2::new(pos.x as f32, -pos.y as f32)
}

fn tag_color(tag: ColorTag) -> Color {
    let [r, g, b] = tag.rgb();
    Color::srgb_u8(r, g, b)
}

pub fn setup_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

pub fn setup_hud(mut commands: Commands) {
    commands
        .spawn(Node {
            position_type: PositionType::Absolute,
            left: Val::Px(10.0),
            top: Val::Px(10.0),
            ..default()
        })
        .with_children(|parent| {
            parent.spawn((
                Text::new(""),
                TextFont {
                    font_size: 18.0,
                    ..default()
                },
                TextColor(Color::BLACK),
                HudText,
            ));
        });
}

pub fn despawn_level_sprites(mut commands: Commands, sprites: Query<Entity, With<LevelSprite>>) {
    for entity in &sprites {
        commands.entity(entity).despawn();
    }
}

/// Show the backdrop image if the level has one, otherwise the terrain raster.
pub fn spawn_level_sprite(
    mut commands: Commands,
    level_assets: Option<Res<LevelAssets>>,
    simulation: Option<Res<Simulation>>,
) {
    let (Some(level_assets), Some(simulation)) = (level_assets, simulation) else {
        return;
    };
    let params = simulation.params();
    let image = level_assets
        .backdrop
        .clone()
        .unwrap_or_else(|| level_assets.terrain.clone());
    let centre = Vec2::new(
        params.level_width as f32 / 2.0,
        -(params.level_height as f32) / 2.0,
    );

    commands.spawn((
        Sprite::from_image(image),
        Transform::from_translation(centre.extend(-1.0)),
        LevelSprite,
    ));
}

/// Centre the camera on the simulation's viewport.
pub fn camera_follow_system(
    simulation: Res<Simulation>,
    settings: Res<GameSettings>,
    mut cameras: Query<&mut Transform, With<Camera2d>>,
) {
    let Ok(mut transform) = cameras.single_mut() else {
        return;
    };
    let viewport = simulation.viewport().as_dvec2();
    let half_screen = DVec2::new(
        settings.screen_width as f64 / 2.0,
        settings.screen_height as f64 / 2.0,
    );
    let centre = raster_to_world(viewport + half_screen);
    transform.translation.x = centre.x;
    transform.translation.y = centre.y;
}

/// Draw links, particles, the turret and the goal rectangle.
pub fn draw_vehicle_system(simulation: Res<Simulation>, mut gizmos: Gizmos) {
    let vehicle = simulation.vehicle();
    let particles = vehicle.particles();

    for link in vehicle.links().iter().filter(|l| l.active) {
        gizmos.line_2d(
            raster_to_world(particles[link.a].pos),
            raster_to_world(particles[link.b].pos),
            tag_color(link.color),
        );
    }
    for particle in particles.iter().filter(|p| p.active) {
        gizmos.circle_2d(
            raster_to_world(particle.pos),
            PARTICLE_RADIUS,
            tag_color(particle.color),
        );
    }

    let origin = simulation.turret_origin();
    let tip = origin + TURRET_LENGTH * DVec2::from_angle(vehicle.turret_angle);
    gizmos.line_2d(raster_to_world(origin), raster_to_world(tip), Color::BLACK);

    let goal = simulation.params().goal;
    let size = Vec2::new(goal.width as f32, goal.height as f32);
    let centre = raster_to_world(DVec2::new(
        goal.x as f64 + goal.width as f64 / 2.0,
        goal.y as f64 + goal.height as f64 / 2.0,
    ));
    gizmos.rect_2d(centre, size, Color::srgb(1.0, 0.0, 0.0));
}

/// One status line: level time, goal countdown, completion or failure.
pub fn hud_text_system(
    state: Res<State<GameState>>,
    simulation: Option<Res<Simulation>>,
    best_times: Res<BestTimes>,
    failure: Res<LevelLoadFailure>,
    mut texts: Query<&mut Text, With<HudText>>,
) {
    let Ok(mut text) = texts.single_mut() else {
        return;
    };

    let line = match (state.get(), simulation) {
        (GameState::LoadFailed, _) => format!(
            "Could not load level: {}  (Esc to quit)",
            failure.0.as_deref().unwrap_or("unknown error")
        ),
        (GameState::LevelComplete, Some(sim)) => {
            let best = best_times
                .get(&sim.params().level_key)
                .map(|secs| format!("{secs}"))
                .unwrap_or_else(|| "-".to_string());
            format!(
                "Level complete in {}s  (best: {}s)",
                sim.level_seconds(),
                best
            )
        }
        (_, Some(sim)) => match sim.goal_timer().remaining_ms() {
            Some(remaining) => format!(
                "Time: {}    Stay inside the goal: {}",
                sim.level_seconds(),
                remaining / 1000
            ),
            None => format!("Time: {}", sim.level_seconds()),
        },
        (_, None) => "Loading...".to_string(),
    };

    if text.0 != line {
        text.0 = line;
    }
}
