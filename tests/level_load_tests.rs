//! Headless tests for the level-load flow driven by [`LevelPlugin`].
//!
//! These run a real asset server over the crate's `assets/` directory with
//! `MinimalPlugins`, so image decoding and load failures go through the same
//! path as the game.  No window or rendering is created.
//!
//! Covered scenarios:
//! 1. A level whose terrain image does not exist ends in `LoadFailed` with a
//!    reason recorded for the HUD.
//! 2. A level whose backdrop does not exist still starts, showing the terrain.

use std::path::PathBuf;
use std::time::Duration;

use bevy::prelude::*;
use bevy::state::app::StatesPlugin;
use grapple_rover::config::{default_level_map, keys, GameSettings};
use grapple_rover::level::{GameState, LevelAssets, LevelCatalog, LevelLoadFailure, LevelPlugin};
use grapple_rover::simulation::Simulation;

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Write a level map with `overrides` applied to the stock values and return
/// its path.
fn write_level_map(name: &str, overrides: &[(&str, &str)]) -> PathBuf {
    let mut map = default_level_map();
    for (key, value) in overrides {
        map.insert(key.to_string(), value.to_string());
    }
    let contents: String = map
        .iter()
        .map(|(key, value)| format!("{key}={value}\n"))
        .collect();

    let dir = std::env::temp_dir().join(format!("grapple_rover_load_{}_{name}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("01_level.map");
    std::fs::write(&path, contents).unwrap();
    path
}

fn app_for_level(map: PathBuf) -> App {
    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins,
        StatesPlugin,
        AssetPlugin::default(),
        ImagePlugin::default(),
    ));
    app.init_resource::<ButtonInput<KeyCode>>()
        .insert_resource(GameSettings::default())
        .insert_resource(LevelCatalog::from_paths(vec![map]))
        .add_plugins(LevelPlugin);
    app
}

/// Update until the app leaves `LoadingLevel`, giving the asset server's IO
/// tasks time to finish.
fn run_until_loaded(app: &mut App) -> GameState {
    for _ in 0..2000 {
        app.update();
        let state = app.world().resource::<State<GameState>>().get().clone();
        if state != GameState::LoadingLevel {
            return state;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    GameState::LoadingLevel
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn missing_terrain_image_fails_the_level() {
    let map = write_level_map(
        "missing_terrain",
        &[(keys::TERRAIN_IMAGE, "levels/no_such_terrain.png")],
    );
    let mut app = app_for_level(map.clone());

    assert_eq!(run_until_loaded(&mut app), GameState::LoadFailed);

    let failure = app.world().resource::<LevelLoadFailure>();
    let reason = failure.0.as_deref().expect("failure reason recorded");
    assert!(
        reason.contains("levels/no_such_terrain.png"),
        "reason should name the raster: {reason}"
    );
    assert!(app.world().get_resource::<Simulation>().is_none());

    let _ = std::fs::remove_dir_all(map.parent().unwrap());
}

#[test]
fn missing_backdrop_falls_back_to_terrain() {
    let map = write_level_map(
        "missing_backdrop",
        &[(keys::BACKDROP_IMAGE, "levels/no_such_backdrop.png")],
    );
    let mut app = app_for_level(map.clone());

    assert_eq!(run_until_loaded(&mut app), GameState::Playing);

    let level_assets = app.world().resource::<LevelAssets>();
    assert!(level_assets.backdrop.is_none(), "failed backdrop is dropped");
    assert!(app.world().resource::<LevelLoadFailure>().0.is_none());
    assert!(app.world().get_resource::<Simulation>().is_some());

    let _ = std::fs::remove_dir_all(map.parent().unwrap());
}
