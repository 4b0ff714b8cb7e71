use bevy::prelude::*;
use bevy::window::WindowResolution;
use std::path::Path;

use grapple_rover::config::GameSettings;
use grapple_rover::level::{LevelCatalog, LevelPlugin, ASSET_ROOT};
use grapple_rover::rendering::RenderingPlugin;
use grapple_rover::save::{load_best_times_or_default, SavePlugin};
use grapple_rover::simulation::SimulationPlugin;

fn main() {
    // Settings and the level list are needed before the window exists, so
    // they are read here rather than in a startup system.
    let settings = GameSettings::load_or_default(GameSettings::PATH);
    let levels_dir = Path::new(ASSET_ROOT).join(&settings.levels_dir);
    let catalog = match LevelCatalog::scan(&levels_dir) {
        Ok(catalog) => catalog.starting_at(settings.first_level),
        Err(err) => {
            eprintln!("[SETUP] {err}");
            LevelCatalog::default()
        }
    };
    let (best_times, write_block) =
        load_best_times_or_default(Path::new(&settings.best_times_file));

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Grapple Rover".into(),
                resolution: WindowResolution::new(settings.screen_width, settings.screen_height),
                resizable: false,
                ..Default::default()
            }),
            ..Default::default()
        }))
        .insert_resource(ClearColor(Color::WHITE))
        .insert_resource(settings)
        .insert_resource(catalog)
        .insert_resource(best_times)
        .insert_resource(write_block)
        .add_plugins((LevelPlugin, SimulationPlugin, SavePlugin, RenderingPlugin))
        .run();
}
