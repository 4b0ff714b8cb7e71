//! Level catalog, level loading and the top-level `GameState` machine.
//!
//! ## States
//!
//! | State           | Description                                          |
//! |-----------------|------------------------------------------------------|
//! | `LoadingLevel`  | Initial state; reads the level map, waits on raster  |
//! | `Playing`       | Fixed-tick simulation running                        |
//! | `LevelComplete` | Goal reached; short pause before the next level      |
//! | `LoadFailed`    | A level could not be brought up; Esc quits           |
//!
//! ## Systems (registered by `LevelPlugin`)
//!
//! | System                 | Schedule                       | Purpose                          |
//! |------------------------|--------------------------------|----------------------------------|
//! | `begin_level_load`     | `OnEnter(LoadingLevel)`        | Parse map, request raster assets |
//! | `finish_level_load`    | `Update / in LoadingLevel`     | Wait for raster, build `Simulation` |
//! | `start_level_complete` | `OnEnter(LevelComplete)`       | Arm the between-level pause      |
//! | `level_complete_system`| `Update / in LevelComplete`    | Next level or exit               |
//! | `report_load_failure`  | `OnEnter(LoadFailed)`          | Log the failure                  |
//! | `quit_on_escape`       | `Update`                       | Esc exits in every state         |

use crate::config::{GameSettings, LevelParams};
use crate::error::{LevelLoadError, LevelResult};
use crate::simulation::Simulation;
use crate::terrain::{Raster, TerrainField};
use bevy::prelude::*;
use bevy::render::render_resource::TextureFormat;
use bevy_asset::LoadState;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory Bevy's asset server resolves relative asset paths against.
pub const ASSET_ROOT: &str = "assets";

/// How long the completion banner stays up before the next level loads.
const LEVEL_COMPLETE_PAUSE_SECS: f32 = 3.0;

// ── Game state ────────────────────────────────────────────────────────────────

#[derive(States, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum GameState {
    #[default]
    LoadingLevel,
    Playing,
    LevelComplete,
    LoadFailed,
}

// ── Level files ───────────────────────────────────────────────────────────────

/// Parse a `key=value` level map.
///
/// Blank lines and lines starting with `;` are skipped.  Keys and values are
/// trimmed; a line without `=` is ignored.  Later duplicates win.
pub fn parse_level_map(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(';'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

pub fn read_level_map(path: &Path) -> LevelResult<HashMap<String, String>> {
    let contents = std::fs::read_to_string(path).map_err(|source| LevelLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_level_map(&contents))
}

/// The ordered list of level map files and which one is being played.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelCatalog {
    levels: Vec<PathBuf>,
    current: usize,
}

impl LevelCatalog {
    /// Every `*.map` file (extension matched case-insensitively) directly in
    /// `dir`, sorted by file name.
    pub fn scan(dir: &Path) -> LevelResult<Self> {
        let entries = std::fs::read_dir(dir).map_err(|source| LevelLoadError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        let mut levels: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("map"))
            })
            .collect();
        levels.sort();
        Ok(Self::from_paths(levels))
    }

    pub fn from_paths(levels: Vec<PathBuf>) -> Self {
        Self { levels, current: 0 }
    }

    /// Start from `index`, clamped to the last level.
    pub fn starting_at(mut self, index: usize) -> Self {
        self.current = index.min(self.levels.len().saturating_sub(1));
        self
    }

    pub fn current(&self) -> Option<&Path> {
        self.levels.get(self.current).map(PathBuf::as_path)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Move to the next level.  Returns `false` once the list is exhausted.
    pub fn advance(&mut self) -> bool {
        if self.current + 1 < self.levels.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Image handles for the level being loaded or played.
#[derive(Resource, Debug, Clone)]
pub struct LevelAssets {
    pub terrain: Handle<Image>,
    pub backdrop: Option<Handle<Image>>,
}

/// Parsed parameters waiting on their terrain raster.
#[derive(Resource, Debug, Clone)]
pub struct PendingLevel(pub LevelParams);

/// Human-readable reason the last load failed, for the HUD.
#[derive(Resource, Debug, Clone, Default)]
pub struct LevelLoadFailure(pub Option<String>);

#[derive(Resource, Debug, Clone)]
pub struct LevelCompleteDelay(pub Timer);

/// Convert a decoded image into an RGB raster.
pub fn raster_from_image(image: &Image, path: &str) -> LevelResult<Raster> {
    let converted;
    let rgba = match image.texture_descriptor.format {
        TextureFormat::Rgba8UnormSrgb | TextureFormat::Rgba8Unorm => image,
        _ => {
            converted = image.convert(TextureFormat::Rgba8UnormSrgb).ok_or_else(|| {
                LevelLoadError::UnsupportedRaster {
                    path: path.to_string(),
                }
            })?;
            &converted
        }
    };
    let bytes = rgba
        .data
        .as_deref()
        .ok_or_else(|| LevelLoadError::RasterUnavailable {
            path: path.to_string(),
            reason: "image has no CPU-side pixel data".to_string(),
        })?;
    Raster::from_rgba8(rgba.width(), rgba.height(), bytes)
}

fn fail(
    err: &LevelLoadError,
    failure: &mut LevelLoadFailure,
    next_state: &mut NextState<GameState>,
) {
    error!("Level load failed: {err}");
    failure.0 = Some(err.to_string());
    next_state.set(GameState::LoadFailed);
}

/// Read and validate the current level map, then request its images.
pub fn begin_level_load(
    mut commands: Commands,
    catalog: Res<LevelCatalog>,
    asset_server: Res<AssetServer>,
    mut failure: ResMut<LevelLoadFailure>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    commands.remove_resource::<Simulation>();
    commands.remove_resource::<LevelAssets>();

    let Some(path) = catalog.current() else {
        let err = LevelLoadError::Io {
            path: ASSET_ROOT.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no *.map level files"),
        };
        fail(&err, &mut failure, &mut next_state);
        return;
    };

    let params = match read_level_map(path)
        .and_then(|map| LevelParams::from_map(&map).map_err(LevelLoadError::from))
    {
        Ok(params) => params,
        Err(err) => {
            fail(&err, &mut failure, &mut next_state);
            return;
        }
    };

    info!(
        "Loading level {}/{}: {} ({})",
        catalog.current_index() + 1,
        catalog.len(),
        path.display(),
        params.terrain_image
    );
    let terrain = asset_server.load(params.terrain_image.clone());
    let backdrop = params
        .backdrop_image
        .clone()
        .map(|backdrop| asset_server.load(backdrop));
    commands.insert_resource(LevelAssets { terrain, backdrop });
    commands.insert_resource(PendingLevel(params));
}

/// Once the terrain raster is decoded, classify it and start the level.
///
/// The backdrop is waited on too.  One that fails to load is dropped so the
/// terrain image is shown instead.
#[allow(clippy::too_many_arguments)]
pub fn finish_level_load(
    mut commands: Commands,
    pending: Option<Res<PendingLevel>>,
    level_assets: Option<ResMut<LevelAssets>>,
    asset_server: Res<AssetServer>,
    images: Res<Assets<Image>>,
    settings: Res<GameSettings>,
    mut fixed_time: ResMut<Time<Fixed>>,
    mut failure: ResMut<LevelLoadFailure>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let (Some(pending), Some(mut level_assets)) = (pending, level_assets) else {
        return;
    };
    let params = &pending.0;
    let path = params.terrain_image.as_str();

    match asset_server.load_state(level_assets.terrain.id()) {
        LoadState::Loaded => {}
        LoadState::Failed(err) => {
            let err = LevelLoadError::RasterUnavailable {
                path: path.to_string(),
                reason: err.to_string(),
            };
            fail(&err, &mut failure, &mut next_state);
            return;
        }
        _ => return,
    }

    if let Some(backdrop) = &level_assets.backdrop {
        match asset_server.load_state(backdrop.id()) {
            LoadState::Loaded => {}
            LoadState::Failed(err) => {
                warn!("Backdrop for {path} failed to load ({err}); showing the terrain");
                level_assets.backdrop = None;
            }
            _ => return,
        }
    }

    let screen = IVec2::new(settings.screen_width as i32, settings.screen_height as i32);
    let result = images
        .get(&level_assets.terrain)
        .ok_or_else(|| LevelLoadError::RasterUnavailable {
            path: path.to_string(),
            reason: "asset evicted after load".to_string(),
        })
        .and_then(|image| raster_from_image(image, path))
        .and_then(|raster| {
            let terrain = TerrainField::classify(&raster);
            Simulation::new(params.clone(), terrain, screen)
        });

    match result {
        Ok(simulation) => {
            fixed_time.set_timestep(Duration::from_millis(params.tick_millis));
            info!(
                "Level ready: {}x{}, tick {} ms",
                params.level_width, params.level_height, params.tick_millis
            );
            commands.insert_resource(simulation);
            commands.remove_resource::<PendingLevel>();
            failure.0 = None;
            next_state.set(GameState::Playing);
        }
        Err(err) => fail(&err, &mut failure, &mut next_state),
    }
}

pub fn start_level_complete(mut commands: Commands) {
    commands.insert_resource(LevelCompleteDelay(Timer::from_seconds(
        LEVEL_COMPLETE_PAUSE_SECS,
        TimerMode::Once,
    )));
}

/// After the pause, load the next level, or exit after the last one.
pub fn level_complete_system(
    time: Res<Time>,
    mut delay: ResMut<LevelCompleteDelay>,
    mut catalog: ResMut<LevelCatalog>,
    mut next_state: ResMut<NextState<GameState>>,
    mut exit: MessageWriter<AppExit>,
) {
    if !delay.0.tick(time.delta()).just_finished() {
        return;
    }
    if catalog.advance() {
        next_state.set(GameState::LoadingLevel);
    } else {
        info!("All levels complete");
        exit.write(AppExit::Success);
    }
}

pub fn report_load_failure(failure: Res<LevelLoadFailure>) {
    if let Some(reason) = &failure.0 {
        warn!("Game halted: {reason}. Press Esc to quit.");
    }
}

pub fn quit_on_escape(keys: Res<ButtonInput<KeyCode>>, mut exit: MessageWriter<AppExit>) {
    if keys.just_pressed(KeyCode::Escape) {
        exit.write(AppExit::Success);
    }
}

// ── Plugin ────────────────────────────────────────────────────────────────────

/// Registers `GameState` and the load / complete / fail flow.
///
/// Expects [`GameSettings`] and [`LevelCatalog`] to be inserted before the
/// app runs.
pub struct LevelPlugin;

impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<GameState>()
            .init_resource::<LevelLoadFailure>()
            .add_systems(OnEnter(GameState::LoadingLevel), begin_level_load)
            .add_systems(
                Update,
                finish_level_load.run_if(in_state(GameState::LoadingLevel)),
            )
            .add_systems(OnEnter(GameState::LevelComplete), start_level_complete)
            .add_systems(
                Update,
                level_complete_system.run_if(in_state(GameState::LevelComplete)),
            )
            .add_systems(OnEnter(GameState::LoadFailed), report_load_failure)
            .add_systems(Update, quit_on_escape);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::keys;

    #[test]
    fn level_map_skips_comments_and_blank_lines() {
        let map = parse_level_map(
            "; long level\n\nBild = levels/long_f.png \r\n  GoalX=1485\nnot a pair\n;GoalY=1\n",
        );
        assert_eq!(map.len(), 2);
        assert_eq!(map[keys::TERRAIN_IMAGE], "levels/long_f.png");
        assert_eq!(map[keys::GOAL_X], "1485");
        assert!(!map.contains_key(keys::GOAL_Y));
    }

    #[test]
    fn value_may_contain_equals_sign() {
        let map = parse_level_map("Bild=a=b.png");
        assert_eq!(map[keys::TERRAIN_IMAGE], "a=b.png");
    }

    #[test]
    fn catalog_advances_until_exhausted() {
        let mut catalog =
            LevelCatalog::from_paths(vec![PathBuf::from("a.map"), PathBuf::from("b.map")]);
        assert_eq!(catalog.current(), Some(Path::new("a.map")));
        assert!(catalog.advance());
        assert_eq!(catalog.current(), Some(Path::new("b.map")));
        assert!(!catalog.advance());
        assert_eq!(catalog.current(), Some(Path::new("b.map")));
    }

    #[test]
    fn catalog_start_index_is_clamped() {
        let catalog =
            LevelCatalog::from_paths(vec![PathBuf::from("a.map"), PathBuf::from("b.map")])
                .starting_at(9);
        assert_eq!(catalog.current_index(), 1);
        assert!(LevelCatalog::default().starting_at(3).current().is_none());
    }

    #[test]
    fn catalog_scan_reports_missing_directory() {
        let err = LevelCatalog::scan(Path::new("definitely/not/a/levels/dir")).unwrap_err();
        assert!(matches!(err, LevelLoadError::Io { .. }));
    }

    #[test]
    fn rgba_image_becomes_raster() {
        use bevy::render::render_resource::{Extent3d, TextureDimension};
        use bevy_asset::RenderAssetUsages;

        let image = Image::new(
            Extent3d {
                width: 2,
                height: 1,
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            vec![0xFF, 0xFF, 0xFF, 0xFF, 0xA2, 0x68, 0x30, 0xFF],
            TextureFormat::Rgba8UnormSrgb,
            RenderAssetUsages::MAIN_WORLD,
        );
        let raster = raster_from_image(&image, "inline").expect("rgba8 converts");
        let field = TerrainField::classify(&raster);
        assert_eq!(field.width(), 2);
        assert_eq!(field.query(0, 0), crate::terrain::TerrainClass::Air);
        assert_eq!(field.query(1, 0), crate::terrain::TerrainClass::Ground);
    }
}
