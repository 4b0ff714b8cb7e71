use std::fs;
use std::path::{Path, PathBuf};

use bevy::prelude::*;

use crate::config::GameSettings;
use crate::goal::BestTimes;
use crate::simulation::SimEvent;

pub struct SavePlugin;

impl Plugin for SavePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BestTimesWriteBlock>()
            .add_systems(Update, persist_best_times_system);
    }
}

/// Set when the best-times file on disk could not be read and could not be
/// backed up either.  While set, the file is never written.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct BestTimesWriteBlock(pub Option<String>);

pub fn load_best_times(path: &Path) -> Result<BestTimes, String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    toml::from_str(&contents).map_err(|err| format!("failed to parse best times TOML: {err}"))
}

/// Where an unreadable best-times file is copied before starting fresh.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Best times from `path`, or an empty table if the file is absent or
/// unreadable.
///
/// Called from `main` before logging is set up, so problems go to stderr.  An
/// unreadable file is copied to [`backup_path`] first; if that copy fails too,
/// the returned block keeps the original from being overwritten.
pub fn load_best_times_or_default(path: &Path) -> (BestTimes, BestTimesWriteBlock) {
    if !path.exists() {
        println!("[SETUP] No best times at {}; starting fresh", path.display());
        return (BestTimes::default(), BestTimesWriteBlock::default());
    }
    match load_best_times(path) {
        Ok(times) => {
            println!("[SETUP] Loaded best times from {}", path.display());
            (times, BestTimesWriteBlock::default())
        }
        Err(err) => {
            let backup = backup_path(path);
            match fs::copy(path, &backup) {
                Ok(_) => {
                    eprintln!(
                        "[SETUP] {err}; copied to {}, starting with no best times",
                        backup.display()
                    );
                    (BestTimes::default(), BestTimesWriteBlock::default())
                }
                Err(copy_err) => {
                    let reason = format!(
                        "{err}; backup to {} failed: {copy_err}",
                        backup.display()
                    );
                    eprintln!("[SETUP] {reason}; best times will not be saved this session");
                    (BestTimes::default(), BestTimesWriteBlock(Some(reason)))
                }
            }
        }
    }
}

pub fn write_best_times(path: &Path, times: &BestTimes) -> Result<(), String> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .map_err(|err| format!("failed to create {}: {err}", dir.display()))?;
    }

    let serialized = toml::to_string_pretty(times)
        .map_err(|err| format!("failed to serialize best times TOML: {err}"))?;

    fs::write(path, serialized).map_err(|err| format!("failed to write {}: {err}", path.display()))
}

/// Write the best-times file whenever a level finishes with a new record.
pub fn persist_best_times_system(
    mut events: MessageReader<SimEvent>,
    times: Res<BestTimes>,
    settings: Res<GameSettings>,
    block: Res<BestTimesWriteBlock>,
) {
    let mut dirty = false;
    for event in events.read() {
        if let SimEvent::GoalReached {
            level_key,
            seconds,
            new_best: true,
        } = event
        {
            info!("New best for {level_key}: {seconds}s");
            dirty = true;
        }
    }
    if !dirty {
        return;
    }

    let path = Path::new(&settings.best_times_file);
    if let Some(reason) = &block.0 {
        warn!("Not saving best times to {}: {reason}", path.display());
        return;
    }
    match write_best_times(path, &times) {
        Ok(()) => info!("Saved best times to {}", path.display()),
        Err(err) => error!("{err}"),
    }
}
