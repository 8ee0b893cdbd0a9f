pub mod capture;
pub mod db;
pub mod inference;
pub mod schedules;
pub mod settings;
mod utils;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use log::LevelFilter;

use capture::CaptureRecorder;
use db::Database;
use schedules::ScheduleService;
use settings::SettingsStore;

/// Everything a front end (CLI, HTTP layer) needs, wired to one database.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub recorder: CaptureRecorder,
    pub schedules: ScheduleService,
    pub settings: Arc<SettingsStore>,
}

impl AppState {
    pub fn open(db_path: PathBuf, settings_path: PathBuf) -> Result<Self> {
        let db = Database::new(db_path)?;
        let settings = Arc::new(SettingsStore::new(settings_path)?);

        Ok(Self {
            recorder: CaptureRecorder::new(db.clone()),
            schedules: ScheduleService::new(db.clone(), Arc::clone(&settings)),
            db,
            settings,
        })
    }
}

/// Initialize logging. `RUST_LOG`, when set, takes precedence over `default_level`.
pub fn init_logging(default_level: &str) {
    let level = default_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}
