use shared_config::AppConfig;

use crate::Database;

/// Shared router state handed to every cell.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database) -> Self {
        Self { config, db }
    }
}
