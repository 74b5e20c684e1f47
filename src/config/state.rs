// Application state module
// Shared, immutable per-process state handed to every connection

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::types::Config;
use crate::storage::QueryExecutor;

/// Application state
pub struct AppState {
    pub config: Config,
    /// The storage collaborator every dispatch delegates to
    pub storage: Arc<dyn QueryExecutor>,
    // Cached config value for fast access without locks
    pub cached_access_log: AtomicBool,
}

impl AppState {
    pub fn new(config: Config, storage: Arc<dyn QueryExecutor>) -> Self {
        let cached_access_log = AtomicBool::new(config.logging.access_log);
        Self {
            config,
            storage,
            cached_access_log,
        }
    }
}
