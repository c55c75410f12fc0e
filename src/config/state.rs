// Application state module
// Shared runtime state handed to every connection

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::types::Config;
use crate::assets::AssetCache;

/// Application state
pub struct AppState {
    pub config: Config,
    pub cache: Arc<AssetCache>,
    /// Cached config value for lock-free access on the request path
    pub cached_access_log: AtomicBool,
}

impl AppState {
    pub fn new(config: Config, cache: Arc<AssetCache>) -> Self {
        let cached_access_log = AtomicBool::new(config.logging.access_log);
        Self {
            config,
            cache,
            cached_access_log,
        }
    }
}
