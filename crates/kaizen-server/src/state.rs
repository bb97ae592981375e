use std::path::PathBuf;
use std::sync::Arc;

use kaizen_core::config::Config;
use kaizen_core::OpportunityService;

use crate::notify::QueuedNotifier;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub config: Arc<Config>,
    pub service: Arc<OpportunityService>,
}

impl AppState {
    /// Load config and directory, open the store and start the notification
    /// worker.
    pub fn open(root: PathBuf) -> anyhow::Result<Self> {
        let config = Config::load(&root)?;
        let notifier = Arc::new(QueuedNotifier::new(&config.notifications));
        let service = OpportunityService::open(&root, notifier)?;
        Ok(Self {
            root,
            config: Arc::new(config),
            service: Arc::new(service),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_requires_initialized_root() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(AppState::open(dir.path().to_path_buf()).is_err());
    }
}
