use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Store;
use crate::models::Theme;
use crate::storage::{self, keys, KeyValueStorage, StorageError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,
}

/// UI preferences persisted under `app-settings`.
pub struct SettingsStore {
    settings: Store<Settings>,
    storage: Arc<dyn KeyValueStorage>,
}

impl SettingsStore {
    pub fn open(storage: Arc<dyn KeyValueStorage>) -> Self {
        let settings = match storage::load_json::<Settings>(storage.as_ref(), keys::SETTINGS) {
            Ok(found) => found.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable settings");
                Settings::default()
            }
        };
        Self {
            settings: Store::new(settings),
            storage,
        }
    }

    pub fn theme(&self) -> Theme {
        self.settings.with(|s| s.theme)
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), StorageError> {
        let next = Settings { theme };
        storage::save_json(self.storage.as_ref(), keys::SETTINGS, &next)?;
        self.settings.set(next);
        Ok(())
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<Settings> {
        self.settings.subscribe()
    }
}
