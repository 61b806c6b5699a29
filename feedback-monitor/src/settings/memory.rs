use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use feedback_core::UserPreferences;

use crate::settings::SettingsStore;

/// Keeps preferences for the lifetime of the process only.
#[derive(Clone, Default)]
pub struct MemorySettingsStore {
    preferences: Arc<Mutex<Option<UserPreferences>>>,
}

impl MemorySettingsStore {
    pub fn with(preferences: UserPreferences) -> Self {
        Self {
            preferences: Arc::new(Mutex::new(Some(preferences))),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MemorySettingsError {
    #[error("mutex poisoned: {0}")]
    MutexPoisoned(String),
}

impl<T> From<PoisonError<T>> for MemorySettingsError {
    fn from(err: PoisonError<T>) -> Self {
        MemorySettingsError::MutexPoisoned(err.to_string())
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    type Error = MemorySettingsError;

    async fn load(&self) -> Result<UserPreferences, Self::Error> {
        let mut stored = self.preferences.lock()?;
        Ok(*stored.get_or_insert_with(UserPreferences::default))
    }

    async fn update(&self, preferences: UserPreferences) -> Result<(), Self::Error> {
        *self.preferences.lock()? = Some(preferences);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use feedback_core::VisualStyle;

    use super::*;

    #[tokio::test]
    async fn load_yields_defaults_then_updates() {
        let store = MemorySettingsStore::default();
        assert_eq!(store.load().await.unwrap(), UserPreferences::default());

        let preferences = UserPreferences {
            vibration_enabled: true,
            sound_enabled: false,
            visual_style: VisualStyle::Notification,
        };
        store.update(preferences).await.unwrap();

        assert_eq!(store.load().await.unwrap(), preferences);
        assert_eq!(store.clone().load().await.unwrap(), preferences);
    }
}
