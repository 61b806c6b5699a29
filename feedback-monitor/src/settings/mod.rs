pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use feedback_core::UserPreferences;

/// Persistent user preferences for feedback output.
#[async_trait]
pub trait SettingsStore: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the stored preferences, creating the default record first if
    /// none exists.
    async fn load(&self) -> Result<UserPreferences, Self::Error>;

    /// Replace the stored preferences.
    async fn update(&self, preferences: UserPreferences) -> Result<(), Self::Error>;
}
