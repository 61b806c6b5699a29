use std::path::Path;

use async_trait::async_trait;
use feedback_core::{UserPreferences, VisualStyle};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool, migrate::Migrator};

use crate::settings::SettingsStore;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, thiserror::Error)]
pub enum SqliteSettingsError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("invalid visual style ordinal: {0}")]
    InvalidVisualStyle(i64),
}

/// Single-row settings table in a SQLite database.
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    /// Open or create the database at `path`.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, SqliteSettingsError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        MIGRATOR.run(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn new_in_memory() -> Result<Self, SqliteSettingsError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        MIGRATOR.run(&pool).await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    type Error = SqliteSettingsError;

    async fn load(&self) -> Result<UserPreferences, Self::Error> {
        sqlx::query("INSERT OR IGNORE INTO user_settings (id) VALUES (1)")
            .execute(&self.pool)
            .await?;

        let row = sqlx::query(
            r#"
            SELECT ActivateVibrationFeedback, ActivateSoundFeedback, VisualFeedbackType
            FROM user_settings
            WHERE id = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let ordinal: i64 = row.try_get("VisualFeedbackType")?;
        let visual_style = VisualStyle::from_ordinal(ordinal)
            .ok_or(SqliteSettingsError::InvalidVisualStyle(ordinal))?;

        Ok(UserPreferences {
            vibration_enabled: row.try_get("ActivateVibrationFeedback")?,
            sound_enabled: row.try_get("ActivateSoundFeedback")?,
            visual_style,
        })
    }

    async fn update(&self, preferences: UserPreferences) -> Result<(), Self::Error> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO user_settings
                (id, ActivateVibrationFeedback, ActivateSoundFeedback, VisualFeedbackType)
            VALUES (1, ?, ?, ?)
            "#,
        )
        .bind(preferences.vibration_enabled)
        .bind(preferences.sound_enabled)
        .bind(preferences.visual_style.ordinal())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
