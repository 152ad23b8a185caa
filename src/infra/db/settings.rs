use async_trait::async_trait;
use sqlx::types::Json;

use crate::{
    application::repos::{OptionsRepo, RepoError},
    domain::entities::ReorderSettingsRecord,
};

use super::{PostgresRepositories, SETTINGS_OPTION_NAME, map_sqlx_error};

#[async_trait]
impl OptionsRepo for PostgresRepositories {
    async fn load_reorder_settings(&self) -> Result<ReorderSettingsRecord, RepoError> {
        let value: Option<Json<ReorderSettingsRecord>> =
            sqlx::query_scalar("SELECT value FROM options WHERE name = $1")
                .bind(SETTINGS_OPTION_NAME)
                .fetch_optional(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(value.map(|Json(record)| record).unwrap_or_default())
    }

    async fn save_reorder_settings(
        &self,
        settings: &ReorderSettingsRecord,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO options (name, value, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (name)
            DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            "#,
        )
        .bind(SETTINGS_OPTION_NAME)
        .bind(Json(settings))
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
