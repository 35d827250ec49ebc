use crate::error::CoreError;
use crate::store::{SqliteLocalStore, WatermarkStore};
use async_trait::async_trait;
use chrono::NaiveDate;

const RECURRENCE_WATERMARK_KEY: &str = "recurrence_watermark";

#[async_trait]
impl WatermarkStore for SqliteLocalStore {
    async fn load_watermark(&self) -> Result<Option<NaiveDate>, CoreError> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM app_meta WHERE key = $1")
            .bind(RECURRENCE_WATERMARK_KEY)
            .fetch_optional(self.pool())
            .await?;

        value
            .map(|raw| {
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
                    CoreError::InvalidInput(format!("Stored watermark '{}' is not a date: {}", raw, e))
                })
            })
            .transpose()
    }

    async fn store_watermark(&self, date: NaiveDate) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO app_meta (key, value) VALUES ($1, $2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value"#,
        )
        .bind(RECURRENCE_WATERMARK_KEY)
        .bind(date.format("%Y-%m-%d").to_string())
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
