//! Persistent store for taste analyses.
//!
//! An analysis is only as fresh as the history it was produced from, so the
//! key is a hash of the exact history JSON sent to the model.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

use super::errors::PromptError;
use crate::models::AnalysisResult;

#[derive(Debug, Clone)]
pub struct CachedAnalysis {
    pub result: AnalysisResult,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AnalysisStore {
    pool: Pool<Sqlite>,
}

pub fn history_hash(history_json: &str) -> String {
    format!("{:x}", md5::compute(history_json.as_bytes()))
}

impl AnalysisStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn get(&self, history_json: &str) -> Result<Option<CachedAnalysis>, PromptError> {
        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT result_json, created_at FROM analysis_cache WHERE history_hash = ?",
        )
        .bind(history_hash(history_json))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((json, created_at)) => {
                let result: AnalysisResult = serde_json::from_str(&json).map_err(|e| {
                    PromptError::Database(format!("Failed to deserialize cached analysis: {}", e))
                })?;
                Ok(Some(CachedAnalysis {
                    result,
                    created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
                }))
            }
            None => Ok(None),
        }
    }

    /// Keeps a single row: older analyses are replaced.
    pub async fn set(&self, history_json: &str, result: &AnalysisResult) -> Result<(), PromptError> {
        let json = serde_json::to_string(result).map_err(|e| {
            PromptError::Database(format!("Failed to serialize analysis: {}", e))
        })?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM analysis_cache")
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO analysis_cache (history_hash, result_json, created_at) VALUES (?, ?, ?)",
        )
        .bind(history_hash(history_json))
        .bind(&json)
        .bind(Utc::now().timestamp())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        log::debug!("Stored taste analysis for history {}", history_hash(history_json));
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), PromptError> {
        sqlx::query("DELETE FROM analysis_cache")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
