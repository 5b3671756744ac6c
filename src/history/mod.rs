use std::sync::Arc;

use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};

use crate::errors::AppError;
use crate::models::ListeningHistoryItem;
use crate::youtube::VideoPlatform;

/// Demo history used while logged out, so the AI features have something to
/// work with.
const SAMPLE_HISTORY: &[(&str, &str)] = &[
    ("Blinding Lights", "The Weeknd"),
    ("Levitating", "Dua Lipa"),
    ("Save Your Tears", "The Weeknd"),
    ("good 4 u", "Olivia Rodrigo"),
    ("Stay", "The Kid LAROI, Justin Bieber"),
    ("INDUSTRY BABY", "Lil Nas X, Jack Harlow"),
    ("Heat Waves", "Glass Animals"),
    ("As It Was", "Harry Styles"),
    ("Shivers", "Ed Sheeran"),
    ("Bohemian Rhapsody", "Queen"),
    ("Hotel California", "Eagles"),
    ("Smells Like Teen Spirit", "Nirvana"),
    ("Billie Jean", "Michael Jackson"),
    ("Like a Rolling Stone", "Bob Dylan"),
    ("Stairway to Heaven", "Led Zeppelin"),
    ("Get Lucky", "Daft Punk"),
    ("Uptown Funk", "Mark Ronson, Bruno Mars"),
    ("Rolling in the Deep", "Adele"),
    ("bad guy", "Billie Eilish"),
];

pub fn sample_history() -> Vec<ListeningHistoryItem> {
    SAMPLE_HISTORY
        .iter()
        .map(|(title, artist)| ListeningHistoryItem::new(*title, *artist))
        .collect()
}

/// The JSON array string the prompts take as `listeningHistory`. An empty
/// history is sent as an empty string so the prompt's no-history branch runs.
pub fn history_json(items: &[ListeningHistoryItem]) -> Result<String, AppError> {
    if items.is_empty() {
        return Ok(String::new());
    }
    Ok(serde_json::to_string(items)?)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedHistory {
    pub items: Vec<ListeningHistoryItem>,
    pub is_sample: bool,
}

/// Liked-video history, cached in the database between runs.
pub struct ListeningHistoryManager {
    pool: Pool<Sqlite>,
    platform: Arc<dyn VideoPlatform>,
    limit: usize,
}

impl ListeningHistoryManager {
    pub fn new(pool: Pool<Sqlite>, platform: Arc<dyn VideoPlatform>, limit: usize) -> Self {
        Self {
            pool,
            platform,
            limit,
        }
    }

    /// Fetch liked videos and replace the cached history with them.
    pub async fn refresh(&self) -> Result<Vec<ListeningHistoryItem>, AppError> {
        let items = self.platform.liked_videos(self.limit).await?;
        let now = Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM listening_history")
            .execute(&mut *tx)
            .await?;
        for (position, item) in items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO listening_history (position, title, artist, fetched_at) VALUES (?, ?, ?, ?)",
            )
            .bind(position as i64)
            .bind(&item.title)
            .bind(&item.artist)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        log::info!("Cached {} liked videos as listening history", items.len());
        Ok(items)
    }

    pub async fn cached(&self) -> Result<Vec<ListeningHistoryItem>, AppError> {
        let rows = sqlx::query("SELECT title, artist FROM listening_history ORDER BY position")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| ListeningHistoryItem::new(row.get::<String, _>("title"), row.get::<String, _>("artist")))
            .collect())
    }

    /// The history to feed the prompts: the cache, or the sample history when
    /// nothing is cached and the user is logged out.
    pub async fn load(&self, logged_in: bool) -> Result<LoadedHistory, AppError> {
        let items = self.cached().await?;
        if items.is_empty() && !logged_in {
            return Ok(LoadedHistory {
                items: sample_history(),
                is_sample: true,
            });
        }
        Ok(LoadedHistory {
            items,
            is_sample: false,
        })
    }

    pub async fn clear(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM listening_history")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseManager;
    use crate::resolver::tests::FakePlatform;

    async fn manager(platform: FakePlatform) -> ListeningHistoryManager {
        let db = DatabaseManager::in_memory().await.unwrap();
        ListeningHistoryManager::new(db.pool.clone(), Arc::new(platform), 50)
    }

    #[test]
    fn test_history_json_shape() {
        let json = history_json(&[ListeningHistoryItem::new("Heat Waves", "Glass Animals")]).unwrap();
        assert_eq!(json, r#"[{"title":"Heat Waves","artist":"Glass Animals"}]"#);
        assert_eq!(history_json(&[]).unwrap(), "");
    }

    #[test]
    fn test_sample_history() {
        let sample = sample_history();
        assert_eq!(sample.len(), 19);
        assert_eq!(sample[0], ListeningHistoryItem::new("Blinding Lights", "The Weeknd"));
    }

    #[tokio::test]
    async fn test_logged_out_uses_sample() {
        let history = manager(FakePlatform::default()).await;
        let loaded = history.load(false).await.unwrap();
        assert!(loaded.is_sample);
        assert_eq!(loaded.items.len(), 19);

        let loaded = history.load(true).await.unwrap();
        assert!(!loaded.is_sample);
        assert!(loaded.items.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_replaces_cache() {
        let platform = FakePlatform::default().liked(vec![
            ListeningHistoryItem::new("Get Lucky", "Daft Punk"),
            ListeningHistoryItem::new("bad guy", "Billie Eilish"),
        ]);
        let history = manager(platform).await;

        let items = history.refresh().await.unwrap();
        assert_eq!(items.len(), 2);
        // refreshing twice does not duplicate rows
        history.refresh().await.unwrap();

        let loaded = history.load(false).await.unwrap();
        assert!(!loaded.is_sample);
        assert_eq!(loaded.items, items);

        history.clear().await.unwrap();
        assert!(history.cached().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_cache() {
        let platform = FakePlatform::default()
            .liked(vec![ListeningHistoryItem::new("Get Lucky", "Daft Punk")]);
        let db = DatabaseManager::in_memory().await.unwrap();
        let history = ListeningHistoryManager::new(db.pool.clone(), Arc::new(platform), 50);
        history.refresh().await.unwrap();

        let failing = ListeningHistoryManager::new(
            db.pool.clone(),
            Arc::new(FakePlatform::default().failing_liked()),
            50,
        );
        assert!(failing.refresh().await.is_err());
        assert_eq!(failing.cached().await.unwrap().len(), 1);
    }
}
