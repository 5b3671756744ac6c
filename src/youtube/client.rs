use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::auth::YouTubeAuth;
use super::error::YouTubeError;
use super::models::*;
use crate::models::{ListeningHistoryItem, UserPlaylists, VendorPlaylist};

pub const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// YouTube's "Music" video category.
pub const MUSIC_CATEGORY_ID: &str = "10";

const PAGE_SIZE: usize = 50;
const LIKED_MUSIC_PLAYLIST_IDS: &[&str] = &["LM", "LL"];

/// The slice of the video platform the player depends on.
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    async fn search_videos(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<VideoCandidate>, YouTubeError>;

    async fn video_details(&self, video_id: &str) -> Result<VideoDetails, YouTubeError>;

    /// Title/artist pairs for the signed-in user's liked videos, newest first.
    async fn liked_videos(&self, limit: usize) -> Result<Vec<ListeningHistoryItem>, YouTubeError>;

    async fn my_playlists(&self) -> Result<UserPlaylists, YouTubeError>;
}

pub struct YouTubeClient {
    client: Client,
    api_key: Option<String>,
    auth: Option<Arc<YouTubeAuth>>,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(client: Client, api_key: Option<String>, auth: Option<Arc<YouTubeAuth>>) -> Self {
        Self {
            client,
            api_key,
            auth,
            base_url: API_BASE.to_string(),
        }
    }

    /// Attach credentials: the OAuth bearer when logged in, the API key
    /// otherwise.
    async fn authorize(
        &self,
        builder: RequestBuilder,
        require_user: bool,
    ) -> Result<RequestBuilder, YouTubeError> {
        if let Some(auth) = &self.auth {
            if let Some(token) = auth.access_token().await? {
                return Ok(builder.bearer_auth(token));
            }
        }

        if require_user {
            return Err(YouTubeError::NotAuthenticated);
        }

        match &self.api_key {
            Some(key) => Ok(builder.query(&[("key", key.as_str())])),
            None => Err(YouTubeError::NotConfigured(
                "add YOUTUBE_API_KEY to your environment or log in".to_string(),
            )),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        require_user: bool,
    ) -> Result<T, YouTubeError> {
        let url = format!("{}/{}", self.base_url, path);
        let builder = self.client.get(&url).query(params);
        let builder = self.authorize(builder, require_user).await?;

        log::debug!("YouTube GET {} {:?}", path, params);
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            log::warn!("YouTube {} failed ({}): {}", path, status, message);
            return Err(YouTubeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| YouTubeError::Parse(format!("{} response: {}", path, e)))
    }
}

#[async_trait]
impl VideoPlatform for YouTubeClient {
    async fn search_videos(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<VideoCandidate>, YouTubeError> {
        let params = [
            ("part", "snippet".to_string()),
            ("q", query.to_string()),
            ("type", "video".to_string()),
            ("videoCategoryId", MUSIC_CATEGORY_ID.to_string()),
            ("maxResults", max_results.clamp(1, PAGE_SIZE).to_string()),
        ];
        let resp: ListResponse<SearchResult> = self.get("search", &params, false).await?;
        Ok(search_candidates(resp))
    }

    async fn video_details(&self, video_id: &str) -> Result<VideoDetails, YouTubeError> {
        let params = [
            ("part", "snippet,contentDetails".to_string()),
            ("id", video_id.to_string()),
        ];
        let resp: ListResponse<VideoResource> = self.get("videos", &params, false).await?;
        resp.items
            .into_iter()
            .next()
            .map(into_details)
            .ok_or_else(|| YouTubeError::NotFound(format!("video {}", video_id)))
    }

    async fn liked_videos(&self, limit: usize) -> Result<Vec<ListeningHistoryItem>, YouTubeError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("part", "snippet".to_string()),
                ("myRating", "like".to_string()),
                ("maxResults", PAGE_SIZE.to_string()),
            ];
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }

            let resp: ListResponse<VideoResource> = self.get("videos", &params, true).await?;
            items.extend(resp.items.iter().map(history_item));
            log::debug!("Fetched {} liked videos so far", items.len());

            match resp.next_page_token {
                Some(next) if items.len() < limit => page_token = Some(next),
                _ => break,
            }
        }

        items.truncate(limit);
        log::info!("Loaded {} liked videos as listening history", items.len());
        Ok(items)
    }

    async fn my_playlists(&self) -> Result<UserPlaylists, YouTubeError> {
        let params = [
            ("part", "snippet,contentDetails".to_string()),
            ("mine", "true".to_string()),
            ("maxResults", PAGE_SIZE.to_string()),
        ];
        let resp: ListResponse<PlaylistResource> = self.get("playlists", &params, true).await?;
        Ok(split_playlists(resp.items))
    }
}

fn search_candidates(resp: ListResponse<SearchResult>) -> Vec<VideoCandidate> {
    resp.items
        .into_iter()
        .filter_map(|item| {
            let video_id = item.id.video_id?;
            let snippet = item.snippet.unwrap_or_default();
            Some(VideoCandidate {
                video_id,
                title: snippet.title,
                channel_title: snippet.channel_title.unwrap_or_default(),
            })
        })
        .collect()
}

fn into_details(video: VideoResource) -> VideoDetails {
    let snippet = video.snippet.unwrap_or_default();
    let duration_secs = video
        .content_details
        .and_then(|c| c.duration)
        .and_then(|d| parse_iso8601_duration(&d))
        .unwrap_or(0);
    let thumbnail_url = snippet
        .thumbnails
        .as_ref()
        .and_then(|t| t.best_url())
        .map(|u| u.to_string())
        .unwrap_or_else(|| fallback_thumbnail_url(&video.id));

    VideoDetails {
        video_id: video.id,
        title: snippet.title,
        channel_title: snippet.channel_title.unwrap_or_default(),
        duration_secs,
        thumbnail_url,
    }
}

/// Auto-generated artist channels are named "Artist - Topic".
pub fn artist_from_channel(channel: &str) -> String {
    channel.replace(" - Topic", "").trim().to_string()
}

fn history_item(video: &VideoResource) -> ListeningHistoryItem {
    let snippet = video.snippet.clone().unwrap_or_default();
    let title = if snippet.title.trim().is_empty() {
        "Unknown Title".to_string()
    } else {
        snippet.title
    };
    let artist = snippet
        .video_owner_channel_title
        .or(snippet.channel_title)
        .map(|c| artist_from_channel(&c))
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| "Unknown Artist".to_string());

    ListeningHistoryItem { title, artist }
}

fn split_playlists(items: Vec<PlaylistResource>) -> UserPlaylists {
    let mut playlists = UserPlaylists::default();
    for item in items {
        let playlist = VendorPlaylist {
            title: item
                .snippet
                .map(|s| s.title)
                .unwrap_or_else(|| item.id.clone()),
            id: item.id,
        };
        if LIKED_MUSIC_PLAYLIST_IDS.contains(&playlist.id.as_str()) {
            playlists.liked_music = Some(playlist);
        } else {
            playlists.other.push(playlist);
        }
    }
    playlists
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artist_from_topic_channel() {
        assert_eq!(artist_from_channel("Daft Punk - Topic"), "Daft Punk");
        assert_eq!(artist_from_channel("Queen Official"), "Queen Official");
    }

    #[test]
    fn test_search_candidates_skip_non_videos() {
        let json = r#"{
            "items": [
                {"id": {"kind": "youtube#channel", "channelId": "UC1"}},
                {"id": {"kind": "youtube#video", "videoId": "abc"},
                 "snippet": {"title": "Get Lucky", "channelTitle": "Daft Punk - Topic"}}
            ]
        }"#;
        let resp: ListResponse<SearchResult> = serde_json::from_str(json).unwrap();
        let candidates = search_candidates(resp);
        assert_eq!(
            candidates,
            vec![VideoCandidate {
                video_id: "abc".to_string(),
                title: "Get Lucky".to_string(),
                channel_title: "Daft Punk - Topic".to_string(),
            }]
        );
    }

    #[test]
    fn test_video_details_mapping() {
        let json = r#"{
            "id": "dQw4w9WgXcQ",
            "snippet": {
                "title": "Never Gonna Give You Up",
                "channelTitle": "Rick Astley",
                "thumbnails": {"medium": {"url": "https://img/m.jpg"}}
            },
            "contentDetails": {"duration": "PT3M33S"}
        }"#;
        let video: VideoResource = serde_json::from_str(json).unwrap();
        let details = into_details(video);
        assert_eq!(details.duration_secs, 213);
        assert_eq!(details.thumbnail_url, "https://img/m.jpg");
        assert_eq!(details.channel_title, "Rick Astley");
    }

    #[test]
    fn test_video_details_fallbacks() {
        let video: VideoResource = serde_json::from_str(r#"{"id": "xyz"}"#).unwrap();
        let details = into_details(video);
        assert_eq!(details.duration_secs, 0);
        assert_eq!(details.thumbnail_url, "https://i.ytimg.com/vi/xyz/hqdefault.jpg");
    }

    #[test]
    fn test_history_item_fallbacks() {
        let video: VideoResource = serde_json::from_str(
            r#"{"id": "a", "snippet": {"title": "", "videoOwnerChannelTitle": "Adele - Topic"}}"#,
        )
        .unwrap();
        assert_eq!(
            history_item(&video),
            ListeningHistoryItem::new("Unknown Title", "Adele")
        );

        let bare: VideoResource = serde_json::from_str(r#"{"id": "b"}"#).unwrap();
        assert_eq!(
            history_item(&bare),
            ListeningHistoryItem::new("Unknown Title", "Unknown Artist")
        );
    }

    #[test]
    fn test_split_playlists() {
        let json = r#"[
            {"id": "LM", "snippet": {"title": "Liked Music"}},
            {"id": "PL1", "snippet": {"title": "Road trip"}},
            {"id": "PL2"}
        ]"#;
        let items: Vec<PlaylistResource> = serde_json::from_str(json).unwrap();
        let playlists = split_playlists(items);
        assert_eq!(playlists.liked_music.unwrap().title, "Liked Music");
        assert_eq!(playlists.other.len(), 2);
        assert_eq!(playlists.other[1].title, "PL2");
    }

    #[tokio::test]
    async fn test_user_endpoints_require_login() {
        let client = YouTubeClient::new(Client::new(), Some("key".to_string()), None);
        assert!(matches!(
            client.liked_videos(10).await,
            Err(YouTubeError::NotAuthenticated)
        ));
    }
}
