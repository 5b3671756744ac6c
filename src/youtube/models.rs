//! Wire types for the YouTube Data API v3 and Google's OAuth endpoints.
//! Only the fields the player reads are modelled.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub id: SearchResultId,
    pub snippet: Option<Snippet>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultId {
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResource {
    pub id: String,
    pub snippet: Option<Snippet>,
    pub content_details: Option<ContentDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistResource {
    pub id: String,
    pub snippet: Option<Snippet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub title: String,
    pub channel_title: Option<String>,
    pub video_owner_channel_title: Option<String>,
    pub thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    pub default: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    pub high: Option<Thumbnail>,
    pub standard: Option<Thumbnail>,
    pub maxres: Option<Thumbnail>,
}

impl Thumbnails {
    /// Largest available thumbnail.
    pub fn best_url(&self) -> Option<&str> {
        [
            &self.maxres,
            &self.standard,
            &self.high,
            &self.medium,
            &self.default,
        ]
        .into_iter()
        .flatten()
        .map(|t| t.url.as_str())
        .next()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentDetails {
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
}

/// A search hit, before any metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCandidate {
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDetails {
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
    pub duration_secs: u64,
    pub thumbnail_url: String,
}

// --- OAuth ---

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    #[serde(alias = "verification_uri")]
    pub verification_url: String,
    pub expires_in: u64,
    #[serde(default = "default_poll_interval")]
    pub interval: u64,
}

fn default_poll_interval() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}

/// Standard thumbnail URL, used when the metadata lookup fails.
pub fn fallback_thumbnail_url(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id)
}

/// Parse an ISO-8601 duration as returned in `contentDetails.duration`
/// (`PT1H2M3S`, `PT4M`, `P1DT2S`). Returns `None` on anything else.
pub fn parse_iso8601_duration(value: &str) -> Option<u64> {
    let rest = value.strip_prefix('P')?;
    let mut total = 0u64;
    let mut number = String::new();
    let mut in_time = false;
    let mut saw_component = false;

    for c in rest.chars() {
        match c {
            'T' => {
                if !number.is_empty() || in_time {
                    return None;
                }
                in_time = true;
            }
            '0'..='9' => number.push(c),
            unit => {
                let n: u64 = number.parse().ok()?;
                number.clear();
                let factor = match (in_time, unit) {
                    (false, 'W') => 7 * 86_400,
                    (false, 'D') => 86_400,
                    (true, 'H') => 3_600,
                    (true, 'M') => 60,
                    (true, 'S') => 1,
                    _ => return None,
                };
                total = n.checked_mul(factor).and_then(|secs| total.checked_add(secs))?;
                saw_component = true;
            }
        }
    }

    if !number.is_empty() || !saw_component {
        return None;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_durations() {
        assert_eq!(parse_iso8601_duration("PT3M20S"), Some(200));
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), Some(3723));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("PT4M"), Some(240));
        assert_eq!(parse_iso8601_duration("P1DT2S"), Some(86_402));
        assert_eq!(parse_iso8601_duration("P0D"), Some(0));
    }

    #[test]
    fn test_parse_bad_durations() {
        assert_eq!(parse_iso8601_duration(""), None);
        assert_eq!(parse_iso8601_duration("3M20S"), None);
        assert_eq!(parse_iso8601_duration("PT"), None);
        assert_eq!(parse_iso8601_duration("PT5"), None);
        assert_eq!(parse_iso8601_duration("PT1X"), None);
        assert_eq!(parse_iso8601_duration("P5M"), None);
        assert_eq!(parse_iso8601_duration("P9999999999999999999W"), None);
        assert_eq!(parse_iso8601_duration("PT18446744073709551615S1M"), None);
    }

    #[test]
    fn test_best_thumbnail() {
        let json = r#"{
            "default": {"url": "d"},
            "high": {"url": "h"}
        }"#;
        let thumbs: Thumbnails = serde_json::from_str(json).unwrap();
        assert_eq!(thumbs.best_url(), Some("h"));
        assert_eq!(Thumbnails::default().best_url(), None);
    }

    #[test]
    fn test_search_response_without_items() {
        let resp: ListResponse<SearchResult> = serde_json::from_str("{}").unwrap();
        assert!(resp.items.is_empty());
        assert!(resp.next_page_token.is_none());
    }
}
