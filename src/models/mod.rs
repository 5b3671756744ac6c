use serde::{Deserialize, Serialize};

/// A playable entry in the queue. `id` is the video id unless the same video
/// was queued more than once, in which case it carries a generated suffix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Duration in seconds, 0 when unknown.
    pub duration: u64,
    #[serde(rename = "albumArtUrl")]
    pub album_art_url: String,
    #[serde(rename = "videoId")]
    pub video_id: String,
}

impl Song {
    pub fn display_name(&self) -> String {
        if self.artist.is_empty() {
            self.title.clone()
        } else {
            format!("{} by {}", self.title, self.artist)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListeningHistoryItem {
    pub title: String,
    pub artist: String,
}

impl ListeningHistoryItem {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub genre_preferences: Vec<String>,
    pub artist_preferences: Vec<String>,
    pub song_preferences: Vec<String>,
    pub overall_taste_profile: String,
}

/// A playlist owned by the video platform account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorPlaylist {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPlaylists {
    pub liked_music: Option<VendorPlaylist>,
    pub other: Vec<VendorPlaylist>,
}

/// Formats seconds as `m:ss`.
pub fn format_time(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "0:00");
        assert_eq!(format_time(65), "1:05");
        assert_eq!(format_time(600), "10:00");
    }

    #[test]
    fn test_analysis_result_wire_names() {
        let json = r#"{
            "genrePreferences": ["Pop"],
            "artistPreferences": ["The Weeknd"],
            "songPreferences": ["Blinding Lights"],
            "overallTasteProfile": "Synth-heavy pop."
        }"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.genre_preferences, vec!["Pop"]);
        assert_eq!(result.overall_taste_profile, "Synth-heavy pop.");
    }
}
