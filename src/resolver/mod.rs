//! Resolve AI song names to playable videos.
//!
//! Matching strategy for each name:
//! 1. Search "{title} {artist}" and rank the hits by title and artist
//!    match, falling back to the top hit.
//! 2. If that finds nothing, search the title alone and only accept a hit
//!    that matches the artist.
//!
//! Metadata (duration, artwork) is looked up best effort. Names that do not
//! resolve are dropped and reported back.

pub mod names;

use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;

use crate::models::Song;
use crate::youtube::models::fallback_thumbnail_url;
use crate::youtube::{VideoCandidate, VideoPlatform};
use names::{clean_title, loosely_matches, parse_song_name, primary_artist, SongName};

/// How many search hits to inspect per query.
const SEARCH_DEPTH: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct ResolvedPlaylist {
    pub songs: Vec<Song>,
    pub unresolved: Vec<String>,
}

pub struct TrackResolver {
    platform: Arc<dyn VideoPlatform>,
    concurrency: usize,
}

impl TrackResolver {
    pub fn new(platform: Arc<dyn VideoPlatform>, concurrency: usize) -> Self {
        Self {
            platform,
            concurrency: concurrency.max(1),
        }
    }

    /// Resolve one `"Title by Artist"` string. `None` means no playable
    /// match was found.
    pub async fn resolve(&self, raw_name: &str, album_label: &str) -> Option<Song> {
        let name = parse_song_name(raw_name);
        if name.title.is_empty() {
            return None;
        }

        let candidate = self.find_video(&name).await?;
        Some(self.build_song(&name, candidate, album_label).await)
    }

    /// Resolve a whole AI playlist, keeping the model's order. Duplicate
    /// videos are dropped and the result is capped at `limit`.
    pub async fn resolve_all(
        &self,
        raw_names: &[String],
        album_label: &str,
        limit: usize,
    ) -> ResolvedPlaylist {
        let results: Vec<(String, Option<Song>)> = stream::iter(raw_names.iter().cloned())
            .map(|raw| async move {
                let song = self.resolve(&raw, album_label).await;
                (raw, song)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut playlist = ResolvedPlaylist::default();
        let mut seen = HashSet::new();

        for (raw, song) in results {
            match song {
                Some(song) if playlist.songs.len() < limit => {
                    if seen.insert(song.video_id.clone()) {
                        playlist.songs.push(song);
                    } else {
                        log::debug!("Dropping duplicate video {} for '{}'", song.video_id, raw);
                    }
                }
                Some(_) => {}
                None => playlist.unresolved.push(raw),
            }
        }

        log::info!(
            "Resolved {}/{} suggested songs ({} unresolved)",
            playlist.songs.len(),
            raw_names.len(),
            playlist.unresolved.len()
        );
        playlist
    }

    async fn find_video(&self, name: &SongName) -> Option<VideoCandidate> {
        let title = clean_title(&name.title);
        let artist = primary_artist(&name.artist);

        // Step 1: "{title} {artist}"
        let query = format!("{} {}", title, artist).trim().to_string();
        match self.platform.search_videos(&query, SEARCH_DEPTH).await {
            Ok(hits) if !hits.is_empty() => return Some(best_hit(hits, &title, &artist)),
            Ok(_) => log::debug!("No results for '{}'", query),
            Err(e) => log::warn!("Search failed for '{}': {}", query, e),
        }

        // Step 2: title only, artist must match
        if artist.is_empty() || query == title {
            return None;
        }
        match self.platform.search_videos(&title, SEARCH_DEPTH).await {
            Ok(hits) => hits.into_iter().find(|h| {
                loosely_matches(&h.channel_title, &artist) || loosely_matches(&h.title, &artist)
            }),
            Err(e) => {
                log::warn!("Title-only search failed for '{}': {}", title, e);
                None
            }
        }
    }

    async fn build_song(&self, name: &SongName, hit: VideoCandidate, album_label: &str) -> Song {
        let (duration, album_art_url, channel) =
            match self.platform.video_details(&hit.video_id).await {
                Ok(details) => (
                    details.duration_secs,
                    details.thumbnail_url,
                    details.channel_title,
                ),
                Err(e) => {
                    log::debug!("No metadata for {}: {}", hit.video_id, e);
                    (
                        0,
                        fallback_thumbnail_url(&hit.video_id),
                        hit.channel_title.clone(),
                    )
                }
            };

        let artist = if name.artist.is_empty() {
            crate::youtube::client::artist_from_channel(&channel)
        } else {
            name.artist.clone()
        };

        Song {
            id: hit.video_id.clone(),
            title: name.title.clone(),
            artist,
            album: album_label.to_string(),
            duration,
            album_art_url,
            video_id: hit.video_id,
        }
    }
}

/// Highest scoring hit (title match + artist match), earliest on ties.
/// `hits` must not be empty.
fn best_hit(mut hits: Vec<VideoCandidate>, title: &str, artist: &str) -> VideoCandidate {
    let score = |h: &VideoCandidate| {
        let title_match = loosely_matches(&h.title, title);
        let artist_match = !artist.is_empty()
            && (loosely_matches(&h.channel_title, artist) || loosely_matches(&h.title, artist));
        title_match as u8 + artist_match as u8
    };

    let mut best_index = 0;
    let mut best_score = 0;
    for (i, h) in hits.iter().enumerate() {
        let s = score(h);
        if s > best_score {
            best_score = s;
            best_index = i;
        }
    }
    hits.swap_remove(best_index)
}
