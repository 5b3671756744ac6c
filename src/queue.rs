use std::collections::HashSet;

use crate::models::Song;

/// The playlist being played and the transport position within it.
///
/// Progress is tracked as a percentage of the current song, the way the
/// player bar shows it.
pub struct PlayQueue {
    songs: Vec<Song>,
    current_index: Option<usize>,
    is_playing: bool,
    /// 0.0..=100.0
    progress: f64,
}

impl Default for PlayQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayQueue {
    pub fn new() -> Self {
        Self {
            songs: Vec::new(),
            current_index: None,
            is_playing: false,
            progress: 0.0,
        }
    }

    /// Replace the playlist. Nothing is current until playback starts.
    pub fn set_songs(&mut self, songs: Vec<Song>) {
        self.songs = songs;
        self.current_index = None;
        self.is_playing = false;
        self.progress = 0.0;
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current(&self) -> Option<&Song> {
        self.current_index.and_then(|i| self.songs.get(i))
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.is_playing = playing && self.current_index.is_some();
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Songs queued after the current one.
    pub fn remaining(&self) -> usize {
        match self.current_index {
            Some(i) => self.songs.len().saturating_sub(i + 1),
            None => self.songs.len(),
        }
    }

    pub fn is_at_end(&self) -> bool {
        matches!(self.current_index, Some(i) if i + 1 >= self.songs.len())
    }

    /// Start at the first song if nothing is current, otherwise toggle.
    /// Returns true when a new song became current.
    pub fn play_pause(&mut self) -> bool {
        if self.current_index.is_none() {
            if self.songs.is_empty() {
                return false;
            }
            self.jump_to(0);
            return true;
        }
        self.is_playing = !self.is_playing;
        false
    }

    /// Advance, wrapping to the first song. From "nothing current" this
    /// starts at the first song.
    pub fn next(&mut self) -> Option<&Song> {
        if self.songs.is_empty() {
            return None;
        }
        let next = match self.current_index {
            Some(i) => (i + 1) % self.songs.len(),
            None => 0,
        };
        self.jump_to(next);
        self.current()
    }

    /// Step back, wrapping to the last song.
    pub fn prev(&mut self) -> Option<&Song> {
        if self.songs.is_empty() {
            return None;
        }
        let prev = match self.current_index {
            Some(0) => self.songs.len() - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.jump_to(prev);
        self.current()
    }

    /// Move to the song after the current one without wrapping.
    pub fn advance(&mut self) -> Option<&Song> {
        let next = match self.current_index {
            Some(i) if i + 1 < self.songs.len() => i + 1,
            Some(_) => return None,
            None if !self.songs.is_empty() => 0,
            None => return None,
        };
        self.jump_to(next);
        self.current()
    }

    /// Play the song with `id`. Unknown ids leave the queue untouched.
    pub fn select(&mut self, id: &str) -> Option<&Song> {
        let index = self.songs.iter().position(|s| s.id == id)?;
        self.jump_to(index);
        self.current()
    }

    pub fn select_index(&mut self, index: usize) -> Option<&Song> {
        if index >= self.songs.len() {
            return None;
        }
        self.jump_to(index);
        self.current()
    }

    fn jump_to(&mut self, index: usize) {
        self.current_index = Some(index);
        self.progress = 0.0;
        self.is_playing = true;
    }

    /// Append songs whose video is not queued yet. Returns how many were added.
    pub fn append(&mut self, songs: Vec<Song>) -> usize {
        let mut queued: HashSet<String> =
            self.songs.iter().map(|s| s.video_id.clone()).collect();
        let before = self.songs.len();
        for song in songs {
            if queued.insert(song.video_id.clone()) {
                self.songs.push(song);
            }
        }
        self.songs.len() - before
    }

    /// Enqueue one song. A video that is already queued gets a generated id so
    /// each entry stays individually selectable. Returns the id used.
    pub fn add(&mut self, mut song: Song) -> String {
        if self.songs.iter().any(|s| s.id == song.id) {
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            song.id = format!("{}#{}", song.video_id, &suffix[..8]);
        }
        let id = song.id.clone();
        self.songs.push(song);
        id
    }

    /// Update progress from a player position in seconds.
    pub fn set_position(&mut self, seconds: f64) {
        let Some(song) = self.current() else {
            return;
        };
        if song.duration == 0 {
            return;
        }
        self.progress = (seconds / song.duration as f64 * 100.0).clamp(0.0, 100.0);
    }

    /// Fill in a duration the metadata lookup could not provide.
    pub fn set_current_duration(&mut self, seconds: u64) {
        if let Some(i) = self.current_index {
            if let Some(song) = self.songs.get_mut(i) {
                if song.duration == 0 {
                    song.duration = seconds;
                }
            }
        }
    }

    /// Set progress to `percent` and return the matching position in seconds,
    /// or `None` when nothing is playing.
    pub fn seek(&mut self, percent: f64) -> Option<f64> {
        let duration = self.current()?.duration;
        let percent = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self.progress = percent;
        Some(duration as f64 * percent / 100.0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn song(id: &str, duration: u64) -> Song {
        Song {
            id: id.to_string(),
            title: format!("Title {}", id),
            artist: "Artist".to_string(),
            album: "AI DJ".to_string(),
            duration,
            album_art_url: String::new(),
            video_id: id.to_string(),
        }
    }

    fn queue(ids: &[&str]) -> PlayQueue {
        let mut q = PlayQueue::new();
        q.set_songs(ids.iter().map(|id| song(id, 200)).collect());
        q
    }

    #[test]
    fn test_play_pause_starts_at_first_song() {
        let mut q = queue(&["a", "b"]);
        assert!(q.current().is_none());
        assert!(q.play_pause());
        assert_eq!(q.current().unwrap().id, "a");
        assert!(q.is_playing());

        assert!(!q.play_pause());
        assert!(!q.is_playing());
        assert!(!q.play_pause());
        assert!(q.is_playing());
    }

    #[test]
    fn test_play_pause_on_empty_queue() {
        let mut q = PlayQueue::new();
        assert!(!q.play_pause());
        assert!(!q.is_playing());
        assert!(q.next().is_none());
        assert!(q.prev().is_none());
    }

    #[test]
    fn test_next_and_prev_wrap() {
        let mut q = queue(&["a", "b", "c"]);
        assert_eq!(q.next().unwrap().id, "a");
        assert_eq!(q.next().unwrap().id, "b");
        assert_eq!(q.next().unwrap().id, "c");
        assert_eq!(q.next().unwrap().id, "a");
        assert_eq!(q.prev().unwrap().id, "c");
        assert_eq!(q.prev().unwrap().id, "b");
    }

    #[test]
    fn test_prev_from_nothing_starts_at_first() {
        let mut q = queue(&["a", "b"]);
        assert_eq!(q.prev().unwrap().id, "a");
    }

    #[test]
    fn test_transport_resets_progress() {
        let mut q = queue(&["a", "b"]);
        q.next();
        q.set_position(100.0);
        assert_eq!(q.progress(), 50.0);
        q.next();
        assert_eq!(q.progress(), 0.0);
        assert!(q.is_playing());
    }

    #[test]
    fn test_advance_does_not_wrap() {
        let mut q = queue(&["a", "b"]);
        assert_eq!(q.advance().unwrap().id, "a");
        assert_eq!(q.advance().unwrap().id, "b");
        assert!(q.is_at_end());
        assert!(q.advance().is_none());
        assert_eq!(q.current().unwrap().id, "b");
    }

    #[test]
    fn test_select_unknown_is_noop() {
        let mut q = queue(&["a", "b"]);
        q.next();
        assert!(q.select("zzz").is_none());
        assert_eq!(q.current().unwrap().id, "a");
        assert_eq!(q.select("b").unwrap().id, "b");
        assert!(q.select_index(9).is_none());
    }

    #[test]
    fn test_remaining() {
        let mut q = queue(&["a", "b", "c", "d"]);
        assert_eq!(q.remaining(), 4);
        q.next();
        assert_eq!(q.remaining(), 3);
        q.select("d");
        assert_eq!(q.remaining(), 0);
    }

    #[test]
    fn test_append_skips_queued_videos() {
        let mut q = queue(&["a", "b"]);
        let added = q.append(vec![song("b", 1), song("c", 1), song("c", 1)]);
        assert_eq!(added, 1);
        let ids: Vec<&str> = q.songs().iter().map(|s| s.video_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_add_duplicate_gets_fallback_id() {
        let mut q = queue(&["a"]);
        let id = q.add(song("a", 1));
        assert_ne!(id, "a");
        assert!(id.starts_with("a#"));
        assert_eq!(q.len(), 2);
        assert_eq!(q.select(&id).unwrap().video_id, "a");
        assert_eq!(q.current_index(), Some(1));
    }

    #[test]
    fn test_seek_clamps() {
        let mut q = queue(&["a"]);
        assert!(q.seek(50.0).is_none());
        q.next();
        assert_eq!(q.seek(50.0), Some(100.0));
        assert_eq!(q.seek(150.0), Some(200.0));
        assert_eq!(q.progress(), 100.0);
        assert_eq!(q.seek(-3.0), Some(0.0));
        assert_eq!(q.seek(f64::NAN), Some(0.0));
    }

    #[test]
    fn test_unknown_duration_is_filled_in() {
        let mut q = PlayQueue::new();
        q.set_songs(vec![song("a", 0)]);
        q.next();
        q.set_position(30.0);
        assert_eq!(q.progress(), 0.0);
        q.set_current_duration(120);
        q.set_position(30.0);
        assert_eq!(q.progress(), 25.0);
    }
}
