// AI DJ commands: playlist requests, taste analysis and adding single songs.

use super::radio::generate;
use super::{send_event, spawn_job, Analysis, App, AppEvent};
use crate::errors::AppError;
use crate::history::history_json;
use crate::models::{format_time, Song};
use crate::resolver::ResolvedPlaylist;

const ADDED_ALBUM: &str = "Added";

impl App {
    pub(super) async fn request_playlist(&mut self, text: String) -> Result<(), AppError> {
        if text.is_empty() {
            return Ok(());
        }
        let prompts = self.prompt_service()?;
        if self.radio.is_active() {
            self.radio.stop();
            self.say("Radio off.");
        }
        let logged_in = self.is_logged_in().await;
        self.busy = true;
        self.say(&format!("Generating a playlist for \"{}\"...", text));

        let history = self.history.clone();
        let resolver = self.resolver.clone();
        let events = self.events.clone();
        let limit = self.playlist_size;
        let request = text.clone();

        let job = async move {
            let result = async {
                let names = generate(&history, logged_in, prompts.as_ref(), &text).await?;
                let playlist = resolver.resolve_all(&names, &text, limit).await;
                if playlist.songs.is_empty() {
                    return Err(AppError::YouTube(
                        "none of the suggested songs could be found".to_string(),
                    ));
                }
                Ok(playlist)
            }
            .await;

            send_event(
                &events,
                AppEvent::PlaylistReady {
                    request: text,
                    result: result.map_err(|e| e.to_string()),
                },
            );
        };
        spawn_job(&self.events, job, move |error| AppEvent::PlaylistReady {
            request,
            result: Err(error),
        });
        Ok(())
    }

    pub(super) async fn on_playlist_ready(
        &mut self,
        request: String,
        result: Result<ResolvedPlaylist, String>,
    ) {
        self.busy = false;
        let playlist = match result {
            Ok(playlist) => playlist,
            Err(e) => {
                self.toast("Playlist Generation Failed", &e);
                return;
            }
        };

        if let Err(e) = self.player.stop().await {
            log::debug!("Stopping player before replacing the queue failed: {}", e);
        }
        let count = playlist.songs.len();
        self.queue.set_songs(playlist.songs);

        self.say(&format!(
            "Playlist Generated! Your new playlist based on \"{}\" is ready ({} songs).",
            request, count
        ));
        if !playlist.unresolved.is_empty() {
            self.say(&format!(
                "Could not find: {}",
                playlist.unresolved.join("; ")
            ));
        }
        self.show_queue();
    }

    pub(super) async fn analyze(&mut self, refresh: bool) -> Result<(), AppError> {
        let prompts = self.prompt_service()?;
        let logged_in = self.is_logged_in().await;
        self.busy = true;
        self.say("Analyzing your listening history...");

        let history = self.history.clone();
        let analyses = self.analyses.clone();
        let events = self.events.clone();

        let job = async move {
            let result = async {
                let loaded = history.load(logged_in).await?;
                let json = history_json(&loaded.items)?;

                if !refresh {
                    if let Some(cached) = analyses.get(&json).await? {
                        return Ok(Analysis {
                            result: cached.result,
                            cached_at: Some(cached.created_at),
                            from_sample: loaded.is_sample,
                        });
                    }
                }

                let result = prompts.analyze_listening_history(&json).await?;
                if let Err(e) = analyses.set(&json, &result).await {
                    log::warn!("Failed to cache taste analysis: {}", e);
                }
                Ok::<_, AppError>(Analysis {
                    result,
                    cached_at: None,
                    from_sample: loaded.is_sample,
                })
            }
            .await;

            send_event(
                &events,
                AppEvent::AnalysisReady(result.map_err(|e| e.to_string())),
            );
        };
        spawn_job(&self.events, job, |error| AppEvent::AnalysisReady(Err(error)));
        Ok(())
    }

    pub(super) fn on_analysis_ready(&mut self, result: Result<Analysis, String>) {
        self.busy = false;
        match result {
            Ok(analysis) => self.show_analysis(&analysis),
            Err(e) => self.toast("Analysis Failed", &e),
        }
    }

    pub(super) async fn add_song(&mut self, name: String) -> Result<(), AppError> {
        self.busy = true;
        let resolver = self.resolver.clone();
        let events = self.events.clone();
        let failed = name.clone();

        let job = async move {
            let song = resolver.resolve(&name, ADDED_ALBUM).await;
            send_event(&events, AppEvent::SongResolved { name, song });
        };
        spawn_job(&self.events, job, move |_| AppEvent::SongResolved {
            name: failed,
            song: None,
        });
        Ok(())
    }

    pub(super) fn on_song_resolved(&mut self, name: String, song: Option<Song>) {
        self.busy = false;
        let Some(song) = song else {
            self.toast("Add Failed", &format!("could not find \"{}\"", name));
            return;
        };
        let line = format!(
            "Added {} [{}] at #{}",
            song.display_name(),
            format_time(song.duration),
            self.queue.len() + 1
        );
        self.queue.add(song);
        self.say(&line);
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{band_platform, by_band, Harness, ScriptedPrompts};
    use crate::radio::RadioPhase;

    fn script(titles: &[&str]) -> ScriptedPrompts {
        let names = by_band(titles);
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        ScriptedPrompts::default().then(&names)
    }

    #[tokio::test]
    async fn test_request_replaces_queue() {
        let prompts = script(&["A", "Ghost", "B"]);
        let mut h = Harness::new(band_platform(&["A", "B"]), prompts).await;

        h.run("request 90s rock classics").await;
        assert!(h.app.is_busy());
        h.settle().await;

        assert!(!h.app.is_busy());
        assert_eq!(h.queued_ids(), vec!["a", "b"]);
        assert!(h.app.queue.current().is_none());
        assert_eq!(h.app.queue.songs()[0].album, "90s rock classics");

        let text = h.output.text();
        assert!(text.contains("Playlist Generated! Your new playlist based on \"90s rock classics\" is ready (2 songs)."));
        assert!(text.contains("Could not find: Ghost by Band"));

        let (history, request) = h.prompts.requests.lock()[0].clone();
        assert_eq!(request, "90s rock classics");
        // logged out with nothing cached: the sample history is sent
        assert!(history.contains("Blinding Lights"));
    }

    #[tokio::test]
    async fn test_empty_request_is_ignored() {
        let mut h = Harness::new(band_platform(&[]), ScriptedPrompts::default()).await;
        h.run("request   ").await;
        assert!(!h.app.is_busy());
        assert!(h.prompts.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_busy_rejects_second_request() {
        let prompts = script(&["A"]);
        let mut h = Harness::new(band_platform(&["A"]), prompts).await;

        h.run("request one").await;
        h.run("request two").await;
        assert!(h.output.text().contains("Still working on the previous request"));
        h.settle().await;
        assert_eq!(h.prompts.requests.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_request_keeps_queue() {
        let prompts = ScriptedPrompts::default().then_fail();
        let mut h = Harness::new(band_platform(&[]), prompts).await;
        h.app
            .queue
            .set_songs(vec![crate::queue::tests::song("keep", 100)]);

        h.run("request anything").await;
        h.settle().await;

        assert_eq!(h.queued_ids(), vec!["keep"]);
        assert!(h.output.text().contains("Playlist Generation Failed:"));
        assert!(!h.app.is_busy());
    }

    #[tokio::test]
    async fn test_request_with_nothing_resolved_fails() {
        let prompts = script(&["Ghost"]);
        let mut h = Harness::new(band_platform(&[]), prompts).await;
        h.run("request anything").await;
        h.settle().await;
        assert!(h
            .output
            .text()
            .contains("none of the suggested songs could be found"));
    }

    #[tokio::test]
    async fn test_request_turns_radio_off() {
        let prompts = script(&["A"]).then(&["B by Band"]);
        let mut h = Harness::new(band_platform(&["A", "B"]), prompts).await;

        h.run("radio").await;
        h.settle().await; // provisional
        h.settle().await; // seed
        // seed left nothing after "a": an extension is running
        assert_eq!(h.app.radio.phase(), RadioPhase::Extending);
        h.run("request something else").await;
        assert_eq!(h.app.radio.phase(), RadioPhase::Off);
    }

    #[tokio::test]
    async fn test_analyze_uses_cache_unless_refreshed() {
        let mut h = Harness::new(band_platform(&[]), ScriptedPrompts::default()).await;

        h.run("analyze").await;
        h.settle().await;
        h.run("analyze").await;
        h.settle().await;
        assert_eq!(*h.prompts.analyses.lock(), 1);

        h.run("analyze --refresh").await;
        h.settle().await;
        assert_eq!(*h.prompts.analyses.lock(), 2);

        let text = h.output.text();
        assert!(text.contains("Neon-lit pop with a retro pulse."));
        assert!(text.contains("(cached 20"));
    }

    #[tokio::test]
    async fn test_add_song() {
        let mut h = Harness::new(band_platform(&["A"]), ScriptedPrompts::default()).await;
        h.run("add A by Band").await;
        h.settle().await;
        h.run("add A by Band").await;
        h.settle().await;
        h.run("add Nope by Nobody").await;
        h.settle().await;

        let ids = h.queued_ids();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], "a");
        assert!(ids[1].starts_with("a#"));
        let text = h.output.text();
        assert!(text.contains("Added A by Band [3:20] at #1"));
        assert!(text.contains("Add Failed: could not find \"Nope by Nobody\""));
    }
}
