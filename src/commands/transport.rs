// Transport: play/pause, skipping, seeking and player events.

use super::{App, SelectTarget};
use crate::errors::AppError;
use crate::player::PlayerEvent;
use crate::radio::EndAction;

impl App {
    pub(super) async fn play(&mut self) -> Result<(), AppError> {
        if self.radio.pending_advance() {
            return self.replay_while_waiting().await;
        }
        if self.queue.current().is_none() {
            return self.toggle().await;
        }
        if !self.queue.is_playing() {
            self.queue.set_playing(true);
            self.player.set_paused(false).await?;
        }
        Ok(())
    }

    pub(super) async fn pause(&mut self) -> Result<(), AppError> {
        if self.queue.is_playing() {
            self.queue.set_playing(false);
            self.player.set_paused(true).await?;
        }
        Ok(())
    }

    pub(super) async fn toggle(&mut self) -> Result<(), AppError> {
        if self.queue.is_empty() {
            self.say("The queue is empty. Try: request <something to listen to>");
            return Ok(());
        }
        if self.radio.pending_advance() {
            return self.replay_while_waiting().await;
        }
        if self.queue.play_pause() {
            return self.start_current().await;
        }
        let paused = !self.queue.is_playing();
        self.player.set_paused(paused).await?;
        self.say(if paused { "Paused" } else { "Playing" });
        Ok(())
    }

    /// Radio is waiting at the end of the queue and the user asked to play:
    /// restart the last song and stay on it when the new songs land.
    async fn replay_while_waiting(&mut self) -> Result<(), AppError> {
        self.radio.cancel_pending_advance();
        if self.queue.current().is_none() {
            return Ok(());
        }
        self.queue.set_playing(true);
        self.start_current().await
    }

    /// `next`: wraps around unless radio is on and the queue is exhausted.
    pub(super) async fn skip_forward(&mut self) -> Result<(), AppError> {
        if self.queue.is_empty() {
            return Ok(());
        }
        if self.queue.is_at_end() {
            return self.at_queue_end(true).await;
        }
        self.radio.cancel_pending_advance();
        self.queue.next();
        self.start_current().await
    }

    pub(super) async fn skip_back(&mut self) -> Result<(), AppError> {
        self.radio.cancel_pending_advance();
        if self.queue.prev().is_none() {
            return Ok(());
        }
        self.start_current().await
    }

    pub(super) async fn seek(&mut self, percent: f64) -> Result<(), AppError> {
        match self.queue.seek(percent) {
            Some(seconds) => {
                self.player.seek(seconds).await?;
                Ok(())
            }
            None => {
                self.say("Nothing is playing.");
                Ok(())
            }
        }
    }

    pub(super) async fn select(&mut self, target: SelectTarget) -> Result<(), AppError> {
        let found = match &target {
            SelectTarget::Id(id) => self.queue.select(id).is_some(),
            SelectTarget::Position(n) => self.queue.select_index(n - 1).is_some(),
        };
        if !found {
            let label = match target {
                SelectTarget::Id(id) => id,
                SelectTarget::Position(n) => format!("#{}", n),
            };
            self.say(&format!("No song {} in the queue.", label));
            return Ok(());
        }
        self.radio.cancel_pending_advance();
        self.start_current().await
    }

    pub async fn handle_player_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::Position(seconds) => self.queue.set_position(seconds),
            PlayerEvent::Duration(seconds) => {
                if seconds.is_finite() && seconds > 0.0 {
                    self.queue.set_current_duration(seconds.round() as u64);
                }
            }
            PlayerEvent::Ended => {
                if let Err(e) = self.on_track_ended().await {
                    self.toast("Playback Error", &e.to_string());
                }
            }
            PlayerEvent::Error(message) => {
                self.toast("Playback Error", &message);
                if self.queue.is_playing() {
                    if let Err(e) = self.on_track_ended().await {
                        self.toast("Playback Error", &e.to_string());
                    }
                }
            }
        }
    }

    async fn on_track_ended(&mut self) -> Result<(), AppError> {
        if self.queue.current().is_none() {
            return Ok(());
        }
        if self.queue.is_at_end() {
            return self.at_queue_end(false).await;
        }
        self.queue.advance();
        self.start_current().await
    }

    /// `skipped` is set when the user pressed next on the last song, which
    /// is still playing in mpv and has to be paused while radio waits.
    async fn at_queue_end(&mut self, skipped: bool) -> Result<(), AppError> {
        let action = self.radio.at_end();
        if action == EndAction::Wrap {
            self.queue.next();
            return self.start_current().await;
        }

        if skipped && self.queue.is_playing() {
            self.player.set_paused(true).await?;
        }
        self.queue.set_playing(false);
        match action {
            EndAction::Extend(generation) => {
                self.say("Radio: finding more songs...");
                self.spawn_extension(generation);
            }
            _ => self.say("Radio: waiting for more songs..."),
        }
        Ok(())
    }

    /// Load the current song into the player, then top up the radio queue
    /// if it is running low.
    pub(crate) async fn start_current(&mut self) -> Result<(), AppError> {
        let Some(song) = self.queue.current() else {
            return Ok(());
        };
        let video_id = song.video_id.clone();
        let line = format!("Now playing: {}", song.display_name());

        self.say(&line);
        self.player.load(&video_id).await?;
        self.maybe_extend();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{band_platform, Harness, ScriptedPrompts};
    use crate::player::PlayerEvent;
    use crate::queue::tests::song;

    async fn harness_with_queue(ids: &[&str]) -> Harness {
        let mut h = Harness::new(band_platform(&[]), ScriptedPrompts::default()).await;
        h.app
            .queue
            .set_songs(ids.iter().map(|id| song(id, 200)).collect());
        h
    }

    #[tokio::test]
    async fn test_toggle_starts_then_pauses() {
        let mut h = harness_with_queue(&["a", "b"]).await;
        h.run("toggle").await;
        h.run("toggle").await;
        h.run("toggle").await;
        assert_eq!(h.calls(), vec!["load a", "pause true", "pause false"]);
    }

    #[tokio::test]
    async fn test_play_and_pause_are_idempotent() {
        let mut h = harness_with_queue(&["a"]).await;
        h.run("pause").await;
        h.run("play").await;
        h.run("play").await;
        h.run("pause").await;
        h.run("pause").await;
        assert_eq!(h.calls(), vec!["load a", "pause true"]);
    }

    #[tokio::test]
    async fn test_next_wraps_without_radio() {
        let mut h = harness_with_queue(&["a", "b"]).await;
        h.run("next").await;
        h.run("next").await;
        h.run("next").await;
        h.run("prev").await;
        assert_eq!(h.calls(), vec!["load a", "load b", "load a", "load b"]);
    }

    #[tokio::test]
    async fn test_track_end_advances_and_wraps() {
        let mut h = harness_with_queue(&["a", "b"]).await;
        h.run("play").await;
        h.app.handle_player_event(PlayerEvent::Ended).await;
        h.app.handle_player_event(PlayerEvent::Ended).await;
        assert_eq!(h.calls(), vec!["load a", "load b", "load a"]);
    }

    #[tokio::test]
    async fn test_ended_before_playback_is_ignored() {
        let mut h = harness_with_queue(&["a"]).await;
        h.app.handle_player_event(PlayerEvent::Ended).await;
        assert!(h.calls().is_empty());
    }

    #[tokio::test]
    async fn test_seek_converts_percent() {
        let mut h = harness_with_queue(&["a"]).await;
        h.run("seek 50").await;
        assert!(h.output.text().contains("Nothing is playing."));
        h.run("play").await;
        h.run("seek 25").await;
        h.run("seek 400").await;
        assert_eq!(h.calls(), vec!["load a", "seek 50", "seek 200"]);
        assert_eq!(h.app.queue.progress(), 100.0);
    }

    #[tokio::test]
    async fn test_select_by_id_and_position() {
        let mut h = harness_with_queue(&["a", "b", "c"]).await;
        h.run("select c").await;
        h.run("select #2").await;
        h.run("select #9").await;
        h.run("select nope").await;
        assert_eq!(h.calls(), vec!["load c", "load b"]);
        let text = h.output.text();
        assert!(text.contains("No song #9 in the queue."));
        assert!(text.contains("No song nope in the queue."));
    }

    #[tokio::test]
    async fn test_position_events_update_progress() {
        let mut h = harness_with_queue(&["a"]).await;
        h.run("play").await;
        h.app.handle_player_event(PlayerEvent::Position(50.0)).await;
        assert_eq!(h.app.queue.progress(), 25.0);
    }

    #[tokio::test]
    async fn test_player_error_skips_song() {
        let mut h = harness_with_queue(&["a", "b"]).await;
        h.run("play").await;
        h.app
            .handle_player_event(PlayerEvent::Error("unrecognized file format".to_string()))
            .await;
        assert_eq!(h.calls(), vec!["load a", "load b"]);
        assert!(h
            .output
            .text()
            .contains("Playback Error: unrecognized file format"));
    }

    #[tokio::test]
    async fn test_toggle_on_empty_queue() {
        let mut h = harness_with_queue(&[]).await;
        h.run("toggle").await;
        h.run("next").await;
        h.run("prev").await;
        assert!(h.calls().is_empty());
        assert!(h.output.text().contains("The queue is empty."));
    }
}
