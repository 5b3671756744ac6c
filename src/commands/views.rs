// Text views of the queue, the player and the taste analysis.

use super::{Analysis, App};
use crate::models::format_time;

impl App {
    pub(super) fn show_queue(&mut self) {
        if self.queue.is_empty() {
            self.say("The queue is empty.");
            return;
        }
        let current = self.queue.current_index();
        let lines: Vec<String> = self
            .queue
            .songs()
            .iter()
            .enumerate()
            .map(|(i, song)| {
                let marker = if Some(i) == current { ">" } else { " " };
                format!(
                    "{} #{:<3} {} [{}] ({})",
                    marker,
                    i + 1,
                    song.display_name(),
                    format_time(song.duration),
                    song.id
                )
            })
            .collect();
        for line in lines {
            self.say(&line);
        }
    }

    pub(super) fn show_status(&mut self) {
        let line = match self.queue.current() {
            Some(song) => {
                let elapsed = (song.duration as f64 * self.queue.progress() / 100.0) as u64;
                format!(
                    "{} {} [{} / {}] {:.0}%",
                    if self.queue.is_playing() { "Playing" } else { "Paused" },
                    song.display_name(),
                    format_time(elapsed),
                    format_time(song.duration),
                    self.queue.progress()
                )
            }
            None => "Nothing playing.".to_string(),
        };
        self.say(&line);

        let mut extra = format!(
            "Queue: {} songs, {} up next. Radio: {}.",
            self.queue.len(),
            self.queue.remaining(),
            self.radio_label()
        );
        if self.busy {
            extra.push_str(" AI DJ is working...");
        }
        self.say(&extra);
    }

    pub(super) fn show_analysis(&mut self, analysis: &Analysis) {
        let result = &analysis.result;
        let mut heading = "Your taste analysis".to_string();
        if let Some(at) = analysis.cached_at {
            heading.push_str(&format!(" (cached {})", at.format("%Y-%m-%d %H:%M UTC")));
        }
        if analysis.from_sample {
            heading.push_str(" (from the sample history)");
        }
        heading.push(':');

        self.say(&heading);
        self.say(&result.overall_taste_profile);
        self.say(&format!("Genres:  {}", result.genre_preferences.join(", ")));
        self.say(&format!("Artists: {}", result.artist_preferences.join(", ")));
        self.say(&format!("Songs:   {}", result.song_preferences.join(", ")));
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{Harness, ScriptedPrompts};
    use crate::player::PlayerEvent;
    use crate::queue::tests::song;
    use crate::resolver::tests::FakePlatform;

    #[tokio::test]
    async fn test_queue_and_status_views() {
        let mut h = Harness::new(FakePlatform::default(), ScriptedPrompts::default()).await;
        h.run("queue").await;
        h.run("status").await;
        assert!(h.output.text().contains("The queue is empty."));
        assert!(h.output.text().contains("Nothing playing."));

        h.app.queue.set_songs(vec![song("a", 200), song("b", 65)]);
        h.run("play").await;
        h.app.handle_player_event(PlayerEvent::Position(100.0)).await;
        h.run("queue").await;
        h.run("status").await;

        let text = h.output.text();
        assert!(text.contains("> #1   Title a by Artist [3:20] (a)"));
        assert!(text.contains("  #2   Title b by Artist [1:05] (b)"));
        assert!(text.contains("Playing Title a by Artist [1:40 / 3:20] 50%"));
        assert!(text.contains("Queue: 2 songs, 1 up next. Radio: off."));
    }

    #[tokio::test]
    async fn test_help() {
        let mut h = Harness::new(FakePlatform::default(), ScriptedPrompts::default()).await;
        h.run("help").await;
        let text = h.output.text();
        assert!(text.contains("Commands:"));
        assert!(text.contains("Generate a playlist, e.g. request 90s rock classics"));
    }
}
