// Account: YouTube login/logout, the user's playlists and listening history.

use std::sync::Arc;

use super::{send_event, spawn_job, App, AppEvent};
use crate::errors::AppError;
use crate::youtube::YouTubeAuth;

impl App {
    fn auth(&self) -> Result<Arc<YouTubeAuth>, AppError> {
        self.auth.clone().ok_or_else(|| {
            AppError::NotConfigured(
                "add GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET to log in with YouTube".to_string(),
            )
        })
    }

    pub(super) async fn login(&mut self) -> Result<(), AppError> {
        let auth = self.auth()?;
        if auth.is_logged_in().await {
            self.say("Already logged in. Use logout first to switch accounts.");
            return Ok(());
        }
        if self.login_pending {
            self.say("A login is already waiting for confirmation.");
            return Ok(());
        }

        let login = auth.start_login().await?;
        self.say(&format!(
            "To log in, open {} and enter the code {}",
            login.verification_url, login.user_code
        ));
        self.login_pending = true;

        let history = self.history.clone();
        let events = self.events.clone();
        let job = async move {
            let result = async {
                auth.complete_login(&login).await?;
                let items = history.refresh().await?;
                Ok::<_, AppError>(items.len())
            }
            .await;
            send_event(&events, AppEvent::LoginFinished(result.map_err(|e| e.to_string())));
        };
        spawn_job(&self.events, job, |error| AppEvent::LoginFinished(Err(error)));
        Ok(())
    }

    pub(super) fn on_login_finished(&mut self, result: Result<usize, String>) {
        self.login_pending = false;
        match result {
            Ok(count) => self.say(&format!(
                "Logged in. Loaded {} liked videos as your listening history.",
                count
            )),
            Err(e) => self.toast("Login Failed", &e),
        }
    }

    pub(super) async fn logout(&mut self) -> Result<(), AppError> {
        let auth = self.auth()?;
        auth.logout().await?;
        self.history.clear().await?;
        self.analyses.clear().await?;
        self.say("Logged out.");
        Ok(())
    }

    pub(super) async fn show_playlists(&mut self) -> Result<(), AppError> {
        let playlists = self.platform.my_playlists().await?;
        if let Some(liked) = &playlists.liked_music {
            self.say(&format!("Liked music: {} ({})", liked.title, liked.id));
        }
        if playlists.other.is_empty() {
            self.say("No playlists.");
        }
        for playlist in &playlists.other {
            self.say(&format!("  {} ({})", playlist.title, playlist.id));
        }
        Ok(())
    }

    pub(super) async fn show_history(&mut self) -> Result<(), AppError> {
        let logged_in = self.is_logged_in().await;
        let loaded = self.history.load(logged_in).await?;

        if loaded.is_sample {
            self.say("Sample listening history (log in to use your liked videos):");
        } else if loaded.items.is_empty() {
            self.say("No listening history yet. Like some videos on YouTube, then log in again.");
            return Ok(());
        } else {
            self.say(&format!("Listening history ({} liked videos):", loaded.items.len()));
        }
        for (i, item) in loaded.items.iter().enumerate() {
            self.say(&format!("{:>3}. {} by {}", i + 1, item.title, item.artist));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{Harness, ScriptedPrompts};
    use crate::models::{UserPlaylists, VendorPlaylist};
    use crate::resolver::tests::FakePlatform;

    #[tokio::test]
    async fn test_login_without_credentials() {
        let mut h = Harness::new(FakePlatform::default(), ScriptedPrompts::default()).await;
        h.run("login").await;
        h.run("logout").await;
        let text = h.output.text();
        assert!(text.contains("Login Failed: Configuration missing: add GOOGLE_CLIENT_ID"));
        assert!(text.contains("Logout Failed: Configuration missing"));
    }

    #[tokio::test]
    async fn test_history_shows_sample_when_logged_out() {
        let mut h = Harness::new(FakePlatform::default(), ScriptedPrompts::default()).await;
        h.run("history").await;
        let text = h.output.text();
        assert!(text.contains("Sample listening history"));
        assert!(text.contains("  1. Blinding Lights by The Weeknd"));
        assert!(text.contains(" 19. bad guy by Billie Eilish"));
    }

    #[tokio::test]
    async fn test_playlists() {
        let platform = FakePlatform::default().playlists(UserPlaylists {
            liked_music: Some(VendorPlaylist {
                id: "LM".to_string(),
                title: "Liked Music".to_string(),
            }),
            other: vec![VendorPlaylist {
                id: "PL1".to_string(),
                title: "Road trip".to_string(),
            }],
        });
        let mut h = Harness::new(platform, ScriptedPrompts::default()).await;
        h.run("playlists").await;
        let text = h.output.text();
        assert!(text.contains("Liked music: Liked Music (LM)"));
        assert!(text.contains("  Road trip (PL1)"));
    }

    #[tokio::test]
    async fn test_playlists_require_login() {
        let mut h = Harness::new(FakePlatform::default(), ScriptedPrompts::default()).await;
        h.run("playlists").await;
        assert!(h
            .output
            .text()
            .contains("Could Not Load Playlists: Authentication error:"));
    }
}
