// Radio: seeding a session, extending it in the background and applying the
// results.

use std::sync::Arc;

use super::{send_event, spawn_job, App, AppEvent};
use crate::ai::PromptService;
use crate::errors::AppError;
use crate::history::{history_json, ListeningHistoryManager};
use crate::models::Song;
use crate::radio::{extension_request, Outcome, RadioEvent, RadioPhase, SEED_REQUEST};
use crate::resolver::TrackResolver;

pub const RADIO_ALBUM: &str = "Radio";

impl App {
    pub(super) async fn start_radio(&mut self) -> Result<(), AppError> {
        let prompts = self.prompt_service()?;
        let logged_in = self.is_logged_in().await;
        let generation = self.radio.start();
        self.busy = true;
        self.say("Radio: tuning in...");

        let history = self.history.clone();
        let resolver = self.resolver.clone();
        let events = self.events.clone();
        let limit = self.playlist_size;

        let job = async move {
            seed_radio(generation, logged_in, history, prompts, resolver, limit, &events).await;
        };
        spawn_job(&self.events, job, move |error| {
            AppEvent::Radio(RadioEvent::StartFailed { generation, error })
        });
        Ok(())
    }

    pub(super) fn stop_radio(&mut self) {
        if self.radio.is_active() {
            self.radio.stop();
            self.say("Radio off. The current queue keeps playing.");
        } else {
            self.say("Radio is not on.");
        }
    }

    /// Launch an extension when radio is listening and the queue runs low.
    pub(crate) fn maybe_extend(&mut self) {
        if let Some(generation) = self.radio.should_extend(self.queue.remaining()) {
            log::info!(
                "Radio queue low ({} left), extending generation {}",
                self.queue.remaining(),
                generation
            );
            self.spawn_extension(generation);
        }
    }

    pub(crate) fn spawn_extension(&mut self, generation: u64) {
        let prompts = match self.prompt_service() {
            Ok(prompts) => prompts,
            Err(e) => {
                self.send(AppEvent::Radio(RadioEvent::ExtensionFailed {
                    generation,
                    error: e.to_string(),
                }));
                return;
            }
        };
        let request = extension_request(self.queue.songs());
        let auth = self.auth.clone();
        let history = self.history.clone();
        let resolver = self.resolver.clone();
        let events = self.events.clone();
        let limit = self.playlist_size;

        let job = async move {
            let logged_in = match auth {
                Some(auth) => auth.is_logged_in().await,
                None => false,
            };
            let result = async {
                let names = generate(&history, logged_in, prompts.as_ref(), &request).await?;
                Ok::<_, AppError>(resolver.resolve_all(&names, RADIO_ALBUM, limit).await.songs)
            }
            .await;

            let event = match result {
                Ok(songs) => RadioEvent::Extended { generation, songs },
                Err(e) => RadioEvent::ExtensionFailed {
                    generation,
                    error: e.to_string(),
                },
            };
            send_event(&events, AppEvent::Radio(event));
        };
        spawn_job(&self.events, job, move |error| {
            AppEvent::Radio(RadioEvent::ExtensionFailed { generation, error })
        });
    }

    pub(super) async fn on_radio_event(&mut self, event: RadioEvent) {
        let result = match event {
            RadioEvent::Provisional { generation, song } => {
                self.on_provisional(generation, song).await
            }
            RadioEvent::SeedLoaded { generation, songs } => {
                self.busy = false;
                match self.radio.seed_loaded(generation) {
                    Outcome::Stale => Ok(()),
                    Outcome::Applied { advance } => {
                        let added = self.queue.append(songs);
                        self.say(&format!("Radio: {} more songs queued.", added));
                        let result = self.resume(advance, added).await;
                        self.maybe_extend();
                        result
                    }
                }
            }
            RadioEvent::StartFailed { generation, error } => {
                self.busy = false;
                if self.radio.start_failed(generation) {
                    self.toast("Radio Failed", &error);
                }
                Ok(())
            }
            RadioEvent::Extended { generation, songs } => match self.radio.on_extension(generation) {
                Outcome::Stale => {
                    log::debug!("Discarding stale radio extension (generation {})", generation);
                    Ok(())
                }
                Outcome::Applied { advance } => {
                    let added = self.queue.append(songs);
                    log::info!("Radio extended with {} songs", added);
                    self.say(&format!("Radio: {} more songs queued.", added));
                    self.resume(advance, added).await
                }
            },
            RadioEvent::ExtensionFailed { generation, error } => {
                match self.radio.on_extension_failed(generation) {
                    Outcome::Stale => Ok(()),
                    Outcome::Applied { advance } => {
                        self.toast("Radio Extension Failed", &error);
                        self.resume(advance, 0).await
                    }
                }
            }
        };

        if let Err(e) = result {
            self.toast("Playback Error", &e.to_string());
        }
    }

    async fn on_provisional(&mut self, generation: u64, song: Song) -> Result<(), AppError> {
        if !self.radio.accepts_provisional(generation) {
            return Ok(());
        }
        self.queue.set_songs(vec![song]);
        self.queue.next();
        self.start_current().await
    }

    /// Continue after playback waited at the end of the queue: move to the
    /// first new song, or wrap when nothing new arrived.
    async fn resume(&mut self, advance: bool, added: usize) -> Result<(), AppError> {
        if !advance {
            return Ok(());
        }
        if added > 0 {
            self.queue.advance();
        } else {
            self.queue.next();
        }
        self.start_current().await
    }

    pub(crate) fn radio_label(&self) -> &'static str {
        match self.radio.phase() {
            RadioPhase::Off => "off",
            RadioPhase::Starting => "starting",
            RadioPhase::Listening => "on",
            RadioPhase::Extending => "finding more songs",
        }
    }
}

pub(super) async fn generate(
    history: &ListeningHistoryManager,
    logged_in: bool,
    prompts: &dyn PromptService,
    request: &str,
) -> Result<Vec<String>, AppError> {
    let loaded = history.load(logged_in).await?;
    let json = history_json(&loaded.items)?;
    Ok(prompts.generate_playlist(&json, request).await?)
}

/// Ask for a seed playlist, play the first song that resolves right away and
/// resolve the rest behind it.
async fn seed_radio(
    generation: u64,
    logged_in: bool,
    history: Arc<ListeningHistoryManager>,
    prompts: Arc<dyn PromptService>,
    resolver: Arc<TrackResolver>,
    limit: usize,
    events: &tokio::sync::mpsc::UnboundedSender<AppEvent>,
) {
    let names = match generate(&history, logged_in, prompts.as_ref(), SEED_REQUEST).await {
        Ok(names) => names,
        Err(e) => {
            send_event(
                events,
                AppEvent::Radio(RadioEvent::StartFailed {
                    generation,
                    error: e.to_string(),
                }),
            );
            return;
        }
    };

    let mut first = None;
    for (index, name) in names.iter().enumerate() {
        if let Some(song) = resolver.resolve(name, RADIO_ALBUM).await {
            first = Some((index, song));
            break;
        }
    }
    let Some((index, song)) = first else {
        send_event(
            events,
            AppEvent::Radio(RadioEvent::StartFailed {
                generation,
                error: "none of the suggested songs could be found".to_string(),
            }),
        );
        return;
    };
    send_event(events, AppEvent::Radio(RadioEvent::Provisional { generation, song }));

    let rest = resolver
        .resolve_all(&names[index + 1..], RADIO_ALBUM, limit.saturating_sub(1))
        .await;
    send_event(
        events,
        AppEvent::Radio(RadioEvent::SeedLoaded {
            generation,
            songs: rest.songs,
        }),
    );
}
