//! The interactive command surface.
//!
//! One task owns the [`App`]. Slow work (prompt calls, song resolution, the
//! device login poll) runs in spawned tasks that report back as
//! [`AppEvent`]s, so transport commands keep working meanwhile.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use sqlx::{Pool, Sqlite};
use tokio::sync::mpsc;

use crate::ai::{AnalysisStore, PromptService};
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::history::ListeningHistoryManager;
use crate::models::{AnalysisResult, Song};
use crate::player::Player;
use crate::queue::PlayQueue;
use crate::radio::{RadioEvent, RadioState};
use crate::resolver::{ResolvedPlaylist, TrackResolver};
use crate::youtube::{VideoPlatform, YouTubeAuth};

pub mod account;
pub mod ai;
pub mod radio;
pub mod transport;
pub mod views;

#[derive(Debug, Clone, PartialEq)]
pub enum SelectTarget {
    Id(String),
    /// 1-based position, written `#n`.
    Position(usize),
}

fn parse_target(s: &str) -> Result<SelectTarget, String> {
    match s.strip_prefix('#') {
        Some(n) => n
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(SelectTarget::Position)
            .ok_or_else(|| format!("not a queue position: {}", s)),
        None => Ok(SelectTarget::Id(s.to_string())),
    }
}

fn parse_percent(s: &str) -> Result<f64, String> {
    s.trim_end_matches('%')
        .parse::<f64>()
        .map_err(|_| format!("not a percentage: {}", s))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RadioAction {
    Start,
    #[value(alias = "off")]
    Stop,
}

#[derive(Parser, Debug)]
#[command(
    name = "",
    no_binary_name = true,
    disable_help_subcommand = true,
    disable_help_flag = true,
    help_template = "Commands:\n{subcommands}"
)]
struct InputLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Connect your YouTube account.
    Login,
    /// Disconnect your YouTube account.
    Logout,
    /// List your YouTube playlists.
    Playlists,
    /// Show the listening history the AI DJ uses.
    History,
    /// Analyze your taste (--refresh skips the cache).
    Analyze {
        #[arg(long)]
        refresh: bool,
    },
    /// Generate a playlist, e.g. request 90s rock classics.
    Request {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },
    /// Endless AI radio: radio, or radio stop.
    Radio { action: Option<RadioAction> },
    /// Resume playback.
    Play,
    /// Pause playback.
    Pause,
    /// Play or pause.
    Toggle,
    /// Skip to the next song.
    Next,
    /// Go back to the previous song.
    #[command(alias = "previous")]
    Prev,
    /// Jump within the current song, in percent.
    Seek {
        #[arg(value_parser = parse_percent, allow_hyphen_values = true)]
        percent: f64,
    },
    /// Play a song from the queue by id or #position.
    Select {
        #[arg(value_parser = parse_target)]
        target: SelectTarget,
    },
    /// Add one song to the queue: add Title by Artist.
    Add {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },
    /// Show the queue.
    Queue,
    /// Show what is playing.
    Status,
    /// Show this list.
    #[command(alias = "?")]
    Help,
    /// Leave.
    #[command(alias = "exit")]
    Quit,
}

impl Command {
    /// `Ok(None)` for a blank line. Errors come back as one line.
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let mut args = split_line(line);
        if let Some(word) = args.first_mut() {
            *word = word.to_lowercase();
        }

        InputLine::try_parse_from(args)
            .map(|input| Some(input.command))
            .map_err(|e| one_line(&e))
    }

    /// Commands that call the prompt service or the resolver in the background.
    fn is_ai(&self) -> bool {
        matches!(
            self,
            Command::Analyze { .. }
                | Command::Request { .. }
                | Command::Radio {
                    action: None | Some(RadioAction::Start)
                }
                | Command::Add { .. }
        )
    }

    /// Title of the one-line failure message.
    fn failure_title(&self) -> &'static str {
        match self {
            Command::Login => "Login Failed",
            Command::Logout => "Logout Failed",
            Command::Playlists => "Could Not Load Playlists",
            Command::History => "Could Not Load History",
            Command::Analyze { .. } => "Analysis Failed",
            Command::Request { .. } => "Playlist Generation Failed",
            Command::Radio { .. } => "Radio Failed",
            Command::Add { .. } => "Add Failed",
            _ => "Playback Error",
        }
    }
}

/// The command list, rendered from the command definitions.
pub fn help_text() -> String {
    InputLine::command().render_help().to_string()
}

/// Stands in for `#` while shlex runs: it would read `#3` as a comment.
const HASH_STANDIN: &str = "\u{E000}";

/// Shell-style words, or plain whitespace splitting when quotes don't balance
/// (e.g. an apostrophe in a song title).
fn split_line(line: &str) -> Vec<String> {
    match shlex::split(&line.replace('#', HASH_STANDIN)) {
        Some(words) => words
            .into_iter()
            .map(|word| word.replace(HASH_STANDIN, "#"))
            .collect(),
        None => line.split_whitespace().map(String::from).collect(),
    }
}

fn one_line(err: &clap::Error) -> String {
    let text = err.to_string();
    let first = text.lines().next().unwrap_or_default();
    format!("{} (try help)", first.trim_start_matches("error: "))
}

/// Results of background work.
#[derive(Debug)]
pub enum AppEvent {
    Radio(RadioEvent),
    PlaylistReady {
        request: String,
        result: Result<ResolvedPlaylist, String>,
    },
    AnalysisReady(Result<Analysis, String>),
    SongResolved { name: String, song: Option<Song> },
    LoginFinished(Result<usize, String>),
}

#[derive(Debug, Clone)]
pub struct Analysis {
    pub result: AnalysisResult,
    /// When the analysis came from the cache, the time it was made.
    pub cached_at: Option<DateTime<Utc>>,
    pub from_sample: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// External collaborators the app is wired with.
pub struct Services {
    pub platform: Arc<dyn VideoPlatform>,
    pub prompts: Option<Arc<dyn PromptService>>,
    pub auth: Option<Arc<YouTubeAuth>>,
    pub player: Box<dyn Player>,
    pub pool: Pool<Sqlite>,
}

pub struct App {
    pub(crate) queue: PlayQueue,
    pub(crate) radio: RadioState,
    player: Box<dyn Player>,
    platform: Arc<dyn VideoPlatform>,
    resolver: Arc<TrackResolver>,
    prompts: Option<Arc<dyn PromptService>>,
    auth: Option<Arc<YouTubeAuth>>,
    history: Arc<ListeningHistoryManager>,
    analyses: AnalysisStore,
    events: mpsc::UnboundedSender<AppEvent>,
    playlist_size: usize,
    busy: bool,
    login_pending: bool,
    out: Box<dyn Write + Send>,
}

impl App {
    pub fn new(
        config: &AppConfig,
        services: Services,
        events: mpsc::UnboundedSender<AppEvent>,
        out: Box<dyn Write + Send>,
    ) -> Self {
        let resolver = TrackResolver::new(services.platform.clone(), config.resolve_concurrency);
        let history = ListeningHistoryManager::new(
            services.pool.clone(),
            services.platform.clone(),
            config.history_limit,
        );

        Self {
            queue: PlayQueue::new(),
            radio: RadioState::new(config.radio_extend_threshold),
            player: services.player,
            platform: services.platform,
            resolver: Arc::new(resolver),
            prompts: services.prompts,
            auth: services.auth,
            history: Arc::new(history),
            analyses: AnalysisStore::new(services.pool),
            events,
            playlist_size: config.playlist_size.max(1),
            busy: false,
            login_pending: false,
            out,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Parse and run one input line.
    pub async fn handle_line(&mut self, line: &str) -> Flow {
        match Command::parse(line) {
            Ok(Some(command)) => self.handle_command(command).await,
            Ok(None) => Flow::Continue,
            Err(message) => {
                self.say(&message);
                Flow::Continue
            }
        }
    }

    pub async fn handle_command(&mut self, command: Command) -> Flow {
        if command.is_ai() && self.busy {
            self.say("Still working on the previous request, please wait.");
            return Flow::Continue;
        }

        let title = command.failure_title();
        let result = match command {
            Command::Login => self.login().await,
            Command::Logout => self.logout().await,
            Command::Playlists => self.show_playlists().await,
            Command::History => self.show_history().await,
            Command::Analyze { refresh } => self.analyze(refresh).await,
            Command::Request { words } => self.request_playlist(words.join(" ")).await,
            Command::Radio {
                action: None | Some(RadioAction::Start),
            } => self.start_radio().await,
            Command::Radio {
                action: Some(RadioAction::Stop),
            } => {
                self.stop_radio();
                Ok(())
            }
            Command::Play => self.play().await,
            Command::Pause => self.pause().await,
            Command::Toggle => self.toggle().await,
            Command::Next => self.skip_forward().await,
            Command::Prev => self.skip_back().await,
            Command::Seek { percent } => self.seek(percent).await,
            Command::Select { target } => self.select(target).await,
            Command::Add { words } => self.add_song(words.join(" ")).await,
            Command::Queue => {
                self.show_queue();
                Ok(())
            }
            Command::Status => {
                self.show_status();
                Ok(())
            }
            Command::Help => {
                self.say(help_text().trim_end());
                Ok(())
            }
            Command::Quit => {
                if let Err(e) = self.player.stop().await {
                    log::debug!("Stopping player on quit failed: {}", e);
                }
                return Flow::Quit;
            }
        };

        if let Err(e) = result {
            self.toast(title, &e.to_string());
        }
        Flow::Continue
    }

    pub async fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Radio(event) => self.on_radio_event(event).await,
            AppEvent::PlaylistReady { request, result } => {
                self.on_playlist_ready(request, result).await
            }
            AppEvent::AnalysisReady(result) => self.on_analysis_ready(result),
            AppEvent::SongResolved { name, song } => self.on_song_resolved(name, song),
            AppEvent::LoginFinished(result) => self.on_login_finished(result),
        }
    }

    pub(crate) fn say(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line) {
            log::warn!("Failed to write output: {}", e);
        }
        let _ = self.out.flush();
    }

    /// One-line failure message.
    pub(crate) fn toast(&mut self, title: &str, message: &str) {
        log::warn!("{}: {}", title, message);
        self.say(&format!("{}: {}", title, message));
    }

    pub(crate) fn send(&self, event: AppEvent) {
        send_event(&self.events, event);
    }

    pub(crate) async fn is_logged_in(&self) -> bool {
        match &self.auth {
            Some(auth) => auth.is_logged_in().await,
            None => false,
        }
    }

    pub(crate) fn prompt_service(&self) -> Result<Arc<dyn PromptService>, AppError> {
        self.prompts.clone().ok_or_else(|| {
            AppError::NotConfigured("set GEMINI_API_KEY to use the AI DJ".to_string())
        })
    }
}

/// Background tasks outlive nothing but the app; a closed channel only means
/// the app is shutting down.
pub(crate) fn send_event(events: &mpsc::UnboundedSender<AppEvent>, event: AppEvent) {
    if events.send(event).is_err() {
        log::debug!("App event dropped: receiver closed");
    }
}

/// Run background work that reports through `events`. When the job panics,
/// the event built by `on_panic` is delivered in its place so the app is
/// never left waiting on it.
pub(crate) fn spawn_job<F, P>(events: &mpsc::UnboundedSender<AppEvent>, job: F, on_panic: P)
where
    F: Future<Output = ()> + Send + 'static,
    P: FnOnce(String) -> AppEvent + Send + 'static,
{
    let events = events.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::spawn(job).await {
            log::error!("Background job failed: {}", e);
            send_event(&events, on_panic(format!("internal error ({})", e)));
        }
    });
}
