pub mod ai;
pub mod commands;
pub mod config;
pub mod database;
pub mod errors;
pub mod history;
pub mod models;
pub mod player;
pub mod queue;
pub mod radio;
pub mod resolver;
pub mod youtube;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use ai::{GeminiClient, PromptService};
use commands::{App, Flow, Services};
use config::AppConfig;
use database::DatabaseManager;
use errors::AppError;
use player::{Player, PlayerEvent};
use youtube::{VideoPlatform, YouTubeAuth, YouTubeClient};

const USER_AGENT: &str = concat!("r3-playback/", env!("CARGO_PKG_VERSION"));

/// Wire everything up and run the command loop until `quit` or end of input.
pub async fn run() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let db = DatabaseManager::open(&config.database_path()).await?;

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;

    let auth = match config.client_credentials() {
        Some((id, secret)) => Some(Arc::new(
            YouTubeAuth::new(
                client.clone(),
                Some((id.to_string(), secret.to_string())),
                db.pool.clone(),
            )
            .await,
        )),
        None => {
            log::warn!("GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET not set, YouTube login disabled");
            None
        }
    };
    if config.youtube_api_key().is_none() && auth.is_none() {
        log::warn!("Neither YOUTUBE_API_KEY nor OAuth credentials are set, songs cannot be found");
    }

    let platform: Arc<dyn VideoPlatform> = Arc::new(YouTubeClient::new(
        client.clone(),
        config.youtube_api_key().map(str::to_string),
        auth.clone(),
    ));

    let prompts = config.gemini_api_key().map(|key| {
        Arc::new(GeminiClient::new(
            client.clone(),
            key.to_string(),
            config.gemini_model.clone(),
            config.playlist_size,
        )) as Arc<dyn PromptService>
    });
    if prompts.is_none() {
        log::warn!("GEMINI_API_KEY not set, AI DJ features disabled");
    }

    let (player_tx, mut player_rx) = mpsc::unbounded_channel::<PlayerEvent>();
    let player = spawn_player(&config, player_tx).await?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut app = App::new(
        &config,
        Services {
            platform,
            prompts,
            auth,
            player,
            pool: db.pool.clone(),
        },
        event_tx,
        Box::new(std::io::stdout()),
    );

    println!("R3 Playback. Type help for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if app.handle_line(&line).await == Flow::Quit {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    log::error!("Failed to read input: {}", e);
                    break;
                }
            },
            Some(event) = player_rx.recv() => app.handle_player_event(event).await,
            Some(event) = event_rx.recv() => app.handle_event(event).await,
        }
    }

    log::info!("Shutting down");
    db.pool.close().await;
    Ok(())
}

#[cfg(unix)]
async fn spawn_player(
    config: &AppConfig,
    events: mpsc::UnboundedSender<PlayerEvent>,
) -> Result<Box<dyn Player>, AppError> {
    let player = player::mpv::MpvPlayer::spawn(&config.mpv_path, events).await?;
    Ok(Box::new(player))
}

#[cfg(not(unix))]
async fn spawn_player(
    _config: &AppConfig,
    _events: mpsc::UnboundedSender<PlayerEvent>,
) -> Result<Box<dyn Player>, AppError> {
    Err(AppError::Player(
        "the mpv backend needs Unix domain sockets".to_string(),
    ))
}
