//! mpv backend driven over its JSON IPC socket.
//!
//! mpv runs idle with video disabled; each `load` replaces the current file.
//! Observed properties and `end-file` events are forwarded as
//! [`PlayerEvent`]s.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::UnixStream;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::{watch_url, Player, PlayerEvent};

const CONNECT_ATTEMPTS: u32 = 50;
const CONNECT_DELAY: Duration = Duration::from_millis(100);

const OBSERVE_TIME_POS: u64 = 1;
const OBSERVE_DURATION: u64 = 2;

pub struct MpvPlayer {
    // Killed when the player is dropped.
    _child: Child,
    writer: Mutex<OwnedWriteHalf>,
    reader: JoinHandle<()>,
    socket_path: PathBuf,
}

impl MpvPlayer {
    pub async fn spawn(mpv_path: &str, events: mpsc::UnboundedSender<PlayerEvent>) -> Result<Self> {
        let socket_path =
            std::env::temp_dir().join(format!("r3-playback-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&socket_path);

        let child = Command::new(mpv_path)
            .args(mpv_args(&socket_path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}", mpv_path))?;

        let stream = connect(&socket_path).await?;
        let (read_half, write_half) = stream.into_split();

        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Some(event) = parse_event(&line) {
                            if events.send(event).is_err() {
                                break;
                            }
                        }
                    }
                    Ok(None) => {
                        let _ = events.send(PlayerEvent::Error("mpv exited".to_string()));
                        break;
                    }
                    Err(e) => {
                        let _ = events.send(PlayerEvent::Error(format!("mpv IPC read failed: {}", e)));
                        break;
                    }
                }
            }
        });

        let player = Self {
            _child: child,
            writer: Mutex::new(write_half),
            reader,
            socket_path,
        };

        player
            .send(json!({ "command": ["observe_property", OBSERVE_TIME_POS, "time-pos"] }))
            .await?;
        player
            .send(json!({ "command": ["observe_property", OBSERVE_DURATION, "duration"] }))
            .await?;

        log::info!("mpv started, IPC socket at {}", player.socket_path.display());
        Ok(player)
    }

    async fn send(&self, command: Value) -> Result<()> {
        let mut line = command.to_string();
        line.push('\n');
        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .context("mpv IPC write failed")?;
        writer.flush().await.context("mpv IPC flush failed")?;
        Ok(())
    }
}

impl Drop for MpvPlayer {
    fn drop(&mut self) {
        self.reader.abort();
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

#[async_trait]
impl Player for MpvPlayer {
    async fn load(&self, video_id: &str) -> Result<()> {
        log::debug!("mpv: loading {}", video_id);
        self.send(json!({ "command": ["loadfile", watch_url(video_id), "replace"] }))
            .await?;
        self.set_paused(false).await
    }

    async fn set_paused(&self, paused: bool) -> Result<()> {
        self.send(json!({ "command": ["set_property", "pause", paused] }))
            .await
    }

    async fn seek(&self, seconds: f64) -> Result<()> {
        self.send(json!({ "command": ["seek", seconds, "absolute"] }))
            .await
    }

    async fn stop(&self) -> Result<()> {
        self.send(json!({ "command": ["stop"] })).await
    }
}

fn mpv_args(socket_path: &Path) -> Vec<String> {
    vec![
        "--idle=yes".to_string(),
        "--no-video".to_string(),
        "--no-terminal".to_string(),
        format!("--input-ipc-server={}", socket_path.display()),
    ]
}

async fn connect(socket_path: &Path) -> Result<UnixStream> {
    for _ in 0..CONNECT_ATTEMPTS {
        match UnixStream::connect(socket_path).await {
            Ok(stream) => return Ok(stream),
            Err(_) => tokio::time::sleep(CONNECT_DELAY).await,
        }
    }
    Err(anyhow!(
        "mpv IPC socket {} did not come up",
        socket_path.display()
    ))
}

/// Map one line from the IPC socket to a player event. Command replies and
/// events we do not care about yield `None`.
fn parse_event(line: &str) -> Option<PlayerEvent> {
    let value: Value = serde_json::from_str(line).ok()?;
    match value.get("event")?.as_str()? {
        "property-change" => {
            let data = value.get("data")?.as_f64()?;
            match value.get("name")?.as_str()? {
                "time-pos" => Some(PlayerEvent::Position(data)),
                "duration" => Some(PlayerEvent::Duration(data)),
                _ => None,
            }
        }
        // "stop" and "redirect" fire when a new file replaces the old one.
        "end-file" => match value.get("reason").and_then(Value::as_str) {
            Some("eof") => Some(PlayerEvent::Ended),
            Some("error") => Some(PlayerEvent::Error(
                value
                    .get("file_error")
                    .and_then(Value::as_str)
                    .unwrap_or("playback failed")
                    .to_string(),
            )),
            _ => None,
        },
        _ => None,
    }
}
