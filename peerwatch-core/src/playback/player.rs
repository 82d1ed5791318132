//! Playback sink that launches an external media player.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;

use super::{PlaybackError, PlaybackSink};
use crate::bus::{Signal, SignalBus};
use crate::config::PlayerConfig;
use crate::fetch::process::resolve_program;

/// Sink running one player process at a time.
///
/// With a started marker configured, `StreamStarted` is published when the
/// player prints a line containing it. Without one, the player counts as
/// rendering as soon as its process is up. `PlaybackStopped` follows when the
/// process exits.
#[derive(Debug)]
pub struct CommandPlayer {
    bus: SignalBus,
    config: PlayerConfig,
    current: Option<oneshot::Sender<()>>,
}

impl CommandPlayer {
    /// Creates a player publishing its lifecycle on `bus`.
    pub fn new(bus: SignalBus, config: PlayerConfig) -> Self {
        Self {
            bus,
            config,
            current: None,
        }
    }

    /// Stops the running player, if any.
    pub fn stop(&mut self) {
        if let Some(stop) = self.current.take() {
            let _ = stop.send(());
        }
    }
}

#[async_trait]
impl PlaybackSink for CommandPlayer {
    async fn play(&mut self, media: &str) -> Result<(), PlaybackError> {
        let program =
            resolve_program(&self.config.program).ok_or_else(|| PlaybackError::SinkUnavailable {
                reason: format!("'{}' was not found in PATH", self.config.program),
            })?;

        self.stop();

        let child = Command::new(&program)
            .args(&self.config.args)
            .arg(media)
            .stdin(Stdio::null())
            .stdout(if self.config.started_marker.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PlaybackError::SinkUnavailable {
                reason: format!("could not launch {}: {e}", program.display()),
            })?;

        tracing::info!("Playing {} with {}", media, program.display());

        let (stop_tx, stop_rx) = oneshot::channel();
        self.current = Some(stop_tx);

        let watcher = PlayerWatcher {
            bus: self.bus.clone(),
            media: media.to_string(),
            marker: self.config.started_marker.clone(),
        };
        tokio::spawn(watcher.run(child, stop_rx));

        Ok(())
    }
}

struct PlayerWatcher {
    bus: SignalBus,
    media: String,
    marker: Option<String>,
}

impl PlayerWatcher {
    async fn run(self, mut child: Child, mut stop: oneshot::Receiver<()>) {
        let mut started = false;
        let mut lines = child.stdout.take().map(|out| BufReader::new(out).lines());

        if self.marker.is_none() {
            self.announce_started(&mut started);
        }

        loop {
            tokio::select! {
                status = child.wait() => {
                    match status {
                        Ok(status) => tracing::debug!("Player exited with {}", status),
                        Err(e) => tracing::warn!("Lost track of player: {}", e),
                    }
                    break;
                }
                _ = &mut stop => {
                    tracing::debug!("Stopping player");
                    if let Err(e) = child.kill().await {
                        tracing::warn!("Could not stop player: {}", e);
                    }
                    break;
                }
                line = next_line(&mut lines) => match line {
                    Some(line) => {
                        if let Some(marker) = &self.marker
                            && line.contains(marker.as_str())
                        {
                            self.announce_started(&mut started);
                        }
                    }
                    None => lines = None,
                },
            }
        }

        self.bus.emit(Signal::PlaybackStopped {
            media: Some(self.media),
        });
    }

    fn announce_started(&self, started: &mut bool) {
        if !*started {
            *started = true;
            self.bus.emit(Signal::StreamStarted {
                media: self.media.clone(),
            });
        }
    }
}

type OutputLines = tokio::io::Lines<BufReader<tokio::process::ChildStdout>>;

/// Next stdout line, or pending forever once the output is exhausted.
async fn next_line(lines: &mut Option<OutputLines>) -> Option<String> {
    match lines {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::bus::{Subscription, topics};

    fn lifecycle(bus: &SignalBus) -> Subscription {
        bus.subscribe_channel(&[topics::STREAM_STARTED, topics::PLAYBACK_STOPPED])
    }

    async fn next(events: &mut Subscription) -> Signal {
        tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_player_is_unavailable() {
        let bus = SignalBus::new();
        let mut player = CommandPlayer::new(
            bus,
            PlayerConfig {
                program: "peerwatch-no-such-player".to_string(),
                args: vec![],
                started_marker: None,
            },
        );

        let result = player.play("/tmp/a.mp4").await;
        assert!(matches!(result, Err(PlaybackError::SinkUnavailable { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_marker_line_announces_start_then_stop() {
        let bus = SignalBus::new();
        let mut events = lifecycle(&bus);
        let mut player = CommandPlayer::new(
            bus,
            PlayerConfig {
                program: "sh".to_string(),
                args: vec![
                    "-c".to_string(),
                    "echo loading; echo peerwatch:playing; sleep 0.1".to_string(),
                    "player".to_string(),
                ],
                started_marker: Some("peerwatch:playing".to_string()),
            },
        );

        player.play("/tmp/a.mp4").await.unwrap();

        assert!(matches!(
            next(&mut events).await,
            Signal::StreamStarted { media } if media == "/tmp/a.mp4"
        ));
        assert!(matches!(
            next(&mut events).await,
            Signal::PlaybackStopped { media: Some(media) } if media == "/tmp/a.mp4"
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_without_marker_only_reports_stop() {
        let bus = SignalBus::new();
        let mut events = lifecycle(&bus);
        let mut player = CommandPlayer::new(
            bus,
            PlayerConfig {
                program: "sh".to_string(),
                args: vec![
                    "-c".to_string(),
                    "echo failed to open; exit 2".to_string(),
                    "player".to_string(),
                ],
                started_marker: Some("peerwatch:playing".to_string()),
            },
        );

        player.play("/tmp/broken.mp4").await.unwrap();

        assert!(matches!(next(&mut events).await, Signal::PlaybackStopped { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_kills_running_player() {
        let bus = SignalBus::new();
        let mut events = lifecycle(&bus);
        let mut player = CommandPlayer::new(
            bus,
            PlayerConfig {
                program: "sh".to_string(),
                args: vec!["-c".to_string(), "sleep 30".to_string(), "player".to_string()],
                started_marker: None,
            },
        );

        player.play("/tmp/long.mp4").await.unwrap();
        assert!(matches!(next(&mut events).await, Signal::StreamStarted { .. }));

        player.stop();
        assert!(matches!(next(&mut events).await, Signal::PlaybackStopped { .. }));
    }
}
