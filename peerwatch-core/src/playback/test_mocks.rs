//! Scripted playback collaborators for tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ConfirmPrompt, PlaybackError, PlaybackSink};
use crate::bus::{Signal, SignalBus};

/// Prompt that always gives the same answer and counts how often it was asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answer: bool,
    asked: AtomicUsize,
}

impl ScriptedPrompt {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn times_asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfirmPrompt for ScriptedPrompt {
    async fn confirm(&self, title: &str, _message: &str) -> bool {
        tracing::debug!("Scripted prompt '{}' answering {}", title, self.answer);
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

/// How a [`RecordingSink`] behaves after being handed media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkScript {
    /// Announce start, then stop
    PlayThrough,
    /// Stop without ever announcing start
    FailBeforeStart,
    /// Announce start and keep playing
    KeepPlaying,
    /// Refuse to play at all
    Unavailable,
}

/// Sink that records what it was asked to play and scripts lifecycle events.
#[derive(Debug, Clone)]
pub struct RecordingSink {
    bus: SignalBus,
    script: SinkScript,
    played: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new(bus: SignalBus, script: SinkScript) -> Self {
        Self {
            bus,
            script,
            played: Arc::default(),
        }
    }

    /// Media handed to this sink so far.
    pub fn played(&self) -> Vec<String> {
        self.played.lock().clone()
    }
}

#[async_trait]
impl PlaybackSink for RecordingSink {
    async fn play(&mut self, media: &str) -> Result<(), PlaybackError> {
        if self.script == SinkScript::Unavailable {
            return Err(PlaybackError::SinkUnavailable {
                reason: "scripted sink refuses".to_string(),
            });
        }

        self.played.lock().push(media.to_string());

        let media = media.to_string();
        match self.script {
            SinkScript::PlayThrough => {
                self.bus.emit(Signal::StreamStarted {
                    media: media.clone(),
                });
                self.bus.emit(Signal::PlaybackStopped { media: Some(media) });
            }
            SinkScript::FailBeforeStart => {
                self.bus.emit(Signal::PlaybackStopped { media: Some(media) });
            }
            SinkScript::KeepPlaying => {
                self.bus.emit(Signal::StreamStarted { media });
            }
            SinkScript::Unavailable => {}
        }

        Ok(())
    }
}
