use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::audio::PlaybackInstance;

/// Process-unique identifier of a playback instance slot.
///
/// The id names the pooled object, not a single playback: a recycled
/// instance keeps its id for every session it serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a playback instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Fresh or recycled, nothing played yet
    Idle,
    Playing,
    Paused,
    /// Explicitly stopped
    Stopped,
    /// Source reached its natural end
    Ended,
}

impl Default for PlaybackState {
    fn default() -> Self {
        PlaybackState::Idle
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Stopped => "stopped",
            PlaybackState::Ended => "ended",
        };
        write!(f, "{}", name)
    }
}

/// Point-in-time snapshot of an instance, suitable for status displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceStatus {
    pub id: InstanceId,
    pub state: PlaybackState,
    pub paused: bool,
    pub progress: f64,
    pub position: Duration,
    pub duration: Duration,
}

impl InstanceStatus {
    /// Time left in the clip from the last captured segment start
    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.position)
    }
}

/// Events emitted by a playback instance, in emission order per transition
#[derive(Debug, Clone)]
pub enum InstanceEvent {
    /// A source was started by `play`
    Start,
    /// Normalized progress in `[0, 1]`
    Progress(f64),
    Paused,
    Resumed,
    /// Generic toggle, always after `Paused`/`Resumed`
    Pause(bool),
    /// Explicit `stop` with an active source
    Stop,
    /// Natural completion; carries the instance so a listener can release it
    End(PlaybackInstance),
}

impl InstanceEvent {
    pub fn name(&self) -> &'static str {
        match self {
            InstanceEvent::Start => "start",
            InstanceEvent::Progress(_) => "progress",
            InstanceEvent::Paused => "paused",
            InstanceEvent::Resumed => "resumed",
            InstanceEvent::Pause(_) => "pause",
            InstanceEvent::Stop => "stop",
            InstanceEvent::End(_) => "end",
        }
    }

    /// Progress payload, if this is a progress event
    pub fn progress(&self) -> Option<f64> {
        match self {
            InstanceEvent::Progress(value) => Some(*value),
            _ => None,
        }
    }
}
