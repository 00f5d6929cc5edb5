pub mod clock;
pub mod instance;
pub mod pool;
pub mod position;
pub mod scheduler;
pub mod timer;

#[cfg(test)]
pub mod tests;

use std::time::Duration;
use crate::error::SourceError;

// Re-export clocks
pub use clock::{Clock, ManualClock, MonotonicClock};

// Re-export the instance and its pool
pub use instance::PlaybackInstance;
pub use pool::{InstancePool, PoolStats};

// Re-export progress arithmetic
pub use position::{progress_ratio, PositionTracker};

// Re-export frame scheduling
pub use scheduler::{FrameScheduler, TickCallback, Ticker};

// Re-export the timer-backed source
pub use timer::{TimerSource, TimerSourceFactory};

/// Notification handed to a source, invoked once when it finishes on its own
pub type EndedCallback = Box<dyn FnOnce() + Send>;

/// One-shot startable unit that actually renders a clip.
///
/// Implementations must invoke the ended callback from their own rendering
/// context, never from inside `start` or `stop`, and not at all once the
/// callback has been cleared.
pub trait AudioSource: Send {
    /// Total length of the clip
    fn duration(&self) -> Duration;

    /// Begin rendering after `when`, starting `offset` into the clip
    fn start(&mut self, when: Duration, offset: Duration);

    /// Halt rendering immediately
    fn stop(&mut self);

    /// Arm or clear the natural-completion notification
    fn set_on_ended(&mut self, callback: Option<EndedCallback>);
}

/// Mints fresh, independently controllable sources for one clip
pub trait SourceFactory: Send + Sync {
    /// Clone a new source from the underlying graph
    fn clone_source(&self) -> Result<Box<dyn AudioSource>, SourceError>;
}
