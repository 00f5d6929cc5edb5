use log::warn;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::{AudioSource, EndedCallback, SourceFactory};
use crate::error::SourceError;

/// Silent source that only keeps time.
///
/// It reports its ended notification from a tokio task once the remaining
/// part of the clip has elapsed. Stands in for a rendering graph in headless
/// hosts and tests.
pub struct TimerSource {
    duration: Duration,
    handle: Handle,
    on_ended: Arc<Mutex<Option<EndedCallback>>>,
    task: Option<JoinHandle<()>>,
}

impl TimerSource {
    pub fn new(duration: Duration, handle: Handle) -> Self {
        Self {
            duration,
            handle,
            on_ended: Arc::new(Mutex::new(None)),
            task: None,
        }
    }
}

impl AudioSource for TimerSource {
    fn duration(&self) -> Duration {
        self.duration
    }

    fn start(&mut self, when: Duration, offset: Duration) {
        if self.task.is_some() {
            warn!("TimerSource started twice; ignoring");
            return;
        }

        let remaining = when.saturating_add(self.duration.saturating_sub(offset));
        let on_ended = Arc::clone(&self.on_ended);

        self.task = Some(self.handle.spawn(async move {
            tokio::time::sleep(remaining).await;
            // Release the slot before calling out
            let callback = on_ended.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(callback) = callback {
                callback();
            }
        }));
    }

    fn stop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    fn set_on_ended(&mut self, callback: Option<EndedCallback>) {
        *self.on_ended.lock().unwrap_or_else(PoisonError::into_inner) = callback;
    }
}

impl Drop for TimerSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Mints [`TimerSource`]s of one fixed length
#[derive(Debug, Clone)]
pub struct TimerSourceFactory {
    duration: Duration,
    handle: Handle,
}

impl TimerSourceFactory {
    pub fn new(duration: Duration, handle: Handle) -> Self {
        Self { duration, handle }
    }

    /// Build from a length in seconds, rejecting negative, non-finite or
    /// unrepresentably large values
    pub fn from_secs_f64(seconds: f64, handle: Handle) -> Result<Self, SourceError> {
        let duration = Duration::try_from_secs_f64(seconds)
            .map_err(|_| SourceError::InvalidDuration { seconds })?;
        Ok(Self::new(duration, handle))
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl SourceFactory for TimerSourceFactory {
    fn clone_source(&self) -> Result<Box<dyn AudioSource>, SourceError> {
        Ok(Box::new(TimerSource::new(self.duration, self.handle.clone())))
    }
}
