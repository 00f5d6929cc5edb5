use log::trace;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::models::InstanceId;

/// Callback registered with a frame scheduler
pub type TickCallback = Arc<dyn Fn() + Send + Sync>;

/// Shared per-frame ticker that instances subscribe to while playing.
///
/// Registrations are keyed by instance identity; adding an existing key
/// replaces its callback. Implementations must not invoke a callback from
/// inside `add` or `remove`.
pub trait FrameScheduler: Send + Sync {
    fn add(&self, key: InstanceId, callback: TickCallback);

    fn remove(&self, key: InstanceId);
}

/// Frame scheduler driven by explicit `tick` calls or a tokio interval
#[derive(Default)]
pub struct Ticker {
    callbacks: Mutex<Vec<(InstanceId, TickCallback)>>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    fn callbacks(&self) -> MutexGuard<'_, Vec<(InstanceId, TickCallback)>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Invoke every registered callback once, in registration order.
    ///
    /// Callbacks run without the registry locked, so they may add or remove
    /// registrations; changes take effect from the next tick.
    pub fn tick(&self) {
        let snapshot: Vec<TickCallback> = self
            .callbacks()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in snapshot {
            callback();
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks().is_empty()
    }

    pub fn contains(&self, key: InstanceId) -> bool {
        self.callbacks().iter().any(|(id, _)| *id == key)
    }

    /// Drive `tick` at a fixed period on the given runtime
    pub fn spawn(self: &Arc<Self>, period: Duration, handle: &Handle) -> JoinHandle<()> {
        let ticker = Arc::clone(self);

        handle.spawn(async move {
            let mut frames = interval(period);
            frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                frames.tick().await;
                ticker.tick();
            }
        })
    }
}

impl FrameScheduler for Ticker {
    fn add(&self, key: InstanceId, callback: TickCallback) {
        let mut callbacks = self.callbacks();
        if let Some(entry) = callbacks.iter_mut().find(|(id, _)| *id == key) {
            entry.1 = callback;
        } else {
            callbacks.push((key, callback));
        }
        trace!("Ticker subscribed {} ({} active)", key, callbacks.len());
    }

    fn remove(&self, key: InstanceId) {
        let mut callbacks = self.callbacks();
        callbacks.retain(|(id, _)| *id != key);
        trace!("Ticker unsubscribed {} ({} active)", key, callbacks.len());
    }
}

impl std::fmt::Debug for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticker").field("subscribers", &self.len()).finish()
    }
}
