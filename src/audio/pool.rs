use log::{debug, trace};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Clock, FrameScheduler, MonotonicClock, PlaybackInstance, SourceFactory};
use crate::config::PlaybackConfig;
use crate::models::InstanceId;

/// Process-wide id counter, shared by every pool
static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Free-list of destroyed instances waiting to be reused.
///
/// Cloning the pool yields another handle to the same free-list. The
/// scheduler and clock given here are shared by every instance it creates.
#[derive(Clone)]
pub struct InstancePool {
    shared: Arc<PoolShared>,
}

pub(crate) struct PoolShared {
    free: Mutex<Vec<PlaybackInstance>>,
    /// Upper bound on idle instances; `None` keeps everything
    capacity: Option<usize>,
    scheduler: Option<Arc<dyn FrameScheduler>>,
    clock: Arc<dyn Clock>,
    created: AtomicUsize,
    reused: AtomicUsize,
    discarded: AtomicUsize,
}

/// Pool usage counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Instances constructed because the free-list was empty
    pub created: usize,
    /// Acquisitions served from the free-list
    pub reused: usize,
    /// Instances currently waiting in the free-list
    pub idle: usize,
    /// Destroyed instances dropped because the free-list was full
    pub discarded: usize,
}

impl PoolShared {
    fn free(&self) -> MutexGuard<'_, Vec<PlaybackInstance>> {
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take back a destroyed instance unless it is already pooled
    pub(crate) fn recycle(&self, instance: &PlaybackInstance) {
        let mut free = self.free();
        if free.iter().any(|pooled| pooled.id() == instance.id()) {
            trace!("Instance {} already pooled", instance.id());
            return;
        }

        if let Some(capacity) = self.capacity {
            if free.len() >= capacity {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                debug!("Pool full ({} idle), discarding instance {}", free.len(), instance.id());
                return;
            }
        }

        free.push(instance.clone());
    }
}

impl InstancePool {
    /// Unbounded pool
    pub fn new(scheduler: Option<Arc<dyn FrameScheduler>>, clock: Arc<dyn Clock>) -> Self {
        Self::build(None, scheduler, clock)
    }

    /// Pool that keeps at most `capacity` idle instances
    pub fn with_capacity(
        capacity: usize,
        scheduler: Option<Arc<dyn FrameScheduler>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::build(Some(capacity), scheduler, clock)
    }

    pub fn from_config(
        config: &PlaybackConfig,
        scheduler: Option<Arc<dyn FrameScheduler>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::build(config.pool_capacity, scheduler, clock)
    }

    fn build(
        capacity: Option<usize>,
        scheduler: Option<Arc<dyn FrameScheduler>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                free: Mutex::new(Vec::new()),
                capacity,
                scheduler,
                clock,
                created: AtomicUsize::new(0),
                reused: AtomicUsize::new(0),
                discarded: AtomicUsize::new(0),
            }),
        }
    }

    /// Get a fully reset instance bound to `factory`, reusing one if possible
    pub fn acquire(&self, factory: Arc<dyn SourceFactory>) -> PlaybackInstance {
        let recycled = self.shared.free().pop();

        match recycled {
            Some(instance) => {
                instance.reinit(factory);
                self.shared.reused.fetch_add(1, Ordering::Relaxed);
                trace!("Reusing pooled instance {}", instance.id());
                instance
            }
            None => {
                let id = InstanceId(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed));
                self.shared.created.fetch_add(1, Ordering::Relaxed);
                trace!("Creating instance {}", id);
                PlaybackInstance::new(
                    id,
                    factory,
                    self.shared.scheduler.clone(),
                    Arc::clone(&self.shared.clock),
                    Arc::downgrade(&self.shared),
                )
            }
        }
    }

    /// Destroy `instance`, returning it to the pool that created it
    pub fn release(&self, instance: &PlaybackInstance) {
        instance.destroy();
    }

    pub fn idle_count(&self) -> usize {
        self.shared.free().len()
    }

    /// Whether `instance` is currently waiting in the free-list
    pub fn contains(&self, instance: &PlaybackInstance) -> bool {
        self.shared.free().iter().any(|pooled| pooled == instance)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.shared.created.load(Ordering::Relaxed),
            reused: self.shared.reused.load(Ordering::Relaxed),
            idle: self.idle_count(),
            discarded: self.shared.discarded.load(Ordering::Relaxed),
        }
    }
}

impl Default for InstancePool {
    fn default() -> Self {
        Self::new(None, Arc::new(MonotonicClock::new()))
    }
}

impl std::fmt::Debug for InstancePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstancePool")
            .field("capacity", &self.shared.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}
