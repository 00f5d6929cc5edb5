//! Shared fixtures for instance, pool and lifecycle tests


use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::audio::{AudioSource, EndedCallback, InstancePool, ManualClock, PlaybackInstance, SourceFactory, Ticker};
use crate::error::SourceError;
use crate::models::InstanceEvent;

/// Observable side of a mock source
#[derive(Default)]
pub struct MockSourceState {
    on_ended: Mutex<Option<EndedCallback>>,
    started: Mutex<Option<(Duration, Duration)>>,
    stopped: AtomicBool,
}

impl MockSourceState {
    pub fn started(&self) -> Option<(Duration, Duration)> {
        *self.started.lock().unwrap()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn is_armed(&self) -> bool {
        self.on_ended.lock().unwrap().is_some()
    }

    /// Simulate the source reaching its natural end
    pub fn finish(&self) -> bool {
        let callback = self.on_ended.lock().unwrap().take();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

struct MockSource {
    duration: Duration,
    state: Arc<MockSourceState>,
}

impl AudioSource for MockSource {
    fn duration(&self) -> Duration {
        self.duration
    }

    fn start(&mut self, when: Duration, offset: Duration) {
        *self.state.started.lock().unwrap() = Some((when, offset));
    }

    fn stop(&mut self) {
        self.state.stopped.store(true, Ordering::SeqCst);
    }

    fn set_on_ended(&mut self, callback: Option<EndedCallback>) {
        *self.state.on_ended.lock().unwrap() = callback;
    }
}

/// Factory whose sources are driven by the test
pub struct MockSourceFactory {
    duration: Duration,
    failing: AtomicBool,
    sources: Mutex<Vec<Arc<MockSourceState>>>,
}

impl MockSourceFactory {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            failing: AtomicBool::new(false),
            sources: Mutex::new(Vec::new()),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.sources.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<Arc<MockSourceState>> {
        self.sources.lock().unwrap().last().cloned()
    }

    pub fn finish_last(&self) -> bool {
        self.last().map(|state| state.finish()).unwrap_or(false)
    }
}

impl SourceFactory for MockSourceFactory {
    fn clone_source(&self) -> Result<Box<dyn AudioSource>, SourceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("mock factory set to fail".to_string()));
        }

        let state = Arc::new(MockSourceState::default());
        self.sources.lock().unwrap().push(Arc::clone(&state));
        Ok(Box::new(MockSource {
            duration: self.duration,
            state,
        }))
    }
}

/// Pool wired to a manual clock, a ticker and a mock factory
pub struct Harness {
    pub pool: InstancePool,
    pub ticker: Arc<Ticker>,
    pub clock: Arc<ManualClock>,
    pub factory: Arc<MockSourceFactory>,
}

impl Harness {
    pub fn new(duration_secs: f64) -> Self {
        let ticker = Arc::new(Ticker::new());
        let clock = Arc::new(ManualClock::new());
        let pool = InstancePool::new(Some(ticker.clone()), clock.clone());
        Self::assemble(pool, ticker, clock, duration_secs)
    }

    pub fn with_capacity(duration_secs: f64, capacity: usize) -> Self {
        let ticker = Arc::new(Ticker::new());
        let clock = Arc::new(ManualClock::new());
        let pool = InstancePool::with_capacity(capacity, Some(ticker.clone()), clock.clone());
        Self::assemble(pool, ticker, clock, duration_secs)
    }

    fn assemble(pool: InstancePool, ticker: Arc<Ticker>, clock: Arc<ManualClock>, duration_secs: f64) -> Self {
        Self {
            pool,
            ticker,
            clock,
            factory: Arc::new(MockSourceFactory::new(Duration::from_secs_f64(duration_secs))),
        }
    }

    pub fn acquire(&self) -> PlaybackInstance {
        self.pool.acquire(self.factory.clone())
    }

    pub fn advance(&self, seconds: f64) {
        self.clock.advance(Duration::from_secs_f64(seconds));
    }
}

/// Collect every event already emitted
pub fn drain(events: &mut UnboundedReceiver<InstanceEvent>) -> Vec<InstanceEvent> {
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}

pub fn event_names(events: &[InstanceEvent]) -> Vec<&'static str> {
    events.iter().map(InstanceEvent::name).collect()
}
