use log::{debug, trace, warn};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::pool::PoolShared;
use super::{AudioSource, Clock, EndedCallback, FrameScheduler, PositionTracker, SourceFactory, TickCallback};
use crate::error::PlaybackError;
use crate::models::{InstanceEvent, InstanceId, InstanceStatus, PlaybackState};

/// One in-progress (or just finished) playback of a sound clip.
///
/// Handles are cheap to clone and all refer to the same instance. Instances
/// are obtained from an [`InstancePool`](super::InstancePool) and go back to
/// it on [`destroy`](Self::destroy).
///
/// The instance subscribes to its frame scheduler exactly while a source is
/// active, and every path that drops the source unsubscribes first.
#[derive(Clone)]
pub struct PlaybackInstance {
    id: InstanceId,
    inner: Arc<Mutex<InstanceInner>>,
}

struct InstanceInner {
    factory: Option<Arc<dyn SourceFactory>>,
    /// Present iff playing
    active: Option<Box<dyn AudioSource>>,
    tracker: PositionTracker,
    paused: bool,
    state: PlaybackState,
    /// Bumped per play segment so late ended notifications are ignored
    segment: u64,
    listeners: Vec<UnboundedSender<InstanceEvent>>,
    scheduler: Option<Arc<dyn FrameScheduler>>,
    clock: Arc<dyn Clock>,
    pool: Weak<PoolShared>,
}

impl InstanceInner {
    fn emit(&mut self, event: InstanceEvent) {
        // Dropped receivers unsubscribe themselves
        self.listeners.retain(|listener| listener.send(event.clone()).is_ok());
    }

    /// Unsubscribe, disarm and halt the active source. Returns whether one existed.
    fn halt(&mut self, id: InstanceId) -> bool {
        match self.active.take() {
            Some(mut source) => {
                if let Some(scheduler) = &self.scheduler {
                    scheduler.remove(id);
                }
                source.set_on_ended(None);
                source.stop();
                true
            }
            None => false,
        }
    }

    fn reset(&mut self) {
        self.tracker.reset();
        self.paused = false;
        self.state = PlaybackState::Idle;
        self.segment = self.segment.wrapping_add(1);
    }
}

impl PlaybackInstance {
    pub(crate) fn new(
        id: InstanceId,
        factory: Arc<dyn SourceFactory>,
        scheduler: Option<Arc<dyn FrameScheduler>>,
        clock: Arc<dyn Clock>,
        pool: Weak<PoolShared>,
    ) -> Self {
        Self {
            id,
            inner: Arc::new(Mutex::new(InstanceInner {
                factory: Some(factory),
                active: None,
                tracker: PositionTracker::new(),
                paused: false,
                state: PlaybackState::Idle,
                segment: 0,
                listeners: Vec::new(),
                scheduler,
                clock,
                pool,
            })),
        }
    }

    /// Prepare a recycled instance for a new owner
    pub(crate) fn reinit(&self, factory: Arc<dyn SourceFactory>) {
        let mut inner = self.lock();
        inner.listeners.clear();
        inner.halt(self.id);
        inner.reset();
        inner.factory = Some(factory);
    }

    fn lock(&self) -> MutexGuard<'_, InstanceInner> {
        // A panicking listener must not wedge playback
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Receive every event emitted from now on, in emission order
    pub fn subscribe(&self) -> UnboundedReceiver<InstanceEvent> {
        let (tx, rx) = unbounded_channel();
        self.lock().listeners.push(tx);
        rx
    }

    /// Start playback `offset` into the clip.
    ///
    /// Any source still playing on this instance is stopped first, without a
    /// `stop` event. Factory failures are returned unchanged.
    pub fn play(&self, offset: Duration) -> Result<(), PlaybackError> {
        let mut inner = self.lock();

        if inner.halt(self.id) {
            debug!("Instance {} restarted while playing; previous source stopped", self.id);
        }

        let factory = inner.factory.clone().ok_or(PlaybackError::Detached(self.id))?;
        inner.paused = false;
        inner.tracker.rewind(offset);

        let mut source = match factory.clone_source() {
            Ok(source) => source,
            Err(err) => {
                if matches!(inner.state, PlaybackState::Playing | PlaybackState::Paused) {
                    inner.state = PlaybackState::Stopped;
                }
                warn!("Instance {} could not obtain a source: {}", self.id, err);
                return Err(err.into());
            }
        };

        let duration = source.duration();
        let now = inner.clock.now();
        inner.tracker.start_segment(offset, duration, now);
        inner.segment = inner.segment.wrapping_add(1);

        source.set_on_ended(Some(self.ended_callback(inner.segment)));
        source.start(Duration::ZERO, offset);
        inner.active = Some(source);
        inner.state = PlaybackState::Playing;

        inner.emit(InstanceEvent::Start);
        inner.emit(InstanceEvent::Progress(0.0));

        if let Some(scheduler) = inner.scheduler.clone() {
            scheduler.add(self.id, self.tick_callback());
        }

        debug!(
            "Instance {} playing from {:.3}s of {:.3}s",
            self.id,
            offset.as_secs_f64(),
            duration.as_secs_f64()
        );
        Ok(())
    }

    /// Last computed progress; never recomputed on read
    pub fn progress(&self) -> f64 {
        self.lock().tracker.progress()
    }

    pub fn paused(&self) -> bool {
        self.lock().paused
    }

    /// Pause or resume. Setting the current value again does nothing.
    ///
    /// Resuming replays from the captured position, so it reports the same
    /// errors as [`play`](Self::play).
    pub fn set_paused(&self, paused: bool) -> Result<(), PlaybackError> {
        let resume_from = {
            let mut inner = self.lock();
            if inner.paused == paused {
                return Ok(());
            }
            inner.paused = paused;

            if paused {
                let now = inner.clock.now();
                if inner.halt(self.id) {
                    let position = inner.tracker.capture(now);
                    inner.state = PlaybackState::Paused;
                    debug!("Instance {} paused at {:.3}s", self.id, position.as_secs_f64());
                }
                inner.emit(InstanceEvent::Paused);
                inner.emit(InstanceEvent::Pause(true));
                return Ok(());
            }

            inner.emit(InstanceEvent::Resumed);
            inner.tracker.position()
        };

        self.play(resume_from)?;
        self.lock().emit(InstanceEvent::Pause(false));
        Ok(())
    }

    /// Stop the active source. Without one this is a no-op and emits nothing.
    pub fn stop(&self) {
        let mut inner = self.lock();
        if !inner.halt(self.id) {
            return;
        }
        inner.state = PlaybackState::Stopped;
        inner.emit(InstanceEvent::Stop);
        debug!("Instance {} stopped", self.id);
    }

    /// Tear down and hand the instance back to its pool.
    ///
    /// Safe to call any number of times; the pool holds it at most once.
    pub fn destroy(&self) {
        let pool = {
            let mut inner = self.lock();
            inner.listeners.clear();
            inner.halt(self.id);
            inner.factory = None;
            inner.reset();
            inner.pool.upgrade()
        };

        if let Some(pool) = pool {
            pool.recycle(self);
        }
        trace!("Instance {} destroyed", self.id);
    }

    pub fn state(&self) -> PlaybackState {
        self.lock().state
    }

    pub fn is_playing(&self) -> bool {
        self.lock().active.is_some()
    }

    /// Clip offset at which the current or last segment started
    pub fn position(&self) -> Duration {
        self.lock().tracker.position()
    }

    /// Clip length, zero until a source has been created
    pub fn duration(&self) -> Duration {
        self.lock().tracker.duration()
    }

    pub fn status(&self) -> InstanceStatus {
        let inner = self.lock();
        InstanceStatus {
            id: self.id,
            state: inner.state,
            paused: inner.paused,
            progress: inner.tracker.progress(),
            position: inner.tracker.position(),
            duration: inner.tracker.duration(),
        }
    }

    /// Per-frame progress recomputation
    pub(crate) fn update(&self) {
        let mut inner = self.lock();
        if inner.active.is_none() {
            return;
        }

        let now = inner.clock.now();
        let paused = inner.paused;
        if let Some(progress) = inner.tracker.update(now, paused) {
            inner.emit(InstanceEvent::Progress(progress));
        }
    }

    /// The source of play segment `segment` finished on its own
    pub(crate) fn on_source_ended(&self, segment: u64) {
        let mut inner = self.lock();
        if inner.segment != segment {
            trace!("Instance {} ignoring ended notice from an old segment", self.id);
            return;
        }

        let mut source = match inner.active.take() {
            Some(source) => source,
            None => return,
        };
        if let Some(scheduler) = &inner.scheduler {
            scheduler.remove(self.id);
        }
        // Already finished, so no stop()
        source.set_on_ended(None);
        drop(source);

        inner.tracker.complete();
        inner.state = PlaybackState::Ended;
        inner.emit(InstanceEvent::Progress(1.0));
        inner.emit(InstanceEvent::End(self.clone()));
        debug!("Instance {} reached the end of its clip", self.id);
    }

    fn tick_callback(&self) -> TickCallback {
        let id = self.id;
        let weak = Arc::downgrade(&self.inner);
        Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                PlaybackInstance { id, inner }.update();
            }
        })
    }

    fn ended_callback(&self, segment: u64) -> EndedCallback {
        let id = self.id;
        let weak = Arc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                PlaybackInstance { id, inner }.on_source_ended(segment);
            }
        })
    }
}

impl PartialEq for PlaybackInstance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for PlaybackInstance {}

impl fmt::Debug for PlaybackInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackInstance")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
