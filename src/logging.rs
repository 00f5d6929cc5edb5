use chrono::{DateTime, Utc};
use log::{debug, info, trace};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::{InstanceEvent, InstanceId};

/// Environment variable consulted by [`EventLogger::init`]
pub const LOG_LEVEL_ENV: &str = "SOUND_INSTANCE_LOG_LEVEL";

/// Lifecycle event as kept in the logger's history
#[derive(Debug, Clone)]
pub struct LoggedEvent {
    pub timestamp: DateTime<Utc>,
    pub instance: InstanceId,
    pub kind: &'static str,
    pub details: String,
}

/// Logger for instance lifecycle events.
///
/// Forwards to the `log` facade and keeps the most recent events for
/// inspection.
#[derive(Clone)]
pub struct EventLogger {
    events: Arc<Mutex<VecDeque<LoggedEvent>>>,
    max_events: usize,
}

impl EventLogger {
    pub fn new() -> Self {
        Self::with_history(1000)
    }

    pub fn with_history(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            max_events,
        }
    }

    /// Initialize `env_logger` with the level from the environment or `default_level`
    pub fn init(default_level: &str) -> Result<(), log::SetLoggerError> {
        let log_level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| default_level.to_string());

        let mut builder = env_logger::Builder::new();

        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] [{}:{}] {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        });
        builder.filter_level(parse_level(&log_level));

        builder.try_init()?;

        info!("Sound instance logging initialized with level: {}", log_level);
        Ok(())
    }

    /// Record an event emitted by `instance`
    pub fn record(&self, instance: InstanceId, event: &InstanceEvent) {
        let details = match event {
            InstanceEvent::Progress(value) => format!("{:.1}%", value * 100.0),
            InstanceEvent::Pause(paused) => format!("paused={}", paused),
            InstanceEvent::End(ended) => format!("ended instance {}", ended.id()),
            _ => String::new(),
        };

        match event {
            InstanceEvent::Start | InstanceEvent::Stop | InstanceEvent::End(_) => {
                info!("[{}] {} {}", event.name(), instance, details);
            }
            InstanceEvent::Paused | InstanceEvent::Resumed | InstanceEvent::Pause(_) => {
                debug!("[{}] {} {}", event.name(), instance, details);
            }
            InstanceEvent::Progress(_) => {
                trace!("[{}] {} {}", event.name(), instance, details);
            }
        }

        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.push_back(LoggedEvent {
            timestamp: Utc::now(),
            instance,
            kind: event.name(),
            details,
        });

        // Keep only the last max_events
        while events.len() > self.max_events {
            events.pop_front();
        }
    }

    /// Most recent events, oldest first
    pub fn recent_events(&self, count: usize) -> Vec<LoggedEvent> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = events.len().saturating_sub(count);
        events.iter().skip(skip).cloned().collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Default for EventLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a level name to a filter, defaulting to `Info`
pub fn parse_level(level: &str) -> log::LevelFilter {
    match level.to_lowercase().as_str() {
        "off" => log::LevelFilter::Off,
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("TRACE"), log::LevelFilter::Trace);
        assert_eq!(parse_level("warn"), log::LevelFilter::Warn);
        assert_eq!(parse_level("off"), log::LevelFilter::Off);
        assert_eq!(parse_level("nonsense"), log::LevelFilter::Info);
    }

    #[test]
    fn test_record_keeps_history() {
        let logger = EventLogger::new();
        let id = InstanceId(11);

        logger.record(id, &InstanceEvent::Start);
        logger.record(id, &InstanceEvent::Progress(0.25));
        logger.record(id, &InstanceEvent::Pause(true));

        let recent = logger.recent_events(10);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].kind, "start");
        assert_eq!(recent[1].details, "25.0%");
        assert_eq!(recent[2].details, "paused=true");
        assert!(recent.iter().all(|event| event.instance == id));
    }

    #[test]
    fn test_history_is_bounded() {
        let logger = EventLogger::with_history(2);
        let id = InstanceId(1);

        logger.record(id, &InstanceEvent::Start);
        logger.record(id, &InstanceEvent::Progress(0.5));
        logger.record(id, &InstanceEvent::Stop);

        let recent = logger.recent_events(5);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].kind, "progress");
        assert_eq!(recent[1].kind, "stop");

        assert_eq!(logger.recent_events(1)[0].kind, "stop");

        logger.clear();
        assert!(logger.recent_events(5).is_empty());
    }

    #[test]
    fn test_init_twice_reports_error() {
        // Only the first logger installation in a process can succeed
        let _ = EventLogger::init("warn");
        assert!(EventLogger::init("warn").is_err());
    }
}
