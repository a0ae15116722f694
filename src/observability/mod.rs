//! Observability for the resolution engine
//!
//! Structured JSON logging with typed events. Logging is read-only: it never
//! changes what the parser or planners produce.
//!
//! ```ignore
//! use resolveplan::observability::{log_event, Event, Severity};
//!
//! log_event(Severity::Warn, Event::FragmentSkipped, &[("key", "x-limit")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{LogRecord, Logger, Severity};

/// Log a typed event with fields
pub fn log_event(severity: Severity, event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity, event.as_str(), fields);
}
