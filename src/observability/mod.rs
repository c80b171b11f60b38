//! Observability subsystem
//!
//! Structured JSON logging of schema setup and session lifecycle events.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on the operation being observed
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use objsession::observability::{log_event, Event};
//!
//! log_event(Event::SessionPurge, &[("deleted", "2"), ("schema", "Objsession")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity, DEFAULT_THRESHOLD, LOG_LEVEL_ENV};

/// Log a typed event at its own severity, with fields
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    let severity = event.severity();
    if severity >= Severity::Error {
        Logger::log_stderr(severity, event.as_str(), fields);
    } else {
        Logger::log(severity, event.as_str(), fields);
    }
}
