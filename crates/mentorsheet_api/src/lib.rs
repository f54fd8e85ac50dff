//! Request-facing facade over `mentorsheet_core`.

pub mod api;

pub use api::{init_logging, ActionResponse, DeskInitError, Lookup, MentorDesk};
