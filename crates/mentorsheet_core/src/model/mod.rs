//! Typed records projected from human-edited sheet rows.
//!
//! # Responsibility
//! - Define the shapes repositories parse rows into and write rows from.
//!
//! # Invariants
//! - `Task` and `Question` are identified by their physical row address.
//! - `ScheduleEvent` is identified by a generated token, never by position.

pub mod metrics;
pub mod question;
pub mod schedule;
pub mod student;
