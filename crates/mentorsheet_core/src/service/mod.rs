//! Use-case services composed from sheet repositories.
//!
//! # Responsibility
//! - Resolve students before touching their tabs.
//! - Coordinate multi-step writes (provisioning) and cross-tab reads
//!   (dashboard).

pub mod metrics_service;
pub mod provisioning_service;
pub mod student_service;
