//! Campus lost-and-found tracking.
//!
//! Users report lost or found items and claim found ones; staff verify items and
//! claims through an administrative workflow. Every lifecycle transition writes
//! item timeline rows, audit-log rows, and user notifications.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
