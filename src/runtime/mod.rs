//! # Runtime
//!
//! Process-level wiring: startup, the per-kind controller watch loops and
//! the error policy that schedules retries.

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
