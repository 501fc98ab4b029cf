//! # Logging Module
//!
//! Structured event logging via the `tracing` crate with JSON output.
//!
//! Set a global [`VerboseLevel`] with [`set_verbose_level`]; the
//! [`log_main!`](crate::log_main), [`log_additional!`](crate::log_additional)
//! and [`log_detailed!`](crate::log_detailed) macros gate on it before
//! emitting. Event-name constants keep records greppable across the
//! simulation phases.

pub mod verbose;

pub use self::verbose::*;
