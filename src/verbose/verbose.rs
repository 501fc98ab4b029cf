//! Structured logging built on `tracing`, gated by a global verbosity
//! level so the hot simulation loop stays silent by default.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Once;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Hierarchical logging levels. Each level includes all lower levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum VerboseLevel {
    /// No logging at all.
    None = 0,
    /// Major simulation events: trip lifecycle, graph edits.
    Main = 1,
    /// Function-level details: routing results, admission decisions.
    Additional = 2,
    /// Per-tick and per-vehicle noise.
    Detailed = 3,
    /// Everything.
    All = 4,
}

impl VerboseLevel {
    pub fn is_at_least(self, min_level: VerboseLevel) -> bool {
        self >= min_level
    }

    fn from_u8(v: u8) -> VerboseLevel {
        match v {
            1 => VerboseLevel::Main,
            2 => VerboseLevel::Additional,
            3 => VerboseLevel::Detailed,
            4 => VerboseLevel::All,
            _ => VerboseLevel::None,
        }
    }
}

impl fmt::Display for VerboseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerboseLevel::None => "none",
            VerboseLevel::Main => "main",
            VerboseLevel::Additional => "additional",
            VerboseLevel::Detailed => "detailed",
            VerboseLevel::All => "all",
        };
        write!(f, "{}", s)
    }
}

static VERBOSE_LEVEL: AtomicU8 = AtomicU8::new(0);
static INIT: Once = Once::new();

/// Current global verbosity.
pub fn level() -> VerboseLevel {
    VerboseLevel::from_u8(VERBOSE_LEVEL.load(Ordering::Relaxed))
}

/// Sets the global verbosity; initializes the JSON subscriber on first use.
pub fn set_verbose_level(new_level: VerboseLevel) {
    VERBOSE_LEVEL.store(new_level as u8, Ordering::Relaxed);
    if new_level != VerboseLevel::None {
        ensure_logger_init();
    }
}

/// Installs the JSON tracing subscriber once; respects `RUST_LOG` overrides
/// and is a no-op if another subscriber is already installed.
pub fn ensure_logger_init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("trace"));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init();
    });
}

// Event names carried on every structured record.
pub const EVENT_TICK: &str = "tick";
pub const EVENT_TRIP_START: &str = "trip_start";
pub const EVENT_TRIP_FINISH: &str = "trip_finish";
pub const EVENT_TRIP_CANCEL: &str = "trip_cancel";
pub const EVENT_ROUTE_FAILED: &str = "route_failed";
pub const EVENT_REPATH: &str = "repath";
pub const EVENT_SIGNAL_TOGGLE: &str = "signal_toggle";
pub const EVENT_BULLDOZE: &str = "bulldoze";
pub const EVENT_PARKING: &str = "parking";

/// Logs a major simulation event at `info`.
#[macro_export]
macro_rules! log_main {
    ($event:expr, $msg:expr $(, $key:ident = $value:expr)* $(,)?) => {
        if $crate::verbose::level().is_at_least($crate::verbose::VerboseLevel::Main) {
            tracing::info!(event = $event, $($key = ?$value,)* "{}", $msg);
        }
    };
}

/// Logs function-level detail at `debug`.
#[macro_export]
macro_rules! log_additional {
    ($event:expr, $msg:expr $(, $key:ident = $value:expr)* $(,)?) => {
        if $crate::verbose::level().is_at_least($crate::verbose::VerboseLevel::Additional) {
            tracing::debug!(event = $event, $($key = ?$value,)* "{}", $msg);
        }
    };
}

/// Logs per-tick noise at `trace`.
#[macro_export]
macro_rules! log_detailed {
    ($event:expr, $msg:expr $(, $key:ident = $value:expr)* $(,)?) => {
        if $crate::verbose::level().is_at_least($crate::verbose::VerboseLevel::Detailed) {
            tracing::trace!(event = $event, $($key = ?$value,)* "{}", $msg);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(VerboseLevel::All.is_at_least(VerboseLevel::Main));
        assert!(VerboseLevel::Main.is_at_least(VerboseLevel::Main));
        assert!(!VerboseLevel::None.is_at_least(VerboseLevel::Main));
    }

    #[test]
    fn test_roundtrip_u8() {
        for lvl in [
            VerboseLevel::None,
            VerboseLevel::Main,
            VerboseLevel::Additional,
            VerboseLevel::Detailed,
            VerboseLevel::All,
        ] {
            assert_eq!(VerboseLevel::from_u8(lvl as u8), lvl);
        }
    }
}
