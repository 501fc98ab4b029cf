//! Signal colours shown to an in-lane slot.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;

/// Error for parsing signal strings.
#[derive(Debug, Clone)]
pub enum SignalParseError {
    InvalidSignal(String),
}

impl fmt::Display for SignalParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalParseError::InvalidSignal(value) => {
                write!(f, "Invalid signal: '{}'", value)
            }
        }
    }
}

impl std::error::Error for SignalParseError {}

lazy_static! {
    static ref SIGNAL_CONVERTER: HashMap<&'static str, Signal> = {
        let mut m = HashMap::new();
        m.insert("r", Signal::Red);
        m.insert("y", Signal::Yellow);
        m.insert("g", Signal::Green);
        m
    };
}

/// Signal colour of one in-lane slot. Anything other than red means go;
/// yellow only shortens the remaining green.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Red,
    Yellow,
    Green,
}

impl Signal {
    /// Parses the short string form used in state dumps.
    ///
    /// # Example
    /// ```
    /// use continuous_traffic_sim_core::traffic_lights::Signal;
    /// assert_eq!(Signal::from_str("g").unwrap(), Signal::Green);
    /// ```
    pub fn from_str(signal_str: &str) -> Result<Self, SignalParseError> {
        SIGNAL_CONVERTER
            .get(signal_str)
            .copied()
            .ok_or(SignalParseError::InvalidSignal(signal_str.to_string()))
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::Red => "r",
            Signal::Yellow => "y",
            Signal::Green => "g",
        };
        write!(f, "{}", s)
    }
}
