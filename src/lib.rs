#[cfg(test)]
macro_rules! assert_level {
    ($graph:expr, $pin:expr, $level:expr) => {
        assert_eq!($graph.effective_level($pin), $level, "{:?}", $graph.pin($pin))
    };
}

#[cfg(test)]
macro_rules! assert_high {
    ($graph:expr, $pin:expr) => {
        assert_level!($graph, $pin, true)
    };
}

#[cfg(test)]
macro_rules! assert_low {
    ($graph:expr, $pin:expr) => {
        assert_level!($graph, $pin, false)
    };
}

pub mod activable;
pub mod chip;
pub mod decoder;
pub mod error;
pub mod graph;
pub mod ic;
pub mod pin;
pub mod shift_register;

use std::fmt;

pub use activable::*;
pub use chip::*;
pub use decoder::*;
pub use error::*;
pub use graph::*;
pub use ic::*;
pub use pin::*;
pub use shift_register::*;

/// Frequency in Hz at and above which a pin is reported as constantly high instead of being
/// toggled tick by tick
pub const OSCILLATION_THRESHOLD: u32 = 1000;

/// Leading character of a pin name marking it active-low
pub const ACTIVE_LOW_MARKER: char = '~';

/// Name of the implicit, always-high pin every chip carries
pub const POWER_PIN: &str = "VCC";

/// Splits a pin name into its bare code and whether it carried the active-low marker
pub fn split_marker(name: &str) -> (&str, bool) {
    match name.strip_prefix(ACTIVE_LOW_MARKER) {
        Some(code) => (code, true),
        None => (name, false),
    }
}

/// The value a chip observes on one of its inputs
///
/// Used for change detection: an input is considered changed whenever its observed `Level`
/// differs from the one seen on the previous update.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    Logic(bool),
    Oscillating(u32),
}

impl Level {
    pub const HIGH: Level = Level::Logic(true);
    pub const LOW: Level = Level::Logic(false);

    /// Logical reading of the level. Oscillations fast enough to show up here read as high.
    pub const fn is_high(&self) -> bool {
        match self {
            Level::Logic(level) => *level,
            Level::Oscillating(_) => true,
        }
    }

    pub const fn is_oscillating(&self) -> bool {
        matches!(self, Level::Oscillating(_))
    }
}

impl Default for Level {
    fn default() -> Level {
        Level::LOW
    }
}

impl From<bool> for Level {
    fn from(level: bool) -> Level {
        Level::Logic(level)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Logic(true) => write!(f, "high"),
            Level::Logic(false) => write!(f, "low"),
            Level::Oscillating(freq) => write!(f, "{}Hz", freq),
        }
    }
}
