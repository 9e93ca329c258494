//! Configuration errors raised while declaring or wiring chips

use thiserror::Error;

/// A chip declaration or wiring request that does not match the declared pins
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A referenced pin name is not declared on the chip
    #[error("chip '{chip}' has no pin named '{pin}'")]
    UnknownPin { chip: String, pin: String },

    /// The same pin code was declared twice
    #[error("chip '{chip}' declares pin '{pin}' more than once")]
    DuplicatePin { chip: String, pin: String },

    /// `wire_pins` was given name lists of different lengths
    #[error("cannot wire {inputs} input(s) of '{chip}' to {outputs} output(s)")]
    WireCountMismatch {
        chip: String,
        inputs: usize,
        outputs: usize,
    },

    /// A pin used on the wrong side of a wire or archetype slot
    #[error("pin '{pin}' of chip '{chip}' must be an {expected}")]
    WrongDirection {
        chip: String,
        pin: String,
        expected: &'static str,
    },

    /// Decoders and shift registers need at least one result pin
    #[error("chip '{chip}' declares no result pins")]
    EmptyResultPins { chip: String },

    #[error("chip '{chip}' declares {count} result pins, at most {max} are supported")]
    TooManyResultPins {
        chip: String,
        count: usize,
        max: usize,
    },

    #[error("chip '{chip}' declares {count} address pins, at most {max} are supported")]
    TooManyAddressPins {
        chip: String,
        count: usize,
        max: usize,
    },
}

/// Result type for chip declaration and wiring
pub type Result<T> = std::result::Result<T, ConfigError>;
