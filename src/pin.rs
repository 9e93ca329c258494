use crate::*;
use derive_getters::Getters;
use std::collections::BTreeSet;

pub type PinId = usize;

/// A named logic terminal
///
/// Pins live in a [`Graph`] and are addressed by [`PinId`]. A pin never reads another pin by
/// itself: resolving what an input observes through its wires needs the whole arena, so that
/// part lives in [`Graph::effective_level`].
#[derive(Debug, Clone, Getters)]
pub struct Pin {
    /// Name without the active-low marker
    code: String,

    /// Owning chip, informational only
    chip: Option<ChipId>,

    /// Pins this one is wired to. Always symmetric across the arena.
    wires: BTreeSet<PinId>,

    #[getter(skip)]
    is_output: bool,
    #[getter(skip)]
    active_low: bool,
    #[getter(skip)]
    level: bool,
    #[getter(skip)]
    frequency: u32,
    #[getter(skip)]
    countdown: i64,
}

impl Pin {
    /// Creates a pin from a name that may carry the active-low marker
    pub fn new(name: &str, is_output: bool, level: bool) -> Pin {
        let (code, active_low) = split_marker(name);
        Pin {
            code: code.to_string(),
            chip: None,
            wires: BTreeSet::new(),
            is_output,
            active_low,
            level,
            frequency: 0,
            countdown: 0,
        }
    }

    pub fn is_output(&self) -> bool {
        self.is_output
    }

    pub fn active_low(&self) -> bool {
        self.active_low
    }

    /// The level last written to this pin, ignoring wires and oscillation
    pub fn stored_level(&self) -> bool {
        self.level
    }

    /// The pin's own oscillation frequency in Hz, ignoring wires
    pub fn stored_frequency(&self) -> u32 {
        self.frequency
    }

    /// The level that asserts this pin
    pub fn asserted_level(&self) -> bool {
        !self.active_low
    }

    /// Name as it would be declared, with the marker restored
    pub fn declared_name(&self) -> String {
        if self.active_low {
            format!("{}{}", ACTIVE_LOW_MARKER, self.code)
        } else {
            self.code.clone()
        }
    }

    pub(crate) fn attach(&mut self, chip: ChipId) {
        self.chip = Some(chip);
    }

    pub(crate) fn add_wire(&mut self, other: PinId) {
        self.wires.insert(other);
    }

    /// Stores a level without touching the oscillation. Returns whether it changed.
    pub(crate) fn store_level(&mut self, level: bool) -> bool {
        let changed = self.level != level;
        self.level = level;
        changed
    }

    /// Drops any residual oscillation. Returns whether there was one.
    pub(crate) fn clear_frequency(&mut self) -> bool {
        let had = self.frequency != 0;
        self.frequency = 0;
        self.countdown = 0;
        had
    }

    pub(crate) fn store_frequency(&mut self, freq: u32) {
        self.frequency = freq;
        if freq != 0 {
            self.is_output = true;
            self.countdown = Self::half_period(freq);
        } else {
            self.countdown = 0;
        }
    }

    /// Advances the toggle countdown. Returns whether the level toggled.
    ///
    /// Only output pins oscillating below the threshold are toggled: faster oscillations are
    /// reported as constantly high instead. The pin flips once per `1 / freq` seconds, so the
    /// realized square wave runs at half the configured frequency.
    pub(crate) fn advance(&mut self, elapsed_us: u64) -> bool {
        if !self.is_output || self.frequency == 0 || self.frequency >= OSCILLATION_THRESHOLD {
            return false;
        }

        self.countdown -= elapsed_us as i64;
        if self.countdown > 0 {
            return false;
        }

        self.countdown += Self::half_period(self.frequency);
        self.level = !self.level;
        true
    }

    fn half_period(freq: u32) -> i64 {
        1_000_000 / freq as i64
    }
}
