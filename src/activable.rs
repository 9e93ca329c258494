use crate::*;
use log::debug;

/// A reference to one of a chip's pins together with the level that asserts it
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PinRef {
    pub pin: PinId,
    pub active_low: bool,
}

impl PinRef {
    /// Whether the referenced pin is currently at its asserting level
    pub fn is_asserted(&self, graph: &Graph) -> bool {
        graph.effective_level(self.pin) != self.active_low
    }
}

/// Enable logic shared by every activable chip
#[derive(Clone, Debug)]
pub struct Activation {
    refs: Vec<PinRef>,
    is_enabled: bool,
}

impl Activation {
    pub fn new(refs: Vec<PinRef>) -> Self {
        Activation {
            refs,
            is_enabled: true,
        }
    }

    pub fn refs(&self) -> &[PinRef] {
        &self.refs
    }

    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    pub fn watches(&self, pin: PinId) -> bool {
        self.refs.iter().any(|r| r.pin == pin)
    }

    /// Evaluates every reference from scratch
    pub fn compute(&self, graph: &Graph) -> bool {
        self.refs.iter().all(|r| r.is_asserted(graph))
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.is_enabled = enabled;
    }
}

impl Graph {
    /// Change hook for one input of a chip
    pub(crate) fn pin_changed(&mut self, chip: ChipId, pin: PinId) {
        match self.refresh_enabled(chip, pin) {
            Some(true) => self.became_enabled(chip),
            Some(false) => self.became_disabled(chip),
            None => {}
        }

        // decoders are refreshed by `update` once every input has been seen
        if matches!(self.chips[chip].archetype(), Archetype::ShiftRegister(..)) {
            self.shift_register_changed(chip, pin);
        }
    }

    /// Recomputes `is_enabled` if `pin` is an enable reference. Returns the new value if it
    /// flipped.
    fn refresh_enabled(&mut self, chip: ChipId, pin: PinId) -> Option<bool> {
        let activation = self.chips[chip].archetype().activation()?;
        if !activation.watches(pin) {
            return None;
        }

        let enabled = activation.compute(self);
        let activation = self.chips[chip].archetype_mut().activation_mut()?;
        if activation.is_enabled() == enabled {
            return None;
        }
        activation.set_enabled(enabled);

        debug!(
            "Chip '{}' {}",
            self.chips[chip].name(),
            if enabled { "enabled" } else { "disabled" }
        );
        Some(enabled)
    }

    fn became_enabled(&mut self, chip: ChipId) {
        match self.chips[chip].archetype() {
            Archetype::Decoder(..) => self.refresh_decoder(chip),
            Archetype::ShiftRegister(..) => self.mirror_buffer(chip),
            Archetype::Plain | Archetype::Activable(_) => {}
        }
    }

    fn became_disabled(&mut self, chip: ChipId) {
        match self.chips[chip].archetype() {
            Archetype::Decoder(..) => self.refresh_decoder(chip),
            Archetype::ShiftRegister(..) => self.clear_results(chip),
            Archetype::Plain | Archetype::Activable(_) => {}
        }
    }
}
