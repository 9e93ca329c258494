use crate::*;
use log::{debug, trace};

/// Shift register pin assignment by name
#[derive(Debug, Clone, Default)]
pub struct ShiftRegisterSpec {
    serial: Vec<String>,
    clock: String,
    results: Vec<String>,
    latch: Option<String>,
    reset: Option<String>,
}

impl ShiftRegisterSpec {
    /// `serial` inputs are AND-combined into the bit shifted in on each rising edge of `clock`.
    /// `results` receive the buffer, bit 0 first.
    pub fn new<S: AsRef<str>, T: AsRef<str>>(serial: &[S], clock: &str, results: &[T]) -> Self {
        ShiftRegisterSpec {
            serial: serial.iter().map(|s| s.as_ref().to_string()).collect(),
            clock: clock.to_string(),
            results: results.iter().map(|s| s.as_ref().to_string()).collect(),
            ..Default::default()
        }
    }

    /// Holds the results until this pin rises instead of updating them on every shift
    pub fn latch(mut self, pin: &str) -> Self {
        self.latch = Some(pin.to_string());
        self
    }

    /// Clears the buffer and results while asserted. Takes the active-low marker.
    pub fn reset(mut self, pin: &str) -> Self {
        self.reset = Some(pin.to_string());
        self
    }

    pub(crate) fn resolve(&self, resolver: &Resolver<'_>) -> Result<ShiftRegister> {
        Ok(ShiftRegister {
            serial: resolver.inputs(&self.serial)?,
            clock: resolver.input(&self.clock)?,
            results: resolver.results(&self.results, MAX_RESULT_PINS)?,
            latch: self
                .latch
                .as_deref()
                .map(|name| resolver.input(name))
                .transpose()?,
            reset: self
                .reset
                .as_deref()
                .map(|name| resolver.reference(name))
                .transpose()?,
            buffer: 0,
        })
    }
}

/// Clocked serial-in, parallel-out register
#[derive(Debug, Clone)]
pub struct ShiftRegister {
    serial: Vec<PinId>,
    clock: PinId,
    results: Vec<PinId>,
    latch: Option<PinId>,
    reset: Option<PinRef>,
    buffer: u64,
}

impl ShiftRegister {
    pub fn buffer(&self) -> u64 {
        self.buffer
    }

    pub fn results(&self) -> &[PinId] {
        &self.results
    }

    fn mask(&self) -> u64 {
        let width = self.results.len();
        if width >= 64 {
            u64::MAX
        } else {
            (1 << width) - 1
        }
    }

    /// Splits the result pins into those that should be low and those that should be high
    fn mirror(&self) -> (Vec<PinId>, Vec<PinId>) {
        self.results
            .iter()
            .enumerate()
            .map(|(bit, &pin)| (pin, self.buffer & (1 << bit) != 0))
            .fold((Vec::new(), Vec::new()), |(mut low, mut high), (pin, set)| {
                if set {
                    high.push(pin);
                } else {
                    low.push(pin);
                }
                (low, high)
            })
    }
}

impl Graph {
    fn register(&self, chip: ChipId) -> Option<&ShiftRegister> {
        match self.chips[chip].archetype() {
            Archetype::ShiftRegister(_, register) => Some(register),
            _ => None,
        }
    }

    fn register_mut(&mut self, chip: ChipId) -> Option<&mut ShiftRegister> {
        match self.chips[chip].archetype_mut() {
            Archetype::ShiftRegister(_, register) => Some(register),
            _ => None,
        }
    }

    /// Change hook of a shift register
    pub(crate) fn shift_register_changed(&mut self, chip: ChipId, pin: PinId) {
        let Some(register) = self.register(chip) else {
            return;
        };
        let clock = register.clock;
        let latch = register.latch;

        if register.reset.is_some_and(|reset| reset.is_asserted(self)) {
            debug!("{} reset", self.chips[chip].name());
            if let Some(register) = self.register_mut(chip) {
                register.buffer = 0;
            }
            self.clear_results(chip);
        } else if pin == clock && self.effective_level(clock) {
            self.shift(chip);
            if latch.is_none() {
                self.mirror_buffer(chip);
            }
        } else if Some(pin) == latch && self.effective_level(pin) {
            trace!("{} latched", self.chips[chip].name());
            self.mirror_buffer(chip);
        }
    }

    fn shift(&mut self, chip: ChipId) {
        let Some(register) = self.register(chip) else {
            return;
        };
        let bit = register.serial.iter().all(|&pin| self.effective_level(pin));

        if let Some(register) = self.register_mut(chip) {
            register.buffer = (register.buffer << 1 | bit as u64) & register.mask();
            trace!("Shifted in {}, buffer {:#b}", bit as u8, register.buffer);
        }
    }

    /// Writes the buffer onto the result pins
    pub(crate) fn mirror_buffer(&mut self, chip: ChipId) {
        if let Some((low, high)) = self.register(chip).map(ShiftRegister::mirror) {
            self.set_pin_ids(chip, &low, &high);
        }
    }

    pub(crate) fn clear_results(&mut self, chip: ChipId) {
        if let Some(results) = self.register(chip).map(|r| r.results.clone()) {
            self.set_pin_ids(chip, &results, &[]);
        }
    }
}
