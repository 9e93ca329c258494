use crate::*;
use log::trace;

/// Widest address a decoder can take
pub const MAX_ADDRESS_PINS: usize = 16;

/// Widest result bus a decoder or shift register can drive
pub const MAX_RESULT_PINS: usize = 64;

/// Decoder pin assignment by name
#[derive(Debug, Clone, Default)]
pub struct DecoderSpec {
    address: Vec<String>,
    results: Vec<String>,
}

impl DecoderSpec {
    /// `address` is least significant bit first, `results` are the active-low outputs in index
    /// order
    pub fn new<S: AsRef<str>, T: AsRef<str>>(address: &[S], results: &[T]) -> Self {
        DecoderSpec {
            address: address.iter().map(|s| s.as_ref().to_string()).collect(),
            results: results.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    pub(crate) fn resolve(&self, resolver: &Resolver<'_>) -> Result<Decoder> {
        if self.address.len() > MAX_ADDRESS_PINS {
            return Err(ConfigError::TooManyAddressPins {
                chip: resolver.chip().to_string(),
                count: self.address.len(),
                max: MAX_ADDRESS_PINS,
            });
        }
        Ok(Decoder {
            address: resolver.inputs(&self.address)?,
            results: resolver.results(&self.results, MAX_RESULT_PINS)?,
        })
    }
}

/// Drives one of its active-low results low, picked by the binary value of the address pins
///
/// The decoder keeps no state: its outputs are a function of the address levels and whether
/// the chip is enabled.
#[derive(Debug, Clone)]
pub struct Decoder {
    address: Vec<PinId>,
    results: Vec<PinId>,
}

impl Decoder {
    pub fn address(&self) -> &[PinId] {
        &self.address
    }

    pub fn results(&self) -> &[PinId] {
        &self.results
    }
}

/// Every index a decoder may be selecting while some address bits oscillate
///
/// `base` has all oscillating bits set. The range is `base` itself followed by `base` with
/// each non-empty subset of the oscillating bits cleared.
pub fn selection_range(base: u64, oscillating: &[usize]) -> Vec<u64> {
    let mut range = Vec::with_capacity(1 << oscillating.len());
    for subset in 0..1u64 << oscillating.len() {
        let mut index = base;
        for (i, &bit) in oscillating.iter().enumerate() {
            if subset & (1 << i) != 0 {
                index &= !(1 << bit);
            }
        }
        range.push(index);
    }
    range
}

impl Graph {
    /// Recomputes every result pin of a decoder
    pub(crate) fn refresh_decoder(&mut self, chip: ChipId) {
        let decoder = match self.chips[chip].archetype() {
            Archetype::Decoder(_, decoder) => decoder.clone(),
            _ => return,
        };

        if !self.chips[chip].is_enabled() {
            self.set_pin_ids(chip, &[], decoder.results());
            return;
        }

        let mut base = 0u64;
        let mut oscillating = Vec::new();
        let mut max_freq = 0u32;
        for (bit, &pin) in decoder.address().iter().enumerate() {
            if self.is_oscillating(pin) {
                oscillating.push(bit);
                max_freq = max_freq.max(self.oscillation_frequency(pin));
                base |= 1 << bit;
            } else if self.effective_level(pin) {
                base |= 1 << bit;
            }
        }

        if oscillating.is_empty() {
            trace!("{} selects {}", self.chips[chip].name(), base);
            let (low, high): (Vec<_>, Vec<_>) = decoder
                .results()
                .iter()
                .enumerate()
                .partition(|(index, _)| *index as u64 == base);
            let low: Vec<PinId> = low.into_iter().map(|(_, &pin)| pin).collect();
            let high: Vec<PinId> = high.into_iter().map(|(_, &pin)| pin).collect();
            self.set_pin_ids(chip, &low, &high);
            return;
        }

        let range = selection_range(base, &oscillating);
        let freq = max_freq / range.len() as u32;
        trace!(
            "{} oscillates between {:?} at {}Hz",
            self.chips[chip].name(),
            range,
            freq
        );

        let mut selected = Vec::new();
        let mut high = Vec::new();
        for (index, &pin) in decoder.results().iter().enumerate() {
            if range.contains(&(index as u64)) {
                selected.push(pin);
            } else {
                high.push(pin);
            }
        }
        self.set_pin_ids(chip, &[], &high);
        for pin in selected {
            if self.pins[pin].stored_frequency() != freq {
                self.set_oscillating_frequency(pin, freq);
            }
        }
    }
}
