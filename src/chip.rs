use crate::*;
use derive_getters::Getters;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

pub type ChipId = usize;

/// The behavior attached to a chip, resolved to pin ids
#[derive(Debug, Clone)]
pub enum Archetype {
    Plain,
    Activable(Activation),
    Decoder(Activation, Decoder),
    ShiftRegister(Activation, ShiftRegister),
}

impl Archetype {
    pub fn activation(&self) -> Option<&Activation> {
        match self {
            Archetype::Plain => None,
            Archetype::Activable(activation)
            | Archetype::Decoder(activation, _)
            | Archetype::ShiftRegister(activation, _) => Some(activation),
        }
    }

    pub(crate) fn activation_mut(&mut self) -> Option<&mut Activation> {
        match self {
            Archetype::Plain => None,
            Archetype::Activable(activation)
            | Archetype::Decoder(activation, _)
            | Archetype::ShiftRegister(activation, _) => Some(activation),
        }
    }
}

/// A collection of pins with change detection over its inputs
#[derive(Debug, Getters)]
pub struct Chip {
    name: String,

    /// Every pin in declaration order: outputs, then inputs, then power
    pins: Vec<PinId>,

    /// Declared output pins
    outputs: Vec<PinId>,

    /// Declared input pins
    inputs: Vec<PinId>,

    /// The implicit always-high pin
    power: PinId,

    archetype: Archetype,

    #[getter(skip)]
    by_code: BTreeMap<String, PinId>,

    // last observed level of each input, keyed by pin code
    #[getter(skip)]
    cache: BTreeMap<String, Level>,

    #[getter(skip)]
    notifications: usize,
}

impl Chip {
    /// Looks up a pin by name. The active-low marker is optional.
    pub fn find_pin(&self, name: &str) -> Option<PinId> {
        let (code, _) = split_marker(name);
        self.by_code.get(code).copied()
    }

    /// Looks up a pin by name, reporting unknown names as a configuration error
    pub fn try_pin(&self, name: &str) -> Result<PinId> {
        self.find_pin(name).ok_or_else(|| ConfigError::UnknownPin {
            chip: self.name.clone(),
            pin: name.to_string(),
        })
    }

    /// Looks up a pin by name
    ///
    /// Panics if the chip has no such pin
    pub fn get_pin(&self, name: &str) -> PinId {
        match self.find_pin(name) {
            Some(pin) => pin,
            None => panic!("Chip '{}' has no pin '{}'", self.name, name),
        }
    }

    pub fn get_pins<S: AsRef<str>>(&self, names: &[S]) -> Vec<PinId> {
        names.iter().map(|name| self.get_pin(name.as_ref())).collect()
    }

    /// Whether the enable references currently allow the chip to operate. Chips without enable
    /// logic are always enabled.
    pub fn is_enabled(&self) -> bool {
        self.archetype
            .activation()
            .map_or(true, |activation| activation.is_enabled())
    }

    /// Internal buffer of a shift register
    pub fn buffer(&self) -> Option<u64> {
        match &self.archetype {
            Archetype::ShiftRegister(_, register) => Some(register.buffer()),
            _ => None,
        }
    }

    /// Number of change notifications delivered so far
    pub fn notifications(&self) -> usize {
        self.notifications
    }

    pub(crate) fn archetype_mut(&mut self) -> &mut Archetype {
        &mut self.archetype
    }

    /// Stores the observed level of an input. Returns whether it differs from the cached one.
    pub(crate) fn remember(&mut self, code: &str, level: Level) -> bool {
        if self.cache.get(code) == Some(&level) {
            return false;
        }
        self.cache.insert(code.to_string(), level);
        self.notifications += 1;
        true
    }
}

/// Pin assignments specific to an archetype, by name
#[derive(Debug, Clone, Default)]
pub enum ArchetypeSpec {
    #[default]
    Plain,
    Decoder(DecoderSpec),
    ShiftRegister(ShiftRegisterSpec),
}

/// Declaration of a chip, checked when added to a [`Graph`]
#[derive(Debug, Clone, Default)]
pub struct ChipSpec {
    name: String,
    outputs: Vec<String>,
    inputs: Vec<String>,
    high: Vec<String>,
    enable: Vec<String>,
    archetype: ArchetypeSpec,
}

fn to_strings<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    names.iter().map(|name| name.as_ref().to_string()).collect()
}

impl ChipSpec {
    pub fn new(name: &str) -> Self {
        ChipSpec {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn outputs<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.outputs.extend(to_strings(names));
        self
    }

    pub fn inputs<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.inputs.extend(to_strings(names));
        self
    }

    /// Pins that start high. Inputs keep this as their level while nothing drives them.
    pub fn high<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.high.extend(to_strings(names));
        self
    }

    /// Enable references. A reference carrying the active-low marker is asserted when low.
    pub fn enable<S: AsRef<str>>(mut self, refs: &[S]) -> Self {
        self.enable.extend(to_strings(refs));
        self
    }

    pub fn decoder(mut self, spec: DecoderSpec) -> Self {
        self.archetype = ArchetypeSpec::Decoder(spec);
        self
    }

    pub fn shift_register(mut self, spec: ShiftRegisterSpec) -> Self {
        self.archetype = ArchetypeSpec::ShiftRegister(spec);
        self
    }
}

/// Resolves names against a chip that is still being built
pub(crate) struct Resolver<'a> {
    chip: &'a str,
    by_code: &'a BTreeMap<String, PinId>,
    outputs: &'a BTreeSet<PinId>,
}

impl Resolver<'_> {
    fn lookup(&self, name: &str) -> Result<PinId> {
        let (code, _) = split_marker(name);
        self.by_code
            .get(code)
            .copied()
            .ok_or_else(|| ConfigError::UnknownPin {
                chip: self.chip.to_string(),
                pin: name.to_string(),
            })
    }

    fn expect(&self, name: &str, output: bool) -> Result<PinId> {
        let pin = self.lookup(name)?;
        if self.outputs.contains(&pin) != output {
            return Err(ConfigError::WrongDirection {
                chip: self.chip.to_string(),
                pin: name.to_string(),
                expected: if output { "output" } else { "input" },
            });
        }
        Ok(pin)
    }

    pub fn input(&self, name: &str) -> Result<PinId> {
        self.expect(name, false)
    }

    pub fn output(&self, name: &str) -> Result<PinId> {
        self.expect(name, true)
    }

    pub fn inputs(&self, names: &[String]) -> Result<Vec<PinId>> {
        names.iter().map(|name| self.input(name)).collect()
    }

    /// Result pins: outputs, at least one, at most `max`
    pub fn results(&self, names: &[String], max: usize) -> Result<Vec<PinId>> {
        if names.is_empty() {
            return Err(ConfigError::EmptyResultPins {
                chip: self.chip.to_string(),
            });
        }
        if names.len() > max {
            return Err(ConfigError::TooManyResultPins {
                chip: self.chip.to_string(),
                count: names.len(),
                max,
            });
        }
        names.iter().map(|name| self.output(name)).collect()
    }

    /// An input reference whose polarity comes from its own marker
    pub fn reference(&self, name: &str) -> Result<PinRef> {
        let pin = self.input(name)?;
        let (_, active_low) = split_marker(name);
        Ok(PinRef { pin, active_low })
    }

    pub fn chip(&self) -> &str {
        self.chip
    }
}

impl Graph {
    /// Creates the pins of a declared chip and resolves its archetype
    pub fn add_chip(&mut self, spec: ChipSpec) -> Result<ChipId> {
        let chip = self.chips.len();

        let mut by_code = BTreeMap::new();
        let mut outputs = BTreeSet::new();
        let declared = spec
            .outputs
            .iter()
            .map(|name| (name.as_str(), true))
            .chain(spec.inputs.iter().map(|name| (name.as_str(), false)))
            .chain(std::iter::once((POWER_PIN, true)));

        let start = self.pins.len();
        let mut pins = Vec::new();
        for (name, is_output) in declared {
            let (code, _) = split_marker(name);
            let pin_id = start + pins.len();
            if by_code.insert(code.to_string(), pin_id).is_some() {
                return Err(ConfigError::DuplicatePin {
                    chip: spec.name.clone(),
                    pin: name.to_string(),
                });
            }
            if is_output {
                outputs.insert(pin_id);
            }
            let mut pin = Pin::new(name, is_output, false);
            pin.attach(chip);
            pins.push(pin);
        }
        if let Some(power) = pins.last_mut() {
            power.store_level(true);
        }

        let resolver = Resolver {
            chip: &spec.name,
            by_code: &by_code,
            outputs: &outputs,
        };

        for name in &spec.high {
            let pin_id = resolver.lookup(name)?;
            pins[pin_id - start].store_level(true);
        }

        let enable = spec
            .enable
            .iter()
            .map(|name| resolver.reference(name))
            .collect::<Result<Vec<_>>>()?;
        let archetype = match &spec.archetype {
            ArchetypeSpec::Plain if enable.is_empty() => Archetype::Plain,
            ArchetypeSpec::Plain => Archetype::Activable(Activation::new(enable)),
            ArchetypeSpec::Decoder(decoder) => {
                Archetype::Decoder(Activation::new(enable), decoder.resolve(&resolver)?)
            }
            ArchetypeSpec::ShiftRegister(register) => {
                Archetype::ShiftRegister(Activation::new(enable), register.resolve(&resolver)?)
            }
        };

        let ids: Vec<PinId> = (start..start + pins.len()).collect();
        let n_outputs = spec.outputs.len();
        let n_inputs = spec.inputs.len();
        self.pins.extend(pins);
        self.chips.push(Chip {
            name: spec.name,
            outputs: ids[..n_outputs].to_vec(),
            inputs: ids[n_outputs..n_outputs + n_inputs].to_vec(),
            power: ids[n_outputs + n_inputs],
            pins: ids,
            archetype,
            by_code,
            cache: BTreeMap::new(),
            notifications: 0,
        });

        self.initialize(chip);
        debug!("Added chip '{}' with {} pins", self.chips[chip].name, self.chips[chip].pins.len());

        Ok(chip)
    }

    /// Brings derived state in line with the initial pin levels without firing any hook
    fn initialize(&mut self, chip: ChipId) {
        let enabled = self.chips[chip]
            .archetype
            .activation()
            .map(|activation| activation.compute(self));
        if let (Some(enabled), Some(activation)) =
            (enabled, self.chips[chip].archetype.activation_mut())
        {
            activation.set_enabled(enabled);
        }

        for pin in self.chips[chip].inputs.clone() {
            let level = self.observed(pin);
            let code = self.pins[pin].code().clone();
            self.chips[chip].cache.insert(code, level);
        }

        match self.chips[chip].archetype {
            Archetype::Decoder(..) => self.refresh_decoder(chip),
            Archetype::ShiftRegister(..) => self.became_enabled_or_not(chip),
            Archetype::Plain | Archetype::Activable(_) => {}
        }
    }

    fn became_enabled_or_not(&mut self, chip: ChipId) {
        if self.chips[chip].is_enabled() {
            self.mirror_buffer(chip);
        } else {
            self.clear_results(chip);
        }
    }
}
