use crate::*;
use log::{debug, trace};
use std::fmt;

/// The arena holding every pin and chip of a simulation
///
/// All writes go through the graph so a change can be propagated to the chips observing it
/// without pins or chips holding references to one another.
#[derive(Default, Debug)]
pub struct Graph {
    pub(crate) pins: Vec<Pin>,
    pub(crate) chips: Vec<Chip>,
}

impl Graph {
    pub fn new() -> Graph {
        Graph::default()
    }

    pub fn pin(&self, pin: PinId) -> &Pin {
        &self.pins[pin]
    }

    pub fn chip(&self, chip: ChipId) -> &Chip {
        &self.chips[chip]
    }

    pub fn chip_count(&self) -> usize {
        self.chips.len()
    }

    /// Looks up a chip's pin by name
    ///
    /// Panics if the chip has no such pin
    pub fn get_pin(&self, chip: ChipId, name: &str) -> PinId {
        self.chips[chip].get_pin(name)
    }

    pub fn get_pins<S: AsRef<str>>(&self, chip: ChipId, names: &[S]) -> Vec<PinId> {
        self.chips[chip].get_pins(names)
    }

    /// Frequency seen on a pin: its own for outputs, the fastest wired output for inputs
    pub fn oscillation_frequency(&self, pin: PinId) -> u32 {
        let p = &self.pins[pin];
        if p.is_output() {
            return p.stored_frequency();
        }
        self.wired_outputs(pin)
            .map(|w| self.pins[w].stored_frequency())
            .max()
            .unwrap_or(0)
    }

    pub fn is_oscillating(&self, pin: PinId) -> bool {
        self.oscillation_frequency(pin) >= OSCILLATION_THRESHOLD
    }

    /// The logic level a pin reports once oscillation and wiring are resolved
    ///
    /// Inputs driven by at least one output read the OR of those outputs. Undriven inputs read
    /// their own stored level.
    pub fn effective_level(&self, pin: PinId) -> bool {
        let p = &self.pins[pin];
        if p.is_output() {
            return self.output_level(pin);
        }

        let mut driven = false;
        for w in self.wired_outputs(pin) {
            if self.output_level(w) {
                return true;
            }
            driven = true;
        }

        !driven && p.stored_level()
    }

    /// What a chip observes on a pin
    pub fn observed(&self, pin: PinId) -> Level {
        if self.is_oscillating(pin) {
            Level::Oscillating(self.oscillation_frequency(pin))
        } else {
            Level::Logic(self.effective_level(pin))
        }
    }

    /// Reads pins as an unsigned integer, the first pin being the least significant bit
    pub fn value(&self, pins: &[PinId]) -> u64 {
        let mut value = 0;
        for (bit, &pin) in pins.iter().enumerate() {
            if self.effective_level(pin) {
                value |= 1u64 << bit;
            }
        }
        value
    }

    fn output_level(&self, pin: PinId) -> bool {
        let p = &self.pins[pin];
        p.stored_frequency() >= OSCILLATION_THRESHOLD || p.stored_level()
    }

    fn wired_outputs(&self, pin: PinId) -> impl Iterator<Item = PinId> + '_ {
        self.pins[pin]
            .wires()
            .iter()
            .copied()
            .filter(|&w| self.pins[w].is_output())
    }

    /// Chips other than the pin's owner that have a non-output pin wired to it
    fn listeners(&self, pin: PinId) -> Vec<ChipId> {
        let owner = *self.pins[pin].chip();
        let mut chips = Vec::new();
        for &w in self.pins[pin].wires() {
            let wired = &self.pins[w];
            if wired.is_output() {
                continue;
            }
            if let Some(chip) = *wired.chip() {
                if Some(chip) != owner && !chips.contains(&chip) {
                    chips.push(chip);
                }
            }
        }
        chips
    }

    /// Notifies whoever can observe a change on `pin`
    fn propagate(&mut self, pin: PinId) {
        trace!("Propagating {}", self.pins[pin].code());
        if self.pins[pin].is_output() {
            for chip in self.listeners(pin) {
                self.update(chip);
            }
        } else if let Some(chip) = *self.pins[pin].chip() {
            self.update(chip);
        }
    }

    /// Stores a level, dropping any oscillation. Returns whether anything observable changed.
    fn write(&mut self, pin: PinId, level: bool) -> bool {
        let p = &mut self.pins[pin];
        let oscillated = p.clear_frequency();
        let changed = p.store_level(level);
        changed || oscillated
    }

    pub fn set(&mut self, pin: PinId, level: bool) {
        if self.write(pin, level) {
            self.propagate(pin);
        }
    }

    pub fn set_high(&mut self, pin: PinId) {
        self.set(pin, true)
    }

    pub fn set_low(&mut self, pin: PinId) {
        self.set(pin, false)
    }

    pub fn toggle(&mut self, pin: PinId) {
        let level = self.pins[pin].stored_level();
        self.set(pin, !level)
    }

    /// Asserts a pin, honoring its active-low flag
    pub fn enable(&mut self, pin: PinId) {
        let level = self.pins[pin].asserted_level();
        self.set(pin, level)
    }

    /// Deasserts a pin, honoring its active-low flag
    pub fn disable(&mut self, pin: PinId) {
        let level = self.pins[pin].asserted_level();
        self.set(pin, !level)
    }

    /// Makes a pin oscillate at `freq` Hz, or stop oscillating with 0
    ///
    /// Always propagates, even if the frequency is unchanged.
    pub fn set_oscillating_frequency(&mut self, pin: PinId, freq: u32) {
        self.pins[pin].store_frequency(freq);
        self.propagate(pin);
    }

    /// Advances one pin's oscillation by `elapsed_us` microseconds
    pub fn tick_pin(&mut self, pin: PinId, elapsed_us: u64) {
        if self.pins[pin].advance(elapsed_us) {
            self.propagate(pin);
        }
    }

    /// Advances every slow oscillation in the graph by `elapsed_us` microseconds
    pub fn tick(&mut self, elapsed_us: u64) {
        for pin in 0..self.pins.len() {
            self.tick_pin(pin, elapsed_us);
        }
    }

    /// Connects two pins without notifying anyone. Wiring a pin to itself does nothing.
    pub fn wire(&mut self, a: PinId, b: PinId) {
        if a == b {
            return;
        }
        self.pins[a].add_wire(b);
        self.pins[b].add_wire(a);
    }

    /// Wires inputs of `chip` to outputs of `other`, pairwise, then updates `chip`
    pub fn wire_pins(
        &mut self,
        chip: ChipId,
        other: ChipId,
        inputs: &[&str],
        outputs: &[&str],
    ) -> Result<()> {
        if inputs.len() != outputs.len() {
            return Err(ConfigError::WireCountMismatch {
                chip: self.chips[chip].name().clone(),
                inputs: inputs.len(),
                outputs: outputs.len(),
            });
        }

        let mut pairs = Vec::with_capacity(inputs.len());
        for (input, output) in inputs.iter().zip(outputs) {
            let input = self.chips[chip].try_pin(input)?;
            let output_name = *output;
            let output = self.chips[other].try_pin(output_name)?;
            if !self.pins[output].is_output() {
                return Err(ConfigError::WrongDirection {
                    chip: self.chips[other].name().clone(),
                    pin: output_name.to_string(),
                    expected: "output",
                });
            }
            pairs.push((input, output));
        }

        for (input, output) in pairs {
            debug!(
                "Wiring {}.{} to {}.{}",
                self.chips[chip].name(),
                self.pins[input].code(),
                self.chips[other].name(),
                self.pins[output].code()
            );
            self.wire(input, output);
        }

        self.update(chip);
        Ok(())
    }

    /// Drives pins of `chip` by name in a single batch
    ///
    /// Every affected chip is updated at most once, after all the writes are applied.
    ///
    /// Panics if a name is not a pin of `chip`
    pub fn set_pins(&mut self, chip: ChipId, low: &[&str], high: &[&str]) {
        let low = self.get_pins(chip, low);
        let high = self.get_pins(chip, high);
        self.set_pin_ids(chip, &low, &high);
    }

    pub(crate) fn set_pin_ids(&mut self, chip: ChipId, low: &[PinId], high: &[PinId]) {
        let mut local = false;
        let mut external: Vec<ChipId> = Vec::new();

        let writes = low
            .iter()
            .map(|&pin| (pin, false))
            .chain(high.iter().map(|&pin| (pin, true)));
        for (pin, level) in writes {
            if !self.write(pin, level) {
                continue;
            }
            trace!("{} set {}", self.pins[pin].code(), Level::from(level));
            if self.pins[pin].is_output() {
                for listener in self.listeners(pin) {
                    if !external.contains(&listener) {
                        external.push(listener);
                    }
                }
            } else {
                local = true;
            }
        }

        if local {
            self.update(chip);
        }
        for listener in external {
            self.update(listener);
        }
    }

    /// Re-reads every input of `chip` and fires the change hook for those that differ from the
    /// last observation. A decoder then recomputes its results whether or not anything changed.
    pub fn update(&mut self, chip: ChipId) {
        for pin in self.chips[chip].inputs().clone() {
            let level = self.observed(pin);
            let code = self.pins[pin].code().clone();
            if self.chips[chip].remember(&code, level) {
                trace!("{}.{} now {}", self.chips[chip].name(), code, level);
                self.pin_changed(chip, pin);
            }
        }
        self.refresh_decoder(chip);
    }

    /// Textual view of a chip's pins
    pub fn render(&self, chip: ChipId) -> ChipRender<'_> {
        ChipRender { graph: self, chip }
    }
}

/// Displays each pin of a chip with its direction and level
pub struct ChipRender<'a> {
    graph: &'a Graph,
    chip: ChipId,
}

impl fmt::Display for ChipRender<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chip = self.graph.chip(self.chip);
        writeln!(f, "{}", chip.name())?;
        for &pin in chip.pins() {
            let p = self.graph.pin(pin);
            let direction = if p.is_output() { "out" } else { "in" };
            writeln!(
                f,
                "  {} {} {}",
                p.declared_name(),
                direction,
                self.graph.observed(pin)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test_graph {
    use crate::*;

    fn source(graph: &mut Graph, name: &str, outputs: &[&str]) -> ChipId {
        graph.add_chip(ChipSpec::new(name).outputs(outputs)).unwrap()
    }

    fn sink(graph: &mut Graph, name: &str, inputs: &[&str]) -> ChipId {
        graph.add_chip(ChipSpec::new(name).inputs(inputs)).unwrap()
    }

    #[test]
    fn test_propagation() {
        let mut graph = Graph::new();
        let a = source(&mut graph, "a", &["O"]);
        let b = sink(&mut graph, "b", &["I"]);
        graph.wire_pins(b, a, &["I"], &["O"]).unwrap();

        let o = graph.get_pin(a, "O");
        let i = graph.get_pin(b, "I");
        assert_low!(graph, i);

        graph.set_high(o);
        assert_high!(graph, i);
        assert_eq!(graph.chip(b).notifications(), 1);

        graph.set_low(o);
        assert_low!(graph, i);
        assert_eq!(graph.chip(b).notifications(), 2);
    }

    #[test]
    fn test_wires_are_symmetric() {
        let mut graph = Graph::new();
        let a = source(&mut graph, "a", &["O"]);
        let b = sink(&mut graph, "b", &["I"]);
        graph.wire_pins(b, a, &["I"], &["O"]).unwrap();

        let o = graph.get_pin(a, "O");
        let i = graph.get_pin(b, "I");
        assert!(graph.pin(o).wires().contains(&i));
        assert!(graph.pin(i).wires().contains(&o));
    }

    #[test]
    fn test_same_level_is_a_no_op() {
        let mut graph = Graph::new();
        let a = source(&mut graph, "a", &["O"]);
        let b = sink(&mut graph, "b", &["I"]);
        graph.wire_pins(b, a, &["I"], &["O"]).unwrap();
        let o = graph.get_pin(a, "O");

        graph.set_low(o);
        graph.set_pins(a, &["O"], &[]);
        assert_eq!(graph.chip(b).notifications(), 0);

        graph.set_high(o);
        graph.set_high(o);
        graph.set_pins(a, &[], &["O"]);
        assert_eq!(graph.chip(b).notifications(), 1);
    }

    #[test]
    fn test_wired_or() {
        let mut graph = Graph::new();
        let a = source(&mut graph, "a", &["O1", "O2"]);
        let b = sink(&mut graph, "b", &["I"]);
        graph.wire_pins(b, a, &["I", "I"], &["O1", "O2"]).unwrap();

        let o1 = graph.get_pin(a, "O1");
        let o2 = graph.get_pin(a, "O2");
        let i = graph.get_pin(b, "I");

        assert_low!(graph, i);
        graph.set_high(o1);
        assert_high!(graph, i);
        graph.set_high(o2);
        assert_high!(graph, i);
        graph.set_low(o1);
        assert_high!(graph, i);
        graph.set_low(o2);
        assert_low!(graph, i);
    }

    #[test]
    fn test_driven_input_ignores_its_default() {
        let mut graph = Graph::new();
        let a = source(&mut graph, "a", &["O"]);
        let b = graph
            .add_chip(ChipSpec::new("b").inputs(&["I"]).high(&["I"]))
            .unwrap();
        let i = graph.get_pin(b, "I");
        assert_high!(graph, i);

        graph.wire_pins(b, a, &["I"], &["O"]).unwrap();
        assert_low!(graph, i);
        assert_eq!(graph.chip(b).notifications(), 1);
    }

    #[test]
    fn test_inputs_do_not_drive_inputs() {
        let mut graph = Graph::new();
        let a = graph
            .add_chip(ChipSpec::new("a").inputs(&["I"]).high(&["I"]))
            .unwrap();
        let b = sink(&mut graph, "b", &["I"]);
        let ai = graph.get_pin(a, "I");
        let bi = graph.get_pin(b, "I");
        graph.wire(ai, bi);

        assert_high!(graph, ai);
        assert_low!(graph, bi);

        graph.wire(ai, ai);
        assert!(!graph.pin(ai).wires().contains(&ai));
    }

    #[test]
    fn test_unwired_input_flip_flop() {
        let mut graph = Graph::new();
        let b = sink(&mut graph, "b", &["I"]);
        let i = graph.get_pin(b, "I");

        graph.set_high(i);
        assert_high!(graph, i);
        assert_eq!(graph.chip(b).notifications(), 1);

        graph.toggle(i);
        assert_low!(graph, i);
        assert_eq!(graph.chip(b).notifications(), 2);
    }

    #[test]
    fn test_set_pins_updates_each_chip_once() {
        let mut graph = Graph::new();
        let a = source(&mut graph, "a", &["O1", "O2", "O3"]);
        let b = sink(&mut graph, "b", &["I1", "I2", "I3"]);
        let c = sink(&mut graph, "c", &["I1"]);
        graph
            .wire_pins(b, a, &["I1", "I2", "I3"], &["O1", "O2", "O3"])
            .unwrap();
        graph.wire_pins(c, a, &["I1"], &["O3"]).unwrap();

        graph.set_pins(a, &[], &["O1", "O2", "O3"]);

        // one notification per changed input, all from a single update
        assert_eq!(graph.chip(b).notifications(), 3);
        assert_eq!(graph.chip(c).notifications(), 1);
        assert_eq!(graph.value(graph.chip(b).inputs()), 0b111);
    }

    #[test]
    fn test_oscillation_is_observed() {
        let mut graph = Graph::new();
        let a = source(&mut graph, "a", &["O"]);
        let b = sink(&mut graph, "b", &["I"]);
        graph.wire_pins(b, a, &["I"], &["O"]).unwrap();
        let o = graph.get_pin(a, "O");
        let i = graph.get_pin(b, "I");

        graph.set_oscillating_frequency(o, 5000);
        assert!(graph.is_oscillating(i));
        assert_eq!(graph.oscillation_frequency(i), 5000);
        assert_eq!(graph.observed(i), Level::Oscillating(5000));
        assert_high!(graph, i);
        assert_eq!(graph.chip(b).notifications(), 1);

        // below the threshold only the stored level is visible
        graph.set_oscillating_frequency(o, 10);
        assert!(!graph.is_oscillating(i));
        assert_low!(graph, i);
        assert_eq!(graph.chip(b).notifications(), 2);

        graph.set_oscillating_frequency(o, 5000);
        graph.set_low(o);
        assert_eq!(graph.pin(o).stored_frequency(), 0);
        assert_eq!(graph.observed(i), Level::LOW);
        assert_eq!(graph.chip(b).notifications(), 4);
    }

    #[test]
    fn test_input_frequency_is_fastest_driver() {
        let mut graph = Graph::new();
        let a = source(&mut graph, "a", &["O1", "O2"]);
        let b = sink(&mut graph, "b", &["I"]);
        graph.wire_pins(b, a, &["I", "I"], &["O1", "O2"]).unwrap();

        graph.set_oscillating_frequency(graph.get_pin(a, "O1"), 2000);
        graph.set_oscillating_frequency(graph.get_pin(a, "O2"), 3000);
        assert_eq!(graph.oscillation_frequency(graph.get_pin(b, "I")), 3000);
    }

    #[test]
    fn test_frequency_makes_input_an_output() {
        let mut graph = Graph::new();
        let b = sink(&mut graph, "b", &["I"]);
        let i = graph.get_pin(b, "I");

        graph.set_oscillating_frequency(i, 2000);
        assert!(graph.pin(i).is_output());
        assert_high!(graph, i);
    }

    #[test]
    fn test_tick_propagates_toggles() {
        let mut graph = Graph::new();
        let a = source(&mut graph, "a", &["CLK"]);
        let b = sink(&mut graph, "b", &["CLK"]);
        graph.wire_pins(b, a, &["CLK"], &["CLK"]).unwrap();
        let clk = graph.get_pin(a, "CLK");
        let input = graph.get_pin(b, "CLK");

        graph.set_oscillating_frequency(clk, 100); // toggles every 10ms
        let before = graph.chip(b).notifications();

        graph.tick(5_000);
        assert_low!(graph, input);
        graph.tick(5_000);
        assert_high!(graph, input);
        graph.tick(10_000);
        assert_low!(graph, input);
        assert_eq!(graph.chip(b).notifications(), before + 2);
    }

    #[test]
    fn test_wire_pins_errors() {
        let mut graph = Graph::new();
        let a = source(&mut graph, "a", &["O"]);
        let b = sink(&mut graph, "b", &["I"]);

        assert!(matches!(
            graph.wire_pins(b, a, &["I"], &["O", "O"]),
            Err(ConfigError::WireCountMismatch {
                inputs: 1,
                outputs: 2,
                ..
            })
        ));
        assert!(matches!(
            graph.wire_pins(b, a, &["X"], &["O"]),
            Err(ConfigError::UnknownPin { .. })
        ));
        assert!(matches!(
            graph.wire_pins(a, b, &["O"], &["I"]),
            Err(ConfigError::WrongDirection { expected: "output", .. })
        ));

        let i = graph.get_pin(b, "I");
        assert!(graph.pin(i).wires().is_empty());
    }

    #[test]
    fn test_wire_to_power() {
        let mut graph = Graph::new();
        let a = sink(&mut graph, "a", &[]);
        let b = sink(&mut graph, "b", &["I"]);
        graph.wire_pins(b, a, &["I"], &["VCC"]).unwrap();
        assert_high!(graph, graph.get_pin(b, "I"));
    }

    #[test]
    fn test_feedback_loop_settles() {
        let mut graph = Graph::new();
        let host = source(&mut graph, "host", &["A1"]);
        let dec_a = Ic74HC138::new(&mut graph, "dec_a").unwrap();
        let dec_b = Ic74HC138::new(&mut graph, "dec_b").unwrap();

        graph
            .wire_pins(*dec_a.chip(), *dec_b.chip(), &["E3"], &["VCC"])
            .unwrap();
        graph
            .wire_pins(*dec_b.chip(), *dec_a.chip(), &["E3"], &["VCC"])
            .unwrap();
        graph
            .wire_pins(*dec_a.chip(), *dec_b.chip(), &["A0"], &["~Y0"])
            .unwrap();
        graph
            .wire_pins(*dec_b.chip(), *dec_a.chip(), &["A0"], &["~Y0"])
            .unwrap();
        graph.wire_pins(*dec_a.chip(), host, &["A1"], &["A1"]).unwrap();

        assert_eq!(graph.value(dec_a.y_inv()), 0b1111_1110);
        assert_eq!(graph.value(dec_b.y_inv()), 0b1111_1110);

        // a's Y0 rises, which moves b to Y1, whose Y0 rise moves a on to Y3
        graph.set_pins(host, &[], &["A1"]);
        assert_eq!(graph.value(dec_a.y_inv()), 0b1111_0111);
        assert_eq!(graph.value(dec_b.y_inv()), 0b1111_1101);
    }

    #[test]
    fn test_update_restores_decoder_outputs() {
        let mut graph = Graph::new();
        let decoder = Ic74HC138::new(&mut graph, "decoder").unwrap();
        let chip = *decoder.chip();
        graph.set_high(*decoder.e3());
        assert_eq!(graph.value(decoder.y_inv()), 0b1111_1110);

        // writing the outputs directly does not go through the decoder
        graph.set_pins(chip, &["~Y5"], &["~Y0"]);
        assert_eq!(graph.value(decoder.y_inv()), 0b1101_1111);
        let notifications = graph.chip(chip).notifications();

        graph.update(chip);
        assert_eq!(graph.value(decoder.y_inv()), 0b1111_1110);
        assert_eq!(graph.chip(chip).notifications(), notifications);
    }

    #[test]
    fn test_render() {
        let mut graph = Graph::new();
        let chip = graph
            .add_chip(
                ChipSpec::new("chip")
                    .outputs(&["~Q"])
                    .inputs(&["A"])
                    .high(&["~Q"]),
            )
            .unwrap();
        let a = graph.get_pin(chip, "A");
        graph.set_oscillating_frequency(a, 1200);

        assert_eq!(
            graph.render(chip).to_string(),
            "chip\n  ~Q out high\n  A out 1200Hz\n  VCC out high\n"
        );
    }
}
