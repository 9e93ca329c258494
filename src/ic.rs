use crate::*;
use derive_getters::Getters;

fn numbered(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}{}", prefix, i)).collect()
}

/// 3-to-8 line decoder with active-low outputs
///
/// Enabled while `~E1` and `~E2` are low and `E3` is high. Every input floats low, so a fresh
/// chip is disabled until `E3` is driven.
#[derive(Debug, Getters)]
pub struct Ic74HC138 {
    chip: ChipId,
    a: Vec<PinId>,
    e1_inv: PinId,
    e2_inv: PinId,
    e3: PinId,
    y_inv: Vec<PinId>,
}

impl Ic74HC138 {
    pub fn new(graph: &mut Graph, name: &str) -> Result<Self> {
        let address = numbered("A", 3);
        let outputs = numbered("~Y", 8);

        let chip = graph.add_chip(
            ChipSpec::new(name)
                .outputs(&outputs)
                .inputs(&address)
                .inputs(&["~E1", "~E2", "E3"])
                .high(&outputs)
                .enable(&["~E1", "~E2", "E3"])
                .decoder(DecoderSpec::new(&address, &outputs)),
        )?;

        Ok(Self {
            chip,
            a: graph.get_pins(chip, &address),
            e1_inv: graph.get_pin(chip, "E1"),
            e2_inv: graph.get_pin(chip, "E2"),
            e3: graph.get_pin(chip, "E3"),
            y_inv: graph.get_pins(chip, &outputs),
        })
    }
}

/// 8-bit serial-in, parallel-out shift register
///
/// The two serial inputs are ANDed. `DSB` floats high so `DSA` alone can feed the register.
/// `~MR` clears it asynchronously and floats high.
#[derive(Debug, Getters)]
pub struct Ic74HC164 {
    chip: ChipId,
    dsa: PinId,
    dsb: PinId,
    cp: PinId,
    mr_inv: PinId,
    q: Vec<PinId>,
}

impl Ic74HC164 {
    pub fn new(graph: &mut Graph, name: &str) -> Result<Self> {
        let outputs = numbered("Q", 8);

        let chip = graph.add_chip(
            ChipSpec::new(name)
                .outputs(&outputs)
                .inputs(&["DSA", "DSB", "CP", "~MR"])
                .high(&["DSB", "~MR"])
                .shift_register(
                    ShiftRegisterSpec::new(&["DSA", "DSB"], "CP", &outputs).reset("~MR"),
                ),
        )?;

        Ok(Self {
            chip,
            dsa: graph.get_pin(chip, "DSA"),
            dsb: graph.get_pin(chip, "DSB"),
            cp: graph.get_pin(chip, "CP"),
            mr_inv: graph.get_pin(chip, "MR"),
            q: graph.get_pins(chip, &outputs),
        })
    }
}

/// 8-bit shift register with output latch
///
/// Shifts on `SHCP`, copies the buffer to the outputs on `STCP`. Outputs are forced low when
/// `~OE` goes high and get the buffer back when it goes low.
#[derive(Debug)]
pub struct Ic74HC595 {
    chip: ChipId,
    pins: Vec<PinId>,
}

impl Ic74HC595 {
    const Q_START: usize = 0;
    const WORD_SIZE: usize = 8;
    const Q_END: usize = Self::Q_START + Self::WORD_SIZE;

    const DS: usize = Self::Q_END;
    const SHCP: usize = Self::DS + 1;
    const STCP: usize = Self::DS + 2;
    const MR_INV: usize = Self::DS + 3;
    const OE_INV: usize = Self::DS + 4;

    pub fn chip(&self) -> ChipId {
        self.chip
    }

    pub fn q(&self) -> &[PinId] {
        &self.pins[Self::Q_START..Self::Q_END]
    }

    pub fn ds(&self) -> PinId {
        self.pins[Self::DS]
    }

    pub fn shcp(&self) -> PinId {
        self.pins[Self::SHCP]
    }

    pub fn stcp(&self) -> PinId {
        self.pins[Self::STCP]
    }

    pub fn mr_inv(&self) -> PinId {
        self.pins[Self::MR_INV]
    }

    pub fn oe_inv(&self) -> PinId {
        self.pins[Self::OE_INV]
    }

    pub fn new(graph: &mut Graph, name: &str) -> Result<Self> {
        let outputs = numbered("Q", Self::WORD_SIZE);

        let chip = graph.add_chip(
            ChipSpec::new(name)
                .outputs(&outputs)
                .inputs(&["DS", "SHCP", "STCP", "~MR", "~OE"])
                .high(&["~MR"])
                .enable(&["~OE"])
                .shift_register(
                    ShiftRegisterSpec::new(&["DS"], "SHCP", &outputs)
                        .latch("STCP")
                        .reset("~MR"),
                ),
        )?;

        let pins = graph.chip(chip).pins().clone();
        Ok(Self { chip, pins })
    }
}
