use chipsim::*;
use log::info;

/// A microcontroller stand-in driving a 74HC595 whose low bits address a 74HC138
pub struct Board {
    mcu: ChipId,
    shift: Ic74HC595,
    decoder: Ic74HC138,
}

impl Board {
    pub fn new(graph: &mut Graph) -> Result<Self> {
        let mcu = graph.add_chip(
            ChipSpec::new("mcu")
                .outputs(&["DATA", "CLK", "LATCH", "OE", "RESET"])
                .high(&["RESET"]),
        )?;
        let shift = Ic74HC595::new(graph, "shift")?;
        let decoder = Ic74HC138::new(graph, "decoder")?;

        graph.wire_pins(
            shift.chip(),
            mcu,
            &["DS", "SHCP", "STCP", "~OE", "~MR"],
            &["DATA", "CLK", "LATCH", "OE", "RESET"],
        )?;
        graph.wire_pins(
            *decoder.chip(),
            shift.chip(),
            &["A0", "A1", "A2", "E3"],
            &["Q0", "Q1", "Q2", "VCC"],
        )?;

        Ok(Self {
            mcu,
            shift,
            decoder,
        })
    }

    /// Shifts a byte in, most significant bit first, and latches it
    pub fn write(&self, graph: &mut Graph, byte: u8) {
        for bit in (0..8).rev() {
            if byte & (1 << bit) != 0 {
                graph.set_pins(self.mcu, &["CLK"], &["DATA"]);
            } else {
                graph.set_pins(self.mcu, &["CLK", "DATA"], &[]);
            }
            graph.set_pins(self.mcu, &[], &["CLK"]);
        }
        graph.set_pins(self.mcu, &["LATCH"], &[]);
        graph.set_pins(self.mcu, &[], &["LATCH"]);
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut graph = Graph::new();
    let board = Board::new(&mut graph)?;

    for byte in [0b101u8, 0b011, 0b110] {
        board.write(&mut graph, byte);
        info!("Wrote {:#05b}", byte);
        println!("{}", graph.render(board.shift.chip()));
        println!("{}", graph.render(*board.decoder.chip()));
    }

    // a slow clock on the data line, ticked in 1ms steps
    let data = graph.get_pin(board.mcu, "DATA");
    graph.set_oscillating_frequency(data, 250);
    for _ in 0..10 {
        graph.tick(1_000);
    }
    println!("DATA after 10ms: {}", graph.observed(data));

    // a fast one on the low address bit
    graph.set_oscillating_frequency(board.shift.q()[0], 8000);
    println!("{}", graph.render(*board.decoder.chip()));

    Ok(())
}
