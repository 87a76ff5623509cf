//! Test doubles shared by the unit tests.

use std::rc::Rc;

use crate::cartridge::Cartridge;
use crate::host::{Cpu, Host, IrqSource, Mirroring, Ppu};
use crate::memory::SIZE_1K;

#[derive(Debug, Default)]
pub struct RecordingCpu {
    pub edges: Vec<(IrqSource, bool)>,
    asserted: IrqSource,
}

impl RecordingCpu {
    /// Current level of the external IRQ line.
    pub fn line(&self) -> bool {
        self.asserted.contains(IrqSource::EXTERNAL)
    }
}

impl Cpu for RecordingCpu {
    fn set_irq(&mut self, source: IrqSource, asserted: bool) {
        self.edges.push((source, asserted));
        self.asserted.set(source, asserted);
    }
}

#[derive(Debug, Default)]
pub struct RecordingPpu {
    pub mirroring: Vec<Mirroring>,
    pub updates: usize,
}

impl Ppu for RecordingPpu {
    fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring.push(mirroring);
    }

    fn update(&mut self) {
        self.updates += 1;
    }
}

#[derive(Debug, Default)]
pub struct TestHost {
    pub cpu: RecordingCpu,
    pub ppu: RecordingPpu,
}

impl TestHost {
    pub fn host(&mut self) -> Host<'_> {
        Host::new(&mut self.cpu, &mut self.ppu)
    }
}

/// Image where every byte holds the number of the 1K page it sits in.
pub fn paged(size: usize) -> Rc<[u8]> {
    (0..size)
        .map(|i| (i / SIZE_1K) as u8)
        .collect::<Vec<u8>>()
        .into()
}

/// Cartridge with page-numbered PRG and CHR (0 KiB CHR means CHR RAM).
pub fn cartridge(mapper: u16, prg_kb: usize, chr_kb: usize) -> Cartridge {
    let cart = Cartridge::new(mapper, paged(prg_kb * SIZE_1K));
    if chr_kb == 0 {
        cart
    } else {
        cart.with_chr(paged(chr_kb * SIZE_1K))
    }
}
