//! Collaborators a board talks to but does not own.
//!
//! The CPU and PPU cores outlive every board for as long as a cartridge is
//! loaded, so boards never store them. The enclosing emulator lends them for
//! the duration of a single bus access, clock or reset through [`Host`].

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Interrupt sources sharing the CPU's /IRQ line.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IrqSource: u8 {
        const EXTERNAL = 0b0000_0001;
        const FRAME = 0b0100_0000;
        const DMC = 0b1000_0000;
    }
}

/// Nametable mirroring as seen by the PPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    SingleScreenA,
    SingleScreenB,
    FourScreen,
    /// Explicit CIRAM page for each of the four nametable slots.
    Custom([u8; 4]),
}

impl Mirroring {
    /// CIRAM page backing each nametable slot ($2000, $2400, $2800, $2C00).
    pub fn pages(self) -> [u8; 4] {
        match self {
            Mirroring::Horizontal => [0, 0, 1, 1],
            Mirroring::Vertical => [0, 1, 0, 1],
            Mirroring::SingleScreenA => [0, 0, 0, 0],
            Mirroring::SingleScreenB => [1, 1, 1, 1],
            Mirroring::FourScreen => [0, 1, 2, 3],
            Mirroring::Custom(pages) => pages,
        }
    }

    pub(crate) fn to_byte(self) -> [u8; 5] {
        let tag = match self {
            Mirroring::Horizontal => 0,
            Mirroring::Vertical => 1,
            Mirroring::SingleScreenA => 2,
            Mirroring::SingleScreenB => 3,
            Mirroring::FourScreen => 4,
            Mirroring::Custom(_) => 5,
        };
        let p = self.pages();
        [tag, p[0], p[1], p[2], p[3]]
    }

    pub(crate) fn from_byte(data: [u8; 5]) -> Option<Self> {
        Some(match data[0] {
            0 => Mirroring::Horizontal,
            1 => Mirroring::Vertical,
            2 => Mirroring::SingleScreenA,
            3 => Mirroring::SingleScreenB,
            4 => Mirroring::FourScreen,
            5 => Mirroring::Custom([data[1] & 3, data[2] & 3, data[3] & 3, data[4] & 3]),
            _ => return None,
        })
    }
}

/// The CPU side of a board: the interrupt line.
pub trait Cpu {
    fn set_irq(&mut self, source: IrqSource, asserted: bool);
}

/// The PPU side of a board.
pub trait Ppu {
    fn set_mirroring(&mut self, mirroring: Mirroring);

    /// Flush pending rendering before a CHR bank swap becomes visible.
    fn update(&mut self);
}

/// Borrowed collaborators for one board call.
pub struct Host<'a> {
    pub cpu: &'a mut dyn Cpu,
    pub ppu: &'a mut dyn Ppu,
}

impl<'a> Host<'a> {
    pub fn new(cpu: &'a mut dyn Cpu, ppu: &'a mut dyn Ppu) -> Self {
        Self { cpu, ppu }
    }
}
