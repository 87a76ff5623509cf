//! Cartridge board layer for a NES emulator: address dispatch, bank
//! switching, cycle-driven IRQ timers and chunked save states, with the
//! Kaiser board family built on top.

pub mod board;
pub mod cartridge;
pub mod debug_flags;
pub mod host;
pub mod io_map;
pub mod irq;
pub mod memory;
pub mod savestate;
pub mod sram;

#[cfg(test)]
mod testing;

pub use board::{Board, BoardError, BoardKind};
pub use cartridge::Cartridge;
pub use host::{Cpu, Host, IrqSource, Mirroring, Ppu};
