//! KS-7022 (mapper 175). The bank register written at $A000 only takes
//! effect when the CPU fetches the reset vector low byte at $FFFC.

use super::{load_regs, save_regs, Variant, REG_ID};
use crate::board::BoardContext;
use crate::debug_flags;
use crate::host::{Host, Mirroring};
use crate::io_map::IoMap;
use crate::memory::{SIZE_16K, SIZE_8K};
use crate::savestate::{ChunkId, StateError, StateLoader, StateSaver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Port {
    Mirroring,
    Bank,
    Latch,
}

#[derive(Clone, Default)]
pub struct Ks7022 {
    reg: u8,
    ports: IoMap<Port>,
}

impl Variant for Ks7022 {
    type Port = Port;

    fn ports(&self) -> &IoMap<Port> {
        &self.ports
    }

    fn reset(&mut self, hard: bool, ctx: &mut BoardContext, _host: &mut Host) {
        self.reg = 0;
        if hard {
            ctx.banks.prg.swap_banks::<SIZE_16K>(0x0000, &[0, 0]);
        }

        self.ports.clear();
        self.ports.map_write(0x8000, Port::Mirroring);
        self.ports.map_write(0xA000, Port::Bank);
        self.ports.map_read(0xFFFC, Port::Latch);
    }

    fn read(&mut self, _port: Port, addr: u16, ctx: &mut BoardContext, host: &mut Host) -> Option<u8> {
        let bank = self.reg as usize;
        host.ppu.update();
        ctx.banks.chr.swap_bank::<SIZE_8K>(0x0000, bank);
        ctx.banks.prg.swap_banks::<SIZE_16K>(0x0000, &[bank, bank]);
        if debug_flags::mapper() {
            log::trace!("KS-7022 latched bank {}", bank);
        }
        ctx.banks.read_prg(addr)
    }

    fn write(&mut self, port: Port, _addr: u16, data: u8, ctx: &mut BoardContext, host: &mut Host) {
        match port {
            Port::Mirroring => {
                let mirroring = if data & 0x4 != 0 {
                    Mirroring::Horizontal
                } else {
                    Mirroring::Vertical
                };
                ctx.set_mirroring(mirroring, host.ppu);
            }
            Port::Bank => self.reg = data & 0xF,
            Port::Latch => {}
        }
    }

    fn save_state(&self, saver: &mut StateSaver) -> Result<(), StateError> {
        save_regs(saver, &[self.reg]);
        Ok(())
    }

    fn load_chunk(&mut self, id: ChunkId, loader: &mut StateLoader) -> Result<bool, StateError> {
        if id != REG_ID {
            return Ok(false);
        }
        let mut regs = [0];
        load_regs(loader, &mut regs)?;
        self.reg = regs[0] & 0xF;
        Ok(true)
    }
}
