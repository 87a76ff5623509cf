//! KS-7057 (mapper 302): eight 2K PRG slots across $6000-$9FFF, each built
//! from two nibble writes, with $A000-$FFFF fixed to the last 24K.

use super::{load_regs, save_regs, Variant, REG_ID};
use crate::board::BoardContext;
use crate::debug_flags;
use crate::host::{Host, Mirroring};
use crate::io_map::IoMap;
use crate::memory::{SIZE_2K, SIZE_8K};
use crate::savestate::{ChunkId, StateError, StateLoader, StateSaver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Port {
    Mirroring,
    Nibble,
}

#[derive(Clone, Default)]
pub struct Ks7057 {
    regs: [u8; 8],
    ports: IoMap<Port>,
}

impl Ks7057 {
    fn sync(&self, ctx: &mut BoardContext) {
        let banks = &mut ctx.banks;
        for (i, &reg) in self.regs[4..].iter().enumerate() {
            banks.wrk.swap_bank::<SIZE_2K>(i * SIZE_2K, reg as usize);
        }
        for (i, &reg) in self.regs[..4].iter().enumerate() {
            banks.prg.swap_bank::<SIZE_2K>(i * SIZE_2K, reg as usize);
        }
    }
}

impl Variant for Ks7057 {
    type Port = Port;

    fn ports(&self) -> &IoMap<Port> {
        &self.ports
    }

    fn reset(&mut self, hard: bool, ctx: &mut BoardContext, _host: &mut Host) {
        if hard {
            self.regs = [0; 8];
            let last = ctx.banks.prg.last_bank(SIZE_8K);
            let tail = [last.saturating_sub(2), last.saturating_sub(1), last];
            ctx.banks.prg.swap_banks::<SIZE_8K>(0x2000, &tail);
        }
        self.sync(ctx);

        self.ports.clear();
        self.ports.map_write(0x8000..=0x9FFF, Port::Mirroring);
        self.ports.map_write(0xB000..=0xE003, Port::Nibble);
    }

    fn write(&mut self, port: Port, addr: u16, data: u8, ctx: &mut BoardContext, host: &mut Host) {
        match port {
            Port::Mirroring => {
                let mirroring = if data & 1 != 0 {
                    Mirroring::Horizontal
                } else {
                    Mirroring::Vertical
                };
                ctx.set_mirroring(mirroring, host.ppu);
            }
            Port::Nibble => {
                let addr = addr & 0xF003;
                let r = (((addr >> 12) - 0xB) * 2 + ((addr >> 1) & 1)) as usize;
                let reg = &mut self.regs[r];
                *reg = if addr & 1 == 0 {
                    (*reg & 0xF0) | (data & 0x0F)
                } else {
                    (*reg & 0x0F) | (data << 4)
                };
                if debug_flags::mapper() {
                    log::trace!("KS-7057 reg {} = {:02X}", r, *reg);
                }
                self.sync(ctx);
            }
        }
    }

    fn save_state(&self, saver: &mut StateSaver) -> Result<(), StateError> {
        save_regs(saver, &self.regs);
        Ok(())
    }

    fn load_chunk(&mut self, id: ChunkId, loader: &mut StateLoader) -> Result<bool, StateError> {
        if id != REG_ID {
            return Ok(false);
        }
        load_regs(loader, &mut self.regs)?;
        Ok(true)
    }

    fn restore(&mut self, ctx: &mut BoardContext, _host: &mut Host) {
        self.sync(ctx);
    }
}
