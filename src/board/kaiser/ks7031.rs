//! KS-7031 (mapper 305): four switchable 2K PRG slices at $6000-$7FFF and a
//! fixed, reversed run of 2K banks across $8000-$FFFF.

use super::{load_regs, save_regs, Variant, REG_ID};
use crate::board::BoardContext;
use crate::debug_flags;
use crate::host::Host;
use crate::io_map::IoMap;
use crate::memory::SIZE_2K;
use crate::savestate::{ChunkId, StateError, StateLoader, StateSaver};

/// 2K bank behind each slice of $8000-$FFFF.
const FIXED: [usize; 16] = [15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Port {
    Bank,
}

#[derive(Clone, Default)]
pub struct Ks7031 {
    regs: [u8; 4],
    ports: IoMap<Port>,
}

impl Ks7031 {
    fn sync(&self, ctx: &mut BoardContext) {
        for (i, &reg) in self.regs.iter().enumerate() {
            ctx.banks.wrk.swap_bank::<SIZE_2K>(i * SIZE_2K, reg as usize);
        }
    }
}

impl Variant for Ks7031 {
    type Port = Port;

    fn ports(&self) -> &IoMap<Port> {
        &self.ports
    }

    fn reset(&mut self, hard: bool, ctx: &mut BoardContext, _host: &mut Host) {
        if hard {
            self.regs = [0; 4];
        }
        ctx.banks.prg.swap_banks::<SIZE_2K>(0x0000, &FIXED);
        self.sync(ctx);

        self.ports.clear();
        self.ports.map_write(0x8000..=0xFFFF, Port::Bank);
    }

    fn write(&mut self, _port: Port, addr: u16, data: u8, ctx: &mut BoardContext, _host: &mut Host) {
        let slot = ((addr >> 11) & 3) as usize;
        self.regs[slot] = data;
        if debug_flags::mapper() {
            log::trace!("KS-7031 slice {} <- bank {}", slot, data);
        }
        ctx.banks.wrk.swap_bank::<SIZE_2K>(slot * SIZE_2K, data as usize);
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
