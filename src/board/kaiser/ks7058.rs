//! KS-7058 (mapper 171): fixed 32K PRG; writes to the low or high half of
//! each $100 page in $F000-$FFFF select the lower or upper 4K CHR bank.

use super::Variant;
use crate::board::BoardContext;
use crate::debug_flags;
use crate::host::Host;
use crate::io_map::IoMap;
use crate::memory::{SIZE_32K, SIZE_4K};
use crate::savestate::{ChunkId, StateError, StateLoader, StateSaver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Port {
    Chr(u8),
}

#[derive(Clone, Default)]
pub struct Ks7058 {
    ports: IoMap<Port>,
}

impl Variant for Ks7058 {
    type Port = Port;

    fn ports(&self) -> &IoMap<Port> {
        &self.ports
    }

    fn reset(&mut self, hard: bool, ctx: &mut BoardContext, _host: &mut Host) {
        if hard {
            ctx.banks.prg.swap_bank::<SIZE_32K>(0x0000, 0);
        }

        self.ports.clear();
        for page in (0xF000..=0xFF00u16).step_by(0x100) {
            self.ports.map_write(page..=page + 0x7F, Port::Chr(0));
            self.ports.map_write(page + 0x80..=page + 0xFF, Port::Chr(1));
        }
    }

    fn write(&mut self, port: Port, _addr: u16, data: u8, ctx: &mut BoardContext, host: &mut Host) {
        let Port::Chr(half) = port;
        host.ppu.update();
        ctx.banks.chr.swap_bank::<SIZE_4K>(half as usize * SIZE_4K, data as usize);
        if debug_flags::mapper() {
            log::trace!("KS-7058 CHR {} <- {}", half, data);
        }
    }

    // Bank windows carry all of this board's state.
    fn save_state(&self, _saver: &mut StateSaver) -> Result<(), StateError> {
        Ok(())
    }

    fn load_chunk(&mut self, _id: ChunkId, _loader: &mut StateLoader) -> Result<bool, StateError> {
        Ok(false)
    }
}
