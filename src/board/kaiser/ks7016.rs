//! KS-7016 (mapper 306): 32K PRG fixed at bank 3, with a selectable 8K PRG
//! slice readable at $6000-$7FFF. The slice is chosen by address lines of
//! writes anywhere in $8000-$FFFF.

use super::{load_regs, save_regs, Variant, REG_ID};
use crate::board::BoardContext;
use crate::debug_flags;
use crate::host::Host;
use crate::io_map::IoMap;
use crate::memory::{Source, SIZE_32K, SIZE_8K};
use crate::savestate::{ChunkId, StateError, StateLoader, StateSaver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Port {
    Slice,
    Select,
}

#[derive(Clone, Default)]
pub struct Ks7016 {
    reg: u8,
    ports: IoMap<Port>,
}

impl Variant for Ks7016 {
    type Port = Port;

    fn ports(&self) -> &IoMap<Port> {
        &self.ports
    }

    fn reset(&mut self, _hard: bool, ctx: &mut BoardContext, _host: &mut Host) {
        self.reg = 8;
        ctx.banks.prg.swap_bank::<SIZE_32K>(0x0000, 3);

        self.ports.clear();
        self.ports.map_read(0x6000..=0x7FFF, Port::Slice);
        self.ports.map_write(0x8000..=0xFFFF, Port::Select);
    }

    fn read(&mut self, _port: Port, addr: u16, ctx: &mut BoardContext, _host: &mut Host) -> Option<u8> {
        ctx.banks
            .peek_source::<SIZE_8K>(Source::Prg, self.reg as usize, (addr & 0x1FFF) as usize)
    }

    fn write(&mut self, _port: Port, addr: u16, _data: u8, _ctx: &mut BoardContext, _host: &mut Host) {
        let mode = addr & 0x30 == 0x30;
        let line = ((addr >> 2) & 0xF) as u8;
        match addr & 0xD943 {
            0xD943 => self.reg = if mode { 0xB } else { line },
            0xD903 => self.reg = if mode { 0x8 | (line & 0x3) } else { 0xB },
            _ => return,
        }
        if debug_flags::mapper() {
            log::trace!("KS-7016 {:04X}: slice {}", addr, self.reg);
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
