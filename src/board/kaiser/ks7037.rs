//! KS-7037 (mapper 307).
//!
//! An index/data register pair at $8000-$9FFF drives a mixed layout of PRG
//! ROM and two 4K halves of work RAM:
//!
//! | Range       | Contents            |
//! |-------------|---------------------|
//! | $6000-$6FFF | WRAM 4K bank 0      |
//! | $7000-$7FFF | PRG 4K bank 15      |
//! | $8000-$9FFF | PRG 8K `regs[6]`    |
//! | $A000-$AFFF | WRAM 4K bank 1      |
//! | $B000-$BFFF | PRG 4K bank 28      |
//! | $C000-$DFFF | PRG 8K `regs[7]`    |
//! | $E000-$FFFF | PRG last 8K         |
//!
//! Registers 2-5 each pick the CIRAM page of one nametable.

use super::{load_regs, save_regs, Variant, REG_ID};
use crate::board::BoardContext;
use crate::debug_flags;
use crate::host::{Host, Mirroring};
use crate::io_map::IoMap;
use crate::memory::{Source, SIZE_4K, SIZE_8K};
use crate::savestate::{ChunkId, StateError, StateLoader, StateSaver};

const INDEX_ID: ChunkId = ChunkId::new(*b"IDX", 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Port {
    Register,
}

#[derive(Clone, Default)]
pub struct Ks7037 {
    index: u8,
    regs: [u8; 8],
    ports: IoMap<Port>,
}

impl Ks7037 {
    fn sync(&self, ctx: &mut BoardContext, host: &mut Host) {
        let banks = &mut ctx.banks;
        banks.wrk.swap_bank_from::<SIZE_4K>(0x0000, Source::Wram, 0);
        banks.wrk.swap_bank_from::<SIZE_4K>(0x1000, Source::Prg, 15);
        banks.prg.swap_bank::<SIZE_8K>(0x0000, self.regs[6] as usize);
        banks.prg.swap_bank_from::<SIZE_4K>(0x2000, Source::Wram, 1);
        banks.prg.swap_bank::<SIZE_4K>(0x3000, 28);
        banks.prg.swap_bank::<SIZE_8K>(0x4000, self.regs[7] as usize);
        let last = banks.prg.last_bank(SIZE_8K);
        banks.prg.swap_bank::<SIZE_8K>(0x6000, last);

        let r = &self.regs;
        let pages = [r[2] & 1, r[4] & 1, r[3] & 1, r[5] & 1];
        ctx.set_mirroring(Mirroring::Custom(pages), host.ppu);
    }
}

impl Variant for Ks7037 {
    type Port = Port;

    fn ports(&self) -> &IoMap<Port> {
        &self.ports
    }

    fn reset(&mut self, hard: bool, ctx: &mut BoardContext, host: &mut Host) {
        if hard {
            self.index = 0;
            self.regs = [0; 8];
        }
        self.sync(ctx, host);

        self.ports.clear();
        self.ports.map_write(0x8000..=0x9FFF, Port::Register);
    }

    fn write(&mut self, _port: Port, addr: u16, data: u8, ctx: &mut BoardContext, host: &mut Host) {
        if addr & 1 == 0 {
            self.index = data & 7;
            return;
        }
        self.regs[self.index as usize] = data;
        if debug_flags::mapper() {
            log::trace!("KS-7037 reg {} = {:02X}", self.index, data);
        }
        self.sync(ctx, host);
    }

    fn save_state(&self, saver: &mut StateSaver) -> Result<(), StateError> {
        saver.begin(INDEX_ID).write8(self.index).end();
        save_regs(saver, &self.regs);
        Ok(())
    }

    fn load_chunk(&mut self, id: ChunkId, loader: &mut StateLoader) -> Result<bool, StateError> {
        match id {
            INDEX_ID => self.index = loader.read8()? & 7,
            REG_ID => load_regs(loader, &mut self.regs)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}
