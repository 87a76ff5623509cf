//! Cartridge boards.
//!
//! A [`Board`] pairs the state every board shares ([`BoardContext`]: bank
//! windows and the mirroring last sent to the PPU) with one variant's
//! registers. The enclosing bus forwards CPU accesses through `peek`/`poke`,
//! which consult the variant's dispatch table first and fall back to the
//! banked memory windows. Nothing is mapped until the first `reset`.

pub mod kaiser;

use thiserror::Error;

use crate::cartridge::Cartridge;
use crate::debug_flags;
use crate::host::{Cpu, Host, Mirroring, Ppu};
use crate::irq::IrqState;
use crate::memory::{Banks, Source, SIZE_8K};
use crate::savestate::{ChunkId, StateError, StateLoader, StateSaver};

use self::kaiser::Kaiser;

pub const MIRRORING_ID: ChunkId = ChunkId::new(*b"MIR", 0);

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("mapper {0} is not a supported board")]
    UnsupportedMapper(u16),
    #[error("cartridge has no PRG ROM")]
    MissingPrg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardKind {
    Ks202,
    Ks7032,
    Ks7016,
    Ks7022,
    Ks7031,
    Ks7037,
    Ks7057,
    Ks7058,
}

impl BoardKind {
    pub const ALL: [BoardKind; 8] = [
        BoardKind::Ks202,
        BoardKind::Ks7032,
        BoardKind::Ks7016,
        BoardKind::Ks7022,
        BoardKind::Ks7031,
        BoardKind::Ks7037,
        BoardKind::Ks7057,
        BoardKind::Ks7058,
    ];

    pub fn from_mapper(mapper: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.mapper() == mapper)
    }

    pub fn mapper(self) -> u16 {
        match self {
            BoardKind::Ks202 => 56,
            BoardKind::Ks7032 => 142,
            BoardKind::Ks7016 => 306,
            BoardKind::Ks7022 => 175,
            BoardKind::Ks7031 => 305,
            BoardKind::Ks7037 => 307,
            BoardKind::Ks7057 => 302,
            BoardKind::Ks7058 => 171,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BoardKind::Ks202 => "KS-202",
            BoardKind::Ks7032 => "KS-7032",
            BoardKind::Ks7016 => "KS-7016",
            BoardKind::Ks7022 => "KS-7022",
            BoardKind::Ks7031 => "KS-7031",
            BoardKind::Ks7037 => "KS-7037",
            BoardKind::Ks7057 => "KS-7057",
            BoardKind::Ks7058 => "KS-7058",
        }
    }

    /// Outer chunk tag of this board's save state.
    pub fn family_id(self) -> ChunkId {
        let tag = match self {
            BoardKind::Ks202 => *b"K02",
            BoardKind::Ks7032 => *b"K32",
            BoardKind::Ks7016 => *b"K16",
            BoardKind::Ks7022 => *b"K22",
            BoardKind::Ks7031 => *b"K31",
            BoardKind::Ks7037 => *b"K37",
            BoardKind::Ks7057 => *b"K57",
            BoardKind::Ks7058 => *b"K58",
        };
        ChunkId::new(tag, 0)
    }

    fn wram_size(self) -> usize {
        match self {
            BoardKind::Ks202 | BoardKind::Ks7037 => SIZE_8K,
            _ => 0,
        }
    }

    /// Storage behind $6000-$7FFF.
    fn work_source(self) -> Source {
        match self {
            BoardKind::Ks7032 | BoardKind::Ks7016 | BoardKind::Ks7031 | BoardKind::Ks7057 => Source::Prg,
            _ => Source::Wram,
        }
    }

    fn battery_capable(self) -> bool {
        matches!(self, BoardKind::Ks202 | BoardKind::Ks7037)
    }
}

impl std::fmt::Display for BoardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (mapper {})", self.name(), self.mapper())
    }
}

/// State shared by every variant.
#[derive(Debug, Clone)]
pub struct BoardContext {
    pub banks: Banks,
    header_mirroring: Mirroring,
    mirroring: Option<Mirroring>,
}

impl BoardContext {
    fn new(banks: Banks, header_mirroring: Mirroring) -> Self {
        BoardContext {
            banks,
            header_mirroring,
            mirroring: None,
        }
    }

    /// Forward a mirroring change to the PPU, once per distinct value.
    pub fn set_mirroring(&mut self, mirroring: Mirroring, ppu: &mut dyn Ppu) {
        if self.mirroring == Some(mirroring) {
            return;
        }
        if debug_flags::mapper() {
            log::trace!("mirroring -> {:?}", mirroring);
        }
        self.mirroring = Some(mirroring);
        ppu.set_mirroring(mirroring);
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mirroring.unwrap_or(self.header_mirroring)
    }

    /// Default CPU read: work space, then PRG space, else open bus.
    pub fn read(&self, addr: u16) -> Option<u8> {
        match addr {
            0x6000..=0x7FFF => self.banks.read_wrk(addr),
            0x8000..=0xFFFF => self.banks.read_prg(addr),
            _ => None,
        }
    }

    pub fn write(&mut self, addr: u16, data: u8) -> bool {
        match addr {
            0x6000..=0x7FFF => self.banks.write_wrk(addr, data),
            0x8000..=0xFFFF => self.banks.write_prg(addr, data),
            _ => false,
        }
    }
}

pub struct Board {
    kind: BoardKind,
    battery: bool,
    ctx: BoardContext,
    variant: Kaiser,
}

impl Board {
    /// Build a board over a cartridge image. Call `reset(true, ..)` before use.
    pub fn new(kind: BoardKind, cart: &Cartridge) -> Result<Self, BoardError> {
        if cart.prg.is_empty() {
            return Err(BoardError::MissingPrg);
        }
        let wram_size = cart.wram_size.unwrap_or_else(|| kind.wram_size());
        let banks = Banks::new(
            cart.prg.clone(),
            cart.chr.clone(),
            SIZE_8K,
            wram_size,
            kind.work_source(),
        );
        log::debug!(
            "board: {} PRG {}K CHR {} WRAM {}K{}",
            kind,
            cart.prg.len() / 1024,
            cart.chr
                .as_ref()
                .map_or_else(|| "RAM".to_string(), |chr| format!("{}K", chr.len() / 1024)),
            wram_size / 1024,
            if cart.battery { " (battery)" } else { "" }
        );

        Ok(Board {
            kind,
            battery: cart.battery,
            ctx: BoardContext::new(banks, cart.mirroring),
            variant: Kaiser::new(kind),
        })
    }

    pub fn from_cartridge(cart: &Cartridge) -> Result<Self, BoardError> {
        let kind = BoardKind::from_mapper(cart.mapper).ok_or(BoardError::UnsupportedMapper(cart.mapper))?;
        Self::new(kind, cart)
    }

    /// Rebuild the dispatch table; hard reset also restores power-on registers.
    pub fn reset(&mut self, hard: bool, host: &mut Host) {
        log::debug!("board: {} {} reset", self.kind.name(), if hard { "hard" } else { "soft" });
        if hard {
            self.ctx.mirroring = None;
            let header = self.ctx.header_mirroring;
            self.ctx.set_mirroring(header, host.ppu);
        }
        self.variant.reset(hard, &mut self.ctx, host);
    }

    pub fn peek(&mut self, addr: u16, host: &mut Host) -> Option<u8> {
        self.variant.peek(addr, &mut self.ctx, host)
    }

    /// CPU write. Returns false when nothing on the board took the byte.
    pub fn poke(&mut self, addr: u16, data: u8, host: &mut Host) -> bool {
        self.variant.poke(addr, data, &mut self.ctx, host)
    }

    pub fn read_chr(&self, addr: u16) -> Option<u8> {
        self.ctx.banks.read_chr(addr)
    }

    pub fn write_chr(&mut self, addr: u16, data: u8) -> bool {
        self.ctx.banks.write_chr(addr, data)
    }

    /// One CPU cycle.
    pub fn clock(&mut self, cpu: &mut dyn Cpu) {
        self.variant.clock(cpu);
    }

    /// End of frame.
    pub fn vsync(&mut self) {
        self.variant.vsync();
    }

    pub fn save_state(&self, saver: &mut StateSaver) -> Result<(), StateError> {
        saver.begin(self.kind.family_id());
        self.ctx.banks.save_state(saver);
        if let Some(mirroring) = self.ctx.mirroring {
            saver.begin(MIRRORING_ID).write(&mirroring.to_byte()).end();
        }
        self.variant.save_state(saver)?;
        saver.end();
        Ok(())
    }

    /// Apply the next chunk if it is this board's family chunk.
    ///
    /// Returns true when state was applied. A foreign family is skipped; a
    /// corrupt one leaves the board exactly as it was before the call.
    pub fn load_state(&mut self, loader: &mut StateLoader, host: &mut Host) -> bool {
        let depth = loader.depth();
        let family = match loader.begin() {
            Ok(Some(id)) => id,
            Ok(None) => return false,
            Err(e) => {
                log::warn!("{}: unreadable state: {}", self.kind.name(), e);
                return false;
            }
        };
        if family != self.kind.family_id() {
            log::debug!("{}: skipping state for family {}", self.kind.name(), family);
            loader.end();
            return false;
        }

        let snapshot = (self.ctx.clone(), self.variant.clone());
        match self.load_family(loader) {
            Ok(()) => {
                loader.unwind(depth);
                host.ppu.set_mirroring(self.ctx.mirroring());
                self.variant.restore(&mut self.ctx, host);
                log::debug!("{}: state loaded", self.kind.name());
                true
            }
            Err(e) => {
                log::warn!("{}: corrupt state, keeping current: {}", self.kind.name(), e);
                (self.ctx, self.variant) = snapshot;
                loader.unwind(depth);
                false
            }
        }
    }

    fn load_family(&mut self, loader: &mut StateLoader) -> Result<(), StateError> {
        while let Some(id) = loader.begin()? {
            if id == MIRRORING_ID {
                let mirroring =
                    Mirroring::from_byte(loader.read::<5>()?).ok_or(StateError::Invalid("mirroring"))?;
                self.ctx.mirroring = Some(mirroring);
            } else if !self.ctx.banks.load_chunk(id, loader)? && !self.variant.load_chunk(id, loader)? {
                if debug_flags::state() {
                    log::trace!("{}: skipping unknown chunk {}", self.kind.name(), id);
                }
            }
            loader.end();
        }
        Ok(())
    }

    /// Work RAM worth persisting, if the cartridge has a battery.
    pub fn battery_ram(&self) -> Option<&[u8]> {
        let wram = self.ctx.banks.wram();
        (self.battery && self.kind.battery_capable() && !wram.is_empty()).then_some(wram)
    }

    pub fn load_battery_ram(&mut self, data: &[u8]) -> bool {
        if !self.battery || !self.kind.battery_capable() {
            return false;
        }
        let wram = self.ctx.banks.wram_mut();
        if data.len() != wram.len() {
            log::warn!(
                "{}: battery RAM is {} bytes, expected {}; loading what fits",
                self.kind.name(),
                data.len(),
                wram.len()
            );
        }
        let n = data.len().min(wram.len());
        wram[..n].copy_from_slice(&data[..n]);
        n > 0
    }

    pub fn kind(&self) -> BoardKind {
        self.kind
    }

    pub fn family_id(&self) -> ChunkId {
        self.kind.family_id()
    }

    pub fn banks(&self) -> &Banks {
        &self.ctx.banks
    }

    pub fn mirroring(&self) -> Mirroring {
        self.ctx.mirroring()
    }

    /// Timer status, for boards that have one.
    pub fn irq_state(&self) -> Option<IrqState> {
        self.variant.irq_state()
    }

    /// Dispatch bindings installed by the last reset.
    pub fn bindings(&self) -> usize {
        self.variant.bindings()
    }
}

#[cfg(test)]
mod tests;
