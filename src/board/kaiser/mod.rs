//! Kaiser boards (KS-xxxx), mostly Famicom Disk System conversions.
//!
//! Every variant keeps its own registers and a dispatch table keyed by a
//! private port enum. The enum here only routes calls to the active variant.

mod ks202;
mod ks7016;
mod ks7022;
mod ks7031;
mod ks7037;
mod ks7057;
mod ks7058;

pub use self::ks202::{Ks202, Ks202Counter};
pub use self::ks7016::Ks7016;
pub use self::ks7022::Ks7022;
pub use self::ks7031::Ks7031;
pub use self::ks7037::Ks7037;
pub use self::ks7057::Ks7057;
pub use self::ks7058::Ks7058;

use crate::board::{BoardContext, BoardKind};
use crate::host::{Cpu, Host};
use crate::io_map::IoMap;
use crate::irq::IrqState;
use crate::savestate::{ChunkId, StateError, StateLoader, StateSaver};

pub(crate) const REG_ID: ChunkId = ChunkId::new(*b"REG", 0);

/// What a board variant plugs into the shared board shell.
pub(crate) trait Variant {
    type Port: Copy;

    fn ports(&self) -> &IoMap<Self::Port>;

    /// Clear and rebuild the dispatch table, then set up registers and banks.
    fn reset(&mut self, hard: bool, ctx: &mut BoardContext, host: &mut Host);

    /// Claimed read. Ports without special read behavior see banked memory.
    fn read(&mut self, _port: Self::Port, addr: u16, ctx: &mut BoardContext, _host: &mut Host) -> Option<u8> {
        ctx.read(addr)
    }

    fn write(&mut self, port: Self::Port, addr: u16, data: u8, ctx: &mut BoardContext, host: &mut Host);

    fn clock(&mut self, _cpu: &mut dyn Cpu) {}

    fn vsync(&mut self) {}

    fn irq_state(&self) -> Option<IrqState> {
        None
    }

    fn save_state(&self, saver: &mut StateSaver) -> Result<(), StateError>;

    /// Returns `Ok(false)` for chunk ids the variant does not own.
    fn load_chunk(&mut self, id: ChunkId, loader: &mut StateLoader) -> Result<bool, StateError>;

    /// Re-derive host-visible side effects after a successful load.
    fn restore(&mut self, _ctx: &mut BoardContext, _host: &mut Host) {}
}

#[derive(Clone)]
pub enum Kaiser {
    Ks202(Ks202),
    Ks7016(Ks7016),
    Ks7022(Ks7022),
    Ks7031(Ks7031),
    Ks7037(Ks7037),
    Ks7057(Ks7057),
    Ks7058(Ks7058),
}

macro_rules! dispatch {
    ($self:expr, $board:ident => $body:expr) => {
        match $self {
            Kaiser::Ks202($board) => $body,
            Kaiser::Ks7016($board) => $body,
            Kaiser::Ks7022($board) => $body,
            Kaiser::Ks7031($board) => $body,
            Kaiser::Ks7037($board) => $body,
            Kaiser::Ks7057($board) => $body,
            Kaiser::Ks7058($board) => $body,
        }
    };
}

fn peek<V: Variant>(board: &mut V, addr: u16, ctx: &mut BoardContext, host: &mut Host) -> Option<u8> {
    match board.ports().read_port(addr) {
        Some(port) => board.read(port, addr, ctx, host),
        None => ctx.read(addr),
    }
}

fn poke<V: Variant>(board: &mut V, addr: u16, data: u8, ctx: &mut BoardContext, host: &mut Host) -> bool {
    match board.ports().write_port(addr) {
        Some(port) => {
            board.write(port, addr, data, ctx, host);
            true
        }
        None => ctx.write(addr, data),
    }
}

impl Kaiser {
    pub fn new(kind: BoardKind) -> Self {
        match kind {
            BoardKind::Ks202 => Kaiser::Ks202(Ks202::new(false)),
            BoardKind::Ks7032 => Kaiser::Ks202(Ks202::new(true)),
            BoardKind::Ks7016 => Kaiser::Ks7016(Ks7016::default()),
            BoardKind::Ks7022 => Kaiser::Ks7022(Ks7022::default()),
            BoardKind::Ks7031 => Kaiser::Ks7031(Ks7031::default()),
            BoardKind::Ks7037 => Kaiser::Ks7037(Ks7037::default()),
            BoardKind::Ks7057 => Kaiser::Ks7057(Ks7057::default()),
            BoardKind::Ks7058 => Kaiser::Ks7058(Ks7058::default()),
        }
    }

    pub fn reset(&mut self, hard: bool, ctx: &mut BoardContext, host: &mut Host) {
        dispatch!(self, b => b.reset(hard, ctx, host))
    }

    pub fn peek(&mut self, addr: u16, ctx: &mut BoardContext, host: &mut Host) -> Option<u8> {
        dispatch!(self, b => peek(b, addr, ctx, host))
    }

    pub fn poke(&mut self, addr: u16, data: u8, ctx: &mut BoardContext, host: &mut Host) -> bool {
        dispatch!(self, b => poke(b, addr, data, ctx, host))
    }

    pub fn clock(&mut self, cpu: &mut dyn Cpu) {
        dispatch!(self, b => b.clock(cpu))
    }

    pub fn vsync(&mut self) {
        dispatch!(self, b => b.vsync())
    }

    pub fn irq_state(&self) -> Option<IrqState> {
        dispatch!(self, b => b.irq_state())
    }

    pub fn bindings(&self) -> usize {
        dispatch!(self, b => b.ports().bindings())
    }

    pub fn save_state(&self, saver: &mut StateSaver) -> Result<(), StateError> {
        dispatch!(self, b => b.save_state(saver))
    }

    pub fn load_chunk(&mut self, id: ChunkId, loader: &mut StateLoader) -> Result<bool, StateError> {
        dispatch!(self, b => b.load_chunk(id, loader))
    }

    pub fn restore(&mut self, ctx: &mut BoardContext, host: &mut Host) {
        dispatch!(self, b => b.restore(ctx, host))
    }
}

/// Shared REG chunk handling for variants whose registers are a byte array.
pub(crate) fn save_regs(saver: &mut StateSaver, regs: &[u8]) {
    saver.begin(REG_ID).write(regs).end();
}

pub(crate) fn load_regs(loader: &mut StateLoader, regs: &mut [u8]) -> Result<(), StateError> {
    let data = loader.read_rest();
    if data.len() != regs.len() {
        return Err(StateError::Invalid("register block size"));
    }
    regs.copy_from_slice(data);
    Ok(())
}
