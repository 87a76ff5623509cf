//! KS-202 (mapper 56) and KS-7032 (mapper 142).
//!
//! Four 8K PRG windows, eight 1K CHR windows and an up-counting 16-bit IRQ
//! timer loaded one nibble at a time. KS-7032 is the same chip with the
//! $6000-$7FFF window pointed at PRG ROM instead of RAM.

use serde::{Deserialize, Serialize};

use super::{Variant, REG_ID};
use crate::board::BoardContext;
use crate::debug_flags;
use crate::host::{Cpu, Host, IrqSource, Mirroring};
use crate::io_map::IoMap;
use crate::irq::{IrqState, IrqUnit, M2Timer};
use crate::memory::{SIZE_16K, SIZE_1K, SIZE_8K};
use crate::savestate::{ChunkId, StateError, StateLoader, StateSaver};

const IRQ_ID: ChunkId = ChunkId::new(*b"IRQ", 0);

/// Counts up every cycle; past $FFFF it reloads from the latch and fires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ks202Counter {
    pub count: u16,
    pub latch: u16,
    pub ctrl: u8,
}

impl IrqUnit for Ks202Counter {
    fn reset(&mut self, hard: bool) {
        if hard {
            *self = Ks202Counter::default();
        }
    }

    fn clock(&mut self) -> bool {
        if self.count == 0xFFFF {
            self.count = self.latch;
            true
        } else {
            self.count += 1;
            false
        }
    }
}

#[derive(Serialize, Deserialize)]
struct IrqBlock {
    ctrl: u8,
    count: u16,
    latch: u16,
    pending: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Port {
    /// Latch nibble 0-3 at $8000/$9000/$A000/$B000.
    Latch(u8),
    IrqControl,
    IrqAck,
    Select,
    Bank,
    /// KS-7032 PRG ROM at $6000.
    Work,
}

#[derive(Clone)]
pub struct Ks202 {
    rom_work: bool,
    ctrl: u8,
    irq: M2Timer<Ks202Counter>,
    ports: IoMap<Port>,
}

impl Ks202 {
    pub fn new(rom_work: bool) -> Self {
        Ks202 {
            rom_work,
            ctrl: 0,
            irq: M2Timer::new(Ks202Counter::default()),
            ports: IoMap::new(),
        }
    }

    pub fn counter(&self) -> &Ks202Counter {
        &self.irq.unit
    }

    fn write_bank(&mut self, addr: u16, data: u8, ctx: &mut BoardContext, host: &mut Host) {
        let prg = &mut ctx.banks.prg;
        let target = (self.ctrl & 0xF).wrapping_sub(1);
        if target < 3 {
            let window = (target as usize) << 13;
            host.ppu.update();
            let high = prg.bank::<SIZE_8K>(window) & 0x10;
            prg.swap_bank::<SIZE_8K>(window, high | (data & 0x0F) as usize);
        } else if target == 3 {
            ctx.banks.wrk.swap_bank::<SIZE_8K>(0x0000, data as usize);
        }

        match addr & 0xC00 {
            0x000 => {
                let slot = (addr & 3) as usize;
                if slot < 3 {
                    let window = slot << 13;
                    host.ppu.update();
                    let prg = &mut ctx.banks.prg;
                    let low = prg.bank::<SIZE_8K>(window) & 0x0F;
                    prg.swap_bank::<SIZE_8K>(window, low | (data & 0x10) as usize);
                }
            }
            0x800 => {
                let mirroring = if data & 1 != 0 {
                    Mirroring::Vertical
                } else {
                    Mirroring::Horizontal
                };
                ctx.set_mirroring(mirroring, host.ppu);
            }
            0xC00 => {
                host.ppu.update();
                ctx.banks.chr.swap_bank::<SIZE_1K>(((addr & 7) as usize) << 10, data as usize);
            }
            _ => {}
        }
    }
}

impl Variant for Ks202 {
    type Port = Port;

    fn ports(&self) -> &IoMap<Port> {
        &self.ports
    }

    fn reset(&mut self, hard: bool, ctx: &mut BoardContext, host: &mut Host) {
        self.irq.reset(hard);
        if hard {
            self.ctrl = 0;
            host.cpu.set_irq(IrqSource::EXTERNAL, false);
            let last = ctx.banks.prg.last_bank(SIZE_16K);
            ctx.banks.prg.swap_banks::<SIZE_16K>(0x0000, &[0, last]);
            ctx.banks.chr.swap_bank::<SIZE_8K>(0x0000, 0);
            ctx.banks.wrk.swap_bank::<SIZE_8K>(0x0000, 0);
        }

        self.ports.clear();
        self.ports.map_write(0x8000..=0x8FFF, Port::Latch(0));
        self.ports.map_write(0x9000..=0x9FFF, Port::Latch(1));
        self.ports.map_write(0xA000..=0xAFFF, Port::Latch(2));
        self.ports.map_write(0xB000..=0xBFFF, Port::Latch(3));
        self.ports.map_write(0xC000..=0xCFFF, Port::IrqControl);
        self.ports.map_write(0xD000..=0xDFFF, Port::IrqAck);
        self.ports.map_write(0xE000..=0xEFFF, Port::Select);
        self.ports.map_write(0xF000..=0xFFFF, Port::Bank);
        if self.rom_work {
            self.ports.map_read(0x6000..=0x7FFF, Port::Work);
        }
    }

    fn read(&mut self, _port: Port, addr: u16, ctx: &mut BoardContext, _host: &mut Host) -> Option<u8> {
        ctx.banks.read_wrk(addr)
    }

    fn write(&mut self, port: Port, addr: u16, data: u8, ctx: &mut BoardContext, host: &mut Host) {
        if debug_flags::mapper() {
            log::trace!("KS-202 write {:04X} = {:02X} ({:?})", addr, data, port);
        }
        match port {
            Port::Latch(nibble) => {
                let shift = nibble * 4;
                let unit = &mut self.irq.unit;
                unit.latch = (unit.latch & !(0xF << shift)) | (((data & 0xF) as u16) << shift);
            }
            Port::IrqControl => {
                self.irq.unit.ctrl = data;
                if self.irq.connect(data) {
                    self.irq.unit.count = self.irq.unit.latch;
                }
                self.irq.clear_irq(host.cpu);
            }
            Port::IrqAck => self.irq.clear_irq(host.cpu),
            Port::Select => self.ctrl = data,
            Port::Bank => self.write_bank(addr, data, ctx, host),
            Port::Work => {}
        }
    }

    fn clock(&mut self, cpu: &mut dyn Cpu) {
        self.irq.clock(cpu);
    }

    fn vsync(&mut self) {
        self.irq.vsync();
    }

    fn irq_state(&self) -> Option<IrqState> {
        Some(self.irq.state())
    }

    fn save_state(&self, saver: &mut StateSaver) -> Result<(), StateError> {
        saver.begin(REG_ID).write8(self.ctrl).end();
        let unit = &self.irq.unit;
        saver
            .begin(IRQ_ID)
            .write_block(&IrqBlock {
                ctrl: unit.ctrl,
                count: unit.count,
                latch: unit.latch,
                pending: self.irq.is_pending() as u8,
            })?
            .end();
        Ok(())
    }

    fn load_chunk(&mut self, id: ChunkId, loader: &mut StateLoader) -> Result<bool, StateError> {
        match id {
            REG_ID => self.ctrl = loader.read8()?,
            IRQ_ID => {
                let block: IrqBlock = loader.read_block()?;
                let unit = &mut self.irq.unit;
                unit.ctrl = block.ctrl;
                unit.count = block.count;
                unit.latch = block.latch;
                let connected = block.ctrl & 0xF != 0;
                self.irq.restore(connected, block.pending != 0);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn restore(&mut self, _ctx: &mut BoardContext, host: &mut Host) {
        self.irq.sync_line(host.cpu);
    }
}
