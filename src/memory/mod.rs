//! Bank manager: swappable windows over cartridge storage.
//!
//! Cartridge storage lives in a small arena (PRG ROM, CHR ROM or RAM, work
//! RAM). Each CPU/PPU space is a table of 1K pages; a page records which
//! arena source it reads from and the physical byte offset inside it. Boards
//! never hold pointers into storage, only bank indices.

use std::rc::Rc;

use crate::debug_flags;
use crate::savestate::{ChunkId, StateError, StateLoader, StateSaver};

pub const SIZE_1K: usize = 0x0400;
pub const SIZE_2K: usize = 0x0800;
pub const SIZE_4K: usize = 0x1000;
pub const SIZE_8K: usize = 0x2000;
pub const SIZE_16K: usize = 0x4000;
pub const SIZE_32K: usize = 0x8000;

const PAGE: usize = SIZE_1K;

pub const PRG_ID: ChunkId = ChunkId::new(*b"PRG", 0);
pub const CHR_ID: ChunkId = ChunkId::new(*b"CHR", 0);
pub const WRK_ID: ChunkId = ChunkId::new(*b"WRK", 0);
pub const WRAM_ID: ChunkId = ChunkId::new(*b"WRM", 0);
pub const CHR_RAM_ID: ChunkId = ChunkId::new(*b"CRM", 0);

/// Rejects unsupported window sizes when the swap is monomorphized.
struct WindowSize<const SIZE: usize>;

impl<const SIZE: usize> WindowSize<SIZE> {
    const VALID: () = assert!(
        SIZE.is_power_of_two() && SIZE >= SIZE_1K && SIZE <= SIZE_32K,
        "bank window size must be a power of two between 1K and 32K"
    );
}

/// Arena slot a window reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Prg,
    Chr,
    Wram,
}

impl Source {
    fn index(self) -> usize {
        match self {
            Source::Prg => 0,
            Source::Chr => 1,
            Source::Wram => 2,
        }
    }

    fn from_index(i: u8) -> Option<Self> {
        match i {
            0 => Some(Source::Prg),
            1 => Some(Source::Chr),
            2 => Some(Source::Wram),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Storage {
    Rom(Rc<[u8]>),
    Ram(Vec<u8>),
}

impl Storage {
    fn bytes(&self) -> &[u8] {
        match self {
            Storage::Rom(rom) => rom,
            Storage::Ram(ram) => ram,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Page {
    source: Source,
    offset: usize,
}

/// One logical address space (PRG, CHR or WRK) cut into 1K pages.
#[derive(Debug, Clone)]
pub struct BankSpace {
    name: &'static str,
    base: u16,
    pages: Vec<Option<Page>>,
    default_source: Source,
    lens: [usize; 3],
}

impl BankSpace {
    fn new(name: &'static str, base: u16, span: usize, default_source: Source, lens: [usize; 3]) -> Self {
        BankSpace {
            name,
            base,
            pages: vec![None; span / PAGE],
            default_source,
            lens,
        }
    }

    pub fn span(&self) -> usize {
        self.pages.len() * PAGE
    }

    pub fn default_source(&self) -> Source {
        self.default_source
    }

    /// Number of `size`-byte banks the source holds (at least one when non-empty).
    pub fn bank_count(&self, source: Source, size: usize) -> usize {
        let len = self.lens[source.index()];
        if len == 0 {
            0
        } else {
            (len / size).max(1)
        }
    }

    /// Highest `size`-byte bank of the default source.
    pub fn last_bank(&self, size: usize) -> usize {
        self.bank_count(self.default_source, size).saturating_sub(1)
    }

    /// Point the window at `window` (space-relative) to `bank` of the default source.
    pub fn swap_bank<const SIZE: usize>(&mut self, window: usize, bank: usize) {
        self.swap_bank_from::<SIZE>(window, self.default_source, bank);
    }

    /// Point the window at `window` to `bank` of an explicit source.
    pub fn swap_bank_from<const SIZE: usize>(&mut self, window: usize, source: Source, bank: usize) {
        let () = WindowSize::<SIZE>::VALID;
        assert!(
            window % SIZE == 0 && window + SIZE <= self.span(),
            "{} window {:#06X} is not a {}K slot",
            self.name,
            window,
            SIZE / SIZE_1K
        );

        let len = self.lens[source.index()];
        let first = window / PAGE;
        if len == 0 {
            self.pages[first..first + SIZE / PAGE].fill(None);
            return;
        }

        let bank = bank % self.bank_count(source, SIZE);
        let base = bank * SIZE;
        for (i, page) in self.pages[first..first + SIZE / PAGE].iter_mut().enumerate() {
            // Sources smaller than the window repeat inside it.
            let offset = (base + i * PAGE) % len;
            *page = Some(Page { source, offset });
        }

        if debug_flags::mapper() {
            log::trace!(
                "{} {}K @{:#06X} <- {:?} bank {}",
                self.name,
                SIZE / SIZE_1K,
                window,
                source,
                bank
            );
        }
    }

    /// Swap consecutive `SIZE` windows starting at `window`.
    pub fn swap_banks<const SIZE: usize>(&mut self, window: usize, banks: &[usize]) {
        for (i, &bank) in banks.iter().enumerate() {
            self.swap_bank::<SIZE>(window + i * SIZE, bank);
        }
    }

    /// Physical bank (in `SIZE` units) currently installed at `window`.
    pub fn bank<const SIZE: usize>(&self, window: usize) -> usize {
        let () = WindowSize::<SIZE>::VALID;
        self.pages
            .get(window / PAGE)
            .copied()
            .flatten()
            .map_or(0, |page| page.offset / SIZE)
    }

    /// Source currently installed at `window`, `None` when unmapped.
    pub fn source(&self, window: usize) -> Option<Source> {
        self.pages.get(window / PAGE).copied().flatten().map(|p| p.source)
    }

    fn resolve(&self, addr: u16) -> Option<(Source, usize)> {
        let rel = addr.wrapping_sub(self.base) as usize;
        let page = (*self.pages.get(rel / PAGE)?)?;
        // Sources under 1K or with a partial last page wrap mid-page.
        let len = self.lens[page.source.index()];
        Some((page.source, (page.offset + rel % PAGE) % len))
    }

    fn save(&self, saver: &mut StateSaver, id: ChunkId) {
        saver.begin(id).write8(self.pages.len() as u8);
        for page in &self.pages {
            match page {
                Some(page) => {
                    saver.write8(page.source.index() as u8);
                    saver.write32(page.offset as u32);
                }
                None => {
                    saver.write8(0xFF);
                    saver.write32(0);
                }
            }
        }
        saver.end();
    }

    fn load(&mut self, loader: &mut StateLoader) -> Result<(), StateError> {
        let count = loader.read8()? as usize;
        if count != self.pages.len() {
            return Err(StateError::Invalid("bank page count"));
        }
        let mut pages = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = loader.read8()?;
            let offset = loader.read32()? as usize;
            if tag == 0xFF {
                pages.push(None);
                continue;
            }
            let source = Source::from_index(tag).ok_or(StateError::Invalid("bank source"))?;
            if offset >= self.lens[source.index()] {
                return Err(StateError::Invalid("bank offset past storage"));
            }
            pages.push(Some(Page { source, offset }));
        }
        self.pages = pages;
        Ok(())
    }
}

/// Cartridge storage plus the three windowed spaces over it.
#[derive(Debug, Clone)]
pub struct Banks {
    prg_rom: Rc<[u8]>,
    chr_mem: Storage,
    wram: Vec<u8>,
    pub prg: BankSpace,
    pub chr: BankSpace,
    pub wrk: BankSpace,
}

impl Banks {
    /// `chr_rom` of `None` gives the board `chr_ram_size` bytes of CHR RAM.
    pub fn new(
        prg_rom: Rc<[u8]>,
        chr_rom: Option<Rc<[u8]>>,
        chr_ram_size: usize,
        wram_size: usize,
        work_source: Source,
    ) -> Self {
        let chr_mem = match chr_rom {
            Some(rom) if !rom.is_empty() => Storage::Rom(rom),
            _ => Storage::Ram(vec![0; chr_ram_size]),
        };
        let lens = [prg_rom.len(), chr_mem.bytes().len(), wram_size];

        let mut banks = Banks {
            prg_rom,
            chr_mem,
            wram: vec![0; wram_size],
            prg: BankSpace::new("PRG", 0x8000, SIZE_32K, Source::Prg, lens),
            chr: BankSpace::new("CHR", 0x0000, SIZE_8K, Source::Chr, lens),
            wrk: BankSpace::new("WRK", 0x6000, SIZE_8K, work_source, lens),
        };
        banks.prg.swap_bank::<SIZE_32K>(0x0000, 0);
        banks.chr.swap_bank::<SIZE_8K>(0x0000, 0);
        banks.wrk.swap_bank::<SIZE_8K>(0x0000, 0);
        banks
    }

    /// Swap window 0 of PRG and window 0 of CHR together.
    pub fn swap_banks<const PRG: usize, const CHR: usize>(&mut self, prg_bank: usize, chr_bank: usize) {
        self.prg.swap_bank::<PRG>(0x0000, prg_bank);
        self.chr.swap_bank::<CHR>(0x0000, chr_bank);
    }

    /// Read a physical bank directly without installing a window.
    pub fn peek_source<const SIZE: usize>(&self, source: Source, bank: usize, offset: usize) -> Option<u8> {
        let () = WindowSize::<SIZE>::VALID;
        let data = self.storage(source);
        if data.is_empty() {
            return None;
        }
        let count = (data.len() / SIZE).max(1);
        let pos = ((bank % count) * SIZE + (offset % SIZE)) % data.len();
        data.get(pos).copied()
    }

    pub fn read_prg(&self, addr: u16) -> Option<u8> {
        let (source, offset) = self.prg.resolve(addr)?;
        self.read_at(source, offset)
    }

    pub fn write_prg(&mut self, addr: u16, data: u8) -> bool {
        match self.prg.resolve(addr) {
            Some((source, offset)) => self.write_at(source, offset, data),
            None => false,
        }
    }

    pub fn read_chr(&self, addr: u16) -> Option<u8> {
        let (source, offset) = self.chr.resolve(addr & 0x1FFF)?;
        self.read_at(source, offset)
    }

    pub fn write_chr(&mut self, addr: u16, data: u8) -> bool {
        match self.chr.resolve(addr & 0x1FFF) {
            Some((source, offset)) => self.write_at(source, offset, data),
            None => false,
        }
    }

    pub fn read_wrk(&self, addr: u16) -> Option<u8> {
        let (source, offset) = self.wrk.resolve(addr)?;
        self.read_at(source, offset)
    }

    pub fn write_wrk(&mut self, addr: u16, data: u8) -> bool {
        match self.wrk.resolve(addr) {
            Some((source, offset)) => self.write_at(source, offset, data),
            None => false,
        }
    }

    pub fn wram(&self) -> &[u8] {
        &self.wram
    }

    pub fn wram_mut(&mut self) -> &mut [u8] {
        &mut self.wram
    }

    pub fn chr_ram(&self) -> Option<&[u8]> {
        match &self.chr_mem {
            Storage::Ram(ram) => Some(ram),
            Storage::Rom(_) => None,
        }
    }

    pub fn is_writable(&self, source: Source) -> bool {
        match source {
            Source::Prg => false,
            Source::Chr => matches!(self.chr_mem, Storage::Ram(_)),
            Source::Wram => !self.wram.is_empty(),
        }
    }

    fn storage(&self, source: Source) -> &[u8] {
        match source {
            Source::Prg => &self.prg_rom,
            Source::Chr => self.chr_mem.bytes(),
            Source::Wram => &self.wram,
        }
    }

    fn read_at(&self, source: Source, offset: usize) -> Option<u8> {
        let data = self.storage(source);
        debug_assert!(offset < data.len(), "{source:?} offset {offset:#X} past storage");
        data.get(offset).copied()
    }

    fn write_at(&mut self, source: Source, offset: usize, data: u8) -> bool {
        let target = match source {
            Source::Prg => return false,
            Source::Chr => match &mut self.chr_mem {
                Storage::Ram(ram) => ram,
                Storage::Rom(_) => return false,
            },
            Source::Wram => &mut self.wram,
        };
        match target.get_mut(offset) {
            Some(byte) => {
                *byte = data;
                true
            }
            None => false,
        }
    }

    /// Window tables plus any cartridge RAM contents.
    pub fn save_state(&self, saver: &mut StateSaver) {
        self.prg.save(saver, PRG_ID);
        self.chr.save(saver, CHR_ID);
        self.wrk.save(saver, WRK_ID);
        if !self.wram.is_empty() {
            saver.begin(WRAM_ID).write(&self.wram).end();
        }
        if let Storage::Ram(ram) = &self.chr_mem {
            saver.begin(CHR_RAM_ID).write(ram).end();
        }
    }

    /// Apply one inner chunk if it belongs to the bank manager.
    ///
    /// Returns `Ok(false)` for chunk ids this layer does not own.
    pub fn load_chunk(&mut self, id: ChunkId, loader: &mut StateLoader) -> Result<bool, StateError> {
        match id {
            PRG_ID => self.prg.load(loader)?,
            CHR_ID => self.chr.load(loader)?,
            WRK_ID => self.wrk.load(loader)?,
            WRAM_ID => {
                let data = loader.read_rest();
                if data.len() != self.wram.len() {
                    return Err(StateError::Invalid("work RAM size"));
                }
                self.wram.copy_from_slice(data);
            }
            CHR_RAM_ID => {
                let data = loader.read_rest();
                match &mut self.chr_mem {
                    Storage::Ram(ram) if ram.len() == data.len() => ram.copy_from_slice(data),
                    _ => return Err(StateError::Invalid("CHR RAM size")),
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}
