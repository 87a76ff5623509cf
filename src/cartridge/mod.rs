use std::fs;
use std::io::{self, Result};
use std::path::Path;
use std::rc::Rc;

use crate::host::Mirroring;

/// A cartridge image as handed to a board: raw PRG/CHR plus board wiring.
///
/// Images are shared with the board, never copied.
#[derive(Debug, Clone)]
pub struct Cartridge {
    pub mapper: u16,
    pub prg: Rc<[u8]>,
    /// `None` gives the board CHR RAM instead.
    pub chr: Option<Rc<[u8]>>,
    /// Overrides the board's default work RAM size.
    pub wram_size: Option<usize>,
    pub battery: bool,
    /// Solder-pad mirroring, used until the board programs its own.
    pub mirroring: Mirroring,
}

impl Cartridge {
    pub fn new(mapper: u16, prg: Rc<[u8]>) -> Self {
        Cartridge {
            mapper,
            prg,
            chr: None,
            wram_size: None,
            battery: false,
            mirroring: Mirroring::Horizontal,
        }
    }

    pub fn with_chr(mut self, chr: Rc<[u8]>) -> Self {
        self.chr = if chr.is_empty() { None } else { Some(chr) };
        self
    }

    pub fn with_wram_size(mut self, size: usize) -> Self {
        self.wram_size = Some(size);
        self
    }

    pub fn with_battery(mut self, battery: bool) -> Self {
        self.battery = battery;
        self
    }

    pub fn with_mirroring(mut self, mirroring: Mirroring) -> Self {
        self.mirroring = mirroring;
        self
    }

    /// Read already-split PRG and CHR dumps from disk.
    pub fn load_raw(mapper: u16, prg_path: &Path, chr_path: Option<&Path>) -> Result<Self> {
        let prg = fs::read(prg_path)?;
        if prg.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is empty", prg_path.display()),
            ));
        }
        let mut cart = Cartridge::new(mapper, prg.into());
        if let Some(path) = chr_path {
            cart = cart.with_chr(fs::read(path)?.into());
        }
        log::debug!(
            "cartridge: mapper {}, PRG {} bytes, CHR {}",
            mapper,
            cart.prg.len(),
            cart.chr
                .as_ref()
                .map_or_else(|| "RAM".to_string(), |chr| format!("{} bytes", chr.len()))
        );
        Ok(cart)
    }
}
