use std::fs::{self, File};
use std::io::{ErrorKind, Result, Write};
use std::path::{Path, PathBuf};

/// Battery save next to the ROM, with a `.sav` extension.
pub fn save_path(rom_path: &Path) -> PathBuf {
    let mut path = rom_path.to_path_buf();
    path.set_extension("sav");
    path
}

pub fn load(rom_path: &Path) -> Result<Option<Vec<u8>>> {
    let path = save_path(rom_path);
    match fs::read(&path) {
        Ok(data) => {
            log::info!("Loaded {} bytes of battery RAM from {}", data.len(), path.display());
            Ok(Some(data))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::debug!("No save file at {}, starting with fresh RAM", path.display());
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

pub fn save(rom_path: &Path, data: &[u8]) -> Result<()> {
    let path = save_path(rom_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(&path)?;
    file.write_all(data)?;
    file.sync_all()?;

    log::info!("Saved {} bytes of battery RAM to {}", data.len(), path.display());
    Ok(())
}
