use crate::MbrError;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Size of one logical sector. The MBR is always the first sector.
pub const SECTOR_SIZE: u64 = 512;

/// A disk or image file an MBR is read from or written to.
#[derive(Debug, Clone)]
pub struct Device {
    pub path: PathBuf,
    pub size: u64,
}

impl Device {
    /// Open `path` read-only and measure it by seeking to the end, which
    /// also works for block devices whose metadata length is zero.
    pub fn probe(path: impl AsRef<Path>) -> Result<Self, MbrError> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let size = file.seek(SeekFrom::End(0))?;

        Ok(Self {
            path: path.to_path_buf(),
            size,
        })
    }

    /// Number of whole sectors, `None` when the size is unknown (zero).
    pub fn total_sectors(&self) -> Option<u64> {
        if self.size == 0 {
            None
        } else {
            Some(self.size / SECTOR_SIZE)
        }
    }

    pub fn name(&self) -> String {
        self.path.display().to_string()
    }
}
