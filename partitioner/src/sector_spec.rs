// Parsing of "last sector" arguments: an absolute sector number, or a size
// relative to the first sector with an optional K/M/G suffix.

use mbrkit_core::{MbrError, SECTOR_SIZE};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastSector {
    Absolute(u32),
    /// Number of sectors counted from the first sector.
    Relative(u64),
}

impl LastSector {
    /// Last sector (inclusive) of a partition starting at `start`.
    pub fn resolve(&self, start: u32) -> Result<u32, MbrError> {
        match *self {
            LastSector::Absolute(last) => {
                if last < start {
                    return Err(MbrError::InvalidInput(format!(
                        "last sector {} is before first sector {}",
                        last, start
                    )));
                }
                Ok(last)
            }
            LastSector::Relative(0) => Err(MbrError::InvalidInput(
                "partition size must be at least one sector".to_string(),
            )),
            LastSector::Relative(count) => {
                let last = start as u64 + count - 1;
                u32::try_from(last).map_err(|_| {
                    MbrError::InvalidInput(format!(
                        "partition end {} is beyond the 32-bit LBA range",
                        last
                    ))
                })
            }
        }
    }
}

impl FromStr for LastSector {
    type Err = MbrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || MbrError::InvalidInput(format!("invalid last sector: '{}'", s));

        let Some(size) = s.strip_prefix('+') else {
            return s.parse::<u32>().map(LastSector::Absolute).map_err(|_| invalid());
        };

        let (digits, unit) = match size.chars().last() {
            Some(c) if c.is_ascii_alphabetic() => {
                let unit = match c.to_ascii_uppercase() {
                    'K' => 1u64 << 10,
                    'M' => 1 << 20,
                    'G' => 1 << 30,
                    _ => return Err(invalid()),
                };
                (&size[..size.len() - 1], Some(unit))
            }
            _ => (size, None),
        };

        let value: u64 = digits.parse().map_err(|_| invalid())?;
        let sectors = match unit {
            None => value,
            // every unit is a multiple of the sector size
            Some(unit) => value.checked_mul(unit).ok_or_else(invalid)? / SECTOR_SIZE,
        };

        if sectors == 0 {
            return Err(MbrError::InvalidInput(format!("empty partition size '{}'", s)));
        }
        Ok(LastSector::Relative(sectors))
    }
}
