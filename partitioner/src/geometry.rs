// CHS <-> LBA conversion using the fixed 16 heads / 63 sectors geometry.
// Not configurable per disk.

use std::fmt;

pub const SECTORS_PER_TRACK: u32 = 63;
pub const HEADS_PER_CYLINDER: u32 = 16;

/// Highest cylinder an MBR entry can address (10 bits).
pub const MAX_CYLINDER: u16 = 1023;

/// Sectors in one cylinder (1008).
const SECTORS_PER_CYLINDER: u32 = HEADS_PER_CYLINDER * SECTORS_PER_TRACK;

/// `sector` is 1-based; a zero sector is treated as sector 1.
pub fn chs_to_lba(cylinder: u16, head: u8, sector: u8) -> u32 {
    (cylinder as u32 * HEADS_PER_CYLINDER + head as u32) * SECTORS_PER_TRACK
        + (sector as u32).saturating_sub(1)
}

/// May exceed [`MAX_CYLINDER`] for addresses past the CHS range.
pub fn lba_to_cylinder(lba: u32) -> u32 {
    lba / SECTORS_PER_CYLINDER
}

pub fn lba_to_head(lba: u32) -> u8 {
    ((lba / SECTORS_PER_TRACK) % HEADS_PER_CYLINDER) as u8
}

pub fn lba_to_sector(lba: u32) -> u8 {
    (lba % SECTORS_PER_TRACK + 1) as u8
}

/// Cylinder-head-sector address as stored in a partition entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Chs {
    pub cylinder: u16,
    pub head: u8,
    pub sector: u8,
}

impl Chs {
    /// Marker written when an address lies beyond cylinder 1023.
    pub const OUT_OF_RANGE: Chs = Chs {
        cylinder: MAX_CYLINDER,
        head: 254,
        sector: 63,
    };

    pub const fn new(cylinder: u16, head: u8, sector: u8) -> Self {
        Self {
            cylinder,
            head,
            sector,
        }
    }

    /// Returns `None` when the cylinder does not fit in 10 bits.
    pub fn from_lba(lba: u32) -> Option<Self> {
        let cylinder = lba_to_cylinder(lba);
        if cylinder > MAX_CYLINDER as u32 {
            return None;
        }
        Some(Self::new(cylinder as u16, lba_to_head(lba), lba_to_sector(lba)))
    }

    pub fn from_lba_clamped(lba: u32) -> Self {
        Self::from_lba(lba).unwrap_or(Self::OUT_OF_RANGE)
    }

    pub fn to_lba(&self) -> u32 {
        chs_to_lba(self.cylinder, self.head, self.sector)
    }

    pub fn is_out_of_range(&self) -> bool {
        *self == Self::OUT_OF_RANGE
    }
}

impl fmt::Display for Chs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.cylinder, self.head, self.sector)
    }
}
