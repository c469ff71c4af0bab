// Codec for the 16-byte primary partition entries of an MBR

use crate::geometry::{Chs, MAX_CYLINDER};
use byteorder::{ByteOrder, LittleEndian};
use mbrkit_core::MbrError;
use std::fmt;

/// Size of one on-disk partition entry.
pub const ENTRY_SIZE: usize = 16;

const SECTOR_MASK: u8 = 0x3f;
const CYLINDER_HIGH_MASK: u8 = 0xc0;

/// Boot indicator byte. Only `0x00` and `0x80` are well formed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status(pub u8);

impl Status {
    pub const ACTIVE: Status = Status(0x80);
    pub const INACTIVE: Status = Status(0x00);

    pub fn is_active(&self) -> bool {
        self.0 >> 7 == 1
    }

    /// Any of the reserved low 7 bits set.
    pub fn is_malformed(&self) -> bool {
        self.0 & 0x7f != 0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = if self.is_active() { "active" } else { "inactive" };
        if self.is_malformed() {
            write!(f, "{} (wrong)", word)
        } else {
            f.write_str(word)
        }
    }
}

/// Filesystem type code of a partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionType(pub u8);

impl PartitionType {
    pub const LINUX: PartitionType = PartitionType(0x83);

    pub fn name(&self) -> Option<&'static str> {
        let name = match self.0 {
            0x01 => "FAT12",
            0x04 => "FAT16 <32M",
            0x05 => "Extended",
            0x06 => "FAT16",
            0x07 => "NTFS/exFAT",
            0x0b => "FAT32",
            0x0c => "FAT32 LBA",
            0x0e => "FAT16 LBA",
            0x0f => "Extended LBA",
            0x82 => "Linux swap",
            0x83 => "Linux",
            0x8e => "Linux LVM",
            0xa5 => "FreeBSD",
            0xa6 => "OpenBSD",
            0xee => "GPT protective",
            0xef => "EFI System",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for PartitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{:02x} ({})", self.0, name),
            None => f.write_str("unknown"),
        }
    }
}

/// A populated primary partition entry.
///
/// Values are immutable; the `with_*` methods return modified copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionEntry {
    number: u8,
    status: Status,
    begin: Chs,
    partition_type: PartitionType,
    end: Chs,
    lba_start: u32,
    sector_count: u32,
}

impl PartitionEntry {
    pub fn new(
        number: u8,
        status: Status,
        begin: Chs,
        partition_type: PartitionType,
        end: Chs,
        lba_start: u32,
        sector_count: u32,
    ) -> Self {
        Self {
            number,
            status,
            begin,
            partition_type,
            end,
            lba_start,
            sector_count,
        }
    }

    /// Slot number 1..=4, taken from the entry's position in the table.
    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn begin(&self) -> Chs {
        self.begin
    }

    pub fn partition_type(&self) -> PartitionType {
        self.partition_type
    }

    pub fn end(&self) -> Chs {
        self.end
    }

    pub fn lba_start(&self) -> u32 {
        self.lba_start
    }

    pub fn sector_count(&self) -> u32 {
        self.sector_count
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// One past the last sector, widened so it cannot overflow.
    pub fn lba_end(&self) -> u64 {
        self.lba_start as u64 + self.sector_count as u64
    }

    pub fn overlaps(&self, other: &PartitionEntry) -> bool {
        let (a_start, b_start) = (self.lba_start as u64, other.lba_start as u64);
        a_start < other.lba_end() && b_start < self.lba_end()
    }

    pub fn with_number(self, number: u8) -> Self {
        Self { number, ..self }
    }

    pub fn with_status(self, status: Status) -> Self {
        Self { status, ..self }
    }

    pub fn with_partition_type(self, partition_type: PartitionType) -> Self {
        Self {
            partition_type,
            ..self
        }
    }

    pub fn with_lba_range(self, lba_start: u32, sector_count: u32) -> Self {
        Self {
            lba_start,
            sector_count,
            ..self
        }
    }

    pub fn with_chs(self, begin: Chs, end: Chs) -> Self {
        Self { begin, end, ..self }
    }

    /// Check that the entry fits the on-disk bit layout and would decode
    /// back to itself.
    pub fn validate(&self) -> Result<(), MbrError> {
        if self.begin.sector == 0 {
            return Err(MbrError::Format(format!(
                "first sector must be >= 1 in partition {}, found 0",
                self.number
            )));
        }
        for (label, chs) in [("first", &self.begin), ("last", &self.end)] {
            if chs.sector > SECTOR_MASK {
                return Err(MbrError::Format(format!(
                    "{} sector of partition {} must be <= {}, found {}",
                    label, self.number, SECTOR_MASK, chs.sector
                )));
            }
            if chs.cylinder > MAX_CYLINDER {
                return Err(MbrError::Format(format!(
                    "{} cylinder of partition {} must be <= {}, found {}",
                    label, self.number, MAX_CYLINDER, chs.cylinder
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for PartitionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Partition #{}", self.number)?;
        writeln!(f, "Status: {}", self.status)?;
        writeln!(f, "FS type: {}", self.partition_type)?;
        writeln!(f, "First C/H/S: {}", self.begin)?;
        writeln!(f, "Last C/H/S: {}", self.end)?;
        writeln!(f, "LBA: {}", self.lba_start)?;
        writeln!(f, "Number of sectors: {}", self.sector_count)
    }
}

/// Content of one of the four table slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Empty,
    Populated(PartitionEntry),
}

impl Slot {
    pub fn entry(&self) -> Option<&PartitionEntry> {
        match self {
            Slot::Empty => None,
            Slot::Populated(entry) => Some(entry),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }
}

/// True iff every byte of the entry is zero.
pub fn is_empty(raw: &[u8]) -> bool {
    raw.iter().all(|&b| b == 0)
}

fn unpack_chs(head: u8, sector_byte: u8, cylinder_low: u8) -> Chs {
    // Bits 6-7 of the sector byte are bits 8-9 of the cylinder.
    let cylinder = ((sector_byte & CYLINDER_HIGH_MASK) as u16) << 2 | cylinder_low as u16;
    Chs::new(cylinder, head, sector_byte & SECTOR_MASK)
}

fn pack_chs(chs: &Chs) -> [u8; 3] {
    let cylinder_high = ((chs.cylinder >> 2) as u8) & CYLINDER_HIGH_MASK;
    [
        chs.head,
        (chs.sector & SECTOR_MASK) | cylinder_high,
        (chs.cylinder & 0xff) as u8,
    ]
}

/// Decode the 16-byte entry found in slot `number`.
pub fn decode(raw: &[u8], number: u8) -> Result<Slot, MbrError> {
    if raw.len() != ENTRY_SIZE {
        return Err(MbrError::Format(format!(
            "partition entry must be {} bytes, got {}",
            ENTRY_SIZE,
            raw.len()
        )));
    }

    if is_empty(raw) {
        return Ok(Slot::Empty);
    }

    let begin = unpack_chs(raw[1], raw[2], raw[3]);
    if begin.sector == 0 {
        return Err(MbrError::Format(format!(
            "first sector must be >= 1 in partition {}, found {}",
            number, begin.sector
        )));
    }
    let end = unpack_chs(raw[5], raw[6], raw[7]);

    Ok(Slot::Populated(PartitionEntry {
        number,
        status: Status(raw[0]),
        begin,
        partition_type: PartitionType(raw[4]),
        end,
        lba_start: LittleEndian::read_u32(&raw[8..12]),
        sector_count: LittleEndian::read_u32(&raw[12..16]),
    }))
}

/// Pack an entry into its on-disk form. The slot number is not stored.
pub fn encode(entry: &PartitionEntry) -> [u8; ENTRY_SIZE] {
    let mut raw = [0u8; ENTRY_SIZE];
    raw[0] = entry.status.0;
    raw[1..4].copy_from_slice(&pack_chs(&entry.begin));
    raw[4] = entry.partition_type.0;
    raw[5..8].copy_from_slice(&pack_chs(&entry.end));
    LittleEndian::write_u32(&mut raw[8..12], entry.lba_start);
    LittleEndian::write_u32(&mut raw[12..16], entry.sector_count);
    raw
}
