// The 512-byte Master Boot Record: bootstrap code, four primary
// partition entries and the 0x55 0xaa signature.

use crate::partition::{self, PartitionEntry, Slot, ENTRY_SIZE};
use mbrkit_core::MbrError;
use static_assertions::assert_eq_size;
use std::io::{ErrorKind, Read, Write};

pub const MBR_SIZE: usize = 512;

/// The bootstrap code area is `[0, BOOTCODE_SIZE)`.
pub const BOOTCODE_SIZE: usize = 0x1bd;

pub const PARTITION_OFFSETS: [usize; 4] = [0x1be, 0x1ce, 0x1de, 0x1ee];

pub const SIGNATURE_OFFSET: usize = 0x1fe;
pub const SIGNATURE: [u8; 2] = [0x55, 0xaa];

/// Raw header bytes, decoded on demand.
#[derive(Clone, PartialEq, Eq)]
pub struct MbrHeader([u8; MBR_SIZE]);

assert_eq_size!(MbrHeader, [u8; MBR_SIZE]);

impl MbrHeader {
    /// All zero except the signature.
    pub fn new_empty() -> Self {
        let mut bytes = [0u8; MBR_SIZE];
        bytes[SIGNATURE_OFFSET..].copy_from_slice(&SIGNATURE);
        Self(bytes)
    }

    /// Take the first 512 bytes of `data`, which must carry the signature.
    pub fn from_bytes(data: &[u8]) -> Result<Self, MbrError> {
        if data.len() < MBR_SIZE {
            return Err(MbrError::Format(format!(
                "MBR must be {} bytes, got {}",
                MBR_SIZE,
                data.len()
            )));
        }

        let mut bytes = [0u8; MBR_SIZE];
        bytes.copy_from_slice(&data[..MBR_SIZE]);
        Self::check_signature(&bytes)?;
        Ok(Self(bytes))
    }

    /// Read the first sector from `reader`.
    ///
    /// Input ending early is not an error by itself: the missing bytes stay
    /// zero and the header then fails the signature check.
    pub fn load<R: Read>(reader: &mut R) -> Result<Self, MbrError> {
        let mut bytes = [0u8; MBR_SIZE];
        let mut filled = 0;
        while filled < MBR_SIZE {
            match reader.read(&mut bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Self::check_signature(&bytes)?;
        Ok(Self(bytes))
    }

    fn check_signature(bytes: &[u8; MBR_SIZE]) -> Result<(), MbrError> {
        if bytes[SIGNATURE_OFFSET..] != SIGNATURE {
            return Err(MbrError::Signature(format!(
                "no MBR found (signature {:02x}{:02x}, expected 55aa)",
                bytes[SIGNATURE_OFFSET],
                bytes[SIGNATURE_OFFSET + 1]
            )));
        }
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8; MBR_SIZE] {
        &self.0
    }

    pub fn bootcode(&self) -> &[u8] {
        &self.0[..BOOTCODE_SIZE]
    }

    /// Copy `code` to the start of the bootstrap area. Bytes past
    /// `code.len()` keep their previous value.
    pub fn set_bootcode(&mut self, code: &[u8]) -> Result<(), MbrError> {
        if code.len() > BOOTCODE_SIZE {
            return Err(MbrError::Capacity(format!(
                "bootcode must be at most {} bytes, got {}",
                BOOTCODE_SIZE,
                code.len()
            )));
        }
        self.0[..code.len()].copy_from_slice(code);
        Ok(())
    }

    fn window(slot: u8) -> Result<std::ops::Range<usize>, MbrError> {
        match slot {
            1..=4 => {
                let offset = PARTITION_OFFSETS[slot as usize - 1];
                Ok(offset..offset + ENTRY_SIZE)
            }
            _ => Err(MbrError::InvalidInput(format!(
                "partition slot must be between 1 and 4, got {}",
                slot
            ))),
        }
    }

    /// Raw 16 bytes of `slot`.
    pub fn raw_entry(&self, slot: u8) -> Result<&[u8], MbrError> {
        Ok(&self.0[Self::window(slot)?])
    }

    pub fn slot(&self, slot: u8) -> Result<Slot, MbrError> {
        partition::decode(self.raw_entry(slot)?, slot)
    }

    /// All four slots in table order. Fails on the first malformed entry.
    pub fn slots(&self) -> Result<[Slot; 4], MbrError> {
        Ok([self.slot(1)?, self.slot(2)?, self.slot(3)?, self.slot(4)?])
    }

    /// Populated entries in slot order.
    pub fn partitions(&self) -> Result<Vec<PartitionEntry>, MbrError> {
        Ok(self
            .slots()?
            .iter()
            .filter_map(|slot| slot.entry().copied())
            .collect())
    }

    /// Encode `entry` into `slot`, replacing whatever was there.
    /// Entries that would not decode back to themselves are refused and
    /// the header is left untouched.
    pub fn set_partition(&mut self, slot: u8, entry: &PartitionEntry) -> Result<(), MbrError> {
        let window = Self::window(slot)?;
        entry.validate()?;
        self.0[window].copy_from_slice(&partition::encode(entry));
        Ok(())
    }

    pub fn clear_partition(&mut self, slot: u8) -> Result<(), MbrError> {
        let window = Self::window(slot)?;
        self.0[window].fill(0);
        Ok(())
    }

    /// Write the whole header in one call.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), MbrError> {
        writer.write_all(&self.0)?;
        writer.flush()?;
        Ok(())
    }
}

impl Default for MbrHeader {
    fn default() -> Self {
        Self::new_empty()
    }
}

impl std::fmt::Debug for MbrHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MbrHeader")
            .field("signature", &&self.0[SIGNATURE_OFFSET..])
            .field("slots", &self.slots())
            .finish()
    }
}

impl AsRef<[u8]> for MbrHeader {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
