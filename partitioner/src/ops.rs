// Device-level operations: one load-modify-write cycle per call.
// The caller is responsible for exclusive access to the device.

use crate::geometry::Chs;
use crate::mbr::{MbrHeader, BOOTCODE_SIZE};
use crate::partition::{PartitionEntry, PartitionType, Slot, Status};
use crate::sector_spec::LastSector;
use crate::verifier::{MbrVerificationResult, MbrVerifier};
use log::{debug, info, warn};
use mbrkit_core::{CreateOptions, Device, MbrError, PartitionSpec};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Load the MBR from the first sector of `reader`.
pub fn read_mbr<R: Read + Seek>(reader: &mut R) -> Result<MbrHeader, MbrError> {
    reader.seek(SeekFrom::Start(0))?;
    MbrHeader::load(reader)
}

/// Write `mbr` over the first sector of `writer`.
pub fn write_mbr<W: Write + Seek>(writer: &mut W, mbr: &MbrHeader) -> Result<(), MbrError> {
    writer.seek(SeekFrom::Start(0))?;
    mbr.write(writer)
}

/// Read a bootstrap code file, refusing anything over 445 bytes.
pub fn read_bootcode(path: impl AsRef<Path>) -> Result<Vec<u8>, MbrError> {
    let path = path.as_ref();
    let mut code = Vec::with_capacity(BOOTCODE_SIZE + 1);
    File::open(path)?
        .take(BOOTCODE_SIZE as u64 + 1)
        .read_to_end(&mut code)?;

    if code.len() > BOOTCODE_SIZE {
        return Err(MbrError::Capacity(format!(
            "bootcode file {} must have at most {} bytes",
            path.display(),
            BOOTCODE_SIZE
        )));
    }
    Ok(code)
}

/// Build the entry described by `spec`, with CHS addresses derived from
/// the LBA range.
///
/// `total_sectors` bounds the partition when the device size is known.
pub fn build_entry(
    spec: &PartitionSpec,
    total_sectors: Option<u64>,
) -> Result<PartitionEntry, MbrError> {
    if !(1..=4).contains(&spec.slot) {
        return Err(MbrError::InvalidInput(format!(
            "partition slot must be between 1 and 4, got {}",
            spec.slot
        )));
    }
    if spec.start_sector == 0 {
        return Err(MbrError::InvalidInput(
            "first sector must be >= 1, sector 0 holds the MBR".to_string(),
        ));
    }

    let start = spec.start_sector;
    let last = spec.last_sector.parse::<LastSector>()?.resolve(start)?;

    if let Some(total) = total_sectors {
        if last as u64 >= total {
            return Err(MbrError::InvalidInput(format!(
                "last sector {} is beyond the end of the device ({} sectors)",
                last, total
            )));
        }
    }

    let status = if spec.active {
        Status::ACTIVE
    } else {
        Status::INACTIVE
    };

    Ok(PartitionEntry::new(
        spec.slot,
        status,
        Chs::from_lba_clamped(start),
        PartitionType(spec.partition_type),
        Chs::from_lba_clamped(last),
        start,
        last - start + 1,
    ))
}

/// Place `spec` into `mbr`, checking the slot and overlaps first.
fn place_partition(
    mbr: &mut MbrHeader,
    spec: &PartitionSpec,
    total_sectors: Option<u64>,
) -> Result<PartitionEntry, MbrError> {
    let entry = build_entry(spec, total_sectors)?;

    // A forced write may replace a slot that no longer decodes.
    if !spec.force && !mbr.slot(spec.slot)?.is_empty() {
        return Err(MbrError::InvalidInput(format!(
            "partition slot {} is already in use",
            spec.slot
        )));
    }

    for number in (1..=4).filter(|&n| n != spec.slot) {
        if let Slot::Populated(other) = mbr.slot(number)? {
            if other.overlaps(&entry) {
                return Err(MbrError::InvalidInput(format!(
                    "new partition {} overlaps partition {}",
                    spec.slot, number
                )));
            }
        }
    }

    mbr.set_partition(spec.slot, &entry)?;
    Ok(entry)
}

fn open_rw(path: &Path) -> Result<File, MbrError> {
    Ok(OpenOptions::new().read(true).write(true).open(path)?)
}

/// Populated partitions of the device at `path`.
pub fn info(path: impl AsRef<Path>) -> Result<Vec<PartitionEntry>, MbrError> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let mbr = read_mbr(&mut file)?;
    debug!("Loaded MBR from {}", path.display());
    mbr.partitions()
}

/// Verify the partition table of the device at `path`.
pub fn verify(path: impl AsRef<Path>) -> Result<MbrVerificationResult, MbrError> {
    let mut file = File::open(path.as_ref())?;
    let mbr = read_mbr(&mut file)?;
    Ok(MbrVerifier::verify(&mbr))
}

/// Replace the MBR of an existing device or image with a fresh one.
///
/// The bootcode and the partition plan are checked before anything is
/// written.
pub fn create(path: impl AsRef<Path>, options: &CreateOptions) -> Result<MbrHeader, MbrError> {
    let path = path.as_ref();
    options.validate()?;

    let device = Device::probe(path)?;
    let mut mbr = MbrHeader::new_empty();

    if let Some(bootcode) = &options.bootcode {
        let code = read_bootcode(bootcode)?;
        mbr.set_bootcode(&code)?;
        debug!("Installed {} bytes of bootcode from {}", code.len(), bootcode.display());
    }

    for spec in &options.partitions {
        place_partition(&mut mbr, spec, device.total_sectors())?;
    }

    let mut file = open_rw(path)?;
    write_mbr(&mut file, &mbr)?;

    info!(
        "Created MBR on {} with {} partition(s)",
        device.name(),
        options.partitions.len()
    );
    Ok(mbr)
}

/// Add one partition to the existing MBR at `path`.
pub fn add_partition(
    path: impl AsRef<Path>,
    spec: &PartitionSpec,
) -> Result<PartitionEntry, MbrError> {
    let path = path.as_ref();
    let device = Device::probe(path)?;
    let mut file = open_rw(path)?;

    let mut mbr = read_mbr(&mut file)?;
    let entry = place_partition(&mut mbr, spec, device.total_sectors())?;
    write_mbr(&mut file, &mbr)?;

    info!(
        "Added partition {} on {}: LBA {}..={}, type 0x{:02x}",
        entry.number(),
        device.name(),
        entry.lba_start(),
        entry.lba_end() - 1,
        entry.partition_type().0
    );
    Ok(entry)
}

/// Clear `slot` in the existing MBR at `path`.
pub fn delete_partition(path: impl AsRef<Path>, slot: u8) -> Result<(), MbrError> {
    let path = path.as_ref();
    let mut file = open_rw(path)?;

    let mut mbr = read_mbr(&mut file)?;
    match mbr.slot(slot) {
        Ok(Slot::Empty) => {
            return Err(MbrError::InvalidInput(format!(
                "partition slot {} is already empty",
                slot
            )));
        }
        Ok(Slot::Populated(_)) => {}
        // malformed entries are cleared from the raw window
        Err(MbrError::Format(e)) => warn!("Clearing malformed partition {}: {}", slot, e),
        Err(e) => return Err(e),
    }
    mbr.clear_partition(slot)?;
    write_mbr(&mut file, &mbr)?;

    info!("Deleted partition {} on {}", slot, path.display());
    Ok(())
}

/// Install new bootstrap code into the existing MBR at `path`.
pub fn update_bootcode(
    path: impl AsRef<Path>,
    bootcode: impl AsRef<Path>,
) -> Result<(), MbrError> {
    let path = path.as_ref();
    let code = read_bootcode(bootcode)?;
    let mut file = open_rw(path)?;

    let mut mbr = read_mbr(&mut file)?;
    mbr.set_bootcode(&code)?;
    write_mbr(&mut file, &mbr)?;

    info!("Installed {} bytes of bootcode on {}", code.len(), path.display());
    Ok(())
}
