// End-to-end tests of the device operations on temporary image files

use mbrkit_core::{CreateOptions, MbrError, PartitionSpec};
use mbrkit_partitioner::*;
use std::io::{Read, Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

const IMAGE_SECTORS: usize = 64 * 1024; // 32 MiB

fn blank_image() -> NamedTempFile {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut image = NamedTempFile::new().unwrap();
    image.write_all(&vec![0u8; IMAGE_SECTORS * 512]).unwrap();
    image.flush().unwrap();
    image
}

fn first_sector(image: &mut NamedTempFile) -> Vec<u8> {
    let mut sector = vec![0u8; 512];
    let file = image.as_file_mut();
    file.seek(SeekFrom::Start(0)).unwrap();
    file.read_exact(&mut sector).unwrap();
    sector
}

#[test]
fn test_info_on_blank_image_has_no_mbr() {
    let image = blank_image();
    let result = info(image.path());
    assert!(matches!(result, Err(MbrError::Signature(_))));
}

#[test]
fn test_info_on_missing_device() {
    let result = info("/nonexistent/mbrkit/disk.img");
    assert!(matches!(result, Err(MbrError::IoError(_))));
}

#[test]
fn test_create_empty_mbr() {
    let mut image = blank_image();
    create(image.path(), &CreateOptions::default()).unwrap();

    let sector = first_sector(&mut image);
    assert_eq!(&sector[510..], &[0x55u8, 0xaa]);
    assert!(sector[..510].iter().all(|&b| b == 0));
    assert!(info(image.path()).unwrap().is_empty());
}

#[test]
fn test_create_preserves_rest_of_device() {
    let mut image = blank_image();
    {
        let file = image.as_file_mut();
        file.seek(SeekFrom::Start(512)).unwrap();
        file.write_all(&[0xabu8; 512]).unwrap();
    }

    create(image.path(), &CreateOptions::default()).unwrap();

    let mut second = vec![0u8; 512];
    let file = image.as_file_mut();
    file.seek(SeekFrom::Start(512)).unwrap();
    file.read_exact(&mut second).unwrap();
    assert!(second.iter().all(|&b| b == 0xab));
    assert_eq!(file.metadata().unwrap().len(), (IMAGE_SECTORS * 512) as u64);
}

#[test]
fn test_create_with_bootcode_and_plan() {
    let mut image = blank_image();
    let mut bootcode = NamedTempFile::new().unwrap();
    bootcode.write_all(&[0xeb, 0xfe]).unwrap();
    bootcode.flush().unwrap();

    let mut boot_partition = PartitionSpec::new(1, 2048, "+8M");
    boot_partition.active = true;
    boot_partition.partition_type = 0x0c;
    let options = CreateOptions {
        bootcode: Some(bootcode.path().to_path_buf()),
        partitions: vec![boot_partition, PartitionSpec::new(2, 18432, "+16M")],
    };

    create(image.path(), &options).unwrap();

    let sector = first_sector(&mut image);
    assert_eq!(&sector[..3], &[0xebu8, 0xfe, 0x00]);

    let partitions = info(image.path()).unwrap();
    assert_eq!(partitions.len(), 2);
    assert!(partitions[0].is_active());
    assert_eq!(partitions[0].partition_type(), PartitionType(0x0c));
    assert_eq!(partitions[0].lba_start(), 2048);
    assert_eq!(partitions[0].sector_count(), 16384);
    assert_eq!(partitions[1].number(), 2);
    assert_eq!(partitions[1].lba_start(), 18432);
    assert_eq!(partitions[1].sector_count(), 32768);

    let report = verify(image.path()).unwrap();
    assert!(report.is_valid);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[test]
fn test_create_rejects_oversized_bootcode_before_writing() {
    let mut image = blank_image();
    let mut bootcode = NamedTempFile::new().unwrap();
    bootcode.write_all(&[0x90u8; 446]).unwrap();
    bootcode.flush().unwrap();

    let options = CreateOptions {
        bootcode: Some(bootcode.path().to_path_buf()),
        partitions: Vec::new(),
    };
    let result = create(image.path(), &options);
    assert!(matches!(result, Err(MbrError::Capacity(_))));
    assert!(first_sector(&mut image).iter().all(|&b| b == 0));
}

#[test]
fn test_create_rejects_partition_past_device_end() {
    let mut image = blank_image();
    let options = CreateOptions {
        bootcode: None,
        partitions: vec![PartitionSpec::new(1, 2048, "+64M")],
    };
    assert!(matches!(
        create(image.path(), &options),
        Err(MbrError::InvalidInput(_))
    ));
    assert!(first_sector(&mut image).iter().all(|&b| b == 0));
}

#[test]
fn test_add_and_delete_partition() {
    let image = blank_image();
    create(image.path(), &CreateOptions::default()).unwrap();

    let entry = add_partition(image.path(), &PartitionSpec::new(3, 4096, "8191")).unwrap();
    assert_eq!(entry.number(), 3);
    assert_eq!(entry.sector_count(), 4096);
    assert_eq!(info(image.path()).unwrap(), vec![entry]);

    let again = add_partition(image.path(), &PartitionSpec::new(3, 10000, "+1M"));
    assert!(matches!(again, Err(MbrError::InvalidInput(_))));

    delete_partition(image.path(), 3).unwrap();
    assert!(info(image.path()).unwrap().is_empty());

    let twice = delete_partition(image.path(), 3);
    assert!(matches!(twice, Err(MbrError::InvalidInput(_))));
}

#[test]
fn test_add_partition_requires_mbr() {
    let image = blank_image();
    let result = add_partition(image.path(), &PartitionSpec::new(1, 2048, "+1M"));
    assert!(matches!(result, Err(MbrError::Signature(_))));
}

#[test]
fn test_update_bootcode_keeps_table() {
    let image = blank_image();
    create(image.path(), &CreateOptions::default()).unwrap();
    add_partition(image.path(), &PartitionSpec::new(1, 2048, "+1M")).unwrap();

    let mut bootcode = NamedTempFile::new().unwrap();
    bootcode.write_all(&[0xcc; BOOTCODE_SIZE]).unwrap();
    bootcode.flush().unwrap();
    update_bootcode(image.path(), bootcode.path()).unwrap();

    let mut file = std::fs::File::open(image.path()).unwrap();
    let mbr = MbrHeader::load(&mut file).unwrap();
    assert!(mbr.bootcode().iter().all(|&b| b == 0xcc));
    assert_eq!(mbr.partitions().unwrap().len(), 1);
}

#[test]
fn test_plan_file_drives_create() {
    let image = blank_image();
    let mut plan = NamedTempFile::new().unwrap();
    write!(
        plan,
        r#"{{ "partitions": [
            {{ "slot": 1, "start_sector": 2048, "last_sector": "+4M", "active": true }},
            {{ "slot": 4, "start_sector": 10240, "last_sector": "20479", "partition_type": 130 }}
        ] }}"#
    )
    .unwrap();
    plan.flush().unwrap();

    let options = CreateOptions::from_json_file(plan.path()).unwrap();
    create(image.path(), &options).unwrap();

    let partitions = info(image.path()).unwrap();
    let numbers: Vec<u8> = partitions.iter().map(|p| p.number()).collect();
    assert_eq!(numbers, vec![1, 4]);
    assert_eq!(partitions[1].partition_type().to_string(), "82 (Linux swap)");
}

#[test]
fn test_delete_clears_malformed_slot() {
    let mut image = blank_image();
    create(image.path(), &CreateOptions::default()).unwrap();
    add_partition(image.path(), &PartitionSpec::new(1, 2048, "+1M")).unwrap();
    {
        // slot 2: active flag with a zero first sector
        let file = image.as_file_mut();
        file.seek(SeekFrom::Start(0x1ce)).unwrap();
        file.write_all(&[0x80]).unwrap();
        file.flush().unwrap();
    }
    assert!(matches!(info(image.path()), Err(MbrError::Format(_))));

    delete_partition(image.path(), 2).unwrap();

    let partitions = info(image.path()).unwrap();
    assert_eq!(partitions.len(), 1);
    assert_eq!(partitions[0].number(), 1);
    assert!(first_sector(&mut image)[0x1ce..0x1de].iter().all(|&b| b == 0));
}
