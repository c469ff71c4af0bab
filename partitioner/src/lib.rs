// Master Boot Record partition table handling for mbrkit

pub mod geometry;
pub mod mbr;
pub mod ops;
pub mod partition;
pub mod sector_spec;
pub mod verifier;


pub use geometry::{chs_to_lba, lba_to_cylinder, lba_to_head, lba_to_sector, Chs};
pub use mbr::{MbrHeader, BOOTCODE_SIZE, MBR_SIZE};
pub use ops::{add_partition, create, delete_partition, info, update_bootcode, verify};
pub use partition::{decode, encode, is_empty, PartitionEntry, PartitionType, Slot, Status};
pub use sector_spec::LastSector;
pub use verifier::{MbrVerificationResult, MbrVerifier};
