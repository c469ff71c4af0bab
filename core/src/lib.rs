pub mod device;
pub mod error;
pub mod options;

pub use device::{Device, SECTOR_SIZE};
pub use error::MbrError;
pub use options::{CreateOptions, PartitionSpec, DEFAULT_PARTITION_TYPE};
