use crate::MbrError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Linux native, used when a plan does not name a partition type.
pub const DEFAULT_PARTITION_TYPE: u8 = 0x83;

fn default_partition_type() -> u8 {
    DEFAULT_PARTITION_TYPE
}

/// Request for one primary partition.
///
/// `last_sector` is either an absolute sector number or a size relative to
/// `start_sector` such as `+100M`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSpec {
    pub slot: u8,
    pub start_sector: u32,
    pub last_sector: String,
    #[serde(default = "default_partition_type")]
    pub partition_type: u8,
    #[serde(default)]
    pub active: bool,
    /// Overwrite the slot even if it already holds a partition.
    #[serde(default)]
    pub force: bool,
}

impl PartitionSpec {
    pub fn new(slot: u8, start_sector: u32, last_sector: impl Into<String>) -> Self {
        Self {
            slot,
            start_sector,
            last_sector: last_sector.into(),
            partition_type: DEFAULT_PARTITION_TYPE,
            active: false,
            force: false,
        }
    }
}

/// Everything `create` needs to lay down a fresh MBR.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOptions {
    /// File holding at most 445 bytes of bootstrap code.
    #[serde(default)]
    pub bootcode: Option<PathBuf>,
    #[serde(default)]
    pub partitions: Vec<PartitionSpec>,
}

impl CreateOptions {
    /// Load a creation plan from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, MbrError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let options: CreateOptions = serde_json::from_str(&text)?;
        options.validate()?;
        Ok(options)
    }

    /// Slots must be in 1..=4 and appear at most once.
    pub fn validate(&self) -> Result<(), MbrError> {
        let mut seen = HashSet::new();
        for spec in &self.partitions {
            if !(1..=4).contains(&spec.slot) {
                return Err(MbrError::Configuration(format!(
                    "partition slot must be between 1 and 4, got {}",
                    spec.slot
                )));
            }
            if !seen.insert(spec.slot) {
                return Err(MbrError::Configuration(format!(
                    "partition slot {} listed more than once",
                    spec.slot
                )));
            }
        }
        Ok(())
    }
}
