// MBR Verifier - structural checks over a loaded partition table
use crate::geometry::Chs;
use crate::mbr::MbrHeader;
use crate::partition::PartitionEntry;
use log::debug;

#[derive(Debug)]
pub struct MbrVerificationResult {
    pub is_valid: bool,
    pub partitions: Vec<PartitionEntry>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub struct MbrVerifier;

impl MbrVerifier {
    /// Check a header whose signature has already been validated.
    ///
    /// Malformed entries make the result invalid instead of failing, so the
    /// report can still be shown.
    pub fn verify(mbr: &MbrHeader) -> MbrVerificationResult {
        let mut result = MbrVerificationResult {
            is_valid: true,
            partitions: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        };

        match mbr.partitions() {
            Ok(partitions) => result.partitions = partitions,
            Err(e) => {
                result.errors.push(e.to_string());
                result.is_valid = false;
                return result;
            }
        }

        for partition in &result.partitions {
            Self::validate_partition(partition, &mut result.warnings);
        }

        let active = result.partitions.iter().filter(|p| p.is_active()).count();
        if active > 1 {
            result.warnings.push(format!(
                "{} partitions are marked active, firmware expects at most one",
                active
            ));
        }

        for (i, p1) in result.partitions.iter().enumerate() {
            for p2 in &result.partitions[i + 1..] {
                if p1.overlaps(p2) {
                    result.errors.push(format!(
                        "Partitions {} and {} overlap",
                        p1.number(),
                        p2.number()
                    ));
                    result.is_valid = false;
                }
            }
        }

        if result.partitions.is_empty() {
            result.warnings.push("No partitions found in MBR".to_string());
        }

        result
    }

    fn validate_partition(partition: &PartitionEntry, warnings: &mut Vec<String>) {
        let number = partition.number();

        if partition.status().is_malformed() {
            warnings.push(format!(
                "Partition {} has invalid boot flag: 0x{:02X}",
                number,
                partition.status().0
            ));
        }

        if partition.sector_count() == 0 {
            warnings.push(format!("Partition {} has zero sectors", number));
        }

        // CHS only means something below cylinder 1024
        let begin = partition.begin();
        if let Some(expected) = Chs::from_lba(partition.lba_start()) {
            if begin != expected {
                warnings.push(format!(
                    "Partition {} CHS/LBA mismatch: begins at C/H/S {} but LBA {} is {}",
                    number,
                    begin,
                    partition.lba_start(),
                    expected
                ));
            }
        }

        debug!(
            "Partition {}: type {}, start {}, {} sectors",
            number,
            partition.partition_type(),
            partition.lba_start(),
            partition.sector_count()
        );
    }

    /// Generate a human-readable report
    pub fn generate_report(result: &MbrVerificationResult) -> String {
        let mut report = String::new();

        report.push_str("MBR Verification Report\n");
        report.push_str("=======================\n\n");

        report.push_str(&format!(
            "Status: {}\n",
            if result.is_valid { "VALID" } else { "INVALID" }
        ));
        report.push_str(&format!("Partitions: {}\n\n", result.partitions.len()));

        if !result.errors.is_empty() {
            report.push_str("ERRORS:\n");
            for error in &result.errors {
                report.push_str(&format!("  ✗ {}\n", error));
            }
            report.push('\n');
        }

        if !result.warnings.is_empty() {
            report.push_str("WARNINGS:\n");
            for warning in &result.warnings {
                report.push_str(&format!("  ⚠ {}\n", warning));
            }
            report.push('\n');
        }

        if !result.partitions.is_empty() {
            report.push_str("PARTITIONS:\n");
            for p in &result.partitions {
                report.push_str(&format!("  Partition {}:\n", p.number()));
                report.push_str(&format!("    Type: {}\n", p.partition_type()));
                report.push_str(&format!("    Status: {}\n", p.status()));
                report.push_str(&format!(
                    "    Start: LBA {} ({}MB from start)\n",
                    p.lba_start(),
                    p.lba_start() as u64 * 512 / 1024 / 1024
                ));
                report.push_str(&format!(
                    "    Size: {} sectors ({}MB)\n",
                    p.sector_count(),
                    p.sector_count() as u64 * 512 / 1024 / 1024
                ));
            }
        }

        report
    }
}
