use clap::{Parser, Subcommand};
use mbrkit_core::{CreateOptions, PartitionSpec, DEFAULT_PARTITION_TYPE};
use mbrkit_partitioner::{ops, MbrVerifier};
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mbrkit")]
#[command(about = "Inspect and edit MBR partition tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the partition table of one or more devices
    Info {
        /// Device or image files
        #[arg(required = true)]
        devices: Vec<PathBuf>,
        /// Also dump each raw 16-byte entry in hex
        #[arg(long)]
        raw: bool,
    },
    /// Write a new MBR, discarding the existing partition table
    Create {
        device: PathBuf,
        /// Bootstrap code file (at most 445 bytes)
        #[arg(short, long)]
        bootcode: Option<PathBuf>,
        /// JSON plan with bootcode and partitions
        #[arg(long, conflicts_with = "bootcode")]
        plan: Option<PathBuf>,
    },
    /// Add a primary partition
    AddPart {
        device: PathBuf,
        /// Slot number (1-4)
        #[arg(short, long)]
        part: u8,
        /// First sector
        #[arg(long)]
        start_sect: u32,
        /// Last sector, or a size such as +100M (K, M and G suffixes work)
        #[arg(long)]
        last_sect: String,
        /// Partition type code in hex
        #[arg(short = 't', long = "type", value_parser = parse_type_code)]
        partition_type: Option<u8>,
        /// Mark the partition bootable
        #[arg(long)]
        active: bool,
        /// Replace a partition already in the slot
        #[arg(long)]
        force: bool,
    },
    /// Delete a primary partition
    DelPart {
        device: PathBuf,
        /// Slot number (1-4)
        #[arg(short, long)]
        part: u8,
    },
    /// Install bootstrap code, keeping the partition table
    Bootcode { device: PathBuf, file: PathBuf },
    /// Check the partition table for overlaps and inconsistencies
    Verify { device: PathBuf },
}

fn parse_type_code(s: &str) -> Result<u8, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u8::from_str_radix(digits, 16).map_err(|e| format!("invalid partition type '{}': {}", s, e))
}

fn show_info(device: &Path, raw: bool) -> anyhow::Result<()> {
    let mut file = File::open(device)?;
    let mbr = ops::read_mbr(&mut file)?;

    println!("Device: {}", device.display());
    for entry in mbr.partitions()? {
        println!("{}", entry);
        if raw {
            println!("Raw: {}\n", hex::encode(mbr.raw_entry(entry.number())?));
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { devices, raw } => {
            for device in &devices {
                show_info(device, raw).map_err(|e| {
                    anyhow::anyhow!("Failed to get MBR info from {}: {}", device.display(), e)
                })?;
            }
        }
        Commands::Create {
            device,
            bootcode,
            plan,
        } => {
            let options = match plan {
                Some(plan) => CreateOptions::from_json_file(plan)?,
                None => CreateOptions {
                    bootcode,
                    partitions: Vec::new(),
                },
            };
            let mbr = ops::create(&device, &options)?;
            println!("Created MBR on {}", device.display());
            for entry in mbr.partitions()? {
                println!("{}", entry);
            }
        }
        Commands::AddPart {
            device,
            part,
            start_sect,
            last_sect,
            partition_type,
            active,
            force,
        } => {
            let spec = PartitionSpec {
                slot: part,
                start_sector: start_sect,
                last_sector: last_sect,
                partition_type: partition_type.unwrap_or(DEFAULT_PARTITION_TYPE),
                active,
                force,
            };
            let entry = ops::add_partition(&device, &spec)?;
            println!("{}", entry);
        }
        Commands::DelPart { device, part } => {
            ops::delete_partition(&device, part)?;
            println!("Deleted partition {} on {}", part, device.display());
        }
        Commands::Bootcode { device, file } => {
            ops::update_bootcode(&device, &file)?;
            println!("Installed bootcode from {} on {}", file.display(), device.display());
        }
        Commands::Verify { device } => {
            let result = ops::verify(&device)?;
            print!("{}", MbrVerifier::generate_report(&result));
            if !result.is_valid {
                anyhow::bail!("partition table on {} is invalid", device.display());
            }
        }
    }

    Ok(())
}
