//! Dump a record file: record count, label histogram and hex rows of the
//! first few patches.
//!
//! Usage:
//!   inspect-records <file.rec>                     # 9-wide patches
//!   inspect-records <file.rec> --width 12 -n 5     # Other patch sizes
//!   inspect-records <file.rec> --category nose     # Only dump nose records

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use landmark_crops::{Category, PatchSize, RecordReader};

#[derive(Parser, Debug)]
#[command(name = "inspect-records")]
#[command(author, version, about = "Inspect a landmark record file", long_about = None)]
struct Args {
    /// Record file to read
    path: PathBuf,

    /// Number of records to dump
    #[arg(short = 'n', long, default_value_t = 3)]
    dump: usize,

    /// Patch width in pixels, used to split dumped images into rows
    #[arg(short, long, default_value_t = PatchSize::default().width, value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,

    /// Only dump records with this label (negative, left_eye, right_eye, nose, mouth)
    #[arg(short, long, value_parser = parse_category)]
    category: Option<Category>,
}

fn parse_category(s: &str) -> Result<Category, String> {
    s.parse().map_err(|e: landmark_crops::Error| e.to_string())
}

fn main() {
    let args = Args::parse();

    if let Err(e) = inspect(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn inspect(args: &Args) -> landmark_crops::Result<()> {
    println!("Reading records: {}", args.path.display());

    let reader = RecordReader::open(&args.path)?;
    let mut total = 0usize;
    let mut dumped = 0usize;
    let mut labels: BTreeMap<String, usize> = BTreeMap::new();
    let mut sizes: BTreeMap<usize, usize> = BTreeMap::new();

    for (i, record) in reader.enumerate() {
        let record = record?;
        total += 1;

        let category = record.category();
        let name = match category {
            Some(category) => category.to_string(),
            None => format!("unknown {:?}", record.label),
        };
        *labels.entry(name.clone()).or_default() += 1;
        *sizes.entry(record.image.len()).or_default() += 1;

        let wanted = args.category.is_none() || args.category == category;
        if wanted && dumped < args.dump {
            dumped += 1;
            println!("\nRecord {} ({}, label {:?}):", i, name, record.label);
            print!("{}", hex_rows(&record.image, args.width as usize));
        }
    }

    println!("\nTotal records: {}", total);
    println!("Labels:");
    for category in Category::ALL {
        let count = labels.remove(category.name()).unwrap_or(0);
        println!("  {:<10} {}", category.name(), count);
    }
    for (name, count) in labels {
        println!("  {:<10} {}", name, count);
    }
    println!("Patch sizes (bytes):");
    for (size, count) in sizes {
        println!("  {:<10} {}", size, count);
    }

    Ok(())
}

fn hex_rows(image: &[u8], width: usize) -> String {
    let mut s = String::new();
    for (row, chunk) in image.chunks(width).enumerate() {
        s.push_str(&format!("{:02}:", row));
        for b in chunk {
            s.push_str(&format!(" {:02x}", b));
        }
        s.push('\n');
    }
    s
}
