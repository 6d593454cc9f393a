//! Generate labeled landmark patches from the UMDFaces database.
//!
//! Usage:
//!   landmark-crops -u <umd-root> -o <output-dir>              # All batches
//!   landmark-crops -u <umd-root> -o <output-dir> --batches 1  # One batch
//!   landmark-crops -u <umd-root> -o <output-dir> --json       # JSON summary

use clap::Parser;
use landmark_crops::{
    AnnotationStore, Batch, Category, CropPipeline, PipelineConfig, RecordSink, RunSummary,
};
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "landmark-crops")]
#[command(author, version, about = "Generate negatives, positives and partial positives from face annotations", long_about = None)]
struct Args {
    /// UMDFaces database root
    #[arg(short, long)]
    umd: PathBuf,

    /// Output directory for the record files
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Batches to process (every batch is still loaded)
    #[arg(long, value_delimiter = ',', value_parser = parse_batch, default_value = "1,2,3")]
    batches: Vec<Batch>,

    /// Seed for reproducible crop sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_batch(s: &str) -> Result<Batch, String> {
    s.parse().map_err(|e: landmark_crops::Error| e.to_string())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default.as_str()),
    )
    .try_init();
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    log::info!("Loading annotations from {:?}", args.umd);
    let store = AnnotationStore::open(&args.umd)?;
    if store.is_empty() {
        log::warn!("No annotations found under {:?}", store.root());
    }
    let total: usize = args.batches.iter().map(|b| store.batch_len(*b)).sum();
    log::info!("{} faces loaded, {} selected", store.size(), total);

    let config = PipelineConfig::default();
    let mut pipeline = match args.seed {
        Some(seed) => CropPipeline::seeded(config, seed)?,
        None => CropPipeline::from_entropy(config)?,
    };

    let mut sink = RecordSink::create(&args.output_dir)?;
    let summary = pipeline.run(store.faces(&args.batches), total, &mut sink)?;
    sink.finish()?;

    let output_str = if args.json {
        serde_json::to_string_pretty(&summary)?
    } else {
        format_human_readable(&summary)
    };
    println!("{}", output_str);

    Ok(())
}

fn format_human_readable(summary: &RunSummary) -> String {
    let mut s = String::new();

    s.push_str(&format!("Faces processed: {}\n", summary.annotations));
    s.push_str(&format!("Records written: {}\n", summary.records.total()));
    for category in Category::ALL {
        s.push_str(&format!(
            "  {:<10} {}\n",
            format!("{}:", category),
            summary.records.get(category)
        ));
    }

    s
}
