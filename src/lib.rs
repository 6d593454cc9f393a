//! # landmark-crops
//!
//! Training-data generation for a small facial landmark classifier.
//!
//! This crate provides:
//! - **Database loading**: parses the UMDFaces per-batch annotation CSVs into
//!   in-memory face records grouped by batch and subject
//! - **Crop generation**: jittered windows around the eyes, nose and mouth,
//!   plus random negative windows that never touch the face
//! - **Record output**: each window becomes a 9x6 grayscale patch with a
//!   one-hot label, appended to a per-category record file
//!
//! ## Pipeline Overview
//!
//! 1. Load every batch with [`AnnotationStore::open`]
//! 2. For each face:
//!    - Derive a crop scale from the face box width
//!    - Sample shifted windows around each visible landmark
//!    - Sample negative windows outside the face box
//!    - Crop, resize to 9x6 and label every window
//! 3. Append each patch to the record file for its [`Category`]
//!
//! ## Quick Start
//!
//! ```rust
//! use landmark_crops::{
//!     Annotation, Batch, BoundingBox, Category, CropPipeline, Landmark, Orientation,
//!     PipelineConfig, RecordSink,
//! };
//! use image::{GrayImage, Luma};
//!
//! let face = Annotation {
//!     path: "face.jpg".into(),
//!     batch: Batch::One,
//!     subject: "1".into(),
//!     orientation: Orientation::default(),
//!     bbox: BoundingBox::new(100.0, 100.0, 70.0, 70.0),
//!     left_eye: Landmark::new(120.0, 115.0, 0.9),
//!     right_eye: Landmark::new(150.0, 115.0, 0.9),
//!     nose: Landmark::new(135.0, 130.0, 0.3),
//!     left_mouth: Landmark::new(125.0, 150.0, 0.9),
//!     right_mouth: Landmark::new(145.0, 150.0, 0.9),
//! };
//!
//! let image = GrayImage::from_pixel(300, 300, Luma([128]));
//! let mut pipeline = CropPipeline::seeded(PipelineConfig::default(), 7).unwrap();
//! let mut sink = RecordSink::from_fn(|_| Ok(Vec::<u8>::new())).unwrap();
//!
//! let counts = pipeline.process_image(&face, &image, &mut sink).unwrap();
//! assert_eq!(counts.get(Category::Nose), 0);
//! assert_eq!(counts.total(), 25);
//! ```

mod category;
pub mod crops;
pub mod database;
mod error;
pub mod patch;
mod pipeline;
pub mod record;
mod types;

pub use category::Category;
pub use crops::{CropGrid, CropWindow};
pub use database::{parse_annotations, Annotation, AnnotationStore, Batch, SubjectGroup};
pub use error::{Error, Result};
pub use patch::{extract_patch, ImageAccess, PatchSize};
pub use pipeline::{CategoryCounts, CropPipeline, CropPlan, PipelineConfig, RunSummary};
pub use record::{OutputRecord, RecordReader, RecordSink, RecordWriter};
pub use types::{BoundingBox, Landmark, Orientation, Point};
