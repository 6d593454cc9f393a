//! Crop generation and record emission for annotated faces.

use std::io::Write;

use image::GrayImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::category::Category;
use crate::crops::{landmark_crops, negative_crops, CropWindow};
use crate::database::Annotation;
use crate::error::{Error, Result};
use crate::patch::{extract_patch, PatchSize};
use crate::record::{OutputRecord, RecordSink};
use crate::types::Landmark;

/// Tunables for crop generation.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Landmarks at or below this visibility score are skipped.
    pub visibility_threshold: f64,
    /// Crops kept per landmark category.
    pub landmark_crops: usize,
    /// Negative crops sampled per face.
    pub negative_crops: usize,
    /// Eye and nose crop width is the face width divided by this.
    pub scale_divisor: f64,
    /// Mouth crop width as a multiple of the mouth-corner distance.
    pub mouth_scale: f64,
    pub patch_size: PatchSize,
    /// Cap on negative draws per face.
    pub max_negative_attempts: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.5,
            landmark_crops: 5,
            negative_crops: 10,
            scale_divisor: 3.5,
            mouth_scale: 1.3,
            patch_size: PatchSize::default(),
            max_negative_attempts: 100_000,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visibility_threshold(mut self, threshold: f64) -> Self {
        self.visibility_threshold = threshold;
        self
    }

    pub fn landmark_crops(mut self, count: usize) -> Self {
        self.landmark_crops = count;
        self
    }

    pub fn negative_crops(mut self, count: usize) -> Self {
        self.negative_crops = count;
        self
    }

    pub fn patch_size(mut self, width: u32, height: u32) -> Self {
        self.patch_size = PatchSize::new(width, height);
        self
    }

    pub fn max_negative_attempts(mut self, attempts: usize) -> Self {
        self.max_negative_attempts = attempts;
        self
    }

    /// Check that the settings can produce crops at all.
    pub fn validate(&self) -> Result<()> {
        if !(self.scale_divisor > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "scale divisor must be positive, got {}",
                self.scale_divisor
            )));
        }
        if !(self.mouth_scale > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "mouth scale must be positive, got {}",
                self.mouth_scale
            )));
        }
        if self.patch_size.is_empty() {
            return Err(Error::InvalidConfig("patch size must be non-empty".into()));
        }
        if self.negative_crops > 0 && self.max_negative_attempts < self.negative_crops {
            return Err(Error::InvalidConfig(format!(
                "max negative attempts ({}) is below the negative crop count ({})",
                self.max_negative_attempts, self.negative_crops
            )));
        }
        Ok(())
    }
}

/// Per-category tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub negative: usize,
    pub left_eye: usize,
    pub right_eye: usize,
    pub nose: usize,
    pub mouth: usize,
}

impl CategoryCounts {
    fn slot(&mut self, category: Category) -> &mut usize {
        match category {
            Category::Negative => &mut self.negative,
            Category::LeftEye => &mut self.left_eye,
            Category::RightEye => &mut self.right_eye,
            Category::Nose => &mut self.nose,
            Category::Mouth => &mut self.mouth,
        }
    }

    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Negative => self.negative,
            Category::LeftEye => self.left_eye,
            Category::RightEye => self.right_eye,
            Category::Nose => self.nose,
            Category::Mouth => self.mouth,
        }
    }

    pub fn add(&mut self, category: Category, n: usize) {
        *self.slot(category) += n;
    }

    pub fn merge(&mut self, other: &CategoryCounts) {
        for category in Category::ALL {
            self.add(category, other.get(category));
        }
    }

    pub fn total(&self) -> usize {
        Category::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

/// Totals for a complete run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub annotations: usize,
    pub records: CategoryCounts,
}

/// Crop windows chosen for one face, grouped by category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CropPlan {
    windows: [Vec<CropWindow>; 5],
}

impl CropPlan {
    pub fn windows(&self, category: Category) -> &[CropWindow] {
        &self.windows[category.index()]
    }

    fn set(&mut self, category: Category, windows: Vec<CropWindow>) {
        self.windows[category.index()] = windows;
    }

    /// Every window with its category, in [`Category::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &CropWindow)> + '_ {
        Category::ALL
            .into_iter()
            .flat_map(move |c| self.windows(c).iter().map(move |w| (c, w)))
    }

    pub fn len(&self) -> usize {
        self.windows.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts(&self) -> CategoryCounts {
        let mut counts = CategoryCounts::default();
        for category in Category::ALL {
            counts.add(category, self.windows(category).len());
        }
        counts
    }
}

/// Turns annotations into labeled patches.
///
/// # Usage
///
/// ```ignore
/// let mut pipeline = CropPipeline::seeded(PipelineConfig::default(), 42)?;
/// let mut sink = RecordSink::create("out")?;
/// for face in store.faces_all() {
///     pipeline.process(face, &mut sink)?;
/// }
/// sink.finish()?;
/// ```
pub struct CropPipeline<R: Rng> {
    config: PipelineConfig,
    rng: R,
}

impl CropPipeline<StdRng> {
    pub fn seeded(config: PipelineConfig, seed: u64) -> Result<Self> {
        Self::new(config, StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy(config: PipelineConfig) -> Result<Self> {
        Self::new(config, StdRng::from_entropy())
    }
}

impl<R: Rng> CropPipeline<R> {
    pub fn new(config: PipelineConfig, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn landmark_windows(&mut self, landmark: &Landmark, w: f64) -> Option<Vec<CropWindow>> {
        if !landmark.is_visible(self.config.visibility_threshold) {
            return None;
        }
        Some(landmark_crops(
            landmark.position,
            w,
            self.config.landmark_crops,
            &mut self.rng,
        ))
    }

    /// Choose every crop window for one face on an image of the given size.
    pub fn plan(&mut self, annotation: &Annotation, width: u32, height: u32) -> Result<CropPlan> {
        let mut plan = CropPlan::default();
        let w = annotation.bbox.width / self.config.scale_divisor;

        let single = [
            (Category::LeftEye, annotation.left_eye),
            (Category::RightEye, annotation.right_eye),
            (Category::Nose, annotation.nose),
        ];
        for (category, landmark) in single {
            if let Some(windows) = self.landmark_windows(&landmark, w) {
                plan.set(category, windows);
            }
        }

        let threshold = self.config.visibility_threshold;
        let (left, right) = (annotation.left_mouth, annotation.right_mouth);
        if left.is_visible(threshold) && right.is_visible(threshold) {
            let center = left.position.midpoint(&right.position);
            let mouth_w = left.position.distance(&right.position) * self.config.mouth_scale;
            plan.set(
                Category::Mouth,
                landmark_crops(center, mouth_w, self.config.landmark_crops, &mut self.rng),
            );
        }

        plan.set(
            Category::Negative,
            negative_crops(
                width,
                height,
                &annotation.bbox,
                self.config.negative_crops,
                self.config.max_negative_attempts,
                &mut self.rng,
            )?,
        );

        Ok(plan)
    }

    /// Crop, resize, label and store every window for one face.
    pub fn process_image<W: Write>(
        &mut self,
        annotation: &Annotation,
        image: &GrayImage,
        sink: &mut RecordSink<W>,
    ) -> Result<CategoryCounts> {
        let (width, height) = image.dimensions();
        let plan = self.plan(annotation, width, height)?;
        let mut written = CategoryCounts::default();

        for (category, window) in plan.iter() {
            let Some(patch) = extract_patch(image, window, self.config.patch_size) else {
                log::debug!(
                    "Skipping empty {} window {:?} in {}",
                    category,
                    window,
                    annotation.path.display()
                );
                continue;
            };
            sink.write(category, &OutputRecord::new(patch.into_raw(), category))?;
            written.add(category, 1);
        }

        log::debug!(
            "{} (subject {}): {} records",
            annotation.path.display(),
            annotation.subject,
            written.total()
        );
        Ok(written)
    }

    /// Load the face's image as grayscale and process it.
    pub fn process<W: Write>(
        &mut self,
        annotation: &Annotation,
        sink: &mut RecordSink<W>,
    ) -> Result<CategoryCounts> {
        let image = image::open(&annotation.path)
            .map_err(|source| Error::Image {
                path: annotation.path.clone(),
                source,
            })?
            .to_luma8();
        self.process_image(annotation, &image, sink)
    }

    /// Process a sequence of faces, stopping at the first error.
    ///
    /// `total` is only used for progress logging.
    pub fn run<'a, I, W>(
        &mut self,
        annotations: I,
        total: usize,
        sink: &mut RecordSink<W>,
    ) -> Result<RunSummary>
    where
        I: IntoIterator<Item = &'a Annotation>,
        W: Write,
    {
        const PROGRESS_EVERY: usize = 1000;

        let mut summary = RunSummary::default();
        for annotation in annotations {
            let counts = self.process(annotation, sink)?;
            summary.records.merge(&counts);
            summary.annotations += 1;

            if summary.annotations % PROGRESS_EVERY == 0 {
                log::info!("Processed {}/{} faces", summary.annotations, total);
            }
        }
        sink.flush()?;

        log::info!(
            "Finished {} faces, {} records written",
            summary.annotations,
            summary.records.total()
        );
        Ok(summary)
    }
}
