//! Crop window generation.
//!
//! Positive windows are drawn from a dense grid of small shifts around a
//! landmark; negative windows are sampled uniformly over the image and kept
//! only when they miss the face entirely.

use rand::seq::index;
use rand::Rng;

use crate::error::{Error, Result};
use crate::types::{BoundingBox, Point};

/// Axis-aligned crop region given by its corners, in source pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropWindow {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl CropWindow {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Window of the given full size centered on `center`.
    pub fn centered(center: Point, width: f64, height: f64) -> Self {
        Self::new(
            center.x - width / 2.0,
            center.y - height / 2.0,
            center.x + width / 2.0,
            center.y + height / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn to_bbox(&self) -> BoundingBox {
        BoundingBox::new(self.x1, self.y1, self.width(), self.height())
    }

    /// Corners rounded to whole pixels, as `(left, top, right, bottom)`.
    pub fn pixel_bounds(&self) -> (i64, i64, i64, i64) {
        (
            self.x1.round() as i64,
            self.y1.round() as i64,
            self.x2.round() as i64,
            self.y2.round() as i64,
        )
    }
}

/// Shifted windows around a landmark for a crop scale of `w`.
///
/// Horizontal shifts cover `trunc(-w/4)..=trunc(w/4)` and vertical shifts
/// `trunc(-w/6)..=trunc(w/6)`. Every window is `w` wide and `2w/3` tall.
/// Windows are indexed row-major over `(a, b)` and built on demand, so a
/// huge face never materializes the whole grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropGrid {
    center: Point,
    w: f64,
    a_min: i64,
    b_min: i64,
    a_steps: usize,
    b_steps: usize,
}

impl CropGrid {
    pub fn new(center: Point, w: f64) -> Self {
        let a_min = (-w / 4.0) as i64;
        let a_max = (w / 4.0) as i64;
        let b_min = (-w / 6.0) as i64;
        let b_max = (w / 6.0) as i64;
        Self {
            center,
            w,
            a_min,
            b_min,
            a_steps: (a_max - a_min + 1).max(0) as usize,
            b_steps: (b_max - b_min + 1).max(0) as usize,
        }
    }

    /// Number of windows in the grid.
    pub fn len(&self) -> usize {
        self.a_steps.saturating_mul(self.b_steps)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Window at `index`, or `None` past the end of the grid.
    pub fn window(&self, index: usize) -> Option<CropWindow> {
        if index >= self.len() {
            return None;
        }
        let a = self.a_min + (index / self.b_steps) as i64;
        let b = self.b_min + (index % self.b_steps) as i64;
        let shifted = Point::new(self.center.x + a as f64, self.center.y + b as f64);
        Some(CropWindow::centered(shifted, self.w, 2.0 * self.w / 3.0))
    }

    pub fn iter(&self) -> impl Iterator<Item = CropWindow> + '_ {
        (0..self.len()).filter_map(move |i| self.window(i))
    }
}

/// Pick `count` distinct grid windows in random order.
///
/// Equivalent to shuffling the whole grid and keeping the first `count`
/// windows, without building the grid.
pub fn landmark_crops<R: Rng + ?Sized>(
    center: Point,
    w: f64,
    count: usize,
    rng: &mut R,
) -> Vec<CropWindow> {
    let grid = CropGrid::new(center, w);
    if grid.is_empty() {
        return Vec::new();
    }
    let amount = count.min(grid.len());
    index::sample(rng, grid.len(), amount)
        .into_iter()
        .filter_map(|i| grid.window(i))
        .collect()
}

/// Draw one candidate negative window, or `None` when the random ranges
/// are empty for this image size.
fn sample_negative<R: Rng + ?Sized>(width: u32, height: u32, rng: &mut R) -> Option<CropWindow> {
    const MIN_WIDTH: u32 = 3;
    if width < MIN_WIDTH {
        return None;
    }

    let w = rng.gen_range(MIN_WIDTH..=width);
    let h = (w as f64 / 1.5) as u32;
    if h > height {
        return None;
    }

    let x = rng.gen_range(0..=width - w);
    let y = rng.gen_range(0..=height - h);
    Some(CropWindow::new(
        x as f64,
        y as f64,
        (x + w) as f64,
        (y + h) as f64,
    ))
}

/// Sample `count` windows that share no area with `face`.
///
/// Gives up with [`Error::NegativeSamplingExhausted`] after `max_attempts`
/// draws, counting draws whose random ranges were empty.
pub fn negative_crops<R: Rng + ?Sized>(
    width: u32,
    height: u32,
    face: &BoundingBox,
    count: usize,
    max_attempts: usize,
    rng: &mut R,
) -> Result<Vec<CropWindow>> {
    let mut windows = Vec::with_capacity(count);
    let mut attempts = 0;

    while windows.len() < count {
        if attempts >= max_attempts {
            return Err(Error::NegativeSamplingExhausted {
                attempts,
                width,
                height,
            });
        }
        attempts += 1;

        match sample_negative(width, height, rng) {
            Some(window) if face.intersection_area(&window.to_bbox()) == 0.0 => {
                windows.push(window);
            }
            Some(window) => log::trace!("Negative window {:?} overlaps the face", window),
            None => log::trace!("No valid negative range for {}x{} image", width, height),
        }
    }

    Ok(windows)
}
