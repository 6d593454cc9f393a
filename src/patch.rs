use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};

use crate::crops::CropWindow;

/// Trait for reading grayscale intensities with zero padding outside the image.
pub trait ImageAccess {
    /// Get the grayscale intensity at (x, y). Returns 0 for out-of-bounds pixels.
    fn get_pixel(&self, x: i64, y: i64) -> u8;

    /// Image dimensions.
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

impl ImageAccess for GrayImage {
    fn get_pixel(&self, x: i64, y: i64) -> u8 {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return 0;
        }
        image::GenericImageView::get_pixel(self, x as u32, y as u32)[0]
    }

    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }
}

/// Size of every extracted patch, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchSize {
    pub width: u32,
    pub height: u32,
}

impl PatchSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of bytes in a row-major grayscale patch.
    pub const fn len(&self) -> usize {
        (self.width * self.height) as usize
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for PatchSize {
    fn default() -> Self {
        Self::new(9, 6)
    }
}

/// Copy the pixels under `window` into a new buffer.
///
/// Corners are rounded to whole pixels. Parts of the window that fall
/// outside the image come back black. Returns `None` for a window that
/// rounds to zero width or height.
pub fn crop_padded<I: ImageAccess>(image: &I, window: &CropWindow) -> Option<GrayImage> {
    let (left, top, right, bottom) = window.pixel_bounds();
    if right <= left || bottom <= top {
        return None;
    }

    let width = u32::try_from(right - left).ok()?;
    let height = u32::try_from(bottom - top).ok()?;
    Some(GrayImage::from_fn(width, height, |x, y| {
        Luma([image.get_pixel(left + x as i64, top + y as i64)])
    }))
}

/// Crop `window` from `image` and shrink it to `size` with bilinear filtering.
pub fn extract_patch<I: ImageAccess>(
    image: &I,
    window: &CropWindow,
    size: PatchSize,
) -> Option<GrayImage> {
    if size.is_empty() {
        return None;
    }
    let region = crop_padded(image, window)?;
    Some(imageops::resize(
        &region,
        size.width,
        size.height,
        FilterType::Triangle,
    ))
}
