//! Conversions between image files and the segmentation core.
//! None of this is needed by the engine itself.

use crate::error::SegmentationError;
use crate::grid::{Pixel, PixelGrid};
use crate::session::{Label, Labeling};
use anyhow::{Context, Result};
use image::{GrayImage, Luma, Rgb, RgbImage};
use std::path::Path;

const OBJECT_TINT: [u8; 3] = [50, 180, 50];
const BACKGROUND_TINT: [u8; 3] = [180, 50, 50];
const TINT_ALPHA: f32 = 0.4;

/// Decode any supported image file into an 8-bit intensity grid
pub fn load_grid<P: AsRef<Path>>(path: P) -> Result<PixelGrid> {
    let path = path.as_ref();
    tracing::info!("Loading image from {}", path.display());

    let image = image::open(path)
        .with_context(|| format!("Failed to open image {}", path.display()))?
        .to_luma8();

    grid_from_luma(&image).context("Failed to build pixel grid")
}

pub fn grid_from_luma(image: &GrayImage) -> Result<PixelGrid, SegmentationError> {
    let (width, height) = image.dimensions();
    PixelGrid::new(width as usize, height as usize, image.as_raw().clone())
}

/// Object pixels white, background black
pub fn labeling_to_mask(labeling: &Labeling) -> GrayImage {
    GrayImage::from_fn(labeling.width() as u32, labeling.height() as u32, |x, y| {
        match labeling.get(Pixel::new(x as usize, y as usize)) {
            Label::Object => Luma([255]),
            Label::Background => Luma([0]),
        }
    })
}

/// Grayscale grid tinted green/red by label, seeds drawn in solid colour
pub fn render_overlay(
    grid: &PixelGrid,
    labeling: &Labeling,
    object_seeds: &[Pixel],
    background_seeds: &[Pixel],
) -> RgbImage {
    let mut image = RgbImage::from_fn(grid.width() as u32, grid.height() as u32, |x, y| {
        let pixel = Pixel::new(x as usize, y as usize);
        let value = grid.intensity(pixel) as f32;
        let tint = match labeling.get(pixel) {
            Label::Object => OBJECT_TINT,
            Label::Background => BACKGROUND_TINT,
        };
        Rgb(tint.map(|t| (value * (1.0 - TINT_ALPHA) + t as f32 * TINT_ALPHA).clamp(0.0, 255.0) as u8))
    });

    for (seeds, colour) in [(object_seeds, OBJECT_TINT), (background_seeds, BACKGROUND_TINT)] {
        for p in seeds.iter().filter(|p| grid.contains(**p)) {
            image.put_pixel(p.x as u32, p.y as u32, Rgb(colour));
        }
    }

    image
}
