pub mod types;

pub use types::{Neighborhood, Pixel};

use crate::error::{Result, SegmentationError};
use ndarray::ArrayView2;

/// Immutable scalar intensity field, stored row-major (`y * width + x`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    intensities: Vec<u8>,
}

impl PixelGrid {
    pub fn new(width: usize, height: usize, intensities: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SegmentationError::EmptyGrid);
        }

        let expected = width.checked_mul(height).ok_or(SegmentationError::GridSize {
            expected: usize::MAX,
            actual: intensities.len(),
        })?;

        if intensities.len() != expected {
            return Err(SegmentationError::GridSize {
                expected,
                actual: intensities.len(),
            });
        }

        Ok(Self {
            width,
            height,
            intensities,
        })
    }

    /// Build from a `[height, width]` array view
    pub fn from_array(array: ArrayView2<'_, u8>) -> Result<Self> {
        let (height, width) = array.dim();
        let intensities = array.iter().copied().collect();
        Self::new(width, height, intensities)
    }

    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(Pixel) -> u8,
    {
        let mut intensities = Vec::with_capacity(width.saturating_mul(height));
        for y in 0..height {
            for x in 0..width {
                intensities.push(f(Pixel::new(x, y)));
            }
        }
        Self::new(width, height, intensities)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.intensities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intensities.is_empty()
    }

    pub fn intensities(&self) -> &[u8] {
        &self.intensities
    }

    pub fn contains(&self, pixel: Pixel) -> bool {
        pixel.x < self.width && pixel.y < self.height
    }

    pub fn index_of(&self, pixel: Pixel) -> usize {
        pixel.y * self.width + pixel.x
    }

    pub fn pixel_at(&self, index: usize) -> Pixel {
        Pixel::new(index % self.width, index / self.width)
    }

    /// Intensity of `pixel`, or `None` outside the grid
    pub fn intensity_at(&self, pixel: Pixel) -> Option<u8> {
        self.contains(pixel)
            .then(|| self.intensities[self.index_of(pixel)])
    }

    /// Intensity of `pixel`
    ///
    /// # Panics
    ///
    /// If `pixel` lies outside the grid.
    pub fn intensity(&self, pixel: Pixel) -> u8 {
        match self.intensity_at(pixel) {
            Some(value) => value,
            None => panic!(
                "pixel {pixel} outside the {}x{} grid",
                self.width, self.height
            ),
        }
    }

    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        (0..self.len()).map(|i| self.pixel_at(i))
    }

    /// Every unordered pair of adjacent pixels, as flat indices.
    pub fn adjacent_pairs(
        &self,
        neighborhood: Neighborhood,
    ) -> impl Iterator<Item = (usize, usize)> {
        adjacent_pairs(self.width, self.height, neighborhood)
    }
}

/// Every unordered pair of adjacent pixels of a `width x height` lattice.
///
/// The order is fixed for a given size and neighborhood, so cost vectors and
/// graph edges built from it line up index by index.
pub fn adjacent_pairs(
    width: usize,
    height: usize,
    neighborhood: Neighborhood,
) -> impl Iterator<Item = (usize, usize)> {
    let offsets = neighborhood.forward_offsets();
    (0..width * height).flat_map(move |index| {
        let (x, y) = (index % width, index / width);
        offsets.iter().filter_map(move |&(dx, dy)| {
            let nx = x.checked_add_signed(dx)?;
            let ny = y.checked_add_signed(dy)?;
            (nx < width && ny < height).then_some((index, ny * width + nx))
        })
    })
}
