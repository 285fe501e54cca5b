use crate::error::SeedError;
use crate::grid::Pixel;

/// Seed state of a single pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedMark {
    #[default]
    Unseeded,
    Object,
    Background,
}

/// Flat `width * height` seed lookup, reused across `segment` calls.
///
/// Also keeps the distinct seed pixels of each set in insertion order, so the
/// statistics never count a duplicated seed twice.
#[derive(Debug, Clone)]
pub struct SeedMask {
    width: usize,
    height: usize,
    marks: Vec<SeedMark>,
    object: Vec<Pixel>,
    background: Vec<Pixel>,
}

impl SeedMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            marks: vec![SeedMark::Unseeded; width * height],
            object: Vec::new(),
            background: Vec::new(),
        }
    }

    /// Build a mask in one go, validating both sets
    pub fn from_seeds(
        width: usize,
        height: usize,
        object: &[Pixel],
        background: &[Pixel],
    ) -> Result<Self, SeedError> {
        let mut mask = Self::new(width, height);
        mask.fill(object, background)?;
        Ok(mask)
    }

    /// Replace the current contents with the given seed sets.
    ///
    /// Both sets must be non-empty, inside the grid and disjoint. On error the
    /// mask is left empty.
    pub fn fill(&mut self, object: &[Pixel], background: &[Pixel]) -> Result<(), SeedError> {
        self.clear();

        if object.is_empty() {
            return Err(SeedError::EmptyObject);
        }
        if background.is_empty() {
            return Err(SeedError::EmptyBackground);
        }

        let result = self
            .mark_all(object, SeedMark::Object)
            .and_then(|_| self.mark_all(background, SeedMark::Background));

        if result.is_err() {
            self.clear();
        }
        result
    }

    fn mark_all(&mut self, pixels: &[Pixel], mark: SeedMark) -> Result<(), SeedError> {
        for &pixel in pixels {
            if pixel.x >= self.width || pixel.y >= self.height {
                return Err(SeedError::OutOfBounds {
                    pixel,
                    width: self.width,
                    height: self.height,
                });
            }

            let index = pixel.y * self.width + pixel.x;
            match self.marks[index] {
                SeedMark::Unseeded => {
                    self.marks[index] = mark;
                    match mark {
                        SeedMark::Object => self.object.push(pixel),
                        SeedMark::Background => self.background.push(pixel),
                        SeedMark::Unseeded => {}
                    }
                }
                existing if existing == mark => {}
                _ => return Err(SeedError::Overlap(pixel)),
            }
        }
        Ok(())
    }

    fn clear(&mut self) {
        for &pixel in self.object.iter().chain(&self.background) {
            self.marks[pixel.y * self.width + pixel.x] = SeedMark::Unseeded;
        }
        self.object.clear();
        self.background.clear();
    }

    pub fn mark_at(&self, index: usize) -> SeedMark {
        self.marks[index]
    }

    pub fn object(&self) -> &[Pixel] {
        &self.object
    }

    pub fn background(&self) -> &[Pixel] {
        &self.background
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}
