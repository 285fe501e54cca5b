use std::fmt;

/// Integer pixel coordinate, `0 <= x < width`, `0 <= y < height`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pixel {
    pub x: usize,
    pub y: usize,
}

impl Pixel {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Manhattan distance on the pixel lattice
    pub fn distance(&self, other: &Pixel) -> f64 {
        (self.x.abs_diff(other.x) + self.y.abs_diff(other.y)) as f64
    }
}

impl fmt::Display for Pixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(usize, usize)> for Pixel {
    fn from((x, y): (usize, usize)) -> Self {
        Self { x, y }
    }
}

/// Pixel adjacency used for boundary edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Neighborhood {
    Four,
    #[default]
    Eight,
}

impl Neighborhood {
    /// Half of the neighbor offsets. Every unordered pair of adjacent pixels
    /// is produced by exactly one of these; the mirror direction is implied.
    pub fn forward_offsets(self) -> &'static [(isize, isize)] {
        match self {
            Neighborhood::Four => &[(1, 0), (0, 1)],
            Neighborhood::Eight => &[(1, 0), (0, 1), (1, 1), (-1, 1)],
        }
    }

    /// Number of neighbors of an interior pixel
    pub fn degree(self) -> usize {
        self.forward_offsets().len() * 2
    }
}
