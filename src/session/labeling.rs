use crate::grid::Pixel;
use ndarray::Array2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Object,
    Background,
}

/// Binary partition of every pixel, produced by one `segment` call
#[derive(Debug, Clone, PartialEq)]
pub struct Labeling {
    width: usize,
    height: usize,
    labels: Vec<Label>,
    cut_value: f64,
    k_factor: f64,
}

impl Labeling {
    pub(crate) fn new(
        width: usize,
        height: usize,
        labels: Vec<Label>,
        cut_value: f64,
        k_factor: f64,
    ) -> Self {
        Self {
            width,
            height,
            labels,
            cut_value,
            k_factor,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major labels, `y * width + x`
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Label of `pixel`, or `None` outside the grid
    pub fn label_at(&self, pixel: Pixel) -> Option<Label> {
        (pixel.x < self.width && pixel.y < self.height)
            .then(|| self.labels[pixel.y * self.width + pixel.x])
    }

    /// Label of `pixel`
    ///
    /// # Panics
    ///
    /// If `pixel` lies outside the grid. Use [`Labeling::label_at`] for
    /// unchecked input.
    pub fn get(&self, pixel: Pixel) -> Label {
        match self.label_at(pixel) {
            Some(label) => label,
            None => panic!(
                "pixel {pixel} outside the {}x{} labeling",
                self.width, self.height
            ),
        }
    }

    pub fn is_object(&self, pixel: Pixel) -> bool {
        self.get(pixel) == Label::Object
    }

    pub fn count(&self, label: Label) -> usize {
        self.labels.iter().filter(|&&l| l == label).count()
    }

    /// Total weight of the edges severed by the cut (the minimized energy)
    pub fn cut_value(&self) -> f64 {
        self.cut_value
    }

    /// Hard-constraint constant used for the seeds of this labeling
    pub fn k_factor(&self) -> f64 {
        self.k_factor
    }

    pub fn object_pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == Label::Object)
            .map(|(i, _)| Pixel::new(i % self.width, i / self.width))
    }

    /// `[height, width]` mask, 1 for object and 0 for background
    pub fn to_array(&self) -> Array2<u8> {
        Array2::from_shape_fn((self.height, self.width), |(y, x)| {
            match self.labels[y * self.width + x] {
                Label::Object => 1,
                Label::Background => 0,
            }
        })
    }
}
