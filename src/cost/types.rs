use std::f64::consts::PI;

/// Deviations below this many intensity levels are treated as degenerate.
///
/// With `stddev >= 1` the Gaussian density stays below `1 / sqrt(2 pi)`, so
/// the negative log-likelihood is always strictly positive.
pub const STDDEV_FLOOR: f64 = 1.0;

/// Smallest likelihood fed to the logarithm
pub const LIKELIHOOD_FLOOR: f64 = 1e-12;

/// Empirical mean and (population) standard deviation of a seed set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianFit {
    pub mean: f64,
    pub stddev: f64,
}

impl GaussianFit {
    /// Returns `None` for an empty sample. The deviation is clamped to
    /// [`STDDEV_FLOOR`].
    pub fn from_intensities<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = u8>,
    {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for v in values {
            let v = v as f64;
            count += 1;
            sum += v;
            sum_sq += v * v;
        }

        if count == 0 {
            return None;
        }

        let n = count as f64;
        let mean = sum / n;
        // Cancellation can push this slightly below zero
        let variance = (sum_sq / n - mean * mean).max(0.0);
        let raw = variance.sqrt();

        if raw < STDDEV_FLOOR {
            tracing::debug!(
                "Degenerate seed deviation {:.4} (n={}), flooring to {}",
                raw,
                count,
                STDDEV_FLOOR
            );
        }

        Some(Self {
            mean,
            stddev: raw.max(STDDEV_FLOOR),
        })
    }

    /// `-ln(max(pdf(intensity), LIKELIHOOD_FLOOR))`
    pub fn negative_log_likelihood(&self, intensity: u8) -> f64 {
        let z = (intensity as f64 - self.mean) / self.stddev;
        let nll = (self.stddev * (2.0 * PI).sqrt()).ln() + 0.5 * z * z;
        nll.min(-LIKELIHOOD_FLOOR.ln())
    }
}

/// Normalized intensity histogram of a seed set
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    probabilities: [f64; 256],
}

impl Histogram {
    pub fn from_intensities<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = u8>,
    {
        let mut counts = [0usize; 256];
        let mut total = 0usize;
        for v in values {
            counts[v as usize] += 1;
            total += 1;
        }

        if total == 0 {
            return None;
        }

        let mut probabilities = [0.0; 256];
        for (p, &c) in probabilities.iter_mut().zip(counts.iter()) {
            *p = c as f64 / total as f64;
        }
        Some(Self { probabilities })
    }

    pub fn probability(&self, intensity: u8) -> f64 {
        self.probabilities[intensity as usize]
    }

    pub fn negative_log_likelihood(&self, intensity: u8) -> f64 {
        -self.probability(intensity).max(LIKELIHOOD_FLOOR).ln()
    }
}

/// Intensity distribution learned from one seed set
#[derive(Debug, Clone, PartialEq)]
pub enum IntensityModel {
    Gaussian(GaussianFit),
    Histogram(Box<Histogram>),
}

impl IntensityModel {
    pub fn negative_log_likelihood(&self, intensity: u8) -> f64 {
        match self {
            IntensityModel::Gaussian(fit) => fit.negative_log_likelihood(intensity),
            IntensityModel::Histogram(hist) => hist.negative_log_likelihood(intensity),
        }
    }
}

/// Penalties for assigning one pixel to each label. Both are `>= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RegionalCost {
    pub to_object: f64,
    pub to_background: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionalCosts {
    pub costs: Vec<RegionalCost>,
    pub k_factor: f64,
}

/// Static smoothness weights, one per adjacent pair in
/// [`PixelGrid::adjacent_pairs`](crate::grid::PixelGrid::adjacent_pairs) order
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryCosts {
    pub weights: Vec<f64>,
    /// `1 + max` over pixels of the summed weights to all neighbors
    pub k_factor: f64,
}
