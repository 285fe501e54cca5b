use crate::error::{Result, SegmentationError};
use crate::grid::Neighborhood;

/// How the smoothness penalty between two neighbors is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryTerm {
    /// `exp(-(Ia - Ib)^2 / (2 sigma^2)) / distance`
    #[default]
    IntensityContrast,
    /// `1 / distance`. Matches the historical output where the intensity
    /// difference was taken between a pixel and itself.
    DistanceOnly,
}

/// Intensity distribution fitted to each seed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionalModel {
    #[default]
    Gaussian,
    Histogram,
}

/// Largest accepted `lambda`. Beyond this the scaled regional costs of a
/// large image no longer sum to a finite cut value.
pub const MAX_LAMBDA: f64 = 1e12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentationConfig {
    /// Weight of the regional term relative to the boundary term,
    /// in `(0, MAX_LAMBDA]`
    pub lambda: f64,
    /// Intensity bandwidth of the boundary term
    pub sigma: f64,
    pub neighborhood: Neighborhood,
    pub boundary_term: BoundaryTerm,
    pub regional_model: RegionalModel,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            lambda: 2.0,
            sigma: 30.0,
            neighborhood: Neighborhood::Eight,
            boundary_term: BoundaryTerm::IntensityContrast,
            regional_model: RegionalModel::Gaussian,
        }
    }
}

impl SegmentationConfig {
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn with_neighborhood(mut self, neighborhood: Neighborhood) -> Self {
        self.neighborhood = neighborhood;
        self
    }

    pub fn with_boundary_term(mut self, boundary_term: BoundaryTerm) -> Self {
        self.boundary_term = boundary_term;
        self
    }

    pub fn with_regional_model(mut self, regional_model: RegionalModel) -> Self {
        self.regional_model = regional_model;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_positive("lambda", self.lambda)?;
        if self.lambda > MAX_LAMBDA {
            return Err(SegmentationError::InvalidConfig {
                parameter: "lambda",
                value: self.lambda,
            });
        }
        check_positive("sigma", self.sigma)?;
        Ok(())
    }

    /// True when switching to `other` invalidates the cached boundary costs
    pub(crate) fn boundary_differs(&self, other: &SegmentationConfig) -> bool {
        self.sigma != other.sigma
            || self.boundary_term != other.boundary_term
            || self.neighborhood != other.neighborhood
    }
}

fn check_positive(parameter: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SegmentationError::InvalidConfig { parameter, value })
    }
}
