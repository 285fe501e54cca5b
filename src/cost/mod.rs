pub mod types;

pub use types::{
    BoundaryCosts, GaussianFit, Histogram, IntensityModel, RegionalCost, RegionalCosts,
    LIKELIHOOD_FLOOR, STDDEV_FLOOR,
};

use crate::config::{BoundaryTerm, RegionalModel, SegmentationConfig};
use crate::error::{Result, SeedError};
use crate::grid::{Neighborhood, Pixel, PixelGrid};
use crate::seeds::{SeedMark, SeedMask};

/// Turns seeds and intensities into regional and boundary penalties
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    lambda: f64,
    sigma: f64,
    boundary_term: BoundaryTerm,
    regional_model: RegionalModel,
}

impl CostModel {
    pub fn new(config: &SegmentationConfig) -> Self {
        Self {
            lambda: config.lambda,
            sigma: config.sigma,
            boundary_term: config.boundary_term,
            regional_model: config.regional_model,
        }
    }

    /// Mean and deviation of the intensities at `points`; `None` if empty
    pub fn fit(&self, grid: &PixelGrid, points: &[Pixel]) -> Option<GaussianFit> {
        GaussianFit::from_intensities(points.iter().map(|&p| grid.intensity(p)))
    }

    pub fn histogram(&self, grid: &PixelGrid, points: &[Pixel]) -> Option<Histogram> {
        Histogram::from_intensities(points.iter().map(|&p| grid.intensity(p)))
    }

    /// Fit whichever distribution the configuration asks for
    pub fn intensity_model(&self, grid: &PixelGrid, points: &[Pixel]) -> Option<IntensityModel> {
        match self.regional_model {
            RegionalModel::Gaussian => self.fit(grid, points).map(IntensityModel::Gaussian),
            RegionalModel::Histogram => self
                .histogram(grid, points)
                .map(|h| IntensityModel::Histogram(Box::new(h))),
        }
    }

    /// `lambda * -ln(likelihood)` of `intensity` under `model`
    pub fn regional_cost(&self, intensity: u8, model: &IntensityModel) -> f64 {
        self.lambda * model.negative_log_likelihood(intensity)
    }

    /// Smoothness penalty for cutting between `a` and `b`
    pub fn boundary_cost(&self, grid: &PixelGrid, a: Pixel, b: Pixel) -> f64 {
        let distance = a.distance(&b);
        match self.boundary_term {
            BoundaryTerm::IntensityContrast => {
                // Scale before squaring; sigma^2 underflows for tiny sigma
                let z = (grid.intensity(a) as f64 - grid.intensity(b) as f64) / self.sigma;
                (-0.5 * z * z).exp() / distance
            }
            BoundaryTerm::DistanceOnly => 1.0 / distance,
        }
    }

    /// Weights for every adjacent pair, plus the hard-constraint constant K
    pub fn boundary_costs(&self, grid: &PixelGrid, neighborhood: Neighborhood) -> BoundaryCosts {
        let _span = tracing::debug_span!("boundary_costs").entered();

        let mut per_pixel = vec![0.0f64; grid.len()];
        let weights: Vec<f64> = grid
            .adjacent_pairs(neighborhood)
            .map(|(a, b)| {
                let w = self.boundary_cost(grid, grid.pixel_at(a), grid.pixel_at(b));
                per_pixel[a] += w;
                per_pixel[b] += w;
                w
            })
            .collect();

        let k_factor = 1.0 + per_pixel.iter().copied().fold(0.0, f64::max);

        tracing::debug!(
            "Computed {} boundary weights, K={:.4}",
            weights.len(),
            k_factor
        );

        BoundaryCosts { weights, k_factor }
    }

    /// Regional costs for every pixel; seeds get `0` for their own label and
    /// `k_factor` for the other one.
    pub fn compute_all_costs(
        &self,
        grid: &PixelGrid,
        seeds: &SeedMask,
        k_factor: f64,
    ) -> Result<RegionalCosts> {
        let _span = tracing::debug_span!("regional_costs").entered();

        let object = self
            .intensity_model(grid, seeds.object())
            .ok_or(SeedError::EmptyObject)?;
        let background = self
            .intensity_model(grid, seeds.background())
            .ok_or(SeedError::EmptyBackground)?;

        if let (IntensityModel::Gaussian(o), IntensityModel::Gaussian(b)) = (&object, &background) {
            tracing::debug!(
                "Object fit mean={:.2} std={:.2}, background fit mean={:.2} std={:.2}",
                o.mean,
                o.stddev,
                b.mean,
                b.stddev
            );
        }

        let costs = grid
            .intensities()
            .iter()
            .enumerate()
            .map(|(index, &intensity)| match seeds.mark_at(index) {
                SeedMark::Object => RegionalCost {
                    to_object: 0.0,
                    to_background: k_factor,
                },
                SeedMark::Background => RegionalCost {
                    to_object: k_factor,
                    to_background: 0.0,
                },
                SeedMark::Unseeded => RegionalCost {
                    to_object: self.regional_cost(intensity, &object),
                    to_background: self.regional_cost(intensity, &background),
                },
            })
            .collect();

        Ok(RegionalCosts { costs, k_factor })
    }
}
