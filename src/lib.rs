//! Interactive foreground/background segmentation by graph cuts.
//!
//! Seed pixels fix some labels; a Gaussian (or histogram) model of each seed
//! set prices every other pixel, intensity contrast prices every cut between
//! neighbors, and a global min-cut picks the cheapest partition.
//!
//! ```no_run
//! use graphcut::{Pixel, PixelGrid, SegmentationConfig, SegmentationSession};
//!
//! # fn main() -> Result<(), graphcut::SegmentationError> {
//! let grid = PixelGrid::from_fn(64, 64, |p| if p.x < 32 { 200 } else { 20 })?;
//! let mut session = SegmentationSession::initialize(grid, SegmentationConfig::default())?;
//! let labeling = session.segment(&[Pixel::new(5, 5)], &[Pixel::new(60, 60)])?;
//! assert!(labeling.is_object(Pixel::new(10, 40)));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod cost;
pub mod error;
pub mod graph;
pub mod grid;
pub mod io;
pub mod seeds;
pub mod session;
pub mod solver;

pub use config::{BoundaryTerm, RegionalModel, SegmentationConfig, MAX_LAMBDA};
pub use error::{SeedError, SegmentationError};
pub use grid::{Neighborhood, Pixel, PixelGrid};
pub use session::{Label, Labeling, SegmentationSession};
pub use solver::{BoykovKolmogorov, EdmondsKarp, MaxFlowSolver, MinCut};
