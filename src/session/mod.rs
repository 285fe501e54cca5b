mod labeling;

pub use labeling::{Label, Labeling};

use crate::config::SegmentationConfig;
use crate::cost::{BoundaryCosts, CostModel};
use crate::error::Result;
use crate::graph::{EdgeWeight, FlowGraph};
use crate::grid::{Pixel, PixelGrid};
use crate::seeds::SeedMask;
use crate::solver::{create_default_solver, MaxFlowSolver};

/// Owns the grid, the cached boundary costs and the flow graph, and turns
/// seed sets into labelings.
///
/// Construction is the `initialize` step: boundary costs and topology are
/// built once here. Each `segment` call only rewrites terminal weights and
/// re-runs the solver. Calls are blocking and not cancellable; callers that
/// need responsiveness run the session on a worker thread and serialize
/// requests themselves.
pub struct SegmentationSession {
    grid: PixelGrid,
    config: SegmentationConfig,
    cost_model: CostModel,
    boundary: BoundaryCosts,
    graph: FlowGraph,
    solver: Box<dyn MaxFlowSolver>,
    seeds: SeedMask,
    labeling: Option<Labeling>,
}

impl SegmentationSession {
    /// Build the boundary-cost cache and the graph topology for `grid`
    pub fn initialize(grid: PixelGrid, config: SegmentationConfig) -> Result<Self> {
        Self::with_solver(grid, config, create_default_solver())
    }

    pub fn with_solver(
        grid: PixelGrid,
        config: SegmentationConfig,
        solver: Box<dyn MaxFlowSolver>,
    ) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            "Initializing session for {}x{} grid ({:?} neighborhood, {} solver)",
            grid.width(),
            grid.height(),
            config.neighborhood,
            solver.name()
        );

        let cost_model = CostModel::new(&config);
        let (boundary, graph) = Self::build_graph(&grid, &config, &cost_model)?;
        let seeds = SeedMask::new(grid.width(), grid.height());

        tracing::info!("Session ready, K={:.4}", boundary.k_factor);

        Ok(Self {
            grid,
            config,
            cost_model,
            boundary,
            graph,
            solver,
            seeds,
            labeling: None,
        })
    }

    fn build_graph(
        grid: &PixelGrid,
        config: &SegmentationConfig,
        cost_model: &CostModel,
    ) -> Result<(BoundaryCosts, FlowGraph)> {
        let boundary = cost_model.boundary_costs(grid, config.neighborhood);
        let mut graph = FlowGraph::build_topology(grid.width(), grid.height(), config.neighborhood);
        graph.update_boundary_weights(&boundary.weights)?;
        Ok((boundary, graph))
    }

    /// Partition the grid given object and background seeds.
    ///
    /// Both sets must be non-empty, disjoint and inside the grid, otherwise
    /// `InvalidSeedSet` is returned and the previous labeling is kept.
    pub fn segment(&mut self, object: &[Pixel], background: &[Pixel]) -> Result<&Labeling> {
        let _span = tracing::debug_span!("segment").entered();

        self.config.validate()?;
        self.seeds.fill(object, background)?;

        let regional =
            self.cost_model
                .compute_all_costs(&self.grid, &self.seeds, self.boundary.k_factor)?;

        {
            let _span = tracing::debug_span!("update_weights").entered();
            self.graph.update_terminal_weights(&regional.costs)?;
        }

        let cut = self.solver.solve(&self.graph)?;

        let labels = (0..self.grid.len())
            .map(|node| {
                if cut.is_source_side(node) {
                    Label::Object
                } else {
                    Label::Background
                }
            })
            .collect();
        let labeling = Labeling::new(
            self.grid.width(),
            self.grid.height(),
            labels,
            cut.flow,
            regional.k_factor,
        );

        tracing::debug!(
            "Segmented {} object / {} background seeds: {} of {} pixels object, cut={:.4}",
            self.seeds.object().len(),
            self.seeds.background().len(),
            labeling.count(Label::Object),
            self.grid.len(),
            labeling.cut_value()
        );

        Ok(&*self.labeling.insert(labeling))
    }

    /// Swap in new parameters.
    ///
    /// `lambda` and the regional model apply from the next `segment`. A new
    /// `sigma` or boundary term recomputes the cached boundary weights, a new
    /// neighborhood rebuilds the topology. On error nothing changes.
    pub fn reconfigure(&mut self, config: SegmentationConfig) -> Result<()> {
        config.validate()?;

        let cost_model = CostModel::new(&config);
        if config.neighborhood != self.config.neighborhood {
            let (boundary, graph) = Self::build_graph(&self.grid, &config, &cost_model)?;
            self.boundary = boundary;
            self.graph = graph;
        } else if self.config.boundary_differs(&config) {
            let boundary = cost_model.boundary_costs(&self.grid, config.neighborhood);
            self.graph.update_boundary_weights(&boundary.weights)?;
            self.boundary = boundary;
        }

        tracing::info!(
            "Reconfigured: lambda={} sigma={} {:?} {:?}/{:?}",
            config.lambda,
            config.sigma,
            config.neighborhood,
            config.boundary_term,
            config.regional_model
        );

        self.cost_model = cost_model;
        self.config = config;
        Ok(())
    }

    /// Result of the last successful `segment`
    pub fn labeling(&self) -> Option<&Labeling> {
        self.labeling.as_ref()
    }

    pub fn k_factor(&self) -> f64 {
        self.boundary.k_factor
    }

    pub fn boundary_costs(&self) -> &BoundaryCosts {
        &self.boundary
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    /// Current weights of every graph edge, for visualization
    pub fn edge_weights(&self) -> Vec<EdgeWeight> {
        self.graph.edge_weights()
    }

    pub fn grid(&self) -> &PixelGrid {
        &self.grid
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BoundaryTerm, RegionalModel};
    use crate::cost::IntensityModel;
    use crate::error::{SeedError, SegmentationError};
    use crate::graph::Node;
    use crate::grid::Neighborhood;
    use crate::solver::EdmondsKarp;

    /// 4x4 dark grid with a bright 2x2 block in the top-left corner
    fn corner_block() -> PixelGrid {
        PixelGrid::from_fn(4, 4, |p| if p.x < 2 && p.y < 2 { 255 } else { 0 })
            .expect("valid grid")
    }

    fn lcg(state: &mut u64) -> u64 {
        *state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        *state >> 33
    }

    fn noisy_grid(width: usize, height: usize, seed: u64) -> PixelGrid {
        let mut state = seed;
        PixelGrid::from_fn(width, height, |_| (lcg(&mut state) % 256) as u8).expect("valid grid")
    }

    #[test]
    fn bright_corner_block_is_the_object() {
        let mut session =
            SegmentationSession::initialize(corner_block(), SegmentationConfig::default())
                .expect("session");
        let labeling = session
            .segment(&[Pixel::new(0, 0)], &[Pixel::new(3, 3)])
            .expect("segmented");

        for y in 0..4 {
            for x in 0..4 {
                let expected = if x < 2 && y < 2 {
                    Label::Object
                } else {
                    Label::Background
                };
                assert_eq!(labeling.get(Pixel::new(x, y)), expected, "pixel ({x}, {y})");
            }
        }
        assert_eq!(labeling.count(Label::Object), 4);
    }

    #[test]
    fn reference_solver_agrees_on_corner_block() {
        let mut bk = SegmentationSession::initialize(corner_block(), SegmentationConfig::default())
            .expect("session");
        let mut ek = SegmentationSession::with_solver(
            corner_block(),
            SegmentationConfig::default(),
            Box::new(EdmondsKarp::new()),
        )
        .expect("session");

        let seeds = ([Pixel::new(1, 0)], [Pixel::new(0, 3)]);
        let a = bk.segment(&seeds.0, &seeds.1).expect("segmented").clone();
        let b = ek.segment(&seeds.0, &seeds.1).expect("segmented").clone();
        assert_eq!(a.labels(), b.labels());
        assert!((a.cut_value() - b.cut_value()).abs() < 1e-9);
        assert_eq!(ek.solver_name(), "edmonds-karp");
    }

    #[test]
    fn distance_only_boundary_still_finds_block() {
        let config = SegmentationConfig::default().with_boundary_term(BoundaryTerm::DistanceOnly);
        let mut session = SegmentationSession::initialize(corner_block(), config).expect("session");

        for e in session.edge_weights() {
            if let (Node::Pixel(a), Node::Pixel(b)) = (e.from, e.to) {
                let d = session.grid().pixel_at(a).distance(&session.grid().pixel_at(b));
                assert_eq!(e.weight, 1.0 / d);
            }
        }

        let labeling = session
            .segment(&[Pixel::new(0, 0)], &[Pixel::new(3, 3)])
            .expect("segmented");
        assert_eq!(labeling.count(Label::Object), 4);
        assert!(labeling.is_object(Pixel::new(1, 1)));
    }

    #[test]
    fn seeds_keep_their_labels_for_any_parameters() {
        let grid = noisy_grid(9, 7, 3);
        let mut state = 11u64;
        let mut object = Vec::new();
        let mut background = Vec::new();
        for p in grid.pixels() {
            match lcg(&mut state) % 6 {
                0 => object.push(p),
                1 => background.push(p),
                _ => {}
            }
        }
        assert!(!object.is_empty() && !background.is_empty());

        for lambda in [0.05, 2.0, 75.0] {
            for sigma in [3.0, 30.0, 400.0] {
                for neighborhood in [Neighborhood::Four, Neighborhood::Eight] {
                    let config = SegmentationConfig::default()
                        .with_lambda(lambda)
                        .with_sigma(sigma)
                        .with_neighborhood(neighborhood);
                    let mut session =
                        SegmentationSession::initialize(grid.clone(), config).expect("session");
                    let labeling = session.segment(&object, &background).expect("segmented");

                    assert!(object.iter().all(|&p| labeling.get(p) == Label::Object));
                    assert!(background.iter().all(|&p| labeling.get(p) == Label::Background));
                }
            }
        }
    }

    #[test]
    fn repeated_calls_are_identical() {
        let grid = noisy_grid(12, 10, 5);
        let object = [Pixel::new(1, 1), Pixel::new(2, 8)];
        let background = [Pixel::new(10, 1), Pixel::new(9, 9)];

        let mut session =
            SegmentationSession::initialize(grid, SegmentationConfig::default()).expect("session");
        let first = session.segment(&object, &background).expect("segmented").clone();
        let second = session.segment(&object, &background).expect("segmented").clone();
        assert_eq!(first, second);
    }

    #[test]
    fn larger_lambda_trusts_regional_costs_more() {
        let grid = PixelGrid::from_fn(8, 6, |p| {
            let base: i32 = if p.x < 4 { 90 } else { 150 };
            let noise = ((p.x * 7 + p.y * 13) % 5) as i32 * 12 - 24;
            (base + noise) as u8
        })
        .expect("valid grid");
        let object = [Pixel::new(0, 0), Pixel::new(0, 5), Pixel::new(1, 2)];
        let background = [Pixel::new(7, 0), Pixel::new(7, 5), Pixel::new(6, 3)];

        // Unscaled regional models, to score labelings independently of lambda
        let unit = CostModel::new(&SegmentationConfig::default().with_lambda(1.0));
        let mask = SeedMask::from_seeds(8, 6, &object, &background).expect("valid seeds");
        let object_model = IntensityModel::Gaussian(unit.fit(&grid, mask.object()).expect("fit"));
        let background_model =
            IntensityModel::Gaussian(unit.fit(&grid, mask.background()).expect("fit"));

        let regional_energy = |labeling: &Labeling| -> f64 {
            grid.pixels()
                .filter(|p| !object.contains(p) && !background.contains(p))
                .map(|p| {
                    let v = grid.intensity(p);
                    match labeling.get(p) {
                        Label::Object => unit.regional_cost(v, &object_model),
                        Label::Background => unit.regional_cost(v, &background_model),
                    }
                })
                .sum()
        };

        let mut session =
            SegmentationSession::initialize(grid.clone(), SegmentationConfig::default())
                .expect("session");
        let mut previous = f64::INFINITY;
        let mut last = None;
        for lambda in [0.01, 0.1, 0.5, 2.0, 10.0, 1e4] {
            session
                .reconfigure(SegmentationConfig::default().with_lambda(lambda))
                .expect("valid config");
            let labeling = session.segment(&object, &background).expect("segmented").clone();
            let energy = regional_energy(&labeling);
            assert!(
                energy <= previous + 1e-6,
                "regional energy rose to {energy} from {previous} at lambda {lambda}"
            );
            previous = energy;
            last = Some(labeling);
        }

        // With a dominant regional term every clear-cut pixel follows its likelihood
        let last = last.expect("ran");
        for p in grid.pixels() {
            if object.contains(&p) || background.contains(&p) {
                continue;
            }
            let v = grid.intensity(p);
            let margin = unit.regional_cost(v, &object_model) - unit.regional_cost(v, &background_model);
            if margin.abs() > 1e-3 {
                let expected = if margin < 0.0 {
                    Label::Object
                } else {
                    Label::Background
                };
                assert_eq!(last.get(p), expected, "pixel {p}");
            }
        }
    }

    #[test]
    fn uniform_seed_sets_stay_finite() {
        let mut session =
            SegmentationSession::initialize(corner_block(), SegmentationConfig::default())
                .expect("session");
        let object = [Pixel::new(0, 0), Pixel::new(1, 0), Pixel::new(0, 1)];
        let background = [Pixel::new(3, 3), Pixel::new(2, 3), Pixel::new(3, 2)];
        let labeling = session.segment(&object, &background).expect("segmented").clone();

        assert!(labeling.cut_value().is_finite());
        assert!(session.edge_weights().iter().all(|e| e.weight.is_finite() && e.weight >= 0.0));
        assert!(labeling.is_object(Pixel::new(1, 1)));
    }

    #[test]
    fn invalid_seeds_keep_previous_labeling() {
        let mut session =
            SegmentationSession::initialize(corner_block(), SegmentationConfig::default())
                .expect("session");
        let before = session
            .segment(&[Pixel::new(0, 0)], &[Pixel::new(3, 3)])
            .expect("segmented")
            .clone();

        let err = session.segment(&[], &[Pixel::new(3, 3)]).unwrap_err();
        assert_eq!(err, SegmentationError::InvalidSeedSet(SeedError::EmptyObject));
        assert_eq!(session.labeling(), Some(&before));

        let p = Pixel::new(2, 2);
        let err = session.segment(&[p], &[p]).unwrap_err();
        assert_eq!(err, SegmentationError::InvalidSeedSet(SeedError::Overlap(p)));

        let err = session
            .segment(&[Pixel::new(4, 0)], &[Pixel::new(3, 3)])
            .unwrap_err();
        assert!(matches!(
            err,
            SegmentationError::InvalidSeedSet(SeedError::OutOfBounds { .. })
        ));
        assert_eq!(session.labeling(), Some(&before));
    }

    #[test]
    fn no_labeling_before_first_segment() {
        let session =
            SegmentationSession::initialize(corner_block(), SegmentationConfig::default())
                .expect("session");
        assert!(session.labeling().is_none());
        assert!(session.k_factor() > 1.0);
    }

    #[test]
    fn rejects_invalid_initial_config() {
        let result = SegmentationSession::initialize(
            corner_block(),
            SegmentationConfig::default().with_sigma(-1.0),
        );
        assert!(matches!(
            result,
            Err(SegmentationError::InvalidConfig {
                parameter: "sigma",
                ..
            })
        ));
    }

    #[test]
    fn reconfigure_touches_only_what_changed() {
        let grid = noisy_grid(6, 5, 9);
        let mut session =
            SegmentationSession::initialize(grid, SegmentationConfig::default()).expect("session");
        let weights = session.boundary_costs().weights.clone();
        let arcs = session.graph().arc_count();

        session
            .reconfigure(SegmentationConfig::default().with_lambda(8.0))
            .expect("valid config");
        assert_eq!(session.boundary_costs().weights, weights);

        session
            .reconfigure(SegmentationConfig::default().with_lambda(8.0).with_sigma(5.0))
            .expect("valid config");
        assert_ne!(session.boundary_costs().weights, weights);

        session
            .reconfigure(SegmentationConfig::default().with_neighborhood(Neighborhood::Four))
            .expect("valid config");
        assert!(session.graph().arc_count() < arcs);
        assert_eq!(session.graph().neighborhood(), Neighborhood::Four);

        let before = *session.config();
        assert!(session
            .reconfigure(SegmentationConfig::default().with_lambda(f64::INFINITY))
            .is_err());
        assert_eq!(*session.config(), before);
    }

    #[test]
    fn histogram_model_segments_corner_block() {
        let config = SegmentationConfig::default().with_regional_model(RegionalModel::Histogram);
        let mut session = SegmentationSession::initialize(corner_block(), config).expect("session");
        let labeling = session
            .segment(&[Pixel::new(0, 0)], &[Pixel::new(3, 3)])
            .expect("segmented");
        assert_eq!(labeling.count(Label::Object), 4);
    }

    #[test]
    fn exported_graph_has_pixel_count_plus_terminals() {
        let session =
            SegmentationSession::initialize(corner_block(), SegmentationConfig::default())
                .expect("session");
        assert_eq!(session.graph().node_count(), 16 + 2);

        let pairs = session.grid().adjacent_pairs(Neighborhood::Eight).count();
        assert_eq!(session.edge_weights().len(), 2 * pairs + 2 * 16);
    }

    #[test]
    fn vanishing_sigma_keeps_edge_weights_finite() {
        let config = SegmentationConfig::default().with_sigma(1e-200);
        let mut session = SegmentationSession::initialize(corner_block(), config).expect("session");
        assert!(session
            .edge_weights()
            .iter()
            .filter(|e| matches!((e.from, e.to), (Node::Pixel(_), Node::Pixel(_))))
            .all(|e| e.weight.is_finite() && e.weight >= 0.0));

        let labeling = session
            .segment(&[Pixel::new(0, 0)], &[Pixel::new(3, 3)])
            .expect("segmented");
        assert_eq!(labeling.count(Label::Object), 4);
        assert!(labeling.cut_value().is_finite());
        assert!(session.edge_weights().iter().all(|e| e.weight.is_finite()));
    }
}
