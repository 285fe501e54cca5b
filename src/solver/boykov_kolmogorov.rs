use super::{check_terminals, residual_reachable, MaxFlowSolver, MinCut};
use crate::error::Result;
use crate::graph::{ArcId, FlowGraph, NodeId};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tree {
    Free,
    Source,
    Sink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parent {
    /// No valid parent: free node, or an orphan awaiting adoption
    Orphan,
    /// The node is the source or the sink itself
    Terminal,
    /// Arc from the node to its parent
    Arc(ArcId),
}

/// Boykov-Kolmogorov augmenting-path max-flow.
///
/// Two search trees grow from the source and the sink and are reused between
/// augmentations instead of being rebuilt, which pays off on the short,
/// locally connected paths of pixel lattices. Orphans left behind by an
/// augmentation are re-attached preferring the shortest valid path to their
/// terminal, using per-node timestamps and distances to avoid re-walking the
/// same subtrees.
///
/// Before the search, flow is pushed straight through every pixel's
/// `source -> p -> sink` pair, so only the remainder has to travel across
/// neighbor arcs. Each active node resumes its arc scan where it stopped
/// and restarts only when it is re-activated.
///
/// Working buffers are kept between calls so repeated segmentations on the
/// same graph do not reallocate.
#[derive(Debug, Default)]
pub struct BoykovKolmogorov {
    residual: Vec<f64>,
    tree: Vec<Tree>,
    parent: Vec<Parent>,
    timestamp: Vec<u64>,
    distance: Vec<usize>,
    active: VecDeque<NodeId>,
    is_active: Vec<bool>,
    /// Next arc each active node examines
    current: Vec<ArcId>,
    orphans: VecDeque<NodeId>,
    time: u64,
    arc_scans: usize,
}

impl BoykovKolmogorov {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arcs examined while growing trees and adopting orphans during the
    /// last `solve`
    pub fn arc_scans(&self) -> usize {
        self.arc_scans
    }

    /// Reinitialize the buffers for `graph`, returning the flow pushed
    /// directly through terminal pairs.
    fn reset(&mut self, graph: &FlowGraph) -> f64 {
        let n = graph.node_count();

        self.residual.clear();
        self.residual.extend_from_slice(graph.capacities());
        self.tree.clear();
        self.tree.resize(n, Tree::Free);
        self.parent.clear();
        self.parent.resize(n, Parent::Orphan);
        self.timestamp.clear();
        self.timestamp.resize(n, 0);
        self.distance.clear();
        self.distance.resize(n, 0);
        self.is_active.clear();
        self.is_active.resize(n, false);
        self.current.clear();
        self.current.resize(n, 0);
        self.active.clear();
        self.orphans.clear();
        self.time = 0;
        self.arc_scans = 0;

        let mut flow = 0.0;
        for arcs in graph.terminal_arcs() {
            let through = self.residual[arcs.from_source].min(self.residual[arcs.to_sink]);
            if through > 0.0 {
                for arc in [arcs.from_source, arcs.to_sink] {
                    self.residual[arc] -= through;
                    self.residual[graph.twin(arc)] += through;
                }
                flow += through;
            }
        }

        for (node, tree) in [(graph.source(), Tree::Source), (graph.sink(), Tree::Sink)] {
            self.tree[node] = tree;
            self.parent[node] = Parent::Terminal;
            self.activate(graph, node);
        }
        flow
    }

    /// Queue `node` and restart its arc scan
    fn activate(&mut self, graph: &FlowGraph, node: NodeId) {
        self.current[node] = graph.arcs(node).start;
        if !self.is_active[node] {
            self.is_active[node] = true;
            self.active.push_back(node);
        }
    }

    fn deactivate_front(&mut self) {
        if let Some(node) = self.active.pop_front() {
            self.is_active[node] = false;
        }
    }

    /// Arc whose residual matters when `node` in `tree` links to a neighbor
    /// through `arc` (`arc` leaves `node`).
    fn tree_arc(graph: &FlowGraph, tree: Tree, arc: ArcId) -> ArcId {
        match tree {
            Tree::Sink => graph.twin(arc),
            _ => arc,
        }
    }

    /// Expand active nodes until the two trees touch.
    ///
    /// Returns the arc from the source tree to the sink tree with residual
    /// capacity, or `None` when no augmenting path is left.
    fn grow(&mut self, graph: &FlowGraph) -> Option<ArcId> {
        while let Some(&p) = self.active.front() {
            let tree = self.tree[p];
            if tree == Tree::Free {
                self.deactivate_front();
                continue;
            }

            let end = graph.arcs(p).end;
            while self.current[p] < end {
                let a = self.current[p];
                self.arc_scans += 1;

                if self.residual[Self::tree_arc(graph, tree, a)] > 0.0 {
                    let q = graph.head(a);
                    match self.tree[q] {
                        Tree::Free => {
                            self.tree[q] = tree;
                            self.parent[q] = Parent::Arc(graph.twin(a));
                            self.timestamp[q] = self.timestamp[p];
                            self.distance[q] = self.distance[p] + 1;
                            self.activate(graph, q);
                        }
                        other if other == tree => {}
                        _ => {
                            // p stays at the front with its cursor on `a`,
                            // which may carry more flow
                            return Some(Self::tree_arc(graph, tree, a));
                        }
                    }
                }
                self.current[p] += 1;
            }

            self.deactivate_front();
        }
        None
    }

    /// Push the bottleneck along the path through `bridge`.
    fn augment(&mut self, graph: &FlowGraph, bridge: ArcId) -> f64 {
        let tail = graph.head(graph.twin(bridge));
        let head = graph.head(bridge);

        let mut bottleneck = self.residual[bridge];

        let mut node = tail;
        while let Parent::Arc(a) = self.parent[node] {
            bottleneck = bottleneck.min(self.residual[graph.twin(a)]);
            node = graph.head(a);
        }
        let mut node = head;
        while let Parent::Arc(a) = self.parent[node] {
            bottleneck = bottleneck.min(self.residual[a]);
            node = graph.head(a);
        }

        self.residual[bridge] -= bottleneck;
        self.residual[graph.twin(bridge)] += bottleneck;

        // Source tree: flow runs parent -> node
        let mut node = tail;
        while let Parent::Arc(a) = self.parent[node] {
            let down = graph.twin(a);
            self.residual[down] -= bottleneck;
            self.residual[a] += bottleneck;
            let next = graph.head(a);
            if self.residual[down] <= 0.0 {
                self.make_orphan(node);
            }
            node = next;
        }

        // Sink tree: flow runs node -> parent
        let mut node = head;
        while let Parent::Arc(a) = self.parent[node] {
            self.residual[a] -= bottleneck;
            self.residual[graph.twin(a)] += bottleneck;
            let next = graph.head(a);
            if self.residual[a] <= 0.0 {
                self.make_orphan(node);
            }
            node = next;
        }

        bottleneck
    }

    fn make_orphan(&mut self, node: NodeId) {
        self.parent[node] = Parent::Orphan;
        self.orphans.push_back(node);
    }

    /// Length of the path from `start` to its terminal, or `None` if the
    /// path runs into an orphan. Nodes on a valid path are stamped with the
    /// current time and their distance.
    fn root_distance(&mut self, graph: &FlowGraph, start: NodeId) -> Option<usize> {
        let mut node = start;
        let mut d = 0;
        loop {
            if self.timestamp[node] == self.time {
                d += self.distance[node];
                break;
            }
            match self.parent[node] {
                Parent::Terminal => {
                    self.timestamp[node] = self.time;
                    self.distance[node] = 0;
                    break;
                }
                Parent::Orphan => return None,
                Parent::Arc(a) => {
                    d += 1;
                    node = graph.head(a);
                }
            }
        }

        let total = d;
        let mut node = start;
        while self.timestamp[node] != self.time {
            self.timestamp[node] = self.time;
            self.distance[node] = d;
            d = d.saturating_sub(1);
            match self.parent[node] {
                Parent::Arc(a) => node = graph.head(a),
                _ => break,
            }
        }
        Some(total)
    }

    fn adopt(&mut self, graph: &FlowGraph) {
        while let Some(orphan) = self.orphans.pop_front() {
            self.process_orphan(graph, orphan);
        }
    }

    fn process_orphan(&mut self, graph: &FlowGraph, orphan: NodeId) {
        let tree = self.tree[orphan];
        // Residual arc a candidate parent must offer the orphan
        let link = |a: ArcId| match tree {
            Tree::Source => graph.twin(a),
            _ => a,
        };

        let mut best: Option<(ArcId, usize)> = None;
        for a in graph.arcs(orphan) {
            self.arc_scans += 1;
            if self.residual[link(a)] <= 0.0 {
                continue;
            }
            let j = graph.head(a);
            if self.tree[j] != tree || self.parent[j] == Parent::Orphan {
                continue;
            }
            if let Some(d) = self.root_distance(graph, j) {
                if best.map_or(true, |(_, best_d)| d < best_d) {
                    best = Some((a, d));
                }
            }
        }

        if let Some((a, d)) = best {
            self.parent[orphan] = Parent::Arc(a);
            self.timestamp[orphan] = self.time;
            self.distance[orphan] = d + 1;
            return;
        }

        for a in graph.arcs(orphan) {
            let j = graph.head(a);
            if self.tree[j] != tree {
                continue;
            }
            if self.residual[link(a)] > 0.0 {
                self.activate(graph, j);
            }
            if self.parent[j] == Parent::Arc(graph.twin(a)) {
                self.make_orphan(j);
            }
        }
        self.tree[orphan] = Tree::Free;
    }
}

impl MaxFlowSolver for BoykovKolmogorov {
    fn solve(&mut self, graph: &FlowGraph) -> Result<MinCut> {
        let _span = tracing::debug_span!("boykov_kolmogorov").entered();

        check_terminals(graph)?;
        let mut flow = self.reset(graph);
        let direct = flow;

        let mut augmentations = 0usize;
        while let Some(bridge) = self.grow(graph) {
            self.time += 1;
            flow += self.augment(graph, bridge);
            self.adopt(graph);
            augmentations += 1;
        }

        tracing::debug!(
            "Max-flow {:.4} ({:.4} through terminal pairs) after {} augmentations, {} arc scans",
            flow,
            direct,
            augmentations,
            self.arc_scans
        );

        let source_side = residual_reachable(graph, &self.residual)?;
        Ok(MinCut { source_side, flow })
    }

    fn name(&self) -> &'static str {
        "boykov-kolmogorov"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmentationConfig;
    use crate::cost::CostModel;
    use crate::grid::{Neighborhood, Pixel, PixelGrid};
    use crate::seeds::SeedMask;

    /// Textured bright disk of radius 80 on a textured dark background
    fn disk(size: usize) -> PixelGrid {
        let c = size as i64 / 2;
        PixelGrid::from_fn(size, size, |p| {
            let (dx, dy) = (p.x as i64 - c, p.y as i64 - c);
            let texture = ((p.x * 7 + p.y * 13) % 23) as u8;
            if dx * dx + dy * dy <= 80 * 80 {
                180 + texture
            } else {
                40 + texture
            }
        })
        .expect("valid grid")
    }

    fn block(x0: usize, y0: usize) -> Vec<Pixel> {
        (y0..y0 + 4)
            .flat_map(|y| (x0..x0 + 4).map(move |x| Pixel::new(x, y)))
            .collect()
    }

    #[test]
    fn large_grid_scans_stay_linear() {
        let size = 256;
        let grid = disk(size);
        let config = SegmentationConfig::default();
        let model = CostModel::new(&config);

        let boundary = model.boundary_costs(&grid, config.neighborhood);
        let seeds = SeedMask::from_seeds(size, size, &block(126, 126), &block(2, 2))
            .expect("valid seeds");
        let regional = model
            .compute_all_costs(&grid, &seeds, boundary.k_factor)
            .expect("costs computed");

        let mut graph = FlowGraph::build_topology(size, size, Neighborhood::Eight);
        graph
            .update_edge_weights(&boundary.weights, &regional.costs)
            .expect("sizes match");

        let mut solver = BoykovKolmogorov::new();
        let cut = solver.solve(&graph).expect("solvable");

        assert!(
            solver.arc_scans() <= 8 * graph.arc_count(),
            "{} arc scans for {} arcs",
            solver.arc_scans(),
            graph.arc_count()
        );
        assert!((graph.cut_weight(&cut.source_side) - cut.flow).abs() < 1e-6 * cut.flow);

        let at = |x: usize, y: usize| cut.is_source_side(y * size + x);
        assert!(at(128, 128) && at(190, 128) && at(128, 60));
        assert!(!at(3, 3) && !at(230, 128) && !at(128, 250));
    }

    #[test]
    fn buffers_are_reused_across_graphs() {
        let mut solver = BoykovKolmogorov::new();
        for size in [64, 16] {
            let grid = disk(size);
            let config = SegmentationConfig::default().with_neighborhood(Neighborhood::Four);
            let model = CostModel::new(&config);
            let boundary = model.boundary_costs(&grid, config.neighborhood);
            let seeds = SeedMask::from_seeds(size, size, &block(0, 0), &block(size - 4, 0))
                .expect("valid seeds");
            let regional = model
                .compute_all_costs(&grid, &seeds, boundary.k_factor)
                .expect("costs computed");
            let mut graph = FlowGraph::build_topology(size, size, config.neighborhood);
            graph
                .update_edge_weights(&boundary.weights, &regional.costs)
                .expect("sizes match");

            let cut = solver.solve(&graph).expect("solvable");
            assert_eq!(cut.source_side.len(), graph.node_count());
            assert!(cut.is_source_side(0));
            assert!(!cut.is_source_side(size - 1));
        }
    }
}
