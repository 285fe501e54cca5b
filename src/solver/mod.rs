mod boykov_kolmogorov;
mod edmonds_karp;

pub use boykov_kolmogorov::BoykovKolmogorov;
pub use edmonds_karp::EdmondsKarp;

use crate::error::{Result, SegmentationError};
use crate::graph::{FlowGraph, NodeId};
use std::collections::VecDeque;

/// Minimum s-t cut of a flow graph
#[derive(Debug, Clone, PartialEq)]
pub struct MinCut {
    /// Per node: reachable from the source in the final residual graph
    pub source_side: Vec<bool>,
    /// Max-flow value, equal to the total weight of the cut
    pub flow: f64,
}

impl MinCut {
    pub fn is_source_side(&self, node: NodeId) -> bool {
        self.source_side[node]
    }
}

/// Trait for max-flow backends
/// Allows swapping between algorithms without touching the session
pub trait MaxFlowSolver {
    /// Saturate the graph from `graph.source()` to `graph.sink()` and return
    /// the induced minimum cut. The graph's capacities are not modified.
    fn solve(&mut self, graph: &FlowGraph) -> Result<MinCut>;

    fn name(&self) -> &'static str;
}

/// Create the solver used by default (Boykov-Kolmogorov)
pub fn create_default_solver() -> Box<dyn MaxFlowSolver> {
    Box::new(BoykovKolmogorov::new())
}

/// Both terminals must carry capacity, otherwise the graph was built wrong
pub(crate) fn check_terminals(graph: &FlowGraph) -> Result<()> {
    if !(graph.out_capacity(graph.source()) > 0.0) {
        return Err(SegmentationError::SolverFailure(
            "source has no outgoing capacity",
        ));
    }
    if !(graph.in_capacity(graph.sink()) > 0.0) {
        return Err(SegmentationError::SolverFailure(
            "sink has no incoming capacity",
        ));
    }
    Ok(())
}

/// Nodes reachable from the source through arcs with positive residual
pub(crate) fn residual_reachable(graph: &FlowGraph, residual: &[f64]) -> Result<Vec<bool>> {
    let mut seen = vec![false; graph.node_count()];
    let mut queue = VecDeque::new();
    seen[graph.source()] = true;
    queue.push_back(graph.source());

    while let Some(u) = queue.pop_front() {
        for a in graph.arcs(u) {
            let v = graph.head(a);
            if residual[a] > 0.0 && !seen[v] {
                seen[v] = true;
                queue.push_back(v);
            }
        }
    }

    if seen[graph.sink()] {
        return Err(SegmentationError::SolverFailure(
            "sink still reachable after max-flow",
        ));
    }
    Ok(seen)
}
