use super::{check_terminals, residual_reachable, MaxFlowSolver, MinCut};
use crate::error::Result;
use crate::graph::FlowGraph;
use petgraph::algo::ford_fulkerson;
use petgraph::graph::{Graph, NodeIndex};

/// Shortest-augmenting-path max-flow, delegated to petgraph's
/// `ford_fulkerson` (BFS path search).
///
/// O(V * E^2); meant as a reference to check faster solvers on small graphs.
#[derive(Debug, Default)]
pub struct EdmondsKarp {
    residual: Vec<f64>,
}

impl EdmondsKarp {
    pub fn new() -> Self {
        Self::default()
    }

    /// One petgraph edge per arc, added in arc order so edge `i` is arc `i`
    fn network(graph: &FlowGraph) -> Graph<(), f64> {
        let mut network = Graph::with_capacity(graph.node_count(), graph.arc_count());
        for _ in 0..graph.node_count() {
            network.add_node(());
        }
        for u in 0..graph.node_count() {
            for a in graph.arcs(u) {
                network.add_edge(
                    NodeIndex::new(u),
                    NodeIndex::new(graph.head(a)),
                    graph.capacity(a),
                );
            }
        }
        network
    }
}

impl MaxFlowSolver for EdmondsKarp {
    fn solve(&mut self, graph: &FlowGraph) -> Result<MinCut> {
        let _span = tracing::debug_span!("edmonds_karp").entered();

        check_terminals(graph)?;
        let network = Self::network(graph);
        let (flow, flows) = ford_fulkerson(
            &network,
            NodeIndex::new(graph.source()),
            NodeIndex::new(graph.sink()),
        );

        // Unused capacity forward plus flow that can be sent back
        self.residual.clear();
        self.residual.extend((0..graph.arc_count()).map(|a| {
            (graph.capacity(a) - flows[a]).max(0.0) + flows[graph.twin(a)].max(0.0)
        }));

        tracing::debug!("Max-flow {:.4} over {} arcs", flow, graph.arc_count());

        let source_side = residual_reachable(graph, &self.residual)?;
        Ok(MinCut { source_side, flow })
    }

    fn name(&self) -> &'static str {
        "edmonds-karp"
    }
}
