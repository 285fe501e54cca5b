pub mod types;

pub use types::{ArcId, EdgeWeight, Node, NodeId};

use crate::cost::RegionalCost;
use crate::error::{Result, SegmentationError};
use crate::grid::{self, Neighborhood};
use std::ops::Range;
use types::{BoundaryArcs, TerminalArcs};

/// Directed flow network over a pixel lattice plus source and sink.
///
/// Arcs are stored in compressed adjacency form. Every arc has a twin going
/// the other way, which doubles as its residual arc during max-flow. For a
/// neighbor pair both twins carry the boundary weight; for a terminal edge
/// the twin carries zero.
///
/// Topology is fixed at construction. Only capacities change afterwards.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    width: usize,
    height: usize,
    neighborhood: Neighborhood,
    first_arc: Vec<ArcId>,
    head: Vec<NodeId>,
    twin: Vec<ArcId>,
    capacity: Vec<f64>,
    boundary: Vec<BoundaryArcs>,
    terminals: Vec<TerminalArcs>,
}

impl FlowGraph {
    /// Allocate `width * height + 2` nodes with every boundary and terminal
    /// arc, all at zero capacity.
    pub fn build_topology(width: usize, height: usize, neighborhood: Neighborhood) -> Self {
        let _span = tracing::debug_span!("build_topology").entered();

        let pixels = width * height;
        let source = pixels;
        let sink = pixels + 1;
        let node_count = pixels + 2;

        let pairs: Vec<(NodeId, NodeId)> =
            grid::adjacent_pairs(width, height, neighborhood).collect();

        let mut degree = vec![0usize; node_count];
        for &(a, b) in &pairs {
            degree[a] += 1;
            degree[b] += 1;
        }
        for p in 0..pixels {
            degree[p] += 2;
        }
        degree[source] = pixels;
        degree[sink] = pixels;

        let mut first_arc = Vec::with_capacity(node_count + 1);
        let mut total = 0;
        for &d in &degree {
            first_arc.push(total);
            total += d;
        }
        first_arc.push(total);

        let mut graph = Self {
            width,
            height,
            neighborhood,
            first_arc,
            head: vec![0; total],
            twin: vec![0; total],
            capacity: vec![0.0; total],
            boundary: Vec::with_capacity(pairs.len()),
            terminals: Vec::with_capacity(pixels),
        };

        let mut cursor: Vec<ArcId> = graph.first_arc[..node_count].to_vec();
        let mut link = |graph: &mut Self, u: NodeId, v: NodeId| -> ArcId {
            let uv = cursor[u];
            let vu = cursor[v];
            cursor[u] += 1;
            cursor[v] += 1;
            graph.head[uv] = v;
            graph.head[vu] = u;
            graph.twin[uv] = vu;
            graph.twin[vu] = uv;
            uv
        };

        for &(a, b) in &pairs {
            let forward = link(&mut graph, a, b);
            graph.boundary.push(BoundaryArcs { a, b, forward });
        }
        for p in 0..pixels {
            let from_source = link(&mut graph, source, p);
            let to_sink = link(&mut graph, p, sink);
            graph.terminals.push(TerminalArcs {
                from_source,
                to_sink,
            });
        }

        tracing::debug!(
            "Flow graph topology: {} nodes, {} arcs, {} neighbor pairs",
            node_count,
            total,
            graph.boundary.len()
        );

        graph
    }

    /// Overwrite both directions of every neighbor pair
    pub fn update_boundary_weights(&mut self, weights: &[f64]) -> Result<()> {
        if weights.len() != self.boundary.len() {
            return Err(SegmentationError::GridSize {
                expected: self.boundary.len(),
                actual: weights.len(),
            });
        }

        for (arcs, &w) in self.boundary.iter().zip(weights) {
            self.capacity[arcs.forward] = w;
            self.capacity[self.twin[arcs.forward]] = w;
        }
        Ok(())
    }

    /// `source -> p` gets the cost of labeling `p` background,
    /// `p -> sink` the cost of labeling it object.
    pub fn update_terminal_weights(&mut self, costs: &[RegionalCost]) -> Result<()> {
        if costs.len() != self.terminals.len() {
            return Err(SegmentationError::GridSize {
                expected: self.terminals.len(),
                actual: costs.len(),
            });
        }

        for (arcs, cost) in self.terminals.iter().zip(costs) {
            self.capacity[arcs.from_source] = cost.to_background;
            self.capacity[arcs.to_sink] = cost.to_object;
        }
        Ok(())
    }

    pub fn update_edge_weights(
        &mut self,
        boundary_weights: &[f64],
        regional_costs: &[RegionalCost],
    ) -> Result<()> {
        self.update_boundary_weights(boundary_weights)?;
        self.update_terminal_weights(regional_costs)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn neighborhood(&self) -> Neighborhood {
        self.neighborhood
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn node_count(&self) -> usize {
        self.first_arc.len() - 1
    }

    pub fn arc_count(&self) -> usize {
        self.head.len()
    }

    pub fn source(&self) -> NodeId {
        self.pixel_count()
    }

    pub fn sink(&self) -> NodeId {
        self.pixel_count() + 1
    }

    /// Named view of a node id, as used by the edge export
    pub fn node(&self, id: NodeId) -> Node {
        if id == self.source() {
            Node::Source
        } else if id == self.sink() {
            Node::Sink
        } else {
            Node::Pixel(id)
        }
    }

    /// Outgoing arcs of `node`
    pub fn arcs(&self, node: NodeId) -> Range<ArcId> {
        self.first_arc[node]..self.first_arc[node + 1]
    }

    pub fn head(&self, arc: ArcId) -> NodeId {
        self.head[arc]
    }

    pub fn twin(&self, arc: ArcId) -> ArcId {
        self.twin[arc]
    }

    pub fn capacity(&self, arc: ArcId) -> f64 {
        self.capacity[arc]
    }

    pub fn capacities(&self) -> &[f64] {
        &self.capacity
    }

    pub(crate) fn terminal_arcs(&self) -> &[TerminalArcs] {
        &self.terminals
    }

    /// Sum of capacities leaving `node`
    pub fn out_capacity(&self, node: NodeId) -> f64 {
        self.arcs(node).map(|a| self.capacity[a]).sum()
    }

    /// Sum of capacities entering `node`
    pub fn in_capacity(&self, node: NodeId) -> f64 {
        self.arcs(node).map(|a| self.capacity[self.twin[a]]).sum()
    }

    /// Read-only list of every weighted edge: both directions of each
    /// neighbor pair, then the two terminal edges of each pixel.
    pub fn edge_weights(&self) -> Vec<EdgeWeight> {
        let mut edges = Vec::with_capacity(self.boundary.len() * 2 + self.terminals.len() * 2);
        let mut export = |arc: ArcId| {
            edges.push(EdgeWeight {
                from: self.node(self.head[self.twin[arc]]),
                to: self.node(self.head[arc]),
                weight: self.capacity[arc],
            })
        };
        for arcs in &self.boundary {
            export(arcs.forward);
            export(self.twin[arcs.forward]);
        }
        for arcs in &self.terminals {
            export(arcs.from_source);
            export(arcs.to_sink);
        }
        edges
    }

    /// Total weight of arcs leaving the node set where `on_source_side` is true
    pub fn cut_weight(&self, on_source_side: &[bool]) -> f64 {
        (0..self.node_count())
            .filter(|&u| on_source_side[u])
            .flat_map(|u| self.arcs(u))
            .filter(|&a| !on_source_side[self.head[a]])
            .map(|a| self.capacity[a])
            .sum()
    }
}
