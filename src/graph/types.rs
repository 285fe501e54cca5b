pub type NodeId = usize;
pub type ArcId = usize;

/// Named view of a node id, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    Source,
    Sink,
    /// Flat pixel index `y * width + x`
    Pixel(usize),
}

/// One directed, weighted edge of the exported graph
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeWeight {
    pub from: Node,
    pub to: Node,
    pub weight: f64,
}

/// Arc indices of one undirected neighbor pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BoundaryArcs {
    pub a: NodeId,
    pub b: NodeId,
    /// `a -> b`; its twin is `b -> a`
    pub forward: ArcId,
}

/// Arc indices of one pixel's terminal edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TerminalArcs {
    /// `source -> pixel`
    pub from_source: ArcId,
    /// `pixel -> sink`
    pub to_sink: ArcId,
}
