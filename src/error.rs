use crate::geometry::math::Motion;
use crate::model::{Connection, EdgeLength, Tiling};
use std::collections::BTreeMap;
use std::fmt;

/// Position in the source text, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePos {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at {position}")]
pub struct ParseError {
    pub message: String,
    pub position: SourcePos,
}

/// What went wrong when a polygon was walked edge by edge.
#[derive(Debug, Clone, PartialEq)]
pub enum ClosingDefect {
    /// Residual translation, in distance units of the source.
    Distance(f64),
    /// Residual rotation, in angle units of the source.
    Angle(f64),
    /// The two sides bounding the ideal vertex at this slot never meet.
    ParallelIdealSides(usize),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("polygon number {shape} did not close correctly ({})", describe_defect(.defect))]
pub struct PolygonNotClosed {
    pub shape: usize,
    /// Partial motions: the frame at the start of every edge, then the closing one.
    pub chain: Vec<Motion>,
    pub defect: ClosingDefect,
    /// Variable bindings at the time of failure.
    pub params: BTreeMap<String, f64>,
}

fn describe_defect(d: &ClosingDefect) -> String {
    match d {
        ClosingDefect::Distance(x) => format!("distance {x}"),
        ClosingDefect::Angle(x) => format!("angle {x}"),
        ClosingDefect::ParallelIdealSides(i) => format!("sides around ideal vertex {i} are parallel"),
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConsistencyError {
    #[error("connecting ({shape},{edge}) to ({},{}) of different lengths only possible in a2 ({left:?} vs {right:?})", .target.sid, .target.eid)]
    EdgeLengthMismatch { shape: usize, edge: usize, target: Connection, left: EdgeLength, right: EdgeLength },
    #[error("connection of shape {shape} edge {edge} does not lead back to it")]
    Asymmetric { shape: usize, edge: usize },
    #[error("periodic copies of shape {shape} edge {edge} lead to different shapes")]
    PeriodMismatch { shape: usize, edge: usize },
    #[error("improper angle total {total} at shape {shape} vertex {vertex}")]
    ImproperTotal { shape: usize, vertex: usize, total: f64 },
    #[error("vertex walk from shape {shape} vertex {vertex} ended at a different shape")]
    WrongShape { shape: usize, vertex: usize },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Syntax(#[from] ParseError),
    #[error(transparent)]
    Geometry(#[from] Box<PolygonNotClosed>),
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
    /// `debug(i)` in the source: not a failure, the caller should inspect shape `shape`.
    #[error("connection debugger requested for shape {shape}")]
    DebugRequest { shape: usize, tiling: Box<Tiling> },
    #[error("tree states rejected: {0}")]
    Rules(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TilingError {
    #[error("tiling has no shapes")]
    EmptyTiling,
    #[error("no node {0}")]
    InvalidNode(usize),
    #[error("no edge {edge} in shape {shape}")]
    InvalidEdge { shape: usize, edge: usize },
    #[error("gluing of shape {shape} edge {edge} misplaces the shared endpoints by {mismatch}")]
    AdjacencyMismatch { shape: usize, edge: usize, mismatch: f64 },
    #[error("degree mismatch while identifying cells ({0} vs {1})")]
    DegreeMismatch(usize, usize),
    #[error("map size limit of {0} nodes reached")]
    TooManyNodes(usize),
    #[error("shape class {0} was never analysed")]
    UnresolvedClass(usize),
    #[error("cannot convert across the mirrored gluing at node {node} edge {edge}")]
    NonOrientable { node: usize, edge: usize },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Map(#[from] TilingError),
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
}
