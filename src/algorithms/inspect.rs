// Walks a tiling edge by edge from one shape, keeping the placed polygons, so a
// caller can show how the declared gluings fit together.
use super::adjacency::adjacency_via;
use crate::error::{LoadError, TilingError};
use crate::geometry::math::{Motion, Point};
use crate::model::{GeometryKind, Tiling};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub motion: Motion,
    pub shape: usize,
}

#[derive(Clone, Debug)]
pub struct ConnectionInspector {
    tiling: Tiling,
    trail: Vec<Placement>,
}

fn primes(n: usize) -> String {
    "'".repeat(n)
}

impl ConnectionInspector {
    pub fn new(tiling: Tiling, shape: usize) -> Result<Self, TilingError> {
        if tiling.shapes.is_empty() {
            return Err(TilingError::EmptyTiling);
        }
        if shape >= tiling.shapes.len() {
            return Err(TilingError::InvalidNode(shape));
        }
        Ok(Self { tiling, trail: vec![Placement { motion: Motion::IDENTITY, shape }] })
    }

    /// Inspector for a `debug(i)` request; other load errors give `None`.
    pub fn from_error(err: LoadError) -> Option<Self> {
        match err {
            LoadError::DebugRequest { shape, tiling } => Self::new(*tiling, shape).ok(),
            _ => None,
        }
    }

    pub fn tiling(&self) -> &Tiling { &self.tiling }

    pub fn placements(&self) -> &[Placement] { &self.trail }

    pub fn current(&self) -> &Placement {
        // the trail never shrinks below its first entry
        &self.trail[self.trail.len() - 1]
    }

    pub fn current_shape(&self) -> usize { self.current().shape }

    /// One line per edge of the current shape, e.g. `1' -> 3'' (m)`: primes count shape ids.
    pub fn describe(&self) -> Vec<String> {
        let id = self.current_shape();
        self.tiling.shapes[id]
            .connections
            .iter()
            .enumerate()
            .map(|(k, co)| {
                let m = if co.mirror { " (m)" } else { "" };
                format!("{k}{} -> {}{}{m}", primes(id), co.eid, primes(co.sid))
            })
            .collect()
    }

    /// Vertices of placement `i` in the frame of the first one.
    pub fn placed_vertices(&self, i: usize) -> Option<Vec<Point>> {
        let p = self.trail.get(i)?;
        Some(self.tiling.shapes[p.shape].vertices.iter().map(|&v| p.motion * v).collect())
    }

    /// Place the neighbour across `edge` of the current shape. Euclidean gluings are
    /// followed with affine corrections so that edges of unequal length still meet.
    pub fn follow(&mut self, edge: usize) -> Result<usize, TilingError> {
        let cur = *self.current();
        let co = self.tiling.connection(cur.shape, edge).ok_or(TilingError::InvalidEdge { shape: cur.shape, edge })?;
        let affine = matches!(self.tiling.geometry, GeometryKind::Euclidean | GeometryKind::Affine);
        let adj = adjacency_via(&self.tiling, cur.shape, edge, None, affine)?;
        self.trail.push(Placement { motion: cur.motion * adj, shape: co.sid });
        debug!(from = cur.shape, edge, to = co.sid, depth = self.trail.len(), "followed connection");
        Ok(co.sid)
    }

    /// Drop the last placement; the starting one is kept.
    pub fn undo(&mut self) -> bool {
        if self.trail.len() > 1 {
            self.trail.pop();
            true
        } else {
            false
        }
    }
}
