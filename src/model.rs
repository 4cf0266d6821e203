use crate::geometry::math::{Point, Space};
use crate::geometry::tolerance::approx_eq;
use serde::{Deserialize, Serialize};

pub const DEFAULT_AFFINE_LIMIT: usize = 200;
pub const UNNAMED: &str = "unnamed";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Euclidean,
    /// Euclidean plane with non-conformal gluings (scale and shear across edges).
    Affine,
    #[default]
    Hyperbolic,
    Spherical,
}

impl GeometryKind {
    pub fn space(self) -> Space {
        match self {
            GeometryKind::Euclidean | GeometryKind::Affine => Space::Euclidean,
            GeometryKind::Hyperbolic => Space::Hyperbolic,
            GeometryKind::Spherical => Space::Spherical,
        }
    }

    #[inline]
    pub fn is_affine(self) -> bool { self == GeometryKind::Affine }

    /// Spherical tilings are finite.
    #[inline]
    pub fn is_closed(self) -> bool { self == GeometryKind::Spherical }

    /// Geometry selected by `c2(curvature)`.
    pub fn from_curvature(curv: f64) -> Self {
        if curv > 0.0 {
            GeometryKind::Spherical
        } else if curv < 0.0 {
            GeometryKind::Hyperbolic
        } else {
            GeometryKind::Euclidean
        }
    }
}

/// Edge length, or which end of the edge reaches the boundary at infinity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EdgeLength {
    Finite(f64),
    InfiniteLeft,
    InfiniteRight,
    InfiniteBoth,
}

impl EdgeLength {
    /// The same edge read in the opposite direction.
    pub fn flipped(self) -> Self {
        match self {
            EdgeLength::InfiniteLeft => EdgeLength::InfiniteRight,
            EdgeLength::InfiniteRight => EdgeLength::InfiniteLeft,
            other => other,
        }
    }

    pub fn matches(self, other: EdgeLength) -> bool {
        match (self, other) {
            (EdgeLength::Finite(a), EdgeLength::Finite(b)) => approx_eq(a, b),
            (a, b) => a == b,
        }
    }

    pub fn finite(self) -> Option<f64> {
        match self {
            EdgeLength::Finite(d) => Some(d),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Connection {
    pub sid: usize,
    pub eid: usize,
    pub mirror: bool,
}

impl Connection {
    pub const fn new(sid: usize, eid: usize, mirror: bool) -> Self { Self { sid, eid, mirror } }
}

/// Number of corners meeting at a vertex; ideal vertices have no finite valence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Valence {
    Finite(usize),
    Unbounded,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: usize,
    // usual convention: vertex i starts edge i
    pub vertices: Vec<Point>,
    // tesfile convention: angle i sits at the end of edge i
    pub angles: Vec<f64>,
    pub edges: Vec<EdgeLength>,
    pub in_edges: Vec<f64>,
    pub in_angles: Vec<f64>,
    pub ideal_markers: Vec<bool>,
    pub connections: Vec<Connection>,
    pub sublines: Vec<(usize, usize)>,
    pub stretch_shear: Vec<(f64, f64)>,
    pub apeirogonal: bool,
    pub repeat_value: usize,
    /// Edges j1, j2 may receive the same neighbour edge only if j1 - j2 is a multiple of this.
    pub cycle_length: usize,
    pub vertex_valence: Vec<Valence>,
    pub vertex_period: Vec<usize>,
    pub vertex_angles: Vec<Vec<f64>>,
    pub line: bool,
    pub pseudohept: bool,
}

impl Shape {
    #[inline]
    pub fn size(&self) -> usize { self.vertices.len() }

    /// Distance between periodic copies of a connection.
    #[inline]
    pub fn stride(&self) -> usize { self.size() / self.repeat_value.max(1) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Slider {
    pub name: String,
    pub zero: f64,
    pub current: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntSlider {
    pub name: String,
    pub zero: i64,
    pub current: i64,
    pub min: i64,
    pub max: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tiling {
    /// Bumped on every load; lets holders of derived data notice a reload.
    pub order: u64,
    pub name: String,
    pub comment: String,
    pub geometry: GeometryKind,
    pub shapes: Vec<Shape>,
    pub sliders: Vec<Slider>,
    pub intsliders: Vec<IntSlider>,
    pub options: Vec<String>,
    pub is_star: bool,
    pub is_combinatorial: bool,
    pub have_line: bool,
    pub have_ph: bool,
    pub have_tree: bool,
    pub have_valence: bool,
    pub yendor_backsteps: i64,
    pub cscale: f64,
    pub range: i64,
    pub floor_scale: f64,
    pub boundary_ratio: f64,
    pub affine_limit: usize,
    pub mirror_rules: usize,
    pub min_valence: Option<Valence>,
    pub max_valence: Option<Valence>,
    pub tree_states: Vec<String>,
    pub first_treestate: Option<i64>,
}

impl Default for Tiling {
    fn default() -> Self {
        Self {
            order: 0,
            name: UNNAMED.to_string(),
            comment: String::new(),
            geometry: GeometryKind::default(),
            shapes: Vec::new(),
            sliders: Vec::new(),
            intsliders: Vec::new(),
            options: Vec::new(),
            is_star: false,
            is_combinatorial: false,
            have_line: false,
            have_ph: false,
            have_tree: false,
            have_valence: false,
            yendor_backsteps: 0,
            cscale: 1.0,
            range: 0,
            floor_scale: 0.5,
            boundary_ratio: 1.0,
            affine_limit: DEFAULT_AFFINE_LIMIT,
            mirror_rules: 0,
            min_valence: None,
            max_valence: None,
            tree_states: Vec::new(),
            first_treestate: None,
        }
    }
}

impl Tiling {
    #[inline]
    pub fn space(&self) -> Space { self.geometry.space() }

    pub fn connection(&self, sid: usize, eid: usize) -> Option<Connection> {
        self.shapes.get(sid)?.connections.get(eid).copied()
    }

    /// Shape / edge pairs whose connection differs from the partner's back link.
    pub fn asymmetric_connections(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for sh in &self.shapes {
            for (k, co) in sh.connections.iter().enumerate() {
                let back = self.connection(co.sid, co.eid);
                let ok = matches!(back, Some(b) if b.sid == sh.id && b.mirror == co.mirror
                    && (b.eid as i64 - k as i64) % sh.stride().max(1) as i64 == 0);
                if !ok {
                    out.push((sh.id, k));
                }
            }
        }
        out
    }
}
