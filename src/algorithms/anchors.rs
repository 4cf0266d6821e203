// Coarse frames for placed tiles. Every node of a lazy map is stored relative to
// an anchor cell of a fixed lattice: unit squares of the plane, tiles of the
// right-angled pentagon tiling {5,4} of the hyperbolic plane, one cell for the
// sphere. Anchor names are exact, so nodes are only ever compared through short
// motions between neighbouring cells, however far from the origin they lie.
use crate::geometry::math::{Motion, Point, Space};
use crate::geometry::tolerance::EPS;
use std::f64::consts::{PI, TAU};

// Offset keeps lattice-aligned centres (integer coordinates) away from cell edges.
const GRID_OFFSET: f64 = 0.261;
const SIDES: u8 = 5;
// A placement this many cells away from its starting anchor comes from a degenerate tile.
const MAX_REBASE: usize = 4096;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnchorKey {
    /// Unit square of the Euclidean plane.
    Grid(i64, i64),
    /// Pentagon reached from the central one by reflecting in these sides,
    /// written in the lexicographically least of its equivalent spellings.
    Cell(Vec<u8>),
    /// The sphere is finite; one cell holds everything.
    Global,
}

/// Anchor cell of a node plus the motion from the cell frame to the node.
#[derive(Clone, Debug, PartialEq)]
pub struct AnchorRecord {
    pub key: AnchorKey,
    pub offset: Motion,
}

fn cell_ix(x: f64) -> i64 {
    (x + GRID_OFFSET).floor() as i64
}

fn translation(x: f64, y: f64) -> Motion {
    let mut m = Motion::IDENTITY;
    m.m[0][2] = x;
    m.m[1][2] = y;
    m
}

fn lorentz(a: Point, b: Point) -> f64 {
    a.x * b.x + a.y * b.y - a.z * b.z
}

// Reflection in the line with unit spacelike normal `n`: p - 2<p,n> n.
fn reflection(n: Point) -> Motion {
    let jn = [n.x, n.y, -n.z];
    let nv = [n.x, n.y, n.z];
    let mut m = Motion::IDENTITY;
    for (j, row) in m.m.iter_mut().enumerate() {
        for (k, v) in row.iter_mut().enumerate() {
            *v -= 2.0 * nv[j] * jn[k];
        }
    }
    m
}

// Sides of the pentagon are perpendicular exactly when they are consecutive.
fn commute(a: u8, b: u8) -> bool {
    matches!((a + SIDES - b) % SIDES, 1 | 4)
}

fn neighbours(c: u8) -> u8 {
    (1 << ((c + 1) % SIDES)) | (1 << ((c + SIDES - 1) % SIDES))
}

/// Right-multiply a reduced word by one reflection, keeping it reduced.
fn push_letter(w: &mut Vec<u8>, s: u8) {
    for k in (0..w.len()).rev() {
        if w[k] == s {
            w.remove(k);
            return;
        }
        if !commute(w[k], s) {
            break;
        }
    }
    w.push(s);
}

/// Least spelling of a reduced word among those differing by swaps of commuting letters.
fn normal_form(mut rest: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(rest.len());
    while !rest.is_empty() {
        let mut best = 0;
        let mut seen = 0u8;
        for (k, &c) in rest.iter().enumerate() {
            let bit = 1 << c;
            // first occurrence, and everything before it commutes with it
            if seen & bit == 0 && seen & !neighbours(c) == 0 && c < rest[best] {
                best = k;
            }
            seen |= bit;
            if seen.count_ones() >= 3 {
                break;
            }
        }
        out.push(rest.remove(best));
    }
    out
}

fn product(w: &[u8]) -> Vec<u8> {
    let mut r = Vec::with_capacity(w.len());
    for &s in w {
        push_letter(&mut r, s);
    }
    r
}

/// The anchor lattice of one geometry.
#[derive(Clone, Debug)]
pub struct Lattice {
    space: Space,
    walls: [Point; SIDES as usize],
    mirrors: [Motion; SIDES as usize],
}

impl Lattice {
    pub fn new(space: Space) -> Self {
        // inradius of the regular pentagon with right angles
        let r = ((PI / 4.0).cos() / (PI / 5.0).sin()).acosh();
        let walls: [Point; SIDES as usize] = std::array::from_fn(|i| {
            let th = TAU * i as f64 / SIDES as f64;
            Point::new(r.cosh() * th.cos(), r.cosh() * th.sin(), r.sinh())
        });
        Lattice { space, walls, mirrors: walls.map(reflection) }
    }

    pub fn origin_key(&self) -> AnchorKey {
        match self.space {
            Space::Euclidean => AnchorKey::Grid(0, 0),
            Space::Hyperbolic => AnchorKey::Cell(Vec::new()),
            Space::Spherical => AnchorKey::Global,
        }
    }

    fn word_motion(&self, w: &[u8]) -> Motion {
        w.iter().fold(Motion::IDENTITY, |m, &s| m * self.mirrors[s as usize])
    }

    /// Absolute frame of an anchor cell.
    pub fn frame(&self, key: &AnchorKey) -> Motion {
        match key {
            AnchorKey::Grid(ix, iy) => translation(*ix as f64, *iy as f64),
            AnchorKey::Cell(w) => self.word_motion(w),
            AnchorKey::Global => Motion::IDENTITY,
        }
    }

    /// Frame of cell `to` as seen from cell `from`.
    pub fn between(&self, from: &AnchorKey, to: &AnchorKey) -> Option<Motion> {
        match (from, to) {
            (AnchorKey::Grid(ax, ay), AnchorKey::Grid(bx, by)) => Some(translation((bx - ax) as f64, (by - ay) as f64)),
            (AnchorKey::Cell(a), AnchorKey::Cell(b)) => {
                // reflections are involutions: the inverse word is the reversed one
                let w: Vec<u8> = a.iter().rev().chain(b.iter()).copied().collect();
                Some(self.word_motion(&product(&w)))
            }
            _ => Some(self.frame(from).inverse()? * self.frame(to)),
        }
    }

    /// Move a placement given relative to `key` into the cell containing its centre.
    pub fn rebase(&self, key: &AnchorKey, t: Motion) -> AnchorRecord {
        match key {
            AnchorKey::Grid(ix, iy) => {
                let z = t.m[2][2];
                let (dx, dy) = (cell_ix(t.m[0][2] / z), cell_ix(t.m[1][2] / z));
                let offset = self.space.fix(translation(-dx as f64, -dy as f64) * t);
                AnchorRecord { key: AnchorKey::Grid(ix + dx, iy + dy), offset }
            }
            AnchorKey::Cell(w) => {
                let mut w = w.clone();
                let mut t = t;
                for _ in 0..MAX_REBASE {
                    let c = self.space.normalize(t.origin_image());
                    let (i, side) = self
                        .walls
                        .iter()
                        .map(|n| lorentz(*n, c))
                        .enumerate()
                        .fold((0, f64::NEG_INFINITY), |best, (i, s)| if s > best.1 { (i, s) } else { best });
                    // beyond side i: cross into the pentagon on the other side
                    if !(side > EPS) {
                        break;
                    }
                    t = self.mirrors[i] * t;
                    push_letter(&mut w, i as u8);
                }
                AnchorRecord { key: AnchorKey::Cell(normal_form(w)), offset: self.space.fix(t) }
            }
            AnchorKey::Global => AnchorRecord { key: AnchorKey::Global, offset: self.space.fix(t) },
        }
    }

    /// Cells touching `key` (itself included), each with its frame seen from `key`.
    pub fn around(&self, key: &AnchorKey) -> Vec<(AnchorKey, Motion)> {
        match key {
            AnchorKey::Grid(ix, iy) => {
                let mut out = Vec::with_capacity(9);
                for dx in -1..=1 {
                    for dy in -1..=1 {
                        out.push((AnchorKey::Grid(ix + dx, iy + dy), translation(dx as f64, dy as f64)));
                    }
                }
                out
            }
            AnchorKey::Cell(w) => {
                // the pentagons sharing a side, then the one opposite each corner
                let mut steps: Vec<Vec<u8>> = vec![Vec::new()];
                steps.extend((0..SIDES).map(|i| vec![i]));
                steps.extend((0..SIDES).map(|i| vec![i, (i + 1) % SIDES]));
                steps
                    .into_iter()
                    .map(|g| {
                        let mut k = w.clone();
                        for &s in &g {
                            push_letter(&mut k, s);
                        }
                        (AnchorKey::Cell(normal_form(k)), self.word_motion(&g))
                    })
                    .collect()
            }
            AnchorKey::Global => vec![(AnchorKey::Global, Motion::IDENTITY)],
        }
    }
}
