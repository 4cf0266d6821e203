// Derive a tiling description from an existing tessellation: cells are sorted into
// identification classes by a breadth-first analysis, and each class becomes a shape.
use super::lazy_map::{NodeId, TilingMap};
use super::shape_builder::assign_sentinels;
use super::valence::compute_vertex_valence;
use crate::config::EngineConfig;
use crate::error::{ConvertError, TilingError};
use crate::geometry::math::{wrap_angle, Point, Space};
use crate::geometry::tolerance::{approx_eq, gcd, gmod, reduce_gcd};
use crate::model::{Connection, EdgeLength, GeometryKind, Shape, Tiling};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;
use tracing::{debug, info, trace};

/// A tessellation that can be walked cell by cell.
pub trait CellComplex {
    type Cell: Copy + Eq + Hash;

    fn geometry(&self) -> GeometryKind;
    fn start(&mut self) -> Result<Self::Cell, TilingError>;
    fn degree(&self, c: Self::Cell) -> usize;
    /// Cells of different classes never become the same shape.
    fn shape_class(&self, c: Self::Cell) -> usize;
    /// Neighbour across `edge`, and the edge of the neighbour leading back.
    fn step(&mut self, c: Self::Cell, edge: usize) -> Result<(Self::Cell, usize), TilingError>;
    /// Corner `k` of `c` in the cell's own frame; corner k starts edge k.
    fn corner(&self, c: Self::Cell, k: usize) -> Point;
}

impl CellComplex for TilingMap {
    type Cell = NodeId;

    fn geometry(&self) -> GeometryKind { self.tiling().geometry }

    fn start(&mut self) -> Result<NodeId, TilingError> { Ok(self.origin()) }

    fn degree(&self, c: NodeId) -> usize { self.node(c).map_or(0, |n| n.degree()) }

    fn shape_class(&self, c: NodeId) -> usize { self.node(c).map_or(0, |n| n.shape) }

    fn step(&mut self, c: NodeId, edge: usize) -> Result<(NodeId, usize), TilingError> {
        TilingMap::step(self, c, edge)?;
        let l = self.neighbor(c, edge).ok_or(TilingError::InvalidEdge { shape: self.shape_class(c), edge })?;
        if l.mirror {
            return Err(TilingError::NonOrientable { node: c, edge });
        }
        Ok((l.node, l.edge))
    }

    fn corner(&self, c: NodeId, k: usize) -> Point {
        let sh = &self.tiling().shapes[self.shape_class(c)];
        sh.vertices[k % sh.size()]
    }
}

// Class record: every cell of class `target` rotated by `shift` looks like `sample`;
// the class is symmetric under rotation by `modval`.
#[derive(Clone, Copy, Debug)]
struct IdRecord<C> {
    target: usize,
    shift: i64,
    modval: usize,
    sample: C,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Walker<C> {
    at: C,
    spin: usize,
}

struct Converter<'a, S: CellComplex> {
    src: &'a mut S,
    ids: BTreeMap<usize, IdRecord<S::Cell>>,
    changes: usize,
}

impl<'a, S: CellComplex> Converter<'a, S> {
    fn turn(&self, w: Walker<S::Cell>, by: i64) -> Walker<S::Cell> {
        let d = self.src.degree(w.at).max(1) as i64;
        Walker { at: w.at, spin: gmod(w.spin as i64 + by, d) as usize }
    }

    fn wstep(&mut self, w: Walker<S::Cell>) -> Result<Walker<S::Cell>, TilingError> {
        let (at, spin) = self.src.step(w.at, w.spin)?;
        Ok(Walker { at, spin })
    }

    fn ident(&mut self, c: S::Cell) -> IdRecord<S::Cell> {
        let k = self.src.shape_class(c);
        let modval = self.src.degree(c).max(1);
        *self.ids.entry(k).or_insert(IdRecord { target: k, shift: 0, modval, sample: c })
    }

    fn masters(&self) -> Vec<usize> {
        self.ids.iter().filter(|(k, r)| **k == r.target).map(|(k, _)| *k).collect()
    }

    fn be_identified(&mut self, w1: Walker<S::Cell>, w2: Walker<S::Cell>) -> Result<(), TilingError> {
        let id1 = self.ident(w1.at);
        let id2 = self.ident(w2.at);
        let (t1, t2) = (self.src.degree(w1.at), self.src.degree(w2.at));
        if t1 != t2 {
            return Err(TilingError::DegreeMismatch(t1, t2));
        }
        let d1 = gmod(w1.spin as i64 - id1.shift, id1.modval as i64);
        let d2 = gmod(w2.spin as i64 - id2.shift, id2.modval as i64);

        if id1.target != id2.target {
            let modval = gcd(id1.modval, id2.modval);
            for r in self.ids.values_mut() {
                if r.target == id2.target {
                    r.target = id1.target;
                    r.shift = gmod(r.shift + d2 - d1, modval as i64);
                    r.sample = id1.sample;
                    r.modval = modval;
                } else if r.target == id1.target {
                    r.shift = gmod(r.shift, modval as i64);
                    r.modval = modval;
                }
            }
            self.changes += 1;
            trace!(into = id1.target, from = id2.target, modval, "merged classes");
            return Ok(());
        }
        if d1 != d2 {
            let modval = reduce_gcd(id2.modval, d2 - d1);
            for r in self.ids.values_mut().filter(|r| r.target == id2.target) {
                r.shift = gmod(r.shift, modval as i64);
                r.modval = modval;
            }
            self.changes += 1;
            trace!(class = id2.target, modval, "reduced class period");
        }
        Ok(())
    }

    // Breadth-first analysis until a full pass makes no change. Cells whose class was
    // already analysed in the pass are only re-examined while the budget lasts.
    fn analyse(&mut self, budget: usize) -> Result<(), TilingError> {
        let start = self.src.start()?;
        let mut cells = vec![start];
        let mut listed = HashSet::from([start]);
        let mut budget = budget as i64;
        loop {
            self.changes = 0;
            let mut analysed = HashSet::new();
            let mut i = 0;
            while i < cells.len() {
                let c = cells[i];
                i += 1;
                let id = self.ident(c);
                if !analysed.insert(id.target) {
                    budget -= 1;
                    if budget < 0 {
                        continue;
                    }
                }
                let cw0 = self.turn(Walker { at: c, spin: 0 }, id.shift);
                let cws = Walker { at: id.sample, spin: 0 };
                for j in 0..self.src.degree(c) as i64 {
                    let a = self.wstep(self.turn(cw0, j))?;
                    let b = self.wstep(self.turn(cws, j))?;
                    self.be_identified(a, b)?;

                    let modval = self.ident(c).modval as i64;
                    let b = self.wstep(self.turn(cw0, j + modval))?;
                    self.be_identified(a, b)?;

                    let idx = self.ident(a.at);
                    let xsample = self.turn(Walker { at: idx.sample, spin: a.spin }, -idx.shift);
                    let (p, q) = (self.wstep(a)?, self.wstep(xsample)?);
                    self.be_identified(p, q)?;

                    if listed.insert(a.at) {
                        cells.push(a.at);
                    }
                }
            }
            debug!(changes = self.changes, cells = cells.len(), "identification pass");
            if self.changes == 0 {
                return Ok(());
            }
        }
    }

    // Partition refinement: rotations of classes start out equivalent when their
    // three-corner edge profiles agree and stay so while their successors do.
    fn minimize(&mut self, masters: &[usize], space: Space) -> Result<(), TilingError> {
        let mut address = Vec::new();
        let mut next = Vec::new();
        for (i, m) in masters.iter().enumerate() {
            let q = self.ids[m].modval;
            let c = address.len();
            for j in 0..q {
                address.push((i, j));
                next.push(if j + 1 == q { c } else { c + j + 1 });
            }
        }
        let profiles: Vec<(usize, [f64; 3])> = address
            .iter()
            .map(|&(i, j)| {
                let id = self.ids[&masters[i]];
                let deg = self.src.degree(id.sample);
                let corner = |s: i64| self.src.corner(id.sample, gmod(id.shift + j as i64 + s, deg.max(1) as i64) as usize);
                let pc = [corner(0), corner(1), corner(2)];
                (deg, std::array::from_fn(|s| space.dist(pc[s], pc[(s + 1) % 3])))
            })
            .collect();

        let k = address.len();
        let mut equal = vec![vec![false; k]; k];
        for i in 0..k {
            for j in 0..k {
                let (a, b) = (&profiles[i], &profiles[j]);
                equal[i][j] = a.0 == b.0 && (0..3).all(|s| approx_eq(a.1[s], b.1[s]));
            }
        }
        loop {
            let mut changed = false;
            for i in 0..k {
                for j in 0..k {
                    if equal[i][j] && !equal[next[i]][next[j]] {
                        equal[i][j] = false;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }

        for i in 0..k {
            for j in 0..k {
                if i == j || !equal[i][j] {
                    continue;
                }
                let walker = |cv: &Self, (m, s): (usize, usize)| {
                    let id = cv.ids[&masters[m]];
                    cv.turn(Walker { at: id.sample, spin: 0 }, id.shift + s as i64)
                };
                let (wi, wj) = (walker(self, address[i]), walker(self, address[j]));
                self.be_identified(wi, wj)?;
            }
        }
        Ok(())
    }

    fn emit(&mut self, masters: &[usize], config: &EngineConfig) -> Result<Tiling, TilingError> {
        let geometry = self.src.geometry();
        let space = geometry.space();
        let mut order = masters.to_vec();
        if config.reverse_order {
            order.reverse();
        }
        let new_index: HashMap<usize, usize> = order.iter().enumerate().map(|(i, &m)| (m, i)).collect();

        let mut shapes = Vec::with_capacity(order.len());
        for (i, m) in order.iter().enumerate() {
            let id = self.ids[m];
            let s = id.sample;
            let t = self.src.degree(s);
            let vertices: Vec<Point> = (0..t).map(|j| self.src.corner(s, j)).collect();

            let mut connections = Vec::with_capacity(t);
            for j in 0..t {
                let cw = self.wstep(Walker { at: s, spin: j })?;
                let idx = self.ident(cw.at);
                let xs = self.turn(Walker { at: idx.sample, spin: cw.spin }, -idx.shift);
                let target = *new_index.get(&idx.target).ok_or(TilingError::UnresolvedClass(idx.target))?;
                connections.push(Connection::new(target, xs.spin, false));
            }

            let lengths: Vec<f64> = (0..t)
                .map(|j| {
                    let (a, b) = (vertices[j], vertices[(j + 1) % t]);
                    if space.is_proper(a) && space.is_proper(b) { space.dist(a, b) } else { 0.0 }
                })
                .collect();
            let mut angles: Vec<f64> = (0..t)
                .map(|j| {
                    let (v0, v1, v2) = (vertices[j], vertices[(j + 1) % t], vertices[(j + 2) % t]);
                    if !space.is_proper(v1) {
                        return 0.0;
                    }
                    let back = space.push_from(v1);
                    wrap_angle((back * v0).angle() - (back * v2).angle())
                })
                .collect();
            // convex corners positive, whatever the orientation of the sample
            if angles.iter().sum::<f64>() < 0.0 {
                angles.iter_mut().for_each(|a| *a = -*a);
            }

            let mut sh = Shape {
                id: i,
                vertices,
                edges: lengths.iter().map(|&d| EdgeLength::Finite(d)).collect(),
                in_edges: lengths,
                in_angles: angles.clone(),
                angles,
                ideal_markers: vec![false; t],
                connections,
                stretch_shear: vec![(1.0, 0.0); t],
                repeat_value: t / id.modval.max(1),
                cycle_length: id.modval,
                ..Shape::default()
            };
            assign_sentinels(&mut sh);
            debug!(shape = i, size = t, cycle_length = id.modval, "converted shape");
            shapes.push(sh);
        }

        Ok(Tiling {
            name: "converted".to_string(),
            comment: format!("converted from: {geometry:?}"),
            geometry,
            shapes,
            affine_limit: config.affine_limit,
            ..Tiling::default()
        })
    }
}

/// Build a tiling whose shapes are the identification classes of `src`.
pub fn convert<S: CellComplex>(src: &mut S, config: &EngineConfig) -> Result<Tiling, ConvertError> {
    let space = src.geometry().space();
    let mut cv = Converter { src, ids: BTreeMap::new(), changes: 0 };
    cv.analyse(config.convert_retest_budget)?;
    if config.minimize_on_convert {
        let masters = cv.masters();
        cv.minimize(&masters, space)?;
    }
    let masters = cv.masters();
    let mut t = cv.emit(&masters, config)?;
    compute_vertex_valence(&mut t)?;
    info!(shapes = t.shapes.len(), geometry = ?t.geometry, "converted tiling");
    Ok(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::connections::{connect, reset_connections};
    use crate::algorithms::shape_builder::build_shape;
    use crate::model::Valence;
    use std::f64::consts::FRAC_PI_2;

    fn unit_square(id: usize) -> Shape {
        let mut sh = Shape {
            id,
            in_edges: vec![1.0; 4],
            in_angles: vec![FRAC_PI_2; 4],
            repeat_value: 1,
            ..Shape::default()
        };
        build_shape(&mut sh, Space::Euclidean, false).unwrap();
        reset_connections(&mut sh);
        sh
    }

    #[test]
    fn square_grid_becomes_one_square() {
        let mut t = Tiling { geometry: GeometryKind::Euclidean, shapes: vec![unit_square(0)], ..Tiling::default() };
        connect(&mut t, 0, 0, 0, 2, false);
        connect(&mut t, 0, 1, 0, 3, false);
        let mut map = TilingMap::new(t).unwrap();
        let out = convert(&mut map, &EngineConfig::default()).unwrap();
        assert_eq!(out.shapes.len(), 1);
        let sh = &out.shapes[0];
        assert_eq!(sh.size(), 4);
        assert!(sh.angles.iter().all(|a| approx_eq(*a, FRAC_PI_2)));
        assert!(sh.vertex_valence.iter().all(|v| *v == Valence::Finite(4)));
        assert!(out.asymmetric_connections().is_empty());
    }

    #[test]
    fn reverse_order_flips_class_numbering() {
        let mut t = Tiling {
            geometry: GeometryKind::Euclidean,
            shapes: vec![unit_square(0), unit_square(1)],
            ..Tiling::default()
        };
        for e in 0..4 {
            connect(&mut t, 0, e, 1, (e + 2) % 4, false);
        }
        let cfg = EngineConfig { reverse_order: true, ..EngineConfig::default() };
        let mut map = TilingMap::new(t).unwrap();
        let out = convert(&mut map, &cfg).unwrap();
        assert_eq!(out.shapes.len(), 2);
        assert!(out.shapes.iter().all(|s| s.connections.iter().all(|c| c.sid != s.id)));
    }
}
