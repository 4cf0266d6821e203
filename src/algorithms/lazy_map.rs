// Lazily generated map of a tiling: nodes are placed tiles, created on first
// demand when a step crosses an unresolved edge. A new placement is first
// looked up among the existing nodes so that walks around a vertex close up.
// Placements are kept relative to anchor cells, never as absolute motions.
use super::adjacency::adjacency_via;
use super::anchors::{AnchorKey, AnchorRecord, Lattice};
use crate::error::TilingError;
use crate::geometry::limits::MAX_MAP_NODES;
use crate::geometry::math::{Motion, Point, Space, C0};
use crate::model::{Connection, Tiling};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, trace, warn};

pub type NodeId = usize;

/// Resolved edge of a node: the neighbour, the edge of the neighbour it lands on,
/// and whether the gluing reverses orientation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Link {
    pub node: NodeId,
    pub edge: usize,
    pub mirror: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub shape: usize,
    /// Steps from the origin at creation time.
    pub distance: usize,
    /// Orientation relative to the origin: true when an odd number of mirrored gluings separate them.
    pub parity: bool,
    links: Vec<Option<Link>>,
}

impl Node {
    #[inline]
    pub fn degree(&self) -> usize { self.links.len() }

    #[inline]
    pub fn link(&self, edge: usize) -> Option<Link> { self.links.get(edge).copied().flatten() }
}

// Irrational-looking offset so that no vertex or edge of the origin tile lies on an axis.
fn origin_motion(space: Space) -> Motion {
    space.xpush(0.01241) * Motion::spin(1.4117) * space.xpush(0.1241)
}

pub struct TilingMap {
    tiling: Tiling,
    lattice: Lattice,
    nodes: Vec<Node>,
    // affine maps keep absolute placements under `AnchorKey::Global` and no buckets
    places: Vec<AnchorRecord>,
    buckets: HashMap<AnchorKey, Vec<NodeId>>,
}

impl TilingMap {
    pub fn new(tiling: Tiling) -> Result<Self, TilingError> {
        let first = tiling.shapes.first().ok_or(TilingError::EmptyTiling)?;
        let root = Node { shape: 0, distance: 0, parity: false, links: vec![None; first.size()] };
        let space = tiling.space();
        let lattice = Lattice::new(space);
        let place = if tiling.geometry.is_affine() {
            AnchorRecord { key: AnchorKey::Global, offset: origin_motion(space) }
        } else {
            lattice.rebase(&lattice.origin_key(), origin_motion(space))
        };
        let mut map = TilingMap { tiling, lattice, nodes: Vec::new(), places: Vec::new(), buckets: HashMap::new() };
        map.push_node(root, place);
        Ok(map)
    }

    pub fn tiling(&self) -> &Tiling { &self.tiling }

    #[inline]
    pub fn origin(&self) -> NodeId { 0 }

    pub fn len(&self) -> usize { self.nodes.len() }

    /// Always false: the origin exists from construction.
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn node(&self, id: NodeId) -> Option<&Node> { self.nodes.get(id) }

    /// Absolute placement of a node. In affine tilings this is an affine map, not an isometry.
    /// Far from the origin its entries lose precision; prefer [`relative_motion`](Self::relative_motion).
    pub fn motion(&self, id: NodeId) -> Option<Motion> {
        let place = self.places.get(id)?;
        Some(self.lattice.frame(&place.key) * place.offset)
    }

    /// Anchor cell and in-cell offset of a node; `None` in affine tilings.
    pub fn anchor(&self, id: NodeId) -> Option<&AnchorRecord> {
        if self.tiling.geometry.is_affine() {
            return None;
        }
        self.places.get(id)
    }

    pub fn center(&self, id: NodeId) -> Option<Point> { Some(self.motion(id)? * C0) }

    /// Neighbour across `edge`, if that edge has been resolved.
    pub fn neighbor(&self, id: NodeId, edge: usize) -> Option<Link> { self.nodes.get(id)?.link(edge) }

    /// Motion from the frame of `to` into the frame of `from`.
    pub fn relative_motion(&self, from: NodeId, to: NodeId) -> Option<Motion> {
        let (a, b) = (self.places.get(from)?, self.places.get(to)?);
        let link = self.lattice.between(&a.key, &b.key)?;
        Some(a.offset.inverse()? * link * b.offset)
    }

    /// Adjacency across edge `edge` of node `id`, honouring the edge the neighbour was actually entered through.
    pub fn adjacency_of(&self, id: NodeId, edge: usize) -> Result<Motion, TilingError> {
        let node = self.nodes.get(id).ok_or(TilingError::InvalidNode(id))?;
        let xdl = node.link(edge).map(|l| l.edge);
        adjacency_via(&self.tiling, node.shape, edge, xdl, self.tiling.geometry.is_affine())
    }

    /// Neighbour of `id` across `edge`, creating it on first use. Repeated calls return the same node.
    pub fn step(&mut self, id: NodeId, edge: usize) -> Result<NodeId, TilingError> {
        let node = self.nodes.get(id).ok_or(TilingError::InvalidNode(id))?;
        if edge >= node.degree() {
            return Err(TilingError::InvalidEdge { shape: node.shape, edge });
        }
        if let Some(l) = node.links[edge] {
            return Ok(l.node);
        }
        let co = self.tiling.shapes[node.shape].connections[edge];
        // everything fallible happens before the map is touched
        let adj = self.adjacency_of(id, edge)?;
        if self.tiling.geometry.is_affine() {
            return self.step_affine(id, edge, co, adj);
        }
        let here = &self.places[id];
        let place = self.lattice.rebase(&here.key, here.offset * adj);
        if let Some((p, oth)) = self.find_existing(id, edge, co, &place) {
            trace!(from = id, edge, to = p, "reused node");
            self.link(id, edge, p, oth, co.mirror);
            return Ok(p);
        }
        self.create(id, edge, co, place)
    }

    // Looks for a placed copy of shape `co.sid` at `place` whose edge can take this gluing.
    // Everything is compared in the frame of the anchor cell of `place`.
    fn find_existing(&self, id: NodeId, edge: usize, co: Connection, place: &AnchorRecord) -> Option<(NodeId, usize)> {
        let space = self.tiling.space();
        let xsh = &self.tiling.shapes[co.sid];
        let n = xsh.size();
        let t = place.offset;
        let at = t.origin_image();
        let target = t * xsh.vertices[co.eid];
        for (key, to_here) in self.lattice.around(&place.key) {
            let Some(bucket) = self.buckets.get(&key) else { continue };
            for &p in bucket {
                if self.nodes[p].shape != co.sid {
                    continue;
                }
                let m = to_here * self.places[p].offset;
                if !space.same_point(m.origin_image(), at) {
                    continue;
                }
                for oth in 0..n {
                    if !space.same_point(m * xsh.vertices[oth], target) {
                        continue;
                    }
                    if matches!(self.nodes[p].links[oth], Some(l) if !(l.node == id && l.edge == edge)) {
                        continue;
                    }
                    let agrees = (0..n).all(|k| {
                        space.same_point(m * xsh.vertices[(oth + k) % n], t * xsh.vertices[(co.eid + k) % n])
                    });
                    if agrees {
                        return Some((p, oth));
                    }
                }
            }
        }
        None
    }

    // Affine tilings have no metric to hash on: search the resolved links breadth-first
    // for a node sitting where the neighbour should be, within a budget.
    fn step_affine(&mut self, id: NodeId, edge: usize, co: Connection, goal: Motion) -> Result<NodeId, TilingError> {
        let limit = self.tiling.affine_limit;
        let mut seen = HashSet::from([id]);
        let mut queue = vec![(id, Motion::IDENTITY)];
        let mut i = 0;
        while i < limit && i < queue.len() {
            let (h, tm) = queue[i];
            i += 1;
            if self.nodes[h].shape == co.sid && tm.approx_eq(&goal) {
                let free = match self.nodes[h].links[co.eid] {
                    None => true,
                    Some(l) => l.node == id && l.edge == edge,
                };
                if free {
                    self.link(id, edge, h, co.eid, co.mirror);
                    return Ok(h);
                }
            }
            for k in 0..self.nodes[h].degree() {
                if let Some(l) = self.nodes[h].links[k] {
                    if seen.insert(l.node) {
                        queue.push((l.node, tm * self.adjacency_of(h, k)?));
                    }
                }
            }
        }
        if i < queue.len() {
            warn!(node = id, edge, limit, "affine search budget exhausted, creating a new node");
        }
        let place = AnchorRecord { key: AnchorKey::Global, offset: self.places[id].offset * goal };
        self.create(id, edge, co, place)
    }

    fn create(&mut self, from: NodeId, edge: usize, co: Connection, place: AnchorRecord) -> Result<NodeId, TilingError> {
        if self.nodes.len() >= MAX_MAP_NODES {
            return Err(TilingError::TooManyNodes(MAX_MAP_NODES));
        }
        let parent = &self.nodes[from];
        let node = Node {
            shape: co.sid,
            distance: parent.distance + 1,
            parity: parent.parity ^ co.mirror,
            links: vec![None; self.tiling.shapes[co.sid].size()],
        };
        let p = self.push_node(node, place);
        self.link(from, edge, p, co.eid, co.mirror);
        debug!(from, edge, node = p, shape = co.sid, "created node");
        Ok(p)
    }

    fn push_node(&mut self, node: Node, place: AnchorRecord) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        if !self.tiling.geometry.is_affine() {
            self.buckets.entry(place.key.clone()).or_default().push(id);
        }
        self.places.push(place);
        id
    }

    fn link(&mut self, a: NodeId, ae: usize, b: NodeId, be: usize, mirror: bool) {
        self.nodes[a].links[ae] = Some(Link { node: b, edge: be, mirror });
        self.nodes[b].links[be] = Some(Link { node: a, edge: ae, mirror });
    }

    /// Resolve every edge within `radius` steps of the origin. Returns the nodes reached, in BFS order.
    pub fn expand(&mut self, radius: usize) -> Result<Vec<NodeId>, TilingError> {
        let mut depth = HashMap::from([(self.origin(), 0usize)]);
        let mut queue = VecDeque::from([self.origin()]);
        let mut order = vec![self.origin()];
        while let Some(h) = queue.pop_front() {
            let dh = depth[&h];
            if dh >= radius {
                continue;
            }
            for d in 0..self.nodes[h].degree() {
                let n = self.step(h, d)?;
                if let std::collections::hash_map::Entry::Vacant(e) = depth.entry(n) {
                    e.insert(dh + 1);
                    queue.push_back(n);
                    order.push(n);
                }
            }
        }
        debug!(radius, reached = order.len(), total = self.nodes.len(), "expanded map");
        Ok(order)
    }

    /// Number of distinct anchor cells in use.
    pub fn bucket_count(&self) -> usize { self.buckets.len() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::connections::{connect, reset_connections};
    use crate::algorithms::shape_builder::build_shape;
    use crate::model::{EdgeLength, GeometryKind, Shape};
    use std::f64::consts::FRAC_PI_2;

    fn square_torus() -> Tiling {
        let mut sh = Shape {
            in_edges: vec![1.0; 4],
            in_angles: vec![FRAC_PI_2; 4],
            edges: vec![EdgeLength::Finite(1.0); 4],
            repeat_value: 1,
            ..Shape::default()
        };
        build_shape(&mut sh, Space::Euclidean, false).unwrap();
        reset_connections(&mut sh);
        let mut t = Tiling { geometry: GeometryKind::Euclidean, shapes: vec![sh], ..Tiling::default() };
        connect(&mut t, 0, 0, 0, 2, false);
        connect(&mut t, 0, 1, 0, 3, false);
        t
    }

    #[test]
    fn empty_tiling_is_rejected() {
        assert!(matches!(TilingMap::new(Tiling::default()), Err(TilingError::EmptyTiling)));
    }

    #[test]
    fn step_is_stable_and_reversible() {
        let mut map = TilingMap::new(square_torus()).unwrap();
        let a = map.step(0, 0).unwrap();
        assert_eq!(map.step(0, 0).unwrap(), a);
        let back = map.neighbor(0, 0).unwrap();
        assert_eq!(map.step(a, back.edge).unwrap(), 0);
        assert_eq!(map.node(a).unwrap().distance, 1);
    }

    #[test]
    fn grid_neighbourhood_has_no_duplicates() {
        let mut map = TilingMap::new(square_torus()).unwrap();
        let reached = map.expand(2).unwrap();
        assert_eq!(reached.len(), 13);
        // diagonal squares are reached twice but created once
        assert_eq!(map.len(), 13);
    }

    #[test]
    fn offsets_stay_small_far_out() {
        let t = crate::tes::load_str("h2. angleunit(deg) tile(2*acosh(cos(45*deg)/sin(36*deg)),72,*4) c(0,0,0,0,0)").unwrap();
        let mut map = TilingMap::new(t).unwrap();
        let (mut cur, mut e) = (map.origin(), 0);
        for _ in 0..40 {
            let next = map.step(cur, e).unwrap();
            e = (map.neighbor(cur, e).unwrap().edge + 2) % 4;
            cur = next;
        }
        assert_eq!(map.len(), 41);
        let place = map.anchor(cur).unwrap();
        assert!(Space::Hyperbolic.dist0(place.offset * C0) < 0.9);
        assert!(matches!(&place.key, AnchorKey::Cell(w) if w.len() > 10));
    }

    #[test]
    fn bad_ids_are_errors() {
        let mut map = TilingMap::new(square_torus()).unwrap();
        assert!(matches!(map.step(5, 0), Err(TilingError::InvalidNode(5))));
        assert!(matches!(map.step(0, 9), Err(TilingError::InvalidEdge { .. })));
    }
}
