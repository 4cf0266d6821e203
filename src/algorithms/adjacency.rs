// Motions gluing an edge of one shape onto the matching edge of its neighbour.
use crate::error::TilingError;
use crate::geometry::math::{rspintox, spintox, Motion, Point, Space};
use crate::geometry::tolerance::{ADJACENCY_SLACK, EPS_CHECK};
use crate::model::{EdgeLength, Tiling};
use tracing::warn;

/// Point standing for the middle of an edge; edges reaching infinity use
/// a point approached from their finite end (or the foot of the line).
pub fn edge_midpoint(space: Space, len: EdgeLength, l: Point, r: Point) -> Point {
    match len {
        EdgeLength::InfiniteBoth => space.closest_to_zero(l, r),
        EdgeLength::InfiniteRight => space.towards_inf(r, l),
        EdgeLength::InfiniteLeft => space.towards_inf(l, r),
        EdgeLength::Finite(_) => space.mid(l, r),
    }
}

// Distance used by the self-check; ideal points are compared in the projective chart.
fn gap(space: Space, a: Point, b: Point) -> f64 {
    let inside = |p: Point| p.z * p.z - p.x * p.x - p.y * p.y > EPS_CHECK;
    if space == Space::Hyperbolic && !(inside(a) && inside(b)) {
        return match (a.chart(), b.chart()) {
            (Some(a), Some(b)) => (a.x - b.x).hypot(a.y - b.y),
            _ => f64::INFINITY,
        };
    }
    space.dist(a, b)
}

/// Motion taking the frame of shape `sid`'s neighbour across edge `dl` into the frame of `sid`.
pub fn adjacency(t: &Tiling, sid: usize, dl: usize) -> Result<Motion, TilingError> {
    adjacency_via(t, sid, dl, None, t.geometry.is_affine())
}

/// As [`adjacency`], but the neighbour may be entered through edge `xdl` instead of the
/// declared one, and affine corrections may be forced.
pub fn adjacency_via(t: &Tiling, sid: usize, dl: usize, xdl: Option<usize>, affine: bool) -> Result<Motion, TilingError> {
    let space = t.space();
    let sh = t.shapes.get(sid).ok_or(TilingError::InvalidEdge { shape: sid, edge: dl })?;
    let co = *sh.connections.get(dl).ok_or(TilingError::InvalidEdge { shape: sid, edge: dl })?;
    let xsh = &t.shapes[co.sid];
    let xdl = xdl.unwrap_or(co.eid);
    if xdl >= xsh.size() {
        return Err(TilingError::InvalidEdge { shape: co.sid, edge: xdl });
    }
    let dr = (dl + 1) % sh.size();
    let xdr = (xdl + 1) % xsh.size();

    let (mut vl, mut vr) = (sh.vertices[dl], sh.vertices[dr]);
    let vm = edge_midpoint(space, sh.edges[dl], vl, vr);
    let rm = space.push_from(vm);

    let (xvl, xvr) = (xsh.vertices[xdl], xsh.vertices[xdr]);
    let xvm = edge_midpoint(space, xsh.edges[xdl], xvl, xvr);
    let xrm = space.push_from(xvm);

    let mut res = space.push_to(vm) * rspintox(rm * vr);
    if affine {
        let sca = space.dist(vl, vr) / space.dist(xvl, xvr);
        let (stretch, shear) = sh.stretch_shear.get(dl).copied().unwrap_or((1.0, 0.0));
        let mut tsca = Motion::IDENTITY;
        tsca.m[0][0] = sca;
        tsca.m[1][1] = sca * stretch;
        tsca.m[0][1] = stretch * shear * sca;
        res = res * tsca;
    }
    if co.mirror {
        res = res * Motion::mirror_x();
    }
    res = res * spintox(xrm * xvl) * xrm;

    if co.mirror {
        std::mem::swap(&mut vl, &mut vr);
    }
    let mismatch = gap(space, vl, res * xvr) + gap(space, vr, res * xvl);
    if !(mismatch <= ADJACENCY_SLACK) && !t.is_combinatorial {
        warn!(shape = sid, edge = dl, mismatch, "adjacency self-check failed");
        return Err(TilingError::AdjacencyMismatch { shape: sid, edge: dl, mismatch });
    }
    Ok(res)
}
