// Polygon construction from (edge length, corner angle) sequences.
use crate::error::{ClosingDefect, PolygonNotClosed};
use crate::geometry::intersect::chart_line_intersection;
use crate::geometry::math::{Motion, Point, Space, C0};
use crate::geometry::tolerance::{DEGENERATE_CENTER_SQ, EPS_DEFECT};
use crate::model::{EdgeLength, Shape};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use tracing::debug;

/// Data produced alongside the shape, for diagnostics and tests.
#[derive(Clone, Debug)]
pub struct BuildReport {
    /// Frame at the start of every input edge, followed by the closing motion.
    pub chain: Vec<Motion>,
    /// Centre the vertices are expressed relative to (absent in combinatorial mode).
    pub center: Option<Point>,
    /// Fixed direction of the closing motion of an apeirogon, in the walk's frame.
    pub inf_point: Option<Point>,
}

/// Walk the boundary: advance by the edge, then turn by the exterior angle.
pub fn walk(in_edges: &[f64], in_angles: &[f64], space: Space) -> Vec<Motion> {
    let mut at = Motion::IDENTITY;
    let mut chain = Vec::with_capacity(in_edges.len() + 1);
    for (&e, &a) in in_edges.iter().zip(in_angles) {
        chain.push(at);
        at = at * space.xpush(e) * Motion::spin(a + PI);
    }
    chain.push(at);
    chain
}

/// Fixed point (v0, v1, 1) of `at`, solving the first two rows of (at - I) v = 0.
pub fn fixed_direction(at: &Motion) -> Point {
    let mut u = at.m;
    for (i, row) in u.iter_mut().enumerate() {
        row[i] -= 1.0;
    }
    let det = u[0][1] * u[1][0] - u[1][1] * u[0][0];
    let v1 = (u[1][2] * u[0][0] - u[0][2] * u[1][0]) / det;
    let v0 = (u[0][2] * u[1][1] - u[1][2] * u[0][1]) / det;
    Point::new(v0, v1, 1.0)
}

fn closing_defect(at: &Motion, space: Space) -> ClosingDefect {
    let d = space.dist0(at.origin_image());
    if d.abs() < EPS_DEFECT {
        ClosingDefect::Angle((*at * space.xpush0(1.0)).angle())
    } else {
        ClosingDefect::Distance(d)
    }
}

/// Mark edges touching a zero-angle (ideal) corner as reaching infinity.
pub fn assign_sentinels(sh: &mut Shape) {
    let m = sh.angles.len().min(sh.edges.len());
    for i in 0..m {
        let left = sh.angles[i] == 0.0;
        let right = sh.angles[(i + m - 1) % m] == 0.0;
        sh.edges[i] = match (left, right) {
            (true, true) => EdgeLength::InfiniteBoth,
            (true, false) => EdgeLength::InfiniteLeft,
            (false, true) => EdgeLength::InfiniteRight,
            (false, false) => sh.edges[i],
        };
    }
}

/// Fill `vertices`, `angles` and `edges` of `sh` from its input sequences.
pub fn build_shape(sh: &mut Shape, space: Space, combinatorial: bool) -> Result<BuildReport, Box<PolygonNotClosed>> {
    let n = sh.in_angles.len();
    let chain = walk(&sh.in_edges, &sh.in_angles, space);
    let mut at = chain[n];
    let mut ctr = chain[..n].iter().fold(Point::new(0.0, 0.0, 0.0), |acc, m| acc + m.origin_image());

    if combinatorial {
        // geometry is meaningless here; a regular placeholder keeps vertex count and order
        sh.vertices = (0..n)
            .map(|k| (Motion::spin(-2.0 * PI * k as f64 / n as f64) * space.xpush(0.5)).origin_image())
            .collect();
        sh.angles = sh.in_angles.clone();
        sh.edges = sh.in_edges.iter().map(|&e| EdgeLength::Finite(e)).collect();
        return Ok(BuildReport { chain, center: None, inf_point: None });
    }

    if !at.approx_eq(&Motion::IDENTITY) && !sh.apeirogonal {
        return Err(Box::new(PolygonNotClosed {
            shape: sh.id,
            defect: closing_defect(&at, space),
            chain,
            params: BTreeMap::new(),
        }));
    }

    if ctr.sq_norm() < DEGENERATE_CENTER_SQ {
        // happens for some spherical tilings: nudge towards the interior
        debug!(shape = sh.id, "degenerate centre, recentring");
        for (&e, &a) in sh.in_edges.iter().zip(&sh.in_angles) {
            ctr = ctr + at * space.xpush(e) * Motion::spin((a + PI) / 2.0) * space.xpush0(0.01);
            at = at * space.xpush(e) * Motion::spin(a);
        }
    }

    let mut inf_point = None;
    if sh.apeirogonal {
        let end = chain[n];
        let v = fixed_direction(&end);
        inf_point = Some(v);
        ctr = space.towards_inf(space.mid(C0, end.origin_image()), v);
    }
    let ctr = space.normalize(ctr);
    let back = space.push_from(ctr);

    sh.vertices.clear();
    sh.angles.clear();
    sh.edges.clear();
    let mut i = 0;
    while i < n {
        sh.edges.push(EdgeLength::Finite(sh.in_edges[i]));
        if !sh.ideal_markers.get(i).copied().unwrap_or(false) {
            sh.vertices.push(back * chain[i].origin_image());
            sh.angles.push(sh.in_angles[i]);
            i += 1;
            continue;
        }
        sh.angles.push(0.0);
        let far = chain.get(i + 2).copied().unwrap_or(chain[n]);
        let v = chart_line_intersection(chain[i].origin_image(), chain[i].column(0), far.origin_image(), far.column(0))
            .ok_or_else(|| {
                Box::new(PolygonNotClosed {
                    shape: sh.id,
                    chain: chain.clone(),
                    defect: ClosingDefect::ParallelIdealSides(i),
                    params: BTreeMap::new(),
                })
            })?;
        let v = back * v;
        sh.vertices.push(v.chart().unwrap_or(v));
        // the second pair of an ideal corner only bounds the intersection
        i += 2;
    }

    if let Some(v) = inf_point {
        sh.vertices.push(back * chain[n].origin_image());
        let v = back * v;
        sh.vertices.push(v.chart().unwrap_or(v));
        let b = sh.angles.last().copied().unwrap_or(0.0) / 2.0;
        if let Some(last) = sh.angles.last_mut() {
            *last = b;
        }
        sh.angles.push(0.0);
        sh.angles.push(b);
        sh.edges.push(EdgeLength::Finite(0.0));
        sh.edges.push(EdgeLength::Finite(0.0));
    }

    assign_sentinels(sh);
    debug!(shape = sh.id, vertices = sh.vertices.len(), apeirogonal = sh.apeirogonal, "built shape");
    Ok(BuildReport { chain, center: Some(ctr), inf_point })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape_from(pairs: &[(f64, f64)]) -> Shape {
        Shape {
            in_edges: pairs.iter().map(|p| p.0).collect(),
            in_angles: pairs.iter().map(|p| p.1.to_radians()).collect(),
            ideal_markers: vec![false; pairs.len()],
            repeat_value: 1,
            ..Shape::default()
        }
    }

    #[test]
    fn unit_square_closes() {
        let mut sh = shape_from(&[(1.0, 90.0); 4]);
        let rep = build_shape(&mut sh, Space::Euclidean, false).unwrap();
        assert!(rep.chain[4].approx_eq(&Motion::IDENTITY));
        assert_eq!(sh.vertices.len(), 4);
        // centred: vertices are symmetric about the origin
        let s = sh.vertices.iter().fold(Point::new(0.0, 0.0, 0.0), |a, &v| a + v);
        assert!(s.x.abs() < 1e-9 && s.y.abs() < 1e-9);
        assert!(sh.edges.iter().all(|e| e.matches(EdgeLength::Finite(1.0))));
    }

    #[test]
    fn open_polygon_reports_distance() {
        let mut sh = shape_from(&[(1.0, 90.0), (1.0, 90.0), (1.0, 90.0), (2.0, 90.0)]);
        let err = build_shape(&mut sh, Space::Euclidean, false).unwrap_err();
        assert_eq!(err.chain.len(), 5);
        match err.defect {
            ClosingDefect::Distance(d) => assert!((d - 1.0).abs() < 1e-9),
            ref other => panic!("unexpected defect {other:?}"),
        }
    }

    #[test]
    fn wrong_turn_reports_angle() {
        // zero-length sides leave only the turning, which is off by one degree
        let mut sh = shape_from(&[(0.0, 60.0), (0.0, 60.0), (0.0, 61.0)]);
        let err = build_shape(&mut sh, Space::Euclidean, false).unwrap_err();
        assert!(matches!(err.defect, ClosingDefect::Angle(_)));
    }

    #[test]
    fn combinatorial_skips_closure() {
        let mut sh = shape_from(&[(1.0, 10.0); 5]);
        build_shape(&mut sh, Space::Hyperbolic, true).unwrap();
        assert_eq!(sh.vertices.len(), 5);
        assert_eq!(sh.angles.len(), 5);
    }

    #[test]
    fn ideal_corner_merges_two_steps() {
        let mut sh = shape_from(&[(2.0, 90.0), (1.0, 135.0), (2f64.sqrt(), 135.0), (1.0, 90.0), (2.0, 90.0)]);
        sh.ideal_markers[0] = true;
        build_shape(&mut sh, Space::Euclidean, false).unwrap();
        assert_eq!(sh.vertices.len(), 4);
        // the sides meeting at the marked corner cross at (3, 0); the centre is (1, -1)
        assert!(sh.vertices[0].approx_eq(&Point::new(2.0, 1.0, 1.0)));
        assert!(sh.vertices[1].approx_eq(&Point::new(1.0, 0.0, 1.0)));
        assert_eq!(sh.angles[0], 0.0);
        assert_eq!(sh.edges[0], EdgeLength::InfiniteLeft);
        assert_eq!(sh.edges[1], EdgeLength::InfiniteRight);
        assert!(sh.edges[2].matches(EdgeLength::Finite(1.0)));
    }

    #[test]
    fn spherical_square_of_cube() {
        let s = 2.0 * ((PI / 4.0).cos() / (PI / 3.0).sin()).acos();
        let mut sh = shape_from(&[(s, 120.0); 4]);
        build_shape(&mut sh, Space::Spherical, false).unwrap();
        for w in 0..4 {
            let d = Space::Spherical.dist(sh.vertices[w], sh.vertices[(w + 1) % 4]);
            assert!((d - s).abs() < 1e-9);
        }
    }
}
