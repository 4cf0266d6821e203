use tessera::algorithms::adjacency::{adjacency, adjacency_via};
use tessera::error::TilingError;
use tessera::geometry::math::{Motion, Point, Space};
use tessera::model::Tiling;
use tessera::tes::load_str;

const ORDER5_SQUARES: &str = "h2. angleunit(deg) tile(2*acosh(cos(45*deg)/sin(36*deg)),72,*4) c(0,0,0,0,0)";

fn check_round_trips(t: &Tiling) {
    for sh in &t.shapes {
        for (e, co) in sh.connections.iter().enumerate() {
            let there = adjacency(t, sh.id, e).unwrap();
            // periodic copies share one connection entry, so name the edge we came through
            let back = adjacency_via(t, co.sid, co.eid, Some(e), false).unwrap();
            let id = there * back;
            for v in &sh.vertices {
                let w = id * *v;
                assert!(t.space().dist(*v, w) < 1e-6, "shape {} edge {e} does not return", sh.id);
            }
        }
    }
}

#[test]
fn gluing_there_and_back_is_identity() {
    check_round_trips(&load_str(ORDER5_SQUARES).unwrap());
    check_round_trips(&load_str("e2. angleunit(deg) tile(1,90,1,90,1,90,1,90) c(0,0,0,2,0) c(0,1,0,3,0)").unwrap());
    check_round_trips(&load_str("e2. angleunit(deg) tile(1,90,*4) c(0,0,0,0,1)").unwrap());
}

#[test]
fn shared_edge_endpoints_coincide() {
    let t = load_str(ORDER5_SQUARES).unwrap();
    let sh = &t.shapes[0];
    let m = adjacency(&t, 0, 0).unwrap();
    assert!(Space::Hyperbolic.dist(sh.vertices[0], m * sh.vertices[1]) < 1e-6);
    assert!(Space::Hyperbolic.dist(sh.vertices[1], m * sh.vertices[0]) < 1e-6);
    // the neighbour lies on the other side of the edge
    assert!(!m.approx_eq(&Motion::IDENTITY));
}

#[test]
fn missing_edge_is_an_error() {
    let t = load_str(ORDER5_SQUARES).unwrap();
    assert!(matches!(adjacency(&t, 0, 4), Err(TilingError::InvalidEdge { shape: 0, edge: 4 })));
    assert!(matches!(adjacency(&t, 3, 0), Err(TilingError::InvalidEdge { .. })));
}

#[test]
fn mismatched_gluing_fails_the_self_check() {
    let mut t = load_str("e2. angleunit(deg) tile(1,90,2,90,1,90,2,90) c(0,0,0,2,0) c(0,1,0,3,0)").unwrap();
    // bypass the loader's length check
    t.shapes[0].connections[0].eid = 1;
    assert!(matches!(adjacency(&t, 0, 0), Err(TilingError::AdjacencyMismatch { .. })));
}

#[test]
fn small_endpoint_drift_is_tolerated() {
    let mut t = load_str("e2. angleunit(deg) tile(1,90,1,90,1,90,1,90) c(0,0,0,2,0) c(0,1,0,3,0)").unwrap();
    let v = t.shapes[0].vertices[1];
    // edge 0 now half a percent longer than its partner
    t.shapes[0].vertices[1] = Point::new(v.x * 1.01, v.y * 1.01, v.z);
    assert!(adjacency(&t, 0, 0).is_ok());
    t.shapes[0].vertices[1] = Point::new(v.x * 1.5, v.y * 1.5, v.z);
    assert!(matches!(adjacency(&t, 0, 0), Err(TilingError::AdjacencyMismatch { .. })));
}
