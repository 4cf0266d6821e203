use tessera::error::{ConsistencyError, LoadError};
use tessera::model::Valence;
use tessera::tes::load_str;

const TORUS: &str = "e2. angleunit(deg) tile(1,90,1,90,1,90,1,90) c(0,0,0,2,0) c(0,1,0,3,0)";
const ORDER5_SQUARES: &str = "h2. angleunit(deg) tile(2*acosh(cos(45*deg)/sin(36*deg)),72,*4) c(0,0,0,0,0)";

#[test]
fn square_torus_has_four_around_each_vertex() {
    let t = load_str(TORUS).unwrap();
    let sh = &t.shapes[0];
    assert_eq!(sh.cycle_length, 4);
    assert_eq!(sh.vertex_valence, vec![Valence::Finite(4); 4]);
    assert_eq!(sh.vertex_period, vec![4; 4]);
    assert_eq!(t.min_valence, Some(Valence::Finite(4)));
    assert_eq!(t.max_valence, Some(Valence::Finite(4)));
    assert!(t.have_valence);
}

#[test]
fn self_glued_square_has_unit_cycle() {
    let t = load_str("e2. angleunit(deg) tile(1,90,*4) c(0,0,0,0,0)").unwrap();
    assert_eq!(t.shapes[0].cycle_length, 1);
    assert_eq!(t.shapes[0].vertex_valence, vec![Valence::Finite(4); 4]);
}

#[test]
fn order_five_squares() {
    let t = load_str(ORDER5_SQUARES).unwrap();
    let sh = &t.shapes[0];
    assert!(sh.edges[0].finite().is_some_and(|e| (e - 1.2537).abs() < 1e-3));
    assert!(sh.vertex_valence.iter().all(|v| *v == Valence::Finite(5)));
    for angles in &sh.vertex_angles {
        let total: f64 = angles.iter().sum();
        assert!((total - std::f64::consts::TAU).abs() < 1e-6);
    }
}

#[test]
fn ideal_vertex_has_unbounded_valence() {
    let t = load_str("h2. angleunit(deg) tile(2,120,*inf) c(0,0,0,0,0)").unwrap();
    assert_eq!(t.shapes[0].vertex_valence[1], Valence::Unbounded);
    assert_eq!(t.max_valence, Some(Valence::Unbounded));
    assert!(matches!(t.min_valence, Some(Valence::Finite(_))));
}

#[test]
fn inconsistent_vertex_is_rejected() {
    // walking around a corner of the first tile ends on the second one
    let err = load_str("e2. angleunit(deg) tile(1,90,*4) tile(1,90,1,90,1,90,1,90) c(0,0,1,0,0)").unwrap_err();
    assert!(matches!(err, LoadError::Consistency(_)), "unexpected {err:?}");
}

#[test]
fn star_tilings_skip_vertex_walks() {
    let t = load_str("star. e2. angleunit(deg) tile(1,90,*4) c(0,0,0,0,0)").unwrap();
    assert!(t.is_star);
    assert!(!t.have_valence);
    assert!(t.shapes[0].vertex_valence.is_empty());
}

#[test]
fn consistency_errors_name_the_vertex() {
    let e = ConsistencyError::ImproperTotal { shape: 1, vertex: 2, total: 7.0 };
    assert!(e.to_string().contains("shape 1 vertex 2"));
}
