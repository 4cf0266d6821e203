use tessera::config::EngineConfig;
use tessera::error::{ConsistencyError, LoadError};
use tessera::model::{Connection, Valence};
use tessera::tes::{load, load_str, AcceptRules, LoadOptions};

#[test]
fn repeat_copies_gluings_around_the_tile() {
    let t = load_str("e2. angleunit(deg) tile(1,90,1,90,1,90,1,90) repeat(0,2) c(0,0,0,0,0) c(0,1,0,1,0)").unwrap();
    let sh = &t.shapes[0];
    assert_eq!(sh.repeat_value, 2);
    assert_eq!(sh.connections[2], Connection::new(0, 0, false));
    assert_eq!(sh.connections[3], Connection::new(0, 1, false));
    assert!(t.asymmetric_connections().is_empty());
    assert!(sh.vertex_valence.iter().all(|v| *v == Valence::Finite(4)));
}

#[test]
fn bad_repeat_is_a_syntax_error() {
    let err = load_str("e2. angleunit(deg) tile(1,90,1,90,1,90,1,90) repeat(0,3)").unwrap_err();
    assert!(matches!(err, LoadError::Syntax(ref e) if e.message.contains("factor")));
}

#[test]
fn unequal_edges_cannot_be_glued() {
    let src = "e2. angleunit(deg) tile(1,90,2,90,1,90,2,90) c(0,0,0,1,0)";
    match load_str(src).unwrap_err() {
        LoadError::Consistency(ConsistencyError::EdgeLengthMismatch { shape, edge, .. }) => {
            assert_eq!(shape, 0);
            assert_eq!(edge, 0);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn affine_tilings_allow_unequal_edges() {
    let src = "a2. angleunit(deg) tile(1,90,2,90,1,90,2,90) c(0,0,0,1,0) c(0,2,0,3,0)";
    let t = load_str(src).unwrap();
    assert!(t.geometry.is_affine());
    assert!(!t.have_valence);
}

#[test]
fn mirrored_gluing_is_doubled() {
    let src = "e2. angleunit(deg) tile(1,90,*4) c(0,0,0,0,1)";
    let t = load_str(src).unwrap();
    assert_eq!(t.shapes.len(), 2);
    assert_eq!(t.mirror_rules, 4);
    assert!(t.shapes.iter().flat_map(|s| &s.connections).all(|c| !c.mirror));
    assert!(t.shapes[0].connections.iter().all(|c| c.sid == 1));
    assert!(t.asymmetric_connections().is_empty());

    let keep = EngineConfig { unmirror: false, ..EngineConfig::default() };
    let t = load(src, LoadOptions { config: &keep, prior: None }, &mut AcceptRules).unwrap();
    assert_eq!(t.shapes.len(), 1);
    assert!(t.shapes[0].connections[0].mirror);
}

#[test]
fn stretch_shear_is_shared_with_the_partner() {
    let src = "a2. angleunit(deg) tile(1,90,*4) tile(1,90,*4) c(0,0,1,0,0) stretch_shear(2, 0, 0, 1)";
    let t = load_str(src).unwrap();
    let co = t.shapes[0].connections[1];
    assert_eq!(t.shapes[0].stretch_shear[1], (2.0, 0.0));
    assert_eq!(t.shapes[co.sid].stretch_shear[co.eid], (0.5, 0.0));
}

#[test]
fn out_of_range_indices_are_rejected() {
    assert!(matches!(load_str("e2. angleunit(deg) tile(1,90,*4) c(0,4,0,0,0)"), Err(LoadError::Syntax(_))));
    assert!(matches!(load_str("e2. angleunit(deg) tile(1,90,*4) c(1,0,0,0,0)"), Err(LoadError::Syntax(_))));
    assert!(matches!(load_str(r#"e2. angleunit(deg) tile(1,90,*4) conway("(0 1')")"#), Err(LoadError::Syntax(_))));
}
