use tessera::config::EngineConfig;
use tessera::error::LoadError;
use tessera::model::EdgeLength;
use tessera::{TilingContext, STATUS_OK};

const TORUS: &str = "e2. angleunit(deg) tile(1,90,1,90,1,90,1,90) c(0,0,0,2,0) c(0,1,0,3,0)";
const SCALED: &str = "## scaled\ne2. angleunit(deg) slider(s, 1, 0.5, 3) tile(s,90,*4) c(0,0,0,2,0)";
const ORDER_N: &str = "h2. angleunit(deg) intslider(n, 5, 3, 8) tile(2*acosh(cos(45*deg)/sin(180/n*deg)),360/n,*4) c(0,0,0,0,0)";

fn edge0(ctx: &TilingContext, preview: bool) -> f64 {
    let t = if preview { ctx.preview() } else { ctx.active() };
    match t.shapes[0].edges[0] {
        EdgeLength::Finite(d) => d,
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn failed_load_keeps_previous_tiling() {
    let mut ctx = TilingContext::new(EngineConfig::default());
    ctx.load(TORUS).unwrap();
    let before = ctx.active().clone();
    let err = ctx.load("e2. angleunit(deg) tile(1,90,1,90,1,90,2,90)").unwrap_err();
    assert!(matches!(err, LoadError::Geometry(_)));
    assert_eq!(ctx.active(), &before);
    assert_eq!(ctx.source(), Some(TORUS));
}

#[test]
fn each_load_gets_a_new_order() {
    let mut ctx = TilingContext::default();
    ctx.load(TORUS).unwrap();
    let first = ctx.active().order;
    ctx.load(TORUS).unwrap();
    assert!(ctx.active().order > first);
    assert_eq!(ctx.preview().order, ctx.active().order);
}

#[test]
fn real_sliders_go_to_the_preview() {
    let mut ctx = TilingContext::new(EngineConfig::default());
    ctx.load(SCALED).unwrap();
    assert!(ctx.set_slider("s", 2.0));
    ctx.sliders_changed(false).unwrap();
    assert!(ctx.using_preview());
    assert_eq!(edge0(&ctx, true), 2.0);
    assert_eq!(edge0(&ctx, false), 1.0);
    assert_eq!(ctx.current_or_preview().name, "scaled");
    assert_eq!(ctx.slider_status(), STATUS_OK);

    ctx.commit_preview();
    assert!(!ctx.using_preview());
    assert_eq!(edge0(&ctx, false), 2.0);
}

#[test]
fn restart_replaces_the_active_tiling() {
    let mut ctx = TilingContext::new(EngineConfig::default());
    ctx.load(ORDER_N).unwrap();
    assert!(ctx.set_slider("n", 6.4));
    ctx.sliders_changed(true).unwrap();
    assert!(!ctx.using_preview());
    assert_eq!(ctx.active().intsliders[0].current, 6);
    assert!((ctx.active().shapes[0].angles[0].to_degrees() - 60.0).abs() < 1e-9);
}

#[test]
fn failed_reparse_is_recorded() {
    let mut ctx = TilingContext::new(EngineConfig::default());
    ctx.load(ORDER_N).unwrap();
    let before = ctx.active().clone();
    // squares with three around a vertex do not fit in the hyperbolic plane
    ctx.set_slider("n", 3.0);
    assert!(ctx.sliders_changed(true).is_err());
    assert_ne!(ctx.slider_status(), STATUS_OK);
    assert_eq!(ctx.active().shapes, before.shapes);
    assert!(!ctx.using_preview());
}

#[test]
fn unknown_slider_is_ignored() {
    let mut ctx = TilingContext::new(EngineConfig::default());
    ctx.load(SCALED).unwrap();
    assert!(!ctx.set_slider("nope", 1.0));
}

#[test]
fn reparse_needs_a_source() {
    let mut ctx = TilingContext::new(EngineConfig::default());
    assert!(matches!(ctx.sliders_changed(false), Err(LoadError::Syntax(_))));
    assert_ne!(ctx.slider_status(), STATUS_OK);
}

#[test]
fn conversion_installs_a_new_tiling() {
    let mut ctx = TilingContext::new(EngineConfig::default());
    ctx.load("e2. angleunit(deg) tile(1,90,*4) tile(1,90,*4) c(0,0,1,0,0)").unwrap();
    let order = ctx.active().order;
    let mut map = ctx.new_map().unwrap();
    ctx.config_mut().minimize_on_convert = true;
    ctx.convert_from(&mut map).unwrap();
    assert_eq!(ctx.active().shapes.len(), 1);
    assert_eq!(ctx.active().name, "converted");
    assert!(ctx.active().order > order);
    assert_eq!(ctx.source(), None);
}
