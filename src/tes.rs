// Loader for the tiling description language: a sequence of `name(args)` and
// `name.` directives plus `#` comment lines. A load builds a fresh tiling and
// runs the consistency pipeline on it; nothing is shared with the caller until
// the whole file has been accepted.
use crate::algorithms::connections::{apply_repeat, check_edge_lengths, connect, reset_connections, set_stretch_shear};
use crate::algorithms::shape_builder::build_shape;
use crate::algorithms::unmirror::unmirror;
use crate::algorithms::valence::compute_vertex_valence;
use crate::config::EngineConfig;
use crate::error::{ClosingDefect, LoadError, ParseError, SourcePos};
use crate::expr::ExprParser;
use crate::geometry::limits::{in_repeat_bounds, MAX_SHAPES, MAX_SHAPE_EDGES, MAX_SLIDERS, MAX_SOURCE_LEN};
use crate::model::{GeometryKind, IntSlider, Shape, Slider, Tiling, DEFAULT_AFFINE_LIMIT, UNNAMED};
use tracing::{debug, info};

const SUBLINE_EPS: f64 = 1e-4;

/// Receives the tree-state payloads of files that declare them (`treestate(...)`).
pub trait RuleCollaborator {
    /// Check the parsed tree states against the finished tiling.
    fn verify(&mut self, tiling: &Tiling) -> Result<(), String>;
}

/// Accepts every set of tree states unchecked.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptRules;

impl RuleCollaborator for AcceptRules {
    fn verify(&mut self, _tiling: &Tiling) -> Result<(), String> { Ok(()) }
}

#[derive(Clone, Copy)]
pub struct LoadOptions<'a> {
    pub config: &'a EngineConfig,
    /// Slider values are taken from this tiling, by position, instead of the declared defaults.
    pub prior: Option<&'a Tiling>,
}

struct TesReader<'a> {
    ep: ExprParser<'a>,
    t: Tiling,
    prior: Option<&'a Tiling>,
    angleunit: f64,
    distunit: f64,
}

impl<'a> TesReader<'a> {
    fn bad(&self, at: SourcePos, message: impl Into<String>) -> ParseError {
        ParseError { message: message.into(), position: at }
    }

    fn index(&mut self, bound: usize) -> Result<usize, ParseError> {
        let at = self.ep.position();
        let v = self.ep.iparse()?;
        if v < 0 || v as usize >= bound {
            return Err(self.bad(at, format!("bad index: {v}")));
        }
        Ok(v as usize)
    }

    fn shape_index(&mut self) -> Result<usize, ParseError> { self.index(self.t.shapes.len()) }

    fn edge_index(&mut self, shape: usize) -> Result<usize, ParseError> { self.index(self.t.shapes[shape].size()) }

    fn set_geometry(&mut self, g: GeometryKind) {
        self.t.geometry = g;
        self.ep.space = g.space();
    }

    fn run(mut self, config: &EngineConfig) -> Result<Tiling, LoadError> {
        loop {
            self.ep.vars.insert("distunit".into(), self.distunit);
            self.ep.vars.insert("angleunit".into(), self.angleunit);
            if self.ep.at_end() {
                break;
            }
            if self.ep.peek() == Some(b'#') {
                self.comment();
                continue;
            }
            let at = self.ep.position();
            let name = self.ep.next_token();
            if name.is_empty() {
                return Err(self.bad(at, "expecting command").into());
            }
            if self.ep.eat(".") {
                self.flag(&name, at)?;
            } else if self.ep.eat("(") {
                self.call(&name, at)?;
            } else {
                return Err(self.bad(at, format!("expecting command, found '{name}'")).into());
            }
        }
        self.finish(config)
    }

    fn comment(&mut self) {
        self.ep.take_char();
        let doubled = self.ep.peek() == Some(b'#');
        if doubled {
            self.ep.take_char();
        }
        while self.ep.peek() == Some(b' ') {
            self.ep.take_char();
        }
        let s = self.ep.take_line();
        if doubled {
            if self.t.name == UNNAMED {
                self.t.name = s;
            } else {
                self.t.comment.push_str(&s);
                self.t.comment.push('\n');
            }
        }
    }

    fn flag(&mut self, name: &str, at: SourcePos) -> Result<(), ParseError> {
        match name {
            "e2" => self.set_geometry(GeometryKind::Euclidean),
            "h2" => self.set_geometry(GeometryKind::Hyperbolic),
            "s2" => self.set_geometry(GeometryKind::Spherical),
            "a2" => {
                self.set_geometry(GeometryKind::Affine);
                self.t.affine_limit = DEFAULT_AFFINE_LIMIT;
            }
            "star" => self.t.is_star = true,
            "combinatorial" => self.t.is_combinatorial = true,
            _ => return Err(self.bad(at, format!("unknown directive '{name}.'"))),
        }
        Ok(())
    }

    fn call(&mut self, name: &str, at: SourcePos) -> Result<(), LoadError> {
        match name {
            "c2" => {
                let curv = self.ep.parse_par()?;
                self.set_geometry(GeometryKind::from_curvature(curv));
            }
            "option" => self.options()?,
            "angleunit" => self.angleunit = self.ep.parse_par()?,
            "distunit" => self.distunit = self.ep.parse_par()?,
            "line" => {
                let i = self.optional_shape(at)?;
                self.t.shapes[i].line = true;
                self.t.have_line = true;
            }
            "grave" => {
                let i = self.optional_shape(at)?;
                self.t.shapes[i].pseudohept = true;
                self.t.have_ph = true;
            }
            "slider" => self.slider(at)?,
            "intslider" => self.intslider(at)?,
            "let" => {
                let tok = self.ep.next_token();
                if tok.is_empty() {
                    return Err(self.ep.error("expecting variable name").into());
                }
                self.ep.force_eat("=")?;
                let v = self.ep.parse_par()?;
                debug!(name = %tok, value = v, "let");
                self.ep.vars.insert(tok, v);
            }
            "tile" => self.tile(false, at)?,
            "unittile" => self.tile(true, at)?,
            "affine_limit" => {
                self.t.affine_limit = self.ep.uparse()?;
                self.ep.force_eat(")")?;
            }
            "cscale" => self.t.cscale = self.ep.parse_par()?,
            "treestate" => self.treestate()?,
            "first_treestate" => {
                self.t.first_treestate = Some(self.ep.iparse()?);
                self.ep.force_eat(")")?;
            }
            "yendor_backsteps" => {
                self.t.yendor_backsteps = self.ep.iparse()?;
                self.ep.force_eat(")")?;
            }
            "range" => {
                self.t.range = self.ep.iparse()?;
                self.ep.force_eat(")")?;
            }
            "floor_scale" => self.t.floor_scale = self.ep.parse_par()?,
            "boundary_ratio" => self.t.boundary_ratio = self.ep.parse_par()?,
            "conway" => self.conway()?,
            "c" => {
                let a = self.shape_index()?;
                self.ep.force_eat(",")?;
                let ae = self.edge_index(a)?;
                self.ep.force_eat(",")?;
                let b = self.shape_index()?;
                self.ep.force_eat(",")?;
                let be = self.edge_index(b)?;
                self.ep.force_eat(",")?;
                let m = self.ep.iparse()?;
                self.ep.force_eat(")")?;
                connect(&mut self.t, a, ae, b, be, m != 0);
            }
            "subline" => {
                let a = self.shape_index()?;
                self.ep.force_eat(",")?;
                let i = self.edge_index(a)?;
                self.ep.force_eat(",")?;
                let j = self.edge_index(a)?;
                self.ep.force_eat(")")?;
                self.t.shapes[a].sublines.push((i, j));
            }
            "sublines" => self.sublines()?,
            "repeat" => {
                let a = self.shape_index()?;
                self.ep.force_eat(",")?;
                let pos = self.ep.position();
                let rep = self.ep.iparse()?;
                self.ep.force_eat(")")?;
                if rep <= 0 || !in_repeat_bounds(rep) {
                    return Err(self.bad(pos, format!("bad repeat value {rep}")).into());
                }
                apply_repeat(&mut self.t.shapes[a], rep as usize).map_err(|m| self.bad(pos, m))?;
            }
            "debug" => {
                let shape = self.shape_index()?;
                self.ep.force_eat(")")?;
                info!(shape, "connection debugger requested");
                return Err(LoadError::DebugRequest { shape, tiling: Box::new(self.t.clone()) });
            }
            "stretch_shear" => {
                let stretch = self.ep.rparse()?;
                self.ep.force_eat(",")?;
                let shear = self.ep.rparse()?;
                self.ep.force_eat(",")?;
                let a = self.shape_index()?;
                self.ep.force_eat(",")?;
                let e = self.edge_index(a)?;
                self.ep.force_eat(")")?;
                set_stretch_shear(&mut self.t, a, e, stretch, shear);
            }
            _ => return Err(self.bad(at, format!("unknown directive '{name}('")).into()),
        }
        Ok(())
    }

    fn optional_shape(&mut self, at: SourcePos) -> Result<usize, ParseError> {
        if self.ep.eat(")") {
            return self.t.shapes.len().checked_sub(1).ok_or_else(|| self.bad(at, "no tile to mark"));
        }
        let i = self.shape_index()?;
        self.ep.force_eat(")")?;
        Ok(i)
    }

    fn options(&mut self) -> Result<(), ParseError> {
        self.ep.force_eat("\"")?;
        loop {
            let s = self.ep.take_until(b'"')?;
            self.ep.take_char();
            self.t.options.push(s);
            if self.ep.eat(",") {
                self.ep.force_eat("\"")?;
                continue;
            }
            return self.ep.force_eat(")");
        }
    }

    fn slider_count_ok(&self, at: SourcePos) -> Result<(), ParseError> {
        if self.t.sliders.len() + self.t.intsliders.len() >= MAX_SLIDERS {
            return Err(self.bad(at, "too many sliders"));
        }
        Ok(())
    }

    fn slider(&mut self, at: SourcePos) -> Result<(), ParseError> {
        self.slider_count_ok(at)?;
        let name = self.ep.next_token();
        self.ep.force_eat(",")?;
        let zero = self.ep.rparse()?;
        self.ep.force_eat(",")?;
        let min = self.ep.rparse()?;
        self.ep.force_eat(",")?;
        let max = self.ep.rparse()?;
        self.ep.force_eat(")")?;
        let q = self.t.sliders.len();
        let current = self.prior.and_then(|p| p.sliders.get(q)).map_or(zero, |s| s.current);
        self.ep.vars.insert(name.clone(), current);
        self.t.sliders.push(Slider { name, zero, current, min, max });
        Ok(())
    }

    fn intslider(&mut self, at: SourcePos) -> Result<(), ParseError> {
        self.slider_count_ok(at)?;
        let name = self.ep.next_token();
        self.ep.force_eat(",")?;
        let zero = self.ep.iparse()?;
        self.ep.force_eat(",")?;
        let min = self.ep.iparse()?;
        self.ep.force_eat(",")?;
        let max = self.ep.iparse()?;
        self.ep.force_eat(")")?;
        let q = self.t.intsliders.len();
        let current = self.prior.and_then(|p| p.intsliders.get(q)).map_or(zero, |s| s.current);
        self.ep.vars.insert(name.clone(), current as f64);
        self.t.intsliders.push(IntSlider { name, zero, current, min, max });
        Ok(())
    }

    fn push_corner(&self, sh: &mut Shape, dist: f64, angle: f64, ideal: bool) -> Result<(), ParseError> {
        sh.in_edges.push(self.ep.validate_real(dist * self.distunit)?);
        sh.in_angles.push(self.ep.validate_real(angle * self.angleunit)?);
        sh.ideal_markers.push(ideal);
        if sh.in_edges.len() > MAX_SHAPE_EDGES {
            return Err(self.ep.error("tile has too many edges"));
        }
        Ok(())
    }

    // Entries are `d, a`; an ideal corner is `[d, a, d, a]` or `d, [a, d, a]`;
    // `*n` repeats everything so far and `*inf` makes the tile apeirogonal.
    fn tile(&mut self, unit: bool, at: SourcePos) -> Result<(), LoadError> {
        if self.t.shapes.len() >= MAX_SHAPES {
            return Err(self.bad(at, "too many tiles").into());
        }
        let mut sh = Shape { id: self.t.shapes.len(), repeat_value: 1, ..Shape::default() };
        loop {
            if self.ep.eat(")") {
                break;
            }
            if self.ep.eat("*") {
                let pos = self.ep.position();
                let frep = self.ep.parse()?;
                if frep == f64::INFINITY {
                    sh.apeirogonal = true;
                    self.ep.force_eat(")")?;
                    break;
                }
                let frep = self.ep.validate_real(frep)?;
                let rep = (frep + 0.5).floor() as i64;
                if rep < 0 {
                    return Err(self.bad(pos, "don't know how to use a negative repeat in tile definition").into());
                }
                if !in_repeat_bounds(rep) || sh.in_edges.len() * rep as usize > MAX_SHAPE_EDGES {
                    return Err(self.bad(pos, format!("repeat factor {rep} too large")).into());
                }
                let base = sh.in_edges.len();
                if rep == 0 {
                    sh.in_edges.clear();
                    sh.in_angles.clear();
                    sh.ideal_markers.clear();
                }
                for _ in 1..rep {
                    for j in 0..base {
                        sh.in_edges.push(sh.in_edges[j]);
                        sh.in_angles.push(sh.in_angles[j]);
                        sh.ideal_markers.push(sh.ideal_markers[j]);
                    }
                }
                if !self.ep.eat(")") {
                    return Err(self.ep.error("expecting ) after repeat").into());
                }
                sh.repeat_value = rep as usize;
                break;
            }
            let leading_bracket = !unit && self.ep.eat("[");
            let dist = if unit {
                1.0
            } else {
                let d = self.ep.parse()?;
                self.ep.force_eat(",")?;
                d
            };
            if leading_bracket || self.ep.eat("[") {
                let a = self.ep.parse()?;
                self.ep.force_eat(",")?;
                self.push_corner(&mut sh, dist, a, true)?;
                let d = self.ep.parse()?;
                self.ep.force_eat(",")?;
                let a = self.ep.parse()?;
                self.ep.force_eat("]")?;
                self.push_corner(&mut sh, d, a, false)?;
            } else {
                let a = self.ep.parse()?;
                self.push_corner(&mut sh, dist, a, false)?;
            }
            if self.ep.eat(",") {
                continue;
            }
            if self.ep.eat(")") {
                break;
            }
            return Err(self.ep.error("expecting , or )").into());
        }
        if sh.in_edges.is_empty() {
            return Err(self.bad(at, "tile has no corners").into());
        }

        build_shape(&mut sh, self.t.space(), self.t.is_combinatorial).map_err(|mut e| {
            e.defect = match e.defect {
                ClosingDefect::Distance(d) => ClosingDefect::Distance(d / self.distunit),
                ClosingDefect::Angle(a) => ClosingDefect::Angle(a / self.angleunit),
                other => other,
            };
            e.params = self.ep.vars.clone();
            e
        })?;
        reset_connections(&mut sh);
        self.t.shapes.push(sh);
        Ok(())
    }

    fn treestate(&mut self) -> Result<(), ParseError> {
        let start = self.ep.at;
        let mut depth = 1usize;
        while depth > 0 {
            match self.ep.take_char() {
                Some(b'(') => depth += 1,
                Some(b')') => depth -= 1,
                Some(_) => {}
                None => return Err(self.ep.error("unterminated treestate")),
            }
        }
        let payload = self.ep.text(start, self.ep.at - 1);
        self.t.tree_states.push(payload.trim().to_string());
        self.t.have_tree = true;
        Ok(())
    }

    // Cycle notation: `(a b)` glues edge a of tile 0 to its edge b, `[a b]` does so
    // mirrored; primes or `@k` select the tile, `(a)` glues an edge to itself.
    fn conway(&mut self) -> Result<(), ParseError> {
        self.ep.force_eat("\"")?;
        loop {
            let mirror = if self.ep.eat("(") {
                false
            } else if self.ep.eat("[") {
                true
            } else if self.ep.eat("\"") {
                break;
            } else {
                return Err(self.ep.error("cannot parse Conway notation"));
            };
            let (a, ae) = self.conway_end()?;
            let (b, be) = if self.ep.eat(")") || self.ep.eat("]") {
                (a, ae)
            } else {
                let end = self.conway_end()?;
                // the closer may be omitted before the next cycle
                if !self.ep.eat(")") {
                    self.ep.eat("]");
                }
                end
            };
            connect(&mut self.t, a, ae, b, be, mirror);
        }
        self.ep.force_eat(")")
    }

    fn conway_end(&mut self) -> Result<(usize, usize), ParseError> {
        let at = self.ep.position();
        let edge = self.ep.iparse()?;
        let mut shape = 0i64;
        while self.ep.eat("'") {
            shape += 1;
        }
        if self.ep.eat("@") {
            shape = self.ep.iparse()?;
        }
        if shape < 0 || shape as usize >= self.t.shapes.len() {
            return Err(self.bad(at, format!("bad index: {shape}")));
        }
        let shape = shape as usize;
        if edge < 0 || edge as usize >= self.t.shapes[shape].size() {
            return Err(self.bad(at, format!("bad index: {edge}")));
        }
        Ok((shape, edge as usize))
    }

    fn sublines(&mut self) -> Result<(), ParseError> {
        let d = self.ep.rparse()? * self.distunit;
        let eps = if self.ep.eat(",") { self.ep.rparse()? * self.distunit } else { SUBLINE_EPS };
        self.ep.force_eat(")")?;
        let space = self.t.space();
        for sh in &mut self.t.shapes {
            let n = sh.vertices.len();
            for i in 0..n {
                for j in 0..i {
                    // skip sides of the polygon
                    if i == j + 1 || (j == 0 && i == n - 1) {
                        continue;
                    }
                    if (space.dist(sh.vertices[i], sh.vertices[j]) - d).abs() < eps {
                        debug!(shape = sh.id, i, j, "subline");
                        sh.sublines.push((i, j));
                    }
                }
            }
        }
        Ok(())
    }

    fn finish(mut self, config: &EngineConfig) -> Result<Tiling, LoadError> {
        check_edge_lengths(&self.t)?;
        if config.unmirror {
            unmirror(&mut self.t);
        }
        if !self.t.have_tree {
            compute_vertex_valence(&mut self.t)?;
        }
        Ok(self.t)
    }
}

/// Parse and validate a tiling description.
pub fn load(source: &str, opts: LoadOptions<'_>, rules: &mut dyn RuleCollaborator) -> Result<Tiling, LoadError> {
    if source.len() > MAX_SOURCE_LEN {
        return Err(ParseError { message: format!("source exceeds {MAX_SOURCE_LEN} bytes"), position: SourcePos::default() }.into());
    }
    let mut t = Tiling { affine_limit: opts.config.affine_limit, ..Tiling::default() };
    t.order = opts.prior.map_or(0, |p| p.order) + 1;
    let mut ep = ExprParser::new(source);
    ep.space = t.space();
    let reader = TesReader { ep, t, prior: opts.prior, angleunit: 1.0, distunit: 1.0 };
    let t = reader.run(opts.config)?;
    if t.have_tree {
        rules.verify(&t).map_err(LoadError::Rules)?;
    }
    info!(name = %t.name, shapes = t.shapes.len(), geometry = ?t.geometry, "loaded tiling");
    Ok(t)
}

/// [`load`] with the default configuration and no tree-state checking.
pub fn load_str(source: &str) -> Result<Tiling, LoadError> {
    load(source, LoadOptions { config: &EngineConfig::default(), prior: None }, &mut AcceptRules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeLength, Valence};

    #[test]
    fn header_comments_set_name_then_comment() {
        let t = load_str("## Squares\n## plain grid\n# ignored\ne2. angleunit(deg) tile(1,90,*4) c(0,0,0,2,0)").unwrap();
        assert_eq!(t.name, "Squares");
        assert_eq!(t.comment, "plain grid\n");
        assert_eq!(t.shapes[0].repeat_value, 4);
    }

    #[test]
    fn options_and_parameters() {
        let src = r#"e2. option("a", "b c") cscale(2) range(3) floor_scale(.25) boundary_ratio(1.5) yendor_backsteps(2)
            angleunit(deg) tile(1,90,*4) c(0,0,0,2,0)"#;
        let t = load_str(src).unwrap();
        assert_eq!(t.options, vec!["a".to_string(), "b c".to_string()]);
        assert_eq!(t.cscale, 2.0);
        assert_eq!(t.range, 3);
        assert_eq!(t.floor_scale, 0.25);
        assert_eq!(t.boundary_ratio, 1.5);
        assert_eq!(t.yendor_backsteps, 2);
    }

    #[test]
    fn let_and_sliders_feed_expressions() {
        let src = "e2. angleunit(deg) slider(s, 2, 1, 3) let(q = s/2) tile(q,90,*4) c(0,0,0,2,0)";
        let t = load_str(src).unwrap();
        assert_eq!(t.sliders.len(), 1);
        assert!(t.shapes[0].edges[0].matches(EdgeLength::Finite(1.0)));
    }

    #[test]
    fn prior_slider_values_win() {
        let src = "e2. angleunit(deg) slider(s, 1, 1, 3) tile(s,90,*4) c(0,0,0,2,0)";
        let mut prior = load_str(src).unwrap();
        prior.sliders[0].current = 2.0;
        let t = load(src, LoadOptions { config: &EngineConfig::default(), prior: Some(&prior) }, &mut AcceptRules).unwrap();
        assert!(t.shapes[0].edges[0].matches(EdgeLength::Finite(2.0)));
        assert_eq!(t.sliders[0].current, 2.0);
        assert_eq!(t.order, prior.order + 1);
    }

    #[test]
    fn conway_notation_glues_edges() {
        let t = load_str(r#"e2. angleunit(deg) tile(1,90,1,90,1,90,1,90) conway("(0 2)(1 3)")"#).unwrap();
        assert_eq!(t.shapes[0].connections[0].eid, 2);
        assert_eq!(t.shapes[0].connections[3].eid, 1);
        assert!(t.shapes[0].vertex_valence.iter().all(|v| *v == Valence::Finite(4)));
    }

    #[test]
    fn conway_closer_is_optional() {
        let t = load_str(r#"e2. angleunit(deg) tile(1,90,1,90,1,90,1,90) conway("(0 2(1 3)")"#).unwrap();
        assert_eq!(t.shapes[0].connections[0].eid, 2);
        assert_eq!(t.shapes[0].connections[1].eid, 3);
    }

    #[test]
    fn line_and_grave_mark_the_last_tile() {
        let t = load_str("e2. angleunit(deg) tile(1,90,*4) line() grave(0) c(0,0,0,2,0)").unwrap();
        assert!(t.have_line && t.have_ph);
        assert!(t.shapes[0].line && t.shapes[0].pseudohept);
    }

    #[test]
    fn sublines_find_diagonals() {
        let t = load_str("e2. angleunit(deg) tile(1,90,*4) c(0,0,0,2,0) sublines(sqrt(2))").unwrap();
        assert_eq!(t.shapes[0].sublines.len(), 2);
    }

    #[test]
    fn tree_states_go_to_the_collaborator() {
        struct Reject;
        impl RuleCollaborator for Reject {
            fn verify(&mut self, t: &Tiling) -> Result<(), String> {
                Err(format!("{} states", t.tree_states.len()))
            }
        }
        let src = "e2. angleunit(deg) tile(1,90,*4) c(0,0,0,2,0) treestate(0, (1, 2)) first_treestate(0)";
        let err = load(src, LoadOptions { config: &EngineConfig::default(), prior: None }, &mut Reject).unwrap_err();
        assert!(matches!(err, LoadError::Rules(ref m) if m == "1 states"));
        let t = load_str(src).unwrap();
        assert_eq!(t.tree_states, vec!["0, (1, 2)".to_string()]);
        assert_eq!(t.first_treestate, Some(0));
        assert!(!t.have_valence);
    }

    #[test]
    fn syntax_errors_carry_positions() {
        let err = load_str("e2.\n  bogus(1)").unwrap_err();
        match err {
            LoadError::Syntax(e) => assert_eq!((e.position.line, e.position.column), (2, 3)),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(load_str("e2. tile(1,90,*-2)"), Err(LoadError::Syntax(_))));
        assert!(matches!(load_str("e2. tile(1,90,*4 c(0,0,0,0,0)"), Err(LoadError::Syntax(_))));
        assert!(matches!(load_str("e2. tile()"), Err(LoadError::Syntax(_))));
    }
}
