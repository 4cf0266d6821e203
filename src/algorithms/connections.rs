// Edge-to-edge gluings between shapes, with rotational-repeat propagation.
use crate::error::ConsistencyError;
use crate::model::{Connection, Shape, Tiling};
use tracing::debug;

/// Every edge glued to itself; the two ends of an apeirogon glued to each other.
pub fn reset_connections(sh: &mut Shape) {
    let n = sh.size();
    sh.connections = (0..n).map(|i| Connection::new(sh.id, i, false)).collect();
    if sh.apeirogonal && n >= 2 {
        sh.connections[n - 2].eid = n - 1;
        sh.connections[n - 1].eid = n - 2;
    }
    sh.stretch_shear = vec![(1.0, 0.0); n];
}

/// Glue edge `ae` of shape `a` to edge `be` of shape `b`, on every periodic copy of both.
/// Indices must be valid; violations of the period structure are caught by later checks.
pub fn connect(t: &mut Tiling, a: usize, ae: usize, b: usize, be: usize, mirror: bool) {
    let mut write = |sid: usize, start: usize, target: Connection| {
        let sh = &mut t.shapes[sid];
        let (n, stride) = (sh.size(), sh.stride());
        if n == 0 || stride == 0 {
            return;
        }
        let mut e = start;
        loop {
            sh.connections[e] = target;
            e = (e + stride) % n;
            if e == start {
                break;
            }
        }
    };
    write(a, ae, Connection::new(b, be, mirror));
    write(b, be, Connection::new(a, ae, mirror));
}

/// Declare that the connections of `sh` repeat `rep` times around it.
pub fn apply_repeat(sh: &mut Shape, rep: usize) -> Result<(), String> {
    let n = sh.angles.len();
    if rep == 0 || n % rep != 0 {
        return Err(format!("repeat value {rep} should be a factor of the number of vertices {n}"));
    }
    sh.repeat_value = rep;
    let d = n / rep;
    for i in d..n {
        sh.connections[i] = sh.connections[i - d];
    }
    Ok(())
}

/// Set the affine stretch and shear of one edge; its partner receives the inverse gluing.
pub fn set_stretch_shear(t: &mut Tiling, sid: usize, eid: usize, stretch: f64, shear: f64) {
    let co = t.shapes[sid].connections[eid];
    t.shapes[sid].stretch_shear[eid] = (stretch, shear);
    let sign = if co.mirror { 1.0 } else { -1.0 };
    t.shapes[co.sid].stretch_shear[co.eid] = (1.0 / stretch, shear * sign * stretch);
    debug!(shape = sid, edge = eid, stretch, shear, "stretch_shear");
}

/// Glued edges must have equal length, unless the tiling is affine.
pub fn check_edge_lengths(t: &Tiling) -> Result<(), ConsistencyError> {
    if t.geometry.is_affine() {
        return Ok(());
    }
    for sh in &t.shapes {
        for (j, (&d1, co)) in sh.edges.iter().zip(&sh.connections).enumerate() {
            let d2 = t.shapes[co.sid].edges[co.eid];
            if !d1.flipped().matches(d2) {
                return Err(ConsistencyError::EdgeLengthMismatch { shape: sh.id, edge: j, target: *co, left: d1, right: d2 });
            }
        }
    }
    Ok(())
}
