// Rotational periods of connection patterns and combinatorial vertex valences.
use crate::error::ConsistencyError;
use crate::geometry::tolerance::{reduce_gcd, EPS_TURN};
use crate::model::{Connection, Tiling, Valence};
use std::f64::consts::TAU;
use tracing::debug;

// Longest incidence walk around one vertex before it is declared inconsistent.
const MAX_WALK: usize = 100_000;

/// Compute `cycle_length` for every shape and, for non-affine non-star tilings,
/// per-vertex valence, period and angle lists plus the min/max valence.
pub fn compute_vertex_valence(t: &mut Tiling) -> Result<(), ConsistencyError> {
    for sh in &mut t.shapes {
        sh.cycle_length = sh.size() / sh.repeat_value.max(1);
    }
    loop {
        refine_cycle_lengths(t)?;
        if t.geometry.is_affine() || t.is_star {
            return Ok(());
        }
        t.have_valence = true;
        if !walk_vertices(t)? {
            break;
        }
        debug!("cycle length reduced by a vertex walk, recomputing");
    }
    t.min_valence = t.shapes.iter().flat_map(|s| s.vertex_valence.iter().copied()).min();
    t.max_valence = t.shapes.iter().flat_map(|s| s.vertex_valence.iter().copied()).max();
    Ok(())
}

/// Phase 1: shrink candidate cycle lengths until their sum is stable.
fn refine_cycle_lengths(t: &mut Tiling) -> Result<(), ConsistencyError> {
    let mut last_total = None;
    loop {
        for i in 0..t.shapes.len() {
            let n = t.shapes[i].size();
            let mut k = t.shapes[i].cycle_length;
            while k < n {
                let cl = t.shapes[i].cycle_length;
                let co = t.shapes[i].connections[k];
                let co1 = t.shapes[i].connections[k - cl];
                if co.sid != co1.sid {
                    return Err(ConsistencyError::PeriodMismatch { shape: i, edge: k });
                }
                let target = &mut t.shapes[co.sid].cycle_length;
                *target = reduce_gcd(*target, co.eid as i64 - co1.eid as i64);
                k += 1;
            }
            for k in 0..n {
                let co = t.shapes[i].connections[k];
                let back = t.shapes[co.sid].connections[co.eid];
                if back.sid != i {
                    return Err(ConsistencyError::Asymmetric { shape: i, edge: k });
                }
                let cl = &mut t.shapes[i].cycle_length;
                *cl = reduce_gcd(*cl, k as i64 - back.eid as i64);
            }
            debug!(shape = i, cycle_length = t.shapes[i].cycle_length, size = n, "cycle length");
        }
        let total: usize = t.shapes.iter().map(|s| s.cycle_length).sum();
        if last_total == Some(total) {
            return Ok(());
        }
        last_total = Some(total);
    }
}

/// Phase 2: walk around every vertex. Returns true when a cycle length was
/// reduced and both phases must run again.
fn walk_vertices(t: &mut Tiling) -> Result<bool, ConsistencyError> {
    for i in 0..t.shapes.len() {
        let n = t.shapes[i].size();
        let mut valence = Vec::with_capacity(n);
        let mut period = Vec::with_capacity(n);
        let mut angle_lists = Vec::with_capacity(n);
        for k in 0..n {
            let start = Connection::new(i, k, false);
            let mut at = start;
            let mut total = 0.0;
            let (mut qty, mut pqty) = (0usize, 0usize);
            let mut angles = Vec::new();
            loop {
                let cl = t.shapes[at.sid].cycle_length.max(1) as i64;
                if at.sid == start.sid && (at.eid as i64 - start.eid as i64) % cl == 0 {
                    pqty = 0;
                }
                if qty > 0 && pqty == 0 && total == 0.0 {
                    break;
                }
                let mut a = t.shapes[at.sid].angles[at.eid];
                while a < 0.0 {
                    a += TAU;
                }
                while a > TAU {
                    a -= TAU;
                }
                total += a;
                angles.push(a);
                qty += 1;
                pqty += 1;
                let sh = &t.shapes[at.sid];
                at = sh.connections[(at.eid + 1) % sh.angles.len()];
                if total >= TAU - EPS_TURN || qty > MAX_WALK {
                    break;
                }
            }
            if total > TAU + EPS_TURN || qty > MAX_WALK {
                return Err(ConsistencyError::ImproperTotal { shape: i, vertex: k, total });
            }
            if at.sid != i {
                return Err(ConsistencyError::WrongShape { shape: i, vertex: k });
            }
            let cl = t.shapes[i].cycle_length;
            let off = at.eid as i64 - k as i64;
            if off % cl.max(1) as i64 != 0 {
                t.shapes[i].cycle_length = reduce_gcd(cl, off);
                return Ok(true);
            }
            valence.push(if total == 0.0 { Valence::Unbounded } else { Valence::Finite(qty) });
            period.push(pqty);
            angle_lists.push(angles);
        }
        let sh = &mut t.shapes[i];
        debug!(shape = i, valence = ?valence, "vertex valence");
        sh.vertex_valence = valence;
        sh.vertex_period = period;
        sh.vertex_angles = angle_lists;
    }
    Ok(false)
}
