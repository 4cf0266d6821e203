// Centralized tolerances. One scale-relative epsilon is used everywhere:
// polygon closure, edge-length agreement, angle totals, point coincidence.

pub const EPS: f64 = 1e-6;

// Slack for self-checks that compare results of long motion compositions.
pub const EPS_CHECK: f64 = 1e3 * EPS;

// Largest endpoint gap (summed over both ends) tolerated when an edge is glued
// onto its partner. Errors past this are inconsistent input, not rounding.
pub const ADJACENCY_SLACK: f64 = 0.1;

// Squared centroid norm under which a shape is recentred before use.
pub const DEGENERATE_CENTER_SQ: f64 = 1e-2;

// Distance below which a closing defect is reported as a rotation instead.
pub const EPS_DEFECT: f64 = 1e-9;

// Angle totals must reach a full turn within this absolute slack.
pub const EPS_TURN: f64 = 1e-6;

#[inline]
pub fn scale(a: f64, b: f64) -> f64 { 1f64.max(a.abs()).max(b.abs()) }

#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool { (a - b).abs() <= EPS * scale(a, b) }

#[inline]
pub fn approx_eq_eps(a: f64, b: f64, eps: f64) -> bool { (a - b).abs() <= eps * scale(a, b) }

#[inline]
pub fn near_zero(x: f64) -> bool { x.abs() <= EPS }

#[inline]
pub fn safe_div(num: f64, den: f64, fallback: f64) -> f64 {
    if den.abs() <= f64::EPSILON { fallback } else { num / den }
}

/// Non-negative remainder, the way cyclic indices are reduced.
#[inline]
pub fn gmod(a: i64, m: i64) -> i64 {
    if m == 0 { return a; }
    let r = a % m;
    if r < 0 { r + m.abs() } else { r }
}

pub fn gcd(a: usize, b: usize) -> usize {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// `gcd(x, |d|)` with the convention that a zero offset leaves `x` as is.
#[inline]
pub fn reduce_gcd(x: usize, d: i64) -> usize { gcd(x, d.unsigned_abs() as usize) }
