// Homogeneous 2D model geometry: points are 3-vectors, motions are 3x3 matrices.
// Euclidean points live on z = 1, hyperbolic ones on the hyperboloid
// z^2 - x^2 - y^2 = 1, spherical ones on the unit sphere.
use super::tolerance::{approx_eq, EPS};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::{Add, Mul, Sub};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Model origin.
pub const C0: Point = Point { x: 0.0, y: 0.0, z: 1.0 };

impl Point {
    pub const fn new(x: f64, y: f64, z: f64) -> Self { Self { x, y, z } }

    #[inline]
    pub fn coord(&self, i: usize) -> f64 {
        match i { 0 => self.x, 1 => self.y, _ => self.z }
    }

    #[inline]
    pub fn sq_norm(&self) -> f64 { self.x * self.x + self.y * self.y + self.z * self.z }

    /// Planar angle of the (x, y) part.
    #[inline]
    pub fn angle(&self) -> f64 { self.y.atan2(self.x) }

    pub fn is_finite(&self) -> bool { self.x.is_finite() && self.y.is_finite() && self.z.is_finite() }

    pub fn approx_eq(&self, o: &Point) -> bool {
        approx_eq(self.x, o.x) && approx_eq(self.y, o.y) && approx_eq(self.z, o.z)
    }

    /// Point in the projective chart (z = 1); `None` for points at z = 0.
    pub fn chart(&self) -> Option<Point> {
        if self.z.abs() <= f64::EPSILON { None } else { Some(*self * (1.0 / self.z)) }
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, o: Point) -> Point { Point::new(self.x + o.x, self.y + o.y, self.z + o.z) }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, o: Point) -> Point { Point::new(self.x - o.x, self.y - o.y, self.z - o.z) }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, k: f64) -> Point { Point::new(self.x * k, self.y * k, self.z * k) }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub m: [[f64; 3]; 3],
}

impl Default for Motion {
    fn default() -> Self { Motion::IDENTITY }
}

impl Motion {
    pub const IDENTITY: Motion = Motion { m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]] };

    pub fn spin(a: f64) -> Motion {
        let (s, c) = a.sin_cos();
        Motion { m: [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]] }
    }

    /// Reflection x -> -x.
    pub fn mirror_x() -> Motion {
        Motion { m: [[-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]] }
    }

    pub fn column(&self, j: usize) -> Point { Point::new(self.m[0][j], self.m[1][j], self.m[2][j]) }

    fn set_column(&mut self, j: usize, p: Point) {
        self.m[0][j] = p.x;
        self.m[1][j] = p.y;
        self.m[2][j] = p.z;
    }

    /// Image of the model origin.
    #[inline]
    pub fn origin_image(&self) -> Point { self.column(2) }

    pub fn apply(&self, p: Point) -> Point {
        let r = |i: usize| self.m[i][0] * p.x + self.m[i][1] * p.y + self.m[i][2] * p.z;
        Point::new(r(0), r(1), r(2))
    }

    pub fn approx_eq(&self, o: &Motion) -> bool {
        (0..3).all(|i| (0..3).all(|j| approx_eq(self.m[i][j], o.m[i][j])))
    }

    pub fn is_finite(&self) -> bool { self.m.iter().flatten().all(|v| v.is_finite()) }

    pub fn det(&self) -> f64 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    pub fn inverse(&self) -> Option<Motion> {
        let d = self.det();
        if d.abs() <= f64::EPSILON || !d.is_finite() {
            return None;
        }
        let m = &self.m;
        let mut r = [[0.0; 3]; 3];
        for (i, row) in r.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                // cofactor of (j, i), transposed
                let (a0, a1) = ((j + 1) % 3, (j + 2) % 3);
                let (b0, b1) = ((i + 1) % 3, (i + 2) % 3);
                *v = (m[a0][b0] * m[a1][b1] - m[a0][b1] * m[a1][b0]) / d;
            }
        }
        Some(Motion { m: r })
    }
}

impl Mul for Motion {
    type Output = Motion;
    fn mul(self, o: Motion) -> Motion {
        let mut r = [[0.0; 3]; 3];
        for (i, row) in r.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = (0..3).map(|k| self.m[i][k] * o.m[k][j]).sum();
            }
        }
        Motion { m: r }
    }
}

impl Mul<Point> for Motion {
    type Output = Point;
    fn mul(self, p: Point) -> Point { self.apply(p) }
}

/// Rotation taking the direction of `p` onto the positive x axis.
#[inline]
pub fn spintox(p: Point) -> Motion { Motion::spin(-p.angle()) }

/// Rotation taking the positive x axis onto the direction of `p`.
#[inline]
pub fn rspintox(p: Point) -> Motion { Motion::spin(p.angle()) }

/// Normalize an angle into (-pi, pi].
pub fn wrap_angle(a: f64) -> f64 {
    let mut a = a % (2.0 * PI);
    if a <= -PI { a += 2.0 * PI; }
    if a > PI { a -= 2.0 * PI; }
    a
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Space {
    Euclidean,
    Hyperbolic,
    Spherical,
}

impl Space {
    // Sign of the z-row coupling in boosts: +1 hyperbolic, -1 spherical, 0 flat.
    #[inline]
    fn sig(self) -> f64 {
        match self { Space::Euclidean => 0.0, Space::Hyperbolic => 1.0, Space::Spherical => -1.0 }
    }

    pub fn xpush(self, d: f64) -> Motion {
        match self {
            Space::Euclidean => Motion { m: [[1.0, 0.0, d], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]] },
            Space::Hyperbolic => {
                let (c, s) = (d.cosh(), d.sinh());
                Motion { m: [[c, 0.0, s], [0.0, 1.0, 0.0], [s, 0.0, c]] }
            }
            Space::Spherical => {
                let (s, c) = d.sin_cos();
                Motion { m: [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]] }
            }
        }
    }

    #[inline]
    pub fn xpush0(self, d: f64) -> Point { self.xpush(d).origin_image() }

    pub fn normalize(self, p: Point) -> Point {
        match self {
            Space::Euclidean => p.chart().unwrap_or(p),
            Space::Hyperbolic => {
                let q = p.z * p.z - p.x * p.x - p.y * p.y;
                if q > 0.0 { p * (p.z.signum() / q.sqrt()) } else { p }
            }
            Space::Spherical => {
                let n = p.sq_norm().sqrt();
                if n > 0.0 { p * (1.0 / n) } else { p }
            }
        }
    }

    /// Motion taking the origin to `h`.
    pub fn push_to(self, h: Point) -> Motion {
        let h = self.normalize(h);
        let s = self.sig();
        let k = if s == 0.0 { 0.0 } else { s / (1.0 + h.z) };
        let (x, y) = (h.x, h.y);
        Motion {
            m: [
                [1.0 + k * x * x, k * x * y, x],
                [k * x * y, 1.0 + k * y * y, y],
                [s * x, s * y, if s == 0.0 { 1.0 } else { h.z }],
            ],
        }
    }

    /// Motion taking `h` to the origin.
    pub fn push_from(self, h: Point) -> Motion {
        let h = self.normalize(h);
        self.push_to(Point::new(-h.x, -h.y, h.z))
    }

    pub fn dist(self, a: Point, b: Point) -> f64 {
        let (a, b) = (self.normalize(a), self.normalize(b));
        let d = a - b;
        match self {
            Space::Euclidean => d.x.hypot(d.y),
            Space::Hyperbolic => {
                let iv = d.x * d.x + d.y * d.y - d.z * d.z;
                2.0 * (iv.abs().sqrt() / 2.0).asinh()
            }
            Space::Spherical => 2.0 * (d.sq_norm().sqrt() / 2.0).min(1.0).asin(),
        }
    }

    #[inline]
    pub fn dist0(self, a: Point) -> f64 { self.dist(C0, a) }

    /// Whether `p` is a proper point of the model rather than an ideal or ultra-ideal one.
    pub fn is_proper(self, p: Point) -> bool {
        self != Space::Hyperbolic || p.z * p.z - p.x * p.x - p.y * p.y > EPS
    }

    /// Coincidence test: proper points on the normalized model, others in the chart.
    pub fn same_point(self, a: Point, b: Point) -> bool {
        if self.is_proper(a) && self.is_proper(b) {
            return self.normalize(a).approx_eq(&self.normalize(b));
        }
        match (a.chart(), b.chart()) {
            (Some(a), Some(b)) => a.approx_eq(&b),
            _ => false,
        }
    }

    pub fn mid(self, a: Point, b: Point) -> Point {
        match self {
            Space::Euclidean => self.normalize(self.normalize(a) + self.normalize(b)),
            _ => self.normalize(a + b),
        }
    }

    /// Point at distance 1 from `material` in the direction of `dir`.
    pub fn towards_inf(self, material: Point, dir: Point) -> Point {
        let t = self.push_to(material);
        t * (rspintox(self.push_from(material) * dir) * self.xpush0(1.0))
    }

    /// Point of the line through `a` and `b` closest to the origin, in the projective chart.
    pub fn closest_to_zero(self, a: Point, b: Point) -> Point {
        if (a - b).sq_norm() < EPS * EPS || !a.is_finite() {
            return a;
        }
        let (Some(a), Some(b)) = (a.chart(), b.chart()) else { return a };
        let mut mul_a = 0.0;
        let mut mul_b = 0.0;
        for i in 0..2 {
            let z = a.coord(i) - b.coord(i);
            mul_a += a.coord(i) * z;
            mul_b -= b.coord(i) * z;
        }
        let h = (a * mul_b + b * mul_a) * (1.0 / (mul_a + mul_b));
        self.normalize(Point::new(h.x, h.y, 1.0))
    }

    /// Re-orthonormalize a motion that drifted through repeated composition.
    pub fn fix(self, t: Motion) -> Motion {
        let mut r = t;
        match self {
            Space::Euclidean => {
                // linear part only; keep the translation column
                let mut c0 = [t.m[0][0], t.m[1][0]];
                let n0 = c0[0].hypot(c0[1]);
                c0 = [c0[0] / n0, c0[1] / n0];
                let mut c1 = [t.m[0][1], t.m[1][1]];
                let p = c1[0] * c0[0] + c1[1] * c0[1];
                c1 = [c1[0] - p * c0[0], c1[1] - p * c0[1]];
                let n1 = c1[0].hypot(c1[1]);
                c1 = [c1[0] / n1, c1[1] / n1];
                r.m[0][0] = c0[0];
                r.m[1][0] = c0[1];
                r.m[0][1] = c1[0];
                r.m[1][1] = c1[1];
                r.m[2] = [0.0, 0.0, 1.0];
                let z = t.m[2][2];
                if z.abs() > f64::EPSILON {
                    r.m[0][2] = t.m[0][2] / z;
                    r.m[1][2] = t.m[1][2] / z;
                }
            }
            Space::Hyperbolic | Space::Spherical => {
                let g = if self == Space::Hyperbolic { -1.0 } else { 1.0 };
                let dot = |a: Point, b: Point| a.x * b.x + a.y * b.y + g * a.z * b.z;
                let order = [2usize, 0, 1];
                for (n, &j) in order.iter().enumerate() {
                    let mut c = r.column(j);
                    for &k in &order[..n] {
                        let ck = r.column(k);
                        c = c - ck * (dot(c, ck) / dot(ck, ck));
                    }
                    let len = dot(c, c).abs().sqrt();
                    if len > 0.0 {
                        c = c * (1.0 / len);
                    }
                    r.set_column(j, c);
                }
            }
        }
        r
    }

    /// Edge length and corner angle of the regular ideal polygon with `n` sides,
    /// measured on the circle of Klein radius `u`.
    pub fn regular_ideal(self, n: f64, u: f64) -> (f64, f64) {
        let alpha = 2.0 * PI / n;
        let h1 = Point::new(alpha.cos() * u, -alpha.sin() * u, 1.0);
        let h2 = Point::new(u, 0.0, 1.0);
        let h3 = Point::new(alpha.cos() * u, alpha.sin() * u, 1.0);
        let h12 = self.mid(h1, h2);
        let h23 = self.mid(h2, h3);
        let len = self.dist(h12, h23);
        let t = self.push_from(h12);
        let beta = t.origin_image().angle();
        let gamma = (t * h23).angle();
        (len, PI / 2.0 - (gamma - beta))
    }
}
