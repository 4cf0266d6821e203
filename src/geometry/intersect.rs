// Line-line intersection in the projective chart (z = 1), used for ideal vertices.
// Lines are given by a point and a tangent column of a motion; both are projected
// to the chart before solving the 2x2 system a1 + r*t1 = a2 + s*t2.
use super::math::Point;

/// Intersection of the line through `a1` along `t1` with the line through `a2` along `t2`.
/// `None` when the lines are parallel in the chart or a point lies at infinity.
pub fn chart_line_intersection(a1: Point, t1: Point, a2: Point, t2: Point) -> Option<Point> {
    let a1 = a1.chart()?;
    let a2 = a2.chart()?;
    let t1 = t1 - a1 * t1.z;
    let t2 = t2 - a2 * t2.z;
    let (c1, c2) = (a2.x - a1.x, a2.y - a1.y);
    let (v1, v2) = (t1.x, t1.y);
    let (u1, u2) = (t2.x, t2.y);
    let den = v1 * u2 - v2 * u1;
    if den.abs() <= f64::EPSILON {
        return None;
    }
    let r = (u2 * c1 - c2 * u1) / den;
    let v = a1 + t1 * r;
    Some(Point::new(v.x, v.y, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_lines() {
        let p = chart_line_intersection(
            Point::new(0.0, 0.0, 1.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(2.0, -1.0, 1.0),
            Point::new(-1.0, -1.0, 0.0),
        )
        .unwrap();
        assert!(p.approx_eq(&Point::new(3.0, 0.0, 1.0)));
    }

    #[test]
    fn parallel_lines_have_no_intersection() {
        let p = chart_line_intersection(
            Point::new(0.0, 0.0, 1.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.0, 1.0, 1.0),
            Point::new(-1.0, 0.0, 0.0),
        );
        assert!(p.is_none());
    }
}
