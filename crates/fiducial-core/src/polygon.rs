//! Closed-polygon helpers: Douglas–Peucker approximation, convexity, perimeter.

use nalgebra::Point2;

fn farthest_from(points: &[Point2<f64>], from: Point2<f64>) -> usize {
    let mut best = 0;
    let mut best_d = -1.0;
    for (i, p) in points.iter().enumerate() {
        let d = (p - from).norm_squared();
        if d > best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

fn line_distance(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    let ab = b - a;
    let len = ab.norm();
    if len <= f64::EPSILON {
        return (p - a).norm();
    }
    let ap = p - a;
    (ab.x * ap.y - ab.y * ap.x).abs() / len
}

/// Push the interior vertices kept between `chain[first]` and `chain[last]`.
fn simplify_span(chain: &[Point2<f64>], first: usize, last: usize, epsilon: f64, out: &mut Vec<Point2<f64>>) {
    if last <= first + 1 {
        return;
    }
    let (a, b) = (chain[first], chain[last]);
    let mut split = first;
    let mut d_max = 0.0;
    for (i, &p) in chain.iter().enumerate().take(last).skip(first + 1) {
        let d = line_distance(p, a, b);
        if d > d_max {
            d_max = d;
            split = i;
        }
    }
    if d_max > epsilon {
        simplify_span(chain, first, split, epsilon, out);
        out.push(chain[split]);
        simplify_span(chain, split, last, epsilon, out);
    }
}

/// Douglas–Peucker simplification of a closed curve.
///
/// The curve is split at two mutually distant points, so the first point of
/// the input never survives merely because tracing started there.
pub fn approx_polygon_closed(points: &[Point2<f64>], epsilon: f64) -> Vec<Point2<f64>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let a = farthest_from(points, points[0]);
    let b = farthest_from(points, points[a]);
    if a == b {
        return vec![points[a]];
    }
    let (lo, hi) = (a.min(b), a.max(b));

    let mut out = Vec::new();
    let forward = &points[lo..=hi];
    out.push(forward[0]);
    simplify_span(forward, 0, forward.len() - 1, epsilon, &mut out);

    let wrap: Vec<Point2<f64>> = points[hi..].iter().chain(&points[..=lo]).copied().collect();
    out.push(wrap[0]);
    simplify_span(&wrap, 0, wrap.len() - 1, epsilon, &mut out);

    out
}

#[inline]
fn turn(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> f64 {
    let ab = b - a;
    let bc = c - b;
    ab.x * bc.y - ab.y * bc.x
}

/// `true` when every turn of the closed polygon has the same sign.
pub fn is_convex(poly: &[Point2<f64>]) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0f64;
    for i in 0..n {
        let t = turn(poly[i], poly[(i + 1) % n], poly[(i + 2) % n]);
        if t == 0.0 {
            continue;
        }
        if sign == 0.0 {
            sign = t.signum();
        } else if t.signum() != sign {
            return false;
        }
    }
    sign != 0.0
}

/// Sum of the closed polygon's edge lengths.
pub fn perimeter(poly: &[Point2<f32>]) -> f32 {
    let n = poly.len();
    (0..n).map(|i| (poly[(i + 1) % n] - poly[i]).norm()).sum()
}
