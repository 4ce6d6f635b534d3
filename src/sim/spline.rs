//! Curve flattening
//!
//! Turns a sparse list of control points into a dense polyline using
//! Catmull-Rom tangents expressed as cubic Bezier handles. The output feeds
//! both rendering and line collision, so it must be fully deterministic.

use glam::Vec2;

use crate::consts::{SPLINE_STEPS, SPLINE_TENSION};

/// Flatten with the default step count
pub fn flatten(points: &[Vec2]) -> Vec<Vec2> {
    flatten_with_steps(points, SPLINE_STEPS)
}

/// Flatten a control-point sequence into `(n - 1) * (steps + 1)` samples.
///
/// Fewer than 4 control points, or `steps == 0`, return the input unchanged.
pub fn flatten_with_steps(points: &[Vec2], steps: usize) -> Vec<Vec2> {
    if points.len() < 4 || steps == 0 {
        return points.to_vec();
    }
    let last = points.len() - 1;

    let mut out = Vec::with_capacity(last * (steps + 1));
    for i in 0..last {
        // Clamp neighbours at the ends by repeating the endpoint
        let p0 = points[i.saturating_sub(1)];
        let p1 = points[i];
        let p2 = points[i + 1];
        let p3 = points[(i + 2).min(last)];

        let (cp1, cp2) = bezier_handles(p0, p1, p2, p3, SPLINE_TENSION);

        for s in 0..=steps {
            let t = s as f32 / steps as f32;
            out.push(cubic_bezier(p1, cp1, cp2, p2, t));
        }
    }
    out
}

/// Bezier handles for the p1..p2 span of a Catmull-Rom curve
#[inline]
fn bezier_handles(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, tension: f32) -> (Vec2, Vec2) {
    let cp1 = p1 + (p2 - p0) * (tension / 3.0);
    let cp2 = p2 - (p3 - p1) * (tension / 3.0);
    (cp1, cp2)
}

/// Evaluate a cubic Bezier at t in [0, 1]
#[inline]
pub fn cubic_bezier(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    let uu = u * u;
    let tt = t * t;
    p0 * (uu * u) + p1 * (3.0 * uu * t) + p2 * (3.0 * u * tt) + p3 * (tt * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn straight_line() -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(20.0, 0.0),
            Vec2::new(30.0, 0.0),
        ]
    }

    #[test]
    fn test_short_input_is_unchanged() {
        let pts = vec![Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0), Vec2::new(5.0, 7.0)];
        assert_eq!(flatten(&pts), pts);
        assert_eq!(flatten(&pts[..1]), pts[..1].to_vec());
        assert!(flatten(&[]).is_empty());
    }

    #[test]
    fn test_sample_count() {
        let out = flatten(&straight_line());
        assert_eq!(out.len(), 3 * 16);
    }

    #[test]
    fn test_zero_steps_returns_input() {
        let pts = straight_line();
        assert_eq!(flatten_with_steps(&pts, 0), pts);
    }

    #[test]
    fn test_segments_hit_control_points() {
        let pts = straight_line();
        let out = flatten_with_steps(&pts, 15);
        // Each segment starts on p1 and ends on p2
        for seg in 0..3 {
            let start = out[seg * 16];
            let end = out[seg * 16 + 15];
            assert!((start - pts[seg]).length() < 1e-4);
            assert!((end - pts[seg + 1]).length() < 1e-4);
        }
    }

    #[test]
    fn test_collinear_input_stays_on_line() {
        for p in flatten(&straight_line()) {
            assert!(p.y.abs() < 1e-4);
            assert!(p.x >= -1e-4 && p.x <= 30.0 + 1e-4);
        }
    }

    #[test]
    fn test_cubic_bezier_endpoints() {
        let a = Vec2::new(0.0, 0.0);
        let d = Vec2::new(9.0, 3.0);
        let b = Vec2::new(3.0, 5.0);
        let c = Vec2::new(6.0, -5.0);
        assert_eq!(cubic_bezier(a, b, c, d, 0.0), a);
        assert!((cubic_bezier(a, b, c, d, 1.0) - d).length() < 1e-5);
    }

    proptest! {
        #[test]
        fn prop_output_len_and_determinism(
            raw in prop::collection::vec((-500.0f32..500.0, -500.0f32..500.0), 4..40),
            steps in 1usize..30,
        ) {
            let pts: Vec<Vec2> = raw.iter().map(|&(x, y)| Vec2::new(x, y)).collect();
            let a = flatten_with_steps(&pts, steps);
            let b = flatten_with_steps(&pts, steps);
            prop_assert_eq!(a.len(), (pts.len() - 1) * (steps + 1));
            prop_assert!(a.iter().zip(&b).all(|(p, q)| p.x.to_bits() == q.x.to_bits()
                && p.y.to_bits() == q.y.to_bits()));
        }
    }
}
