//! How far two ellipsoids must be pushed apart horizontally to stop
//! overlapping.
//!
//! Turning the pair around the y axis so both centres share a z coordinate
//! leaves a 2D problem in the xy plane: two ellipses, or an ellipse and the
//! flat bottom of a half-hidden one.  After scaling the lower ellipse to the
//! unit circle, the pair stops overlapping once the circle's centre is
//! distance 1 from the upper ellipse's outline, and that point is found
//! numerically.

use glam::{Vec2, Vec3};
use log::debug;

use crate::{math::rotation_xz_sincos, world::Ellipsoid};

const PRECISION: f32 = 1e-5;
const MAX_ITERATIONS: usize = 20;
const GUESS_STEP: f32 = 0.1;

/// Root of `f(x) = (a·x + b)·sqrt(c·x² + d) + e·x` in `-1 ..= 1`.
///
/// A coarse scan picks the sample with the smallest `|f|`, then Newton's
/// method refines it.  Whenever Newton wanders off (zero derivative, outside
/// `-1..=1`, far from the scan's guess) the scan's guess is returned.
pub(crate) fn solve_the_equation(a: f32, b: f32, c: f32, d: f32, e: f32) -> f32 {
    let f = |x: f32| (a * x + b) * (c * x * x + d).sqrt() + e * x;

    let steps = (2.0 / GUESS_STEP).round() as i32;
    let mut guess = 0.0;
    let mut best = f32::INFINITY;
    for i in 0..=steps {
        let x = -1.0 + i as f32 * GUESS_STEP;
        let fx = f(x);
        if !fx.is_finite() {
            debug!("solver: f({x}) = {fx} for a={a} b={b} c={c} d={d} e={e}");
            continue;
        }
        if fx.abs() < best {
            best = fx.abs();
            guess = x;
        }
    }

    let mut x = guess;
    for iter in 0..MAX_ITERATIONS {
        let root = (c * x * x + d).sqrt();
        let root_derivative = c * x / root;
        let fx = (a * x + b) * root + e * x;
        let derivative = a * root + (a * x + b) * root_derivative + e;
        if derivative == 0.0 {
            debug!("solver: zero derivative at x={x} (iter {iter})");
            return guess;
        }

        let sub = fx / derivative;
        if !sub.is_finite() {
            debug!("solver: step {sub} at x={x} (iter {iter})");
            return guess;
        }
        x -= sub;

        if (x - guess).abs() > 2.0 * GUESS_STEP || x.abs() > 1.0 {
            debug!("solver: x={x} left the search range, keeping {guess}");
            return guess;
        }
        if sub.abs() <= PRECISION {
            return x;
        }
    }
    debug!("solver: no convergence after {MAX_ITERATIONS} iterations, x={x}");
    x
}

/// The two points at height `y` that are distance 1 from the outline of the
/// origin-centred ellipse `(x/a)² + (y/b)² = 1`, as `(-x, x)` with `x ≥ 0`.
/// `None` when no such point exists.
pub(crate) fn distance1_points_at_y(a: f32, b: f32, y: f32) -> Option<(f32, f32)> {
    assert!(a > 0.0 && b > 0.0);
    if y.abs() > b + 1.0 {
        return None;
    }

    // Outline E(t) = (a cos t, b sin t) with outward normal (b cos t, a sin t);
    // E(t) + unit normal = (x, y) on the y axis becomes the solver's equation
    // in sin t.
    let sin = solve_the_equation(-b, y, a * a - b * b, b * b, -a);
    let cos_sq = 1.0 - sin * sin;
    let x = (a + b / (a * a * sin * sin + b * b * cos_sq).sqrt()) * cos_sq.sqrt();
    Some((-x, x))
}

/// How far an ellipse with radii `a`, `b` around `center` must move along x
/// to clear the origin-centred unit circle.
pub(crate) fn ellipse_vs_unit_circle(a: f32, b: f32, center: Vec2) -> f32 {
    // in the ellipse's own frame the circle sits at -center
    let Some((xmin, xmax)) = distance1_points_at_y(a, b, -center.y) else {
        return 0.0;
    };
    let (xmin, xmax) = (xmin + center.x, xmax + center.x);
    if !(xmin < 0.0 && 0.0 < xmax) {
        return 0.0;
    }
    if center.x > 0.0 { -xmin } else { xmax }
}

/// Same for the horizontal segment `center ± (half_len, 0)`.
pub(crate) fn segment_vs_unit_circle(center: Vec2, half_len: f32) -> f32 {
    let tmp = 1.0 - center.y * center.y;
    if tmp < 0.0 {
        return 0.0;
    }
    (tmp.sqrt() - center.x.abs() + half_len).max(0.0)
}

/// Ellipse 1 (radii `a1`, `b1`) must not be below ellipse 2.  With
/// `flat_bottom1`, only ellipse 1's equator segment is checked.
pub(crate) fn ellipse_move_amount_x(
    (a1, b1, center1, flat_bottom1): (f32, f32, Vec2, bool),
    (a2, b2, center2): (f32, f32, Vec2),
) -> f32 {
    assert!(a1 > 0.0 && b1 > 0.0 && a2 > 0.0 && b2 > 0.0);
    debug_assert!(center1.y >= center2.y - 1e-5);

    // stretch so that ellipse 2 is the unit circle at the origin
    let a1 = a1 / a2;
    let b1 = b1 / b2;
    let center = (center1 - center2) / Vec2::new(a2, b2);

    let dx = if flat_bottom1 {
        segment_vs_unit_circle(center, a1)
    } else {
        ellipse_vs_unit_circle(a1, b1, center)
    };
    dx * a2
}

impl Ellipsoid {
    /// Horizontal distance the two must be moved apart (see
    /// [`Ellipsoid::move_apart`]) so that they no longer overlap; 0 if they
    /// don't.
    ///
    /// The lower one is always treated as whole: only the upper one's
    /// "hide lower half" flag matters.
    pub fn bump_amount(&self, other: &Ellipsoid) -> f32 {
        let (upper, lower) = if self.center.y < other.center.y {
            (other, self)
        } else {
            (self, other)
        };

        let diff = upper.center - lower.center;
        let len = diff.x.hypot(diff.z);
        let (sin, cos) = if len > 0.0 && len.is_finite() {
            (diff.z / len, diff.x / len)
        } else {
            (0.0, 1.0)
        };

        // turn so that both centres have the same z
        let rot = rotation_xz_sincos(sin, cos).transpose();
        let flat = |p: Vec3| {
            let p = rot * p;
            Vec2::new(p.x, p.y)
        };
        ellipse_move_amount_x(
            (
                upper.xzradius(),
                upper.yradius(),
                flat(upper.center),
                upper.hide_lower_half(),
            ),
            (lower.xzradius(), lower.yradius(), flat(lower.center)),
        )
    }
}

/*=== Tests ===*/
