//! Small linear-algebra layer on top of `glam`.
//!
//! `glam` already gives us vectors, `Mat3 * Vec3`, `Mat3 * Mat3`,
//! determinants and inverses.  What it does not have is the handful of
//! helpers the rasterizers lean on:
//!
//! * yaw rotations in the x–z plane (the game never pitches or rolls),
//! * planes stored as `p · normal = constant` that can be moved around by
//!   rigid transforms,
//! * 2-D segment intersection and convex-polygon containment for screen-space
//!   work.

use glam::{Mat3, Vec2, Vec3};

/*──────────────────────────── vectors ────────────────────────────────*/

/// Same direction as `v`, but `len` long (reversed if `len < 0`).
///
/// Undefined for `v ≈ 0`; callers that can hit that case must check first.
#[inline]
pub fn with_length(v: Vec3, len: f32) -> Vec3 {
    v * (len / v.length())
}

/*──────────────────────────── matrices ───────────────────────────────*/

/// Rotation around the y axis.
///
/// With x right, y up and z towards the viewer, a bigger angle turns
/// clockwise when viewed from above:
/// * `0` is the identity,
/// * `π/2` takes `(1,0,0)` to `(0,0,1)`,
/// * `π` takes `(1,0,0)` to `(-1,0,0)`.
#[inline]
pub fn rotation_xz(angle: f32) -> Mat3 {
    let (s, c) = angle.sin_cos();
    rotation_xz_sincos(s, c)
}

/// Like [`rotation_xz`] but skips the trig when the caller already has them.
#[inline]
pub fn rotation_xz_sincos(sin: f32, cos: f32) -> Mat3 {
    // rows: [cos 0 -sin] [0 1 0] [sin 0 cos]
    Mat3::from_cols(
        Vec3::new(cos, 0.0, sin),
        Vec3::Y,
        Vec3::new(-sin, 0.0, cos),
    )
}

/// Invert a matrix that is known to be invertible (rotation × positive scale).
///
/// Nothing checks the determinant in release builds: a singular matrix here
/// means the caller built a degenerate ellipsoid or camera.
#[inline]
pub fn inverse(m: Mat3) -> Mat3 {
    debug_assert!(m.determinant().abs() > 1e-12, "singular matrix {m:?}");
    m.inverse()
}

/*───────────────────────────── planes ────────────────────────────────*/

/// Any plane in 3D, written as `p · normal = constant`.
///
/// The normal need not be unit length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub constant: f32,
}

impl Plane {
    pub const fn new(normal: Vec3, constant: f32) -> Self {
        Self { normal, constant }
    }

    /// Plane through three points; the normal follows the right-hand rule
    /// `(b - a) × (c - a)`.
    pub fn through(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let normal = (b - a).cross(c - a);
        Self {
            normal,
            constant: normal.dot(a),
        }
    }

    /// Is `p` strictly on the side the normal points to?
    #[inline(always)]
    pub fn which_side(&self, p: Vec3) -> bool {
        self.normal.dot(p) > self.constant
    }

    /// `p · normal - constant`.  Positive on the normal's side.
    #[inline(always)]
    pub fn signed_value(&self, p: Vec3) -> f32 {
        self.normal.dot(p) - self.constant
    }

    /// Signed distance, i.e. [`Self::signed_value`] scaled by `1/|normal|`.
    #[inline]
    pub fn signed_distance(&self, p: Vec3) -> f32 {
        self.signed_value(p) / self.normal.length()
    }

    /// Squared distance between the plane and `p`.
    #[inline]
    pub fn distance_squared(&self, p: Vec3) -> f32 {
        let top = self.signed_value(p);
        top * top / self.normal.length_squared()
    }

    /// Apply a linear transform `T` to every point of the plane, given
    /// `inverse = T⁻¹`.
    ///
    /// A point `p` is on the new plane iff `T⁻¹ p` was on the old one, i.e.
    /// `(T⁻¹ p) · n = k`, which is `p · ((T⁻¹)ᵀ n) = k`.
    #[inline]
    pub fn apply_inverse(&mut self, inverse: Mat3) {
        self.normal = inverse.transpose() * self.normal;
    }

    /// Shift every point of the plane by `mv`.
    #[inline]
    pub fn translate(&mut self, mv: Vec3) {
        self.constant += mv.dot(self.normal);
    }
}

/*───────────────────────────── lines ─────────────────────────────────*/

/// Infinite line `point + t·dir`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
    pub point: Vec3,
    pub dir: Vec3,
}

/// Intersection of a line and a plane, `None` when they are parallel.
pub fn line_intersect_plane(ln: Line, pl: Plane) -> Option<Vec3> {
    let dot = ln.dir.dot(pl.normal);
    if dot == 0.0 {
        return None;
    }
    let t = (pl.constant - ln.point.dot(pl.normal)) / dot;
    Some(ln.point + ln.dir * t)
}

/// Squared distance between a line and a point.
pub fn line_point_distance_squared(ln: Line, p: Vec3) -> f32 {
    // parallelogram area = |dir| * distance
    let area = (p - ln.point).cross(ln.dir).length_squared();
    area / ln.dir.length_squared()
}

/*──────────────────────── 2-D screen helpers ─────────────────────────*/

/// Intersect two line segments.
///
/// * Crossing segments → the crossing point.
/// * Collinear, overlapping segments → midpoint of the shared piece.
/// * Parallel or disjoint → `None`.
///
/// The result does not depend on argument order or segment direction.
pub fn intersect_line_segments(start1: Vec2, end1: Vec2, start2: Vec2, end2: Vec2) -> Option<Vec2> {
    let d1 = end1 - start1;
    let d2 = end2 - start2;
    let denom = d1.perp_dot(d2);
    let between = start2 - start1;

    if denom == 0.0 {
        if between.perp_dot(d1) != 0.0 {
            return None; // parallel, different lines
        }
        return collinear_overlap_midpoint(start1, end1, start2, end2);
    }

    let t = between.perp_dot(d2) / denom;
    let u = between.perp_dot(d1) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(start1 + d1 * t)
    } else {
        None
    }
}

fn collinear_overlap_midpoint(start1: Vec2, end1: Vec2, start2: Vec2, end2: Vec2) -> Option<Vec2> {
    // Compare along whichever axis the line is closer to.
    let d = end1 - start1;
    let key: fn(Vec2) -> f32 = if d.x.abs() >= d.y.abs() {
        |p| p.x
    } else {
        |p| p.y
    };
    let ordered = |a: Vec2, b: Vec2| if key(a) <= key(b) { (a, b) } else { (b, a) };

    let (lo1, hi1) = ordered(start1, end1);
    let (lo2, hi2) = ordered(start2, end2);
    let lo = if key(lo1) >= key(lo2) { lo1 } else { lo2 };
    let hi = if key(hi1) <= key(hi2) { hi1 } else { hi2 };
    if key(lo) > key(hi) {
        return None;
    }
    Some((lo + hi) * 0.5)
}

/// `true` when `point` is on the left of (or on) the directed line `start → end`.
#[inline]
fn which_side_of_line(start: Vec2, end: Vec2, point: Vec2) -> bool {
    (end - start).perp_dot(point - start) >= 0.0
}

/// Convex polygon containment, either winding order.
///
/// For every edge, `point` must be on the same side as the corner that is
/// not on that edge.
pub fn ngon_contains_point(corners: &[Vec2], point: Vec2) -> bool {
    let n = corners.len();
    (0..n).all(|i| {
        let start = corners[(i + 1) % n];
        let end = corners[(i + 2) % n];
        which_side_of_line(start, end, point) == which_side_of_line(start, end, corners[i])
    })
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
