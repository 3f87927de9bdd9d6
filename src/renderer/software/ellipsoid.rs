//! Ellipsoid rasterizer.
//!
//! Everything is solved in the ellipsoid's unit-ball coordinates, where the
//! surface is `|p| = 1`.  A camera ray through screen ratio `(xzr, yzr)` is
//! `t·(xzr, yzr, 1)` in camera coordinates, and tangency / intersection with
//! the unit sphere turns into small quadratics.

use glam::{Vec2, Vec3};

use crate::{
    math::{Plane, with_length},
    renderer::{Rgba, ScreenRect, Surface, to_pixel},
    world::{CAMPLANE_IDX, Camera, Ellipsoid},
};

/// Reusable per-row arrays for [`Ellipsoid::drawrow`].
///
/// Every pass over a row writes one array in full before the next pass
/// reads it, so the loops stay free of branches and vectorise.
#[derive(Default)]
pub struct RowScratch {
    xzr: Vec<f32>,
    dir_x: Vec<f32>,
    dir_y: Vec<f32>,
    dir_z: Vec<f32>,
    t: Vec<f32>,
    cell: Vec<usize>,
}

impl RowScratch {
    fn reset(&mut self, len: usize) {
        for v in [
            &mut self.xzr,
            &mut self.dir_x,
            &mut self.dir_y,
            &mut self.dir_z,
            &mut self.t,
        ] {
            v.clear();
            v.resize(len, 0.0);
        }
        self.cell.clear();
        self.cell.resize(len, 0);
    }
}

/// Solves `r² − 2br + c = 0` for the two screen ratios whose planes touch
/// the unit ball.  `tt`, `bb` and `tb` are dot products of two rows of the
/// unit-ball→camera matrix; `ct`, `cb` the centre on the same two axes.
#[inline]
fn tangent_ratios(tt: f32, bb: f32, tb: f32, ct: f32, cb: f32) -> (f32, f32) {
    let a = bb - cb * cb;
    let b = (tb - ct * cb) / a;
    let c = (tt - ct * ct) / a;
    // can dip below zero through rounding
    let offset = (b * b - c).max(0.0).sqrt();
    (b - offset, b + offset)
}

impl Ellipsoid {
    /// Does the ellipsoid cut through `pl` (world coordinates)?
    fn intersects_plane(&self, mut pl: Plane) -> bool {
        let center = self.world2uball() * self.center;
        pl.apply_inverse(self.uball2world());
        pl.distance_squared(center) < 1.0
    }

    /// Could any of it be on screen?
    ///
    /// The ellipsoid must be entirely in front of the camera plane, not even
    /// touching it.  That keeps the camera outside and every surface point's
    /// x/z and y/z ratios finite.  Against the screen-edge planes, a centre
    /// on the wrong side is fine as long as the ellipsoid still reaches over.
    pub fn is_visible(&self, cam: &Camera) -> bool {
        let planes = cam.visplanes();
        let camplane = planes[CAMPLANE_IDX];
        if !camplane.which_side(self.center) || self.intersects_plane(camplane) {
            return false;
        }

        planes
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != CAMPLANE_IDX)
            .all(|(_, &pl)| pl.which_side(self.center) || self.intersects_plane(pl))
    }

    /// Screen rectangle containing every pixel the ellipsoid can cover,
    /// clipped to the viewport.  Only meaningful when [`Self::is_visible`].
    pub fn bbox(&self, cam: &Camera) -> Option<ScreenRect> {
        let m = cam.world2cam() * self.uball2world();
        let (top, mid, bot) = (m.row(0), m.row(1), m.row(2));
        let c = cam.point_world2cam(self.center);

        let (xzr_lo, xzr_hi) =
            tangent_ratios(top.dot(top), bot.dot(bot), top.dot(bot), c.x, c.z);
        let (yzr_lo, yzr_hi) =
            tangent_ratios(mid.dot(mid), bot.dot(bot), mid.dot(bot), c.y, c.z);

        let xmin = to_pixel(cam.xzr_to_screenx(xzr_hi));
        let xmax = to_pixel(cam.xzr_to_screenx(xzr_lo));
        let ymin = to_pixel(cam.yzr_to_screeny(yzr_lo));
        let mut ymax = to_pixel(cam.yzr_to_screeny(yzr_hi));

        if self.hide_lower_half() {
            // Same thing for the equator disk, which is where the visible
            // part ends at the bottom.
            let flat = |v: Vec3| Vec2::new(v.x, v.z);
            let (mid, bot) = (flat(mid), flat(bot));
            let (_, disk_hi) = tangent_ratios(mid.dot(mid), bot.dot(bot), mid.dot(bot), c.y, c.z);
            ymax = to_pixel(cam.yzr_to_screeny(disk_hi));
        }

        let full = ScreenRect::new(xmin, ymin, xmax - xmin + 1, ymax - ymin + 1);
        let screen = ScreenRect::new(0, 0, cam.width() as i32, cam.height() as i32);
        full.intersect(&screen)
    }

    /// Quad standing upright through the centre, facing the camera, used
    /// only to decide drawing order.  Corners are in world coordinates,
    /// ordered top-left, top-right, bottom-right, bottom-left.
    pub fn sort_rect(&self, cam: &Camera) -> [Vec3; 4] {
        let center2cam = cam.location() - self.center;
        let mut dir = Vec3::new(center2cam.z, 0.0, -center2cam.x);
        if dir.length_squared() < 1e-10 {
            dir = Vec3::X;
        }
        let edge = with_length(dir, self.xzradius());
        let up = Vec3::new(0.0, self.yradius(), 0.0);

        let mut corners = [
            self.center - edge + up,
            self.center + edge + up,
            self.center + edge - up,
            self.center - edge - up,
        ];
        if self.hide_lower_half() && center2cam.length_squared() > 0.0 {
            // lean the bottom towards the camera so that stacked
            // half-hidden ellipsoids sort above whatever they stand on
            let tilt = with_length(center2cam, 0.01);
            corners[2] += tilt;
            corners[3] += tilt;
        }
        corners
    }

    /// Half-open range of screen columns covered on row `y`, clamped to the
    /// viewport.  `None` when the row misses the ellipsoid (which rounding
    /// can cause even inside the bounding box).
    pub fn xminmax(&self, cam: &Camera, y: i32) -> Option<(i32, i32)> {
        // The ray t·(xzr, yzr, 1) is t·(xzr·v + w) + p in unit-ball space.
        let world2uball = self.world2uball();
        let cam2uball = world2uball * cam.cam2world();
        let v = cam2uball * Vec3::X;
        let w = cam2uball * Vec3::new(0.0, cam.screeny_to_yzr(y as f32), 1.0);
        let p = world2uball * (cam.location() - self.center);

        // The ray touches the ball where its squared distance to the origin
        // is 1; that gives x² + 2bx + c = 0 in xzr.
        let (pp, vv, ww) = (p.dot(p), v.dot(v), w.dot(w));
        let (pv, pw, vw) = (p.dot(v), p.dot(w), v.dot(w));
        let a = (pp - 1.0) * vv - pv * pv;
        let b = ((pp - 1.0) * vw - pv * pw) / a;
        let c = ((pp - 1.0) * ww - pw * pw) / a;
        if b * b - c < 0.0 {
            return None;
        }
        let offset = (b * b - c).sqrt();
        let mut left = -b + offset;
        let mut right = -b - offset;

        if self.hide_lower_half() {
            // height of the touching point on each side
            let touch_y = |xzr: f32| {
                let u = v * xzr + w;
                p.y - p.dot(u) / u.dot(u) * u.y
            };
            let (yl, yr) = (touch_y(left), touch_y(right));
            if yl < 0.0 || yr < 0.0 {
                let (a, b) = self.disk_xzr_span(cam, y)?;
                if yl < 0.0 {
                    left = a.max(b);
                }
                if yr < 0.0 {
                    right = a.min(b);
                }
            }
        }

        let w = cam.width() as i32;
        let xmin = (cam.xzr_to_screenx(left) as i32).clamp(0, w);
        let xmax = (cam.xzr_to_screenx(right) as i32).clamp(0, w);
        (xmin < xmax).then_some((xmin, xmax))
    }

    /// Where row `y`'s plane crosses the edge of the equator disk, as two
    /// xzr values in no particular order.
    fn disk_xzr_span(&self, cam: &Camera, y: i32) -> Option<(f32, f32)> {
        let yzr = cam.screeny_to_yzr(y as f32);
        let rel = cam.location() - self.center;

        // plane y/z = yzr in camera coordinates, taken to unit-ball space
        let mut pl = Plane::new(Vec3::new(0.0, 1.0, -yzr), 0.0);
        pl.apply_inverse(cam.world2cam());
        pl.translate(rel);
        pl.apply_inverse(self.uball2world());

        // With the disk's plane y = 0 this leaves a·x + c·z = k.
        let (a, c, k) = (pl.normal.x, pl.normal.z, pl.constant);
        let nn = a * a + c * c;
        if nn < 1e-12 {
            return None;
        }
        let inv = 1.0 / nn;
        let t_sq = inv - k * k * inv * inv;
        if t_sq < 0.0 {
            return None;
        }
        let t = t_sq.sqrt();
        let foot = Vec3::new(a * k * inv, 0.0, c * k * inv);
        let along = Vec3::new(-c, 0.0, a);

        let to_cam = |u: Vec3| cam.world2cam() * (self.uball2world() * u - rel);
        let p1 = to_cam(foot - along * t);
        let p2 = to_cam(foot + along * t);
        Some((p1.x / p1.z, p2.x / p2.z))
    }

    /// Paint columns `xmin..xmax` of row `y` from the texture cube.
    pub fn drawrow(
        &self,
        cam: &Camera,
        y: i32,
        xmin: i32,
        xmax: i32,
        scratch: &mut RowScratch,
        surface: &mut Surface,
    ) {
        if xmax <= xmin {
            return;
        }
        debug_assert!(0 <= xmin && xmax as usize <= surface.width());
        let n = (xmax - xmin) as usize;
        scratch.reset(n);
        let RowScratch {
            xzr,
            dir_x,
            dir_y,
            dir_z,
            t,
            cell,
        } = scratch;

        // ray: camloc + t·M·(xzr, yzr, 1), pointing back at the camera
        let camloc = self.world2uball() * (cam.location() - self.center);
        let m = self.world2uball() * cam.cam2world();
        let base = m.y_axis * cam.screeny_to_yzr(y as f32) + m.z_axis;
        let step = m.x_axis;

        for (i, r) in xzr.iter_mut().enumerate() {
            *r = cam.screenx_to_xzr((xmin + i as i32) as f32);
        }
        for i in 0..n {
            dir_x[i] = step.x * xzr[i] + base.x;
            dir_y[i] = step.y * xzr[i] + base.y;
            dir_z[i] = step.z * xzr[i] + base.z;
        }

        // bigger root of |camloc + t·dir|² = 1 is the side facing the camera
        let cc = camloc.length_squared();
        for i in 0..n {
            let dd = dir_x[i] * dir_x[i] + dir_y[i] * dir_y[i] + dir_z[i] * dir_z[i];
            let cd = camloc.x * dir_x[i] + camloc.y * dir_y[i] + camloc.z * dir_z[i];
            let disc = (cd * cd - dd * (cc - 1.0)).max(0.0);
            t[i] = (disc.sqrt() - cd) / dd;
        }

        let side = self.pic.side();
        let half = (side / 2) as f32;
        let last = side as i32 - 1;
        let quantize = |u: f32| ((half * (1.0 + u)) as i32).clamp(0, last) as usize;
        for i in 0..n {
            let ex = quantize(dir_x[i] * t[i] + camloc.x);
            let ey = quantize(dir_y[i] * t[i] + camloc.y);
            let ez = quantize(dir_z[i] * t[i] + camloc.z);
            cell[i] = (ex * side + ey) * side + ez;
        }

        let cube = self.pic.cube(self.highlighted);
        let dst: &mut [Rgba] = &mut surface.row_mut(y as usize)[xmin as usize..xmax as usize];
        for (px, &c) in dst.iter_mut().zip(cell.iter()) {
            *px = cube[c];
        }
    }
}

/*=== Tests ===*/
