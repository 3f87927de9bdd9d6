use glam::{Mat3, Vec2, Vec3};

use crate::{
    math::{Plane, rotation_xz},
    renderer::ScreenRect,
};

/// Index of the plane that faces away from the camera in [`Camera::visplanes`].
pub const CAMPLANE_IDX: usize = 0;

/// Pixel geometry of the surface a camera renders into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
    /// pixels per unit of x/z (or y/z) ratio
    pub scale: f32,
    /// screen row of the horizon, usually `height / 2`
    pub center_y: f32,
}

impl Viewport {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            scale: 0.625 * width as f32,
            center_y: height as f32 * 0.5,
        }
    }
}

/// Yaw-only viewpoint.
///
/// *Camera coordinates* put the camera at the origin looking towards −z,
/// with +x right and +y up.  A point in front of the camera therefore has
/// `z < 0`, and its screen position depends only on the ratios `x/z`
/// (*xzr*) and `y/z` (*yzr*).
///
/// Moving or turning marks the cached matrices and planes stale.  They are
/// rebuilt by [`Camera::update_caches`]; reading them before that panics.
#[derive(Clone, Debug)]
pub struct Camera {
    location: Vec3,
    angle: f32, // radians
    viewport: Viewport,

    world2cam: Mat3,
    cam2world: Mat3,
    visplanes: [Plane; 5], // world coordinates, visible side = normal side
    stale: bool,
}

impl Camera {
    pub fn new(location: Vec3, angle: f32, viewport: Viewport) -> Self {
        let mut cam = Self {
            location,
            angle,
            viewport,
            world2cam: Mat3::IDENTITY,
            cam2world: Mat3::IDENTITY,
            visplanes: [Plane::new(Vec3::ZERO, 0.0); 5],
            stale: true,
        };
        cam.update_caches();
        cam
    }

    /*──────────────────────────── state ─────────────────────────────*/

    #[inline]
    pub fn location(&self) -> Vec3 {
        self.location
    }

    #[inline]
    pub fn angle(&self) -> f32 {
        self.angle
    }

    #[inline]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.viewport.width
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        self.viewport.height
    }

    pub fn set_location(&mut self, location: Vec3) {
        self.location = location;
        self.stale = true;
    }

    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle;
        self.stale = true;
    }

    /// Turn so the forward axis points horizontally at `target`.
    pub fn set_angle_towards(&mut self, target: Vec3) {
        let d = target - self.location;
        self.set_angle(d.x.atan2(-d.z));
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.stale = true;
    }

    /// Unit vector the camera looks along, in world coordinates.
    pub fn forward(&self) -> Vec3 {
        let (s, c) = self.angle.sin_cos();
        Vec3::new(s, 0.0, -c)
    }

    /// Rebuild matrices and frustum planes from `location` and `angle`.
    pub fn update_caches(&mut self) {
        self.cam2world = rotation_xz(self.angle);
        self.world2cam = rotation_xz(-self.angle);

        let w = self.viewport.width as f32;
        let h = self.viewport.height as f32;

        // Edge planes go through the origin and contain every ray that hits
        // the given screen edge.  Flip each so that straight ahead (0,0,-1)
        // is on the normal side.
        let edge = |normal: Vec3| {
            if normal.dot(Vec3::NEG_Z) < 0.0 { -normal } else { normal }
        };
        let left = self.screenx_to_xzr(0.0);
        let right = self.screenx_to_xzr(w);
        let top = self.screeny_to_yzr(0.0);
        let bottom = self.screeny_to_yzr(h);

        let mut planes = [
            Plane::new(Vec3::NEG_Z, 0.0),
            Plane::new(edge(Vec3::new(1.0, 0.0, -left)), 0.0),
            Plane::new(edge(Vec3::new(1.0, 0.0, -right)), 0.0),
            Plane::new(edge(Vec3::new(0.0, 1.0, -top)), 0.0),
            Plane::new(edge(Vec3::new(0.0, 1.0, -bottom)), 0.0),
        ];
        for pl in planes.iter_mut() {
            pl.apply_inverse(self.world2cam);
            pl.translate(self.location);
        }
        self.visplanes = planes;
        self.stale = false;
    }

    #[inline(always)]
    fn assert_fresh(&self) {
        assert!(!self.stale, "camera moved without update_caches()");
    }

    #[inline]
    pub fn world2cam(&self) -> Mat3 {
        self.assert_fresh();
        self.world2cam
    }

    #[inline]
    pub fn cam2world(&self) -> Mat3 {
        self.assert_fresh();
        self.cam2world
    }

    /// Camera plane first ([`CAMPLANE_IDX`]), then left, right, top, bottom.
    #[inline]
    pub fn visplanes(&self) -> &[Plane; 5] {
        self.assert_fresh();
        &self.visplanes
    }

    /*───────────────────── coordinate conversions ────────────────────*/

    #[inline]
    pub fn point_world2cam(&self, p: Vec3) -> Vec3 {
        self.world2cam() * (p - self.location)
    }

    #[inline]
    pub fn point_cam2world(&self, p: Vec3) -> Vec3 {
        self.cam2world() * p + self.location
    }

    pub fn plane_world2cam(&self, mut pl: Plane) -> Plane {
        pl.translate(-self.location);
        pl.apply_inverse(self.cam2world());
        pl
    }

    pub fn plane_cam2world(&self, mut pl: Plane) -> Plane {
        pl.apply_inverse(self.world2cam());
        pl.translate(self.location);
        pl
    }

    /*──────────────────────── screen mapping ────────────────────────*/

    #[inline(always)]
    pub fn xzr_to_screenx(&self, xzr: f32) -> f32 {
        self.viewport.width as f32 * 0.5 - self.viewport.scale * xzr
    }

    #[inline(always)]
    pub fn yzr_to_screeny(&self, yzr: f32) -> f32 {
        self.viewport.center_y + self.viewport.scale * yzr
    }

    #[inline(always)]
    pub fn screenx_to_xzr(&self, x: f32) -> f32 {
        (self.viewport.width as f32 * 0.5 - x) / self.viewport.scale
    }

    #[inline(always)]
    pub fn screeny_to_yzr(&self, y: f32) -> f32 {
        (y - self.viewport.center_y) / self.viewport.scale
    }

    /// Camera-space point to fractional screen coordinates.
    ///
    /// The point must be in front of the camera.
    #[inline]
    pub fn point_cam2screen(&self, p: Vec3) -> Vec2 {
        assert!(p.z < 0.0, "point {p} is not in front of the camera");
        Vec2::new(
            self.xzr_to_screenx(p.x / p.z),
            self.yzr_to_screeny(p.y / p.z),
        )
    }

    /// World point to the nearest pixel.  The point must be in front of the
    /// camera.
    pub fn point_to_screen(&self, p: Vec3) -> (i32, i32) {
        let s = self.point_cam2screen(self.point_world2cam(p));
        (s.x.round() as i32, s.y.round() as i32)
    }

    /// Smallest pixel rectangle around camera-space points, or `None` if any
    /// of them is not in front of the camera.
    pub fn containing_rect(&self, points: &[Vec3]) -> Option<ScreenRect> {
        debug_assert!(points.len() <= 4);
        let mut screen = [Vec2::ZERO; 4];
        for (dst, p) in screen.iter_mut().zip(points) {
            if p.z >= 0.0 {
                return None;
            }
            *dst = self.point_cam2screen(*p);
        }
        ScreenRect::enclose(&screen[..points.len().min(4)])
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
