use std::sync::Arc;

use glam::{Mat3, Vec3};
use log::debug;

use crate::{
    math::{inverse, rotation_xz, with_length},
    world::texture::EllipsoidPic,
};

/// A unit ball stretched by `xzradius` horizontally and `yradius`
/// vertically, turned by `angle` around the y axis and moved to `center`.
///
/// *Unit-ball coordinates* are the frame in which the ellipsoid is the
/// sphere `|p| = 1` around the origin.  `world2uball() * (q - center)` takes
/// a world point there; `uball2world()` goes back (without the `center`).
///
/// Shape setters rebuild both matrices immediately, so they can never be
/// stale.  `center` is free to move because it is not baked into them.
#[derive(Clone, Debug)]
pub struct Ellipsoid {
    pub center: Vec3,
    pub pic: Arc<EllipsoidPic>,
    pub highlighted: bool,

    angle: f32,
    xzradius: f32,
    yradius: f32,

    uball2world: Mat3,
    world2uball: Mat3,
}

impl Ellipsoid {
    pub fn new(center: Vec3, pic: Arc<EllipsoidPic>, xzradius: f32, yradius: f32) -> Self {
        let mut el = Self {
            center,
            pic,
            highlighted: false,
            angle: 0.0,
            xzradius,
            yradius,
            uball2world: Mat3::IDENTITY,
            world2uball: Mat3::IDENTITY,
        };
        el.commit();
        el
    }

    fn commit(&mut self) {
        assert!(
            self.xzradius > 0.0 && self.yradius > 0.0,
            "ellipsoid radii must be positive, got {} and {}",
            self.xzradius,
            self.yradius
        );
        let stretch = Mat3::from_diagonal(Vec3::new(self.xzradius, self.yradius, self.xzradius));
        self.uball2world = stretch * rotation_xz(self.angle);
        self.world2uball = inverse(self.uball2world);
    }

    #[inline]
    pub fn angle(&self) -> f32 {
        self.angle
    }

    #[inline]
    pub fn xzradius(&self) -> f32 {
        self.xzradius
    }

    #[inline]
    pub fn yradius(&self) -> f32 {
        self.yradius
    }

    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle;
        self.commit();
    }

    pub fn set_radii(&mut self, xzradius: f32, yradius: f32) {
        self.xzradius = xzradius;
        self.yradius = yradius;
        self.commit();
    }

    #[inline(always)]
    pub fn uball2world(&self) -> Mat3 {
        self.uball2world
    }

    #[inline(always)]
    pub fn world2uball(&self) -> Mat3 {
        self.world2uball
    }

    #[inline(always)]
    pub fn hide_lower_half(&self) -> bool {
        self.pic.hide_lower_half
    }

    /// Is `p` strictly inside?
    pub fn contains(&self, p: Vec3) -> bool {
        (self.world2uball * (p - self.center)).length_squared() < 1.0
    }

    /// Push two ellipsoids horizontally away from each other, each by
    /// `amount / 2`.  Vertically stacked ones are pushed along x.
    pub fn move_apart(a: &mut Ellipsoid, b: &mut Ellipsoid, amount: f32) {
        assert!(amount >= 0.0);
        let mut a2b = b.center - a.center;
        a2b.y = 0.0;
        if a2b.length_squared() < 1e-5 {
            debug!("ellipsoids at {} line up vertically, pushing along x", a.center);
            a2b = Vec3::X;
        }
        let step = with_length(a2b, amount / 2.0);
        b.center += step;
        a.center -= step;
    }
}

/*=== Tests ===*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::texture::AngleTable;
    use image::RgbaImage;
    use std::f32::consts::FRAC_PI_2;

    fn pic() -> Arc<EllipsoidPic> {
        let img = RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]));
        Arc::new(EllipsoidPic::from_image(&AngleTable::new(8), img).unwrap())
    }

    #[test]
    fn transforms_map_unit_ball_onto_surface() {
        let mut el = Ellipsoid::new(Vec3::new(1.0, 2.0, 3.0), pic(), 2.0, 0.5);
        el.set_angle(FRAC_PI_2);

        let top = el.uball2world() * Vec3::Y + el.center;
        assert!((top - Vec3::new(1.0, 2.5, 3.0)).length() < 1e-5);
        let side = el.uball2world() * Vec3::X;
        assert!((side.length() - 2.0).abs() < 1e-5);

        assert!(el.world2uball().mul_mat3(&el.uball2world()).abs_diff_eq(Mat3::IDENTITY, 1e-5));
    }

    #[test]
    fn setters_keep_caches_current() {
        let mut el = Ellipsoid::new(Vec3::ZERO, pic(), 1.0, 1.0);
        assert!(!el.contains(Vec3::new(0.0, 1.5, 0.0)));
        el.set_radii(1.0, 2.0);
        assert!(el.contains(Vec3::new(0.0, 1.5, 0.0)));
        assert!(!el.contains(Vec3::new(1.5, 0.0, 0.0)));
    }

    #[test]
    fn move_apart_is_horizontal_and_symmetric() {
        let mut a = Ellipsoid::new(Vec3::new(0.0, 0.0, 0.0), pic(), 1.0, 1.0);
        let mut b = Ellipsoid::new(Vec3::new(0.0, 5.0, 2.0), pic(), 1.0, 1.0);
        Ellipsoid::move_apart(&mut a, &mut b, 1.0);
        assert!((a.center - Vec3::new(0.0, 0.0, -0.5)).length() < 1e-6);
        assert!((b.center - Vec3::new(0.0, 5.0, 2.5)).length() < 1e-6);
    }

    #[test]
    fn move_apart_vertically_aligned_uses_x() {
        let mut a = Ellipsoid::new(Vec3::ZERO, pic(), 1.0, 1.0);
        let mut b = Ellipsoid::new(Vec3::new(0.0, 3.0, 0.0), pic(), 1.0, 1.0);
        Ellipsoid::move_apart(&mut a, &mut b, 2.0);
        assert!(a.center.is_finite() && b.center.is_finite());
        assert_eq!(a.center, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(b.center, Vec3::new(1.0, 3.0, 0.0));
    }
}
