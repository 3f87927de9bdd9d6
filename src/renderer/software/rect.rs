//! Wall rasterizer: projected quads filled one scan-line at a time.

use glam::{Mat3, Vec2, Vec3};

use crate::{
    renderer::{Rgba, ScreenRect, Surface, rgb_average, to_pixel},
    world::{CAMPLANE_IDX, Camera, Rect3, TRANSPARENT},
};

const FLAT_TINT: Rgba = 0x00_00_FF_FF;
const HIGHLIGHT_TINT: Rgba = 0x00_FF_00_00;

/// Screen-space data of a wall that passed [`Rect3::visible_fillcache`].
#[derive(Clone, Copy, Debug)]
pub struct RectCache {
    /// Corners projected to fractional pixel coordinates.
    pub screen: [Vec2; 4],
    /// Everything drawn for this wall lies inside.
    pub bbox: ScreenRect,
}

impl RectCache {
    /// Half-open range of columns the quad covers on row `y`, clamped to
    /// `0..=width`.
    pub fn xminmax(&self, y: i32, width: usize) -> Option<(i32, i32)> {
        if !self.bbox.contains_row(y) {
            return None;
        }

        let yf = y as f32;
        let (mut lo, mut hi) = (f32::INFINITY, f32::NEG_INFINITY);
        let mut crossings = 0;
        let mut prev = self.screen[3];
        for &cur in &self.screen {
            let spans_row = (prev.y <= yf && yf <= cur.y) || (prev.y >= yf && yf >= cur.y);
            if (prev.y - cur.y).abs() > 1e-5 && spans_row {
                let t = (yf - prev.y) / (cur.y - prev.y);
                let x = prev.x + t * (cur.x - prev.x);
                lo = lo.min(x);
                hi = hi.max(x);
                crossings += 1;
            }
            prev = cur;
        }
        // three crossings when the row goes exactly through a corner
        if crossings < 2 {
            return None;
        }

        let w = width as i32;
        let xmin = to_pixel(lo.ceil()).clamp(0, w);
        let xmax = (to_pixel(hi.floor()) + 1).clamp(0, w);
        (xmin < xmax).then_some((xmin, xmax))
    }
}

impl Rect3 {
    /// Project the wall if any of it can show up.
    ///
    /// Every corner must be in front of the camera, and at least one of them
    /// inside the whole view frustum.  A wall seen only through its middle
    /// (all corners off screen) is skipped.
    pub fn visible_fillcache(&self, cam: &Camera) -> Option<RectCache> {
        let planes = cam.visplanes();
        if !self.corners.iter().all(|&c| planes[CAMPLANE_IDX].which_side(c)) {
            return None;
        }
        let any_inside = self
            .corners
            .iter()
            .any(|&c| planes.iter().all(|pl| pl.which_side(c)));
        if !any_inside {
            return None;
        }

        let screen = self.corners.map(|c| cam.point_cam2screen(cam.point_world2cam(c)));
        let bounds = ScreenRect::new(0, 0, cam.width() as i32, cam.height() as i32);
        let bbox = ScreenRect::enclose(&screen)?.intersect(&bounds)?;
        Some(RectCache { screen, bbox })
    }

    /// Paint columns `xmin..xmax` of row `y`.
    pub fn drawrow(&self, cam: &Camera, y: i32, xmin: i32, xmax: i32, surface: &mut Surface) {
        if xmax <= xmin {
            return;
        }
        debug_assert!(0 <= xmin && xmax as usize <= surface.width());
        let dst = &mut surface.row_mut(y as usize)[xmin as usize..xmax as usize];

        let Some(img) = &self.image else {
            let tint = if self.highlight { HIGHLIGHT_TINT } else { FLAT_TINT };
            for px in dst.iter_mut() {
                *px = rgb_average(*px, tint);
            }
            return;
        };

        // Solve C + a·v + b·w = t·(xzr, yzr, 1) with Cramer's rule.  Only the
        // first column of each matrix depends on xzr:
        //   (−xzr, −yzr, −1) = xzr·(−1, 0, 0) + (0, −yzr, −1)
        // so every determinant is xzr·coeff + rest.
        let c = cam.point_world2cam(self.corners[0]);
        let v = cam.point_world2cam(self.corners[1]) - c;
        let w = cam.point_world2cam(self.corners[3]) - c;
        let yzr = cam.screeny_to_yzr(y as f32);

        let per_xzr = Vec3::new(-1.0, 0.0, 0.0);
        let fixed = Vec3::new(0.0, -yzr, -1.0);
        let det = |first: Vec3, second: Vec3, third: Vec3| {
            Mat3::from_cols(first, second, third).determinant()
        };
        let (m_coeff, m_rest) = (det(per_xzr, v, w), det(fixed, v, w));
        let (a_coeff, a_rest) = (det(per_xzr, -c, w), det(fixed, -c, w));
        let (b_coeff, b_rest) = (det(per_xzr, v, -c), det(fixed, v, -c));

        let (tw, th) = (img.width() as i32, img.height() as i32);
        for (i, px) in dst.iter_mut().enumerate() {
            let xzr = cam.screenx_to_xzr((xmin + i as i32) as f32);
            let det_m = xzr * m_coeff + m_rest;
            let a = (xzr * a_coeff + a_rest) / det_m;
            let b = (xzr * b_coeff + b_rest) / det_m;
            let picx = ((a * tw as f32) as i32).clamp(0, tw - 1);
            let picy = ((b * th as f32) as i32).clamp(0, th - 1);
            let texel = img.get(picx as usize, picy as usize);
            if texel != TRANSPARENT {
                *px = texel;
            }
        }
    }

    /// Camera-space z where the ray `z·(xzr, yzr, 1)` meets the wall's plane.
    pub fn camcoords_z(&self, cam: &Camera, xzr: f32, yzr: f32) -> f32 {
        // start + a·v + b·w = z·(xzr, yzr, 1)
        let start = cam.point_world2cam(self.corners[0]);
        let v = cam.world2cam() * (self.corners[1] - self.corners[0]);
        let w = cam.world2cam() * (self.corners[3] - self.corners[0]);
        let numer = Mat3::from_cols(start, v, w).determinant();
        let denom = Mat3::from_cols(Vec3::new(xzr, yzr, 1.0), v, w).determinant();
        numer / denom
    }

    /// Outline the wall if it is visible.
    pub fn draw_border(&self, cam: &Camera, surface: &mut Surface, colour: Rgba) {
        let Some(cache) = self.visible_fillcache(cam) else {
            return;
        };
        let mut prev = cache.screen[3];
        for &cur in &cache.screen {
            surface.draw_line(
                to_pixel(prev.x),
                to_pixel(prev.y),
                to_pixel(cur.x),
                to_pixel(cur.y),
                colour,
            );
            prev = cur;
        }
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{RectImage, Viewport};
    use std::sync::Arc;

    const W: usize = 800;
    const H: usize = 600;

    fn camera() -> Camera {
        Camera::new(Vec3::ZERO, 0.0, Viewport::new(W, H))
    }

    /// 2×2 wall 4 units straight ahead: columns 275..=525, rows 175..=425.
    fn facing_wall() -> Rect3 {
        Rect3::wall((-1.0, -4.0), (1.0, -4.0), -1.0, 1.0)
    }

    #[test]
    fn facing_wall_cache_and_rows() {
        let cam = camera();
        let cache = facing_wall().visible_fillcache(&cam).unwrap();
        assert_eq!(cache.bbox, ScreenRect::new(275, 175, 251, 251));

        assert_eq!(cache.xminmax(300, W), Some((275, 526)));
        assert_eq!(cache.xminmax(100, W), None);
        assert_eq!(cache.xminmax(426, W), None);
    }

    #[test]
    fn walls_behind_or_beside_are_culled() {
        let cam = camera();
        let behind = Rect3::wall((-1.0, 4.0), (1.0, 4.0), -1.0, 1.0);
        assert!(behind.visible_fillcache(&cam).is_none());

        let crossing = Rect3::wall((-1.0, -4.0), (1.0, 2.0), -1.0, 1.0);
        assert!(crossing.visible_fillcache(&cam).is_none());

        let off_to_the_side = Rect3::wall((-30.0, -4.0), (-20.0, -4.0), -1.0, 1.0);
        assert!(off_to_the_side.visible_fillcache(&cam).is_none());
    }

    #[test]
    fn big_wall_is_clipped_to_screen() {
        let cam = camera();
        // one corner on screen, the rest far outside
        let wall = Rect3::new([
            Vec3::new(-0.5, 0.5, -4.0),
            Vec3::new(40.0, 0.5, -4.0),
            Vec3::new(40.0, -40.0, -4.0),
            Vec3::new(-0.5, -40.0, -4.0),
        ]);
        let cache = wall.visible_fillcache(&cam).unwrap();
        assert_eq!(cache.bbox.right(), W as i32);
        assert_eq!(cache.bbox.bottom(), H as i32);
        let (xmin, xmax) = cache.xminmax(500, W).unwrap();
        assert!(xmin > 0 && xmax == W as i32);
    }

    #[test]
    fn corner_at_the_camera_plane_stays_in_range() {
        let cam = camera();
        // the far end sits a hair in front of the camera, far to the left
        let wall = Rect3::wall((0.5, -4.0), (-1000.0, -1e-6), -1.0, 1.0);
        let cache = wall.visible_fillcache(&cam).unwrap();
        assert_eq!(cache.bbox, ScreenRect::new(0, 0, 463, H as i32));
        assert_eq!(cache.xminmax(300, W), Some((0, 463)));

        let mut surface = Surface::new(W, H);
        wall.drawrow(&cam, 300, 0, 463, &mut surface);
        assert_eq!(surface.get(100, 300), rgb_average(0, FLAT_TINT));
        assert_eq!(surface.get(463, 300), 0);
    }

    #[test]
    fn textured_row_samples_quadrants_and_skips_transparent() {
        let img = RectImage::from_pixels(
            2,
            2,
            vec![0x00_FF_00_00, 0x00_00_FF_00, 0x00_00_00_FF, TRANSPARENT],
        )
        .unwrap();
        let wall = facing_wall().with_image(Arc::new(img));
        let cam = camera();
        let mut surface = Surface::new(W, H);
        surface.fill(0x12_34_56);

        let cache = wall.visible_fillcache(&cam).unwrap();
        for y in [200, 400] {
            let (xmin, xmax) = cache.xminmax(y, W).unwrap();
            wall.drawrow(&cam, y, xmin, xmax, &mut surface);
        }
        assert_eq!(surface.get(300, 200), 0x00_FF_00_00);
        assert_eq!(surface.get(500, 200), 0x00_00_FF_00);
        assert_eq!(surface.get(300, 400), 0x00_00_00_FF);
        assert_eq!(surface.get(500, 400), 0x12_34_56);
        assert_eq!(surface.get(200, 200), 0x12_34_56);
    }

    #[test]
    fn flat_walls_blend_with_background() {
        let cam = camera();
        let mut surface = Surface::new(W, H);
        let mut wall = facing_wall();
        wall.drawrow(&cam, 300, 300, 310, &mut surface);
        assert_eq!(surface.get(305, 300), 0x00_00_7F_7F);

        wall.highlight = true;
        wall.drawrow(&cam, 301, 300, 310, &mut surface);
        assert_eq!(surface.get(305, 301), 0x00_7F_00_00);
        assert_eq!(surface.get(310, 301), 0);
    }

    #[test]
    fn depth_under_screen_ratio() {
        let cam = camera();
        assert!((facing_wall().camcoords_z(&cam, 0.0, 0.0) + 4.0).abs() < 1e-5);

        let slanted = Rect3::wall((-2.0, -2.0), (2.0, -6.0), -1.0, 1.0);
        assert!((slanted.camcoords_z(&cam, 0.0, 0.1) + 4.0).abs() < 1e-4);
    }

    #[test]
    fn border_outlines_visible_wall() {
        let cam = camera();
        let mut surface = Surface::new(W, H);
        facing_wall().draw_border(&cam, &mut surface, 0xAB);
        assert_eq!(surface.get(275, 300), 0xAB);
        assert_eq!(surface.get(400, 175), 0xAB);
        assert_eq!(surface.get(400, 300), 0);
    }
}
