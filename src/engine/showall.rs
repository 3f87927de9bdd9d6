//! Painter's algorithm without a depth buffer.
//!
//! There is no global back-to-front order for curved and intersecting
//! objects, but two objects whose screen boxes overlap can usually be
//! ordered against each other.  Each frame:
//!
//! 1. cull and project every ellipsoid and wall,
//! 2. find "draw A before B" pairs among overlapping ones,
//! 3. sort topologically, dropping an edge whenever a cycle blocks progress,
//! 4. per screen row, collect spans in that order, resolve overlaps with
//!    [`merge_into`], and rasterize what is left.

use glam::Vec3;
use log::{trace, warn};
use smallvec::SmallVec;

use crate::{
    config::RenderConfig,
    engine::{
        interval::{Interval, merge_into},
        types::{FrameStats, ObjectId, Sides},
    },
    math::Plane,
    renderer::{
        ScreenRect, Surface,
        software::{RectCache, RowScratch},
    },
    world::{Camera, Ellipsoid, Rect3},
};

/// Objects drawn before one object.
pub type DepList = SmallVec<[u16; 8]>;

#[derive(Clone, Copy, Debug)]
enum Shape {
    Ellipsoid(u16),
    Rect(u16, RectCache),
}

/// One object that survived culling this frame.
#[derive(Clone, Copy, Debug)]
struct VisibleObject {
    shape: Shape,
    bbox: ScreenRect,
    /// camera coordinates
    sort_rect: [Vec3; 4],
}

impl VisibleObject {
    fn id(&self) -> ObjectId {
        match self.shape {
            Shape::Ellipsoid(i) => ObjectId::Ellipsoid(i),
            Shape::Rect(i, _) => ObjectId::Rect(i),
        }
    }
}

/// Per-viewport ordering engine.
///
/// All buffers are scratch: cleared at the start of [`ShowAll::render`] and
/// kept only to avoid reallocating every frame.
pub struct ShowAll {
    sort_epsilon: f32,

    visible: Vec<VisibleObject>,
    deps: Vec<DepList>,
    order: Vec<u16>,
    done: Vec<bool>,
    /// visible objects touching each screen row, in draw order
    rows: Vec<Vec<u16>>,
    spans: Vec<Interval<u16>>,
    merged: Vec<Interval<u16>>,
    row_scratch: RowScratch,

    stats: FrameStats,
}

impl ShowAll {
    pub fn new(config: &RenderConfig) -> Self {
        let capacity = config.max_ellipsoids + config.max_rects;
        Self {
            sort_epsilon: config.sort_epsilon,
            visible: Vec::with_capacity(capacity),
            deps: Vec::with_capacity(capacity),
            order: Vec::with_capacity(capacity),
            done: Vec::with_capacity(capacity),
            rows: Vec::new(),
            spans: Vec::new(),
            merged: Vec::new(),
            row_scratch: RowScratch::default(),
            stats: FrameStats::default(),
        }
    }

    /// Objects of the last frame in the order they were painted.
    pub fn draw_order(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.order.iter().map(|&i| self.visible[i as usize].id())
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Draw every visible wall and ellipsoid into `surface`.
    ///
    /// Pixels no object covers are left alone.  `cam` must be up to date and
    /// `surface` the size of its viewport.
    pub fn render(
        &mut self,
        cam: &Camera,
        rects: &[Rect3],
        ellipsoids: &[Ellipsoid],
        surface: &mut Surface,
    ) {
        assert_eq!(
            (surface.width(), surface.height()),
            (cam.width(), cam.height()),
            "surface does not match the camera viewport"
        );
        // rects and ellipsoids share one u16 index space
        assert!(
            rects.len() + ellipsoids.len() <= u16::MAX as usize,
            "too many objects: {} walls and {} ellipsoids",
            rects.len(),
            ellipsoids.len()
        );

        self.collect_visible(cam, rects, ellipsoids);
        self.stats = FrameStats {
            visible: self.visible.len(),
            edges: self.find_dependencies(rects),
            cycles_broken: topological_order(&mut self.deps, &mut self.order, &mut self.done),
        };
        self.fill_rows(cam.height());
        self.draw_rows(cam, rects, ellipsoids, surface);

        trace!(
            "showall: {} visible, {} edges, {} cycles broken",
            self.stats.visible, self.stats.edges, self.stats.cycles_broken
        );
    }

    /*──────────────────────────── passes ────────────────────────────*/

    fn collect_visible(&mut self, cam: &Camera, rects: &[Rect3], ellipsoids: &[Ellipsoid]) {
        self.visible.clear();

        for (i, rect) in rects.iter().enumerate() {
            if let Some(cache) = rect.visible_fillcache(cam) {
                self.visible.push(VisibleObject {
                    shape: Shape::Rect(i as u16, cache),
                    bbox: cache.bbox,
                    sort_rect: rect.corners.map(|c| cam.point_world2cam(c)),
                });
            }
        }

        for (i, el) in ellipsoids.iter().enumerate() {
            if !el.is_visible(cam) {
                continue;
            }
            let Some(bbox) = el.bbox(cam) else {
                continue;
            };
            self.visible.push(VisibleObject {
                shape: Shape::Ellipsoid(i as u16),
                bbox,
                sort_rect: el.sort_rect(cam).map(|c| cam.point_world2cam(c)),
            });
        }
    }

    /// Fill `deps` from every overlapping pair; returns the edge count.
    fn find_dependencies(&mut self, rects: &[Rect3]) -> usize {
        let n = self.visible.len();
        self.deps.clear();
        self.deps.resize_with(n, DepList::new);

        let plain_wall = |obj: &VisibleObject| match obj.shape {
            Shape::Rect(i, _) => {
                let r = &rects[i as usize];
                r.image.is_none().then_some(r.highlight)
            }
            Shape::Ellipsoid(_) => None,
        };

        let mut edges = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (&self.visible[i], &self.visible[j]);
                if !a.bbox.overlaps(&b.bbox) {
                    continue;
                }
                // two flat walls blend the same way in either order
                if let (Some(ha), Some(hb)) = (plain_wall(a), plain_wall(b)) {
                    if ha == hb {
                        continue;
                    }
                }

                let (before, after) = match paint_order(a, b, self.sort_epsilon) {
                    Some(First::A) => (i, j),
                    Some(First::B) => (j, i),
                    None => continue,
                };
                let list = &mut self.deps[after];
                if !list.contains(&(before as u16)) {
                    list.push(before as u16);
                    edges += 1;
                }
            }
        }
        edges
    }

    fn fill_rows(&mut self, height: usize) {
        self.rows.resize_with(height, Vec::new);
        for row in &mut self.rows {
            row.clear();
        }
        for &i in &self.order {
            for y in self.visible[i as usize].bbox.rows() {
                self.rows[y as usize].push(i);
            }
        }
    }

    fn draw_rows(
        &mut self,
        cam: &Camera,
        rects: &[Rect3],
        ellipsoids: &[Ellipsoid],
        surface: &mut Surface,
    ) {
        let width = cam.width();
        for (y, row) in self.rows.iter().enumerate() {
            let y = y as i32;
            self.spans.clear();
            for &i in row {
                let (span, allow_overlap) = match &self.visible[i as usize].shape {
                    Shape::Ellipsoid(k) => (ellipsoids[*k as usize].xminmax(cam, y), false),
                    Shape::Rect(_, cache) => (cache.xminmax(y, width), true),
                };
                if let Some((start, end)) = span {
                    self.spans.push(Interval {
                        start,
                        end,
                        id: i,
                        allow_overlap,
                    });
                }
            }

            merge_into(&self.spans, &mut self.merged);

            for iv in &self.merged {
                match self.visible[iv.id as usize].shape {
                    Shape::Ellipsoid(k) => ellipsoids[k as usize].drawrow(
                        cam,
                        y,
                        iv.start,
                        iv.end,
                        &mut self.row_scratch,
                        surface,
                    ),
                    Shape::Rect(k, _) => rects[k as usize].drawrow(cam, y, iv.start, iv.end, surface),
                }
            }
        }
    }
}

/*──────────────────────── pairwise ordering ──────────────────────────*/

enum First {
    A,
    B,
}

/// Plane of a sort rectangle, through corners 0, 1 and 3.
fn sort_plane(corners: &[Vec3; 4]) -> Plane {
    Plane::through(corners[0], corners[1], corners[3])
}

/// Where the camera (the origin) is relative to `pl`.
fn camera_side(pl: &Plane) -> Option<Sides> {
    // signed value at the origin is −constant
    Sides::of(-pl.constant, 0.0).strict()
}

/// Is `other` entirely in front of (`Some(true)`) or behind (`Some(false)`)
/// `obj`'s sort plane, as seen from the camera?
fn in_front_of(obj: &VisibleObject, other: &VisibleObject, eps: f32) -> Option<bool> {
    let pl = sort_plane(&obj.sort_rect);
    if pl.normal.length_squared() == 0.0 {
        return None;
    }
    let cam = camera_side(&pl)?;
    let sides = other
        .sort_rect
        .iter()
        .fold(Sides::empty(), |s, &c| s | Sides::of(pl.signed_distance(c), eps));
    Some(sides.strict()? == cam)
}

/// Combine both objects' planes.  Conflicting answers mean no order.
fn paint_order(a: &VisibleObject, b: &VisibleObject, eps: f32) -> Option<First> {
    // b in front of a's plane → a first; a in front of b's plane → b first
    let by_a = in_front_of(a, b, eps).map(|b_front| if b_front { First::A } else { First::B });
    let by_b = in_front_of(b, a, eps).map(|a_front| if a_front { First::B } else { First::A });
    match (by_a, by_b) {
        (Some(First::A), Some(First::B)) | (Some(First::B), Some(First::A)) => None,
        (Some(x), _) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

/*──────────────────────── topological sort ───────────────────────────*/

/// Order `0..deps.len()` so that everything in `deps[i]` comes before `i`.
///
/// Works in rounds: every object with no remaining dependencies is emitted
/// in index order, then removed from the other lists.  When a round emits
/// nothing, every remaining object waits on another remaining one, so
/// following first dependencies must loop; Floyd's tortoise and hare finds
/// an object on that loop and its first dependency is dropped.
///
/// `deps` is consumed in the process and `done` is scratch.  Returns the
/// number of edges dropped.
pub fn topological_order(deps: &mut [DepList], order: &mut Vec<u16>, done: &mut Vec<bool>) -> usize {
    let n = deps.len();
    order.clear();
    done.clear();
    done.resize(n, false);
    let mut broken = 0;

    while order.len() < n {
        let round_start = order.len();
        for i in 0..n {
            if !done[i] && deps[i].is_empty() {
                order.push(i as u16);
            }
        }

        if order.len() == round_start {
            let start = (0..n).find(|&i| !done[i]).unwrap_or(0);
            let next = |i: usize| deps[i][0] as usize;
            let mut tortoise = next(start);
            let mut hare = next(next(start));
            while tortoise != hare {
                tortoise = next(tortoise);
                hare = next(next(hare));
            }
            let dropped = deps[tortoise].remove(0);
            warn!("dependency cycle through object {tortoise}: dropped edge from {dropped}");
            broken += 1;
            continue;
        }

        for &i in &order[round_start..] {
            done[i as usize] = true;
        }
        for (i, list) in deps.iter_mut().enumerate() {
            if !done[i] {
                list.retain(|d| !done[*d as usize]);
            }
        }
    }
    broken
}

/*=== Tests ===*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        renderer::Rgba,
        world::{AngleTable, EllipsoidPic, RectImage, Viewport},
    };
    use smallvec::smallvec;
    use std::sync::Arc;

    const W: usize = 800;
    const H: usize = 600;

    fn solid(colour: Rgba) -> Arc<RectImage> {
        Arc::new(RectImage::from_pixels(1, 1, vec![colour]).unwrap())
    }

    fn ball(center: Vec3, rgb: [u8; 3]) -> Ellipsoid {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([rgb[0], rgb[1], rgb[2], 0xFF]));
        let pic = EllipsoidPic::from_image(&AngleTable::new(16), img).unwrap();
        Ellipsoid::new(center, Arc::new(pic), 0.5, 0.5)
    }

    fn render(cam: &Camera, rects: &[Rect3], balls: &[Ellipsoid]) -> (ShowAll, Surface) {
        let mut show = ShowAll::new(&RenderConfig::default());
        let mut surface = Surface::new(W, H);
        show.render(cam, rects, balls, &mut surface);
        (show, surface)
    }

    #[test]
    fn far_wall_is_painted_under_near_wall() {
        // far wall in z = -2, near wall in x = 1, sharing the edge x = 1, z = -2
        let far = Rect3::wall((-1.0, -2.0), (1.0, -2.0), 0.0, 1.0).with_image(solid(0x00_00_00_FF));
        let near = Rect3::wall((1.0, -2.0), (1.0, 0.0), 0.0, 1.0).with_image(solid(0x00_FF_00_00));

        let mut cam = Camera::new(Vec3::new(3.0, 0.5, 1.0), 0.0, Viewport::new(W, H));
        cam.set_angle_towards(Vec3::new(0.0, 0.5, -1.0));
        cam.update_caches();

        for rects in [[near.clone(), far.clone()], [far.clone(), near.clone()]] {
            let (show, surface) = render(&cam, &rects, &[]);
            let order: Vec<_> = show.draw_order().collect();
            let far_id = if rects[0].corners == far.corners { 0 } else { 1 };
            assert_eq!(order, [ObjectId::Rect(far_id), ObjectId::Rect(1 - far_id)]);
            assert_eq!(show.stats().edges, 1);

            // from here the near wall hides all of the far one
            let (x, y) = cam.point_to_screen(Vec3::new(0.0, 0.5, -2.0));
            assert_eq!(surface.get(x as usize, y as usize), 0x00_FF_00_00);
        }
    }

    #[test]
    fn chain_of_overlapping_walls() {
        let cam = Camera::new(Vec3::ZERO, 0.0, Viewport::new(W, H));
        let a = Rect3::wall((-1.5, -3.0), (-0.3, -3.0), -0.5, 0.5).with_image(solid(0xA));
        let b = Rect3::wall((-0.5, -2.5), (0.5, -2.5), -0.5, 0.5).with_image(solid(0xB));
        let c = Rect3::wall((0.3, -2.0), (1.2, -2.0), -0.5, 0.5).with_image(solid(0xC));

        let (show, surface) = render(&cam, &[c, b, a], &[]);
        let order: Vec<_> = show.draw_order().collect();
        assert_eq!(order, [ObjectId::Rect(2), ObjectId::Rect(1), ObjectId::Rect(0)]);
        assert_eq!(show.stats(), FrameStats { visible: 3, edges: 2, cycles_broken: 0 });

        // a spans columns 150..350, b 300..500, c 475..700
        assert_eq!(surface.get(200, 300), 0xA);
        assert_eq!(surface.get(320, 300), 0xB);
        assert_eq!(surface.get(490, 300), 0xC);
        assert_eq!(surface.get(750, 300), 0);
    }

    #[test]
    fn ball_behind_wall_and_in_front_of_it() {
        let cam = Camera::new(Vec3::ZERO, 0.0, Viewport::new(W, H));
        let wall = Rect3::wall((-1.0, -4.0), (1.0, -4.0), -1.0, 1.0).with_image(solid(0x00_12_34_56));

        let behind = ball(Vec3::new(0.0, 0.0, -7.0), [0xFF, 0xFF, 0]);
        let (show, surface) = render(&cam, std::slice::from_ref(&wall), &[behind]);
        let order: Vec<_> = show.draw_order().collect();
        assert_eq!(order, [ObjectId::Ellipsoid(0), ObjectId::Rect(0)]);
        assert_eq!(surface.get(400, 300), 0x00_12_34_56);

        let in_front = ball(Vec3::new(0.0, 0.0, -3.0), [0xFF, 0xFF, 0]);
        let (show, surface) = render(&cam, &[wall], &[in_front]);
        let order: Vec<_> = show.draw_order().collect();
        assert_eq!(order, [ObjectId::Rect(0), ObjectId::Ellipsoid(0)]);
        assert_eq!(surface.get(400, 300), 0x00_FF_FF_00);
        // wall still shows around the ball
        assert_eq!(surface.get(290, 300), 0x00_12_34_56);
    }

    #[test]
    fn flat_walls_are_not_ordered() {
        let cam = Camera::new(Vec3::ZERO, 0.0, Viewport::new(W, H));
        let a = Rect3::wall((-1.0, -4.0), (1.0, -4.0), -1.0, 1.0);
        let b = Rect3::wall((-1.0, -3.0), (1.0, -3.0), -1.0, 1.0);
        let (show, surface) = render(&cam, &[a.clone(), b.clone()], &[]);
        assert_eq!(show.stats().edges, 0);
        assert_eq!(show.stats().visible, 2);
        // both blended over black
        assert_eq!(surface.get(400, 300), rgb2(0x00_00_FF_FF));

        let mut lit = b;
        lit.highlight = true;
        let (show, _) = render(&cam, &[a, lit], &[]);
        assert_eq!(show.stats().edges, 1);
    }

    fn rgb2(tint: Rgba) -> Rgba {
        use crate::renderer::rgb_average;
        rgb_average(rgb_average(0, tint), tint)
    }

    #[test]
    fn untouched_rows_keep_their_pixels() {
        let cam = Camera::new(Vec3::ZERO, 0.0, Viewport::new(W, H));
        let wall = Rect3::wall((-1.0, -4.0), (1.0, -4.0), -1.0, 1.0).with_image(solid(7));
        let mut show = ShowAll::new(&RenderConfig::default());
        let mut surface = Surface::new(W, H);
        surface.fill(0x99);
        show.render(&cam, &[wall], &[], &mut surface);
        assert_eq!(surface.get(400, 50), 0x99);
        assert_eq!(surface.get(400, 300), 7);

        // nothing visible: nothing drawn, buffers reset
        show.render(&cam, &[], &[], &mut surface);
        assert_eq!(show.stats(), FrameStats::default());
        assert_eq!(show.draw_order().count(), 0);
    }

    #[test]
    fn cycle_is_broken_once() {
        let mut deps: Vec<DepList> = vec![smallvec![2], smallvec![0], smallvec![1]];
        let (mut order, mut done) = (Vec::new(), Vec::new());
        assert_eq!(topological_order(&mut deps, &mut order, &mut done), 1);
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(sorted, [0, 1, 2]);
        assert_eq!(order, [0, 1, 2]);
    }

    #[test]
    fn cycle_behind_a_free_object() {
        // 0 is free; 1 → 3 → 2 → 1 loop once 0 is gone
        let mut deps: Vec<DepList> = vec![smallvec![], smallvec![0, 3], smallvec![1], smallvec![2]];
        let (mut order, mut done) = (Vec::new(), Vec::new());
        assert_eq!(topological_order(&mut deps, &mut order, &mut done), 1);
        assert_eq!(order[0], 0);
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(sorted, [0, 1, 2, 3]);
    }

    #[test]
    fn acyclic_rounds_follow_index_order() {
        let mut deps: Vec<DepList> =
            vec![smallvec![3], smallvec![], smallvec![1], smallvec![], smallvec![0, 2]];
        let (mut order, mut done) = (Vec::new(), Vec::new());
        assert_eq!(topological_order(&mut deps, &mut order, &mut done), 0);
        assert_eq!(order, [1, 3, 0, 2, 4]);
    }

    #[test]
    fn done_flags_are_reset_between_calls() {
        let (mut order, mut done) = (Vec::new(), Vec::new());
        let mut deps: Vec<DepList> = vec![smallvec![], smallvec![0], smallvec![1]];
        topological_order(&mut deps, &mut order, &mut done);
        assert_eq!(order, [0, 1, 2]);

        let mut deps: Vec<DepList> = vec![smallvec![1], smallvec![]];
        assert_eq!(topological_order(&mut deps, &mut order, &mut done), 0);
        assert_eq!(order, [1, 0]);
        assert_eq!(done.len(), 2);
    }

    #[test]
    fn wall_reaching_the_camera_plane_is_drawn() {
        let cam = Camera::new(Vec3::ZERO, 0.0, Viewport::new(W, H));
        let wall = Rect3::wall((0.5, -4.0), (-1000.0, -1e-6), -1.0, 1.0);
        let (show, surface) = render(&cam, &[wall], &[]);
        assert_eq!(show.stats().visible, 1);
        assert_eq!(surface.get(100, 300), crate::renderer::rgb_average(0, 0x00_00_FF_FF));
        assert_eq!(surface.get(600, 300), 0);
    }

    #[test]
    #[should_panic(expected = "too many objects")]
    fn object_count_must_fit_the_index_type() {
        let cam = Camera::new(Vec3::ZERO, 0.0, Viewport::new(8, 8));
        let rects = vec![Rect3::wall((-1.0, -4.0), (1.0, -4.0), -1.0, 1.0); 40_000];
        let balls = vec![ball(Vec3::new(0.0, 0.0, -5.0), [1, 2, 3]); 30_000];
        let mut show = ShowAll::new(&RenderConfig::default());
        let mut surface = Surface::new(8, 8);
        show.render(&cam, &rects, &balls, &mut surface);
    }
}
