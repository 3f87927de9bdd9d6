//! ---------------------------------------------------------------------------
//! Software (CPU) scan-line renderer
//!
//! * Fills a [`Surface`] in **0x00RRGGBB** format.
//! * No depth buffer: the ordering engine decides which object paints each
//!   pixel, and every row is rasterized by the per-shape `drawrow`s in
//!   [`ellipsoid`] and [`rect`].
//! ---------------------------------------------------------------------------

pub mod ellipsoid;
pub mod rect;

pub use ellipsoid::RowScratch;
pub use rect::RectCache;

use crate::{
    engine::{RenderContext, ShowAll},
    renderer::{Renderer, Rgba, Scene, Surface},
    world::Camera,
};

/*───────────────────────────────────────────────────────────────────────*/
/*                              Backend                                 */
/*───────────────────────────────────────────────────────────────────────*/

/// One viewport's worth of pixels plus the ordering state that fills them.
///
/// Split-screen callers keep one `Software` per viewport.
pub struct Software {
    surface: Surface,
    show_all: ShowAll,
    clear_color: Rgba,
}

impl Software {
    pub fn new(ctx: &RenderContext) -> Self {
        Self {
            surface: Surface::new(0, 0),
            show_all: ctx.show_all(),
            clear_color: ctx.config().clear_color,
        }
    }

    /// The frame drawn so far.
    #[inline]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Ordering state of the last `draw_scene`.
    #[inline]
    pub fn show_all(&self) -> &ShowAll {
        &self.show_all
    }
}

impl Default for Software {
    fn default() -> Self {
        Self::new(&RenderContext::default())
    }
}

/*──────────────────────── Renderer trait impl ────────────────────────*/
impl Renderer for Software {
    fn begin_frame(&mut self, w: usize, h: usize) {
        // reallocates only if the resolution changed
        self.surface.resize(w, h);
        self.surface.fill(self.clear_color);
    }

    fn draw_scene(&mut self, scene: &Scene, cam: &Camera) {
        self.show_all
            .render(cam, scene.rects, scene.ellipsoids, &mut self.surface);
    }

    fn end_frame<F>(&mut self, submit: F)
    where
        F: FnOnce(&[Rgba], usize, usize),
    {
        submit(
            self.surface.pixels(),
            self.surface.width(),
            self.surface.height(),
        );
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
