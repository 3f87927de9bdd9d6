//! Rendering abstraction layer.
//!
//! *The rest of the program never touches a pixel buffer directly.*
//! It hands a [`Scene`] and a [`Camera`] to a type that implements
//! [`Renderer`] and gets the finished frame back through a closure.
//!
//! * A helper blanket-impl [`RendererExt`] adds `draw_frame` so call-sites
//!   stay short.
//! * Pixel targets ([`Surface`]) and screen rectangles live in [`surface`].

mod surface;

pub use surface::{PIXEL_LIMIT, Rgba, ScreenRect, Surface, rgb_average, to_pixel};

use crate::world::{Camera, Ellipsoid, Rect3};

/// Everything drawn in one frame.  Object ids reported by the ordering
/// engine index into these slices.
#[derive(Clone, Copy, Debug, Default)]
pub struct Scene<'a> {
    pub rects: &'a [Rect3],
    pub ellipsoids: &'a [Ellipsoid],
}

/// A renderer that owns an internal pixel buffer for the whole frame.
///
/// `end_frame` hands the finished buffer to a user-supplied closure.
pub trait Renderer {
    /// (Re)allocate the buffer for the requested resolution and clear it.
    fn begin_frame(&mut self, width: usize, height: usize);

    /// Draw every visible object of `scene` as seen by `cam`.
    ///
    /// `cam`'s viewport must match the size given to `begin_frame`.
    fn draw_scene(&mut self, scene: &Scene, cam: &Camera);

    /// Finish the frame and **loan** the finished buffer to `submit`.
    ///
    /// * `submit(&[Rgba], w, h)` is run exactly once per frame.
    /// * A windowed caller passes `|fb, w, h| window.update_with_buffer(fb, w, h)`.
    fn end_frame<F>(&mut self, submit: F)
    where
        F: FnOnce(&[Rgba], usize, usize);
}

/// Convenience blanket-impl with a one-liner `draw_frame` adaptor.
pub trait RendererExt: Renderer {
    fn draw_frame<F>(&mut self, scene: &Scene, cam: &Camera, submit: F)
    where
        F: FnOnce(&[Rgba], usize, usize),
    {
        self.begin_frame(cam.width(), cam.height());
        self.draw_scene(scene, cam);
        self.end_frame(submit);
    }
}
impl<T: Renderer + ?Sized> RendererExt for T {}

pub mod software;
pub use software::Software;
