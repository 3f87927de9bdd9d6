//! Pixel target and integer screen rectangles.

use glam::Vec2;

/// Pixel format of the software frame-buffer (0x00RRGGBB).
pub type Rgba = u32;

/// Average two colours channel by channel.
///
/// Drops the low bit of every channel first so the halves never carry into
/// the neighbouring channel.
#[inline(always)]
pub fn rgb_average(a: Rgba, b: Rgba) -> Rgba {
    ((a & 0x00_FE_FE_FE) >> 1) + ((b & 0x00_FE_FE_FE) >> 1)
}

/// Projected coordinates are clamped to `±PIXEL_LIMIT` before becoming
/// integers, so rectangle sizes built from them cannot overflow `i32`.
pub const PIXEL_LIMIT: i32 = 1 << 24;

/// Truncate a fractional screen coordinate to a pixel index within
/// `±PIXEL_LIMIT`.  NaN maps to 0.
#[inline(always)]
pub fn to_pixel(v: f32) -> i32 {
    v.clamp(-(PIXEL_LIMIT as f32), PIXEL_LIMIT as f32) as i32
}

/*───────────────────────────── ScreenRect ─────────────────────────────*/

/// Axis-aligned pixel rectangle: columns `x .. x+w`, rows `y .. y+h`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl ScreenRect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    #[inline(always)]
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    #[inline(always)]
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Smallest rectangle containing every point (truncated to pixels).
    pub fn enclose(points: &[Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let (mut x0, mut y0) = (to_pixel(first.x), to_pixel(first.y));
        let (mut x1, mut y1) = (x0, y0);
        for p in rest {
            let (x, y) = (to_pixel(p.x), to_pixel(p.y));
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        Some(Self::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1))
    }

    /// Common part of two rectangles, `None` if they don't share a pixel.
    pub fn intersect(&self, other: &ScreenRect) -> Option<Self> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        let r = Self::new(x0, y0, x1 - x0, y1 - y0);
        (!r.is_empty()).then_some(r)
    }

    /// Do the rectangles share pixels in both x and y?
    pub fn overlaps(&self, other: &ScreenRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    #[inline(always)]
    pub fn contains_row(&self, y: i32) -> bool {
        self.y <= y && y < self.bottom()
    }

    pub fn rows(&self) -> std::ops::Range<i32> {
        self.y..self.bottom()
    }
}

/*─────────────────────────────── Surface ──────────────────────────────*/

/// Row-major 0x00RRGGBB pixels.
#[derive(Clone, Debug)]
pub struct Surface {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
}

impl Surface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bounds(&self) -> ScreenRect {
        ScreenRect::new(0, 0, self.width as i32, self.height as i32)
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Reallocate if the resolution changed.  Contents are unspecified after
    /// a resize.
    pub fn resize(&mut self, width: usize, height: usize) {
        if width != self.width || height != self.height {
            self.width = width;
            self.height = height;
            self.pixels.resize(width * height, 0);
        }
    }

    pub fn fill(&mut self, colour: Rgba) {
        self.pixels.fill(colour);
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Rgba {
        self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn put(&mut self, x: usize, y: usize, colour: Rgba) {
        self.pixels[y * self.width + x] = colour;
    }

    /// One full scan-line.
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [Rgba] {
        let start = y * self.width;
        &mut self.pixels[start..start + self.width]
    }

    /// Integer Bresenham line, clipped to the surface.
    pub fn draw_line(&mut self, mut x0: i32, mut y0: i32, x1: i32, y1: i32, colour: Rgba) {
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -(y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            if (0..self.width as i32).contains(&x0) && (0..self.height as i32).contains(&y0) {
                self.pixels[y0 as usize * self.width + x0 as usize] = colour;
            }
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    /// Copy `src` so that its top-left corner lands on `(x, y)`; the part
    /// outside this surface is dropped.
    pub fn blit(&mut self, src: &Surface, x: i32, y: i32) {
        let dst = ScreenRect::new(x, y, src.width as i32, src.height as i32);
        let Some(clip) = dst.intersect(&self.bounds()) else {
            return;
        };
        for row in clip.rows() {
            let sy = (row - y) as usize;
            let sx = (clip.x - x) as usize;
            let n = clip.w as usize;
            let from = &src.pixels[sy * src.width + sx..][..n];
            let start = row as usize * self.width + clip.x as usize;
            self.pixels[start..start + n].copy_from_slice(from);
        }
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
