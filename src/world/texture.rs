//! Pictures the rasterizers sample from.
//!
//! Both kinds are decoded once (from a file or an in-memory `RgbaImage`),
//! converted to the frame-buffer pixel format and never touched again, so
//! any number of walls or ellipsoids can share one through an `Arc`.

use std::{
    f32::consts::{FRAC_PI_2, TAU},
    path::{Path, PathBuf},
};

use image::RgbaImage;
use log::info;

use crate::renderer::{Rgba, rgb_average};

/// Wall texel that is skipped instead of drawn.
///
/// Opaque texels always have a zero top byte, so they never collide with it.
pub const TRANSPARENT: Rgba = 0xFFFF_FFFF;

/// Tint blended into the highlighted copy of an ellipsoid picture.
const HIGHLIGHT_TINT: Rgba = 0x00_FF_00_00;

#[inline(always)]
fn is_transparent(alpha: u8) -> bool {
    alpha < 0x80
}

#[inline(always)]
fn pack_rgb(p: &image::Rgba<u8>) -> Rgba {
    (p[0] as u32) << 16 | (p[1] as u32) << 8 | p[2] as u32
}

/// Things that can go wrong while building a texture.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("cannot load image `{path}`: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image has no pixels")]
    Empty,

    /// Raw RGBA buffer does not match the stated dimensions.
    #[error("{width}x{height} image needs {expected} bytes, got {got}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        got: usize,
    },
}

fn open_rgba(path: &Path) -> Result<RgbaImage, TextureError> {
    let img = image::open(path).map_err(|source| TextureError::Image {
        path: path.to_owned(),
        source,
    })?;
    let rgba = img.to_rgba8();
    info!("loaded {} ({}x{})", path.display(), rgba.width(), rgba.height());
    Ok(rgba)
}

fn rgba_from_raw(width: u32, height: u32, bytes: Vec<u8>) -> Result<RgbaImage, TextureError> {
    let got = bytes.len();
    RgbaImage::from_raw(width, height, bytes).ok_or(TextureError::SizeMismatch {
        width,
        height,
        expected: width as usize * height as usize * 4,
        got,
    })
}

/*──────────────────────────── wall images ────────────────────────────*/

/// Row-major wall texture; see [`TRANSPARENT`].
#[derive(Clone, Debug, PartialEq)]
pub struct RectImage {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
}

impl RectImage {
    pub fn from_image(img: &RgbaImage) -> Result<Self, TextureError> {
        if img.width() == 0 || img.height() == 0 {
            return Err(TextureError::Empty);
        }
        let pixels = img
            .pixels()
            .map(|p| if is_transparent(p[3]) { TRANSPARENT } else { pack_rgb(p) })
            .collect();
        Ok(Self {
            width: img.width() as usize,
            height: img.height() as usize,
            pixels,
        })
    }

    /// `bytes` is tightly packed RGBA, `width * height * 4` long.
    pub fn from_rgba8(width: u32, height: u32, bytes: Vec<u8>) -> Result<Self, TextureError> {
        Self::from_image(&rgba_from_raw(width, height, bytes)?)
    }

    /// Build from already converted texels (procedural textures).
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<Rgba>) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty);
        }
        if pixels.len() != width * height {
            return Err(TextureError::SizeMismatch {
                width: width as u32,
                height: height as u32,
                expected: width * height,
                got: pixels.len(),
            });
        }
        Ok(Self { width, height, pixels })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TextureError> {
        Self::from_image(&open_rgba(path.as_ref())?)
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline(always)]
    pub fn get(&self, x: usize, y: usize) -> Rgba {
        self.pixels[y * self.width + x]
    }
}

/*──────────────────────── ellipsoid pictures ─────────────────────────*/

/// Horizontal angle around the y axis for every `(x, z)` cell of an
/// ellipsoid cube, in `[0, 2π)`.
///
/// Angle 0 points towards +z and grows towards +x, so a picture wrapped
/// with it is not mirrored when seen from outside.
#[derive(Clone, Debug)]
pub struct AngleTable {
    side: usize,
    angles: Vec<f32>,
}

impl AngleTable {
    pub fn new(side: usize) -> Self {
        let half = (side / 2) as f32;
        let mut angles = Vec::with_capacity(side * side);
        for x in 0..side {
            for z in 0..side {
                let a = FRAC_PI_2 - (z as f32 - half).atan2(x as f32 - half);
                angles.push(a.rem_euclid(TAU));
            }
        }
        Self { side, angles }
    }

    #[inline(always)]
    pub fn side(&self) -> usize {
        self.side
    }

    #[inline(always)]
    pub fn get(&self, x: usize, z: usize) -> f32 {
        self.angles[x * self.side + z]
    }
}

/// A picture wrapped around the unit ball, stored as a `side³` colour cube
/// indexed by quantised surface point.
///
/// The cube is stored twice: as is, and tinted for highlighted ellipsoids.
#[derive(Clone, Debug)]
pub struct EllipsoidPic {
    side: usize,
    cubes: [Vec<Rgba>; 2],
    /// Only the upper half (unit-ball `y ≥ 0`) of ellipsoids using this
    /// picture is drawn.
    pub hide_lower_half: bool,
}

impl EllipsoidPic {
    /// Wrap `img` around the ball: image rows go from top (+y) to bottom
    /// (−y), image columns follow [`AngleTable`].  Transparent pixels are
    /// replaced by the average opaque colour first.
    pub fn from_image(angles: &AngleTable, mut img: RgbaImage) -> Result<Self, TextureError> {
        let (w, h) = (img.width() as usize, img.height() as usize);
        if w == 0 || h == 0 {
            return Err(TextureError::Empty);
        }
        let side = angles.side();
        assert!(side >= 2, "ellipsoid picture side {side} too small");

        replace_alpha_with_average(&mut img);

        // picy for every cube y, picx for every (x, z) column
        let picy: Vec<u32> = (0..side)
            .map(|y| ((side - 1 - y) as f32 * (h - 1) as f32 / (side - 1) as f32) as u32)
            .collect();
        let picx = |x: usize, z: usize| {
            let col = (angles.get(x, z) / TAU * (w - 1) as f32) as u32;
            col.min(w as u32 - 1)
        };

        let mut plain = Vec::with_capacity(side * side * side);
        for x in 0..side {
            for y in 0..side {
                for z in 0..side {
                    plain.push(pack_rgb(img.get_pixel(picx(x, z), picy[y])));
                }
            }
        }
        let tinted = plain.iter().map(|&c| rgb_average(c, HIGHLIGHT_TINT)).collect();

        Ok(Self {
            side,
            cubes: [plain, tinted],
            hide_lower_half: false,
        })
    }

    pub fn from_rgba8(
        angles: &AngleTable,
        width: u32,
        height: u32,
        bytes: Vec<u8>,
    ) -> Result<Self, TextureError> {
        Self::from_image(angles, rgba_from_raw(width, height, bytes)?)
    }

    pub fn load(angles: &AngleTable, path: impl AsRef<Path>) -> Result<Self, TextureError> {
        Self::from_image(angles, open_rgba(path.as_ref())?)
    }

    #[inline(always)]
    pub fn side(&self) -> usize {
        self.side
    }

    /// The cube to sample from; indices are `(x * side + y) * side + z`.
    #[inline(always)]
    pub fn cube(&self, highlighted: bool) -> &[Rgba] {
        &self.cubes[highlighted as usize]
    }

    #[inline]
    pub fn texel(&self, highlighted: bool, x: usize, y: usize, z: usize) -> Rgba {
        self.cube(highlighted)[(x * self.side + y) * self.side + z]
    }
}

/// Give every transparent pixel the average colour of the opaque ones.
///
/// A fully transparent image is left alone.
pub fn replace_alpha_with_average(img: &mut RgbaImage) {
    let mut sum = [0u64; 3];
    let mut count = 0u64;
    for p in img.pixels().filter(|p| !is_transparent(p[3])) {
        for c in 0..3 {
            sum[c] += p[c] as u64;
        }
        count += 1;
    }
    if count == 0 {
        return;
    }

    let avg = sum.map(|s| (s / count).min(0xFF) as u8);
    for p in img.pixels_mut().filter(|p| is_transparent(p[3])) {
        p[0] = avg[0];
        p[1] = avg[1];
        p[2] = avg[2];
    }
}

/*=== Tests ===*/
