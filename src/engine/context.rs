use std::path::Path;

use image::RgbaImage;

use crate::{
    config::RenderConfig,
    engine::showall::ShowAll,
    world::{AngleTable, EllipsoidPic, TextureError},
};

/// Read-only state shared by every viewport: configuration and the tables
/// computed once at start-up.
///
/// Build one per process and pass it by reference; nothing in it changes
/// after construction, so split-screen passes can share it freely.
#[derive(Clone, Debug)]
pub struct RenderContext {
    config: RenderConfig,
    angles: AngleTable,
}

impl RenderContext {
    pub fn new(config: RenderConfig) -> Self {
        let angles = AngleTable::new(config.ellipsoid_pic_side);
        Self { config, angles }
    }

    #[inline]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    #[inline]
    pub fn angles(&self) -> &AngleTable {
        &self.angles
    }

    /// Wrap an in-memory picture around the unit ball.
    pub fn ellipsoid_pic(&self, img: RgbaImage) -> Result<EllipsoidPic, TextureError> {
        EllipsoidPic::from_image(&self.angles, img)
    }

    pub fn load_ellipsoid_pic(&self, path: impl AsRef<Path>) -> Result<EllipsoidPic, TextureError> {
        EllipsoidPic::load(&self.angles, path)
    }

    /// Fresh ordering engine with buffers sized from the configuration.
    pub fn show_all(&self) -> ShowAll {
        ShowAll::new(&self.config)
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pictures_use_configured_side() {
        let ctx = RenderContext::new(RenderConfig {
            ellipsoid_pic_side: 12,
            ..RenderConfig::default()
        });
        assert_eq!(ctx.angles().side(), 12);
        let pic = ctx.ellipsoid_pic(RgbaImage::from_pixel(3, 3, image::Rgba([1, 2, 3, 255])));
        assert_eq!(pic.unwrap().side(), 12);
    }
}
