use std::sync::Arc;

use glam::Vec3;

use crate::world::texture::RectImage;

/// Flat quadrilateral in 3D, usually a wall.
///
/// Corners are coplanar and go around the edge in order:
///
/// ```text
/// corners[0] --- corners[1]
///     |              |
/// corners[3] --- corners[2]
/// ```
///
/// A texture is stretched so that `corners[0]` is its top-left texel,
/// `corners[1]` the top-right and `corners[3]` the bottom-left.
#[derive(Clone, Debug)]
pub struct Rect3 {
    pub corners: [Vec3; 4],
    /// `None` draws a translucent flat colour.
    pub image: Option<Arc<RectImage>>,
    pub highlight: bool,
}

impl Rect3 {
    pub fn new(corners: [Vec3; 4]) -> Self {
        Self {
            corners,
            image: None,
            highlight: false,
        }
    }

    /// Vertical wall from `(x0, z0)` to `(x1, z1)`, spanning `ybot ..= ytop`.
    pub fn wall(start: (f32, f32), end: (f32, f32), ybot: f32, ytop: f32) -> Self {
        let (x0, z0) = start;
        let (x1, z1) = end;
        Self::new([
            Vec3::new(x0, ytop, z0),
            Vec3::new(x1, ytop, z1),
            Vec3::new(x1, ybot, z1),
            Vec3::new(x0, ybot, z0),
        ])
    }

    pub fn with_image(mut self, image: Arc<RectImage>) -> Self {
        self.image = Some(image);
        self
    }

    pub fn center(&self) -> Vec3 {
        self.corners.iter().copied().sum::<Vec3>() * 0.25
    }
}
