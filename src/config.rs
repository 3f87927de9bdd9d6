//! Renderer-wide tunables.

use crate::renderer::Rgba;

/// Knobs shared by every viewport of a [`crate::engine::RenderContext`].
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    /// Side length `S` of the `S³` ellipsoid texture cube.
    pub ellipsoid_pic_side: usize,
    /// Sort-rectangle corners closer than this to the other object's plane
    /// do not vote on which side they are on.
    pub sort_epsilon: f32,
    /// Capacity reserved up front for per-frame visible ellipsoids.
    pub max_ellipsoids: usize,
    /// Capacity reserved up front for per-frame visible walls.
    pub max_rects: usize,
    /// Background the [`crate::renderer::Software`] backend clears to.
    pub clear_color: Rgba,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ellipsoid_pic_side: 150,
            sort_epsilon: 1e-4,
            max_ellipsoids: 256,
            max_rects: 4096,
            clear_color: 0x00_20_20_20,
        }
    }
}
