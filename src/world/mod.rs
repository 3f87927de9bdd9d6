pub mod bump;
pub mod camera;
pub mod ellipsoid;
pub mod rect3;
pub mod texture;

pub use camera::{CAMPLANE_IDX, Camera, Viewport};
pub use ellipsoid::Ellipsoid;
pub use rect3::Rect3;
pub use texture::{AngleTable, EllipsoidPic, RectImage, TRANSPARENT, TextureError};
