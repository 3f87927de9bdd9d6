//! Per-frame orchestration: which objects are visible, in what order they
//! are painted, and which object owns each pixel span.

pub mod context;
pub mod interval;
pub mod showall;
pub mod types;

pub use context::RenderContext;
pub use interval::{Interval, merge_into, non_overlapping};
pub use showall::{ShowAll, topological_order};
pub use types::{FrameStats, ObjectId, Sides};
