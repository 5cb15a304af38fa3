//! Built-in video collaborators: a synthetic camera and render surfaces

pub mod pattern;
pub mod surface;

pub use pattern::TestPatternSource;
pub use surface::{SnapshotSurface, StatsSurface};
