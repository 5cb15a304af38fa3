//! Media units passed between pipeline stages

pub mod chunk;
pub mod frame;

pub use chunk::AudioChunk;
pub use frame::Frame;
