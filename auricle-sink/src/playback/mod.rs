//! Staging buffer, writer thread, and pipeline coordination

pub mod engine;
pub mod notify;
pub mod ring_buffer;
pub mod state;
pub mod writer;

pub use engine::AudioPipeline;
pub use notify::StateNotifier;
pub use ring_buffer::{AudioRingBuffer, BufferStats};
pub use state::PhaseTracker;
pub use writer::OutputWriter;
