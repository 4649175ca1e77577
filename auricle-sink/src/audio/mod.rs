//! Volume control, sample scaling, and output device management

pub mod format;
pub mod output;
pub mod scaler;
pub mod volume;

pub use format::{OutputController, TransferPlan};
pub use output::{NullSink, OutputSink, WavSink};
pub use scaler::apply_volume;
pub use volume::VolumeControl;
