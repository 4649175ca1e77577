//! # Auricle Common Library
//!
//! Shared code for the Auricle audio sink:
//! - Stream format vocabulary (sample rate / bit depth / channel count)
//! - Event types (SinkEvent enum) and the broadcast EventBus
//! - Volume curves and the raw step / percent mapping
//! - Configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod stream;
pub mod volume_curves;

pub use error::{Error, Result};
pub use stream::StreamFormat;
pub use volume_curves::VolumeCurve;
