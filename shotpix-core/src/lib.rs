//! shotpix-core: Detector geometry, frame arithmetic and 2D views.
//!
//! This crate provides the foundational types for segmented-detector
//! frame processing: the flat acquisition-order [`Frame`], the tiled
//! detector layout ([`DetectorGeometry`]), raw and assembled 2D views,
//! and the running [`FrameAccumulator`].
//!

pub mod accumulator;
pub mod detector;
pub mod error;
pub mod frame;
pub mod view;

pub use accumulator::{FrameAccumulator, Normalization};
pub use detector::{DetectorGeometry, PixelId};
pub use error::{Error, Result};
pub use frame::Frame;
pub use view::{assembled_view, assembled_view_on_canvas, frame_from_raw_view, raw_view};
