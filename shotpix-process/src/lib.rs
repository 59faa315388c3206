//! shotpix-process: Elementwise frame corrections.
//!
//! A fixed ordered sequence of independently toggleable operators
//! (background subtraction, gain division, polarization division, mask
//! application) plus mask and gain generation from run-averaged data.
//!

pub mod correct;
pub mod gain;
pub mod mask;

pub use correct::{
    apply_mask, masked_divide, masked_subtract, polarization_map, CorrectionPipeline,
    CorrectionReport, MASK_PASS_THRESHOLD,
};
pub use gain::GainBuilder;
pub use mask::MaskBuilder;
