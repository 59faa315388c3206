//! shotpix-engine: Per-event hit discrimination.
//!
//! The [`DiscriminationEngine`] consumes one frame and one parameter
//! snapshot per event, keeps the coordinate map current across parameter
//! changes, accepts or rejects the event against the configured
//! criterion, and folds accepted frames into the running accumulator.
//!

pub mod engine;
pub mod hitlist;

pub use engine::{
    Criterion, DiscriminationConfig, DiscriminationEngine, EngineState, EventOutcome,
    RejectReason, RunSummary, Selection,
};
pub use hitlist::HitRecord;
