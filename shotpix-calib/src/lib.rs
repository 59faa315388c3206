//! shotpix-calib: Instrument parameter snapshots and per-pixel
//! coordinate maps.
//!
//! Turns base calibration offsets plus live beam parameters (detector
//! stage position, wavelength) into the full per-pixel coordinate map:
//! micrometers, pixel units, reciprocal-space q and polar angles.
//!

pub mod coords;
pub mod error;
pub mod params;

pub use coords::{
    build_coordinate_map, BaseOffsets, CalibrationSource, CoordinateConfig, CoordinateMap,
    CoordinateMapper,
};
pub use error::{Error, Result};
pub use params::{BeamParameter, ParameterDelta, ParameterReading, ParameterSnapshot};
