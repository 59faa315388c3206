//! Live instrument telemetry snapshots and change detection.
//!
//! The host samples the named beam parameters once per event into a
//! [`ParameterSnapshot`]; the discrimination engine diffs consecutive
//! snapshots to decide when the coordinate map must be rebuilt. This
//! replaces the ambient mutable parameter table of older pipelines with
//! an explicit value passed through the event path.

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Named live instrument readings.
///
/// Only [`DetectorPosition`](Self::DetectorPosition) and
/// [`Wavelength`](Self::Wavelength) feed the coordinate map; the rest is
/// auxiliary beam telemetry carried along for bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BeamParameter {
    /// Detector stage position along the beam, millimeters.
    DetectorPosition,
    /// Photon wavelength, nanometers.
    Wavelength,
    /// Electron beam energy.
    ElectronEnergy,
    /// Electrons per bunch.
    ElectronCount,
    /// Machine repetition rate, Hz.
    RepetitionRate,
    /// Peak current after the second bunch compressor.
    PeakCurrent,
    /// Pulse length.
    PulseLength,
    /// Photon beam energy, eV.
    PhotonEnergy,
    /// Calculated number of photons per pulse.
    PhotonCount,
}

impl BeamParameter {
    /// Human-readable description of the reading.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::DetectorPosition => "detector stage position [mm]",
            Self::Wavelength => "wavelength [nm]",
            Self::ElectronEnergy => "electron beam energy",
            Self::ElectronCount => "electrons per bunch",
            Self::RepetitionRate => "repetition rate [Hz]",
            Self::PeakCurrent => "peak current after second bunch compressor",
            Self::PulseLength => "pulse length",
            Self::PhotonEnergy => "photon beam energy [eV]",
            Self::PhotonCount => "calculated number of photons",
        }
    }

    /// True if a change in this reading invalidates the coordinate map.
    #[must_use]
    pub fn affects_geometry(&self) -> bool {
        matches!(self, Self::DetectorPosition | Self::Wavelength)
    }
}

/// One sampled value, tagged with whether the read succeeded.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParameterReading {
    /// Sampled value.
    pub value: f64,
    /// False if the telemetry read failed this event.
    pub valid: bool,
}

impl ParameterReading {
    /// A successfully sampled value.
    #[must_use]
    pub fn valid(value: f64) -> Self {
        Self { value, valid: true }
    }

    /// A failed read.
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            value: 0.0,
            valid: false,
        }
    }
}

/// All parameter readings sampled for one event.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParameterSnapshot {
    readings: BTreeMap<BeamParameter, ParameterReading>,
}

impl ParameterSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one reading (builder style).
    #[must_use]
    pub fn with(mut self, parameter: BeamParameter, reading: ParameterReading) -> Self {
        self.readings.insert(parameter, reading);
        self
    }

    /// Records one reading.
    pub fn set(&mut self, parameter: BeamParameter, reading: ParameterReading) {
        self.readings.insert(parameter, reading);
    }

    /// Looks up a reading.
    #[must_use]
    pub fn get(&self, parameter: BeamParameter) -> Option<ParameterReading> {
        self.readings.get(&parameter).copied()
    }

    /// Value of a reading, only if it was sampled successfully.
    #[must_use]
    pub fn valid_value(&self, parameter: BeamParameter) -> Option<f64> {
        self.get(parameter)
            .filter(|reading| reading.valid)
            .map(|reading| reading.value)
    }

    /// Replaces failed readings with the value they had in `previous`.
    ///
    /// A reading that failed this event keeps its last known value (still
    /// tagged invalid) so that change detection does not fire on read
    /// glitches.
    pub fn carry_forward(&mut self, previous: &ParameterSnapshot) {
        for (parameter, reading) in &mut self.readings {
            if !reading.valid {
                if let Some(prev) = previous.readings.get(parameter) {
                    reading.value = prev.value;
                }
            }
        }
    }

    /// Computes which readings changed relative to `previous`.
    ///
    /// Invalid readings never count as changed; a reading with no
    /// predecessor counts as changed when it is valid.
    #[must_use]
    pub fn diff(&self, previous: &ParameterSnapshot) -> ParameterDelta {
        let mut changed = BTreeSet::new();
        for (parameter, reading) in &self.readings {
            if !reading.valid {
                continue;
            }
            match previous.readings.get(parameter) {
                Some(prev) if prev.value == reading.value => {}
                _ => {
                    changed.insert(*parameter);
                }
            }
        }
        ParameterDelta { changed }
    }
}

/// Result of diffing two consecutive snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterDelta {
    changed: BTreeSet<BeamParameter>,
}

impl ParameterDelta {
    /// True if the given reading changed.
    #[must_use]
    pub fn changed(&self, parameter: BeamParameter) -> bool {
        self.changed.contains(&parameter)
    }

    /// True if any geometry-relevant reading changed.
    #[must_use]
    pub fn geometry_changed(&self) -> bool {
        self.changed.iter().any(BeamParameter::affects_geometry)
    }

    /// Iterates over the changed readings.
    pub fn iter(&self) -> impl Iterator<Item = BeamParameter> + '_ {
        self.changed.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_detects_wavelength_change() {
        let first = ParameterSnapshot::new()
            .with(BeamParameter::Wavelength, ParameterReading::valid(0.2))
            .with(BeamParameter::DetectorPosition, ParameterReading::valid(80.0));
        let second = ParameterSnapshot::new()
            .with(BeamParameter::Wavelength, ParameterReading::valid(0.25))
            .with(BeamParameter::DetectorPosition, ParameterReading::valid(80.0));

        let delta = second.diff(&first);
        assert!(delta.changed(BeamParameter::Wavelength));
        assert!(!delta.changed(BeamParameter::DetectorPosition));
        assert!(delta.geometry_changed());
    }

    #[test]
    fn test_auxiliary_change_is_not_geometry() {
        let first = ParameterSnapshot::new()
            .with(BeamParameter::PhotonEnergy, ParameterReading::valid(8000.0));
        let second = ParameterSnapshot::new()
            .with(BeamParameter::PhotonEnergy, ParameterReading::valid(8100.0));
        let delta = second.diff(&first);
        assert!(delta.changed(BeamParameter::PhotonEnergy));
        assert!(!delta.geometry_changed());
    }

    #[test]
    fn test_invalid_reading_never_changes() {
        let first = ParameterSnapshot::new()
            .with(BeamParameter::Wavelength, ParameterReading::valid(0.2));
        let mut second =
            ParameterSnapshot::new().with(BeamParameter::Wavelength, ParameterReading::invalid());
        second.carry_forward(&first);

        let delta = second.diff(&first);
        assert!(!delta.geometry_changed());
        // the stale value is carried so a later valid read diffs correctly
        assert_eq!(second.get(BeamParameter::Wavelength).unwrap().value, 0.2);
        assert!(!second.get(BeamParameter::Wavelength).unwrap().valid);
    }

    #[test]
    fn test_first_valid_reading_counts_as_changed() {
        let empty = ParameterSnapshot::new();
        let snapshot = ParameterSnapshot::new()
            .with(BeamParameter::DetectorPosition, ParameterReading::valid(80.0));
        assert!(snapshot.diff(&empty).geometry_changed());
    }
}
