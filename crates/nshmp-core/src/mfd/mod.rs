//! Discretized magnitude-frequency distributions.
//!
//! Every distribution is an evenly spaced set of bin-center magnitudes with an
//! incremental annual rate per bin. Builders in the submodules produce
//! distributions once at model-load time; afterwards they are only read or
//! resampled into new distributions.

pub mod builder;
pub mod conversion;
pub mod gaussian;
pub mod gutenberg_richter;
pub mod summed;

pub use builder::{
    EpistemicBranch, EpistemicModel, MagnitudeModel, MfdBuild, MfdConstruction,
    build_source_mfd, centered_bin_count, grid_centered_bins,
};
pub use conversion::{MagnitudeConversion, apply_magnitude_taper};
pub use gaussian::{GaussianShape, gaussian_by_moment_rate, gaussian_by_total_rate};
pub use gutenberg_richter::{
    gutenberg_richter_by_moment_rate, gutenberg_richter_by_total_rate, total_moment_rate,
};
pub use summed::sum_moment_conserving;

use crate::common::constants::{
    DEFAULT_MAG_BIN_WIDTH, MOMENT_MAGNITUDE_OFFSET, MOMENT_MAGNITUDE_SLOPE,
};
use crate::domain::{NshmpError, NshmpResult};
use crate::numerics::stable_sum;
use serde::{Deserialize, Serialize};

/// Seismic moment (N m) of a moment magnitude.
pub fn seismic_moment(magnitude: f64) -> f64 {
    10.0_f64.powf(MOMENT_MAGNITUDE_SLOPE * magnitude + MOMENT_MAGNITUDE_OFFSET)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncrementalMfd {
    min_magnitude: f64,
    delta: f64,
    rates: Vec<f64>,
}

impl IncrementalMfd {
    /// Zero-rate distribution with `num` bins starting at `min_magnitude`.
    pub fn zeros(min_magnitude: f64, num: usize, delta: f64) -> NshmpResult<Self> {
        if num == 0 {
            return Err(NshmpError::configuration(
                "CONFIG.MFD_BIN_COUNT",
                format!("distribution starting at M{min_magnitude} needs at least one bin"),
            ));
        }
        if !(delta > 0.0) || !delta.is_finite() {
            return Err(NshmpError::configuration(
                "CONFIG.MFD_BIN_WIDTH",
                format!("bin width must be strictly positive, got {delta}"),
            ));
        }
        if !min_magnitude.is_finite() {
            return Err(NshmpError::configuration(
                "CONFIG.MFD_MAGNITUDE",
                format!("minimum magnitude must be finite, got {min_magnitude}"),
            ));
        }
        Ok(Self {
            min_magnitude,
            delta,
            rates: vec![0.0; num],
        })
    }

    pub fn from_rates(min_magnitude: f64, delta: f64, rates: Vec<f64>) -> NshmpResult<Self> {
        let mut mfd = Self::zeros(min_magnitude, rates.len(), delta)?;
        mfd.rates = rates;
        Ok(mfd)
    }

    /// Single-bin distribution; the bin width defaults to the legacy value.
    pub fn single(magnitude: f64, rate: f64) -> NshmpResult<Self> {
        Self::from_rates(magnitude, DEFAULT_MAG_BIN_WIDTH, vec![rate])
    }

    pub fn min_magnitude(&self) -> f64 {
        self.min_magnitude
    }

    pub fn max_magnitude(&self) -> f64 {
        self.magnitude(self.rates.len() - 1)
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn magnitude(&self, index: usize) -> f64 {
        self.min_magnitude + index as f64 * self.delta
    }

    pub fn rate(&self, index: usize) -> f64 {
        self.rates[index]
    }

    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    pub fn magnitudes(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.rates.len()).map(|index| self.magnitude(index))
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.rates
            .iter()
            .enumerate()
            .map(|(index, rate)| (self.magnitude(index), *rate))
    }

    pub fn set_rate(&mut self, index: usize, rate: f64) {
        self.rates[index] = rate;
    }

    pub fn add_rate(&mut self, index: usize, rate: f64) {
        self.rates[index] += rate;
    }

    pub fn scale(&mut self, factor: f64) {
        for rate in &mut self.rates {
            *rate *= factor;
        }
    }

    /// Index of the bin whose center is nearest to `magnitude`.
    pub fn index_of(&self, magnitude: f64) -> Option<usize> {
        let nearest = ((magnitude - self.min_magnitude) / self.delta).round();
        if nearest < 0.0 || nearest >= self.rates.len() as f64 {
            return None;
        }
        Some(nearest as usize)
    }

    pub fn total_rate(&self) -> f64 {
        stable_sum(&self.rates)
    }

    /// Rate of events at or above bin `index`.
    pub fn cumulative_rate(&self, index: usize) -> f64 {
        stable_sum(&self.rates[index..])
    }

    pub fn total_moment_rate(&self) -> f64 {
        let moments: Vec<f64> = self
            .points()
            .map(|(magnitude, rate)| rate * seismic_moment(magnitude))
            .collect();
        stable_sum(&moments)
    }

    /// Rate-weighted mean magnitude, `None` for an all-zero distribution.
    pub fn mean_magnitude(&self) -> Option<f64> {
        let total = self.total_rate();
        if total == 0.0 {
            return None;
        }
        let weighted: Vec<f64> = self.points().map(|(magnitude, rate)| magnitude * rate).collect();
        Some(stable_sum(&weighted) / total)
    }
}
