//! Fixed constants of the legacy hazard-mapping formats.
//!
//! The legacy rounding terms are reproduced exactly; reference outputs depend on them.

/// Default magnitude bin width, also substituted for malformed widths.
pub const DEFAULT_MAG_BIN_WIDTH: f64 = 0.1;
/// Bin widths at or below this value are treated as malformed.
pub const MIN_VALID_MAG_BIN_WIDTH: f64 = 0.004;
/// Margin in degrees added on every side of a geographic window.
pub const DEFAULT_BORDER_THICKNESS_DEG: f64 = 2.0;
/// Grid ruptures at or above this magnitude use the finite-rupture depth model.
pub const POINT_TO_FINITE_MAGNITUDE: f64 = 6.0;
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 200.0;
/// `ln(1 - p)` below this value means a numerically infinite Poisson rate.
pub const POISSON_LOG_CUTOFF: f64 = -30.0;
/// Taper magnitude used when a grid file supplies no taper weights.
pub const TAPER_MAGNITUDE_SENTINEL: f64 = 10.0;
pub const TAPER_MAGNITUDE_MIN: f64 = 5.0;
pub const TAPER_MAGNITUDE_MAX: f64 = 8.0;

pub const EPISTEMIC_TEST_MAGNITUDE: f64 = 6.5;
pub const LEGACY_BIN_COUNT_ROUNDING: f64 = 1.4;
pub const LEGACY_UPPER_BIN_SHIFT: f64 = 0.0001;
/// Gaussian bin spacing and half-width unit, in multiples of sigma.
pub const GAUSSIAN_SIGMA_STEP: f64 = 0.4;

/// `log10(M0) = 1.5 M + 9.05` (N m).
pub const MOMENT_MAGNITUDE_SLOPE: f64 = 1.5;
pub const MOMENT_MAGNITUDE_OFFSET: f64 = 9.05;

pub const RUPTURE_TOP_MIN_MAGNITUDE: f64 = POINT_TO_FINITE_MAGNITUDE;
pub const RUPTURE_TOP_MAX_MAGNITUDE: f64 = 10.0;
pub const RUPTURE_TOP_SPLIT_MAGNITUDE: f64 = 6.5;

pub const EARTH_RADIUS_MEAN_KM: f64 = 6371.0072;

pub const GRID_STRIKE_SLIP_DIP: f64 = 90.0;
pub const GRID_REVERSE_DIP: f64 = 50.0;
pub const GRID_NORMAL_DIP: f64 = 90.0;

/// Rate assigned to grid cells whose maximum-magnitude entry is negative.
pub const MASKED_CELL_RATE: f64 = 1.0e-10;

pub const DEFAULT_MAG_DIST_CUTOFF_DISTANCES: [f64; 7] = [0.0, 25.0, 40.0, 60.0, 80.0, 100.0, 500.0];
pub const DEFAULT_MAG_DIST_CUTOFF_MAGNITUDES: [f64; 7] = [0.0, 5.25, 5.75, 6.25, 6.75, 7.25, 9.0];
