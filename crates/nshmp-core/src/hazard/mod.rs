//! Probabilistic hazard curves for a site over a list of rupture sources.

pub mod calculator;
pub mod curve;
pub mod forecast;
pub mod gmm;
pub mod rupture;

pub use calculator::{
    CalculationControl, CurveStats, HazardCalculator, HazardOutcome, RuptureProgress,
};
pub use curve::HazardCurve;
pub use forecast::{
    EdgeSurfaceBuilder, ForecastSource, SurfaceBuilder, build_forecast, point_source_ruptures,
};
pub use gmm::{GmmRegistry, GroundMotionModel};
pub use rupture::{ProbEqkRupture, RuptureSurface};

use crate::domain::{Location, TectonicRegion};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub location: Location,
    /// Time-averaged shear-wave velocity of the top 30 m, in m/s.
    pub vs30: f64,
}

impl Site {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            vs30: 760.0,
        }
    }
}

/// A source as seen by the hazard loop: a rupture set plus the flags that
/// select how its probabilities combine.
pub trait HazardSource: Sync {
    fn name(&self) -> &str;

    fn tectonic_region(&self) -> TectonicRegion;

    /// Poisson sources combine rupture probabilities multiplicatively;
    /// others sum them within the source.
    fn is_poissonian(&self) -> bool;

    fn ruptures(&self) -> &[ProbEqkRupture];

    fn min_distance_km(&self, site: &Location) -> f64 {
        self.ruptures()
            .iter()
            .map(|rupture| rupture.surface.min_distance_km(site))
            .fold(f64::INFINITY, f64::min)
    }
}
