//! Site hazard-curve aggregation.
//!
//! Curves start as non-exceedance probabilities of 1 and are reduced source by
//! source; the exceedance curve is only formed once every source has been
//! visited.

use super::curve::HazardCurve;
use super::gmm::{GmmRegistry, GroundMotionModel};
use super::{HazardSource, ProbEqkRupture, Site};
use crate::common::config::HazardSettings;
use crate::common::constants::{DEFAULT_MAX_DISTANCE_KM, POISSON_LOG_CUTOFF};
use crate::domain::{NshmpError, NshmpResult};
use crate::numerics::PiecewiseLinear;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuptureProgress {
    pub ruptures_processed: usize,
    pub total_ruptures: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CurveStats {
    pub sources_visited: usize,
    pub ruptures_processed: usize,
    pub total_ruptures: usize,
    /// Ruptures dropped by the magnitude-distance cutoff.
    pub rejected_ruptures: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HazardOutcome {
    Completed { curve: HazardCurve, stats: CurveStats },
    /// Cancellation was observed before every source was visited.
    Stopped { stats: CurveStats },
}

impl HazardOutcome {
    pub fn stats(&self) -> CurveStats {
        match self {
            Self::Completed { stats, .. } | Self::Stopped { stats } => *stats,
        }
    }

    pub fn curve(&self) -> Option<&HazardCurve> {
        match self {
            Self::Completed { curve, .. } => Some(curve),
            Self::Stopped { .. } => None,
        }
    }
}

/// Cooperative cancellation flag and progress callback, both checked once
/// per source.
#[derive(Clone, Copy, Default)]
pub struct CalculationControl<'a> {
    pub cancel: Option<&'a AtomicBool>,
    pub progress: Option<&'a (dyn Fn(RuptureProgress) + Sync)>,
}

impl CalculationControl<'_> {
    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn report(&self, stats: &CurveStats) {
        if let Some(progress) = self.progress {
            progress(RuptureProgress {
                ruptures_processed: stats.ruptures_processed,
                total_ruptures: stats.total_ruptures,
            });
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HazardCalculator {
    max_distance_km: f64,
    mag_dist_cutoff: Option<PiecewiseLinear>,
}

impl Default for HazardCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DISTANCE_KM)
    }
}

impl HazardCalculator {
    pub fn new(max_distance_km: f64) -> Self {
        Self {
            max_distance_km,
            mag_dist_cutoff: None,
        }
    }

    pub fn from_settings(settings: &HazardSettings) -> NshmpResult<Self> {
        settings.validate()?;
        Ok(Self {
            max_distance_km: settings.max_distance_km,
            mag_dist_cutoff: settings.mag_dist_function()?,
        })
    }

    /// Enables the cutoff: ruptures below `cutoff(distance)` are rejected.
    pub fn with_mag_dist_cutoff(mut self, cutoff: PiecewiseLinear) -> Self {
        self.mag_dist_cutoff = Some(cutoff);
        self
    }

    pub fn max_distance_km(&self) -> f64 {
        self.max_distance_km
    }

    pub fn mag_dist_cutoff(&self) -> Option<&PiecewiseLinear> {
        self.mag_dist_cutoff.as_ref()
    }

    fn magnitude_threshold(&self, distance: f64) -> f64 {
        self.mag_dist_cutoff
            .as_ref()
            .map_or(f64::NEG_INFINITY, |cutoff| cutoff.interpolate(distance))
    }

    pub fn hazard_curve<S: HazardSource>(
        &self,
        levels: &[f64],
        site: &Site,
        sources: &[S],
        gmms: &GmmRegistry,
        control: CalculationControl<'_>,
    ) -> NshmpResult<HazardOutcome> {
        HazardCurve::new(levels.to_vec())?;
        let mut non_exceedance = vec![1.0; levels.len()];
        let mut source_sum = vec![0.0; levels.len()];
        let mut stats = CurveStats {
            total_ruptures: sources.iter().map(|source| source.ruptures().len()).sum(),
            ..CurveStats::default()
        };
        let mut source_used = false;

        for source in sources {
            if control.cancelled() {
                return Ok(HazardOutcome::Stopped { stats });
            }
            stats.sources_visited += 1;
            let ruptures = source.ruptures();

            let distance = source.min_distance_km(&site.location);
            if distance > self.max_distance_km {
                stats.ruptures_processed += ruptures.len();
                control.report(&stats);
                continue;
            }

            let gmm = gmms.model_for(source.tectonic_region())?;
            let poissonian = source.is_poissonian();
            if !poissonian {
                source_sum.fill(0.0);
            }

            for rupture in ruptures {
                stats.ruptures_processed += 1;
                let rupture_distance = rupture.surface.perimeter_distance_km(&site.location);
                if rupture_distance > self.max_distance_km {
                    continue;
                }
                if rupture.magnitude < self.magnitude_threshold(rupture_distance) {
                    stats.rejected_ruptures += 1;
                    continue;
                }
                source_used = true;

                let conditional = conditional_probabilities(gmm, rupture, site, levels)?;
                if poissonian {
                    let log_survival = (1.0 - rupture.probability).ln();
                    if log_survival < POISSON_LOG_CUTOFF {
                        return Err(NshmpError::numerical_instability(
                            "MODEL.POISSON_OVERFLOW",
                            format!(
                                "rupture probability {} of source '{}' is too high for a Poisson source (~infinite number of events)",
                                rupture.probability,
                                source.name()
                            ),
                        ));
                    }
                    for (value, exceedance) in non_exceedance.iter_mut().zip(&conditional) {
                        *value *= (log_survival * exceedance).exp();
                    }
                } else {
                    for (sum, exceedance) in source_sum.iter_mut().zip(&conditional) {
                        *sum += rupture.probability * exceedance;
                    }
                }
            }

            if !poissonian {
                for (value, sum) in non_exceedance.iter_mut().zip(&source_sum) {
                    *value *= 1.0 - sum;
                }
            }
            control.report(&stats);
        }

        let values = if source_used {
            non_exceedance.iter().map(|value| 1.0 - value).collect()
        } else {
            vec![0.0; levels.len()]
        };
        info!(
            ruptures_processed = stats.ruptures_processed,
            rejected = stats.rejected_ruptures,
            "hazard curve calculation finished"
        );
        Ok(HazardOutcome::Completed {
            curve: HazardCurve::with_values(levels, values),
            stats,
        })
    }

    /// Independent site curves evaluated in parallel over a shared source list.
    pub fn hazard_curves_for_sites<S: HazardSource>(
        &self,
        levels: &[f64],
        sites: &[Site],
        sources: &[S],
        gmms: &GmmRegistry,
        cancel: Option<&AtomicBool>,
    ) -> NshmpResult<Vec<HazardOutcome>> {
        sites
            .par_iter()
            .map(|site| {
                let control = CalculationControl {
                    cancel,
                    progress: None,
                };
                self.hazard_curve(levels, site, sources, gmms, control)
            })
            .collect()
    }
}

fn conditional_probabilities(
    gmm: &dyn GroundMotionModel,
    rupture: &ProbEqkRupture,
    site: &Site,
    levels: &[f64],
) -> NshmpResult<Vec<f64>> {
    let probabilities = gmm.exceedance_probabilities(rupture, site, levels)?;
    if probabilities.len() != levels.len() {
        return Err(NshmpError::internal(
            "SYS.GMM_LEVELS",
            format!(
                "ground-motion model returned {} probabilities for {} intensity levels",
                probabilities.len(),
                levels.len()
            ),
        ));
    }
    Ok(probabilities)
}

/// Curve for a set of events that all occur: `1 - prod(1 - P(exceed))`.
pub fn event_set_hazard_curve(
    levels: &[f64],
    site: &Site,
    gmm: &dyn GroundMotionModel,
    events: &[ProbEqkRupture],
) -> NshmpResult<HazardCurve> {
    let mut non_exceedance = vec![1.0; levels.len()];
    for event in events {
        let conditional = conditional_probabilities(gmm, event, site, levels)?;
        for (value, exceedance) in non_exceedance.iter_mut().zip(&conditional) {
            *value *= 1.0 - exceedance;
        }
    }
    let values = non_exceedance.iter().map(|value| 1.0 - value).collect();
    Ok(HazardCurve::with_values(levels, values))
}

/// Conditional exceedance curve of one rupture, ignoring its probability.
pub fn deterministic_curve(
    levels: &[f64],
    site: &Site,
    gmm: &dyn GroundMotionModel,
    rupture: &ProbEqkRupture,
) -> NshmpResult<HazardCurve> {
    let values = conditional_probabilities(gmm, rupture, site, levels)?;
    Ok(HazardCurve::with_values(levels, values))
}
