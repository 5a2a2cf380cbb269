//! Turns assembled source records into rupture sets for the hazard loop.

use super::{HazardSource, ProbEqkRupture, RuptureSurface};
use crate::common::constants::POINT_TO_FINITE_MAGNITUDE;
use crate::domain::{
    FaultSourceGeometry, Location, NshmpError, NshmpResult, PointSourceGeometry, SourceGeometry,
    SourceRecord, SubductionSourceGeometry, TectonicRegion,
};
use crate::mfd::IncrementalMfd;
use crate::numerics::{azimuth_rad, offset_location};
use serde::Serialize;
use std::f64::consts::FRAC_PI_2;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSource {
    pub id: String,
    pub name: String,
    pub tectonic_region: TectonicRegion,
    pub poissonian: bool,
    pub ruptures: Vec<ProbEqkRupture>,
}

impl HazardSource for ForecastSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn tectonic_region(&self) -> TectonicRegion {
        self.tectonic_region
    }

    fn is_poissonian(&self) -> bool {
        self.poissonian
    }

    fn ruptures(&self) -> &[ProbEqkRupture] {
        &self.ruptures
    }
}

/// Supplies the gridded surface of a finite source.
pub trait SurfaceBuilder: Sync {
    fn fault_surface(&self, fault: &FaultSourceGeometry) -> NshmpResult<RuptureSurface>;

    fn subduction_surface(
        &self,
        subduction: &SubductionSourceGeometry,
    ) -> NshmpResult<RuptureSurface>;
}

/// Two-row surfaces spanning the upper and lower edge of a source.
///
/// Faults project the trace down dip, perpendicular to the end-to-end strike;
/// subduction interfaces resample both edges to a common vertex count.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeSurfaceBuilder;

impl SurfaceBuilder for EdgeSurfaceBuilder {
    fn fault_surface(&self, fault: &FaultSourceGeometry) -> NshmpResult<RuptureSurface> {
        let (Some(first), Some(last)) = (fault.trace.first(), fault.trace.last()) else {
            return Err(NshmpError::configuration(
                "CONFIG.EMPTY_TRACE",
                "fault trace has no vertices",
            ));
        };
        if !(fault.dip > 0.0 && fault.dip <= 90.0) {
            return Err(NshmpError::configuration(
                "CONFIG.FAULT_DIP",
                format!("fault dip {} is outside (0, 90] degrees", fault.dip),
            ));
        }
        let thickness = fault.lower_seismogenic_depth - fault.upper_seismogenic_depth;
        let dip_direction = azimuth_rad(first, last) + FRAC_PI_2;
        let horizontal = thickness / fault.dip.to_radians().tan();

        let upper = fault
            .trace
            .iter()
            .map(|point| point.with_depth(fault.upper_seismogenic_depth));
        let lower = fault.trace.iter().map(|point| {
            offset_location(
                &point.with_depth(fault.upper_seismogenic_depth),
                dip_direction,
                horizontal,
                thickness,
            )
        });
        let points = upper.chain(lower).collect();
        two_row_surface(fault.trace.len(), points)
    }

    fn subduction_surface(
        &self,
        subduction: &SubductionSourceGeometry,
    ) -> NshmpResult<RuptureSurface> {
        let columns = subduction.top_trace.len().max(subduction.bottom_trace.len());
        let mut points = resample_trace(&subduction.top_trace, columns)?;
        points.extend(resample_trace(&subduction.bottom_trace, columns)?);
        two_row_surface(columns, points)
    }
}

fn two_row_surface(columns: usize, points: Vec<Location>) -> NshmpResult<RuptureSurface> {
    RuptureSurface::new(2, columns, points).ok_or_else(|| {
        NshmpError::internal(
            "SYS.SURFACE_SHAPE",
            format!("edge surface does not fill a 2 x {columns} grid"),
        )
    })
}

/// Evenly spaced samples along the vertex index of `trace`.
fn resample_trace(trace: &[Location], count: usize) -> NshmpResult<Vec<Location>> {
    if trace.is_empty() {
        return Err(NshmpError::configuration(
            "CONFIG.EMPTY_TRACE",
            "subduction edge has no vertices",
        ));
    }
    if trace.len() == count || count < 2 {
        return Ok(trace.to_vec());
    }
    let last = trace.len() - 1;
    let samples = (0..count)
        .map(|index| {
            let position = index as f64 * last as f64 / (count - 1) as f64;
            let lower = (position.floor() as usize).min(last);
            let upper = (lower + 1).min(last);
            let fraction = position - lower as f64;
            let (a, b) = (&trace[lower], &trace[upper]);
            Location::new(
                a.latitude + fraction * (b.latitude - a.latitude),
                a.longitude + fraction * (b.longitude - a.longitude),
                a.depth + fraction * (b.depth - a.depth),
            )
        })
        .collect();
    Ok(samples)
}

fn occurrence_probability(rate: f64, duration_years: f64) -> f64 {
    1.0 - (-rate * duration_years).exp()
}

fn mfd_ruptures(
    mfd: &IncrementalMfd,
    rake: f64,
    duration_years: f64,
    surface_for: impl Fn(f64) -> RuptureSurface,
) -> impl Iterator<Item = ProbEqkRupture> {
    mfd.points()
        .filter(|(_, rate)| *rate > 0.0)
        .map(move |(magnitude, rate)| ProbEqkRupture {
            magnitude,
            rake,
            probability: occurrence_probability(rate, duration_years),
            surface: surface_for(magnitude),
        })
}

/// One rupture per non-zero bin of every mechanism; small events sit at the
/// hypocentral depth, larger ones at their mean top-of-rupture depth.
pub fn point_source_ruptures(
    point: &PointSourceGeometry,
    duration_years: f64,
) -> Vec<ProbEqkRupture> {
    let surface_for = |magnitude: f64| {
        let depth = if magnitude < POINT_TO_FINITE_MAGNITUDE {
            point.average_hypocentral_depth
        } else {
            point.rupture_top_vs_magnitude.interpolate(magnitude)
        };
        RuptureSurface::point(point.location.with_depth(depth))
    };
    point
        .mechanisms
        .iter()
        .flat_map(|mechanism| {
            mfd_ruptures(
                &mechanism.mfd,
                mechanism.mechanism.rake,
                duration_years,
                surface_for,
            )
        })
        .collect()
}

/// Poisson rupture sets for every record over `duration_years`.
pub fn build_forecast(
    sources: &[SourceRecord],
    duration_years: f64,
    builder: &dyn SurfaceBuilder,
) -> NshmpResult<Vec<ForecastSource>> {
    if !(duration_years > 0.0) || !duration_years.is_finite() {
        return Err(NshmpError::configuration(
            "CONFIG.DURATION",
            format!("forecast duration must be positive, got {duration_years} years"),
        ));
    }
    sources
        .iter()
        .map(|source| {
            let ruptures = match &source.geometry {
                SourceGeometry::Point(point) => point_source_ruptures(point, duration_years),
                SourceGeometry::Fault(fault) => {
                    let surface = builder.fault_surface(fault)?;
                    mfd_ruptures(&source.mfd, fault.rake, duration_years, |_| surface.clone())
                        .collect()
                }
                SourceGeometry::Subduction(subduction) => {
                    let surface = builder.subduction_surface(subduction)?;
                    mfd_ruptures(&source.mfd, subduction.rake, duration_years, |_| {
                        surface.clone()
                    })
                    .collect()
                }
            };
            debug!(id = %source.id, ruptures = ruptures.len(), "forecast source built");
            Ok(ForecastSource {
                id: source.id.clone(),
                name: source.name.clone(),
                tectonic_region: source.tectonic_region,
                poissonian: true,
                ruptures,
            })
        })
        .collect()
}
