pub mod errors;

pub use errors::{ErrorScope, NshmpError, NshmpErrorCategory, NshmpResult};

use crate::common::constants::DEFAULT_BORDER_THICKNESS_DEG;
use crate::mfd::IncrementalMfd;
use crate::numerics::PiecewiseLinear;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Depth below the surface in km.
    #[serde(default)]
    pub depth: f64,
}

impl Location {
    pub const fn new(latitude: f64, longitude: f64, depth: f64) -> Self {
        Self {
            latitude,
            longitude,
            depth,
        }
    }

    pub const fn with_depth(self, depth: f64) -> Self {
        Self { depth, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TectonicRegion {
    ActiveShallow,
    StableShallow,
    SubductionInterface,
    SubductionIntraslab,
    Volcanic,
}

impl TectonicRegion {
    pub const ALL: [Self; 5] = [
        Self::ActiveShallow,
        Self::StableShallow,
        Self::SubductionInterface,
        Self::SubductionIntraslab,
        Self::Volcanic,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ActiveShallow => "active_shallow",
            Self::StableShallow => "stable_shallow",
            Self::SubductionInterface => "subduction_interface",
            Self::SubductionIntraslab => "subduction_intraslab",
            Self::Volcanic => "volcanic",
        }
    }
}

impl Display for TectonicRegion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TectonicRegion {
    type Err = NshmpError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|region| region.as_str() == normalized)
            .ok_or_else(|| {
                NshmpError::configuration(
                    "CONFIG.TECTONIC_REGION",
                    format!("unknown tectonic region '{value}'"),
                )
            })
    }
}

/// Bounding box plus a border margin added on every side before testing inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeographicWindow {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
    #[serde(default = "default_border_thickness")]
    pub border: f64,
}

fn default_border_thickness() -> f64 {
    DEFAULT_BORDER_THICKNESS_DEG
}

impl GeographicWindow {
    pub fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> NshmpResult<Self> {
        let window = Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
            border: DEFAULT_BORDER_THICKNESS_DEG,
        };
        window.validate()?;
        Ok(window)
    }

    /// Window accepting every location.
    pub const fn unbounded() -> Self {
        Self {
            lat_min: -f64::MAX,
            lat_max: f64::MAX,
            lon_min: -f64::MAX,
            lon_max: f64::MAX,
            border: DEFAULT_BORDER_THICKNESS_DEG,
        }
    }

    pub fn with_border(self, border: f64) -> NshmpResult<Self> {
        let window = Self { border, ..self };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> NshmpResult<()> {
        let values = [
            self.lat_min,
            self.lat_max,
            self.lon_min,
            self.lon_max,
            self.border,
        ];
        if values.iter().any(|value| value.is_nan()) {
            return Err(NshmpError::configuration(
                "CONFIG.WINDOW",
                "geographic window bounds must be numbers",
            ));
        }
        if self.lat_min > self.lat_max || self.lon_min > self.lon_max {
            return Err(NshmpError::configuration(
                "CONFIG.WINDOW",
                format!(
                    "geographic window is inverted: lat [{}, {}], lon [{}, {}]",
                    self.lat_min, self.lat_max, self.lon_min, self.lon_max
                ),
            ));
        }
        if self.border < 0.0 {
            return Err(NshmpError::configuration(
                "CONFIG.WINDOW",
                format!("border thickness must be non-negative, got {}", self.border),
            ));
        }
        Ok(())
    }

    pub fn contains(&self, location: &Location) -> bool {
        location.latitude >= self.lat_min - self.border
            && location.latitude <= self.lat_max + self.border
            && location.longitude >= self.lon_min - self.border
            && location.longitude <= self.lon_max + self.border
    }

    pub fn contains_any<'a>(&self, locations: impl IntoIterator<Item = &'a Location>) -> bool {
        locations.into_iter().any(|location| self.contains(location))
    }
}

impl Default for GeographicWindow {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocalMechanism {
    pub strike: f64,
    pub dip: f64,
    pub rake: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanismMfd {
    pub mechanism: FocalMechanism,
    pub mfd: IncrementalMfd,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSourceGeometry {
    pub location: Location,
    pub average_hypocentral_depth: f64,
    pub rupture_top_vs_magnitude: PiecewiseLinear,
    pub mechanisms: Vec<MechanismMfd>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultSourceGeometry {
    /// Trace points carry the upper seismogenic depth.
    pub trace: Vec<Location>,
    pub dip: f64,
    pub rake: f64,
    pub upper_seismogenic_depth: f64,
    pub lower_seismogenic_depth: f64,
    pub floating_ruptures: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubductionSourceGeometry {
    pub top_trace: Vec<Location>,
    pub bottom_trace: Vec<Location>,
    pub rake: f64,
    pub floating_ruptures: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceGeometry {
    Point(PointSourceGeometry),
    Fault(FaultSourceGeometry),
    Subduction(SubductionSourceGeometry),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Point,
    Fault,
    Subduction,
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Point => "point",
            Self::Fault => "fault",
            Self::Subduction => "subduction",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    pub name: String,
    pub tectonic_region: TectonicRegion,
    pub mfd: IncrementalMfd,
    pub geometry: SourceGeometry,
}

impl SourceRecord {
    /// Rejects records whose final distribution carries no rate.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        tectonic_region: TectonicRegion,
        mfd: IncrementalMfd,
        geometry: SourceGeometry,
    ) -> NshmpResult<Self> {
        let id = id.into();
        if !(mfd.total_rate() > 0.0) {
            return Err(NshmpError::numerical_instability(
                "MODEL.ZERO_TOTAL_RATE",
                format!("source '{id}' has a magnitude-frequency distribution with zero total rate"),
            ));
        }
        Ok(Self {
            id,
            name: name.into(),
            tectonic_region,
            mfd,
            geometry,
        })
    }

    pub fn kind(&self) -> SourceKind {
        match self.geometry {
            SourceGeometry::Point(_) => SourceKind::Point,
            SourceGeometry::Fault(_) => SourceKind::Fault,
            SourceGeometry::Subduction(_) => SourceKind::Subduction,
        }
    }

    pub fn total_rate(&self) -> f64 {
        self.mfd.total_rate()
    }

    pub fn total_moment_rate(&self) -> f64 {
        self.mfd.total_moment_rate()
    }

    /// Every geographic vertex of the geometry payload.
    pub fn locations(&self) -> Vec<&Location> {
        match &self.geometry {
            SourceGeometry::Point(point) => vec![&point.location],
            SourceGeometry::Fault(fault) => fault.trace.iter().collect(),
            SourceGeometry::Subduction(subduction) => subduction
                .top_trace
                .iter()
                .chain(subduction.bottom_trace.iter())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        FaultSourceGeometry, GeographicWindow, Location, NshmpErrorCategory, SourceGeometry,
        SourceRecord, TectonicRegion,
    };
    use crate::mfd::IncrementalMfd;

    #[test]
    fn records_need_a_positive_total_rate() {
        for rate in [0.0, f64::NAN] {
            let mfd = IncrementalMfd::single(6.5, rate).expect("mfd");
            let geometry = SourceGeometry::Fault(FaultSourceGeometry {
                trace: vec![Location::new(61.0, -150.0, 0.0)],
                dip: 90.0,
                rake: 0.0,
                upper_seismogenic_depth: 0.0,
                lower_seismogenic_depth: 10.0,
                floating_ruptures: false,
            });
            let error = SourceRecord::new("1", "", TectonicRegion::ActiveShallow, mfd, geometry)
                .expect_err("no usable rate");
            assert_eq!(error.category(), NshmpErrorCategory::NumericalInstabilityError);
            assert_eq!(error.placeholder(), "MODEL.ZERO_TOTAL_RATE");
        }
    }

    #[test]
    fn padded_window_boundary_is_inclusive() {
        let window = GeographicWindow::new(10.0, 20.0, 30.0, 40.0).expect("window");
        let on_edge = Location::new(20.0 + 2.0, 35.0, 0.0);
        let beyond = Location::new(20.0 + 2.0 + 1.0e-9, 35.0, 0.0);
        assert!(window.contains(&on_edge));
        assert!(!window.contains(&beyond));
        assert!(window.contains(&Location::new(8.0, 28.0, 0.0)));
        assert!(!window.contains(&Location::new(7.9, 35.0, 0.0)));
    }

    #[test]
    fn window_with_any_vertex_inside_includes_source() {
        let window = GeographicWindow::new(0.0, 1.0, 0.0, 1.0)
            .and_then(|window| window.with_border(0.0))
            .expect("window");
        let trace = [Location::new(5.0, 5.0, 0.0), Location::new(0.5, 0.5, 0.0)];
        assert!(window.contains_any(&trace));
        assert!(!window.contains_any(&trace[..1]));
    }

    #[test]
    fn inverted_window_is_a_configuration_error() {
        let error = GeographicWindow::new(5.0, 1.0, 0.0, 1.0).expect_err("inverted");
        assert_eq!(error.category(), NshmpErrorCategory::ConfigurationError);
        let error = GeographicWindow::unbounded()
            .with_border(-1.0)
            .expect_err("negative border");
        assert_eq!(error.placeholder(), "CONFIG.WINDOW");
    }

    #[test]
    fn unbounded_window_accepts_extreme_locations() {
        let window = GeographicWindow::unbounded();
        assert!(window.contains(&Location::new(-90.0, 180.0, 0.0)));
        assert!(window.contains(&Location::new(90.0, -180.0, 0.0)));
    }

    #[test]
    fn tectonic_region_parses_flexible_spelling() {
        assert_eq!(
            "Active-Shallow".parse::<TectonicRegion>().expect("region"),
            TectonicRegion::ActiveShallow
        );
        assert_eq!(
            TectonicRegion::SubductionInterface.to_string(),
            "subduction_interface"
        );
        assert!("mantle".parse::<TectonicRegion>().is_err());
    }
}
