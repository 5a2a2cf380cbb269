//! Gridded-seismicity files: one point source per non-zero cell of a binary
//! rate grid, with optional per-cell b-value, maximum-magnitude and taper
//! grids.

use super::header::GridAxis;
use super::{LoadReport, LoadedSources, origin_label, reject_source};
use crate::common::config::SourceLoadSettings;
use crate::common::constants::{
    DEFAULT_MAG_BIN_WIDTH, GRID_NORMAL_DIP, GRID_REVERSE_DIP, GRID_STRIKE_SLIP_DIP,
    MASKED_CELL_RATE, RUPTURE_TOP_MAX_MAGNITUDE, RUPTURE_TOP_MIN_MAGNITUDE,
    RUPTURE_TOP_SPLIT_MAGNITUDE, TAPER_MAGNITUDE_MAX, TAPER_MAGNITUDE_MIN,
    TAPER_MAGNITUDE_SENTINEL,
};
use crate::domain::{
    FocalMechanism, Location, MechanismMfd, NshmpError, NshmpResult, PointSourceGeometry,
    SourceGeometry, SourceRecord,
};
use crate::io::{BinaryGridCache, GridValues, LineReader, Record, read_source_text};
use crate::mfd::{
    IncrementalMfd, MagnitudeConversion, apply_magnitude_taper, grid_centered_bins,
    gutenberg_richter_by_moment_rate, sum_moment_conserving, total_moment_rate,
};
use crate::numerics::PiecewiseLinear;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub location: Location,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SiteSpecification {
    Grid {
        latitudes: GridAxis,
        longitudes: GridAxis,
    },
    Stations(Vec<Station>),
}

/// Depth to top of rupture with its weights below and above M6.5.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuptureTopBranch {
    pub depth: f64,
    pub weight_below: f64,
    pub weight_above: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultingStyle {
    StrikeSlip,
    Reverse,
    Normal,
}

impl FaultingStyle {
    pub const ALL: [Self; 3] = [Self::StrikeSlip, Self::Reverse, Self::Normal];

    pub fn mechanism(self, strike: f64) -> FocalMechanism {
        let (rake, dip) = match self {
            Self::StrikeSlip => (0.0, GRID_STRIKE_SLIP_DIP),
            Self::Reverse => (90.0, GRID_REVERSE_DIP),
            Self::Normal => (-90.0, GRID_NORMAL_DIP),
        };
        FocalMechanism { strike, dip, rake }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxMagnitudeMode {
    /// `maxmat = 1`: the grid value replaces the file maximum.
    Grid,
    /// `maxmat = -1`: the smaller of the file and grid values.
    CappedByFile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaperSpec {
    pub magnitude: f64,
    pub weights_path: PathBuf,
}

/// Header of a grid file with its binary-grid references resolved against
/// the directory of the file.
#[derive(Debug, Clone, PartialEq)]
pub struct GridFileSpec {
    pub sites: SiteSpecification,
    pub vs30: f64,
    pub basin_depth: f64,
    pub rupture_top: Vec<RuptureTopBranch>,
    /// Strike-slip, reverse and normal weights.
    pub style_weights: [f64; 3],
    pub distance_increment: f64,
    pub max_distance: f64,
    pub source_latitudes: GridAxis,
    pub source_longitudes: GridAxis,
    pub b_value: f64,
    pub min_magnitude: f64,
    pub max_magnitude: f64,
    pub bin_width: f64,
    pub reference_magnitude: f64,
    pub finite_fault_code: i32,
    pub b_value_grid: Option<PathBuf>,
    pub max_magnitude_grid: Option<(MaxMagnitudeMode, PathBuf)>,
    pub taper: Option<TaperSpec>,
    pub rate_grid: PathBuf,
    pub rate_years: f64,
    pub cumulative_rates: bool,
    pub strike: Option<f64>,
}

impl GridFileSpec {
    pub fn taper_magnitude(&self) -> f64 {
        self.taper
            .as_ref()
            .map_or(TAPER_MAGNITUDE_SENTINEL, |taper| taper.magnitude)
    }

    pub fn magnitude_conversion(&self) -> MagnitudeConversion {
        MagnitudeConversion::from_finite_fault_code(self.finite_fault_code)
    }

    /// Weighted mean rupture-top depths below and at or above M6.5.
    pub fn mean_rupture_tops(&self) -> (f64, f64) {
        self.rupture_top.iter().fold((0.0, 0.0), |(below, above), branch| {
            (
                below + branch.weight_below * branch.depth,
                above + branch.weight_above * branch.depth,
            )
        })
    }

    /// Top-of-rupture depth against magnitude from M6.0 to M10.0, sampled at
    /// the file bin width.
    pub fn rupture_top_function(&self) -> NshmpResult<PiecewiseLinear> {
        let (below, above) = self.mean_rupture_tops();
        let count = ((RUPTURE_TOP_MAX_MAGNITUDE - RUPTURE_TOP_MIN_MAGNITUDE) / DEFAULT_MAG_BIN_WIDTH
            + 1.0) as usize;
        let (xs, ys) = (0..count)
            .map(|index| {
                let magnitude = RUPTURE_TOP_MIN_MAGNITUDE + index as f64 * self.bin_width;
                let depth = if magnitude < RUPTURE_TOP_SPLIT_MAGNITUDE {
                    below
                } else {
                    above
                };
                (magnitude, depth)
            })
            .unzip();
        PiecewiseLinear::new(xs, ys).ok_or_else(|| {
            NshmpError::configuration(
                "CONFIG.GRID_BIN_WIDTH",
                format!(
                    "magnitude bin width {} cannot sample the rupture-top function",
                    self.bin_width
                ),
            )
        })
    }
}

pub fn read_grid_file_spec(
    reader: &mut LineReader<'_>,
    base_dir: &Path,
) -> NshmpResult<GridFileSpec> {
    let mut record = reader.next_record("site specification")?;
    let site_code = record.next_i32("site specification code")?;
    let sites = if site_code == 0 {
        SiteSpecification::Grid {
            latitudes: GridAxis::read(&mut reader.next_record("site latitude grid")?, "site latitude")?,
            longitudes: GridAxis::read(
                &mut reader.next_record("site longitude grid")?,
                "site longitude",
            )?,
        }
    } else {
        let count = usize::try_from(site_code).map_err(|_| {
            record.error(
                "FORMAT.NEGATIVE_COUNT",
                format!("station count must be non-negative, got {site_code}"),
            )
        })?;
        let stations = (0..count)
            .map(|_| {
                let mut record = reader.next_record("station")?;
                let latitude = record.next_f64("station latitude")?;
                let longitude = record.next_f64("station longitude")?;
                let name = record.next_text("station name")?.to_string();
                Ok(Station {
                    location: Location::new(latitude, longitude, 0.0),
                    name,
                })
            })
            .collect::<NshmpResult<Vec<_>>>()?;
        SiteSpecification::Stations(stations)
    };

    let mut record = reader.next_record("site condition line")?;
    let vs30 = record.next_f64("vs30")?;
    let basin_depth = record.next_f64("basin depth")?;

    let mut record = reader.next_record("rupture-top distribution")?;
    let depth_count = record.next_count("rupture-top depth count")?;
    let rupture_top = (0..depth_count)
        .map(|_| {
            Ok(RuptureTopBranch {
                depth: record.next_f64("rupture-top depth")?,
                weight_below: record.next_f64("weight below M6.5")?,
                weight_above: record.next_f64("weight at or above M6.5")?,
            })
        })
        .collect::<NshmpResult<Vec<_>>>()?;

    let mut record = reader.next_record("faulting style weights")?;
    let style_weights = [
        record.next_f64("strike-slip weight")?,
        record.next_f64("reverse weight")?,
        record.next_f64("normal weight")?,
    ];
    if style_weights.iter().all(|weight| *weight <= 0.0) {
        return Err(NshmpError::configuration(
            "CONFIG.MECHANISM_WEIGHTS",
            format!(
                "{}:{}: at least one faulting style needs a positive weight",
                reader.origin(),
                record.line_number()
            ),
        ));
    }

    let mut record = reader.next_record("distance increment line")?;
    let distance_increment = record.next_f64("distance increment")?;
    let max_distance = record.next_f64("maximum distance")?;

    let source_latitudes =
        GridAxis::read(&mut reader.next_record("source latitude grid")?, "source latitude")?;
    let source_longitudes =
        GridAxis::read(&mut reader.next_record("source longitude grid")?, "source longitude")?;

    let mut record = reader.next_record("magnitude recurrence line")?;
    let b_value = record.next_f64("b-value")?;
    let min_magnitude = record.next_f64("minimum magnitude")?;
    let max_magnitude = record.next_f64("maximum magnitude")?;
    let bin_width = record.next_f64("magnitude bin width")?;
    let reference_magnitude = record.next_f64("reference magnitude")?;

    let mut record = reader.next_record("grid option line")?;
    let finite_fault_code = record.next_i32("iflt")?;
    let b_grid_code = record.next_i32("ibmat")?;
    let max_grid_code = record.next_i32("maxmat")?;
    let taper_magnitude = if record.remaining() > 0 {
        Some(record.next_f64("taper magnitude")?)
    } else {
        None
    };

    let b_value_grid = match b_grid_code {
        0 => None,
        1 => Some(read_grid_path(reader, base_dir, "b-value grid file")?),
        other => return Err(grid_option_error(&record, "ibmat", other)),
    };
    let max_magnitude_grid = match max_grid_code {
        0 => None,
        1 => Some((
            MaxMagnitudeMode::Grid,
            read_grid_path(reader, base_dir, "maximum magnitude grid file")?,
        )),
        -1 => Some((
            MaxMagnitudeMode::CappedByFile,
            read_grid_path(reader, base_dir, "maximum magnitude grid file")?,
        )),
        other => return Err(grid_option_error(&record, "maxmat", other)),
    };
    let taper = match taper_magnitude {
        Some(magnitude) if magnitude > TAPER_MAGNITUDE_MIN && magnitude < TAPER_MAGNITUDE_MAX => {
            Some(TaperSpec {
                magnitude,
                weights_path: read_grid_path(reader, base_dir, "taper weight grid file")?,
            })
        }
        _ => None,
    };
    let rate_grid = read_grid_path(reader, base_dir, "rate grid file")?;

    let mut record = reader.next_record("rate normalization line")?;
    let rate_years = record.next_f64("rate years")?;
    let cumulative_rates = record.next_i32("rate conversion flag")? == 1;

    let strike = if finite_fault_code == 2 {
        Some(reader.next_record("strike line")?.next_f64("strike")?)
    } else {
        None
    };

    Ok(GridFileSpec {
        sites,
        vs30,
        basin_depth,
        rupture_top,
        style_weights,
        distance_increment,
        max_distance,
        source_latitudes,
        source_longitudes,
        b_value,
        min_magnitude,
        max_magnitude,
        bin_width,
        reference_magnitude,
        finite_fault_code,
        b_value_grid,
        max_magnitude_grid,
        taper,
        rate_grid,
        rate_years,
        cumulative_rates,
        strike,
    })
}

fn grid_option_error(record: &Record<'_>, option: &str, value: i32) -> NshmpError {
    NshmpError::configuration(
        "CONFIG.GRID_OPTION",
        format!(
            "line {}: {option} = {value} is not a supported grid option",
            record.line_number()
        ),
    )
}

fn read_grid_path(
    reader: &mut LineReader<'_>,
    base_dir: &Path,
    expected: &str,
) -> NshmpResult<PathBuf> {
    let mut record = reader.next_record(expected)?;
    Ok(base_dir.join(record.next_text(expected)?))
}

/// Binary grids of one file, aligned cell for cell with the rate grid.
struct CellGrids {
    rates: GridValues,
    b_values: Option<GridValues>,
    max_magnitudes: Option<GridValues>,
    taper_weights: Option<GridValues>,
}

impl CellGrids {
    fn load(
        spec: &GridFileSpec,
        settings: &SourceLoadSettings,
        cache: &BinaryGridCache,
    ) -> NshmpResult<Self> {
        let order = settings.byte_order;
        let rates = cache.load(&spec.rate_grid, order)?;
        let companion = |path: &Path| -> NshmpResult<GridValues> {
            let values = cache.load(path, order)?;
            if values.len() < rates.len() {
                return Err(NshmpError::file_format(
                    "FORMAT.GRID_LENGTH",
                    format!(
                        "grid '{}' has {} cells but the rate grid has {}",
                        path.display(),
                        values.len(),
                        rates.len()
                    ),
                ));
            }
            Ok(values)
        };
        let b_values = spec.b_value_grid.as_deref().map(companion).transpose()?;
        let max_magnitudes = spec
            .max_magnitude_grid
            .as_ref()
            .map(|(_, path)| companion(path.as_path()))
            .transpose()?;
        let taper_weights = spec
            .taper
            .as_ref()
            .map(|taper| companion(taper.weights_path.as_path()))
            .transpose()?;
        Ok(Self {
            rates,
            b_values,
            max_magnitudes,
            taper_weights,
        })
    }
}

/// Parameters of one cell after the legacy substitutions.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CellParameters {
    rate: f64,
    b_value: f64,
    max_magnitude: f64,
}

fn cumulative_to_incremental(rate: f64, b_value: f64, bin_width: f64) -> f64 {
    let half = b_value * bin_width / 2.0;
    rate * (10.0_f64.powf(half) - 10.0_f64.powf(-half))
}

fn cell_parameters(spec: &GridFileSpec, grids: &CellGrids, index: usize, rate: f64) -> CellParameters {
    let mut rate = rate;
    let b_value = match &grids.b_values {
        Some(values) if values[index] != 0.0 => values[index],
        _ => spec.b_value,
    };
    let max_magnitude = match (&spec.max_magnitude_grid, &grids.max_magnitudes) {
        (Some((mode, _)), Some(values)) => {
            let cell = values[index];
            if cell < 0.0 {
                rate = MASKED_CELL_RATE;
            }
            let cell = if cell <= 0.0 { spec.max_magnitude } else { cell };
            match mode {
                MaxMagnitudeMode::Grid => cell,
                MaxMagnitudeMode::CappedByFile => spec.max_magnitude.min(cell),
            }
        }
        _ => spec.max_magnitude,
    };
    CellParameters {
        rate,
        b_value,
        max_magnitude,
    }
}

fn cell_mechanisms(
    spec: &GridFileSpec,
    grids: &CellGrids,
    index: usize,
    cell: CellParameters,
    file_weight: f64,
) -> NshmpResult<Vec<MechanismMfd>> {
    let bins = grid_centered_bins(spec.min_magnitude, cell.max_magnitude, spec.bin_width)?;
    let a_value = (cell.rate / spec.rate_years).log10();
    let moment_rate = total_moment_rate(
        bins.min_magnitude,
        bins.count,
        bins.delta,
        a_value,
        cell.b_value,
    );
    let conversion = spec.magnitude_conversion();
    let strike = spec.strike.unwrap_or(0.0);

    let mut mechanisms = Vec::new();
    for (style, weight) in FaultingStyle::ALL.into_iter().zip(spec.style_weights) {
        if weight <= 0.0 {
            continue;
        }
        let mut mfd = gutenberg_richter_by_moment_rate(
            bins.min_magnitude,
            bins.count,
            bins.delta,
            cell.b_value,
            file_weight * weight * moment_rate,
        )?;
        if let (Some(taper), Some(weights)) = (&spec.taper, &grids.taper_weights) {
            apply_magnitude_taper(&mut mfd, taper.magnitude, weights[index]);
        }
        let mfd = conversion.apply(&mfd)?;
        mechanisms.push(MechanismMfd {
            mechanism: style.mechanism(strike),
            mfd,
        });
    }
    Ok(mechanisms)
}

pub fn load_grid_sources(
    path: impl AsRef<Path>,
    settings: &SourceLoadSettings,
    cache: &BinaryGridCache,
) -> NshmpResult<LoadedSources> {
    let path = path.as_ref();
    let text = read_source_text(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let loaded = parse_grid_sources(&origin_label(path), &text, base_dir, settings, cache)?;
    info!(
        path = %path.display(),
        kept = loaded.report.included_sources,
        outside_window = loaded.report.outside_window,
        zero_rate_cells = loaded.report.zero_rate_cells,
        "loaded grid source file"
    );
    Ok(loaded)
}

pub fn parse_grid_sources(
    origin: &str,
    text: &str,
    base_dir: &Path,
    settings: &SourceLoadSettings,
    cache: &BinaryGridCache,
) -> NshmpResult<LoadedSources> {
    settings.validate()?;
    let mut reader = LineReader::new(origin, text);
    let spec = read_grid_file_spec(&mut reader, base_dir)?;
    let grids = CellGrids::load(&spec, settings, cache)?;

    let lon_count = spec.source_longitudes.node_count()?;
    let declared_cells = spec
        .source_latitudes
        .node_count()?
        .checked_mul(lon_count)
        .ok_or_else(|| {
            NshmpError::file_format(
                "FORMAT.GRID_AXIS",
                format!("{origin}: source grid declares more cells than can be addressed"),
            )
        })?;
    if declared_cells != grids.rates.len() {
        warn!(
            declared_cells,
            grid_cells = grids.rates.len(),
            "rate grid length differs from the source grid; using the rate grid length"
        );
    }
    if lon_count == 0 {
        return Err(NshmpError::configuration(
            "CONFIG.SOURCE_GRID",
            format!("{origin}: source longitude grid has no nodes"),
        ));
    }

    let rupture_top = spec.rupture_top_function()?;
    let (hypocentral_depth, _) = spec.mean_rupture_tops();

    let mut sources = Vec::new();
    let mut report = LoadReport::default();
    for (index, &stored) in grids.rates.iter().enumerate() {
        let rate = if spec.cumulative_rates && stored != 0.0 {
            cumulative_to_incremental(stored, spec.b_value, spec.bin_width)
        } else {
            stored
        };
        if rate == 0.0 {
            report.zero_rate_cells += 1;
            continue;
        }
        report.declared_sources += 1;

        let row = index / lon_count;
        let column = index - row * lon_count;
        let location = Location::new(
            spec.source_latitudes.max - row as f64 * spec.source_latitudes.step,
            spec.source_longitudes.min + column as f64 * spec.source_longitudes.step,
            0.0,
        );
        if !settings.window.contains(&location) {
            report.outside_window += 1;
            continue;
        }

        let cell = cell_parameters(&spec, &grids, index, rate);
        let mechanisms = cell_mechanisms(&spec, &grids, index, cell, settings.file_weight);
        let Some(mechanisms) = reject_source(mechanisms, origin, index, &mut report)? else {
            continue;
        };
        let mfds: Vec<IncrementalMfd> = mechanisms.iter().map(|entry| entry.mfd.clone()).collect();
        let total = sum_moment_conserving(&mfds)?;

        let geometry = PointSourceGeometry {
            location,
            average_hypocentral_depth: hypocentral_depth,
            rupture_top_vs_magnitude: rupture_top.clone(),
            mechanisms,
        };
        let source = SourceRecord::new(
            sources.len().to_string(),
            String::new(),
            settings.tectonic_region,
            total,
            SourceGeometry::Point(geometry),
        )?;
        debug!(
            id = %source.id,
            latitude = location.latitude,
            longitude = location.longitude,
            total_rate = source.total_rate(),
            "included grid source"
        );
        sources.push(source);
    }

    report.included_sources = sources.len();
    Ok(LoadedSources { sources, report })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{FaultingStyle, parse_grid_sources};
    use crate::common::config::SourceLoadSettings;
    use crate::domain::{GeographicWindow, NshmpErrorCategory, SourceGeometry};
    use crate::io::BinaryGridCache;
    use crate::mfd::{grid_centered_bins, total_moment_rate};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    pub(crate) fn write_grid(path: &Path, values: &[f32]) {
        let bytes: Vec<u8> = values.iter().flat_map(|value| value.to_be_bytes()).collect();
        fs::write(path, bytes).expect("grid file written");
    }

    /// 2 x 3 source grid at 60..61 N, -150..-148 E with the given option
    /// line and optional extra lines before the rate grid line.
    pub(crate) fn grid_text(options: &str, extra: &str, weights: &str, a_line: &str) -> String {
        format!(
            "0\n\
             50.0 72.0 0.5\n\
             -170.0 -130.0 0.5\n\
             760.0 2.0\n\
             2 5.0 1.0 0.0 10.0 0.0 1.0\n\
             {weights}\n\
             10.0 1000.0\n\
             60.0 61.0 1.0\n\
             -150.0 -148.0 1.0\n\
             1.0 5.0 7.0 0.1 5.0\n\
             {options}\n\
             {extra}\
             agrid.bin\n\
             {a_line}\n"
        )
    }

    #[test]
    fn zero_rate_cells_are_skipped_and_coordinates_run_from_the_north_west() {
        let temp = TempDir::new().expect("tempdir should be created");
        write_grid(&temp.path().join("agrid.bin"), &[0.01, 0.0, 0.0, 0.0, 0.0, 0.02]);
        let text = grid_text("1 0 0", "", "1.0 0.0 0.0", "1.0 0");

        let loaded = parse_grid_sources(
            "ak.grid",
            &text,
            temp.path(),
            &SourceLoadSettings::default(),
            &BinaryGridCache::new(),
        )
        .expect("grid file should parse");

        assert_eq!(loaded.report.zero_rate_cells, 4);
        assert_eq!(loaded.sources.len(), 2);
        assert_eq!(loaded.sources[0].id, "0");
        assert_eq!(loaded.sources[1].id, "1");

        let SourceGeometry::Point(first) = &loaded.sources[0].geometry else {
            panic!("expected point geometry");
        };
        assert_eq!(first.location.latitude, 61.0);
        assert_eq!(first.location.longitude, -150.0);
        assert_eq!(first.average_hypocentral_depth, 5.0);
        assert_eq!(first.rupture_top_vs_magnitude.len(), 41);
        assert_eq!(first.rupture_top_vs_magnitude.interpolate(6.2), 5.0);
        assert_eq!(first.rupture_top_vs_magnitude.interpolate(7.0), 10.0);
        assert_eq!(first.mechanisms.len(), 1);
        assert_eq!(first.mechanisms[0].mechanism, FaultingStyle::StrikeSlip.mechanism(0.0));

        let SourceGeometry::Point(last) = &loaded.sources[1].geometry else {
            panic!("expected point geometry");
        };
        assert_eq!(last.location.latitude, 60.0);
        assert_eq!(last.location.longitude, -148.0);

        let bins = grid_centered_bins(5.0, 7.0, 0.1).expect("bins");
        assert_eq!(loaded.sources[0].mfd.len(), bins.count);
        assert!((loaded.sources[0].mfd.min_magnitude() - bins.min_magnitude).abs() < 1.0e-12);

        let a_value = (0.01_f32 as f64).log10();
        let expected = total_moment_rate(5.05, 20, 0.1, a_value, 1.0);
        let relative = (loaded.sources[0].total_moment_rate() - expected).abs() / expected;
        assert!(relative < 1.0e-9, "relative moment error {relative}");
    }

    #[test]
    fn mechanism_weights_split_the_cell_moment_rate() {
        let temp = TempDir::new().expect("tempdir should be created");
        write_grid(&temp.path().join("agrid.bin"), &[0.01, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let text = grid_text("2 0 0", "", "0.5 0.25 0.25", "1.0 0\n30.0");

        let loaded = parse_grid_sources(
            "ak.grid",
            &text,
            temp.path(),
            &SourceLoadSettings::default(),
            &BinaryGridCache::new(),
        )
        .expect("grid file should parse");
        let SourceGeometry::Point(point) = &loaded.sources[0].geometry else {
            panic!("expected point geometry");
        };
        assert_eq!(point.mechanisms.len(), 3);
        assert_eq!(point.mechanisms[1].mechanism.dip, 50.0);
        assert_eq!(point.mechanisms[1].mechanism.rake, 90.0);
        assert_eq!(point.mechanisms[2].mechanism.strike, 30.0);
        let ratio = point.mechanisms[0].mfd.total_moment_rate()
            / point.mechanisms[1].mfd.total_moment_rate();
        assert!((ratio - 2.0).abs() < 1.0e-9);
    }

    #[test]
    fn companion_grids_override_cell_parameters() {
        let temp = TempDir::new().expect("tempdir should be created");
        write_grid(&temp.path().join("agrid.bin"), &[0.01, 0.01, 0.01, 0.0, 0.0, 0.0]);
        write_grid(&temp.path().join("bgrid.bin"), &[0.0, 0.8, 1.0, 1.0, 1.0, 1.0]);
        write_grid(&temp.path().join("mmax.bin"), &[6.0, 0.0, -1.0, 0.0, 0.0, 0.0]);
        let text = grid_text("1 1 1", "bgrid.bin\nmmax.bin\n", "1.0 0.0 0.0", "1.0 0");
        let settings = SourceLoadSettings::default();
        let cache = BinaryGridCache::new();

        let loaded = parse_grid_sources("ak.grid", &text, temp.path(), &settings, &cache)
            .expect("grid file should parse");
        assert_eq!(loaded.sources.len(), 3);
        assert_eq!(cache.len(), 3);

        // b falls back to the file value; mmax from the grid.
        assert_eq!(loaded.sources[0].mfd.len(), 10);
        assert!((loaded.sources[0].mfd.max_magnitude() - 5.95).abs() < 1.0e-9);
        // mmax 0 falls back to the file maximum.
        assert_eq!(loaded.sources[1].mfd.len(), 20);
        // negative mmax masks the cell rate.
        assert!(loaded.sources[2].total_rate() < 1.0e-9);
    }

    #[test]
    fn short_companion_grid_is_a_format_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        write_grid(&temp.path().join("agrid.bin"), &[0.01, 0.0, 0.0, 0.0, 0.0, 0.0]);
        write_grid(&temp.path().join("bgrid.bin"), &[1.0, 1.0]);
        let text = grid_text("1 1 0", "bgrid.bin\n", "1.0 0.0 0.0", "1.0 0");
        let error = parse_grid_sources(
            "ak.grid",
            &text,
            temp.path(),
            &SourceLoadSettings::default(),
            &BinaryGridCache::new(),
        )
        .expect_err("b grid is too short");
        assert_eq!(error.category(), NshmpErrorCategory::FileFormatError);
        assert_eq!(error.placeholder(), "FORMAT.GRID_LENGTH");
    }

    #[test]
    fn degenerate_source_grid_step_is_a_format_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        write_grid(&temp.path().join("agrid.bin"), &[0.01, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let text = grid_text("1 0 0", "", "1.0 0.0 0.0", "1.0 0")
            .replace("-150.0 -148.0 1.0", "-150.0 -148.0 0.0");
        let error = parse_grid_sources(
            "ak.grid",
            &text,
            temp.path(),
            &SourceLoadSettings::default(),
            &BinaryGridCache::new(),
        )
        .expect_err("zero longitude step");
        assert_eq!(error.category(), NshmpErrorCategory::FileFormatError);
        assert_eq!(error.placeholder(), "FORMAT.GRID_AXIS");
    }

    #[test]
    fn cell_with_inverted_magnitude_bounds_is_rejected_alone() {
        let temp = TempDir::new().expect("tempdir should be created");
        write_grid(&temp.path().join("agrid.bin"), &[0.01, 0.01, 0.0, 0.0, 0.0, 0.0]);
        write_grid(&temp.path().join("mmax.bin"), &[4.0, 6.0, 0.0, 0.0, 0.0, 0.0]);
        let text = grid_text("1 0 1", "mmax.bin\n", "1.0 0.0 0.0", "1.0 0");

        let loaded = parse_grid_sources(
            "ak.grid",
            &text,
            temp.path(),
            &SourceLoadSettings::default(),
            &BinaryGridCache::new(),
        )
        .expect("one bad cell should not abort the file");
        assert_eq!(loaded.report.declared_sources, 2);
        assert_eq!(loaded.report.rejected_sources, 1);
        assert_eq!(loaded.sources.len(), 1);
        assert_eq!(loaded.sources[0].id, "0");
        let SourceGeometry::Point(point) = &loaded.sources[0].geometry else {
            panic!("expected point geometry");
        };
        assert_eq!(point.location.longitude, -149.0);
        assert!((loaded.sources[0].mfd.max_magnitude() - 5.95).abs() < 1.0e-9);
    }

    #[test]
    fn window_filters_cells_and_ids_stay_dense() {
        let temp = TempDir::new().expect("tempdir should be created");
        write_grid(&temp.path().join("agrid.bin"), &[0.01, 0.01, 0.01, 0.01, 0.01, 0.01]);
        let text = grid_text("1 0 0", "", "1.0 0.0 0.0", "1.0 0");
        let settings = SourceLoadSettings {
            window: GeographicWindow::new(61.0, 61.0, -150.0, -149.0)
                .and_then(|window| window.with_border(0.0))
                .expect("window"),
            ..SourceLoadSettings::default()
        };
        let loaded = parse_grid_sources("ak.grid", &text, temp.path(), &settings, &BinaryGridCache::new())
            .expect("grid file should parse");
        assert_eq!(loaded.report.outside_window, 4);
        let ids: Vec<&str> = loaded.sources.iter().map(|source| source.id.as_str()).collect();
        assert_eq!(ids, ["0", "1"]);
    }

    #[test]
    fn taper_and_cumulative_conversion_reduce_rates() {
        let temp = TempDir::new().expect("tempdir should be created");
        write_grid(&temp.path().join("agrid.bin"), &[0.01, 0.0, 0.0, 0.0, 0.0, 0.0]);
        write_grid(&temp.path().join("taper.bin"), &[0.5, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let plain_text = grid_text("1 0 0", "", "1.0 0.0 0.0", "1.0 0");
        let tapered_text = grid_text("1 0 0 6.0", "taper.bin\n", "1.0 0.0 0.0", "1.0 0");
        let cumulative_text = grid_text("1 0 0", "", "1.0 0.0 0.0", "1.0 1");
        let settings = SourceLoadSettings::default();
        let cache = BinaryGridCache::new();

        let parse = |text: &str| {
            parse_grid_sources("ak.grid", text, temp.path(), &settings, &cache)
                .expect("grid file should parse")
        };
        let plain = parse(&plain_text);
        let tapered = parse(&tapered_text);
        let cumulative = parse(&cumulative_text);

        let plain_mfd = &plain.sources[0].mfd;
        let tapered_mfd = &tapered.sources[0].mfd;
        for index in 0..plain_mfd.len() {
            let expected = if plain_mfd.magnitude(index) >= 6.0 {
                0.5 * plain_mfd.rate(index)
            } else {
                plain_mfd.rate(index)
            };
            assert!((tapered_mfd.rate(index) - expected).abs() <= 1.0e-12 * expected.max(1.0e-30));
        }

        let factor = 10.0_f64.powf(0.05) - 10.0_f64.powf(-0.05);
        let ratio = cumulative.sources[0].total_rate() / plain.sources[0].total_rate();
        assert!((ratio - factor).abs() < 1.0e-9);
    }
}
