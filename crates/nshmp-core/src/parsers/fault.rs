use super::header::{FaultFileHeader, read_fault_header};
use super::{LoadReport, LoadedSources, origin_label, reject_source};
use crate::common::config::SourceLoadSettings;
use crate::domain::{
    FaultSourceGeometry, Location, NshmpError, NshmpResult, SourceGeometry, SourceRecord,
};
use crate::io::{LineReader, Record, read_source_text};
use crate::mfd::{MagnitudeModel, build_source_mfd};
use std::path::Path;
use tracing::{debug, info};

/// Type line and magnitude line(s) of one fault or subduction source. The
/// type code selects the magnitude-model variant.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    pub type_code: i32,
    pub rake: f64,
    pub name: String,
    pub magnitude_model: MagnitudeModel,
}

pub fn rake_for_mechanism(record: &Record<'_>, code: i32) -> NshmpResult<f64> {
    match code {
        1 => Ok(0.0),
        2 => Ok(90.0),
        3 => Ok(-90.0),
        other => Err(NshmpError::configuration(
            "CONFIG.MECHANISM_CODE",
            format!(
                "line {}: focal mechanism code {other} is not one of 1 (strike-slip), 2 (reverse), 3 (normal)",
                record.line_number()
            ),
        )),
    }
}

/// Reads the descriptor starting at `type_line`, consuming the magnitude
/// line that follows it. Both lines are consumed before any configuration
/// error is raised, so the caller can skip the rest of the source.
pub(crate) fn read_source_descriptor<'a>(
    mut type_line: Record<'a>,
    reader: &mut LineReader<'a>,
) -> NshmpResult<SourceDescriptor> {
    let type_code = type_line.next_i32("source type code")?;
    let mechanism = type_line.next_i32("focal mechanism code")?;
    let name = type_line.rest_text();

    let mut line = reader.next_record("magnitude recurrence line")?;
    let rake = rake_for_mechanism(&type_line, mechanism)?;
    let magnitude_model = match type_code {
        1 => MagnitudeModel::Characteristic {
            magnitude: line.next_f64("characteristic magnitude")?,
            rate: line.next_f64("characteristic rate")?,
        },
        2 => match line.token_count() {
            5 => MagnitudeModel::GutenbergRichter {
                a_value: line.next_f64("a-value")?,
                b_value: line.next_f64("b-value")?,
                min_magnitude: line.next_f64("minimum magnitude")?,
                max_magnitude: line.next_f64("maximum magnitude")?,
                bin_width: line.next_f64("magnitude bin width")?,
            },
            4 => MagnitudeModel::GutenbergRichterTraceA {
                b_value: line.next_f64("b-value")?,
                min_magnitude: line.next_f64("minimum magnitude")?,
                max_magnitude: line.next_f64("maximum magnitude")?,
                bin_width: line.next_f64("magnitude bin width")?,
            },
            count => {
                return Err(line.error(
                    "FORMAT.MAGNITUDE_LINE",
                    format!("GR source '{name}' needs 4 or 5 tokens, found {count}"),
                ));
            }
        },
        -2 => {
            if line.token_count() != 6 {
                return Err(line.error(
                    "FORMAT.MAGNITUDE_LINE",
                    format!(
                        "dual b-value source '{name}' needs 6 tokens, found {}",
                        line.token_count()
                    ),
                ));
            }
            MagnitudeModel::DualBValue {
                a_value: line.next_f64("a-value")?,
                b_value: line.next_f64("b-value")?,
                min_magnitude: line.next_f64("minimum magnitude")?,
                max_magnitude: line.next_f64("maximum magnitude")?,
                bin_width: line.next_f64("magnitude bin width")?,
                weight: line.next_f64("magnitude model weight")?,
            }
        }
        other => {
            return Err(NshmpError::configuration(
                "CONFIG.SOURCE_TYPE",
                format!(
                    "{}:{}: source type code {other} is not one of 1, 2, -2",
                    reader.origin(),
                    type_line.line_number()
                ),
            ));
        }
    };

    Ok(SourceDescriptor {
        type_code,
        rake,
        name,
        magnitude_model,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FaultPlane {
    dip: f64,
    width: f64,
    top_depth: f64,
}

impl FaultPlane {
    fn lower_seismogenic_depth(&self) -> f64 {
        self.top_depth + self.width * self.dip.to_radians().sin()
    }
}

pub fn load_fault_sources(
    path: impl AsRef<Path>,
    settings: &SourceLoadSettings,
) -> NshmpResult<LoadedSources> {
    let path = path.as_ref();
    let text = read_source_text(path)?;
    let loaded = parse_fault_sources(&origin_label(path), &text, settings)?;
    info!(
        path = %path.display(),
        kept = loaded.report.included_sources,
        outside_window = loaded.report.outside_window,
        "loaded fault source file"
    );
    Ok(loaded)
}

pub fn parse_fault_sources(
    origin: &str,
    text: &str,
    settings: &SourceLoadSettings,
) -> NshmpResult<LoadedSources> {
    settings.validate()?;
    let mut reader = LineReader::new(origin, text);
    let header = read_fault_header(&mut reader)?;

    let mut sources = Vec::new();
    let mut report = LoadReport::default();
    while let Some(type_line) = reader.try_next_record() {
        report.declared_sources += 1;
        let source_index = report.declared_sources;
        let descriptor = reject_source(
            read_source_descriptor(type_line, &mut reader),
            origin,
            source_index,
            &mut report,
        )?;
        let with_a_values = descriptor
            .as_ref()
            .is_some_and(|descriptor| descriptor.magnitude_model.needs_vertex_a_values());

        let mut record = reader.next_record("fault plane line")?;
        let mut plane = FaultPlane {
            dip: record.next_f64("dip")?,
            width: record.next_f64("down-dip width")?,
            top_depth: record.next_f64("depth to top")?,
        };
        let (mut trace, vertex_a_values) =
            read_fault_trace(&mut reader, with_a_values, plane.top_depth)?;
        let Some(descriptor) = descriptor else {
            continue;
        };

        if plane.dip < 0.0 {
            plane.dip = plane.dip.abs();
            trace.reverse();
        }

        if !settings.window.contains_any(&trace) {
            report.outside_window += 1;
            continue;
        }

        let build = build_source_mfd(
            &descriptor.magnitude_model,
            &vertex_a_values,
            &header.epistemic,
            settings.file_weight,
        );
        let Some(build) = reject_source(build, origin, source_index, &mut report)? else {
            continue;
        };
        report.skipped_branches += build.skipped_branches;

        let id = (sources.len() + 1).to_string();
        let geometry = FaultSourceGeometry {
            trace,
            dip: plane.dip,
            rake: descriptor.rake,
            upper_seismogenic_depth: plane.top_depth,
            lower_seismogenic_depth: plane.lower_seismogenic_depth(),
            floating_ruptures: descriptor.magnitude_model.floats_ruptures(),
        };
        let source = SourceRecord::new(
            id,
            descriptor.name,
            settings.tectonic_region,
            build.mfd,
            SourceGeometry::Fault(geometry),
        )?;
        debug!(
            id = %source.id,
            name = %source.name,
            total_rate = source.total_rate(),
            "included fault source"
        );
        sources.push(source);
    }

    report.included_sources = sources.len();
    Ok(LoadedSources { sources, report })
}

fn read_fault_trace(
    reader: &mut LineReader<'_>,
    with_a_values: bool,
    top_depth: f64,
) -> NshmpResult<(Vec<Location>, Vec<f64>)> {
    let count = reader
        .next_record("trace point count")?
        .next_count("trace point count")?;
    let mut trace = Vec::with_capacity(count);
    let mut a_values = Vec::new();
    for _ in 0..count {
        let mut record = reader.next_record("trace point")?;
        let latitude = record.next_f64("latitude")?;
        let longitude = record.next_f64("longitude")?;
        if with_a_values {
            a_values.push(record.next_f64("vertex a-value")?);
        }
        trace.push(Location::new(latitude, longitude, top_depth));
    }
    Ok((trace, a_values))
}

/// Header accessor for callers that need the ground-motion block as well.
pub fn read_fault_file_header(path: impl AsRef<Path>) -> NshmpResult<FaultFileHeader> {
    let path = path.as_ref();
    let text = read_source_text(path)?;
    let origin = origin_label(path);
    let mut reader = LineReader::new(&origin, &text);
    read_fault_header(&mut reader)
}
