//! Subduction-interface files: the fault-file header followed by sources
//! described by their top and bottom edges.

use super::fault::read_source_descriptor;
use super::header::read_fault_header;
use super::{LoadReport, LoadedSources, origin_label, reject_source};
use crate::common::config::SourceLoadSettings;
use crate::domain::{
    Location, NshmpResult, SourceGeometry, SourceRecord, SubductionSourceGeometry,
};
use crate::io::{LineReader, read_source_text};
use crate::mfd::build_source_mfd;
use std::path::Path;
use tracing::{debug, info};

pub fn load_subduction_sources(
    path: impl AsRef<Path>,
    settings: &SourceLoadSettings,
) -> NshmpResult<LoadedSources> {
    let path = path.as_ref();
    let text = read_source_text(path)?;
    let loaded = parse_subduction_sources(&origin_label(path), &text, settings)?;
    info!(
        path = %path.display(),
        kept = loaded.report.included_sources,
        outside_window = loaded.report.outside_window,
        "loaded subduction source file"
    );
    Ok(loaded)
}

pub fn parse_subduction_sources(
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

        let (top_trace, vertex_a_values) = read_edge(&mut reader, "top edge", with_a_values)?;
        let (bottom_trace, _) = read_edge(&mut reader, "bottom edge", false)?;
        let Some(descriptor) = descriptor else {
            continue;
        };

        let included = settings.window.contains_any(&top_trace)
            || settings.window.contains_any(&bottom_trace);
        if !included {
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

        let geometry = SubductionSourceGeometry {
            top_trace,
            bottom_trace,
            rake: descriptor.rake,
            floating_ruptures: descriptor.magnitude_model.floats_ruptures(),
        };
        let source = SourceRecord::new(
            (sources.len() + 1).to_string(),
            descriptor.name,
            settings.tectonic_region,
            build.mfd,
            SourceGeometry::Subduction(geometry),
        )?;
        debug!(
            id = %source.id,
            name = %source.name,
            total_rate = source.total_rate(),
            "included subduction source"
        );
        sources.push(source);
    }

    report.included_sources = sources.len();
    Ok(LoadedSources { sources, report })
}

/// Vertex count line then `lat lon depth [a]` lines.
fn read_edge(
    reader: &mut LineReader<'_>,
    edge: &str,
    with_a_values: bool,
) -> NshmpResult<(Vec<Location>, Vec<f64>)> {
    let count = reader
        .next_record(&format!("{edge} vertex count"))?
        .next_count(&format!("{edge} vertex count"))?;
    let mut trace = Vec::with_capacity(count);
    let mut a_values = Vec::new();
    for _ in 0..count {
        let mut record = reader.next_record(&format!("{edge} vertex"))?;
        let latitude = record.next_f64("latitude")?;
        let longitude = record.next_f64("longitude")?;
        let depth = record.next_f64("depth")?;
        if with_a_values {
            a_values.push(record.next_f64("vertex a-value")?);
        }
        trace.push(Location::new(latitude, longitude, depth));
    }
    Ok((trace, a_values))
}

#[cfg(test)]
mod tests {
    use super::parse_subduction_sources;
    use crate::common::config::SourceLoadSettings;
    use crate::domain::{GeographicWindow, SourceGeometry, SourceKind, TectonicRegion};
    use crate::parsers::header::tests::header_text;

    fn interface_text() -> String {
        format!(
            "{}1 2 Aleutian megathrust\n\
             9.2 0.002\n\
             3\n\
             51.0 -178.0 5.0\n\
             52.0 -170.0 5.0\n\
             54.0 -160.0 5.0\n\
             2\n\
             52.5 -178.0 45.0\n\
             55.5 -160.0 45.0\n",
            header_text("0.0", "1.0", 0.0)
        )
    }

    #[test]
    fn interface_source_keeps_both_edges() {
        let settings = SourceLoadSettings {
            tectonic_region: TectonicRegion::SubductionInterface,
            ..SourceLoadSettings::default()
        };
        let loaded =
            parse_subduction_sources("ak.sub", &interface_text(), &settings).expect("parse");
        assert_eq!(loaded.sources.len(), 1);
        let source = &loaded.sources[0];
        assert_eq!(source.kind(), SourceKind::Subduction);
        assert_eq!(source.tectonic_region, TectonicRegion::SubductionInterface);
        assert_eq!(source.name, "Aleutian megathrust");
        assert!((source.total_rate() - 0.002).abs() < 1.0e-15);
        let SourceGeometry::Subduction(interface) = &source.geometry else {
            panic!("expected subduction geometry");
        };
        assert_eq!(interface.top_trace.len(), 3);
        assert_eq!(interface.bottom_trace[1].depth, 45.0);
        assert_eq!(interface.rake, 90.0);
        assert!(!interface.floating_ruptures);
    }

    #[test]
    fn bottom_edge_alone_can_place_the_source_in_the_window() {
        let settings = SourceLoadSettings {
            window: GeographicWindow::new(55.0, 56.0, -161.0, -159.0)
                .and_then(|window| window.with_border(0.0))
                .expect("window"),
            ..SourceLoadSettings::default()
        };
        let loaded =
            parse_subduction_sources("ak.sub", &interface_text(), &settings).expect("parse");
        assert_eq!(loaded.report.included_sources, 1);

        let settings = SourceLoadSettings {
            window: GeographicWindow::new(30.0, 31.0, -120.0, -119.0).expect("window"),
            ..SourceLoadSettings::default()
        };
        let loaded =
            parse_subduction_sources("ak.sub", &interface_text(), &settings).expect("parse");
        assert_eq!(loaded.report.outside_window, 1);
        assert!(loaded.sources.is_empty());
    }

    #[test]
    fn unknown_mechanism_rejects_one_interface_and_keeps_the_next() {
        let header = header_text("0.0", "1.0", 0.0);
        let interface = interface_text();
        let good = &interface[header.len()..];
        let text = format!(
            "{header}1 9 unmapped\n\
             8.0 0.001\n\
             1\n\
             51.0 -178.0 5.0\n\
             1\n\
             52.5 -178.0 45.0\n\
             {good}"
        );
        let loaded = parse_subduction_sources("ak.sub", &text, &SourceLoadSettings::default())
            .expect("the rejected interface should not abort the file");
        assert_eq!(loaded.report.declared_sources, 2);
        assert_eq!(loaded.report.rejected_sources, 1);
        assert_eq!(loaded.sources.len(), 1);
        assert_eq!(loaded.sources[0].id, "1");
        assert_eq!(loaded.sources[0].name, "Aleutian megathrust");
    }
}
