//! Header block shared by the fault and subduction source files.

use crate::domain::{NshmpError, NshmpResult};
use crate::io::{LineReader, Record};
use crate::mfd::{EpistemicBranch, EpistemicModel};

/// `min max step` axis of a regular site or source grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridAxis {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl GridAxis {
    pub(crate) fn read(record: &mut Record<'_>, axis: &str) -> NshmpResult<Self> {
        Ok(Self {
            min: record.next_f64(&format!("{axis} minimum"))?,
            max: record.next_f64(&format!("{axis} maximum"))?,
            step: record.next_f64(&format!("{axis} increment"))?,
        })
    }

    /// Legacy node count: truncated span over step, plus one.
    pub fn node_count(&self) -> NshmpResult<usize> {
        let finite = self.min.is_finite() && self.max.is_finite();
        if !finite || !(self.step.is_finite() && self.step > 0.0) {
            return Err(NshmpError::file_format(
                "FORMAT.GRID_AXIS",
                format!(
                    "grid axis {} {} {} needs finite bounds and a positive increment",
                    self.min, self.max, self.step
                ),
            ));
        }
        let nodes = ((self.max - self.min) / self.step).trunc() + 1.0;
        if nodes <= 0.0 {
            return Ok(0);
        }
        if nodes > f64::from(u32::MAX) {
            return Err(NshmpError::file_format(
                "FORMAT.GRID_AXIS",
                format!(
                    "grid axis {} {} {} declares {nodes} nodes",
                    self.min, self.max, self.step
                ),
            ));
        }
        Ok(nodes as usize)
    }
}

/// Ground-motion relation entry of a period block. Only the code and the raw
/// coefficient lines are retained.
#[derive(Debug, Clone, PartialEq)]
pub struct AttenuationEntry {
    pub code: i32,
    pub weight: Option<f64>,
    pub extra_lines: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodBlock {
    pub period: f64,
    pub sigma_nf: f64,
    pub distance_nf: f64,
    pub output_name: String,
    pub intensity_levels: Vec<f64>,
    pub attenuation: Vec<AttenuationEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaultFileHeader {
    pub site_latitudes: GridAxis,
    pub site_longitudes: GridAxis,
    pub distance_increment: f64,
    pub max_distance: f64,
    pub periods: Vec<PeriodBlock>,
    pub rupture_length_step: f64,
    pub rupture_move_step: f64,
    pub epistemic: EpistemicModel,
}

/// Lines following an attenuation-code line; `None` for unmapped codes.
pub fn attenuation_extra_lines(code: i32) -> Option<usize> {
    match code {
        1 | 2 | 5 | 7 | 11 | 12 => Some(1),
        6 | 8 | 10 => Some(2),
        3 | 9 => Some(3),
        4 => Some(4),
        _ => None,
    }
}

pub fn read_fault_header(reader: &mut LineReader<'_>) -> NshmpResult<FaultFileHeader> {
    let site_latitudes = GridAxis::read(&mut reader.next_record("site latitude grid")?, "site latitude")?;
    let site_longitudes =
        GridAxis::read(&mut reader.next_record("site longitude grid")?, "site longitude")?;

    let mut record = reader.next_record("distance increment line")?;
    let distance_increment = record.next_f64("distance increment")?;
    let max_distance = record.next_f64("maximum distance")?;

    let period_count = reader.next_record("period count")?.next_count("period count")?;
    let periods = (0..period_count)
        .map(|_| read_period_block(reader))
        .collect::<NshmpResult<Vec<_>>>()?;

    let mut record = reader.next_record("rupture floating steps")?;
    let rupture_length_step = record.next_f64("dlen")?;
    let rupture_move_step = record.next_f64("dmove")?;

    let epistemic = read_epistemic_model(reader)?;

    Ok(FaultFileHeader {
        site_latitudes,
        site_longitudes,
        distance_increment,
        max_distance,
        periods,
        rupture_length_step,
        rupture_move_step,
        epistemic,
    })
}

fn read_period_block(reader: &mut LineReader<'_>) -> NshmpResult<PeriodBlock> {
    let mut record = reader.next_record("period line")?;
    let period = record.next_f64("period")?;
    let sigma_nf = record.next_f64("sigmanf")?;
    let distance_nf = record.next_f64("distnf")?;

    let output_name = reader.next_record("output file name")?.rest_text();
    let level_count = reader
        .next_record("intensity level count")?
        .next_count("intensity level count")?;
    let intensity_levels = reader
        .next_record("intensity levels")?
        .next_f64_values(level_count, "intensity level")?;

    let relation_count = reader
        .next_record("attenuation relation count")?
        .next_count("attenuation relation count")?;
    let mut attenuation = Vec::with_capacity(relation_count);
    for _ in 0..relation_count {
        let mut record = reader.next_record("attenuation relation code")?;
        let code = record.next_i32("attenuation relation code")?;
        let weight = if record.remaining() > 0 {
            Some(record.next_f64("attenuation relation weight")?)
        } else {
            None
        };
        let extra_lines = attenuation_extra_lines(code).ok_or_else(|| {
            NshmpError::configuration(
                "CONFIG.ATTENUATION_CODE",
                format!(
                    "{}:{}: attenuation relation code {code} is not mapped to a record layout",
                    reader.origin(),
                    record.line_number()
                ),
            )
        })?;
        for _ in 0..extra_lines {
            reader.next_record("attenuation relation coefficients")?;
        }
        attenuation.push(AttenuationEntry {
            code,
            weight,
            extra_lines,
        });
    }

    Ok(PeriodBlock {
        period,
        sigma_nf,
        distance_nf,
        output_name,
        intensity_levels,
        attenuation,
    })
}

fn read_epistemic_model(reader: &mut LineReader<'_>) -> NshmpResult<EpistemicModel> {
    let count = reader
        .next_record("epistemic branch count")?
        .next_count("epistemic branch count")?;
    let deltas = reader
        .next_record("epistemic magnitude perturbations")?
        .next_f64_values(count, "delta magnitude")?;
    let weights = reader
        .next_record("epistemic branch weights")?
        .next_f64_values(count, "branch weight")?;
    let mut record = reader.next_record("characteristic magnitude spread")?;
    let sigma = record.next_f64("stdMchar")?;
    let width = record.next_f64("widthMchar")?;

    let branches = deltas
        .into_iter()
        .zip(weights)
        .map(|(delta_magnitude, weight)| EpistemicBranch {
            delta_magnitude,
            weight,
        })
        .collect();
    EpistemicModel::new(branches, sigma, width)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{GridAxis, attenuation_extra_lines, read_fault_header};
    use crate::domain::NshmpErrorCategory;
    use crate::io::LineReader;

    /// Header with two periods, epistemic branches `dm` / `weights` and the
    /// given characteristic sigma.
    pub(crate) fn header_text(dm: &str, weights: &str, sigma: f64) -> String {
        let count = dm.split_whitespace().count();
        format!(
            "50.0 72.0 0.5\n\
             -170.0 -130.0 0.1\n\
             10.0 1000.0\n\
             2\n\
             0.0 0.0 0.0\n\
             pga.out\n\
             3\n\
             0.1 0.2 0.4\n\
             2\n\
             3 0.5\n\
             a\nb\nc\n\
             4 0.5\n\
             a\nb\nc\nd\n\
             1.0 0.0 0.0\n\
             sa1.out\n\
             1\n\
             0.1\n\
             1\n\
             6\n\
             a\nb\n\
             1.0 1.0\n\
             {count}\n\
             {dm}\n\
             {weights}\n\
             {sigma} 2.0\n"
        )
    }

    #[test]
    fn header_reads_periods_and_epistemic_table() {
        let text = header_text("-0.2 0.0 0.2", "0.2 0.6 0.2", 0.12);
        let mut reader = LineReader::new("ak.char", &text);
        let header = read_fault_header(&mut reader).expect("header should parse");

        assert_eq!(header.site_latitudes.node_count().expect("node count"), 45);
        assert_eq!(header.max_distance, 1000.0);
        assert_eq!(header.periods.len(), 2);
        assert_eq!(header.periods[0].output_name, "pga.out");
        assert_eq!(header.periods[0].intensity_levels, vec![0.1, 0.2, 0.4]);
        assert_eq!(header.periods[0].attenuation.len(), 2);
        assert_eq!(header.periods[0].attenuation[1].extra_lines, 4);
        assert_eq!(header.periods[1].attenuation[0].code, 6);
        assert_eq!(header.epistemic.branches().len(), 3);
        assert_eq!(header.epistemic.branches()[1].weight, 0.6);
        assert_eq!(header.epistemic.sigma(), 0.12);
        assert_eq!(header.epistemic.width(), 2.0);
        assert!(reader.try_next_record().is_none());
    }

    #[test]
    fn unknown_attenuation_code_is_a_configuration_error() {
        let text = header_text("0.0", "1.0", 0.0).replacen("\n6\n", "\n13\n", 1);
        let mut reader = LineReader::new("ak.char", &text);
        let error = read_fault_header(&mut reader).expect_err("code 13 is unmapped");
        assert_eq!(error.category(), NshmpErrorCategory::ConfigurationError);
        assert_eq!(error.placeholder(), "CONFIG.ATTENUATION_CODE");
        assert!(attenuation_extra_lines(0).is_none());
    }

    #[test]
    fn degenerate_axes_are_format_errors() {
        let axis = |min: f64, max: f64, step: f64| GridAxis { min, max, step };
        for degenerate in [axis(0.0, 1.0, 0.0), axis(0.0, 1.0, -0.5), axis(0.0, f64::NAN, 0.1)] {
            let error = degenerate.node_count().expect_err("degenerate axis");
            assert_eq!(error.category(), NshmpErrorCategory::FileFormatError);
            assert_eq!(error.placeholder(), "FORMAT.GRID_AXIS");
        }
        assert!(axis(0.0, 1.0, 1.0e-12).node_count().is_err());
        assert_eq!(axis(60.0, 61.0, 0.5).node_count().expect("nodes"), 3);
        assert_eq!(axis(1.0, 0.0, 0.5).node_count().expect("inverted"), 0);
    }

    #[test]
    fn truncated_header_is_a_format_error() {
        let text = "50.0 72.0 0.1\n-170.0 -130.0 0.1\n10.0 1000.0\n";
        let mut reader = LineReader::new("ak.char", text);
        let error = read_fault_header(&mut reader).expect_err("header is incomplete");
        assert_eq!(error.category(), NshmpErrorCategory::FileFormatError);
        assert_eq!(error.placeholder(), "FORMAT.UNEXPECTED_EOF");
    }
}
