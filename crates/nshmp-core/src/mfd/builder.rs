//! Source MFD construction from magnitude-recurrence parameters and the
//! epistemic branch table.
//!
//! A source either takes the fixed path (one un-perturbed distribution per
//! magnitude model) or is expanded over every epistemic branch; all branch
//! distributions are then summed into the final distribution with moment rate
//! conserved.

use super::gaussian::{GaussianShape, gaussian_by_moment_rate, gaussian_by_total_rate};
use super::gutenberg_richter::{
    characteristic_moment_rate, gutenberg_richter_by_moment_rate, total_moment_rate,
};
use super::summed::sum_moment_conserving;
use super::IncrementalMfd;
use crate::common::constants::{
    DEFAULT_MAG_BIN_WIDTH, EPISTEMIC_TEST_MAGNITUDE, GAUSSIAN_SIGMA_STEP,
    LEGACY_BIN_COUNT_ROUNDING, LEGACY_UPPER_BIN_SHIFT, MIN_VALID_MAG_BIN_WIDTH,
    MOMENT_MAGNITUDE_OFFSET, MOMENT_MAGNITUDE_SLOPE,
};
use crate::domain::{NshmpError, NshmpResult};
use crate::numerics::stable_mean;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Absorbs representation error when comparing shifted bin bounds.
const BOUND_TOLERANCE: f64 = 1.0e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpistemicBranch {
    pub delta_magnitude: f64,
    pub weight: f64,
}

/// Branch table shared by every source of one file, with the characteristic
/// magnitude sigma and the Gaussian half-width in units of `0.4 * sigma`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpistemicModel {
    branches: Vec<EpistemicBranch>,
    sigma: f64,
    width: f64,
}

impl EpistemicModel {
    pub fn new(branches: Vec<EpistemicBranch>, sigma: f64, width: f64) -> NshmpResult<Self> {
        if branches.is_empty() {
            return Err(NshmpError::configuration(
                "CONFIG.EPISTEMIC_BRANCHES",
                "epistemic branch table must contain at least one branch",
            ));
        }
        if !(width >= 0.0) {
            return Err(NshmpError::configuration(
                "CONFIG.EPISTEMIC_WIDTH",
                format!("characteristic magnitude width must be non-negative, got {width}"),
            ));
        }
        Ok(Self {
            branches,
            sigma,
            width,
        })
    }

    /// One branch with no magnitude perturbation and no aleatory spread.
    pub fn certain() -> Self {
        Self {
            branches: vec![EpistemicBranch {
                delta_magnitude: 0.0,
                weight: 1.0,
            }],
            sigma: 0.0,
            width: 0.0,
        }
    }

    pub fn branches(&self) -> &[EpistemicBranch] {
        &self.branches
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    fn first_delta(&self) -> f64 {
        self.branches[0].delta_magnitude
    }
}

/// Magnitude-recurrence record of one source, as declared in the input file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MagnitudeModel {
    Characteristic {
        magnitude: f64,
        rate: f64,
    },
    GutenbergRichter {
        a_value: f64,
        b_value: f64,
        min_magnitude: f64,
        max_magnitude: f64,
        bin_width: f64,
    },
    /// GR whose a-value is the mean of per-vertex values on the trace.
    GutenbergRichterTraceA {
        b_value: f64,
        min_magnitude: f64,
        max_magnitude: f64,
        bin_width: f64,
    },
    /// GR doubled into the declared b-value and a b = 0 twin of equal moment
    /// rate; each half carries half of `weight`.
    DualBValue {
        a_value: f64,
        b_value: f64,
        min_magnitude: f64,
        max_magnitude: f64,
        bin_width: f64,
        weight: f64,
    },
}

impl MagnitudeModel {
    pub fn floats_ruptures(&self) -> bool {
        !matches!(self, Self::Characteristic { .. })
    }

    pub fn needs_vertex_a_values(&self) -> bool {
        matches!(self, Self::GutenbergRichterTraceA { .. })
    }
}

/// Which construction path produced a source distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MfdConstruction {
    GrMaxMagnitudeBranches,
    GrGaussianBranches,
    GrFixed,
    CharacteristicBranches,
    CharacteristicFixed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MfdBuild {
    pub mfd: IncrementalMfd,
    pub construction: MfdConstruction,
    pub branch_mfds: usize,
    pub skipped_branches: usize,
}

/// Magnitude range moved to bin centers with its legacy bin count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenteredBins {
    pub min_magnitude: f64,
    pub max_magnitude: f64,
    pub delta: f64,
    pub count: usize,
}

fn legacy_bin_count(min_magnitude: f64, max_magnitude: f64, delta: f64) -> i64 {
    ((max_magnitude - min_magnitude) / delta + LEGACY_BIN_COUNT_ROUNDING) as i64
}

fn inverted_bounds(min_magnitude: f64, max_magnitude: f64, delta: f64) -> NshmpError {
    NshmpError::configuration(
        "CONFIG.MAGNITUDE_BOUNDS",
        format!(
            "magnitude bounds [{min_magnitude}, {max_magnitude}] are inverted after centering on bins of width {delta}"
        ),
    )
}

/// Fault-file bin centering: malformed widths fall back to 0.1 and the upper
/// bound keeps a 0.0001 shift before the truncating `+1.4` count.
pub fn centered_bin_count(
    min_magnitude: f64,
    max_magnitude: f64,
    bin_width: f64,
) -> NshmpResult<CenteredBins> {
    let delta = if bin_width <= MIN_VALID_MAG_BIN_WIDTH {
        DEFAULT_MAG_BIN_WIDTH
    } else {
        bin_width
    };
    if min_magnitude > max_magnitude {
        return Err(inverted_bounds(min_magnitude, max_magnitude, delta));
    }

    let (lower, upper) = if min_magnitude != max_magnitude {
        let lower = min_magnitude + delta / 2.0;
        let upper = max_magnitude - delta / 2.0;
        if lower > upper + BOUND_TOLERANCE {
            return Err(inverted_bounds(min_magnitude, max_magnitude, delta));
        }
        (lower, upper + LEGACY_UPPER_BIN_SHIFT)
    } else {
        (min_magnitude, max_magnitude)
    };

    let count = legacy_bin_count(lower, upper, delta);
    Ok(CenteredBins {
        min_magnitude: lower,
        max_magnitude: upper,
        delta,
        count: count.max(1) as usize,
    })
}

/// Grid-file bin centering: plain half-bin shift, one bin when the bounds coincide.
pub fn grid_centered_bins(
    min_magnitude: f64,
    max_magnitude: f64,
    delta: f64,
) -> NshmpResult<CenteredBins> {
    if min_magnitude == max_magnitude {
        return Ok(CenteredBins {
            min_magnitude,
            max_magnitude,
            delta,
            count: 1,
        });
    }
    let lower = min_magnitude + delta / 2.0;
    let upper = max_magnitude - delta / 2.0;
    if min_magnitude > max_magnitude || lower > upper + BOUND_TOLERANCE {
        return Err(inverted_bounds(min_magnitude, max_magnitude, delta));
    }
    let count = legacy_bin_count(lower, upper, delta);
    Ok(CenteredBins {
        min_magnitude: lower,
        max_magnitude: upper,
        delta,
        count: count.max(1) as usize,
    })
}

/// a-value of the b = 0 relation with the same moment rate over the same bins.
pub fn zero_b_equivalent_a_value(
    min_magnitude: f64,
    num: usize,
    delta: f64,
    a_value: f64,
    b_value: f64,
) -> f64 {
    let target = total_moment_rate(min_magnitude, num, delta, a_value, b_value);
    let unit = total_moment_rate(min_magnitude, num, delta, 0.0, 0.0);
    (target / unit).log10()
}

#[derive(Debug, Clone, Copy)]
struct GrBranch {
    a_value: f64,
    b_value: f64,
    bins: CenteredBins,
    weight: f64,
}

impl GrBranch {
    fn moment_rate(&self) -> f64 {
        total_moment_rate(
            self.bins.min_magnitude,
            self.bins.count,
            self.bins.delta,
            self.a_value,
            self.b_value,
        )
    }
}

pub fn build_source_mfd(
    model: &MagnitudeModel,
    vertex_a_values: &[f64],
    epistemic: &EpistemicModel,
    file_weight: f64,
) -> NshmpResult<MfdBuild> {
    let mut builder = BranchCollector::default();

    let construction = match *model {
        MagnitudeModel::Characteristic { magnitude, rate } => {
            build_characteristic(&mut builder, magnitude, rate, epistemic, file_weight)?
        }
        MagnitudeModel::GutenbergRichter {
            a_value,
            b_value,
            min_magnitude,
            max_magnitude,
            bin_width,
        } => {
            let bins = centered_bin_count(min_magnitude, max_magnitude, bin_width)?;
            let branches = [GrBranch {
                a_value,
                b_value,
                bins,
                weight: 1.0,
            }];
            build_gutenberg_richter(&mut builder, &branches, epistemic, file_weight)?
        }
        MagnitudeModel::DualBValue {
            a_value,
            b_value,
            min_magnitude,
            max_magnitude,
            bin_width,
            weight,
        } => {
            let bins = centered_bin_count(min_magnitude, max_magnitude, bin_width)?;
            let declared = GrBranch {
                a_value,
                b_value,
                bins,
                weight: weight * 0.5,
            };
            let flat = GrBranch {
                a_value: zero_b_equivalent_a_value(
                    bins.min_magnitude,
                    bins.count,
                    bins.delta,
                    a_value,
                    b_value,
                ),
                b_value: 0.0,
                ..declared
            };
            build_gutenberg_richter(&mut builder, &[declared, flat], epistemic, file_weight)?
        }
        MagnitudeModel::GutenbergRichterTraceA {
            b_value,
            min_magnitude,
            max_magnitude,
            bin_width,
        } => {
            let a_value = stable_mean(vertex_a_values).ok_or_else(|| {
                NshmpError::file_format(
                    "FORMAT.TRACE_A_VALUES",
                    "GR source without an a-value lists no per-vertex a-values",
                )
            })?;
            let bins = centered_bin_count(min_magnitude, max_magnitude, bin_width)?;
            let branch = GrBranch {
                a_value,
                b_value,
                bins,
                weight: 1.0,
            };
            max_magnitude_branches(&mut builder, &[branch], epistemic, file_weight)?;
            MfdConstruction::GrMaxMagnitudeBranches
        }
    };

    let branch_mfds = builder.mfds.len();
    let mfd = sum_moment_conserving(&builder.mfds)?;
    debug!(
        ?construction,
        branch_mfds,
        skipped = builder.skipped,
        total_rate = mfd.total_rate(),
        "built source magnitude-frequency distribution"
    );

    Ok(MfdBuild {
        mfd,
        construction,
        branch_mfds,
        skipped_branches: builder.skipped,
    })
}

#[derive(Default)]
struct BranchCollector {
    mfds: Vec<IncrementalMfd>,
    skipped: usize,
}

fn build_gutenberg_richter(
    builder: &mut BranchCollector,
    branches: &[GrBranch],
    epistemic: &EpistemicModel,
    file_weight: f64,
) -> NshmpResult<MfdConstruction> {
    if gr_takes_fixed_path(branches, epistemic) {
        for branch in branches {
            builder.mfds.push(gutenberg_richter_by_moment_rate(
                branch.bins.min_magnitude,
                branch.bins.count,
                branch.bins.delta,
                branch.b_value,
                file_weight * branch.weight * branch.moment_rate(),
            )?);
        }
        return Ok(MfdConstruction::GrFixed);
    }

    if branches[0].bins.count > 1 {
        max_magnitude_branches(builder, branches, epistemic, file_weight)?;
        Ok(MfdConstruction::GrMaxMagnitudeBranches)
    } else {
        for branch in branches {
            let min = branch.bins.min_magnitude;
            let tmr = 10.0_f64.powf(
                branch.a_value - branch.b_value * min
                    + MOMENT_MAGNITUDE_SLOPE * min
                    + MOMENT_MAGNITUDE_OFFSET,
            );
            let tcr = 10.0_f64.powf(branch.a_value - branch.b_value * min);
            for epistemic_branch in epistemic.branches() {
                let scale = file_weight * epistemic_branch.weight * branch.weight;
                builder.mfds.push(gaussian_branch(
                    branch.bins.max_magnitude + epistemic_branch.delta_magnitude,
                    epistemic,
                    scale * tmr,
                    scale * tcr,
                )?);
            }
        }
        Ok(MfdConstruction::GrGaussianBranches)
    }
}

fn gr_takes_fixed_path(branches: &[GrBranch], epistemic: &EpistemicModel) -> bool {
    let first_delta = epistemic.first_delta();
    let mut fixed = false;
    for branch in branches {
        let test = branch.bins.max_magnitude + first_delta;
        if test < EPISTEMIC_TEST_MAGNITUDE && branch.bins.count > 1 {
            fixed = true;
        }
        if branch.bins.count == 1 {
            let spread = epistemic.width() * GAUSSIAN_SIGMA_STEP * epistemic.sigma();
            if test - spread < EPISTEMIC_TEST_MAGNITUDE {
                fixed = true;
            }
        }
    }
    if epistemic.sigma() == 0.0 && epistemic.branches().len() == 1 {
        fixed = true;
    }
    fixed
}

fn max_magnitude_branches(
    builder: &mut BranchCollector,
    branches: &[GrBranch],
    epistemic: &EpistemicModel,
    file_weight: f64,
) -> NshmpResult<()> {
    for branch in branches {
        let bins = branch.bins;
        let tmr = branch.moment_rate();
        for epistemic_branch in epistemic.branches() {
            let shifted_max = bins.max_magnitude + epistemic_branch.delta_magnitude;
            let count = legacy_bin_count(bins.min_magnitude, shifted_max, bins.delta);
            if count <= 0 {
                warn!(
                    delta_magnitude = epistemic_branch.delta_magnitude,
                    min_magnitude = bins.min_magnitude,
                    shifted_max,
                    "epistemic branch leaves no magnitude bins; branch skipped"
                );
                builder.skipped += 1;
                continue;
            }
            builder.mfds.push(gutenberg_richter_by_moment_rate(
                bins.min_magnitude,
                count as usize,
                bins.delta,
                branch.b_value,
                file_weight * epistemic_branch.weight * branch.weight * tmr,
            )?);
        }
    }
    Ok(())
}

fn build_characteristic(
    builder: &mut BranchCollector,
    magnitude: f64,
    rate: f64,
    epistemic: &EpistemicModel,
    file_weight: f64,
) -> NshmpResult<MfdConstruction> {
    if epistemic.sigma() == 0.0 {
        builder
            .mfds
            .push(IncrementalMfd::single(magnitude, file_weight * rate)?);
        return Ok(MfdConstruction::CharacteristicFixed);
    }

    let tmr = characteristic_moment_rate(magnitude, rate);
    for epistemic_branch in epistemic.branches() {
        let scale = file_weight * epistemic_branch.weight;
        builder.mfds.push(gaussian_branch(
            magnitude + epistemic_branch.delta_magnitude,
            epistemic,
            scale * tmr,
            scale * rate,
        )?);
    }
    Ok(MfdConstruction::CharacteristicBranches)
}

/// Gaussian around `magnitude`. Positive sigma conserves moment rate, negative
/// sigma conserves event rate and zero sigma yields a single rate-only bin.
fn gaussian_branch(
    magnitude: f64,
    epistemic: &EpistemicModel,
    moment_rate: f64,
    event_rate: f64,
) -> NshmpResult<IncrementalMfd> {
    let sigma = epistemic.sigma();
    if sigma == 0.0 {
        return IncrementalMfd::single(magnitude, event_rate);
    }

    let spread = sigma.abs();
    let step = GAUSSIAN_SIGMA_STEP * spread;
    let half_width = epistemic.width() * step;
    let min = magnitude - half_width;
    let max = magnitude + half_width;
    let num = ((max - min) / step).round() as usize + 1;
    let shape = GaussianShape {
        mean: magnitude,
        sigma: spread,
        truncation_level: half_width / spread,
    };

    if sigma > 0.0 {
        gaussian_by_moment_rate(min, max, num, shape, moment_rate)
    } else {
        gaussian_by_total_rate(min, max, num, shape, event_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        EpistemicBranch, EpistemicModel, MagnitudeModel, MfdConstruction, build_source_mfd,
        centered_bin_count, grid_centered_bins, zero_b_equivalent_a_value,
    };
    use crate::domain::NshmpErrorCategory;
    use crate::mfd::{seismic_moment, total_moment_rate};

    fn branches(pairs: &[(f64, f64)]) -> Vec<EpistemicBranch> {
        pairs
            .iter()
            .map(|&(delta_magnitude, weight)| EpistemicBranch {
                delta_magnitude,
                weight,
            })
            .collect()
    }

    fn gr(a_value: f64, b_value: f64, min_magnitude: f64, max_magnitude: f64) -> MagnitudeModel {
        MagnitudeModel::GutenbergRichter {
            a_value,
            b_value,
            min_magnitude,
            max_magnitude,
            bin_width: 0.1,
        }
    }

    fn relative_error(actual: f64, expected: f64) -> f64 {
        (actual - expected).abs() / expected.abs()
    }

    #[test]
    fn centered_bins_reproduce_legacy_rounding() {
        let bins = centered_bin_count(5.0, 7.0, 0.1).expect("bins");
        assert!((bins.min_magnitude - 5.05).abs() < 1.0e-12);
        assert!((bins.max_magnitude - 6.9501).abs() < 1.0e-12);
        assert_eq!(bins.count, ((7.0 - 0.05 - (5.0 + 0.05)) / 0.1 + 1.4) as usize);
        assert_eq!(bins.count, 20);

        let floored = centered_bin_count(6.0, 7.0, 0.0).expect("floored");
        assert_eq!(floored.delta, 0.1);

        let single = centered_bin_count(7.1, 7.1, 0.1).expect("single");
        assert_eq!(single.count, 1);
        assert_eq!(single.min_magnitude, 7.1);
    }

    #[test]
    fn inverted_bounds_fail_instead_of_reordering() {
        let error = centered_bin_count(7.0, 6.0, 0.1).expect_err("inverted");
        assert_eq!(error.category(), NshmpErrorCategory::ConfigurationError);
        let error = centered_bin_count(5.0, 5.05, 0.1).expect_err("narrower than a bin");
        assert_eq!(error.placeholder(), "CONFIG.MAGNITUDE_BOUNDS");
        assert!(grid_centered_bins(6.0, 5.0, 0.1).is_err());
    }

    #[test]
    fn grid_centering_has_no_upper_shift() {
        let bins = grid_centered_bins(5.0, 7.0, 0.1).expect("bins");
        assert!((bins.max_magnitude - 6.95).abs() < 1.0e-12);
        assert_eq!(bins.count, 20);
        assert_eq!(grid_centered_bins(6.5, 6.5, 0.1).expect("single").count, 1);
    }

    #[test]
    fn gr_fixed_path_conserves_closed_form_moment() {
        let build = build_source_mfd(&gr(3.0, 1.0, 5.0, 7.0), &[], &EpistemicModel::certain(), 1.0)
            .expect("build");
        assert_eq!(build.construction, MfdConstruction::GrFixed);
        assert_eq!(build.mfd.len(), 20);
        let expected = total_moment_rate(5.05, 20, 0.1, 3.0, 1.0);
        assert!(relative_error(build.mfd.total_moment_rate(), expected) < 1.0e-9);
    }

    #[test]
    fn gr_branches_shift_maximum_magnitude() {
        let epistemic = EpistemicModel::new(branches(&[(-0.2, 0.2), (0.0, 0.6), (0.2, 0.2)]), 0.12, 2.0)
            .expect("epistemic");
        let build = build_source_mfd(&gr(3.0, 1.0, 5.0, 7.0), &[], &epistemic, 0.5).expect("build");
        assert_eq!(build.construction, MfdConstruction::GrMaxMagnitudeBranches);
        assert_eq!(build.branch_mfds, 3);
        assert!((build.mfd.max_magnitude() - 7.15).abs() < 1.0e-9);
        let expected = 0.5 * total_moment_rate(5.05, 20, 0.1, 3.0, 1.0);
        assert!(relative_error(build.mfd.total_moment_rate(), expected) < 1.0e-9);
    }

    #[test]
    fn branch_without_bins_is_skipped_not_fatal() {
        let epistemic =
            EpistemicModel::new(branches(&[(0.0, 0.5), (-1.0, 0.5)]), 0.12, 2.0).expect("epistemic");
        let build = build_source_mfd(&gr(3.0, 1.0, 6.0, 7.0), &[], &epistemic, 1.0).expect("build");
        assert_eq!(build.skipped_branches, 1);
        assert_eq!(build.branch_mfds, 1);
        let expected = 0.5 * total_moment_rate(6.05, 10, 0.1, 3.0, 1.0);
        assert!(relative_error(build.mfd.total_moment_rate(), expected) < 1.0e-9);
    }

    #[test]
    fn single_bin_gr_spreads_into_gaussian_conserving_moment() {
        let epistemic = EpistemicModel::new(branches(&[(0.0, 1.0)]), 0.12, 2.0).expect("epistemic");
        let build = build_source_mfd(&gr(2.0, 0.8, 7.0, 7.0), &[], &epistemic, 1.0).expect("build");
        assert_eq!(build.construction, MfdConstruction::GrGaussianBranches);
        assert_eq!(build.mfd.len(), 5);
        let expected = 10.0_f64.powf(2.0 - 0.8 * 7.0 + 1.5 * 7.0 + 9.05);
        assert!(relative_error(build.mfd.total_moment_rate(), expected) < 1.0e-9);
    }

    #[test]
    fn negative_sigma_conserves_event_rate() {
        let epistemic = EpistemicModel::new(branches(&[(0.0, 1.0)]), -0.12, 2.0).expect("epistemic");
        let build = build_source_mfd(&gr(2.0, 0.8, 7.0, 7.0), &[], &epistemic, 1.0).expect("build");
        let expected = 10.0_f64.powf(2.0 - 0.8 * 7.0);
        assert!(relative_error(build.mfd.total_rate(), expected) < 1.0e-9);
    }

    #[test]
    fn zero_sigma_with_many_branches_uses_rate_only_bins() {
        let epistemic =
            EpistemicModel::new(branches(&[(-0.2, 0.25), (0.0, 0.5), (0.2, 0.25)]), 0.0, 2.0)
                .expect("epistemic");
        let build = build_source_mfd(&gr(2.0, 0.8, 7.0, 7.0), &[], &epistemic, 1.0).expect("build");
        assert_eq!(build.construction, MfdConstruction::GrGaussianBranches);
        let tcr = 10.0_f64.powf(2.0 - 0.8 * 7.0);
        assert!(relative_error(build.mfd.total_rate(), tcr) < 1.0e-9);
        assert!((build.mfd.min_magnitude() - 6.8).abs() < 1.0e-9);
        assert!((build.mfd.max_magnitude() - 7.2).abs() < 1.0e-9);
    }

    #[test]
    fn characteristic_with_zero_sigma_is_single_bin_regardless_of_branches() {
        let epistemic =
            EpistemicModel::new(branches(&[(-0.2, 0.2), (0.0, 0.6), (0.2, 0.2)]), 0.0, 2.0)
                .expect("epistemic");
        let model = MagnitudeModel::Characteristic {
            magnitude: 7.5,
            rate: 0.001,
        };
        let build = build_source_mfd(&model, &[], &epistemic, 0.8).expect("build");
        assert_eq!(build.construction, MfdConstruction::CharacteristicFixed);
        assert_eq!(build.mfd.len(), 1);
        assert!((build.mfd.min_magnitude() - 7.5).abs() < 1.0e-12);
        assert!((build.mfd.rate(0) - 0.8 * 0.001).abs() < 1.0e-15);
        assert!(!model.floats_ruptures());
    }

    #[test]
    fn characteristic_branches_conserve_moment_per_branch() {
        let epistemic =
            EpistemicModel::new(branches(&[(-0.2, 0.2), (0.0, 0.6), (0.2, 0.2)]), 0.12, 2.0)
                .expect("epistemic");
        let model = MagnitudeModel::Characteristic {
            magnitude: 7.5,
            rate: 0.001,
        };
        let build = build_source_mfd(&model, &[], &epistemic, 1.0).expect("build");
        assert_eq!(build.construction, MfdConstruction::CharacteristicBranches);
        let expected = 0.001 * seismic_moment(7.5);
        assert!(relative_error(build.mfd.total_moment_rate(), expected) < 1.0e-6);
    }

    #[test]
    fn dual_b_value_halves_keep_declared_moment() {
        let model = MagnitudeModel::DualBValue {
            a_value: 3.0,
            b_value: 1.0,
            min_magnitude: 6.5,
            max_magnitude: 7.5,
            bin_width: 0.1,
            weight: 1.0,
        };
        let build = build_source_mfd(&model, &[], &EpistemicModel::certain(), 1.0).expect("build");
        assert_eq!(build.branch_mfds, 2);
        let expected = total_moment_rate(6.55, 10, 0.1, 3.0, 1.0);
        assert!(relative_error(build.mfd.total_moment_rate(), expected) < 1.0e-9);
    }

    #[test]
    fn zero_b_twin_matches_moment_rate() {
        let a = zero_b_equivalent_a_value(6.55, 10, 0.1, 3.0, 1.0);
        let original = total_moment_rate(6.55, 10, 0.1, 3.0, 1.0);
        let twin = total_moment_rate(6.55, 10, 0.1, a, 0.0);
        assert!(relative_error(twin, original) < 1.0e-12);
    }

    #[test]
    fn trace_a_values_are_averaged_and_always_branched() {
        let model = MagnitudeModel::GutenbergRichterTraceA {
            b_value: 1.0,
            min_magnitude: 5.0,
            max_magnitude: 6.0,
            bin_width: 0.1,
        };
        let build = build_source_mfd(&model, &[2.5, 3.5], &EpistemicModel::certain(), 1.0)
            .expect("build");
        assert_eq!(build.construction, MfdConstruction::GrMaxMagnitudeBranches);
        let expected = total_moment_rate(5.05, 10, 0.1, 3.0, 1.0);
        assert!(relative_error(build.mfd.total_moment_rate(), expected) < 1.0e-9);

        let error = build_source_mfd(&model, &[], &EpistemicModel::certain(), 1.0)
            .expect_err("no vertex values");
        assert_eq!(error.category(), NshmpErrorCategory::FileFormatError);
    }

    #[test]
    fn empty_branch_table_is_rejected() {
        let error = EpistemicModel::new(Vec::new(), 0.0, 0.0).expect_err("empty");
        assert_eq!(error.category(), NshmpErrorCategory::ConfigurationError);
    }
}
