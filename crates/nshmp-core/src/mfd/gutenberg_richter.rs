use super::{IncrementalMfd, seismic_moment};
use crate::common::constants::{DEFAULT_MAG_BIN_WIDTH, MOMENT_MAGNITUDE_OFFSET, MOMENT_MAGNITUDE_SLOPE};
use crate::domain::{NshmpError, NshmpResult};
use crate::numerics::stable_sum;

/// Total moment rate of an incremental GR relation over `num` bin centers.
pub fn total_moment_rate(min_magnitude: f64, num: usize, delta: f64, a: f64, b: f64) -> f64 {
    let terms: Vec<f64> = (0..num)
        .map(|index| {
            let magnitude = min_magnitude + index as f64 * delta;
            10.0_f64.powf(
                a - b * magnitude + MOMENT_MAGNITUDE_SLOPE * magnitude + MOMENT_MAGNITUDE_OFFSET,
            )
        })
        .collect();
    stable_sum(&terms)
}

fn relative_gr_shape(min_magnitude: f64, num: usize, delta: f64, b: f64) -> NshmpResult<IncrementalMfd> {
    let rates = (0..num)
        .map(|index| 10.0_f64.powf(-b * (min_magnitude + index as f64 * delta)))
        .collect();
    IncrementalMfd::from_rates(min_magnitude, delta, rates)
}

/// GR distribution scaled to a target total moment rate.
pub fn gutenberg_richter_by_moment_rate(
    min_magnitude: f64,
    num: usize,
    delta: f64,
    b: f64,
    moment_rate: f64,
) -> NshmpResult<IncrementalMfd> {
    let mut mfd = relative_gr_shape(min_magnitude, num, delta, b)?;
    let shape_moment = mfd.total_moment_rate();
    if !(shape_moment > 0.0) || !shape_moment.is_finite() {
        return Err(NshmpError::numerical_instability(
            "MODEL.GR_SHAPE",
            format!("GR shape with b={b} from M{min_magnitude} has no finite moment"),
        ));
    }
    mfd.scale(moment_rate / shape_moment);
    Ok(mfd)
}

/// GR distribution between two bin centers scaled to a total event rate.
pub fn gutenberg_richter_by_total_rate(
    min_magnitude: f64,
    max_magnitude: f64,
    num: usize,
    b: f64,
    total_rate: f64,
) -> NshmpResult<IncrementalMfd> {
    let delta = if num > 1 {
        (max_magnitude - min_magnitude) / (num - 1) as f64
    } else {
        DEFAULT_MAG_BIN_WIDTH
    };
    let mut mfd = relative_gr_shape(min_magnitude, num, delta, b)?;
    let shape_rate = mfd.total_rate();
    if !(shape_rate > 0.0) || !shape_rate.is_finite() {
        return Err(NshmpError::numerical_instability(
            "MODEL.GR_SHAPE",
            format!("GR shape with b={b} from M{min_magnitude} has no finite rate"),
        ));
    }
    mfd.scale(total_rate / shape_rate);
    Ok(mfd)
}

/// Moment rate of the single magnitude `magnitude` occurring at `rate`.
pub fn characteristic_moment_rate(magnitude: f64, rate: f64) -> f64 {
    rate * seismic_moment(magnitude)
}
