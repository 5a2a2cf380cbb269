use super::{IncrementalMfd, seismic_moment};
use crate::domain::{NshmpError, NshmpResult};

/// Sums distributions onto one grid spanning all of them, at the smallest
/// bin width present. Each input rate moves to the nearest output bin with
/// its moment rate preserved.
pub fn sum_moment_conserving(mfds: &[IncrementalMfd]) -> NshmpResult<IncrementalMfd> {
    let Some(first) = mfds.first() else {
        return Err(NshmpError::numerical_instability(
            "MODEL.ZERO_TOTAL_RATE",
            "no magnitude-frequency distribution contributed to the sum",
        ));
    };

    let mut lowest = first.min_magnitude();
    let mut highest = first.max_magnitude();
    let mut delta = first.delta();
    for mfd in &mfds[1..] {
        lowest = lowest.min(mfd.min_magnitude());
        highest = highest.max(mfd.max_magnitude());
        delta = delta.min(mfd.delta());
    }

    let num = ((highest - lowest) / delta).round() as usize + 1;
    let mut summed = IncrementalMfd::zeros(lowest, num, delta)?;

    for mfd in mfds {
        for (magnitude, rate) in mfd.points() {
            if rate == 0.0 {
                continue;
            }
            let index = summed.index_of(magnitude).ok_or_else(|| {
                NshmpError::internal(
                    "SYS.MFD_RESAMPLE",
                    format!("M{magnitude} falls outside the summed range [{lowest}, {highest}]"),
                )
            })?;
            let target = summed.magnitude(index);
            summed.add_rate(index, rate * seismic_moment(magnitude) / seismic_moment(target));
        }
    }

    let total = summed.cumulative_rate(0);
    if !(total > 0.0) {
        return Err(NshmpError::numerical_instability(
            "MODEL.ZERO_TOTAL_RATE",
            "summation of magnitude-frequency distributions gives total cumulative rate = 0",
        ));
    }

    Ok(summed)
}
