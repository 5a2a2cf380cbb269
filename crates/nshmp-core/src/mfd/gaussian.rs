use super::IncrementalMfd;
use crate::common::constants::DEFAULT_MAG_BIN_WIDTH;
use crate::domain::{NshmpError, NshmpResult};

/// Bins sitting exactly on the truncation edge are kept despite rounding noise.
const TRUNCATION_TOLERANCE: f64 = 1.0e-6;

/// Normal distribution of magnitude truncated symmetrically at
/// `truncation_level` standard deviations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianShape {
    pub mean: f64,
    pub sigma: f64,
    pub truncation_level: f64,
}

fn relative_gaussian(
    min_magnitude: f64,
    max_magnitude: f64,
    num: usize,
    shape: GaussianShape,
) -> NshmpResult<IncrementalMfd> {
    let delta = if num > 1 {
        (max_magnitude - min_magnitude) / (num - 1) as f64
    } else {
        DEFAULT_MAG_BIN_WIDTH
    };
    let mut mfd = IncrementalMfd::zeros(min_magnitude, num, delta)?;
    let sigma = shape.sigma.abs();

    if sigma == 0.0 {
        if let Some(index) = mfd.index_of(shape.mean) {
            mfd.set_rate(index, 1.0);
        }
        return Ok(mfd);
    }

    for index in 0..num {
        let z = (mfd.magnitude(index) - shape.mean) / sigma;
        if z.abs() <= shape.truncation_level + TRUNCATION_TOLERANCE {
            mfd.set_rate(index, (-0.5 * z * z).exp());
        }
    }
    Ok(mfd)
}

fn ensure_non_empty(mfd: &IncrementalMfd, measure: f64, shape: GaussianShape) -> NshmpResult<()> {
    if measure > 0.0 && measure.is_finite() {
        return Ok(());
    }
    Err(NshmpError::numerical_instability(
        "MODEL.GAUSSIAN_SHAPE",
        format!(
            "Gaussian around M{} (sigma {}) leaves no rate on [{}, {}]",
            shape.mean,
            shape.sigma,
            mfd.min_magnitude(),
            mfd.max_magnitude()
        ),
    ))
}

/// Truncated Gaussian scaled so its total moment rate equals `moment_rate`.
pub fn gaussian_by_moment_rate(
    min_magnitude: f64,
    max_magnitude: f64,
    num: usize,
    shape: GaussianShape,
    moment_rate: f64,
) -> NshmpResult<IncrementalMfd> {
    let mut mfd = relative_gaussian(min_magnitude, max_magnitude, num, shape)?;
    let shape_moment = mfd.total_moment_rate();
    ensure_non_empty(&mfd, shape_moment, shape)?;
    mfd.scale(moment_rate / shape_moment);
    Ok(mfd)
}

/// Truncated Gaussian scaled so its total event rate equals `total_rate`.
pub fn gaussian_by_total_rate(
    min_magnitude: f64,
    max_magnitude: f64,
    num: usize,
    shape: GaussianShape,
    total_rate: f64,
) -> NshmpResult<IncrementalMfd> {
    let mut mfd = relative_gaussian(min_magnitude, max_magnitude, num, shape)?;
    let shape_rate = mfd.total_rate();
    ensure_non_empty(&mfd, shape_rate, shape)?;
    mfd.scale(total_rate / shape_rate);
    Ok(mfd)
}

#[cfg(test)]
mod tests {
    use super::{GaussianShape, gaussian_by_moment_rate, gaussian_by_total_rate};

    fn shape(mean: f64, sigma: f64, truncation_level: f64) -> GaussianShape {
        GaussianShape {
            mean,
            sigma,
            truncation_level,
        }
    }

    #[test]
    fn rate_scaled_gaussian_is_symmetric_about_mean() {
        let mfd = gaussian_by_total_rate(7.0, 8.0, 11, shape(7.5, 0.25, 2.0), 1.0).expect("gaussian");
        assert!((mfd.total_rate() - 1.0).abs() < 1.0e-12);
        assert!((mfd.rate(4) - mfd.rate(6)).abs() < 1.0e-12);
        assert!(mfd.rate(5) > mfd.rate(4));
        assert!((mfd.rate(0) - mfd.rate(10)).abs() < 1.0e-12);
        assert!(mfd.rate(0) > 0.0, "edge bins at the truncation level are kept");
    }

    #[test]
    fn truncation_zeroes_bins_beyond_the_level() {
        let mfd = gaussian_by_total_rate(7.0, 8.0, 11, shape(7.5, 0.25, 1.0), 1.0).expect("gaussian");
        assert_eq!(mfd.rate(0), 0.0);
        assert_eq!(mfd.rate(2), 0.0);
        assert!(mfd.rate(3) > 0.0);
        assert_eq!(mfd.rate(10), 0.0);
    }

    #[test]
    fn moment_scaled_gaussian_hits_target_moment() {
        let target = 1.0e17;
        let mfd = gaussian_by_moment_rate(6.9, 7.7, 9, shape(7.3, 0.2, 2.0), target).expect("gaussian");
        assert!((mfd.total_moment_rate() - target).abs() / target < 1.0e-10);
    }

    #[test]
    fn negative_sigma_uses_its_magnitude() {
        let positive = gaussian_by_total_rate(7.0, 8.0, 11, shape(7.5, 0.25, 2.0), 1.0).expect("pos");
        let negative = gaussian_by_total_rate(7.0, 8.0, 11, shape(7.5, -0.25, 2.0), 1.0).expect("neg");
        assert_eq!(positive, negative);
    }

    #[test]
    fn single_bin_gaussian_holds_entire_rate() {
        let mfd = gaussian_by_total_rate(7.2, 7.2, 1, shape(7.2, 0.12, 0.0), 0.004).expect("gaussian");
        assert_eq!(mfd.len(), 1);
        assert!((mfd.rate(0) - 0.004).abs() < 1.0e-15);
    }
}
