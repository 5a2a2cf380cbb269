use crate::domain::{NshmpError, NshmpResult};
use serde::{Deserialize, Serialize};

/// Probabilities on a fixed intensity-measure-level axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardCurve {
    levels: Vec<f64>,
    values: Vec<f64>,
}

impl HazardCurve {
    /// Zero curve on `levels`, which must be finite and strictly increasing.
    pub fn new(levels: Vec<f64>) -> NshmpResult<Self> {
        if levels.iter().any(|level| !level.is_finite())
            || levels.windows(2).any(|pair| pair[0] >= pair[1])
        {
            return Err(NshmpError::configuration(
                "CONFIG.INTENSITY_LEVELS",
                "intensity levels must be finite and strictly increasing",
            ));
        }
        let values = vec![0.0; levels.len()];
        Ok(Self { levels, values })
    }

    pub(crate) fn with_values(levels: &[f64], values: Vec<f64>) -> Self {
        Self {
            levels: levels.to_vec(),
            values,
        }
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.levels.iter().copied().zip(self.values.iter().copied())
    }

    /// Poisson rates `-ln(1 - P) / years` equivalent to these probabilities.
    pub fn annualized_rates(&self, years: f64) -> NshmpResult<HazardCurve> {
        if !(years > 0.0) {
            return Err(NshmpError::configuration(
                "CONFIG.DURATION",
                format!("annualization needs a positive duration, got {years}"),
            ));
        }
        let values = self
            .values
            .iter()
            .map(|probability| -(1.0 - probability).ln() / years)
            .collect();
        Ok(Self::with_values(&self.levels, values))
    }
}

#[cfg(test)]
mod tests {
    use super::HazardCurve;

    #[test]
    fn levels_must_increase() {
        assert!(HazardCurve::new(vec![0.1, 0.2, 0.4]).is_ok());
        assert!(HazardCurve::new(vec![0.1, 0.1]).is_err());
        assert!(HazardCurve::new(vec![f64::NAN]).is_err());
    }

    #[test]
    fn annualized_rates_invert_poisson_probabilities() {
        let rate: f64 = 0.002;
        let years = 50.0;
        let probability = 1.0 - (-rate * years).exp();
        let curve = HazardCurve::with_values(&[0.1, 0.2], vec![probability, 0.0]);
        let rates = curve.annualized_rates(years).expect("positive duration");
        assert!((rates.values()[0] - rate).abs() < 1.0e-15);
        assert_eq!(rates.values()[1], 0.0);
        assert!(curve.annualized_rates(0.0).is_err());
    }
}
