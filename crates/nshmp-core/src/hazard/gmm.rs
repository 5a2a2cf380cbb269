//! Ground-motion collaborators keyed by tectonic region.

use super::{ProbEqkRupture, Site};
use crate::domain::{NshmpError, NshmpResult, TectonicRegion};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Conditional probabilities of exceeding each level given that `rupture`
/// occurs, aligned index for index with `levels`.
pub trait GroundMotionModel: Send + Sync {
    fn exceedance_probabilities(
        &self,
        rupture: &ProbEqkRupture,
        site: &Site,
        levels: &[f64],
    ) -> NshmpResult<Vec<f64>>;
}

#[derive(Clone, Default)]
pub struct GmmRegistry {
    models: BTreeMap<TectonicRegion, Arc<dyn GroundMotionModel>>,
}

impl GmmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose single model serves every region.
    pub fn single(model: Arc<dyn GroundMotionModel>) -> Self {
        Self::new().with_model(TectonicRegion::ActiveShallow, model)
    }

    pub fn with_model(mut self, region: TectonicRegion, model: Arc<dyn GroundMotionModel>) -> Self {
        self.models.insert(region, model);
        self
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// The model for `region`; a registry holding one model returns it for
    /// any region.
    pub fn model_for(&self, region: TectonicRegion) -> NshmpResult<&dyn GroundMotionModel> {
        if let Some(model) = self.models.get(&region) {
            return Ok(model.as_ref());
        }
        if self.models.len() == 1
            && let Some(model) = self.models.values().next()
        {
            return Ok(model.as_ref());
        }
        Err(NshmpError::configuration(
            "CONFIG.GMM_MISSING",
            format!("no ground-motion model is registered for tectonic region '{region}'"),
        ))
    }
}

impl std::fmt::Debug for GmmRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmmRegistry")
            .field("regions", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{GmmRegistry, GroundMotionModel};
    use crate::domain::{Location, NshmpErrorCategory, NshmpResult, TectonicRegion};
    use crate::hazard::{ProbEqkRupture, RuptureSurface, Site};
    use std::sync::Arc;

    struct Constant(f64);

    impl GroundMotionModel for Constant {
        fn exceedance_probabilities(
            &self,
            _rupture: &ProbEqkRupture,
            _site: &Site,
            levels: &[f64],
        ) -> NshmpResult<Vec<f64>> {
            Ok(vec![self.0; levels.len()])
        }
    }

    fn probe(registry: &GmmRegistry, region: TectonicRegion) -> f64 {
        let rupture = ProbEqkRupture {
            magnitude: 6.0,
            rake: 0.0,
            probability: 0.01,
            surface: RuptureSurface::point(Location::new(0.0, 0.0, 5.0)),
        };
        let site = Site::new(Location::new(0.0, 0.0, 0.0));
        registry
            .model_for(region)
            .and_then(|model| model.exceedance_probabilities(&rupture, &site, &[0.1]))
            .expect("model should be found")[0]
    }

    #[test]
    fn single_model_serves_every_region() {
        let registry = GmmRegistry::single(Arc::new(Constant(0.3)));
        for region in TectonicRegion::ALL {
            assert_eq!(probe(&registry, region), 0.3);
        }
    }

    #[test]
    fn regions_select_their_own_model() {
        let registry = GmmRegistry::new()
            .with_model(TectonicRegion::ActiveShallow, Arc::new(Constant(0.1)))
            .with_model(TectonicRegion::SubductionInterface, Arc::new(Constant(0.7)));
        assert_eq!(probe(&registry, TectonicRegion::ActiveShallow), 0.1);
        assert_eq!(probe(&registry, TectonicRegion::SubductionInterface), 0.7);
        let error = registry
            .model_for(TectonicRegion::Volcanic)
            .err()
            .expect("volcanic is not registered");
        assert_eq!(error.category(), NshmpErrorCategory::ConfigurationError);
        assert!(GmmRegistry::new().model_for(TectonicRegion::Volcanic).is_err());
    }
}
