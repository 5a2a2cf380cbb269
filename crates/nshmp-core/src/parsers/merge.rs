//! Merge of alternative grid models that list the same cells.

use super::grid::load_grid_sources;
use super::LoadedSources;
use crate::common::config::SourceLoadSettings;
use crate::domain::{
    MechanismMfd, NshmpError, NshmpResult, PointSourceGeometry, SourceGeometry, SourceRecord,
};
use crate::io::BinaryGridCache;
use crate::mfd::{IncrementalMfd, sum_moment_conserving};
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedGridModel {
    pub path: PathBuf,
    pub weight: f64,
}

/// Loads every model with its own weight, concurrently, then merges them.
pub fn merge_grid_models(
    models: &[WeightedGridModel],
    settings: &SourceLoadSettings,
    cache: &BinaryGridCache,
) -> NshmpResult<LoadedSources> {
    let loaded = models
        .par_iter()
        .map(|model| {
            let settings = SourceLoadSettings {
                file_weight: model.weight,
                ..settings.clone()
            };
            load_grid_sources(&model.path, &settings, cache)
        })
        .collect::<NshmpResult<Vec<_>>>()?;
    let merged = merge_loaded_grid_models(loaded)?;
    info!(
        models = models.len(),
        sources = merged.sources.len(),
        "merged grid models by location"
    );
    Ok(merged)
}

/// Sums, cell by cell and mechanism by mechanism, the distributions of
/// models whose sources sit at the same locations in the same order.
pub fn merge_loaded_grid_models(models: Vec<LoadedSources>) -> NshmpResult<LoadedSources> {
    let mut models = models.into_iter();
    let Some(mut merged) = models.next() else {
        return Err(NshmpError::configuration(
            "CONFIG.MERGE_EMPTY",
            "at least one grid model is needed for a merge",
        ));
    };

    for (model_index, model) in models.enumerate() {
        if model.sources.len() != merged.sources.len() {
            return Err(NshmpError::configuration(
                "CONFIG.MERGE_LENGTH",
                format!(
                    "grid model {} lists {} sources but the first model lists {}",
                    model_index + 2,
                    model.sources.len(),
                    merged.sources.len()
                ),
            ));
        }
        for (target, other) in merged.sources.iter_mut().zip(&model.sources) {
            merge_point_source(target, other)?;
        }
        merged.report.skipped_branches += model.report.skipped_branches;
        merged.report.rejected_sources += model.report.rejected_sources;
    }

    Ok(merged)
}

fn point_geometry(source: &SourceRecord) -> NshmpResult<&PointSourceGeometry> {
    match &source.geometry {
        SourceGeometry::Point(point) => Ok(point),
        _ => Err(NshmpError::configuration(
            "CONFIG.MERGE_KIND",
            format!("source '{}' is a {} source; only grid sources merge", source.id, source.kind()),
        )),
    }
}

fn merge_point_source(target: &mut SourceRecord, other: &SourceRecord) -> NshmpResult<()> {
    let other_point = point_geometry(other)?;
    let target_point = point_geometry(target)?;
    if target_point.location.latitude != other_point.location.latitude
        || target_point.location.longitude != other_point.location.longitude
    {
        return Err(NshmpError::configuration(
            "CONFIG.MERGE_LOCATION",
            format!(
                "sources to be merged are not at the same position: ({}, {}) and ({}, {})",
                target_point.location.latitude,
                target_point.location.longitude,
                other_point.location.latitude,
                other_point.location.longitude
            ),
        ));
    }
    if target_point.mechanisms.len() != other_point.mechanisms.len() {
        return Err(NshmpError::configuration(
            "CONFIG.MERGE_MECHANISMS",
            format!(
                "source '{}' has {} focal mechanisms in one model and {} in another",
                target.id,
                target_point.mechanisms.len(),
                other_point.mechanisms.len()
            ),
        ));
    }

    let mechanisms = target_point
        .mechanisms
        .iter()
        .zip(&other_point.mechanisms)
        .map(|(lhs, rhs)| {
            if lhs.mechanism != rhs.mechanism {
                return Err(NshmpError::configuration(
                    "CONFIG.MERGE_MECHANISMS",
                    format!(
                        "source '{}' has focal mechanism {:?} in one model and {:?} in another",
                        target.id, lhs.mechanism, rhs.mechanism
                    ),
                ));
            }
            Ok(MechanismMfd {
                mechanism: lhs.mechanism,
                mfd: sum_moment_conserving(&[lhs.mfd.clone(), rhs.mfd.clone()])?,
            })
        })
        .collect::<NshmpResult<Vec<_>>>()?;
    let mfds: Vec<IncrementalMfd> = mechanisms.iter().map(|entry| entry.mfd.clone()).collect();
    target.mfd = sum_moment_conserving(&mfds)?;
    if let SourceGeometry::Point(point) = &mut target.geometry {
        point.mechanisms = mechanisms;
    }
    Ok(())
}
