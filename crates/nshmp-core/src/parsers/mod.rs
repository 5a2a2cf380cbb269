//! Readers for the legacy fault, subduction and gridded-seismicity source
//! files, plus the merge of alternative grid models.
//!
//! Every reader consumes its file strictly in order, applies the geographic
//! inclusion test per source and builds magnitude-frequency distributions
//! only for the sources it keeps.

pub mod fault;
pub mod grid;
pub mod header;
pub mod merge;
pub mod subduction;

pub use fault::{
    SourceDescriptor, load_fault_sources, parse_fault_sources, read_fault_file_header,
};
pub use grid::{GridFileSpec, load_grid_sources, parse_grid_sources};
pub use header::{FaultFileHeader, GridAxis, PeriodBlock, read_fault_header};
pub use merge::{WeightedGridModel, merge_grid_models, merge_loaded_grid_models};
pub use subduction::{load_subduction_sources, parse_subduction_sources};

use crate::domain::{ErrorScope, NshmpResult, SourceRecord};
use serde::Serialize;
use tracing::warn;

/// Counters gathered while reading one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub declared_sources: usize,
    pub included_sources: usize,
    pub outside_window: usize,
    /// Grid cells dropped because their annual rate is zero.
    pub zero_rate_cells: usize,
    pub skipped_branches: usize,
    /// Sources dropped for a configuration error of their own.
    pub rejected_sources: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSources {
    pub sources: Vec<SourceRecord>,
    pub report: LoadReport,
}

impl LoadedSources {
    pub fn total_rate(&self) -> f64 {
        self.sources.iter().map(SourceRecord::total_rate).sum()
    }

    pub fn total_moment_rate(&self) -> f64 {
        self.sources.iter().map(SourceRecord::total_moment_rate).sum()
    }
}

/// Configuration errors abort only the source that raised them: the source
/// is logged and counted, and the reader moves on. Other errors abort the file.
fn reject_source<T>(
    result: NshmpResult<T>,
    origin: &str,
    source_index: usize,
    report: &mut LoadReport,
) -> NshmpResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(error) if error.category().scope() == ErrorScope::Source => {
            warn!(
                origin,
                source_index,
                placeholder = error.placeholder(),
                message = error.message(),
                "rejected source"
            );
            report.rejected_sources += 1;
            Ok(None)
        }
        Err(error) => Err(error),
    }
}

fn origin_label(path: &std::path::Path) -> String {
    path.display().to_string()
}
