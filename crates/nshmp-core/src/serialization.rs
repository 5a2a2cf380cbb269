//! JSON export of assembled source lists.

use crate::domain::{NshmpError, NshmpResult, SourceRecord};
use crate::parsers::{LoadReport, LoadedSources};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct SourceListDocument<'a> {
    pub source_count: usize,
    pub total_rate: f64,
    pub total_moment_rate: f64,
    pub report: LoadReport,
    pub sources: &'a [SourceRecord],
}

impl<'a> SourceListDocument<'a> {
    pub fn new(loaded: &'a LoadedSources) -> Self {
        Self {
            source_count: loaded.sources.len(),
            total_rate: loaded.total_rate(),
            total_moment_rate: loaded.total_moment_rate(),
            report: loaded.report,
            sources: &loaded.sources,
        }
    }
}

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn source_list_json(loaded: &LoadedSources) -> NshmpResult<String> {
    let json = serde_json::to_string_pretty(&SourceListDocument::new(loaded)).map_err(|source| {
        NshmpError::internal(
            "SYS.JSON_ENCODE",
            format!("failed to encode source list: {source}"),
        )
    })?;
    Ok(normalize_text_artifact(&json))
}

pub fn write_source_list(path: &Path, loaded: &LoadedSources) -> NshmpResult<()> {
    let json = source_list_json(loaded)?;
    fs::write(path, json).map_err(|source| {
        NshmpError::io_system(
            "IO.OUTPUT_WRITE",
            format!("failed to write source list '{}': {source}", path.display()),
        )
    })
}
