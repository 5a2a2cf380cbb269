use super::CliError;
use anyhow::Context;
use nshmp_core::common::config::{SourceLoadSettings, load_source_settings};
use nshmp_core::domain::{GeographicWindow, NshmpError, TectonicRegion};
use nshmp_core::io::{BinaryGridCache, ByteOrder};
use nshmp_core::parsers::{
    LoadedSources, WeightedGridModel, load_fault_sources, load_grid_sources,
    load_subduction_sources, merge_grid_models, read_fault_file_header,
};
use nshmp_core::serialization::{source_list_json, write_source_list};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(clap::Args)]
pub(super) struct LoadFlags {
    /// Tectonic region assigned to every source (e.g. active_shallow)
    #[arg(long)]
    trt: Option<TectonicRegion>,

    /// Weight applied to every rate read from the file
    #[arg(long)]
    weight: Option<f64>,

    /// Inclusion window as latmin,latmax,lonmin,lonmax
    #[arg(long, value_delimiter = ',', num_args = 4)]
    region: Option<Vec<f64>>,

    /// JSON load settings; flags given alongside override its fields
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct SourceFileArgs {
    /// Legacy source file
    file: PathBuf,

    #[command(flatten)]
    load: LoadFlags,

    /// JSON output path; stdout when absent
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct GridArgs {
    /// Grid source files; several files are merged cell by cell
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Per-file weights, comma separated
    #[arg(long, value_delimiter = ',')]
    weights: Vec<f64>,

    /// Binary grids are little-endian
    #[arg(long)]
    little_endian: bool,

    #[command(flatten)]
    load: LoadFlags,

    /// JSON output path; stdout when absent
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub(super) enum ModelKind {
    Fault,
    Grid,
    Subduction,
}

#[derive(clap::Args)]
pub(super) struct SummaryArgs {
    /// Legacy source file
    file: PathBuf,

    /// Format of the file
    #[arg(long, value_enum)]
    kind: ModelKind,

    #[command(flatten)]
    load: LoadFlags,
}

impl LoadFlags {
    fn resolve(&self) -> Result<SourceLoadSettings, CliError> {
        let mut settings = match &self.settings {
            Some(path) => load_source_settings(path).map_err(NshmpError::from)?,
            None => SourceLoadSettings::default(),
        };
        if let Some(trt) = self.trt {
            settings.tectonic_region = trt;
        }
        if let Some(weight) = self.weight {
            settings.file_weight = weight;
        }
        if let Some(bounds) = &self.region {
            let [lat_min, lat_max, lon_min, lon_max] = bounds.as_slice() else {
                return Err(CliError::Usage(format!(
                    "--region expects 4 values, got {}",
                    bounds.len()
                )));
            };
            settings.window = GeographicWindow::new(*lat_min, *lat_max, *lon_min, *lon_max)?
                .with_border(settings.window.border)?;
        }
        settings.validate()?;
        Ok(settings)
    }
}

fn emit(loaded: &LoadedSources, output: Option<&Path>) -> Result<i32, CliError> {
    match output {
        Some(path) => {
            write_source_list(path, loaded)?;
            info!(
                path = %path.display(),
                sources = loaded.sources.len(),
                "wrote source list"
            );
        }
        None => {
            let json = source_list_json(loaded)?;
            std::io::stdout()
                .lock()
                .write_all(json.as_bytes())
                .context("failed to write source list to stdout")?;
        }
    }
    Ok(0)
}

pub(super) fn run_fault_command(args: SourceFileArgs) -> Result<i32, CliError> {
    let settings = args.load.resolve()?;
    let loaded = load_fault_sources(&args.file, &settings)?;
    emit(&loaded, args.output.as_deref())
}

pub(super) fn run_subduction_command(args: SourceFileArgs) -> Result<i32, CliError> {
    let settings = args.load.resolve()?;
    let loaded = load_subduction_sources(&args.file, &settings)?;
    emit(&loaded, args.output.as_deref())
}

pub(super) fn run_grid_command(args: GridArgs) -> Result<i32, CliError> {
    let mut settings = args.load.resolve()?;
    if args.little_endian {
        settings.byte_order = ByteOrder::LittleEndian;
    }
    let loaded = load_grid_models(&args.files, &args.weights, &settings)?;
    emit(&loaded, args.output.as_deref())
}

fn load_grid_models(
    files: &[PathBuf],
    weights: &[f64],
    settings: &SourceLoadSettings,
) -> Result<LoadedSources, CliError> {
    let cache = BinaryGridCache::new();
    if let [file] = files
        && weights.len() <= 1
    {
        let settings = SourceLoadSettings {
            file_weight: weights.first().copied().unwrap_or(settings.file_weight),
            ..settings.clone()
        };
        return Ok(load_grid_sources(file, &settings, &cache)?);
    }

    if !weights.is_empty() && weights.len() != files.len() {
        return Err(CliError::Usage(format!(
            "--weights lists {} values for {} grid files",
            weights.len(),
            files.len()
        )));
    }
    let models: Vec<WeightedGridModel> = files
        .iter()
        .enumerate()
        .map(|(index, path)| WeightedGridModel {
            path: path.clone(),
            weight: weights.get(index).copied().unwrap_or(settings.file_weight),
        })
        .collect();
    Ok(merge_grid_models(&models, settings, &cache)?)
}

pub(super) fn run_summary_command(args: SummaryArgs) -> Result<i32, CliError> {
    let settings = args.load.resolve()?;
    let loaded = match args.kind {
        ModelKind::Fault => load_fault_sources(&args.file, &settings)?,
        ModelKind::Subduction => load_subduction_sources(&args.file, &settings)?,
        ModelKind::Grid => load_grid_sources(&args.file, &settings, &BinaryGridCache::new())?,
    };

    println!("file: {}", args.file.display());
    println!("sources: {}", loaded.sources.len());
    println!("outside window: {}", loaded.report.outside_window);
    println!("rejected: {}", loaded.report.rejected_sources);
    println!("total rate: {:.6e}", loaded.total_rate());
    println!("total moment rate: {:.6e}", loaded.total_moment_rate());
    if matches!(args.kind, ModelKind::Fault | ModelKind::Subduction) {
        let header = read_fault_file_header(&args.file)?;
        let periods: Vec<String> = header
            .periods
            .iter()
            .map(|period| period.period.to_string())
            .collect();
        println!("periods: {}", periods.join(" "));
    }
    Ok(0)
}
