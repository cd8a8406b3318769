use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use peilmerk_align::{
    AlignConfig, AlignError, AlignmentMode, AnalysisConfig, DEFAULT_TIME_TOLERANCE, OverlapConfig,
};
use peilmerk_io::{HeightDataset, HeightReader, ReferenceShifts, ResultWriter, RunName, parse_days};
use peilmerk_series::{SeriesCollection, SeriesKey, median};

#[derive(Parser)]
#[command(name = "peilmerk")]
#[command(about = "Align survey-marker height series from multiple surveys")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Input and output locations shared by every subcommand.
#[derive(Args, Debug, Clone)]
struct IoArgs {
    /// Path to the height CSV file (marker, survey, date, height)
    #[arg(long)]
    data: PathBuf,

    /// Per-survey, per-year corrections CSV (survey, year, shift)
    #[arg(long)]
    corrections: Option<PathBuf>,

    /// Run name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    name: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

/// Median analysis parameters.
#[derive(Args, Debug, Clone)]
struct AnalysisArgs {
    /// Time tolerance in days for coverage and segment gaps
    #[arg(long, default_value_t = DEFAULT_TIME_TOLERANCE)]
    time_tol: f64,

    /// Down-weight points up to this date (YYYY-MM-DD) when fitting shifts
    #[arg(long)]
    after_date: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Build the consensus curve of one marker's surveys
    Analyze {
        #[command(flatten)]
        io: IoArgs,

        /// Marker to analyse (may be omitted when the file holds one marker)
        #[arg(long)]
        marker: Option<String>,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Align one marker's surveys with a display or alignment mode
    Align {
        #[command(flatten)]
        io: IoArgs,

        /// Marker to align (may be omitted when the file holds one marker)
        #[arg(long)]
        marker: Option<String>,

        /// One of: raw, add-median, add-merge, median, all, segment
        #[arg(long, default_value = "all")]
        mode: String,

        /// Reference date (YYYY-MM-DD) at which the consensus is zeroed
        #[arg(long)]
        ref_date: String,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Align every marker and then the markers against each other
    AlignArea {
        #[command(flatten)]
        io: IoArgs,

        /// Reference date (YYYY-MM-DD) at which the grand median is zeroed
        #[arg(long)]
        ref_date: String,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Estimate the height offset between two surveys at every marker
    Compare {
        #[command(flatten)]
        io: IoArgs,

        /// Survey whose heights are the baseline
        #[arg(long)]
        survey_a: String,

        /// Survey compared against the baseline
        #[arg(long)]
        survey_b: String,

        /// Time tolerance in days for matching points
        #[arg(long, default_value_t = DEFAULT_TIME_TOLERANCE)]
        time_tol: f64,

        /// Down-weight differences before this date (YYYY-MM-DD)
        #[arg(long)]
        focus_after: Option<String>,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct AnalyzeOutput {
    run: String,
    marker: String,
    n_series: usize,
    n_segments: usize,
    segment_sizes: Vec<usize>,
    output: PathBuf,
}

#[derive(Serialize)]
struct AlignOutput {
    run: String,
    marker: String,
    mode: &'static str,
    reference_offset: Option<f64>,
    n_curves: usize,
    output: PathBuf,
}

#[derive(Serialize)]
struct AreaOutput {
    run: String,
    n_markers: usize,
    n_aligned: usize,
    reference_offset: f64,
    output: PathBuf,
}

#[derive(Serialize)]
struct CompareOutput {
    run: String,
    survey_a: String,
    survey_b: String,
    n_markers: usize,
    n_overlapping: usize,
    median_shift: Option<f64>,
    output: PathBuf,
}

fn parse_date_arg(flag: &str, raw: &str) -> Result<f64> {
    parse_days(raw).with_context(|| format!("invalid {flag} {raw:?} (expected YYYY-MM-DD)"))
}

fn parse_optional_date(flag: &str, raw: Option<&str>) -> Result<Option<f64>> {
    raw.map(|s| parse_date_arg(flag, s)).transpose()
}

fn read_dataset(data: &Path) -> Result<HeightDataset> {
    HeightReader::new(data)
        .read()
        .context("failed to read height CSV")
}

fn read_corrections(corrections: Option<&Path>) -> Result<Option<ReferenceShifts>> {
    corrections
        .map(|path| ReferenceShifts::read(path).context("failed to read corrections CSV"))
        .transpose()
}

/// Read the heights, with corrections added to the raw input.
fn load_corrected_dataset(data: &Path, corrections: Option<&Path>) -> Result<HeightDataset> {
    let dataset = read_dataset(data)?;
    match read_corrections(corrections)? {
        Some(table) => Ok(table.apply_dataset(&dataset)?),
        None => Ok(dataset),
    }
}

fn select_marker<'a>(
    dataset: &'a HeightDataset,
    marker: Option<&str>,
) -> Result<(SeriesKey, &'a SeriesCollection)> {
    match marker {
        Some(name) => {
            let key = SeriesKey::new(name);
            let surveys = dataset
                .marker(&key)
                .with_context(|| format!("marker {name:?} not found in dataset"))?;
            Ok((key, surveys))
        }
        None => {
            let mut markers = dataset.markers().iter();
            match (markers.next(), markers.next()) {
                (Some((key, surveys)), None) => Ok((key.clone(), surveys)),
                _ => anyhow::bail!(
                    "dataset holds {} markers; choose one with --marker",
                    dataset.n_markers()
                ),
            }
        }
    }
}

fn analysis_config(args: &AnalysisArgs) -> Result<AnalysisConfig> {
    let after_date = parse_optional_date("--after-date", args.after_date.as_deref())?;
    Ok(AnalysisConfig::new()
        .with_time_tolerance(args.time_tol)
        .with_after_date(after_date))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Analyze {
            io,
            marker,
            analysis,
        } => {
            let run = RunName::new(io.name.clone())?;
            let dataset = load_corrected_dataset(&io.data, io.corrections.as_deref())?;
            let (marker, surveys) = select_marker(&dataset, marker.as_deref())?;

            let config = analysis_config(&analysis)?;
            let result = config
                .analyze(surveys)
                .with_context(|| format!("analysis of marker {marker} failed"))?;

            let writer = ResultWriter::new(&io.output_dir, run)?;
            let output = writer.write_analysis(&result)?;

            let summary = AnalyzeOutput {
                run: io.name,
                marker: marker.to_string(),
                n_series: result.assignments.len(),
                n_segments: result.segments.len(),
                segment_sizes: result.segment_sizes(),
                output,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Align {
            io,
            marker,
            mode,
            ref_date,
            analysis,
        } => {
            let run = RunName::new(io.name.clone())?;
            let mode: AlignmentMode = mode.parse()?;
            let ref_date = parse_date_arg("--ref-date", &ref_date)?;
            let dataset = read_dataset(&io.data)?;
            let corrections = read_corrections(io.corrections.as_deref())?;
            let (marker, surveys) = select_marker(&dataset, marker.as_deref())?;

            let config = AlignConfig::new(ref_date).with_analysis(analysis_config(&analysis)?);
            let writer = ResultWriter::new(&io.output_dir, run)?;

            // corrections go on top of the aligned output
            let (reference_offset, n_curves, output) = match mode {
                AlignmentMode::Raw | AlignmentMode::AddMedian | AlignmentMode::AddMerge => {
                    let mut curves = config
                        .apply(mode, surveys)
                        .with_context(|| format!("{mode} of marker {marker} failed"))?;
                    if let Some(table) = &corrections {
                        curves = table.apply_curves(&curves)?;
                    }
                    (None, curves.len(), writer.write_curves(mode, &curves)?)
                }
                AlignmentMode::AlignMedian | AlignmentMode::AlignAll | AlignmentMode::AlignSegment => {
                    let found = match mode {
                        AlignmentMode::AlignMedian => Some(config.align_median(surveys)?),
                        AlignmentMode::AlignAll => Some(config.align_all(surveys)?),
                        _ => config.align_segment(surveys)?,
                    };
                    match found {
                        Some(mut alignment) => {
                            if let Some(table) = &corrections {
                                alignment = table.apply_alignment(&alignment)?;
                            }
                            (
                                Some(alignment.reference_offset),
                                alignment.curves.len(),
                                writer.write_alignment(mode, &alignment)?,
                            )
                        }
                        None => {
                            warn!(%marker, ref_date, "no segment covers the reference date");
                            (None, 0, writer.write_curves(mode, &BTreeMap::new())?)
                        }
                    }
                }
            };

            let summary = AlignOutput {
                run: io.name,
                marker: marker.to_string(),
                mode: mode.as_str(),
                reference_offset,
                n_curves,
                output,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::AlignArea {
            io,
            ref_date,
            analysis,
        } => {
            let run = RunName::new(io.name.clone())?;
            let ref_date = parse_date_arg("--ref-date", &ref_date)?;
            let dataset = read_dataset(&io.data)?;
            let corrections = read_corrections(io.corrections.as_deref())?;

            let config = AlignConfig::new(ref_date).with_analysis(analysis_config(&analysis)?);
            let mut result = config
                .align_two_level(dataset.markers())
                .context("two-level alignment failed")?;
            if let Some(table) = &corrections {
                result = table.apply_two_level(&result)?;
            }

            let writer = ResultWriter::new(&io.output_dir, run)?;
            let output = writer.write_two_level(&result)?;

            let summary = AreaOutput {
                run: io.name,
                n_markers: result.markers.len(),
                n_aligned: result.marker_shifts.len(),
                reference_offset: result.reference_offset,
                output,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Compare {
            io,
            survey_a,
            survey_b,
            time_tol,
            focus_after,
        } => {
            let run = RunName::new(io.name.clone())?;
            let focus_after = parse_optional_date("--focus-after", focus_after.as_deref())?;
            let dataset = load_corrected_dataset(&io.data, io.corrections.as_deref())?;

            let config = OverlapConfig::new()
                .with_time_tolerance(time_tol)
                .with_focus_after(focus_after);
            let key_a = SeriesKey::new(survey_a.as_str());
            let key_b = SeriesKey::new(survey_b.as_str());

            let mut shifts = BTreeMap::new();
            for (marker, surveys) in dataset.markers() {
                let shift = match (surveys.get(&key_a), surveys.get(&key_b)) {
                    (Some(a), Some(b)) => match config.shift(a, b) {
                        Ok(dz) => Some(dz),
                        Err(AlignError::NoOverlap) => None,
                        Err(e) => {
                            return Err(e)
                                .with_context(|| format!("comparison at marker {marker} failed"));
                        }
                    },
                    _ => None,
                };
                shifts.insert(marker.clone(), shift);
            }

            let writer = ResultWriter::new(&io.output_dir, run)?;
            let output = writer.write_overlap(&survey_a, &survey_b, &shifts)?;

            let mut found: Vec<f64> = shifts.values().flatten().copied().collect();
            let summary = CompareOutput {
                run: io.name,
                survey_a,
                survey_b,
                n_markers: shifts.len(),
                n_overlapping: found.len(),
                median_shift: median(&mut found),
                output,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
