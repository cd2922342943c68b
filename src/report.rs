use crate::archive::ComparisonInputs;
use crate::chart;
use crate::config::{BenchmarkEntry, Registry, RenderOptions, Renderer};
use crate::error::ReportError;
use crate::gnuplot::{ChartScriptEmitter, GnuplotProcess};
use crate::mandelbrot::{self, MandelbrotRun};
use crate::page::{ChartJob, ChartPlan};
use crate::parser::{Pairing, ResultFileParser};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name selecting the mandelbrot line chart.
pub const MANDELBROT: &str = "mandelbrot";

/// What to plot and where.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Benchmarks to plot; empty means every configured benchmark plus
    /// mandelbrot.
    pub benchmarks: Vec<String>,
    /// Directory holding the current result files.
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Archives of two runs to diff instead of plotting `input_dir`.
    pub compare: Option<(PathBuf, PathBuf)>,
    pub pairing: Pairing,
    pub options: RenderOptions,
}

impl Default for RunRequest {
    fn default() -> Self {
        Self {
            benchmarks: Vec::new(),
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            compare: None,
            pairing: Pairing::default(),
            options: RenderOptions::default(),
        }
    }
}

/// Outcome of a run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Report {
    /// Chart files written (or announced to gnuplot).
    pub outputs: Vec<PathBuf>,
    /// Benchmarks without result files.
    pub skipped: Vec<String>,
}

/// Benchmarks selected by the request, in registry order, and whether the
/// mandelbrot chart is wanted.
pub fn select<'r>(
    registry: &'r Registry,
    names: &[String],
) -> std::result::Result<(Vec<&'r BenchmarkEntry>, bool), ReportError> {
    if names.is_empty() {
        return Ok((registry.benchmarks().iter().collect(), true));
    }
    for name in names {
        if name != MANDELBROT && registry.get(name).is_none() {
            return Err(ReportError::UnknownBenchmark(name.clone()));
        }
    }
    let selected = registry
        .benchmarks()
        .iter()
        .filter(|b| names.contains(&b.name))
        .collect();
    Ok((selected, names.iter().any(|n| n == MANDELBROT)))
}

/// Parse and lay out every selected benchmark that has data.
fn plan_all(
    registry: &Registry,
    request: &RunRequest,
    dirs: &[PathBuf],
) -> Result<(Vec<ChartPlan>, Vec<String>, bool)> {
    let (entries, mandelbrot) = select(registry, &request.benchmarks)?;
    let mut plans = Vec::with_capacity(entries.len());
    let mut skipped = Vec::new();

    for entry in entries {
        let translator = registry.translator_for(&entry.spec);
        let dataset = ResultFileParser::new(&entry.name, &translator)
            .with_pairing(request.pairing)
            .parse(dirs)
            .with_context(|| format!("Failed to load results of {}", entry.name))?;
        if dataset.is_empty() {
            info!(benchmark = %entry.name, "no result files, skipping");
            skipped.push(entry.name.clone());
            continue;
        }
        let plan = ChartJob {
            benchmark: &entry.name,
            spec: &entry.spec,
            translator,
            dataset,
            comparison: dirs.len() == 2,
        }
        .plan(registry.sort_order())
        .with_context(|| format!("Failed to lay out {}", entry.name))?;
        plans.push(plan);
    }
    Ok((plans, skipped, mandelbrot && request.compare.is_none()))
}

fn mandelbrot_runs(registry: &Registry, request: &RunRequest) -> Result<Vec<MandelbrotRun>> {
    let runs = mandelbrot::discover(&request.input_dir, registry.labels())?;
    if runs.is_empty() {
        info!(benchmark = MANDELBROT, "no result files, skipping");
    }
    Ok(runs)
}

/// Write the complete gnuplot script for `dirs` into `out`.
pub fn write_script<W: Write>(
    registry: &Registry,
    request: &RunRequest,
    dirs: &[PathBuf],
    out: W,
) -> Result<(W, Report)> {
    let (plans, mut skipped, mandelbrot) = plan_all(registry, request, dirs)?;
    let mut emitter = ChartScriptEmitter::new(out, &request.options, &request.output_dir);
    let mut outputs = Vec::new();

    emitter.preamble()?;
    for plan in &plans {
        outputs.push(emitter.histogram(plan)?);
    }
    if mandelbrot {
        let runs = mandelbrot_runs(registry, request)?;
        if runs.is_empty() {
            skipped.push(MANDELBROT.to_string());
        } else {
            outputs.push(emitter.mandelbrot(&runs)?);
        }
    }
    Ok((emitter.into_inner(), Report { outputs, skipped }))
}

/// Draw SVG charts for `dirs` in-process.
pub fn render_native(registry: &Registry, request: &RunRequest, dirs: &[PathBuf]) -> Result<Report> {
    let (plans, mut skipped, mandelbrot) = plan_all(registry, request, dirs)?;
    let mut outputs = Vec::new();
    for plan in &plans {
        outputs.extend(chart::render_histogram(plan, &request.output_dir)?);
    }
    if mandelbrot {
        let runs = mandelbrot_runs(registry, request)?;
        if runs.is_empty() {
            skipped.push(MANDELBROT.to_string());
        } else {
            let series = runs
                .into_iter()
                .map(|run| run.samples().map(|samples| (run, samples)))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            outputs.extend(chart::render_mandelbrot(&series, &request.output_dir)?);
        }
    }
    Ok(Report { outputs, skipped })
}

/// Run a complete plotting session: extract comparison archives if
/// requested, then hand the charts to the selected renderer.
pub fn run(registry: &Registry, request: &RunRequest) -> Result<Report> {
    // keeps the extracted directories alive until the run ends
    let inputs = match &request.compare {
        Some((first, second)) => Some(ComparisonInputs::extract(first, second)?),
        None => None,
    };
    let dirs = match &inputs {
        Some(inputs) => inputs.dirs(),
        None => vec![request.input_dir.clone()],
    };

    match (request.options.renderer, request.options.debug) {
        (Renderer::Native, _) => render_native(registry, request, &dirs),
        (Renderer::Gnuplot, true) => {
            let stdout = std::io::stdout();
            let (mut out, report) = write_script(registry, request, &dirs, stdout.lock())?;
            out.flush().context("Failed to flush script")?;
            Ok(report)
        }
        (Renderer::Gnuplot, false) => {
            ensure_output_dir(&request.output_dir)?;
            let process = GnuplotProcess::spawn()?;
            let (process, report) = write_script(registry, request, &dirs, process)?;
            process.finish()?;
            Ok(report)
        }
    }
}

fn ensure_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))
}
