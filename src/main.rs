use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use vc_bench_plot::report::MANDELBROT;
use vc_bench_plot::{run, OutputFormat, Pairing, Registry, RenderOptions, Renderer, RunRequest};

#[derive(Parser)]
#[command(name = "vc-bench-plot")]
#[command(about = "Plot Vc benchmark result files as grouped histograms")]
struct Cli {
    /// Benchmarks to plot (default: all, including mandelbrot)
    benchmarks: Vec<String>,

    /// Only print the gnuplot script to stdout
    #[arg(long)]
    debug: bool,

    /// Terminal font as <family,size>
    #[arg(long, value_name = "FAMILY,SIZE")]
    font: Option<String>,

    /// Page size as <w,h>
    #[arg(long, value_name = "W,H")]
    size: Option<String>,

    /// Output SVG instead of PDF
    #[arg(long)]
    svg: bool,

    /// Plot the differences between two archived benchmark runs
    #[arg(long, num_args = 2, value_names = ["ARCHIVE1", "ARCHIVE2"])]
    compare: Option<Vec<PathBuf>>,

    /// Pair comparison rows by their label columns instead of by position
    #[arg(long, requires = "compare")]
    pair_by_key: bool,

    /// Chart backend
    #[arg(long, value_enum, default_value_t = Renderer::Gnuplot)]
    renderer: Renderer,

    /// Directory containing the result files
    #[arg(short, long, default_value = ".")]
    input: PathBuf,

    /// Output directory for charts
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// JSON file overriding benchmark configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// List available benchmarks and exit
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut registry = Registry::builtin();
    if let Some(path) = &cli.config {
        registry = registry
            .apply_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?;
    }

    if cli.list {
        println!("Available benchmarks:");
        for entry in registry.benchmarks() {
            println!("  {}", entry.name);
        }
        println!("  {}", MANDELBROT);
        return Ok(());
    }

    let defaults = RenderOptions::default();
    let options = RenderOptions {
        font: cli.font.unwrap_or(defaults.font),
        size: cli.size.unwrap_or(defaults.size),
        format: if cli.svg { OutputFormat::Svg } else { OutputFormat::Pdf },
        renderer: cli.renderer,
        debug: cli.debug,
    };

    let compare = match cli.compare.as_deref() {
        Some([first, second]) => Some((first.clone(), second.clone())),
        _ => None,
    };

    let request = RunRequest {
        benchmarks: cli.benchmarks,
        input_dir: cli.input,
        output_dir: cli.output,
        compare,
        pairing: if cli.pair_by_key { Pairing::Keyed } else { Pairing::Positional },
        options,
    };

    let report = run(&registry, &request)?;
    info!(
        charts = report.outputs.len(),
        skipped = report.skipped.len(),
        "done"
    );
    for path in &report.outputs {
        info!("Generated: {}", path.display());
    }
    Ok(())
}
