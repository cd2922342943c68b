use crate::config::{OutputFormat, RenderOptions};
use crate::mandelbrot::MandelbrotRun;
use crate::page::{ChartPlan, HistogramPage};
use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use tracing::debug;

/// User line styles `(index, colour)` in declaration order.
///
/// Consecutive bar series use consecutive indexes, which walk the colour
/// wheel in steps so that neighbouring bars contrast.
pub const LINE_STYLES: &[(u8, &str)] = &[
    (1, "#AF3737"),
    (15, "#AF5537"),
    (6, "#AF7337"),
    (20, "#AF9137"),
    (11, "#AFAF37"),
    (2, "#91AF37"),
    (16, "#73AF37"),
    (7, "#54963E"),
    (21, "#37AF37"),
    (12, "#37AF55"),
    (3, "#37AF73"),
    (17, "#37AF91"),
    (8, "#37AFAF"),
    (22, "#3791AF"),
    (13, "#3773AF"),
    (4, "#3755AF"),
    (18, "#3737AF"),
    (9, "#5537AF"),
    (23, "#7337AF"),
    (14, "#AF37AF"),
    (5, "#AF3791"),
    (19, "#AF3773"),
    (10, "#AF3755"),
    (24, "#737373"),
];

/// Colour of user line style `index`, cycling past the last style.
pub fn line_colour(index: usize) -> &'static str {
    let wanted = ((index.max(1) - 1) % LINE_STYLES.len()) as u8 + 1;
    LINE_STYLES
        .iter()
        .find(|(i, _)| *i == wanted)
        .map_or("#737373", |(_, c)| c)
}

/// Writes gnuplot commands and inline data for every chart of a run.
pub struct ChartScriptEmitter<W: Write> {
    out: W,
    options: RenderOptions,
    output_dir: PathBuf,
}

impl<W: Write> ChartScriptEmitter<W> {
    pub fn new(out: W, options: &RenderOptions, output_dir: &Path) -> Self {
        Self {
            out,
            options: options.clone(),
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Path of the chart file for `stem` in the configured format.
    pub fn output_path(&self, stem: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", stem, self.options.format.extension()))
    }

    /// Global style preamble, written once before the first chart.
    pub fn preamble(&mut self) -> Result<()> {
        let mut s = String::from(
            "set style line  1 lc rgbcolor \"#CCCCCC\"\n\
             set grid y ls 1\n\
             set autoscale y\n\n",
        );
        for (i, (index, colour)) in LINE_STYLES.iter().enumerate() {
            s.push_str(&format!("set style line {:>2} lc rgbcolor \"{}\"\n", index, colour));
            if i % 5 == 4 {
                s.push('\n');
            }
        }
        s.push_str("\nset style increment user\n\n");
        s.push_str(&self.terminal_line());
        s.push_str(
            "set pointsize 0.6\n\
             set bars fullwidth\n\
             set style histogram errorbars gap 1 lw 1\n\
             set style data histogram\n\
             set style fill transparent solid 0.85 border -1\n\
             set border 10\n\
             set xtics scale 0\n\
             set ytics scale 0\n\
             set y2tics scale 0\n\
             set bmargin 3.5\n\n",
        );
        self.write(&s)
    }

    fn terminal_line(&self) -> String {
        let RenderOptions { font, size, .. } = &self.options;
        match self.options.format {
            OutputFormat::Svg => format!("set terminal svg noenhanced size {} font \"{}\"\n", size, font),
            OutputFormat::Pdf => format!("set terminal pdf color noenhanced font \"{}\" size {}\n", font, size),
        }
    }

    /// Emit every page of one benchmark; returns the chart file path.
    pub fn histogram(&mut self, plan: &ChartPlan) -> Result<PathBuf> {
        let path = self.output_path(&plan.output_stem);
        let lower = if plan.comparison { "*" } else { "0" };
        let header = format!(
            "set yrange [{}:*]\nset output \"{}\"\nset ylabel \"{}\"\nset key {}\n",
            lower,
            path.display(),
            plan.ylabel,
            plan.key
        );
        self.write(&header)?;
        for page in &plan.pages {
            let script = page_script(page, plan.bars.len());
            self.write(&script)?;
        }
        debug!(benchmark = %plan.benchmark, pages = plan.pages.len(), "emitted histogram");
        Ok(path)
    }

    /// Emit the runtime and speedup line charts; returns the chart file path.
    pub fn mandelbrot(&mut self, runs: &[MandelbrotRun]) -> Result<PathBuf> {
        let Some(first) = runs.first() else {
            bail!("no mandelbrot result files to plot");
        };
        let path = self.output_path("mandelbrot");
        let terminal = match self.options.format {
            OutputFormat::Svg => "set terminal svg enhanced size 16cm,9cm font \"CM Sans,5\"",
            OutputFormat::Pdf => "set terminal pdf color enhanced font \"CM Sans,5\" size 16cm,9cm",
        };

        let mut runtime = vec![format!(
            "'{}' using 1:($3/10**9) title \"builtin\"",
            first.path.display()
        )];
        runtime.extend(runs.iter().map(|run| {
            format!(
                "'{}' using 1:($2/10**9) title \"{}\"",
                run.path.display(),
                run.label
            )
        }));
        let speedup: Vec<String> = runs
            .iter()
            .map(|run| {
                format!(
                    "'{}' using 1:($3/$2) title \"{} vs. builtin\"",
                    run.path.display(),
                    run.label
                )
            })
            .collect();

        let script = format!(
            "set ytics auto\n\
             set xtics 100\n\n\
             {terminal}\n\
             set pointsize 0.6\n\
             set output \"{output}\"\n\
             set style data linespoints\n\
             set key left top\n\n\
             set xlabel \"width/3 = height/2 [pixels]\"\n\n\
             set title \"Mandelbrot Benchmark\"\n\
             set ylabel \"runtime [10^9 cycles]\"\n\
             plot \\\n{runtime}\n\n\
             set key at -20,2.4\n\
             set ylabel \"speedup\"\n\
             plot \\\n{speedup}\n",
            terminal = terminal,
            output = path.display(),
            runtime = runtime.join(", \\\n"),
            speedup = speedup.join(", \\\n"),
        );
        self.write(&script)?;
        Ok(path)
    }

    fn write(&mut self, text: &str) -> Result<()> {
        self.out
            .write_all(text.as_bytes())
            .context("Failed to write gnuplot script")
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Title, plot command and inline data blocks of one page.
fn page_script(page: &HistogramPage, bar_count: usize) -> String {
    let mut commands = Vec::new();
    let mut data = String::new();
    for (n, group) in page.groups.iter().enumerate() {
        let first = n == 0;
        let block = group.table.data_block(first);
        for _ in 0..bar_count {
            data.push_str(&block);
        }
        if let Some(label) = &group.label {
            commands.push(format!(
                "  newhistogram \" \\r{}\" at {}",
                label,
                format_offset(group.at)
            ));
        }
        for i in 1..=bar_count {
            let column = i * 2;
            let title = if first {
                format!("title columnheader({})", column)
            } else {
                "notitle".to_string()
            };
            commands.push(format!(
                "  '-' using {}:{}:xtic(1) lt {} {}",
                column,
                column + 1,
                i,
                title
            ));
        }
    }
    format!(
        "set title \"{}\"\nplot \\\n{}\n{}\n",
        page.title,
        commands.join(", \\\n"),
        data
    )
}

/// Group offsets print as a bare `0` for the first group and with full
/// float precision afterwards.
fn format_offset(at: f64) -> String {
    if at == 0.0 {
        "0".to_string()
    } else {
        format!("{:?}", at)
    }
}

/// A running `gnuplot` reading the script from its stdin.
pub struct GnuplotProcess {
    child: Child,
    stdin: Option<ChildStdin>,
}

impl GnuplotProcess {
    pub fn spawn() -> Result<Self> {
        Self::spawn_program("gnuplot")
    }

    pub fn spawn_program(program: &str) -> Result<Self> {
        let mut child = Command::new(program)
            .stdin(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start {}", program))?;
        let stdin = child.stdin.take();
        Ok(Self { child, stdin })
    }

    /// Close the pipe and wait for the process; a non-zero exit is an error.
    pub fn finish(mut self) -> Result<()> {
        drop(self.stdin.take());
        let status = self.child.wait().context("Failed to wait for gnuplot")?;
        if !status.success() {
            bail!("gnuplot exited with {}", status);
        }
        Ok(())
    }
}

impl Write for GnuplotProcess {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.stdin.as_mut() {
            Some(stdin) => stdin.write(buf),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "gnuplot stdin already closed",
            )),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.stdin.as_mut() {
            Some(stdin) => stdin.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnSelector;
    use crate::dataset::tests::sample;
    use crate::field::Field;
    use crate::filter::ColumnFilter;
    use crate::label::LabelTranslator;
    use crate::page::SeriesGroup;
    use crate::pivot::PivotTable;

    fn table() -> PivotTable {
        let mut filters: Vec<ColumnFilter> = ["SSE", "AVX"]
            .iter()
            .flat_map(|bar| {
                let required = vec![Some(Field::label_of(*bar))];
                [
                    ColumnFilter::new(required.clone(), [(bar.to_string(), "Ops/Cycle".to_string())]),
                    ColumnFilter::new(
                        required,
                        [(format!("{} stddev", bar), "Ops/Cycle_stddev".to_string())],
                    ),
                ]
            })
            .collect();
        PivotTable::build(
            &sample(),
            &ColumnSelector::one("datatype"),
            &mut filters,
            &LabelTranslator::builtin(),
        )
        .unwrap()
    }

    fn plan(groups: Vec<SeriesGroup>, comparison: bool) -> ChartPlan {
        ChartPlan {
            benchmark: "mask".to_string(),
            output_stem: "mask".to_string(),
            ylabel: "Operations / Cycle".to_string(),
            key: "left top".to_string(),
            bars: vec!["SSE".to_string(), "AVX".to_string()],
            cluster_count: 2,
            y_min: Some(2.0),
            y_max: Some(8.5),
            comparison,
            pages: vec![HistogramPage {
                title: "Mask Operations\\nadd".to_string(),
                groups,
            }],
        }
    }

    fn emit(plan: &ChartPlan, options: &RenderOptions) -> String {
        let mut emitter = ChartScriptEmitter::new(Vec::new(), options, Path::new("out"));
        emitter.histogram(plan).unwrap();
        String::from_utf8(emitter.into_inner()).unwrap()
    }

    #[test]
    fn test_single_group_script() {
        let group = SeriesGroup {
            label: None,
            at: 0.0,
            table: table(),
        };
        let script = emit(&plan(vec![group], false), &RenderOptions::default());

        assert!(script.starts_with("set yrange [0:*]\nset output \"out/mask.pdf\"\n"));
        assert!(script.contains("set ylabel \"Operations / Cycle\"\nset key left top\n"));
        assert!(script.contains(
            "set title \"Mask Operations\\nadd\"\nplot \\\n\
             \x20 '-' using 2:3:xtic(1) lt 1 title columnheader(2), \\\n\
             \x20 '-' using 4:5:xtic(1) lt 2 title columnheader(4)\n"
        ));
        assert!(!script.contains("newhistogram"));
        // one copy of the block per bar series
        assert_eq!(script.matches("\ne\n").count(), 2);
        assert_eq!(script.matches("\"datatype\"\t\"SSE\"").count(), 2);
    }

    #[test]
    fn test_grouped_script() {
        let groups = vec![
            SeriesGroup {
                label: Some("load".to_string()),
                at: 0.0,
                table: table(),
            },
            SeriesGroup {
                label: Some("store".to_string()),
                at: 2.0 + 2.0 / 3.0,
                table: table(),
            },
        ];
        let script = emit(&plan(groups, true), &RenderOptions::default());

        assert!(script.starts_with("set yrange [*:*]\n"));
        assert!(script.contains("  newhistogram \" \\rload\" at 0, \\\n"));
        assert!(script.contains("  newhistogram \" \\rstore\" at 2.6666666666666665, \\\n"));
        assert!(script.contains("lt 1 notitle, \\\n"));
        // only the first group's blocks carry the header line
        assert_eq!(script.matches("\"datatype\"\t").count(), 2);
        assert_eq!(script.matches("\ne\n").count(), 4);
    }

    #[test]
    fn test_preamble_terminal() {
        let mut emitter = ChartScriptEmitter::new(Vec::new(), &RenderOptions::default(), Path::new("."));
        emitter.preamble().unwrap();
        let pdf = String::from_utf8(emitter.into_inner()).unwrap();
        assert!(pdf.contains("set terminal pdf color noenhanced font \"CM Sans,8\" size 19.55cm,11cm\n"));
        assert!(pdf.contains("set style line 15 lc rgbcolor \"#AF5537\"\n"));
        assert!(pdf.contains("set style increment user\n"));
        assert_eq!(pdf.matches("set style line").count(), LINE_STYLES.len() + 1);

        let svg_options = RenderOptions {
            format: OutputFormat::Svg,
            font: "Sans,10".to_string(),
            ..RenderOptions::default()
        };
        let mut emitter = ChartScriptEmitter::new(Vec::new(), &svg_options, Path::new("."));
        emitter.preamble().unwrap();
        let svg = String::from_utf8(emitter.into_inner()).unwrap();
        assert!(svg.contains("set terminal svg noenhanced size 19.55cm,11cm font \"Sans,10\"\n"));
    }

    #[test]
    fn test_mandelbrot_script() {
        let runs = vec![
            MandelbrotRun {
                path: PathBuf::from("/r/mandelbrot_avx.dat"),
                label: "Vc::AVX".to_string(),
            },
            MandelbrotRun {
                path: PathBuf::from("/r/mandelbrot_sse.dat"),
                label: "Vc::SSE".to_string(),
            },
        ];
        let mut emitter = ChartScriptEmitter::new(Vec::new(), &RenderOptions::default(), Path::new("o"));
        let path = emitter.mandelbrot(&runs).unwrap();
        let script = String::from_utf8(emitter.into_inner()).unwrap();

        assert_eq!(path, Path::new("o/mandelbrot.pdf"));
        assert!(script.contains(
            "plot \\\n'/r/mandelbrot_avx.dat' using 1:($3/10**9) title \"builtin\", \\\n\
             '/r/mandelbrot_avx.dat' using 1:($2/10**9) title \"Vc::AVX\", \\\n\
             '/r/mandelbrot_sse.dat' using 1:($2/10**9) title \"Vc::SSE\"\n"
        ));
        assert!(script.contains("title \"Vc::SSE vs. builtin\"\n"));
    }

    #[test]
    fn test_mandelbrot_without_runs_fails() {
        let mut emitter = ChartScriptEmitter::new(Vec::new(), &RenderOptions::default(), Path::new("o"));
        assert!(emitter.mandelbrot(&[]).is_err());
    }

    #[test]
    fn test_line_colour_cycles() {
        assert_eq!(line_colour(1), "#AF3737");
        assert_eq!(line_colour(2), "#91AF37");
        assert_eq!(line_colour(25), "#AF3737");
    }

    #[test]
    fn test_process_exit_status() {
        if Command::new("true").status().is_err() {
            return;
        }
        let mut ok = GnuplotProcess::spawn_program("cat").unwrap();
        ok.write_all(b"set output\n").unwrap();
        assert!(ok.finish().is_ok());

        let failing = GnuplotProcess::spawn_program("false").unwrap();
        assert!(failing.finish().is_err());
    }
}
