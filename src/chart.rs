use crate::gnuplot::line_colour;
use crate::mandelbrot::{MandelbrotRun, MandelbrotSample};
use crate::page::{ChartPlan, HistogramPage};
use anyhow::{Context, Result};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;

// Font sizes
const TITLE_FONT_SIZE: u32 = 32;
const AXIS_LABEL_FONT_SIZE: u32 = 22;
const TICK_LABEL_FONT_SIZE: u32 = 16;
const LEGEND_FONT_SIZE: u32 = 16;
const GROUP_LABEL_FONT_SIZE: u32 = 18;

const CHART_SIZE: (u32, u32) = (1000, 600);
const MARGIN_BOTTOM: u32 = 55;
const X_LABEL_AREA_SIZE: u32 = 60;

/// Share of a cluster slot covered by its bars.
const CLUSTER_WIDTH: f64 = 0.8;
const HEADROOM: f64 = 1.15;

/// Corner of the plot area holding the legend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendCorner {
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerRight,
}

impl LegendCorner {
    /// Map a gnuplot `set key` argument such as `right top` to a corner.
    pub fn from_key(key: &str) -> Self {
        let words: Vec<&str> = key.split_whitespace().collect();
        let right = words.contains(&"right");
        let bottom = words.contains(&"bottom");
        match (right, bottom) {
            (false, false) => LegendCorner::UpperLeft,
            (true, false) => LegendCorner::UpperRight,
            (false, true) => LegendCorner::LowerLeft,
            (true, true) => LegendCorner::LowerRight,
        }
    }

    fn position(self) -> SeriesLabelPosition {
        match self {
            LegendCorner::UpperLeft => SeriesLabelPosition::UpperLeft,
            LegendCorner::UpperRight => SeriesLabelPosition::UpperRight,
            LegendCorner::LowerLeft => SeriesLabelPosition::LowerLeft,
            LegendCorner::LowerRight => SeriesLabelPosition::LowerRight,
        }
    }
}

fn rgb(hex: &str) -> RGBColor {
    let channel = |range: Range<usize>| {
        hex.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .unwrap_or(0x73)
    };
    RGBColor(channel(1..3), channel(3..5), channel(5..7))
}

/// Y-axis range: from zero to the maximum with headroom, or spanning the
/// deltas around zero in comparison mode.
pub fn y_range(plan: &ChartPlan) -> Range<f64> {
    let max = plan.y_max.unwrap_or(0.0);
    if !plan.comparison {
        let top = if max > 0.0 { max * HEADROOM } else { 1.0 };
        return 0.0..top;
    }
    let low = plan.y_min.unwrap_or(0.0).min(0.0);
    let high = max.max(0.0);
    let pad = (high - low) * (HEADROOM - 1.0);
    if pad == 0.0 {
        return -1.0..1.0;
    }
    (low - pad)..(high + pad)
}

/// Horizontal slot layout of one page: each cluster of each group gets an
/// integer slot; groups are separated by one empty slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotLayout {
    /// Tick label per slot, empty for separators.
    pub labels: Vec<String>,
    /// First slot and cluster count of every group.
    pub groups: Vec<(usize, usize)>,
}

impl SlotLayout {
    pub fn of(page: &HistogramPage) -> Self {
        let mut labels = Vec::new();
        let mut groups = Vec::with_capacity(page.groups.len());
        for (n, group) in page.groups.iter().enumerate() {
            if n > 0 {
                labels.push(String::new());
            }
            groups.push((labels.len(), group.table.len()));
            labels.extend(group.table.rows().iter().map(|r| r.key().label()));
        }
        Self { labels, groups }
    }

    pub fn slots(&self) -> usize {
        self.labels.len().max(1)
    }
}

/// Output files of a benchmark: `<stem>.svg`, or `<stem>-<n>.svg` when it
/// has several pages.
pub fn page_paths(output_dir: &Path, stem: &str, pages: usize) -> Vec<PathBuf> {
    if pages == 1 {
        return vec![output_dir.join(format!("{}.svg", stem))];
    }
    (1..=pages)
        .map(|n| output_dir.join(format!("{}-{}.svg", stem, n)))
        .collect()
}

/// Draw every page of `plan` as an SVG file.
pub fn render_histogram(plan: &ChartPlan, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir).context("Failed to create output directory")?;
    let paths = page_paths(output_dir, &plan.output_stem, plan.pages.len());
    for (page, path) in plan.pages.iter().zip(&paths) {
        draw_page(plan, page, path)
            .with_context(|| format!("Failed to draw {}", path.display()))?;
    }
    Ok(paths)
}

fn draw_page(plan: &ChartPlan, page: &HistogramPage, path: &Path) -> Result<()> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let layout = SlotLayout::of(page);
    let slots = layout.slots();
    let y = y_range(plan);
    let title = page.title.replace("\\n", " - ");

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", TITLE_FONT_SIZE))
        .margin(20)
        .margin_bottom(MARGIN_BOTTOM)
        .x_label_area_size(X_LABEL_AREA_SIZE)
        .y_label_area_size(90)
        .build_cartesian_2d(-0.5..(slots as f64 - 0.5), y.clone())?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(slots)
        .x_label_formatter(&|x| {
            let idx = x.round() as usize;
            if idx < layout.labels.len() && (x - idx as f64).abs() < 0.3 {
                layout.labels[idx].clone()
            } else {
                String::new()
            }
        })
        .y_desc(plan.ylabel.as_str())
        .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
        .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE))
        .draw()?;

    let num_bars = plan.bars.len();
    let bar_width = CLUSTER_WIDTH / num_bars.max(1) as f64;
    let base = 0.0_f64.clamp(y.start, y.end);

    for (group, &(first_slot, count)) in page.groups.iter().zip(&layout.groups) {
        for (cluster_idx, row) in group.table.rows().iter().enumerate() {
            let x_center = (first_slot + cluster_idx) as f64;
            for (bar_idx, bar) in plan.bars.iter().enumerate() {
                let color = rgb(line_colour(bar_idx + 1));
                let value = row.value(bar).as_f64();
                let stddev = row.value(&format!("{} stddev", bar)).as_f64();

                let x_offset = (bar_idx as f64 - (num_bars as f64 - 1.0) / 2.0) * bar_width;
                let x_left = x_center + x_offset - bar_width / 2.0 + 0.02;
                let x_right = x_center + x_offset + bar_width / 2.0 - 0.02;
                let x_mid = (x_left + x_right) / 2.0;

                chart.draw_series(std::iter::once(Rectangle::new(
                    [(x_left, base), (x_right, value)],
                    color.mix(0.85).filled(),
                )))?;

                if stddev > 0.0 {
                    let cap = bar_width / 4.0;
                    chart.draw_series([
                        PathElement::new(vec![(x_mid, value - stddev), (x_mid, value + stddev)], BLACK),
                        PathElement::new(
                            vec![(x_mid - cap, value - stddev), (x_mid + cap, value - stddev)],
                            BLACK,
                        ),
                        PathElement::new(
                            vec![(x_mid - cap, value + stddev), (x_mid + cap, value + stddev)],
                            BLACK,
                        ),
                    ])?;
                }
            }
        }

        if let Some(label) = &group.label {
            let center = first_slot as f64 + (count.max(1) as f64 - 1.0) / 2.0;
            chart.draw_series(std::iter::once(Text::new(
                label.clone(),
                (center, y.end),
                ("sans-serif", GROUP_LABEL_FONT_SIZE)
                    .into_font()
                    .color(&BLACK)
                    .pos(Pos::new(HPos::Center, VPos::Top)),
            )))?;
        }
    }

    // Draw legend
    for (bar_idx, bar) in plan.bars.iter().enumerate() {
        let color = rgb(line_colour(bar_idx + 1));
        chart
            .draw_series(std::iter::once(Circle::new((0.0, base), 0, color.filled())))?
            .label(bar.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(LegendCorner::from_key(&plan.key).position())
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", LEGEND_FONT_SIZE))
        .draw()?;

    root.present()?;
    debug!(page = %page.title, bars = num_bars, "drew histogram page");
    Ok(())
}

/// Draw the runtime and speedup charts of the mandelbrot benchmark.
pub fn render_mandelbrot(
    runs: &[(MandelbrotRun, Vec<MandelbrotSample>)],
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir).context("Failed to create output directory")?;
    let paths = page_paths(output_dir, "mandelbrot", 2);

    let mut runtime: Vec<(String, Vec<(f64, f64)>)> = Vec::new();
    if let Some((_, first)) = runs.first() {
        runtime.push((
            "builtin".to_string(),
            first.iter().map(|s| (s.size, s.builtin_cycles / 1e9)).collect(),
        ));
    }
    for (run, samples) in runs {
        runtime.push((
            run.label.clone(),
            samples.iter().map(|s| (s.size, s.vc_cycles / 1e9)).collect(),
        ));
    }
    let speedup: Vec<(String, Vec<(f64, f64)>)> = runs
        .iter()
        .map(|(run, samples)| {
            (
                format!("{} vs. builtin", run.label),
                samples.iter().map(|s| (s.size, s.speedup())).collect(),
            )
        })
        .collect();

    draw_lines(&paths[0], "runtime [10^9 cycles]", &runtime)
        .with_context(|| format!("Failed to draw {}", paths[0].display()))?;
    draw_lines(&paths[1], "speedup", &speedup)
        .with_context(|| format!("Failed to draw {}", paths[1].display()))?;
    Ok(paths)
}

fn draw_lines(path: &Path, ylabel: &str, series: &[(String, Vec<(f64, f64)>)]) -> Result<()> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let points = series.iter().flat_map(|(_, pts)| pts.iter());
    let (x_max, y_max) = points.fold((1.0_f64, 0.0_f64), |(x, y), &(px, py)| (x.max(px), y.max(py)));

    let mut chart = ChartBuilder::on(&root)
        .caption("Mandelbrot Benchmark", ("sans-serif", TITLE_FONT_SIZE))
        .margin(20)
        .margin_bottom(MARGIN_BOTTOM)
        .x_label_area_size(X_LABEL_AREA_SIZE)
        .y_label_area_size(90)
        .build_cartesian_2d(0.0..x_max, 0.0..(y_max.max(f64::EPSILON) * HEADROOM))?;

    chart
        .configure_mesh()
        .x_desc("width/3 = height/2 [pixels]")
        .y_desc(ylabel)
        .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
        .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE))
        .draw()?;

    for (idx, (label, data)) in series.iter().enumerate() {
        let color = rgb(line_colour(idx + 1));
        chart
            .draw_series(LineSeries::new(data.clone(), color.stroke_width(2)))?
            .label(label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart.draw_series(PointSeries::of_element(
            data.clone(),
            3,
            color.filled(),
            &|coord, size, style| EmptyElement::at(coord) + Circle::new((0, 0), size, style),
        ))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", LEGEND_FONT_SIZE))
        .draw()?;

    root.present()?;
    Ok(())
}
