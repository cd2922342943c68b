use crate::config::{ChartSpec, SortDimension};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::field::Field;
use crate::filter::ColumnFilter;
use crate::label::LabelTranslator;
use crate::pivot::PivotTable;
use crate::sort_order::SortOrder;
use tracing::debug;

/// A value of the page, group or bar dimension: its display label and the
/// raw fields rows must contain to belong to it.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionValue {
    pub display: String,
    pub raw: Vec<Field>,
}

impl DimensionValue {
    /// The single value of a dimension that is not configured.
    pub fn whole() -> Self {
        Self {
            display: String::new(),
            raw: Vec::new(),
        }
    }

    fn from_raw(raw: Vec<Field>, translator: &LabelTranslator) -> Self {
        let labels = raw_labels(&raw);
        Self {
            display: translator.translate_all(&labels),
            raw,
        }
    }

    pub fn is_whole(&self) -> bool {
        self.raw.is_empty()
    }

    fn labels(&self) -> Vec<String> {
        raw_labels(&self.raw)
    }
}

fn raw_labels(raw: &[Field]) -> Vec<String> {
    raw.iter().map(Field::label).collect()
}

/// One group of bar series on a page: a pivot table keyed by cluster with a
/// value and a stddev column per bar.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesGroup {
    /// Secondary x-axis caption; `None` when groups are not configured.
    pub label: Option<String>,
    /// Horizontal offset of the group on the histogram axis.
    pub at: f64,
    pub table: PivotTable,
}

/// One complete chart.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramPage {
    pub title: String,
    pub groups: Vec<SeriesGroup>,
}

/// Everything needed to draw all pages of one benchmark.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPlan {
    pub benchmark: String,
    pub output_stem: String,
    pub ylabel: String,
    pub key: String,
    /// Bar series titles in drawing order.
    pub bars: Vec<String>,
    pub cluster_count: usize,
    /// Data range of the plotted column; `None` for an empty dataset.
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
    /// Plotting deltas of two runs: the y-range is left to auto-scaling.
    pub comparison: bool,
    pub pages: Vec<HistogramPage>,
}

/// One benchmark's configuration together with its parsed dataset.
pub struct ChartJob<'a> {
    pub benchmark: &'a str,
    pub spec: &'a ChartSpec,
    pub translator: LabelTranslator,
    pub dataset: Dataset,
    pub comparison: bool,
}

impl<'a> ChartJob<'a> {
    /// Enumerate dimensions, build the filters and pivot every page.
    pub fn plan(mut self, order: &SortOrder) -> Result<ChartPlan> {
        let spec = self.spec;
        let tr = &self.translator;
        let data_column = self.dataset.resolve_data_column(&spec.data_column);
        let stddev_column = format!("{}_stddev", data_column);
        let has_stddev = self.dataset.column_index(&stddev_column).is_some();
        if !has_stddev {
            debug!(benchmark = self.benchmark, column = %stddev_column, "no stddev column, error bars are zero");
        }
        let y_max = self.dataset.maximum(&data_column)?;
        let y_min = self.dataset.minimum(&data_column)?;

        let mut pages: Vec<DimensionValue> = match self.dataset.distinct(spec.page_column.as_ref()) {
            Some(values) => values
                .into_iter()
                .map(|raw| DimensionValue::from_raw(raw, tr))
                .collect(),
            None => vec![DimensionValue::whole()],
        };
        if spec.sorts(SortDimension::Pages) {
            order.sort_by_labels(&mut pages, DimensionValue::labels);
        }

        let mut groups: Vec<DimensionValue> = match self.dataset.distinct(spec.group_column.as_ref()) {
            Some(values) => values
                .into_iter()
                .map(|raw| DimensionValue::from_raw(raw, tr))
                .collect(),
            None => vec![DimensionValue::whole()],
        };
        if spec.sorts(SortDimension::Groups) {
            order.sort_by_labels(&mut groups, display_then_raw);
        }

        self.dataset.require_columns(spec.bar_columns.columns())?;
        let mut bars: Vec<DimensionValue> = self
            .dataset
            .distinct(Some(&spec.bar_columns))
            .unwrap_or_default()
            .into_iter()
            .map(|raw| DimensionValue::from_raw(raw, tr))
            .collect();
        if spec.sorts(SortDimension::Bars) {
            order.sort_by_labels(&mut bars, display_then_raw);
        }

        let cluster_columns = spec.cluster_columns.columns();
        self.dataset.require_columns(cluster_columns)?;
        let cluster_count = self
            .dataset
            .distinct(Some(&spec.cluster_columns))
            .map_or(0, |c| c.len());
        if spec.sorts(SortDimension::Clusters) {
            self.dataset.sort_rows(cluster_columns, order)?;
        }

        let bar_titles: Vec<String> = bars.iter().map(|b| b.display.clone()).collect();
        let advance = cluster_count as f64 + 2.0 / (bars.len() as f64 + 1.0);

        let mut planned = Vec::with_capacity(pages.len());
        for page in &pages {
            let mut at = 0.0;
            let mut series = Vec::with_capacity(groups.len());
            for group in &groups {
                let mut filters = Vec::with_capacity(bars.len() * 2);
                for bar in &bars {
                    let required: Vec<Option<Field>> = page
                        .raw
                        .iter()
                        .chain(&group.raw)
                        .chain(&bar.raw)
                        .cloned()
                        .map(Some)
                        .collect();
                    filters.push(ColumnFilter::new(
                        required.clone(),
                        [(bar.display.clone(), data_column.clone())],
                    ));
                    let stddev_name = format!("{} stddev", bar.display);
                    filters.push(if has_stddev {
                        ColumnFilter::new(required, [(stddev_name, stddev_column.clone())])
                    } else {
                        ColumnFilter::placeholder(required, stddev_name)
                    });
                }
                let table = PivotTable::build(
                    &self.dataset,
                    &spec.cluster_columns,
                    &mut filters,
                    tr,
                )?;
                series.push(SeriesGroup {
                    label: (!group.is_whole()).then(|| group.display.clone()),
                    at,
                    table,
                });
                at += advance;
            }

            let mut title = tr.translate(self.benchmark);
            if !page.is_whole() {
                title.push_str("\\n");
                title.push_str(&tr.translate_all(&page.labels()));
            }
            planned.push(HistogramPage {
                title,
                groups: series,
            });
        }

        Ok(ChartPlan {
            benchmark: self.benchmark.to_string(),
            output_stem: spec.output_stem(self.benchmark).to_string(),
            ylabel: spec.y_label(),
            key: spec.key.clone(),
            bars: bar_titles,
            cluster_count,
            y_min,
            y_max,
            comparison: self.comparison,
            pages: planned,
        })
    }
}

/// Group and bar ordering: translated label first, raw labels as tiebreak.
fn display_then_raw(value: &DimensionValue) -> Vec<String> {
    let mut key = vec![value.display.clone()];
    key.extend(value.labels());
    key
}
