use crate::error::{ReportError, Result};
use crate::label::LabelTranslator;
use crate::sort_order::SortOrder;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Chart dimension that may be reordered by the global sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDimension {
    Pages,
    Groups,
    Bars,
    Clusters,
}

/// One or more schema columns defining a chart dimension.
///
/// Deserializes from either a single column name or a list of names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "ColumnsRepr")]
pub struct ColumnSelector(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnsRepr {
    One(String),
    Many(Vec<String>),
}

impl From<ColumnsRepr> for ColumnSelector {
    fn from(repr: ColumnsRepr) -> Self {
        match repr {
            ColumnsRepr::One(c) => ColumnSelector(vec![c]),
            ColumnsRepr::Many(cs) => ColumnSelector(cs),
        }
    }
}

impl ColumnSelector {
    pub fn one(column: &str) -> Self {
        ColumnSelector(vec![column.to_string()])
    }

    pub fn many(columns: &[&str]) -> Self {
        ColumnSelector(columns.iter().map(|c| c.to_string()).collect())
    }

    pub fn columns(&self) -> &[String] {
        &self.0
    }

    /// Header caption used for the pivot key column.
    pub fn caption(&self) -> String {
        self.0.join(", ")
    }
}

/// Chart configuration of one benchmark.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    /// Legend position, passed verbatim to `set key`.
    #[serde(default = "default_key")]
    pub key: String,
    #[serde(default)]
    pub sort: Vec<SortDimension>,
    #[serde(default)]
    pub page_column: Option<ColumnSelector>,
    #[serde(default)]
    pub group_column: Option<ColumnSelector>,
    pub bar_columns: ColumnSelector,
    pub cluster_columns: ColumnSelector,
    pub data_column: String,
    #[serde(default)]
    pub label_translation: BTreeMap<String, String>,
    #[serde(default)]
    pub ylabel: Option<String>,
    #[serde(default)]
    pub outname: Option<String>,
}

fn default_key() -> String {
    "left top".to_string()
}

impl ChartSpec {
    fn new(bars: ColumnSelector, clusters: ColumnSelector, data_column: &str) -> Self {
        Self {
            key: default_key(),
            sort: Vec::new(),
            page_column: None,
            group_column: None,
            bar_columns: bars,
            cluster_columns: clusters,
            data_column: data_column.to_string(),
            label_translation: BTreeMap::new(),
            ylabel: None,
            outname: None,
        }
    }

    fn key(mut self, key: &str) -> Self {
        self.key = key.to_string();
        self
    }

    fn sort(mut self, dims: &[SortDimension]) -> Self {
        self.sort = dims.to_vec();
        self
    }

    fn pages(mut self, columns: ColumnSelector) -> Self {
        self.page_column = Some(columns);
        self
    }

    fn groups(mut self, columns: ColumnSelector) -> Self {
        self.group_column = Some(columns);
        self
    }

    fn labels(mut self, labels: &[(&str, &str)]) -> Self {
        self.label_translation = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    fn ylabel(mut self, ylabel: &str) -> Self {
        self.ylabel = Some(ylabel.to_string());
        self
    }

    pub fn sorts(&self, dim: SortDimension) -> bool {
        self.sort.contains(&dim)
    }

    /// Axis caption: the explicit label, else the data column with spaced slashes.
    pub fn y_label(&self) -> String {
        match &self.ylabel {
            Some(label) => label.clone(),
            None => self.data_column.replacen('/', " / ", 1),
        }
    }

    /// File stem of the chart output.
    pub fn output_stem<'a>(&'a self, benchmark: &'a str) -> &'a str {
        self.outname.as_deref().unwrap_or(benchmark)
    }
}

/// A named benchmark and its chart configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BenchmarkEntry {
    pub name: String,
    #[serde(flatten)]
    pub spec: ChartSpec,
}

/// JSON overlay accepted by [`Registry::apply_file`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default)]
    sort_order: Option<Vec<String>>,
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    benchmarks: Vec<BenchmarkEntry>,
}

/// Immutable benchmark configuration table plus the global label
/// dictionary and sort order.
#[derive(Debug, Clone)]
pub struct Registry {
    benchmarks: Vec<BenchmarkEntry>,
    labels: LabelTranslator,
    sort_order: SortOrder,
}

impl Registry {
    /// Built-in configuration for the Vc benchmark suite.
    pub fn builtin() -> Self {
        use SortDimension::*;

        let wrapper = ChartSpec::new(
            ColumnSelector::one("benchmark.name"),
            ColumnSelector::one("Implementation"),
            "Bytes/Cycle",
        )
        .key("right top")
        .sort(&[Groups, Bars, Clusters])
        .pages(ColumnSelector::many(&["datatype", "Member Count"]))
        .labels(&[
            ("2", "2 Entries"),
            ("3", "3 Entries"),
            ("4", "4 Entries"),
            ("5", "5 Entries"),
            ("6", "6 Entries"),
            ("7", "7 Entries"),
            ("8", "8 Entries"),
        ]);

        let memio = ChartSpec::new(
            ColumnSelector::many(&["Alignment", "Implementation"]),
            ColumnSelector::one("datatype"),
            "Bytes/Cycle",
        )
        .key("right top")
        .sort(&[Groups, Bars, Clusters])
        .pages(ColumnSelector::one("MemorySize"))
        .groups(ColumnSelector::one("benchmark.name"))
        .labels(&[
            ("read", "load"),
            ("write", "store"),
            ("r/w", "load \\& store"),
            ("aligned", "Aligned"),
            (
                "aligned mem/unaligned instr",
                "Aligned Memory, Unaligned Instruction",
            ),
            ("unaligned", "Unaligned"),
        ]);

        let arithmetics = ChartSpec::new(
            ColumnSelector::one("Implementation"),
            ColumnSelector::one("benchmark.name"),
            "Ops/Cycle",
        )
        .sort(&[Pages, Bars])
        .pages(ColumnSelector::one("datatype"))
        .groups(ColumnSelector::one("unrolling"))
        .labels(&[("arithmetics", "Arithmetic Operations")])
        .ylabel("Operations / Cycle");

        let flops = ChartSpec::new(
            ColumnSelector::one("benchmark.name"),
            ColumnSelector::one("Implementation"),
            "FLOPs/Cycle",
        )
        .sort(&[Clusters, Bars])
        .labels(&[
            ("flops", "Peak-Flop Benchmark"),
            ("asm reference", "Assembler"),
            ("intrinsics reference", "Intrinsics"),
            ("class", "Vc"),
        ])
        .ylabel("Floating-Point Operations / Cycle");

        let spread = ChartSpec::new(
            ColumnSelector::one("Implementation"),
            ColumnSelector::one("datatype"),
            "Values/Cycle",
        )
        .sort(&[Bars, Clusters])
        .pages(ColumnSelector::one("index spread"))
        .groups(ColumnSelector::one("benchmark.name"));

        let by_benchmark = |bars: &str, clusters: &str| {
            ChartSpec::new(
                ColumnSelector::one(bars),
                ColumnSelector::one(clusters),
                "Ops/Cycle",
            )
            .pages(ColumnSelector::one("benchmark.name"))
            .ylabel("Operations / Cycle")
        };

        let rock = ChartSpec::new(
            ColumnSelector::one("Implementation"),
            ColumnSelector::one("benchmark.name"),
            "Ops/Cycle",
        )
        .sort(&[Bars])
        .ylabel("Operations / Cycle");

        let benchmarks = vec![
            ("interleavedmemorywrapper", wrapper),
            ("memio", memio),
            ("arithmetics", arithmetics.clone()),
            ("arithmetics2", arithmetics),
            ("flops", flops),
            ("gather", spread.clone()),
            ("scatter", spread),
            (
                "mask",
                by_benchmark("datatype", "Implementation").sort(&[Bars, Clusters]),
            ),
            (
                "compare",
                by_benchmark("datatype", "Implementation")
                    .sort(&[Bars, Clusters])
                    .labels(&[("compare", "Compare Operations")]),
            ),
            (
                "math",
                by_benchmark("Implementation", "datatype").sort(&[Pages, Bars, Clusters]),
            ),
            ("dhryrock", rock.clone()),
            ("whetrock", rock),
        ];

        Self {
            benchmarks: benchmarks
                .into_iter()
                .map(|(name, spec)| BenchmarkEntry {
                    name: name.to_string(),
                    spec,
                })
                .collect(),
            labels: LabelTranslator::builtin(),
            sort_order: SortOrder::builtin(),
        }
    }

    /// Load a JSON overlay file on top of this registry.
    pub fn apply_file(self, path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
        let overlay: ConfigFile =
            serde_json::from_str(&text).map_err(|source| ReportError::Config {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(self.apply(overlay))
    }

    /// Apply a JSON overlay given as a string.
    pub fn apply_json(self, json: &str) -> std::result::Result<Self, serde_json::Error> {
        let overlay: ConfigFile = serde_json::from_str(json)?;
        Ok(self.apply(overlay))
    }

    fn apply(mut self, overlay: ConfigFile) -> Self {
        if let Some(order) = overlay.sort_order {
            self.sort_order = SortOrder::new(order);
        }
        self.labels = self.labels.merged(&overlay.labels);
        for entry in overlay.benchmarks {
            match self.benchmarks.iter_mut().find(|b| b.name == entry.name) {
                Some(existing) => *existing = entry,
                None => self.benchmarks.push(entry),
            }
        }
        self
    }

    pub fn benchmarks(&self) -> &[BenchmarkEntry] {
        &self.benchmarks
    }

    pub fn get(&self, name: &str) -> Option<&ChartSpec> {
        self.benchmarks
            .iter()
            .find(|b| b.name == name)
            .map(|b| &b.spec)
    }

    pub fn sort_order(&self) -> &SortOrder {
        &self.sort_order
    }

    /// Global dictionary without any per-benchmark overrides.
    pub fn labels(&self) -> &LabelTranslator {
        &self.labels
    }

    /// Global dictionary merged with the benchmark's own overrides.
    pub fn translator_for(&self, spec: &ChartSpec) -> LabelTranslator {
        self.labels.merged(&spec.label_translation)
    }
}

/// Output file format of the gnuplot terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Pdf,
    Svg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Svg => "svg",
        }
    }
}

/// Which backend turns page models into chart files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Renderer {
    /// Stream a script into an external gnuplot process
    #[default]
    Gnuplot,
    /// Draw SVG charts in-process
    Native,
}

/// Style and output options shared by every chart of a run.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Terminal font as `family,size`.
    pub font: String,
    /// Page size as `width,height`.
    pub size: String,
    pub format: OutputFormat,
    pub renderer: Renderer,
    /// Write the script to stdout instead of running gnuplot.
    pub debug: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            font: "CM Sans,8".to_string(),
            size: "19.55cm,11cm".to_string(),
            format: OutputFormat::Pdf,
            renderer: Renderer::Gnuplot,
            debug: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table() {
        let registry = Registry::builtin();
        let names: Vec<&str> = registry.benchmarks().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "interleavedmemorywrapper",
                "memio",
                "arithmetics",
                "arithmetics2",
                "flops",
                "gather",
                "scatter",
                "mask",
                "compare",
                "math",
                "dhryrock",
                "whetrock",
            ]
        );

        let memio = registry.get("memio").unwrap();
        assert_eq!(memio.key, "right top");
        assert_eq!(memio.bar_columns.columns(), &["Alignment", "Implementation"]);
        assert!(memio.sorts(SortDimension::Clusters));
        assert!(!memio.sorts(SortDimension::Pages));

        let flops = registry.get("flops").unwrap();
        assert_eq!(flops.bar_columns.columns(), &["benchmark.name"]);
        assert_eq!(flops.cluster_columns.columns(), &["Implementation"]);

        let gather = registry.get("gather").unwrap();
        assert_eq!(gather.key, "left top");
        assert_eq!(gather.y_label(), "Values / Cycle");
    }

    #[test]
    fn test_translator_for_merges_overrides() {
        let registry = Registry::builtin();
        let tr = registry.translator_for(registry.get("flops").unwrap());
        assert_eq!(tr.translate("flops"), "Peak-Flop Benchmark");
        assert_eq!(tr.translate("sse"), "SSE");
        assert_eq!(registry.labels().translate("flops"), "Peak Flop Benchmark");
    }

    #[test]
    fn test_json_overlay() {
        let json = r#"{
            "sortOrder": ["B", "A"],
            "labels": {"foo": "Foo"},
            "benchmarks": [
                {"name": "flops", "barColumns": "Implementation",
                 "clusterColumns": ["benchmark.name"], "dataColumn": "FLOPs/Cycle",
                 "key": "right top", "sort": ["bars"]},
                {"name": "newbench", "barColumns": ["a", "b"],
                 "clusterColumns": "c", "dataColumn": "X/Y", "outname": "nb"}
            ]
        }"#;
        let registry = Registry::builtin().apply_json(json).unwrap();

        let flops = registry.get("flops").unwrap();
        assert_eq!(flops.key, "right top");
        assert_eq!(flops.sort, vec![SortDimension::Bars]);
        assert!(flops.ylabel.is_none());
        assert_eq!(registry.benchmarks()[4].name, "flops");

        let nb = registry.get("newbench").unwrap();
        assert_eq!(nb.key, "left top");
        assert_eq!(nb.output_stem("newbench"), "nb");
        assert_eq!(nb.bar_columns.caption(), "a, b");
        assert_eq!(registry.benchmarks().last().unwrap().name, "newbench");

        assert_eq!(registry.labels().translate("foo"), "Foo");
        assert_eq!(
            registry.sort_order().rank("B"),
            crate::sort_order::SortKey::Ranked(0)
        );
    }

    #[test]
    fn test_overlay_file_errors_are_typed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Registry::builtin().apply_file(&path).unwrap_err();
        assert!(matches!(err, ReportError::Config { .. }));
    }

    #[test]
    fn test_render_defaults() {
        let opts = RenderOptions::default();
        assert_eq!(opts.font, "CM Sans,8");
        assert_eq!(opts.size, "19.55cm,11cm");
        assert_eq!(opts.format.extension(), "pdf");
        assert_eq!(opts.renderer, Renderer::Gnuplot);
    }
}
