use crate::config::ColumnSelector;
use crate::error::{ReportError, Result};
use crate::field::Field;
use crate::sort_order::SortOrder;

/// Name of the column appended to every row, holding the variant label
/// derived from the result file name.
pub const VARIANT_COLUMN: &str = "Implementation";

/// Rows of one benchmark, all sharing a schema and format version.
///
/// Built once by [`crate::parser::ResultFileParser`]; afterwards only
/// [`Dataset::sort_rows`] reorders it.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    benchmark: String,
    version: Option<u32>,
    columns: Vec<String>,
    rows: Vec<Vec<Field>>,
}

impl Dataset {
    pub(crate) fn new(
        benchmark: &str,
        version: Option<u32>,
        columns: Vec<String>,
        rows: Vec<Vec<Field>>,
    ) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self {
            benchmark: benchmark.to_string(),
            version,
            columns,
            rows,
        }
    }

    pub fn benchmark(&self) -> &str {
        &self.benchmark
    }

    /// Format version; `None` when no result file was found.
    pub fn version(&self) -> Option<u32> {
        self.version
    }

    /// Schema column names, the variant column last.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Field>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Resolve every column or fail with [`ReportError::UnknownColumn`].
    pub fn require_columns(&self, names: &[String]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| ReportError::UnknownColumn {
                        column: name.clone(),
                        schema: self.columns.clone(),
                    })
            })
            .collect()
    }

    /// Data column to plot for this dataset.
    ///
    /// Format version 3 renamed `Xs/Y` columns to `X/Ys`; the renamed column
    /// is used when the configured one is missing and the renamed one exists.
    pub fn resolve_data_column(&self, configured: &str) -> String {
        if self.version != Some(3) || self.column_index(configured).is_some() {
            return configured.to_string();
        }
        let Some((numerator, denominator)) = configured.split_once('/') else {
            return configured.to_string();
        };
        match numerator.strip_suffix('s') {
            Some(stem) if !stem.is_empty() && !denominator.is_empty() && !denominator.contains('/') => {
                let renamed = format!("{}/{}s", stem, denominator);
                if self.column_index(&renamed).is_some() {
                    renamed
                } else {
                    configured.to_string()
                }
            }
            _ => configured.to_string(),
        }
    }

    /// Distinct value tuples of `selector`'s columns in first-seen order.
    ///
    /// `None` when no selector is given, a column is missing, or the dataset
    /// has no rows.
    pub fn distinct(&self, selector: Option<&ColumnSelector>) -> Option<Vec<Vec<Field>>> {
        let selector = selector?;
        if self.rows.is_empty() {
            return None;
        }
        let indexes: Vec<usize> = selector
            .columns()
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Option<_>>()?;

        let mut seen: Vec<Vec<Field>> = Vec::new();
        for row in &self.rows {
            let tuple: Vec<Field> = indexes.iter().map(|&i| row[i].clone()).collect();
            if !seen.contains(&tuple) {
                seen.push(tuple);
            }
        }
        Some(seen)
    }

    /// Largest numeric value of `column`, `None` for an empty dataset.
    pub fn maximum(&self, column: &str) -> Result<Option<f64>> {
        self.fold_column(column, f64::max)
    }

    /// Smallest numeric value of `column`, `None` for an empty dataset.
    pub fn minimum(&self, column: &str) -> Result<Option<f64>> {
        self.fold_column(column, f64::min)
    }

    fn fold_column(&self, column: &str, pick: fn(f64, f64) -> f64) -> Result<Option<f64>> {
        let index = self.require_columns(&[column.to_string()])?[0];
        Ok(self
            .rows
            .iter()
            .map(|row| row[index].as_f64())
            .reduce(pick))
    }

    /// Stable reorder of the rows by the rank tuple of `columns`.
    pub fn sort_rows(&mut self, columns: &[String], order: &SortOrder) -> Result<()> {
        let indexes = self.require_columns(columns)?;
        self.rows.sort_by_cached_key(|row| {
            indexes
                .iter()
                .map(|&i| order.rank(&row[i].label()))
                .collect::<Vec<_>>()
        });
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample() -> Dataset {
        let columns = vec![
            "benchmark.name".to_string(),
            "datatype".to_string(),
            "Ops/Cycle".to_string(),
            "Ops/Cycle_stddev".to_string(),
            VARIANT_COLUMN.to_string(),
        ];
        let row = |name: &str, ty: &str, v: f64, s: f64, imp: &str| {
            vec![
                Field::label_of(name),
                Field::label_of(ty),
                Field::Float(v),
                Field::Float(s),
                Field::label_of(imp),
            ]
        };
        let rows = vec![
            row("add", "double_v", 2.0, 0.1, "SSE"),
            row("add", "float_v", 4.0, 0.2, "SSE"),
            row("add", "double_v", 4.5, 0.1, "AVX"),
            row("add", "float_v", 8.5, 0.3, "AVX"),
            row("mul", "float_v", 7.0, 0.2, "Scalar"),
        ];
        Dataset::new("mask", Some(2), columns, rows)
    }

    #[test]
    fn test_distinct_first_seen() {
        let ds = sample();
        let types = ds.distinct(Some(&ColumnSelector::one("datatype"))).unwrap();
        assert_eq!(
            types,
            vec![vec![Field::label_of("double_v")], vec![Field::label_of("float_v")]]
        );

        let pairs = ds
            .distinct(Some(&ColumnSelector::many(&["benchmark.name", VARIANT_COLUMN])))
            .unwrap();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[1], vec![Field::label_of("add"), Field::label_of("AVX")]);
        assert_eq!(pairs[2], vec![Field::label_of("mul"), Field::label_of("Scalar")]);
    }

    #[test]
    fn test_distinct_absent_dimension() {
        let ds = sample();
        assert!(ds.distinct(None).is_none());
        assert!(ds.distinct(Some(&ColumnSelector::one("nope"))).is_none());
        let empty = Dataset::new("x", None, vec!["a".into()], Vec::new());
        assert!(empty.distinct(Some(&ColumnSelector::one("a"))).is_none());
    }

    #[test]
    fn test_maximum_and_minimum() {
        let ds = sample();
        assert_eq!(ds.maximum("Ops/Cycle").unwrap(), Some(8.5));
        assert_eq!(ds.minimum("Ops/Cycle").unwrap(), Some(2.0));
        assert!(matches!(
            ds.maximum("Bytes/Cycle"),
            Err(ReportError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_sort_rows_by_rank() {
        let mut ds = sample();
        ds.sort_rows(&[VARIANT_COLUMN.to_string()], &SortOrder::builtin())
            .unwrap();
        let variants: Vec<String> = ds.rows().iter().map(|r| r[4].label()).collect();
        assert_eq!(variants, vec!["Scalar", "SSE", "SSE", "AVX", "AVX"]);
        // stable within equal ranks
        assert_eq!(ds.rows()[1][1], Field::label_of("double_v"));
        assert_eq!(ds.rows()[2][1], Field::label_of("float_v"));
    }

    #[test]
    fn test_version_three_rename() {
        let columns = vec!["Byte/Cycles".to_string(), VARIANT_COLUMN.to_string()];
        let v3 = Dataset::new("memio", Some(3), columns.clone(), Vec::new());
        assert_eq!(v3.resolve_data_column("Bytes/Cycle"), "Byte/Cycles");
        assert_eq!(v3.resolve_data_column("Ops/Cycle"), "Ops/Cycle");

        let v2 = Dataset::new("memio", Some(2), columns, Vec::new());
        assert_eq!(v2.resolve_data_column("Bytes/Cycle"), "Bytes/Cycle");

        let flops = Dataset::new(
            "flops",
            Some(3),
            vec!["FLOPs/Cycle".to_string(), VARIANT_COLUMN.to_string()],
            Vec::new(),
        );
        assert_eq!(flops.resolve_data_column("FLOPs/Cycle"), "FLOPs/Cycle");
    }
}
