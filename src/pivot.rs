use crate::config::ColumnSelector;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::field::Field;
use crate::filter::ColumnFilter;
use crate::label::LabelTranslator;
use std::collections::HashMap;
use std::fmt::Write as _;

/// One output row: the cluster key plus the values the filters wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotRow {
    key: Field,
    values: HashMap<String, Field>,
}

impl PivotRow {
    fn new(key: Field) -> Self {
        Self {
            key,
            values: HashMap::new(),
        }
    }

    pub fn key(&self) -> &Field {
        &self.key
    }

    /// Value of an output column; the zero element when nothing was written.
    pub fn value(&self, column: &str) -> Field {
        self.values.get(column).cloned().unwrap_or_default()
    }
}

/// Rows keyed by cluster label, columns named by filter outputs.
///
/// Rows keep first-seen order; a later write to the same cell replaces the
/// earlier one.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotTable {
    headers: Vec<String>,
    rows: Vec<PivotRow>,
}

impl PivotTable {
    /// Pivot `dataset` into one row per distinct translated key of
    /// `key_columns`, running every filter over every row.
    ///
    /// Key columns missing from the schema are ignored; filter source
    /// columns missing from the schema are fatal.
    pub fn build(
        dataset: &Dataset,
        key_columns: &ColumnSelector,
        filters: &mut [ColumnFilter],
        translator: &LabelTranslator,
    ) -> Result<Self> {
        for filter in filters.iter_mut() {
            filter.prepare(dataset.columns())?;
        }
        let key_indexes: Vec<usize> = key_columns
            .columns()
            .iter()
            .filter_map(|c| dataset.column_index(c))
            .collect();

        let mut headers = vec![key_columns.caption()];
        for filter in filters.iter() {
            headers.extend(filter.headers().into_iter().map(str::to_string));
        }

        let mut rows: Vec<PivotRow> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for record in dataset.rows() {
            let key = row_key(record, &key_indexes, translator);
            let index = *positions.entry(key.to_string()).or_insert_with(|| {
                rows.push(PivotRow::new(key.clone()));
                rows.len() - 1
            });
            let target = &mut rows[index];
            for filter in filters.iter() {
                filter.process(record, |name, value| {
                    target.values.insert(name.to_string(), value.clone());
                });
            }
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[PivotRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Quoted, tab-separated header line with trailing newline.
    pub fn header_line(&self) -> String {
        format!("\"{}\"\n", self.headers.join("\"\t\""))
    }

    /// Data lines in header order, one per row.
    pub fn body(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let mut fields = vec![row.key.to_string()];
            fields.extend(self.headers[1..].iter().map(|h| row.value(h).to_string()));
            let _ = writeln!(out, "{}", fields.join("\t"));
        }
        out
    }

    /// Inline data block for gnuplot: optional header, rows, `e` sentinel.
    pub fn data_block(&self, with_header: bool) -> String {
        let mut out = String::new();
        if with_header {
            out.push_str(&self.header_line());
        }
        out.push_str(&self.body());
        out.push_str("e\n");
        out
    }
}

/// Translated cluster key of one record.
///
/// A single numeric key column keeps its value unless the translator has a
/// label for it; otherwise the labels are joined with `", "` and translated
/// as one label.
fn row_key(record: &[Field], indexes: &[usize], translator: &LabelTranslator) -> Field {
    if let [single] = indexes {
        let field = &record[*single];
        if !field.is_str() {
            let label = field.label();
            let translated = translator.translate(&label);
            return if translated == label {
                field.clone()
            } else {
                Field::Str(translated)
            };
        }
    }
    let label = indexes
        .iter()
        .map(|&i| record[i].label())
        .collect::<Vec<_>>()
        .join(", ");
    Field::Str(translator.translate(&label))
}
