use crate::error::{ReportError, Result};
use crate::field::Field;

#[derive(Debug, Clone)]
struct OutputColumn {
    name: String,
    /// `None` for placeholder columns that never receive a value.
    source: Option<String>,
    index: Option<usize>,
}

/// Row predicate plus column extraction.
///
/// A row matches when it contains every required value anywhere among its
/// fields; `None` entries impose no constraint. Matching rows yield one
/// `(output name, value)` pair per configured output column.
#[derive(Debug, Clone)]
pub struct ColumnFilter {
    required: Vec<Option<Field>>,
    outputs: Vec<OutputColumn>,
}

impl ColumnFilter {
    pub fn new<I, S>(required: Vec<Option<Field>>, outputs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            required,
            outputs: outputs
                .into_iter()
                .map(|(name, source)| OutputColumn {
                    name: name.into(),
                    source: Some(source.into()),
                    index: None,
                })
                .collect(),
        }
    }

    /// A filter with one output column that has no source; its cells
    /// render as the zero value.
    pub fn placeholder(required: Vec<Option<Field>>, name: impl Into<String>) -> Self {
        Self {
            required,
            outputs: vec![OutputColumn {
                name: name.into(),
                source: None,
                index: None,
            }],
        }
    }

    /// Resolve source columns against the dataset schema.
    pub fn prepare(&mut self, schema: &[String]) -> Result<()> {
        for col in &mut self.outputs {
            let Some(source) = &col.source else {
                continue;
            };
            let index = schema.iter().position(|c| c == source).ok_or_else(|| {
                ReportError::UnknownColumn {
                    column: source.clone(),
                    schema: schema.to_vec(),
                }
            })?;
            col.index = Some(index);
        }
        Ok(())
    }

    pub fn matches(&self, row: &[Field]) -> bool {
        self.required
            .iter()
            .flatten()
            .all(|value| row.contains(value))
    }

    /// Emit the configured output columns of `row` if it matches.
    ///
    /// Output columns that were never resolved by [`ColumnFilter::prepare`]
    /// are skipped.
    pub fn process<F>(&self, row: &[Field], mut emit: F)
    where
        F: FnMut(&str, &Field),
    {
        if !self.matches(row) {
            return;
        }
        for col in &self.outputs {
            if let Some(value) = col.index.and_then(|i| row.get(i)) {
                emit(&col.name, value);
            }
        }
    }

    /// Output column names in declaration order.
    pub fn headers(&self) -> Vec<&str> {
        self.outputs.iter().map(|c| c.name.as_str()).collect()
    }
}
