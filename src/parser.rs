use crate::dataset::{Dataset, VARIANT_COLUMN};
use crate::error::{ReportError, Result};
use crate::field::{unquote, Field};
use crate::label::LabelTranslator;
use glob::Pattern;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use tracing::debug;

/// How rows of the two result sets of a comparison are paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pairing {
    /// Row `i` of the first set pairs with row `i` of the second set, in
    /// file-enumeration order.
    #[default]
    Positional,
    /// Rows pair by their label (string) fields, variant included.
    Keyed,
}

/// Version line and column header shared by all files of a result set.
#[derive(Debug, Clone, PartialEq)]
struct Schema {
    version: u32,
    columns: Vec<String>,
}

/// All rows of one benchmark in one directory.
#[derive(Debug, Default)]
struct ResultSet {
    schema: Option<Schema>,
    first_file: Option<PathBuf>,
    rows: Vec<Vec<Field>>,
}

/// Reads the `<benchmark>_<variant>.dat` family of one benchmark.
pub struct ResultFileParser<'a> {
    benchmark: &'a str,
    translator: &'a LabelTranslator,
    pairing: Pairing,
}

impl<'a> ResultFileParser<'a> {
    pub fn new(benchmark: &'a str, translator: &'a LabelTranslator) -> Self {
        Self {
            benchmark,
            translator,
            pairing: Pairing::default(),
        }
    }

    pub fn with_pairing(mut self, pairing: Pairing) -> Self {
        self.pairing = pairing;
        self
    }

    /// Load the benchmark from zero (current directory), one or two input
    /// directories. With two, the result is the row-wise delta of the first
    /// set minus the second.
    pub fn parse(&self, dirs: &[PathBuf]) -> Result<Dataset> {
        let primary = dirs.first().map(PathBuf::as_path).unwrap_or(Path::new("."));
        let first = self.load_set(primary)?;

        let Some(secondary) = dirs.get(1) else {
            return Ok(self.into_dataset(first));
        };

        let second = self.load_set(secondary)?;
        if let Some(schema) = &second.schema {
            let path = second.first_file.clone().unwrap_or_else(|| secondary.clone());
            match &first.schema {
                None => {
                    return Err(ReportError::ComparisonMismatch {
                        benchmark: self.benchmark.to_string(),
                        path,
                        detail: "first result set has no files".to_string(),
                    })
                }
                Some(expected) if expected.version != schema.version => {
                    return Err(ReportError::ComparisonMismatch {
                        benchmark: self.benchmark.to_string(),
                        path,
                        detail: format!(
                            "version {} != {}",
                            schema.version, expected.version
                        ),
                    })
                }
                Some(expected) if expected.columns != schema.columns => {
                    return Err(ReportError::ComparisonMismatch {
                        benchmark: self.benchmark.to_string(),
                        path,
                        detail: "column headers differ".to_string(),
                    })
                }
                Some(_) => {}
            }
        }

        let columns = column_names(&first);
        let rows = self.diff_rows(&columns, first.rows, second.rows)?;
        let version = first.schema.map(|s| s.version);
        Ok(Dataset::new(self.benchmark, version, columns, rows))
    }

    fn into_dataset(&self, set: ResultSet) -> Dataset {
        let columns = column_names(&set);
        Dataset::new(
            self.benchmark,
            set.schema.map(|s| s.version),
            columns,
            set.rows,
        )
    }

    fn load_set(&self, dir: &Path) -> Result<ResultSet> {
        let pattern = format!(
            "{}/{}_*.dat",
            Pattern::escape(&dir.to_string_lossy()),
            Pattern::escape(self.benchmark)
        );
        let mut set = ResultSet::default();

        for entry in glob::glob(&pattern)? {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                ReportError::io(path, e.into_error())
            })?;
            self.load_file(&path, &mut set)?;
        }

        if set.schema.is_none() {
            debug!(benchmark = self.benchmark, dir = %dir.display(), "no result files");
        }
        Ok(set)
    }

    fn load_file(&self, path: &Path, set: &mut ResultSet) -> Result<()> {
        let text = std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
        let mut lines = text.lines();

        let version_line = lines.next().unwrap_or("").trim();
        let version = parse_version(version_line).ok_or_else(|| ReportError::MalformedVersion {
            path: path.to_path_buf(),
            line: version_line.to_string(),
        })?;

        let header_line = lines.next().unwrap_or("").trim();
        let columns = parse_header(header_line).ok_or_else(|| ReportError::MalformedHeader {
            path: path.to_path_buf(),
            line: header_line.to_string(),
        })?;

        let width = columns.len();
        let schema = Schema { version, columns };
        if let Some(expected) = &set.schema {
            if expected.version != schema.version {
                return Err(ReportError::SchemaMismatch {
                    benchmark: self.benchmark.to_string(),
                    path: path.to_path_buf(),
                    detail: format!("version {} != {}", schema.version, expected.version),
                });
            }
            if expected.columns != schema.columns {
                return Err(ReportError::SchemaMismatch {
                    benchmark: self.benchmark.to_string(),
                    path: path.to_path_buf(),
                    detail: "column headers differ".to_string(),
                });
            }
        } else {
            set.schema = Some(schema);
            set.first_file = Some(path.to_path_buf());
        }

        let variant = self.variant_label(path);
        let before = set.rows.len();

        for (n, line) in lines.enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let tokens: Vec<&str> = line.split('\t').collect();
            if tokens.len() != width {
                return Err(ReportError::RowArity {
                    path: path.to_path_buf(),
                    line: n + 3,
                    expected: width,
                    found: tokens.len(),
                });
            }
            let mut row: Vec<Field> = tokens.iter().map(|t| self.read_token(t)).collect();
            row.push(variant.clone());
            set.rows.push(row);
        }

        debug!(
            file = %path.display(),
            rows = set.rows.len() - before,
            variant = %variant,
            "loaded result file"
        );
        Ok(())
    }

    /// Variant label: the file name between `<benchmark>_` and `.dat`.
    fn variant_label(&self, path: &Path) -> Field {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let variant = name
            .strip_prefix(self.benchmark)
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(|rest| rest.strip_suffix(".dat"))
            .unwrap_or(&name);
        Field::classify(&self.translator.translate(&format!("\"{}\"", variant)))
    }

    /// Translate a token, then type it. Integer tokens are never translated
    /// so that digit labels of other columns cannot rewrite measurements.
    fn read_token(&self, token: &str) -> Field {
        if unquote(token).is_none() && token.bytes().all(|b| b.is_ascii_digit()) {
            return Field::classify(token);
        }
        Field::classify(&self.translator.translate(token))
    }

    fn diff_rows(
        &self,
        columns: &[String],
        first: Vec<Vec<Field>>,
        second: Vec<Vec<Field>>,
    ) -> Result<Vec<Vec<Field>>> {
        if first.len() != second.len() {
            return Err(ReportError::RowCountMismatch {
                benchmark: self.benchmark.to_string(),
                left: first.len(),
                right: second.len(),
            });
        }

        match self.pairing {
            Pairing::Positional => first
                .iter()
                .zip(second.iter())
                .map(|(a, b)| combine_rows(columns, a, b))
                .collect(),
            Pairing::Keyed => {
                let mut partners: HashMap<Vec<String>, VecDeque<&Vec<Field>>> = HashMap::new();
                for row in &second {
                    partners.entry(row_key(row)).or_default().push_back(row);
                }
                first
                    .iter()
                    .map(|a| {
                        let key = row_key(a);
                        let b = partners
                            .get_mut(&key)
                            .and_then(VecDeque::pop_front)
                            .ok_or_else(|| ReportError::UnmatchedRow {
                                benchmark: self.benchmark.to_string(),
                                key: key.join(", "),
                            })?;
                        combine_rows(columns, a, b)
                    })
                    .collect()
            }
        }
    }
}

fn column_names(set: &ResultSet) -> Vec<String> {
    let mut columns = set
        .schema
        .as_ref()
        .map(|s| s.columns.clone())
        .unwrap_or_default();
    columns.push(VARIANT_COLUMN.to_string());
    columns
}

fn parse_version(line: &str) -> Option<u32> {
    let digits = line.strip_prefix("Version ")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn parse_header(line: &str) -> Option<Vec<String>> {
    let inner = unquote(line)?;
    Some(inner.split("\"\t\"").map(str::to_string).collect())
}

/// Label fields identifying a row for keyed pairing.
fn row_key(row: &[Field]) -> Vec<String> {
    row.iter().filter(|f| f.is_str()).map(Field::label).collect()
}

/// Combine one pair of rows into the delta row `a - b`.
///
/// Labels must agree, integers subtract exactly, `_stddev` columns combine
/// as `sqrt(a² + b²)` and everything else subtracts as floating point.
pub fn combine_rows(columns: &[String], a: &[Field], b: &[Field]) -> Result<Vec<Field>> {
    a.iter()
        .zip(b.iter())
        .zip(columns.iter())
        .map(|((x, y), column)| combine_field(column, x, y))
        .collect()
}

fn combine_field(column: &str, a: &Field, b: &Field) -> Result<Field> {
    Ok(match a {
        Field::Str(left) => {
            if a != b {
                return Err(ReportError::LabelMismatch {
                    column: column.to_string(),
                    left: left.clone(),
                    right: b.label(),
                });
            }
            a.clone()
        }
        // Out-of-range integer deltas fall back to floating point.
        Field::Int(x) => match x.checked_sub(b.as_i64()) {
            Some(delta) => Field::Int(delta),
            None => Field::Float(*x as f64 - b.as_f64()),
        },
        Field::Float(x) if column.ends_with("_stddev") => Field::Float(x.hypot(b.as_f64())),
        Field::Float(x) => Field::Float(x - b.as_f64()),
    })
}
