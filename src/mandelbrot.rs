use crate::error::{ReportError, Result};
use crate::label::LabelTranslator;
use glob::Pattern;
use std::path::{Path, PathBuf};

const PREFIX: &str = "mandelbrot_";

/// One `mandelbrot_<variant>.dat` result file.
#[derive(Debug, Clone, PartialEq)]
pub struct MandelbrotRun {
    pub path: PathBuf,
    /// Legend title, `Vc::` followed by the translated variant.
    pub label: String,
}

/// One measurement line: image size and the cycles of both implementations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MandelbrotSample {
    pub size: f64,
    pub vc_cycles: f64,
    pub builtin_cycles: f64,
}

impl MandelbrotSample {
    pub fn speedup(&self) -> f64 {
        self.builtin_cycles / self.vc_cycles
    }
}

/// Find the mandelbrot result files of `dir` in alphabetical order.
pub fn discover(dir: &Path, translator: &LabelTranslator) -> Result<Vec<MandelbrotRun>> {
    let pattern = format!(
        "{}/{}*.dat",
        Pattern::escape(&dir.to_string_lossy()),
        PREFIX
    );
    let mut runs = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = entry.map_err(|e| ReportError::io(e.path().to_path_buf(), e.into_error()))?;
        let variant = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_prefix(PREFIX))
            .unwrap_or_default();
        let label = format!("Vc::{}", translator.translate(variant));
        runs.push(MandelbrotRun { path, label });
    }
    Ok(runs)
}

impl MandelbrotRun {
    /// Numeric rows of the file. Lines whose first three columns are not
    /// numbers (the quoted header) are skipped.
    pub fn samples(&self) -> Result<Vec<MandelbrotSample>> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| ReportError::io(&self.path, e))?;
        Ok(parse_samples(&text))
    }
}

fn parse_samples(text: &str) -> Vec<MandelbrotSample> {
    text.lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace().map(|t| t.parse::<f64>());
            match (cols.next(), cols.next(), cols.next()) {
                (Some(Ok(size)), Some(Ok(vc_cycles)), Some(Ok(builtin_cycles))) => Some(MandelbrotSample {
                    size,
                    vc_cycles,
                    builtin_cycles,
                }),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "\"size\" \"Vc [cycles]\" \"Scalar [cycles]\" \"equal\"\n\
                          \x20       100      2000000.000000      8000000.000000 1\n\
                          \x20       200      7000000.000000     28000000.000000 1\n";

    #[test]
    fn test_parse_samples_skips_header() {
        let samples = parse_samples(SAMPLE);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].size, 100.0);
        assert_eq!(samples[1].builtin_cycles, 28_000_000.0);
        assert_eq!(samples[0].speedup(), 4.0);
    }

    #[test]
    fn test_discover_labels() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("mandelbrot_sse.dat"), SAMPLE).unwrap();
        std::fs::write(dir.path().join("mandelbrot_avx.dat"), SAMPLE).unwrap();
        std::fs::write(dir.path().join("flops_sse.dat"), "Version 3\n").unwrap();

        let runs = discover(dir.path(), &LabelTranslator::builtin()).unwrap();
        let labels: Vec<&str> = runs.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Vc::AVX", "Vc::SSE"]);
        assert_eq!(runs[1].samples().unwrap().len(), 2);
    }

    #[test]
    fn test_discover_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(discover(dir.path(), &LabelTranslator::builtin()).unwrap().is_empty());
    }
}
