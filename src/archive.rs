use crate::error::ReportError;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};
use zip::read::ZipArchive;

const TEMP_PREFIX: &str = "vc-benchmarks-plot";

/// Archive formats accepted for comparison runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Tar,
    TarGz,
    Zip,
}

impl ArchiveKind {
    /// Detect the format from the file name.
    pub fn detect(path: &Path) -> std::result::Result<Self, ReportError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(ArchiveKind::TarGz)
        } else if name.ends_with(".tar") {
            Ok(ArchiveKind::Tar)
        } else if name.ends_with(".zip") {
            Ok(ArchiveKind::Zip)
        } else {
            Err(ReportError::UnsupportedArchive(path.to_path_buf()))
        }
    }
}

/// The two extracted result directories of a comparison run.
///
/// Both directories are removed when this value is dropped.
pub struct ComparisonInputs {
    first: TempDir,
    second: TempDir,
}

impl ComparisonInputs {
    /// Extract both archives; fails before extracting anything if either
    /// path does not exist.
    pub fn extract(first: &Path, second: &Path) -> Result<Self> {
        for path in [first, second] {
            if !path.exists() {
                return Err(ReportError::MissingArchive(path.to_path_buf()).into());
            }
        }
        let first = extract(first)?;
        let second = extract(second)?;
        Ok(Self { first, second })
    }

    pub fn dirs(&self) -> Vec<PathBuf> {
        vec![self.first.path().to_path_buf(), self.second.path().to_path_buf()]
    }
}

/// Extract `path` into a fresh temporary directory, dropping the first
/// component of every entry path.
pub fn extract(path: &Path) -> Result<TempDir> {
    if !path.exists() {
        return Err(ReportError::MissingArchive(path.to_path_buf()).into());
    }
    let kind = ArchiveKind::detect(path)?;
    let dest = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempdir()
        .context("Failed to create temporary directory")?;
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let count = match kind {
        ArchiveKind::Tar => unpack_tar(file, dest.path()),
        ArchiveKind::TarGz => unpack_tar(GzDecoder::new(file), dest.path()),
        ArchiveKind::Zip => unpack_zip(file, dest.path()),
    }
    .with_context(|| format!("Failed to extract {}", path.display()))?;

    info!(archive = %path.display(), dir = %dest.path().display(), entries = count, "extracted");
    Ok(dest)
}

/// Relative path below the first component; `None` for the top-level entry
/// itself or for paths escaping the destination.
fn strip_first(path: &Path) -> Option<PathBuf> {
    let mut components = path.components().filter(|c| !matches!(c, Component::CurDir));
    components.next()?;
    let mut stripped = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => stripped.push(part),
            _ => return None,
        }
    }
    (!stripped.as_os_str().is_empty()).then_some(stripped)
}

fn unpack_tar<R: Read>(reader: R, dest: &Path) -> Result<usize> {
    let mut archive = tar::Archive::new(reader);
    let mut count = 0;
    for entry in archive.entries().context("Failed to read tar archive")? {
        let mut entry = entry.context("Failed to read tar entry")?;
        let name = entry.path().context("Invalid tar entry path")?.into_owned();
        let Some(relative) = strip_first(&name) else {
            debug!(entry = %name.display(), "skipping");
            continue;
        };
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        entry
            .unpack(&target)
            .with_context(|| format!("Failed to unpack {}", name.display()))?;
        count += 1;
    }
    Ok(count)
}

fn unpack_zip(file: File, dest: &Path) -> Result<usize> {
    let mut archive = ZipArchive::new(file).context("Failed to read zip archive")?;
    let mut count = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).context("Failed to read zip entry")?;
        let Some(relative) = entry.enclosed_name().as_deref().and_then(strip_first) else {
            debug!(entry = entry.name(), "skipping");
            continue;
        };
        let target = dest.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)
            .with_context(|| format!("Failed to create {}", target.display()))?;
        std::io::copy(&mut entry, &mut out).context("Failed to write zip entry")?;
        count += 1;
    }
    Ok(count)
}
