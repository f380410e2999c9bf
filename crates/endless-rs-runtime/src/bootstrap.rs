//! Data-directory setup and packaged-resource sync.

use std::path::Path;

use tracing::info;

/// Outcome of a resource sync.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub copied: usize,
    pub skipped: usize,
}

/// Create the data-directory skeleton.
pub fn ensure_data_dirs(data_dir: &Path) -> std::io::Result<()> {
    for sub in ["dimensions", "templates", "base-packs"] {
        std::fs::create_dir_all(data_dir.join(sub))?;
    }
    Ok(())
}

/// Copy packaged resources under `<data>/`, never overwriting files that
/// already exist. `source` is the resource root shipped with the host.
pub fn sync_resources(source: &Path, data_dir: &Path) -> std::io::Result<SyncReport> {
    let mut report = SyncReport::default();
    if source.is_dir() {
        sync_dir(source, data_dir, &mut report)?;
    }
    info!(
        "Resource sync: {} file(s) copied, {} already present",
        report.copied, report.skipped
    );
    Ok(report)
}

fn sync_dir(src: &Path, dst: &Path, report: &mut SyncReport) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)?.flatten() {
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if from.is_dir() {
            sync_dir(&from, &to, report)?;
        } else if to.exists() {
            report.skipped += 1;
        } else {
            std::fs::copy(&from, &to)?;
            report.copied += 1;
        }
    }
    Ok(())
}
