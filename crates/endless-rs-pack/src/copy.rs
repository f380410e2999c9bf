//! Recursive template-tree mirroring and pack walking.

use std::path::{Path, PathBuf};

use crate::error::PackError;

/// Mirror `src` under `dst`, creating missing directories and replacing files
/// that already exist.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<usize, PackError> {
    if !src.is_dir() {
        return Err(PackError::MissingTemplates(src.to_path_buf()));
    }
    std::fs::create_dir_all(dst).map_err(|e| PackError::io(dst, e))?;

    let mut copied = 0;
    let entries = std::fs::read_dir(src).map_err(|e| PackError::io(src, e))?;
    for entry in entries.flatten() {
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if from.is_dir() {
            copied += copy_tree(&from, &to)?;
        } else {
            std::fs::copy(&from, &to).map_err(|e| PackError::io(&from, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// All files under `dir`, depth-first, sorted for deterministic processing.
pub fn walk_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    collect(dir, &mut files);
    files.sort();
    files
}

fn collect(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(&path, out);
        } else {
            out.push(path);
        }
    }
}

/// Whether the file is one of the formats the pack transforms touch.
pub fn is_pack_text(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml") | Some("tesf")
    )
}
