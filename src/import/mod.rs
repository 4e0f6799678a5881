//! Legacy Excel workbook import
//!
//! Reads the first worksheet of an `.xlsx`/`.xls` cost workbook into a
//! draft plus warnings. The file hash lets callers skip re-imports.

pub mod grid;
pub mod scrape;

pub use grid::{Cell, Grid};
pub use scrape::{scrape, ImportWarning, Scraped, MAX_SCAN_COLS, MAX_SCAN_ROWS};

use crate::error::{EstimatorError, Result};
use calamine::{open_workbook_auto, Reader};
use estimator_common::CostSheetDraft;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls"];

#[derive(Debug, Clone)]
pub struct ImportedWorkbook {
    pub path: PathBuf,
    pub draft: CostSheetDraft,
    pub warnings: Vec<ImportWarning>,
    /// SHA-256 of the file bytes, lowercase hex
    pub hash: String,
}

pub fn file_hash(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

pub fn import_workbook(path: &Path) -> Result<ImportedWorkbook> {
    if !path.exists() {
        return Err(EstimatorError::FileNotFound(path.display().to_string()));
    }

    let hash = file_hash(path)?;
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| EstimatorError::ExcelImport(format!("{}: {}", path.display(), e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| EstimatorError::ExcelImport(format!("{}: workbook has no worksheets", path.display())))?
        .map_err(|e| EstimatorError::ExcelImport(format!("{}: {}", path.display(), e)))?;

    let grid = Grid::from_range(&range);
    tracing::debug!("import: {} has {} rows", path.display(), grid.height());

    let Scraped { draft, warnings } = scrape(&grid);
    Ok(ImportedWorkbook {
        path: path.to_path_buf(),
        draft,
        warnings,
        hash,
    })
}

fn is_workbook(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    // Excel lock files
    if name.starts_with("~$") {
        return false;
    }
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            WORKBOOK_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Workbooks under `folder` (recursive), sorted by path
pub fn collect_workbooks(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(EstimatorError::FileNotFound(folder.display().to_string()));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_workbook(e.path()))
        .map(|e| e.into_path())
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(EstimatorError::NothingToImport(folder.display().to_string()));
    }
    Ok(paths)
}
