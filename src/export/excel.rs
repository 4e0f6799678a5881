//! Excel export (CLI)
//!
//! Workbook layout lives in estimator-common; this only writes the buffer.

use super::output_path_for;
use crate::error::{EstimatorError, Result};
use estimator_common::export::excel_core;
use estimator_common::{CategoryPricingStats, CostSheet};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

fn write_buffer(buffer: &[u8], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, buffer)
        .map_err(|e| EstimatorError::ExcelExport(format!("{}: {}", path.display(), e)))
}

pub fn sheet_title(sheet: &CostSheet) -> String {
    if sheet.customer.trim().is_empty() {
        format!("Cost Sheet {}", sheet.id)
    } else {
        format!("Cost Sheet {} {}", sheet.id, sheet.customer.trim())
    }
}

/// One cost sheet; returns the path written
pub fn export_sheet(sheet: &CostSheet, output: &Path) -> Result<PathBuf> {
    let path = output_path_for(output, &sheet_title(sheet));
    let buffer = excel_core::generate_sheet_workbook(sheet)
        .map_err(|e| EstimatorError::ExcelExport(e.to_string()))?;
    write_buffer(&buffer, &path)?;
    tracing::info!("exported sheet #{} to {}", sheet.id, path.display());
    Ok(path)
}

/// Every sheet plus the category benchmark table
pub fn export_history(
    sheets: &[CostSheet],
    stats: &BTreeMap<String, CategoryPricingStats>,
    output: &Path,
) -> Result<PathBuf> {
    let path = output_path_for(output, "Cost Sheet History");
    let buffer = excel_core::generate_history_workbook(sheets, stats)
        .map_err(|e| EstimatorError::ExcelExport(e.to_string()))?;
    write_buffer(&buffer, &path)?;
    tracing::info!("exported {} sheets to {}", sheets.len(), path.display());
    Ok(path)
}
