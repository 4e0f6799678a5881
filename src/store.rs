//! Cost sheet store
//!
//! All sheets live in one JSON file keyed by id. Line-item edits replace
//! the collections wholesale and reprice the sheet.

use crate::error::{EstimatorError, Result};
use chrono::{DateTime, Utc};
use estimator_common::{clear_non_finite, Category, CostSheet, LineItems, Outcome, SiteCosts};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreFile {
    /// Compatibility check
    version: u32,
    next_id: u64,
    sheets: BTreeMap<u64, CostSheet>,
}

impl Default for StoreFile {
    fn default() -> Self {
        Self {
            version: SheetStore::CURRENT_VERSION,
            next_id: 1,
            sheets: BTreeMap::new(),
        }
    }
}

/// Which sheets `list` returns
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilter {
    pub category: Option<Category>,
    pub include_trashed: bool,
    pub only_trashed: bool,
}

impl ListFilter {
    fn accepts(&self, sheet: &CostSheet) -> bool {
        if self.category.is_some_and(|c| c != sheet.category) {
            return false;
        }
        match (self.only_trashed, self.include_trashed) {
            (true, _) => sheet.is_trashed(),
            (false, true) => true,
            (false, false) => !sheet.is_trashed(),
        }
    }
}

#[derive(Debug)]
pub struct SheetStore {
    path: PathBuf,
    data: StoreFile,
}

impl SheetStore {
    const CURRENT_VERSION: u32 = 1;

    /// Missing file: empty store. Unreadable file: error (history is never dropped silently).
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("store {} does not exist yet", path.display());
            return Ok(Self {
                path: path.to_path_buf(),
                data: StoreFile::default(),
            });
        }

        let file = File::open(path)?;
        let data: StoreFile = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            EstimatorError::StoreCorrupt {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        if data.version != Self::CURRENT_VERSION {
            return Err(EstimatorError::StoreCorrupt {
                path: path.display().to_string(),
                reason: format!("unsupported store version {}", data.version),
            });
        }

        tracing::debug!("opened store {} ({} sheets)", path.display(), data.sheets.len());
        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.data)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.sheets.is_empty()
    }

    /// Assigns the next id and returns it
    pub fn insert(&mut self, mut sheet: CostSheet) -> u64 {
        let cleared = clear_non_finite(&mut sheet);
        if !cleared.is_empty() {
            sheet.reprice();
            tracing::warn!("non-numeric values zeroed before storing: {}", cleared.join(", "));
        }
        let id = self.data.next_id;
        self.data.next_id += 1;
        sheet.id = id;
        tracing::info!("stored cost sheet #{} ({}, {})", id, sheet.category, sheet.customer);
        self.data.sheets.insert(id, sheet);
        id
    }

    pub fn get(&self, id: u64) -> Result<&CostSheet> {
        self.data.sheets.get(&id).ok_or(EstimatorError::SheetNotFound(id))
    }

    fn get_mut(&mut self, id: u64) -> Result<&mut CostSheet> {
        self.data.sheets.get_mut(&id).ok_or(EstimatorError::SheetNotFound(id))
    }

    pub fn all(&self) -> impl Iterator<Item = &CostSheet> {
        self.data.sheets.values()
    }

    pub fn list(&self, filter: ListFilter) -> Vec<&CostSheet> {
        self.data.sheets.values().filter(|s| filter.accepts(s)).collect()
    }

    pub fn find_by_hash(&self, hash: &str) -> Option<&CostSheet> {
        self.data
            .sheets
            .values()
            .find(|s| s.source_hash.as_deref() == Some(hash))
    }

    /// Repriced copy with new line items, for checking before `replace_lines`
    pub fn preview_lines(&self, id: u64, lines: LineItems) -> Result<CostSheet> {
        let mut preview = self.get(id)?.clone();
        preview.replace_lines(lines);
        Ok(preview)
    }

    /// Repriced copy with new site costs, for checking before `replace_site`
    pub fn preview_site(&self, id: u64, site: SiteCosts) -> Result<CostSheet> {
        let mut preview = self.get(id)?.clone();
        preview.site = site;
        preview.reprice();
        Ok(preview)
    }

    /// Replace all four line collections and reprice; FINAL sheets are locked
    pub fn replace_lines(&mut self, id: u64, lines: LineItems, now: DateTime<Utc>) -> Result<&CostSheet> {
        let sheet = self.get_mut(id)?;
        if sheet.is_final() {
            return Err(EstimatorError::SheetFinalized(id));
        }
        sheet.replace_lines(lines);
        sheet.updated_at = now;
        tracing::info!("replaced line items of #{}", id);
        Ok(&*sheet)
    }

    /// Replace the site-cost inputs (travel, permits ...) and reprice
    pub fn replace_site(&mut self, id: u64, site: SiteCosts, now: DateTime<Utc>) -> Result<&CostSheet> {
        let sheet = self.get_mut(id)?;
        if sheet.is_final() {
            return Err(EstimatorError::SheetFinalized(id));
        }
        sheet.site = site;
        sheet.reprice();
        sheet.updated_at = now;
        tracing::info!("updated site costs of #{}", id);
        Ok(&*sheet)
    }

    pub fn set_outcome(&mut self, id: u64, outcome: Outcome, now: DateTime<Utc>) -> Result<()> {
        let sheet = self.get_mut(id)?;
        sheet.outcome = outcome;
        sheet.updated_at = now;
        tracing::info!("tagged #{} as {}", id, outcome);
        Ok(())
    }

    pub fn finalize(&mut self, id: u64, now: DateTime<Utc>) -> Result<()> {
        let sheet = self.get_mut(id)?;
        sheet.finalize()?;
        sheet.updated_at = now;
        Ok(())
    }

    pub fn reopen(&mut self, id: u64, now: DateTime<Utc>) -> Result<()> {
        let sheet = self.get_mut(id)?;
        sheet.reopen()?;
        sheet.updated_at = now;
        Ok(())
    }

    pub fn trash(&mut self, id: u64, now: DateTime<Utc>) -> Result<()> {
        let sheet = self.get_mut(id)?;
        sheet.trash(now)?;
        sheet.updated_at = now;
        tracing::info!("trashed #{}", id);
        Ok(())
    }

    pub fn restore(&mut self, id: u64, now: DateTime<Utc>) -> Result<()> {
        let sheet = self.get_mut(id)?;
        sheet.restore()?;
        sheet.updated_at = now;
        tracing::info!("restored #{}", id);
        Ok(())
    }

    /// Permanently remove
    pub fn hard_delete(&mut self, id: u64) -> Result<CostSheet> {
        let removed = self.data.sheets.remove(&id).ok_or(EstimatorError::SheetNotFound(id))?;
        tracing::info!("deleted #{} permanently", id);
        Ok(removed)
    }
}
