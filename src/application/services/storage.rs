//! Chart persistence service
//!
//! Loads and saves the per-board arrays of flat person records as JSON.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::Person;
use crate::infrastructure::traits::FileSystem;

/// Persisted chart: board name -> people of that board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartDocument {
    #[serde(default)]
    pub boards: BTreeMap<String, Vec<Person>>,
}

impl ChartDocument {
    pub fn board_names(&self) -> impl Iterator<Item = &str> {
        self.boards.keys().map(String::as_str)
    }
}

/// Service for reading and writing chart documents.
pub struct StorageService {
    fs: Arc<dyn FileSystem>,
}

impl StorageService {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Load a chart document. A missing file is an empty chart.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<ChartDocument> {
        if !self.fs.exists(path) {
            debug!("no chart file, starting empty");
            return Ok(ChartDocument::default());
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read chart", path)?;
        let document: ChartDocument =
            serde_json::from_str(&content).map_err(|e| ApplicationError::Storage {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        debug!(boards = document.boards.len(), "chart loaded");
        Ok(document)
    }

    /// Write a chart document, replacing the file atomically.
    #[instrument(level = "debug", skip(self, document))]
    pub fn save(&self, path: &Path, document: &ChartDocument) -> ApplicationResult<()> {
        let content =
            serde_json::to_string_pretty(document).map_err(|e| ApplicationError::Storage {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        self.fs
            .ensure_parent(path)
            .with_path_context("create parent directory", path)?;

        let tmp = path.with_extension("json.tmp");
        self.fs
            .write(&tmp, &content)
            .with_path_context("write chart", &tmp)?;
        self.fs
            .rename(&tmp, path)
            .with_path_context("replace chart", path)?;
        debug!(boards = document.boards.len(), "chart saved");
        Ok(())
    }
}
