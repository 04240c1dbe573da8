//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use tracing::instrument;

use crate::application::services::{ChartService, StorageService};
use crate::config::Settings;
use crate::infrastructure::error::InfraResult;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Chart persistence
    pub storage: StorageService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        let settings = Arc::new(settings);
        let storage = StorageService::new(Arc::clone(&fs));

        Self {
            settings,
            fs,
            storage,
        }
    }

    /// Chart engine configured from settings and loaded with the data file.
    #[instrument(level = "debug", skip(self), fields(data_file = %self.settings.data_file.display()))]
    pub fn load_chart(&self) -> InfraResult<ChartService> {
        let document = self.storage.load(&self.settings.data_file)?;
        let mut chart = ChartService::new(
            self.settings.layout,
            self.settings.viewport,
        );
        chart.load_document(document);
        Ok(chart)
    }

    /// Write every board of `chart` back to the data file.
    pub fn save_chart(&self, chart: &ChartService) -> InfraResult<()> {
        self.storage
            .save(&self.settings.data_file, &chart.to_document())?;
        Ok(())
    }
}
