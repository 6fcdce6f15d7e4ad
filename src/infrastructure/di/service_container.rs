//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::path::PathBuf;
use std::sync::Arc;

use crate::application::services::GradeBookService;
use crate::application::ApplicationError;
use crate::config::Settings;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::InfraResult;

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    pub gradebook: GradeBookService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> InfraResult<Self> {
        let gradebook =
            GradeBookService::with_scales(fs, settings.letter_scale()?, settings.color_scale()?);
        Ok(Self {
            settings: Arc::new(settings),
            gradebook,
        })
    }

    /// Gradebook path: the explicit argument, else the configured default.
    pub fn gradebook_path(&self, explicit: Option<PathBuf>) -> InfraResult<PathBuf> {
        explicit
            .or_else(|| self.settings.gradebook.clone())
            .ok_or_else(|| ApplicationError::NoGradebook.into())
    }
}
