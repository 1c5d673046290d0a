//! The workspace: fixed input datasets, templates and artifact locations.
//!
//! A [`WorkspaceContext`] is built once before any run and handed to the
//! pipeline by value. Nothing in it changes afterwards.

mod config;
mod layout;

pub use config::{AnalysisSettings, WorkspaceConfig, CONFIG_FILE};
pub use layout::{ArtifactLayout, JOINED_FILE, RASTER_FILE, REGRESSION_FILE, TABLE_FILE};

use crate::errors::ConfigError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the workspace directory.
pub const WORKSPACE_ENV: &str = "IDWFLOW_WORKSPACE";

/// Workspace used when [`WORKSPACE_ENV`] is unset.
pub const DEFAULT_WORKSPACE: &str = "idw_output";

/// Read-only description of the on-disk inputs a run depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceContext {
    workspace_directory: PathBuf,
    input_point_file: PathBuf,
    input_tracts_file: PathBuf,
    map_template_path: PathBuf,
    symbology_template_path: PathBuf,
    settings: AnalysisSettings,
    layout: ArtifactLayout,
}

impl WorkspaceContext {
    /// Builds a context from a directory and an explicit config.
    ///
    /// Relative paths in `config` are resolved against `workspace_directory`.
    /// Does not touch the filesystem.
    #[must_use]
    pub fn new(workspace_directory: impl Into<PathBuf>, config: WorkspaceConfig) -> Self {
        let workspace_directory = workspace_directory.into();
        let resolve = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                workspace_directory.join(p)
            }
        };

        let layout = ArtifactLayout::new(&workspace_directory, &config.settings.image_name);

        Self {
            input_point_file: resolve(&config.point_file),
            input_tracts_file: resolve(&config.tracts_file),
            map_template_path: resolve(&config.map_template),
            symbology_template_path: resolve(&config.symbology_template),
            settings: config.settings,
            layout,
            workspace_directory,
        }
    }

    /// Opens the workspace at `dir`, creating the directory if needed.
    ///
    /// Reads `idwflow.json` from the directory when present.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();

        if dir.exists() {
            if !dir.is_dir() {
                return Err(ConfigError::NotADirectory(dir.to_path_buf()));
            }
        } else {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::CreateWorkspace {
                path: dir.to_path_buf(),
                source,
            })?;
            info!(workspace = %dir.display(), "Created workspace directory");
        }

        let config_path = dir.join(CONFIG_FILE);
        let config = if config_path.is_file() {
            let text = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
                path: config_path.clone(),
                source,
            })?;
            let config: WorkspaceConfig =
                serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: config_path.clone(),
                    source,
                })?;
            debug!(config = %config_path.display(), "Loaded workspace config");
            config
        } else {
            WorkspaceConfig::default()
        };

        Ok(Self::new(dir, config))
    }

    /// Opens the workspace named by `IDWFLOW_WORKSPACE`, or `./idw_output`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let dir = std::env::var_os(WORKSPACE_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_WORKSPACE), PathBuf::from);
        Self::open(dir)
    }

    /// Returns the workspace directory.
    #[must_use]
    pub fn workspace_directory(&self) -> &Path {
        &self.workspace_directory
    }

    /// Returns the point dataset path.
    #[must_use]
    pub fn input_point_file(&self) -> &Path {
        &self.input_point_file
    }

    /// Returns the tracts dataset path.
    #[must_use]
    pub fn input_tracts_file(&self) -> &Path {
        &self.input_tracts_file
    }

    /// Returns the map template path.
    #[must_use]
    pub fn map_template_path(&self) -> &Path {
        &self.map_template_path
    }

    /// Returns the symbology template path.
    #[must_use]
    pub fn symbology_template_path(&self) -> &Path {
        &self.symbology_template_path
    }

    /// Returns the analysis settings.
    #[must_use]
    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Returns the artifact layout.
    #[must_use]
    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Returns the input files that do not exist yet.
    #[must_use]
    pub fn missing_inputs(&self) -> Vec<&Path> {
        [
            self.input_point_file.as_path(),
            self.input_tracts_file.as_path(),
            self.map_template_path.as_path(),
            self.symbology_template_path.as_path(),
        ]
        .into_iter()
        .filter(|p| !p.is_file())
        .collect()
    }
}
