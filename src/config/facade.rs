//! Config loader: builds [`LessonforgeConfig`] from the layered sources.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::LessonforgeConfig;
use crate::error::LessonError;
use config::{Environment, File};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "LESSONFORGE";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, global file, `config/config.toml`,
    /// `config/{LESSONFORGE_ENV}.toml`, `LESSONFORGE_*` environment variables
    /// (`__` separates nested keys, e.g. `LESSONFORGE_GENERATION__STRICT_MODE=true`).
    pub fn load(workspace_root: &Path) -> Result<LessonforgeConfig, LessonError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let config = builder.add_source(environment()).build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load an explicit file on top of the defaults, still honouring the environment.
    pub fn load_from_file(path: &Path) -> Result<LessonforgeConfig, LessonError> {
        if !path.exists() {
            return Err(LessonError::ConfigError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let config = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .add_source(environment())
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load for the current directory.
    pub fn load_default() -> Result<LessonforgeConfig, LessonError> {
        let cwd = std::env::current_dir()
            .map_err(|e| LessonError::ConfigError(format!("Cannot read current directory: {}", e)))?;
        Self::load(&cwd)
    }

    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
