use crate::error::SumError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Which executor runs the reduction units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One scoped OS thread per partition.
    #[default]
    Threads,
    /// A dedicated rayon pool with one thread per partition.
    Rayon,
}

/// Problem size and execution settings.
///
/// The binary always runs with [`Config::default`]; the loaders exist for
/// library callers and tests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub length: usize,
    pub workers: usize,
    pub backend: Backend,
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            length: 1000,
            workers: 4,
            backend: Backend::Threads,
            stack_size: None,
        }
    }
}

impl Config {
    pub fn new(length: usize, workers: usize) -> Self {
        Self {
            length,
            workers,
            ..Self::default()
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SumError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, SumError> {
        let content = fs::read_to_string(path)
            .map_err(|err| SumError::Config(format!("failed to read {}: {err}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), SumError> {
        if self.workers == 0 {
            return Err(SumError::InvalidWorkerCount);
        }
        if self.stack_size == Some(0) {
            return Err(SumError::Config("stack_size must be positive".into()));
        }
        Ok(())
    }
}
