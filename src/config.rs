//! Tool configuration
//!
//! Where to find the external tools and how to drive them.

use std::path::PathBuf;

use crate::archive::{Executable, Toolchain};
use crate::archive::tool::{SEVEN_ZIP_BINARY, UNRAR_BINARY};

/// Configuration for the external archivers
#[derive(Debug, Clone, Default)]
pub struct ToolConfig {
    /// Explicit path to the 7z binary (searched on PATH when unset)
    pub seven_zip_path: Option<PathBuf>,

    /// Explicit path to the unrar binary (searched on PATH when unset)
    pub unrar_path: Option<PathBuf>,

    /// Threads for unrar (defaults to CPU thread count)
    pub threads: Option<usize>,
}

impl ToolConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.seven_zip_path {
            if !path.exists() {
                return Err(ConfigError::ToolNotFound(SEVEN_ZIP_BINARY, path.clone()));
            }
        }

        if let Some(path) = &self.unrar_path {
            if !path.exists() {
                return Err(ConfigError::ToolNotFound(UNRAR_BINARY, path.clone()));
            }
        }

        if self.threads == Some(0) {
            return Err(ConfigError::ZeroThreads);
        }

        Ok(())
    }

    /// Build the tools described by this configuration
    pub fn toolchain(&self) -> Toolchain {
        let seven_zip = match &self.seven_zip_path {
            Some(path) => Executable::with_path(SEVEN_ZIP_BINARY, path),
            None => Executable::seven_zip(),
        };
        let unrar = match &self.unrar_path {
            Some(path) => Executable::with_path(UNRAR_BINARY, path),
            None => Executable::unrar(),
        };
        let threads = self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        });

        Toolchain::new(seven_zip, unrar, threads)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} binary not found: {1}")]
    ToolNotFound(&'static str, PathBuf),

    #[error("Thread count must be at least 1")]
    ZeroThreads,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ToolConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.toolchain().threads >= 1);
    }

    #[test]
    fn test_missing_explicit_path_is_rejected() {
        let config = ToolConfig {
            seven_zip_path: Some(PathBuf::from("/nonexistent/bin/7z")),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ToolNotFound("7z", _))
        ));
    }

    #[test]
    fn test_explicit_paths_reach_the_toolchain() {
        let dir = tempfile::tempdir().unwrap();
        let unrar = dir.path().join("unrar");
        std::fs::write(&unrar, b"").unwrap();

        let config = ToolConfig {
            unrar_path: Some(unrar.clone()),
            threads: Some(3),
            ..Default::default()
        };
        config.validate().unwrap();

        let tools = config.toolchain();
        assert_eq!(tools.unrar.resolve().unwrap(), unrar);
        assert_eq!(tools.threads, 3);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let config = ToolConfig {
            threads: Some(0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroThreads)));
    }
}
