//! Locating the external archiver executables.
//!
//! An [`Executable`] remembers where its binary lives once it has been found
//! on the search path. The lookup runs under a lock so concurrent callers do
//! not race on the first resolution; a failed lookup is retried next time.

use std::path::PathBuf;
use std::process::Command;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use super::error::ArchiveError;

/// Locale forced on child processes so listings come out as UTF-8.
/// `LANG=C` garbles non-ASCII names on some distributions (Alpine).
pub const UTF8_LOCALE: &str = "en_US.UTF-8";

pub const SEVEN_ZIP_BINARY: &str = "7z";
pub const UNRAR_BINARY: &str = "unrar";

/// A named external tool with a lazily resolved, cached path.
#[derive(Debug)]
pub struct Executable {
    name: String,
    path: Mutex<Option<PathBuf>>,
}

impl Executable {
    /// Tool found by `name` on the search path on first use.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: Mutex::new(None),
        }
    }

    /// Tool at a fixed location; the search path is never consulted.
    ///
    /// Some systems ship `7z` as a shell wrapper around the real binary;
    /// pointing at the real binary needs a full path here.
    pub fn with_path(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: Mutex::new(Some(path.into())),
        }
    }

    pub fn seven_zip() -> Self {
        Self::new(SEVEN_ZIP_BINARY)
    }

    pub fn unrar() -> Self {
        Self::new(UNRAR_BINARY)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path to the executable, searching for it on first use.
    pub fn resolve(&self) -> Result<PathBuf, ArchiveError> {
        let mut cached = self.path.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(path) = cached.as_ref() {
            return Ok(path.clone());
        }

        match which::which(&self.name) {
            Ok(path) => {
                info!("Found {} at: {}", self.name, path.display());
                *cached = Some(path.clone());
                Ok(path)
            }
            Err(e) => {
                debug!("{} not found on PATH: {}", self.name, e);
                Err(ArchiveError::ToolNotFound {
                    name: self.name.clone(),
                })
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.resolve().is_ok()
    }

    /// A `Command` for this tool with the UTF-8 locale forced.
    pub fn command(&self) -> Result<Command, ArchiveError> {
        let mut cmd = Command::new(self.resolve()?);
        cmd.env("LANG", UTF8_LOCALE);
        Ok(cmd)
    }
}

/// The pair of tools an [`Archive`](super::Archive) can be opened with.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub seven_zip: Arc<Executable>,
    pub unrar: Arc<Executable>,
    /// Thread count passed to `unrar -mt`
    pub threads: usize,
}

impl Toolchain {
    pub fn new(seven_zip: Executable, unrar: Executable, threads: usize) -> Self {
        Self {
            seven_zip: Arc::new(seven_zip),
            unrar: Arc::new(unrar),
            threads: threads.max(1),
        }
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::new(Executable::seven_zip(), Executable::unrar(), threads)
    }
}
