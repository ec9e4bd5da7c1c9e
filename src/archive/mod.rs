//! Archive listing and extraction through external tools.
//!
//! The `7z` and `unrar` executables do the decompression. This module runs
//! their listing commands, parses the text they print into [`Entry`]
//! records, and streams single members back out of them.
//!
//! # Usage
//!
//! ```ignore
//! use arcwrap::archive::{Archive, Backend, Toolchain};
//!
//! let tools = Toolchain::default();
//! let archive = Archive::open(&tools, Backend::SevenZip, "archive.7z", None)?;
//! for entry in archive.entries() {
//!     println!("{} ({} bytes)", entry.path, entry.size);
//! }
//! archive.extract_to_file("readme.txt", "docs/readme.txt")?;
//! ```

pub mod entry;
pub mod error;
pub mod reader;
pub mod sevenzip;
pub mod tool;
pub mod unrar;

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::paths;

pub use entry::{Entry, EntryKind};
pub use error::{ArchiveError, ListError};
pub use reader::EntryReader;
pub use sevenzip::SevenZipListing;
pub use tool::{Executable, Toolchain};
pub use unrar::UnrarListing;

/// Passed when no password was given.
///
/// Both tools prompt interactively for a password on encrypted archives
/// when none is supplied, but accept one happily on unencrypted archives,
/// so a nonsense password makes them fail instead of block.
const NO_PASSWORD: &str = "                  ";

/// Turns the captured stdout of a listing command into entries.
pub trait ListingParser {
    /// Parse the archive-level properties and every member entry.
    fn parse_listing(&self, output: &[u8]) -> Result<Listing, ListError>;

    fn parse(&self, output: &[u8]) -> Result<Vec<Entry>, ListError> {
        self.parse_listing(output).map(|listing| listing.entries)
    }
}

/// A parsed listing: what the tool said about the archive, then its members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Listing {
    /// Archive-level `key`/`value` pairs printed before the first member, in order
    pub properties: Vec<(String, String)>,
    pub entries: Vec<Entry>,
}

impl Listing {
    /// First archive property named `key` (case-insensitive).
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// True when the archive or any member is stored solid.
    ///
    /// 7z only reports `Solid = +` in the archive block for .7z files, rar
    /// listings mark it per member, and unrar appends `solid` to `Details`.
    pub fn is_solid(&self) -> bool {
        let archive_solid = self.property("solid") == Some("+")
            || self
                .property("details")
                .is_some_and(|details| details.split(',').any(|flag| flag.trim() == "solid"));

        archive_solid || self.entries.iter().any(|e| e.solid == "+")
    }
}

/// Split tool output into lines without failing on bad UTF-8.
///
/// Member names are printed in whatever encoding the archive stored them
/// in; a bad byte becomes U+FFFD instead of losing the whole listing.
pub(crate) fn output_lines(output: &[u8]) -> impl Iterator<Item = String> + '_ {
    let output = output.strip_suffix(b"\n").unwrap_or(output);
    output.split(|&b| b == b'\n').map(|line| {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        String::from_utf8_lossy(line).into_owned()
    })
}

/// Which external tool an archive is read with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
    /// `7z`: 7z, zip, rar, iso, rpm, deb, tar, ...
    #[default]
    SevenZip,
    /// `unrar`: rar only
    Unrar,
}

impl Backend {
    pub fn parser(self) -> &'static dyn ListingParser {
        match self {
            Backend::SevenZip => &SevenZipListing,
            Backend::Unrar => &UnrarListing,
        }
    }

    fn executable(self, tools: &Toolchain) -> &Arc<Executable> {
        match self {
            Backend::SevenZip => &tools.seven_zip,
            Backend::Unrar => &tools.unrar,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::SevenZip => f.write_str("7z"),
            Backend::Unrar => f.write_str("unrar"),
        }
    }
}

/// An archive listed through an external tool.
///
/// The entry list is fixed at open time; extraction re-runs the same tool
/// with the same password.
#[derive(Debug)]
pub struct Archive {
    path: PathBuf,
    listing: Listing,
    password: String,
    backend: Backend,
    tool: Arc<Executable>,
    threads: usize,
}

impl Archive {
    /// List `path` with the backend's tool.
    pub fn open(
        tools: &Toolchain,
        backend: Backend,
        path: impl AsRef<Path>,
        password: Option<&str>,
    ) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();
        let tool = Arc::clone(backend.executable(tools));
        let password = match password {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => NO_PASSWORD.to_string(),
        };

        let mut cmd = tool.command()?;
        match backend {
            Backend::SevenZip => sevenzip::list_command(&mut cmd, &path, &password),
            Backend::Unrar => unrar::list_command(&mut cmd, &path, &password, tools.threads),
        }

        debug!("Listing {} with {}", path.display(), backend);
        let output = cmd.output().map_err(|source| ArchiveError::Spawn {
            tool: tool.name().to_string(),
            source,
        })?;
        check_status(tool.name(), &output)?;

        let listing = backend.parser().parse_listing(&output.stdout)?;
        info!("Listed {} entries in {}", listing.entries.len(), path.display());

        Ok(Self {
            path,
            listing,
            password,
            backend,
            tool,
            threads: tools.threads,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[Entry] {
        &self.listing.entries
    }

    /// Archive-level properties the tool printed before the members.
    pub fn properties(&self) -> &[(String, String)] {
        &self.listing.properties
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Entry with exactly this path.
    pub fn find_entry(&self, name: &str) -> Option<&Entry> {
        self.entries().iter().find(|e| e.path == name)
    }

    /// Entry whose path matches ignoring case and separator style.
    pub fn find_entry_case_insensitive(&self, name: &str) -> Option<&Entry> {
        self.entries().iter().find(|e| paths::paths_equal(&e.path, name))
    }

    /// True when the archive is solid.
    ///
    /// Solid members can only be reached by decompressing everything before
    /// them, so pulling many files one at a time is slow.
    pub fn is_solid(&self) -> bool {
        self.listing.is_solid()
    }

    /// Start streaming one member. Read it to the end or
    /// [`close`](EntryReader::close) it.
    pub fn entry_reader(&self, name: &str) -> Result<EntryReader, ArchiveError> {
        if self.find_entry(name).is_none() {
            return Err(ArchiveError::EntryNotFound {
                name: name.to_string(),
            });
        }

        let mut cmd = self.tool.command()?;
        match self.backend {
            Backend::SevenZip => sevenzip::extract_command(&mut cmd, &self.path, &self.password, name),
            Backend::Unrar => {
                unrar::extract_command(&mut cmd, &self.path, &self.password, self.threads, name)
            }
        }

        debug!("Extracting '{}' from {}", name, self.path.display());
        EntryReader::spawn(cmd, self.tool.name())
    }

    /// Copy one member into `dst`, returning the number of bytes written.
    pub fn extract_to_writer<W: Write + ?Sized>(
        &self,
        dst: &mut W,
        name: &str,
    ) -> Result<u64, ArchiveError> {
        let mut reader = self.entry_reader(name)?;
        let copied = io::copy(&mut reader, dst);
        let closed = reader.close();
        let bytes = copied?;
        closed?;

        // A clean exit with nothing on stdout means the tool skipped the member
        let expected = self.find_entry(name).map(|e| e.size).unwrap_or(0);
        if bytes == 0 && expected > 0 {
            return Err(ArchiveError::EmptyOutput {
                name: name.to_string(),
            });
        }
        Ok(bytes)
    }

    /// Extract one member to a file on disk, creating parent directories.
    pub fn extract_to_file(
        &self,
        dst_path: impl AsRef<Path>,
        name: &str,
    ) -> Result<u64, ArchiveError> {
        let dst_path = dst_path.as_ref();
        paths::ensure_parent_dirs(dst_path)?;

        let mut writer = BufWriter::new(File::create(dst_path)?);
        let bytes = self.extract_to_writer(&mut writer, name)?;
        writer.flush()?;
        Ok(bytes)
    }

    /// Extract everything into `output_dir`, returning the number of files
    /// found there afterwards.
    pub fn extract_all(&self, output_dir: impl AsRef<Path>) -> Result<usize, ArchiveError> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        let mut cmd = self.tool.command()?;
        match self.backend {
            Backend::SevenZip => {
                sevenzip::extract_all_command(&mut cmd, &self.path, &self.password, output_dir)
            }
            Backend::Unrar => unrar::extract_all_command(
                &mut cmd,
                &self.path,
                &self.password,
                self.threads,
                output_dir,
            ),
        }

        let output = cmd.output().map_err(|source| ArchiveError::Spawn {
            tool: self.tool.name().to_string(),
            source,
        })?;
        check_status(self.tool.name(), &output)?;

        let count = walkdir::WalkDir::new(output_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count();
        info!("Extracted {} files to {}", count, output_dir.display());
        Ok(count)
    }
}

fn missing_volume_re() -> &'static Regex {
    static MISSING_VOLUME_RE: OnceLock<Regex> = OnceLock::new();
    MISSING_VOLUME_RE
        .get_or_init(|| Regex::new(r"ERROR = Missing volume : .+").expect("valid missing volume regex"))
}

/// Turn a failed run into an error carrying the tool's own message.
fn check_status(tool: &str, output: &Output) -> Result<(), ArchiveError> {
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut message = stderr.trim();
    if message.is_empty() {
        message = stdout.trim();
    }

    // 7z reports a broken volume set as a property of the archive
    let message = match missing_volume_re().find(message) {
        Some(m) => m.as_str().to_string(),
        None => message.to_string(),
    };

    Err(ArchiveError::CommandFailed {
        tool: tool.to_string(),
        message: format!("{} ({})", message, output.status),
    })
}
