//! Archive member records harvested from listing output.

use chrono::NaiveDateTime;
use serde::Serialize;

/// Whether a member is a regular file or a directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum EntryKind {
    /// The dialect did not say and nothing could be inferred
    #[default]
    Unknown,
    File,
    Directory,
}

impl EntryKind {
    /// Parse the explicit `Type` value printed by `unrar lt`.
    pub fn from_type_field(value: &str) -> Self {
        match value {
            "File" => EntryKind::File,
            "Directory" => EntryKind::Directory,
            _ => EntryKind::Unknown,
        }
    }
}

/// One member of an archive.
///
/// Fields cover every dialect the parsers understand. Anything a given tool
/// does not print keeps its zero value, except `packed_size` which is `-1`
/// ("unknown") when the listing has no packed size at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Path inside the archive, as printed by the tool
    pub path: String,
    pub kind: EntryKind,

    /// Extracted size in bytes (for .deb members this is the compressed size)
    pub size: i64,
    /// Packed size in bytes, `-1` when unknown
    pub packed_size: i64,
    /// Physical size (iso, rpm payload)
    pub physical_size: i64,
    /// Cluster size (iso, rpm payload extracted size)
    pub cluster_size: i64,
    /// Compression ratio, e.g. `54%` (unrar only)
    pub ratio: String,

    pub modified: Option<NaiveDateTime>,
    pub created: Option<NaiveDateTime>,
    pub accessed: Option<NaiveDateTime>,

    /// Raw attribute / permission string
    pub attributes: String,
    pub crc: String,
    pub encrypted: String,
    pub method: String,
    pub block: i64,
    pub comment: String,
    pub volume_index: i64,
    pub characteristics: String,
    pub offset: i64,
    pub solid: String,
    pub commented: String,
    pub split_before: String,
    pub split_after: String,
    pub alternate_stream: String,
    pub symbolic_link: String,
    pub hard_link: String,
    pub copy_link: String,
    pub checksum: String,
    pub nt_security: String,
    /// `+` for directories, `-` for files (zip, rar)
    pub folder: String,
    pub host_os: String,
    pub version: String,
    pub user: String,
    pub group: String,
    pub mode: String,
    /// The generic dialect's `Type` value, e.g. `Rpm/xz`
    pub format: String,
    /// Compression description (unrar only)
    pub compression: String,
    /// Flags such as `encrypted` (unrar only)
    pub flags: String,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            path: String::new(),
            kind: EntryKind::Unknown,
            size: 0,
            packed_size: -1,
            physical_size: 0,
            cluster_size: 0,
            ratio: String::new(),
            modified: None,
            created: None,
            accessed: None,
            attributes: String::new(),
            crc: String::new(),
            encrypted: String::new(),
            method: String::new(),
            block: 0,
            comment: String::new(),
            volume_index: 0,
            characteristics: String::new(),
            offset: 0,
            solid: String::new(),
            commented: String::new(),
            split_before: String::new(),
            split_after: String::new(),
            alternate_stream: String::new(),
            symbolic_link: String::new(),
            hard_link: String::new(),
            copy_link: String::new(),
            checksum: String::new(),
            nt_security: String::new(),
            folder: String::new(),
            host_os: String::new(),
            version: String::new(),
            user: String::new(),
            group: String::new(),
            mode: String::new(),
            format: String::new(),
            compression: String::new(),
            flags: String::new(),
        }
    }
}

impl Entry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Infer `kind` from the folder flag, falling back to a leading `D` in
    /// the attribute string (`D_ drwxr-xr-x`, `D....`).
    pub(crate) fn infer_kind(&mut self) {
        self.kind = match self.folder.as_str() {
            "+" => EntryKind::Directory,
            "-" => EntryKind::File,
            _ if self.attributes.starts_with('D') => EntryKind::Directory,
            _ if !self.attributes.is_empty() => EntryKind::File,
            _ => EntryKind::Unknown,
        };
    }
}
