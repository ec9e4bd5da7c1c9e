//! arcwrap - archive listing and extraction through `7z` and `unrar`
//!
//! The external tools do the decompression; this crate parses what they
//! print, works out multi-volume RAR sets, and streams members back out.

pub mod archive;
pub mod config;
pub mod natsort;
pub mod paths;
pub mod volume;

pub use archive::{Archive, ArchiveError, Backend, Entry, EntryKind, ListError, Listing, ListingParser};
pub use natsort::{natural_cmp, natural_sort};
pub use volume::{resolve as resolve_volumes, VolumeError, VolumeSet};
