//! unrar binary integration: `unrar lt` listing parser and command lines.
//!
//! ```text
//! UNRAR 7.00 freeware      Copyright (c) 1993-2024 Alexander Roshal
//!
//! Archive: rarfiles.rar
//! Details: RAR 5
//!
//!         Name: rar/rarfiles.lst
//!         Type: File
//!         Size: 1210
//!  Packed size: 656
//!        Ratio: 54%
//!        mtime: 2024-02-26 17:05:59,000000000
//!   Attributes: -rw-r--r--
//!        CRC32: A5866556
//!      Host OS: Unix
//!  Compression: RAR 5.0(v50) -m3 -md=1m
//!        Flags: encrypted
//! ```
//!
//! Optional fields are omitted rather than printed blank (directories have
//! no `Flags` line), so blank values are kept as-is here.

use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;
use tracing::{debug, warn};

use super::entry::{Entry, EntryKind};
use super::error::ListError;
use super::{output_lines, Listing, ListingParser};

const TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S,%f";

fn details_re() -> &'static Regex {
    static DETAILS_RE: OnceLock<Regex> = OnceLock::new();
    DETAILS_RE.get_or_init(|| Regex::new(r"^Details: RAR(.+)$").expect("valid details regex"))
}

/// Parser for the `key: value` output of `unrar lt`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnrarListing;

impl ListingParser for UnrarListing {
    fn parse_listing(&self, output: &[u8]) -> Result<Listing, ListError> {
        let mut lines = output_lines(output);
        let properties = advance_to_first_entry(&mut lines)?;

        let mut entries = Vec::new();
        loop {
            let block = entry_lines(&mut lines);
            if block.is_empty() {
                break;
            }
            let entry = parse_entry_lines(&block)?;
            // unrar prints the odd metadata block without a name
            if entry.path.is_empty() {
                warn!("Skipping unrar listing block with empty Name field");
                continue;
            }
            entries.push(entry);
        }

        debug!("Parsed {} entries from unrar listing", entries.len());
        Ok(Listing { properties, entries })
    }
}

/// Skip past the `Details:` line, keeping the `Archive:`/`Details:` pairs.
fn advance_to_first_entry<I>(lines: &mut I) -> Result<Vec<(String, String)>, ListError>
where
    I: Iterator<Item = String>,
{
    let mut properties = Vec::new();
    while let Some(line) = lines.next() {
        if let Some((key, value)) = line.trim().split_once(": ") {
            properties.push((key.to_string(), value.trim().to_string()));
        }
        if details_re().is_match(&line) {
            // Blank separator after the details line
            lines.next();
            return Ok(properties);
        }
    }
    Err(ListError::NoEntries)
}

fn entry_lines<I>(lines: &mut I) -> Vec<String>
where
    I: Iterator<Item = String>,
{
    let mut block = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        block.push(line.to_string());
    }
    block
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Type,
    Size,
    PackedSize,
    Ratio,
    Mtime,
    Attributes,
    Crc32,
    HostOs,
    Compression,
    Flags,
}

impl Field {
    fn from_key(key: &str) -> Option<Self> {
        let field = match key {
            "name" => Field::Name,
            "type" => Field::Type,
            "size" => Field::Size,
            "packed size" => Field::PackedSize,
            "ratio" => Field::Ratio,
            "mtime" => Field::Mtime,
            "attributes" => Field::Attributes,
            "crc32" => Field::Crc32,
            "host os" => Field::HostOs,
            "compression" => Field::Compression,
            "flags" => Field::Flags,
            _ => return None,
        };
        Some(field)
    }

    fn apply(self, entry: &mut Entry, value: &str) -> Result<(), ListError> {
        match self {
            Field::Name => entry.path = value.to_string(),
            Field::Type => entry.kind = EntryKind::from_type_field(value),
            Field::Size => entry.size = parse_number("size", value)?,
            Field::PackedSize => {
                entry.packed_size = if value.is_empty() {
                    -1
                } else {
                    parse_number("packed size", value)?
                };
            }
            Field::Ratio => entry.ratio = value.to_string(),
            Field::Mtime => entry.modified = NaiveDateTime::parse_from_str(value, TIME_LAYOUT).ok(),
            Field::Attributes => entry.attributes = value.to_string(),
            Field::Crc32 => entry.crc = value.to_string(),
            Field::HostOs => entry.host_os = value.to_string(),
            Field::Compression => entry.compression = value.to_string(),
            Field::Flags => entry.flags = value.to_string(),
        }
        Ok(())
    }
}

/// Split `key: value`. A trimmed `Name:` line has lost the space after the
/// colon, so a trailing colon reads as a key with a blank value.
fn split_line(line: &str) -> Option<(&str, &str)> {
    line.split_once(": ")
        .or_else(|| line.strip_suffix(':').map(|key| (key, "")))
}

fn parse_entry_lines(lines: &[String]) -> Result<Entry, ListError> {
    let mut entry = Entry::default();
    for line in lines {
        let (key, value) =
            split_line(line).ok_or_else(|| ListError::MalformedLine { line: line.clone() })?;
        if let Some(field) = Field::from_key(&key.to_lowercase()) {
            field.apply(&mut entry, value.trim())?;
        }
    }
    Ok(entry)
}

fn parse_number(field: &'static str, value: &str) -> Result<i64, ListError> {
    value.parse::<i64>().map_err(|source| ListError::InvalidNumber {
        field,
        value: value.to_string(),
        source,
    })
}

pub(crate) fn list_command(cmd: &mut Command, archive_path: &Path, password: &str, threads: usize) {
    cmd.arg("lt")               // Technical listing
        .arg(format!("-mt{}", threads))
        .arg(format!("-p{}", password))
        .arg(archive_path);
}

pub(crate) fn extract_command(
    cmd: &mut Command,
    archive_path: &Path,
    password: &str,
    threads: usize,
    file_in_archive: &str,
) {
    cmd.arg("p")                // Print file to stdout
        .arg("-inul")           // No banner mixed into the data
        .arg(format!("-mt{}", threads))
        .arg(format!("-p{}", password))
        .arg(archive_path)
        .arg(file_in_archive);
}

pub(crate) fn extract_all_command(
    cmd: &mut Command,
    archive_path: &Path,
    password: &str,
    threads: usize,
    output_dir: &Path,
) {
    // unrar treats the destination as a directory only with a trailing separator
    let mut dest = output_dir.as_os_str().to_os_string();
    dest.push(std::path::MAIN_SEPARATOR_STR);

    cmd.arg("x")                // Extract with full paths
        .arg("-o+")             // Overwrite existing files
        .arg("-y")              // Yes to all prompts
        .arg(format!("-mt{}", threads))
        .arg(format!("-p{}", password))
        .arg(archive_path)
        .arg(dest);
}
