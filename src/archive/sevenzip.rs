//! 7z binary integration: technical listing parser and command lines.
//!
//! `7z l -slt` prints a banner and archive-level properties, then one
//! `key = value` block per member, blocks separated by blank lines:
//!
//! ```text
//! 7-Zip 19.00 (x64) : Copyright (c) 1999-2018 Igor Pavlov : 2019-02-21
//!
//! Listing archive: chromedriver_win32.zip
//!
//! --
//! Path = chromedriver_win32.zip
//! Type = zip
//! Physical Size = 4599757
//!
//! ----------
//! Path = chromedriver.exe
//! Folder = -
//! Size = 8713728
//! Packed Size = 4599627
//! Modified = 2018-12-10 14:54:46
//! Created =
//! Attributes =  -rwxrwxrwx
//! CRC = 4A032CBD
//! Method = Deflate
//! ```
//!
//! The same grammar covers 7z, zip, rar, iso, rpm, deb and tar; only the set
//! of keys differs. rpm output has no `----------` line and instead repeats
//! the `--` property block twice before the first member.
//!
//! # 7z Commands Reference
//!
//! - List: `7z l -slt -sccUTF-8 -p<pw> archive`
//! - Extract one member to stdout: `7z x -so -bd -spd -p<pw> archive "path/in/archive"`
//! - Extract everything: `7z x -y -aoa -sccUTF-8 -p<pw> -o<dir> archive`

use std::path::Path;
use std::process::Command;

use chrono::NaiveDateTime;
use tracing::debug;

use super::entry::Entry;
use super::error::ListError;
use super::{output_lines, Listing, ListingParser};

/// Separator printed before the first member block
pub const NORMAL_SEP: &str = "----------";
/// Separator printed before each archive property block (rpm prints two)
pub const RPM_SEP: &str = "--";

/// `%.f` also accepts the 7-digit fractions printed by newer 7-Zip releases
const TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Parser for the `key = value` output of `7z l -slt`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SevenZipListing;

impl ListingParser for SevenZipListing {
    fn parse_listing(&self, output: &[u8]) -> Result<Listing, ListError> {
        let mut lines = output_lines(output);
        let properties = advance_to_first_entry(&mut lines)?;

        let mut entries = Vec::new();
        loop {
            let block = entry_lines(&mut lines);
            if block.is_empty() {
                break;
            }
            entries.push(parse_entry_lines(&block)?);
        }

        debug!(
            "Parsed {} entries and {} archive properties from 7z listing",
            entries.len(),
            properties.len()
        );
        Ok(Listing { properties, entries })
    }
}

/// Skip to the first member block, keeping the archive property block.
fn advance_to_first_entry<I>(lines: &mut I) -> Result<Vec<(String, String)>, ListError>
where
    I: Iterator<Item = String>,
{
    let mut properties = Vec::new();
    let mut rpm_sep_count = 0;
    for line in lines {
        if line == RPM_SEP {
            rpm_sep_count += 1;
            if rpm_sep_count == 2 {
                return Ok(properties);
            }
            continue;
        }
        if line == NORMAL_SEP {
            return Ok(properties);
        }
        // Banner and "Listing archive:" lines come before the first `--`
        if rpm_sep_count == 1 {
            if let Some((key, value)) = line.split_once(" =") {
                properties.push((key.trim().to_string(), value.trim().to_string()));
            }
        }
    }
    Err(ListError::NoEntries)
}

/// Collect the trimmed lines of the next block.
fn entry_lines<I>(lines: &mut I) -> Vec<String>
where
    I: Iterator<Item = String>,
{
    let mut block = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() || line == NORMAL_SEP {
            break;
        }
        block.push(line.to_string());
    }
    block
}

/// Keys understood in a `-slt` block, after lower-casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Path,
    Size,
    PackedSize,
    Modified,
    Created,
    Accessed,
    Attributes,
    Crc,
    Encrypted,
    Method,
    Block,
    Comment,
    VolumeIndex,
    Solid,
    Commented,
    SplitBefore,
    SplitAfter,
    Folder,
    HostOs,
    Version,
    AlternateStream,
    SymbolicLink,
    HardLink,
    CopyLink,
    Checksum,
    NtSecurity,
    Characteristics,
    Offset,
    Mode,
    User,
    Group,
    Type,
    PhysicalSize,
    ClusterSize,
}

impl Field {
    fn from_key(key: &str) -> Option<Self> {
        let field = match key {
            "path" => Field::Path,
            "size" => Field::Size,
            "packed size" => Field::PackedSize,
            "modified" => Field::Modified,
            "created" => Field::Created,
            "accessed" => Field::Accessed,
            // iso and rpm listings have no attributes
            "attributes" => Field::Attributes,
            "crc" => Field::Crc,
            "encrypted" => Field::Encrypted,
            "method" => Field::Method,
            "block" => Field::Block,
            "comment" => Field::Comment,
            "volume index" => Field::VolumeIndex,
            "solid" => Field::Solid,
            "commented" => Field::Commented,
            "split before" => Field::SplitBefore,
            "split after" => Field::SplitAfter,
            "folder" => Field::Folder,
            "host os" => Field::HostOs,
            "version" => Field::Version,
            // rar 5.7+
            "alternate stream" => Field::AlternateStream,
            "symbolic link" => Field::SymbolicLink,
            "hard link" => Field::HardLink,
            "copy link" => Field::CopyLink,
            "checksum" => Field::Checksum,
            "nt security" => Field::NtSecurity,
            "characteristics" => Field::Characteristics,
            "offset" => Field::Offset,
            // tar
            "mode" => Field::Mode,
            "user" => Field::User,
            "group" => Field::Group,
            // e.g. "Type = Rpm/xz"
            "type" => Field::Type,
            "physical size" => Field::PhysicalSize,
            "cluster size" => Field::ClusterSize,
            _ => return None,
        };
        Some(field)
    }

    fn apply(self, entry: &mut Entry, value: &str) -> Result<(), ListError> {
        match self {
            Field::Path => entry.path = value.to_string(),
            Field::Size => entry.size = parse_number("size", value)?,
            Field::PackedSize => entry.packed_size = parse_number("packed size", value)?,
            Field::Modified => entry.modified = parse_time(value),
            Field::Created => entry.created = parse_time(value),
            Field::Accessed => entry.accessed = parse_time(value),
            Field::Attributes => entry.attributes = value.to_string(),
            Field::Crc => entry.crc = value.to_string(),
            Field::Encrypted => entry.encrypted = value.to_string(),
            Field::Method => entry.method = value.to_string(),
            Field::Block => entry.block = parse_number("block", value)?,
            Field::Comment => entry.comment = value.to_string(),
            Field::VolumeIndex => entry.volume_index = parse_number("volume index", value)?,
            Field::Solid => entry.solid = value.to_string(),
            Field::Commented => entry.commented = value.to_string(),
            Field::SplitBefore => entry.split_before = value.to_string(),
            Field::SplitAfter => entry.split_after = value.to_string(),
            Field::Folder => entry.folder = value.to_string(),
            Field::HostOs => entry.host_os = value.to_string(),
            Field::Version => entry.version = value.to_string(),
            Field::AlternateStream => entry.alternate_stream = value.to_string(),
            Field::SymbolicLink => entry.symbolic_link = value.to_string(),
            Field::HardLink => entry.hard_link = value.to_string(),
            Field::CopyLink => entry.copy_link = value.to_string(),
            Field::Checksum => entry.checksum = value.to_string(),
            Field::NtSecurity => entry.nt_security = value.to_string(),
            Field::Characteristics => entry.characteristics = value.to_string(),
            Field::Offset => entry.offset = parse_number("offset", value)?,
            Field::Mode => entry.mode = value.to_string(),
            Field::User => entry.user = value.to_string(),
            Field::Group => entry.group = value.to_string(),
            Field::Type => entry.format = value.to_string(),
            Field::PhysicalSize => entry.physical_size = parse_number("physical size", value)?,
            Field::ClusterSize => entry.cluster_size = parse_number("cluster size", value)?,
        }
        Ok(())
    }
}

fn parse_entry_lines(lines: &[String]) -> Result<Entry, ListError> {
    let mut entry = Entry::default();
    let mut has_physical_size = false;
    let mut has_cluster_size = false;

    for line in lines {
        let (key, value) = line
            .split_once(" =")
            .ok_or_else(|| ListError::MalformedLine { line: line.clone() })?;
        let Some(field) = Field::from_key(&key.to_lowercase()) else {
            continue;
        };

        let value = value.trim();
        if field == Field::Path && value.is_empty() {
            return Err(ListError::EmptyField { field: "path" });
        }
        // Blank numeric fields render as zero in this dialect
        let value = if value.is_empty() { "0" } else { value };

        field.apply(&mut entry, value)?;
        match field {
            Field::PhysicalSize => has_physical_size = true,
            Field::ClusterSize => has_cluster_size = true,
            _ => {}
        }
    }

    if entry.path.is_empty() {
        return Err(ListError::EmptyField { field: "path" });
    }

    // iso and rpm omit attributes
    if entry.attributes.is_empty() {
        match entry.folder.as_str() {
            "+" => entry.attributes = "D".to_string(),
            "-" => entry.attributes = "A".to_string(),
            _ => {}
        }
    }
    // Disk-image style listings report sizes under different keys
    if has_physical_size && entry.packed_size <= 0 {
        entry.packed_size = entry.physical_size;
    }
    if has_cluster_size && entry.size <= 0 {
        entry.size = entry.cluster_size;
    }
    entry.infer_kind();

    Ok(entry)
}

fn parse_number(field: &'static str, value: &str) -> Result<i64, ListError> {
    value.parse::<i64>().map_err(|source| ListError::InvalidNumber {
        field,
        value: value.to_string(),
        source,
    })
}

/// Timestamps are often blank; a bad one leaves the field unset.
fn parse_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIME_LAYOUT).ok()
}

pub(crate) fn list_command(cmd: &mut Command, archive_path: &Path, password: &str) {
    cmd.arg("l")            // List
        .arg("-slt")        // Technical listing format (key = value)
        .arg("-sccUTF-8")   // Force UTF-8 console output
        .arg(format!("-p{}", password))
        .arg(archive_path);
}

pub(crate) fn extract_command(
    cmd: &mut Command,
    archive_path: &Path,
    password: &str,
    file_in_archive: &str,
) {
    cmd.arg("x")
        .arg("-so")         // Write to stdout
        .arg("-bd")         // Disable progress indicator
        .arg("-spd")        // Disable wildcard matching
        .arg(format!("-p{}", password))
        .arg(archive_path)
        .arg(file_in_archive);
}

pub(crate) fn extract_all_command(
    cmd: &mut Command,
    archive_path: &Path,
    password: &str,
    output_dir: &Path,
) {
    cmd.arg("x")            // Extract with full paths
        .arg("-y")          // Yes to all prompts
        .arg("-aoa")        // Overwrite all existing files
        .arg("-sccUTF-8")
        .arg(format!("-p{}", password))
        .arg(format!("-o{}", output_dir.display()))
        .arg(archive_path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::EntryKind;

    const ZIP_LISTING: &[u8] = b"\
7-Zip 19.00 (x64) : Copyright (c) 1999-2018 Igor Pavlov : 2019-02-21

Scanning the drive for archives:
1 file, 4599757 bytes (4492 KiB)

Listing archive: chromedriver_win32.zip

--
Path = chromedriver_win32.zip
Type = zip
Physical Size = 4599757

----------
Path = chromedriver.exe
Folder = -
Size = 8713728
Packed Size = 4599627
Modified = 2018-12-10 14:54:46
Created =
Accessed =
Attributes =  -rwxrwxrwx
Encrypted = -
Comment =
CRC = 4A032CBD
Method = Deflate
Characteristics =
Host OS = FAT
Version = 20
Volume Index = 0
Offset = 0

Path = docs
Folder = +
Size = 0
Packed Size = 0
Modified = 2018-12-10 14:54:40
Attributes = D
Host OS = FAT
Version = 20
Volume Index = 0
Offset = 4599700

";

    #[test]
    fn test_parse_zip_listing() {
        let entries = SevenZipListing.parse(ZIP_LISTING).unwrap();
        assert_eq!(entries.len(), 2);

        let exe = &entries[0];
        assert_eq!(exe.path, "chromedriver.exe");
        assert_eq!(exe.size, 8713728);
        assert_eq!(exe.packed_size, 4599627);
        assert_eq!(exe.attributes, "-rwxrwxrwx");
        assert_eq!(exe.crc, "4A032CBD");
        assert_eq!(exe.method, "Deflate");
        assert_eq!(exe.host_os, "FAT");
        assert_eq!(exe.kind, EntryKind::File);
        assert_eq!(
            exe.modified,
            NaiveDateTime::parse_from_str("2018-12-10 14:54:46", "%Y-%m-%d %H:%M:%S").ok()
        );
        // Blank timestamps render as "0", which is not a valid time
        assert_eq!(exe.created, None);
        // Blank string fields render as "0" too
        assert_eq!(exe.comment, "0");

        assert_eq!(entries[1].path, "docs");
        assert_eq!(entries[1].offset, 4599700);
        assert!(entries[1].is_dir());
    }

    #[test]
    fn test_parse_7z_listing_with_fractional_times() {
        let sample = b"\
--
Path = example.7z
Type = 7z

----------
Path = thefilename.txt
Size = 12
Packed Size = 16
Modified = 2019-08-28 16:38:07.1234567
Created = 2019-08-28 16:38:07
Accessed = 2019-08-28 16:37:54
Attributes = A_ -rw-r--r--
CRC = 3610A686
Encrypted = -
Method = LZMA2:12
Block = 0
";
        let entries = SevenZipListing.parse(sample).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.block, 0);
        assert_eq!(entry.method, "LZMA2:12");
        let modified = entry.modified.unwrap();
        assert_eq!(modified.and_utc().timestamp_subsec_nanos(), 123_456_700);
        assert!(entry.created.is_some());
        assert!(entry.accessed.is_some());
    }

    #[test]
    fn test_folder_fixes_up_missing_attributes() {
        let sample = b"\
----------
Path = image/dir
Folder = +
Size = 0

Path = image/file.bin
Folder = -
Size = 10

";
        let entries = SevenZipListing.parse(sample).unwrap();
        assert_eq!(entries[0].attributes, "D");
        assert_eq!(entries[1].attributes, "A");
        assert_eq!(entries[0].kind, EntryKind::Directory);
        assert_eq!(entries[1].kind, EntryKind::File);
    }

    #[test]
    fn test_blank_packed_size_is_zero_absent_is_unknown() {
        let sample = b"\
----------
Path = a.txt
Size = 1
Packed Size =

Path = b.txt
Size = 2

";
        let entries = SevenZipListing.parse(sample).unwrap();
        assert_eq!(entries[0].packed_size, 0);
        assert_eq!(entries[1].packed_size, -1);
    }

    #[test]
    fn test_rpm_listing_uses_double_separator_and_size_fallbacks() {
        let sample = b"\
Listing archive: package.rpm

--
Path = package.rpm
Type = Rpm
Physical Size = 30000

--
Path = package.cpio.xz
Type = xz
Physical Size = 29000

Path = package.cpio
Type = Rpm/xz
Physical Size = 29000
Cluster Size = 120000

";
        let entries = SevenZipListing.parse(sample).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].path, "package.cpio");
        assert_eq!(entries[1].format, "Rpm/xz");
        assert_eq!(entries[1].packed_size, 29000);
        assert_eq!(entries[1].size, 120000);
        assert_eq!(entries[1].cluster_size, 120000);

        // Only the first `--` block describes the archive itself
        let listing = SevenZipListing.parse_listing(sample).unwrap();
        assert_eq!(listing.property("path"), Some("package.rpm"));
        assert_eq!(listing.property("Physical Size"), Some("30000"));
        assert_eq!(listing.properties.len(), 3);
    }

    #[test]
    fn test_reported_sizes_win_over_fallbacks() {
        let sample = b"\
----------
Path = disk/file.bin
Size = 4096
Packed Size = 1500
Physical Size = 2048
Cluster Size = 8192

";
        let entries = SevenZipListing.parse(sample).unwrap();
        assert_eq!(entries[0].packed_size, 1500);
        assert_eq!(entries[0].physical_size, 2048);
        assert_eq!(entries[0].size, 4096);
        assert_eq!(entries[0].cluster_size, 8192);
    }

    #[test]
    fn test_invalid_utf8_name_keeps_listing() {
        let sample = b"----------\nPath = good.txt\nSize = 1\n\nPath = bad\xE9.txt\r\nSize = 2\r\n\n";
        let entries = SevenZipListing.parse(sample).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "good.txt");
        assert_eq!(entries[1].path, "bad\u{FFFD}.txt");
        assert_eq!(entries[1].size, 2);
    }

    #[test]
    fn test_terminal_empty_block_yields_no_entries() {
        let sample = b"header\n----------\n\n\n";
        let entries = SevenZipListing.parse(sample).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_missing_sentinel_is_no_entries() {
        let sample = b"7-Zip banner\nPath = a.txt\nSize = 1\n";
        let err = SevenZipListing.parse(sample).unwrap_err();
        assert!(matches!(err, ListError::NoEntries));
    }

    #[test]
    fn test_malformed_line_fails() {
        let sample = b"----------\nPath = a.txt\ngarbage line\n\n";
        let err = SevenZipListing.parse(sample).unwrap_err();
        assert!(matches!(err, ListError::MalformedLine { ref line } if line == "garbage line"));
    }

    #[test]
    fn test_blank_path_fails() {
        let sample = b"----------\nPath =\nSize = 1\n\n";
        let err = SevenZipListing.parse(sample).unwrap_err();
        assert!(matches!(err, ListError::EmptyField { field: "path" }));
    }

    #[test]
    fn test_bad_number_aborts_whole_parse() {
        let sample = b"\
----------
Path = good.txt
Size = 1

Path = bad.txt
Size = lots

";
        let err = SevenZipListing.parse(sample).unwrap_err();
        match err {
            ListError::InvalidNumber { field, value, .. } => {
                assert_eq!(field, "size");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let sample = b"----------\nPath = a.txt\nSome Future Key = 42\nSize = 3\n\n";
        let entries = SevenZipListing.parse(sample).unwrap();
        assert_eq!(entries[0].size, 3);
    }

    #[test]
    fn test_parse_is_repeatable() {
        let first = SevenZipListing.parse(ZIP_LISTING).unwrap();
        let second = SevenZipListing.parse(ZIP_LISTING).unwrap();
        assert_eq!(first, second);
    }
}
