// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Update package archive reader (tar container with random-access entries)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: 10 unit tests + host tests (via tests/recovery_host)
//!   - ustar/GNU header parsing and checksum validation
//!   - GNU long names and ustar prefixes
//!   - empty, truncated and duplicate-entry rejection
//!   - security: path-traversal and absolute path rejection
//!
//! Packages are plain tar streams. Entry data is stored uncompressed, so every
//! regular file has a fixed byte offset inside the package which the streaming
//! updater can seek to directly.
//!
//! ADR: DESIGN.md (package archive)

use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::path::Path;

use thiserror::Error;

const BLOCK_SIZE: u64 = 512;
const MAX_ENTRIES: usize = 4096;
const MAX_LONG_NAME_BYTES: u64 = 4096;
/// Upper bound for entries pulled into memory (properties, metadata, nested archives).
pub const MAX_IN_MEMORY_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// Errors raised while opening a package or reading one of its entries.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Underlying read failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// The bytes do not form a usable tar container.
    #[error("invalid container: {0}")]
    InvalidContainer(&'static str),
    /// An entry name escapes the package root.
    #[error("unsafe entry path `{0}`")]
    UnsafePath(String),
    /// The entry exists but its content cannot be produced.
    #[error("entry `{name}` unreadable: {reason}")]
    EntryUnreadable { name: String, reason: &'static str },
}

/// A regular file inside a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    name: String,
    offset: u64,
    size: u64,
}

impl Entry {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte offset of the entry data from the start of the package.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Read-only view of an opened package. Dropping the value closes it.
pub trait PackageArchive {
    /// Regular files in archive order.
    fn entries(&self) -> &[Entry];

    /// Reads the whole content of `entry`.
    fn read_entry(&self, entry: &Entry) -> Result<Vec<u8>, ArchiveError>;

    /// Looks up a regular file by its exact name.
    fn find_entry(&self, name: &str) -> Option<&Entry> {
        self.entries().iter().find(|entry| entry.name == name)
    }
}

/// Positional reads over the bytes backing a package.
pub trait ReadAt {
    fn len(&self) -> u64;

    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()>;
}

impl ReadAt for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::UnexpectedEof, "offset out of range"))?;
        let end = start
            .checked_add(buf.len())
            .filter(|end| *end <= self.as_slice().len())
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "read past end"))?;
        buf.copy_from_slice(&self[start..end]);
        Ok(())
    }
}

#[cfg(unix)]
impl ReadAt for File {
    fn len(&self) -> u64 {
        self.metadata().map(|meta| meta.len()).unwrap_or(0)
    }

    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        std::os::unix::fs::FileExt::read_exact_at(self, buf, offset)
    }
}

/// Tar-backed package. Only the directory is kept in memory; entry data is read
/// on demand.
#[derive(Debug)]
pub struct TarPackage<S = File> {
    source: S,
    entries: Vec<Entry>,
}

#[cfg(unix)]
impl TarPackage<File> {
    /// Opens the package stored at `path`.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path)?;
        Self::from_source(file)
    }
}

impl TarPackage<Vec<u8>> {
    /// Opens a package held in memory (e.g. an archive nested in another package).
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ArchiveError> {
        Self::from_source(bytes)
    }
}

impl<S: ReadAt> TarPackage<S> {
    pub fn from_source(source: S) -> Result<Self, ArchiveError> {
        let entries = scan_entries(&source)?;
        Ok(Self { source, entries })
    }
}

impl<S: ReadAt> PackageArchive for TarPackage<S> {
    fn entries(&self) -> &[Entry] {
        &self.entries
    }

    fn read_entry(&self, entry: &Entry) -> Result<Vec<u8>, ArchiveError> {
        let unreadable =
            |reason| ArchiveError::EntryUnreadable { name: entry.name.clone(), reason };
        if entry.size > MAX_IN_MEMORY_ENTRY_BYTES {
            return Err(unreadable("entry exceeds in-memory read limit"));
        }
        let in_bounds = entry
            .offset
            .checked_add(entry.size)
            .is_some_and(|end| end <= self.source.len());
        if !in_bounds {
            return Err(unreadable("entry out of bounds"));
        }
        let mut data = vec![0u8; entry.size as usize];
        self.source.read_exact_at(&mut data, entry.offset).map_err(|_| unreadable("short read"))?;
        Ok(data)
    }
}

fn scan_entries<S: ReadAt>(source: &S) -> Result<Vec<Entry>, ArchiveError> {
    let len = source.len();
    let mut entries = Vec::new();
    let mut names = BTreeSet::new();
    let mut headers = 0usize;
    let mut long_name: Option<String> = None;
    let mut header = [0u8; BLOCK_SIZE as usize];
    let mut offset = 0u64;

    while offset + BLOCK_SIZE <= len {
        source.read_exact_at(&mut header, offset)?;
        if header.iter().all(|b| *b == 0) {
            break;
        }
        verify_checksum(&header)?;
        headers += 1;

        let size = parse_numeric(&header[124..136])?;
        let typeflag = header[156];
        let data_start = offset + BLOCK_SIZE;
        let data_end = data_start
            .checked_add(size)
            .ok_or(ArchiveError::InvalidContainer("tar size overflow"))?;
        if data_end > len {
            return Err(ArchiveError::InvalidContainer("truncated tar entry"));
        }

        match typeflag {
            b'L' => {
                if size > MAX_LONG_NAME_BYTES {
                    return Err(ArchiveError::InvalidContainer("long name too large"));
                }
                let mut raw = vec![0u8; size as usize];
                source.read_exact_at(&mut raw, data_start)?;
                long_name = Some(parse_name(&raw)?);
            }
            // pax records only carry attributes we do not use
            b'x' | b'g' => {}
            _ => {
                let name = match long_name.take() {
                    Some(name) => name,
                    None => header_name(&header)?,
                };
                if !is_safe_path(&name) {
                    return Err(ArchiveError::UnsafePath(name));
                }
                if matches!(typeflag, 0 | b'0' | b'7') {
                    if !names.insert(name.clone()) {
                        return Err(ArchiveError::InvalidContainer("duplicate entry"));
                    }
                    if entries.len() == MAX_ENTRIES {
                        return Err(ArchiveError::InvalidContainer("too many entries"));
                    }
                    entries.push(Entry { name, offset: data_start, size });
                }
            }
        }

        offset = data_start + size.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
    }

    if headers == 0 {
        return Err(ArchiveError::InvalidContainer("empty archive"));
    }
    if long_name.is_some() {
        return Err(ArchiveError::InvalidContainer("dangling long name record"));
    }
    Ok(entries)
}

fn verify_checksum(header: &[u8]) -> Result<(), ArchiveError> {
    let stored = parse_numeric(&header[148..156])
        .map_err(|_| ArchiveError::InvalidContainer("invalid tar checksum"))?;
    let computed: u64 = header
        .iter()
        .enumerate()
        .map(|(i, b)| if (148..156).contains(&i) { u64::from(b' ') } else { u64::from(*b) })
        .sum();
    if stored != computed {
        return Err(ArchiveError::InvalidContainer("tar checksum mismatch"));
    }
    Ok(())
}

fn header_name(header: &[u8]) -> Result<String, ArchiveError> {
    let name = parse_name(&header[0..100])?;
    // POSIX ustar splits long paths into prefix + name; GNU headers reuse the field.
    if &header[257..263] == b"ustar\0" && header[345] != 0 {
        let prefix = parse_name(&header[345..500])?;
        return Ok(format!("{prefix}/{name}"));
    }
    Ok(name)
}

fn parse_name(field: &[u8]) -> Result<String, ArchiveError> {
    let len = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    let name = core::str::from_utf8(&field[..len])
        .map_err(|_| ArchiveError::InvalidContainer("tar name invalid utf-8"))?;
    if name.is_empty() {
        return Err(ArchiveError::InvalidContainer("empty tar name"));
    }
    Ok(name.to_string())
}

/// Parses an octal header field, or a GNU base-256 field when the high bit is set.
fn parse_numeric(field: &[u8]) -> Result<u64, ArchiveError> {
    if field.first().is_some_and(|b| b & 0x80 != 0) {
        let mut out: u64 = u64::from(field[0] & 0x7f);
        for b in &field[1..] {
            out = out
                .checked_mul(256)
                .and_then(|v| v.checked_add(u64::from(*b)))
                .ok_or(ArchiveError::InvalidContainer("tar size overflow"))?;
        }
        return Ok(out);
    }

    let mut out: u64 = 0;
    let mut saw_digit = false;
    for b in field {
        if *b == 0 || *b == b' ' {
            continue;
        }
        if !(b'0'..=b'7').contains(b) {
            return Err(ArchiveError::InvalidContainer("invalid tar number"));
        }
        saw_digit = true;
        out = out
            .checked_mul(8)
            .and_then(|v| v.checked_add(u64::from(b - b'0')))
            .ok_or(ArchiveError::InvalidContainer("tar size overflow"))?;
    }
    if !saw_digit {
        return Err(ArchiveError::InvalidContainer("missing tar number"));
    }
    Ok(out)
}

fn is_safe_path(path: &str) -> bool {
    if path.starts_with('/') || path.contains('\0') {
        return false;
    }
    !path.split('/').any(|part| part == "..")
}
