// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Host integration tests for the recovery core (package install + menu)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: 19 tests (tests/package_flow.rs, tests/menu_flow.rs)
//!
//! Shared fixtures: tar package builders written to a scratch directory.
//!
//! ADR: DESIGN.md (host tests)

use std::path::{Path, PathBuf};

use tar::{Builder as TarBuilder, EntryType, Header};

pub const PROPERTIES: &str =
    "FILE_HASH=lURPCIkIAjtMOyB/EjQcl8zDzqtD6Ta3tJef6G/+z2k=\nFILE_SIZE=871903868\n\
     METADATA_HASH=tBvj43QOB0Jn++JojcpVdbRLz0qdAuL+uTkSy7hokaw=\nMETADATA_SIZE=70604\n";

pub const METADATA: &str = "ota-type=AB\npre-device=nexus-virt\npost-timestamp=1767225600\n";

/// Ordered package contents.
#[derive(Default)]
pub struct PackageBuilder {
    files: Vec<(String, Vec<u8>)>,
}

impl PackageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: &str, bytes: impl AsRef<[u8]>) -> Self {
        self.files.push((path.to_string(), bytes.as_ref().to_vec()));
        self
    }

    /// A complete streaming package.
    pub fn streaming(payload: &[u8]) -> Self {
        Self::new()
            .file(updates::install::PAYLOAD_PROPERTIES_ENTRY, PROPERTIES)
            .file(updates::install::METADATA_ENTRY, METADATA)
            .file(updates::install::PAYLOAD_ENTRY, payload)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut tar = TarBuilder::new(Vec::new());
        for (path, bytes) in &self.files {
            append_file(&mut tar, path, bytes);
        }
        tar.into_inner().expect("tar bytes")
    }

    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).expect("write package");
        path
    }
}

pub fn append_file(builder: &mut TarBuilder<Vec<u8>>, path: &str, bytes: &[u8]) {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header.set_cksum();
    builder.append_data(&mut header, path, bytes).expect("append file");
}

/// Nested compatibility archive with the given files.
pub fn compatibility_archive(files: &[(&str, &str)]) -> Vec<u8> {
    files
        .iter()
        .fold(PackageBuilder::new(), |builder, (path, content)| builder.file(path, content))
        .build()
}

/// Appends a file with a raw path, bypassing tar library path validation.
pub fn append_raw_path(builder: &mut TarBuilder<Vec<u8>>, path: &str, bytes: &[u8]) {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    let name = header.as_old_mut().name.as_mut();
    name.fill(0);
    name[..path.len()].copy_from_slice(path.as_bytes());
    header.set_cksum();
    builder.append(&header, bytes).expect("append raw");
}
