// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Package compatibility verification (nested compatibility archive)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: 5 unit tests + host tests (via tests/recovery_host)
//!
//! Packages built before the compatibility check existed carry no
//! `compatibility.tar` entry and are accepted. A present entry must be a valid,
//! non-empty tar archive whose files pass the configured check.

use log::{error, info};

use crate::package::{PackageArchive, TarPackage};

/// Name of the optional nested compatibility archive.
pub const COMPATIBILITY_ENTRY: &str = "compatibility.tar";

/// One file from the nested compatibility archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityFile {
    pub name: String,
    pub content: Vec<u8>,
}

/// Device-side policy applied to the declared compatibility files.
pub trait CompatibilityCheck {
    fn check(&self, files: &[CompatibilityFile]) -> Result<(), String>;
}

/// Accepts any well-formed declaration; devices without a compatibility matrix use this.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptDeclared;

impl CompatibilityCheck for AcceptDeclared {
    fn check(&self, _files: &[CompatibilityFile]) -> Result<(), String> {
        Ok(())
    }
}

/// Verifies the package with [`AcceptDeclared`].
pub fn verify_package_compatibility(package: &dyn PackageArchive) -> bool {
    verify_package_compatibility_with(package, &AcceptDeclared)
}

/// Returns `true` when the package may be installed on this device.
///
/// Any failure after the compatibility entry was found is reported as
/// incompatible.
pub fn verify_package_compatibility_with(
    package: &dyn PackageArchive,
    policy: &dyn CompatibilityCheck,
) -> bool {
    let Some(entry) = package.find_entry(COMPATIBILITY_ENTRY) else {
        info!("compat: package has no {COMPATIBILITY_ENTRY} entry");
        return true;
    };

    let bytes = match package.read_entry(entry) {
        Ok(bytes) => bytes,
        Err(err) => {
            error!("compat: failed to read {COMPATIBILITY_ENTRY}: {err}");
            return false;
        }
    };
    let nested = match TarPackage::from_bytes(bytes) {
        Ok(nested) => nested,
        Err(err) => {
            error!("compat: failed to open {COMPATIBILITY_ENTRY}: {err}");
            return false;
        }
    };

    let mut files = Vec::with_capacity(nested.entries().len());
    for entry in nested.entries() {
        match nested.read_entry(entry) {
            Ok(content) => {
                files.push(CompatibilityFile { name: entry.name().to_string(), content });
            }
            Err(err) => {
                error!("compat: failed to read {}: {err}", entry.name());
                return false;
            }
        }
    }
    if files.is_empty() {
        error!("compat: {COMPATIBILITY_ENTRY} declares no files");
        return false;
    }

    match policy.check(&files) {
        Ok(()) => true,
        Err(reason) => {
            error!("compat: package rejected: {reason}");
            false
        }
    }
}
