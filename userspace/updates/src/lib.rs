// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Update domain library (package access, compatibility, update dispatch)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: 43 unit tests + integration tests (via tests/recovery_host)
//!   - tar package scanning and path-traversal rejection
//!   - compatibility verification of the nested archive
//!   - streaming/legacy updater command construction
//!   - block transfer-list parsing
//!
//! PUBLIC API:
//!   - TarPackage / PackageArchive: random-access view of an update package
//!   - verify_package_compatibility: pre-install compatibility gate
//!   - UpdateDispatcher: StreamingDispatcher and LegacyDispatcher
//!   - TransferList / Command / RangeSet: block update command grammar
//!
//! DEPENDENCIES:
//!   - thiserror: error enums
//!   - log: install/compat diagnostics
//!
//! ADR: DESIGN.md (update dispatch)

#![forbid(unsafe_code)]

pub mod commands;
pub mod compat;
pub mod install;
pub mod metadata;
pub mod package;
pub mod rangeset;

pub use commands::{Command, CommandError, CommandType, ParseOptions, TransferList};
pub use compat::{
    verify_package_compatibility, verify_package_compatibility_with, AcceptDeclared,
    CompatibilityCheck, CompatibilityFile, COMPATIBILITY_ENTRY,
};
pub use install::{
    DispatchError, InstallStatus, LegacyDispatcher, StreamingDispatcher, UpdateCommand,
    UpdateDispatcher, UpdatePlan,
};
pub use metadata::PackageMetadata;
pub use package::{ArchiveError, Entry, PackageArchive, ReadAt, TarPackage};
pub use rangeset::{RangeSet, RangeSetError};
