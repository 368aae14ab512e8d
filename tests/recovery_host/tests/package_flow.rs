// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Integration tests for package verification and update dispatch
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: 12 tests
//!
//! TEST_SCOPE:
//!   - Compatibility verdicts on file-backed packages
//!   - Streaming argv contract and payload offset
//!   - Malformed package rejection (never a partial command)
//!   - Legacy update-binary extraction
//!   - Install driver exit statuses
//!   - Path-traversal rejection (security)
//!   - Block transfer list shipped inside a package
//!
//! ADR: DESIGN.md (host tests)

use std::fs;
use std::io::{Read, Seek, SeekFrom};

use recovery_host::{
    append_file, append_raw_path, compatibility_archive, PackageBuilder, METADATA, PROPERTIES,
};
use recoveryd::installer::install_package;
use tar::Builder as TarBuilder;
use updates::install::{
    LegacyDispatcher, StreamingDispatcher, UpdateDispatcher, UpdatePlan, METADATA_ENTRY,
    PAYLOAD_ENTRY, PAYLOAD_PROPERTIES_ENTRY, UPDATE_BINARY_ENTRY,
};
use updates::{
    verify_package_compatibility, ArchiveError, DispatchError, InstallStatus, PackageArchive,
    PackageMetadata, ParseOptions, TarPackage, TransferList, COMPATIBILITY_ENTRY,
};

#[test]
fn test_package_without_compatibility_entry_is_compatible() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = PackageBuilder::new().file("dummy_entry", "").write_to(dir.path(), "pkg.tar");
    let package = TarPackage::open(&path).expect("open");
    assert!(verify_package_compatibility(&package));
}

#[test]
fn test_invalid_compatibility_entry_is_incompatible() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cases = [("empty.tar", Vec::new()), ("garbage.tar", b"not an archive".to_vec())];
    for (name, content) in cases {
        let path =
            PackageBuilder::new().file(COMPATIBILITY_ENTRY, content).write_to(dir.path(), name);
        let package = TarPackage::open(&path).expect("open");
        assert!(!verify_package_compatibility(&package), "{name} must be rejected");
    }
}

#[test]
fn test_valid_compatibility_entry_is_compatible() {
    let dir = tempfile::tempdir().expect("tempdir");
    let nested = compatibility_archive(&[
        ("system_manifest.xml", "<manifest version=\"1.0\" type=\"device\"/>"),
        ("system_matrix.xml", "<compatibility-matrix version=\"1.0\" type=\"framework\"/>"),
    ]);
    let path = PackageBuilder::streaming(b"payload")
        .file(COMPATIBILITY_ENTRY, nested)
        .write_to(dir.path(), "pkg.tar");
    let package = TarPackage::open(&path).expect("open");
    assert!(verify_package_compatibility(&package));
}

#[test]
fn test_streaming_command_contract() {
    let dir = tempfile::tempdir().expect("tempdir");
    let payload = vec![0x5au8; 3000];
    let path = PackageBuilder::streaming(&payload).write_to(dir.path(), "update.tar");
    let package = TarPackage::open(&path).expect("open");
    let path_str = path.to_string_lossy().into_owned();

    let plan = StreamingDispatcher::default()
        .build_command(&path_str, &package, 0, 10)
        .expect("streaming plan");
    let UpdatePlan::Streaming(cmd) = plan else { panic!("expected streaming plan") };
    let argv = cmd.argv();

    assert_eq!(argv[0], "/sbin/update_engine_sideload");
    assert_eq!(argv[1], format!("--payload=file://{path_str}"));
    assert_eq!(argv[3], format!("--headers={PROPERTIES}"));
    assert_eq!(argv[4], "--status_fd=10");
    for prefix in ["--payload=", "--headers=", "--status_fd=", "--offset="] {
        assert_eq!(argv.iter().filter(|arg| arg.starts_with(prefix)).count(), 1, "{prefix}");
    }

    // The offset must locate the payload bytes inside the package file.
    let offset: u64 = argv[2].strip_prefix("--offset=").expect("offset").parse().expect("number");
    let mut file = fs::File::open(&path).expect("reopen");
    file.seek(SeekFrom::Start(offset)).expect("seek");
    let mut head = vec![0u8; payload.len()];
    file.read_exact(&mut head).expect("read payload");
    assert_eq!(head, payload);
}

#[test]
fn test_missing_streaming_entries_are_malformed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cases = [
        (
            "no-props.tar",
            PackageBuilder::new().file(PAYLOAD_ENTRY, "p").file(METADATA_ENTRY, METADATA),
        ),
        (
            "no-payload.tar",
            PackageBuilder::new()
                .file(PAYLOAD_PROPERTIES_ENTRY, PROPERTIES)
                .file(METADATA_ENTRY, METADATA),
        ),
        (
            "no-metadata.tar",
            PackageBuilder::new()
                .file(PAYLOAD_ENTRY, "p")
                .file(PAYLOAD_PROPERTIES_ENTRY, PROPERTIES),
        ),
    ];
    for (name, builder) in cases {
        let path = builder.write_to(dir.path(), name);
        let package = TarPackage::open(&path).expect("open");
        let err = StreamingDispatcher::default()
            .build_command(&path.to_string_lossy(), &package, 0, 10)
            .expect_err(name);
        assert!(matches!(err, DispatchError::Malformed(_)), "{name}");
        assert_eq!(err.status(), InstallStatus::Corrupt);
        assert_ne!(err.status().code(), 0);
    }
}

#[test]
fn test_metadata_entry_is_readable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = PackageBuilder::streaming(b"p").write_to(dir.path(), "pkg.tar");
    let package = TarPackage::open(&path).expect("open");
    let entry = package.find_entry(METADATA_ENTRY).expect("metadata entry");
    let metadata = PackageMetadata::parse(&package.read_entry(entry).expect("read"));
    assert_eq!(metadata.ota_type(), Some("AB"));
    assert_eq!(metadata.get("pre-device"), Some("nexus-virt"));
}

#[test]
fn test_legacy_dispatch_extracts_binary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = PackageBuilder::new()
        .file(UPDATE_BINARY_ENTRY, "#!/bin/sh\necho ui_print legacy\n")
        .write_to(dir.path(), "legacy.tar");
    let package = TarPackage::open(&path).expect("open");
    let target = dir.path().join("update-binary");

    let dispatcher: Box<dyn UpdateDispatcher> = Box::new(LegacyDispatcher::new(&target));
    let plan = dispatcher.build_command("/sdcard/legacy.tar", &package, 1, 7).expect("plan");
    let UpdatePlan::Legacy(cmd) = plan else { panic!("expected legacy plan") };
    assert_eq!(cmd.argv()[1..], ["3", "7", "/sdcard/legacy.tar", "retry"]);
    assert_eq!(fs::read_to_string(&target).expect("binary"), "#!/bin/sh\necho ui_print legacy\n");
}

#[cfg(unix)]
#[test]
fn test_install_driver_statuses() {
    let dir = tempfile::tempdir().expect("tempdir");
    let good = PackageBuilder::streaming(b"payload").write_to(dir.path(), "good.tar");
    let incompatible = PackageBuilder::streaming(b"payload")
        .file(COMPATIBILITY_ENTRY, "")
        .write_to(dir.path(), "incompatible.tar");
    let malformed = PackageBuilder::new().file(PAYLOAD_ENTRY, "p").write_to(dir.path(), "bad.tar");

    let succeeding = StreamingDispatcher::new("/bin/true");
    let failing = StreamingDispatcher::new("/bin/false");

    assert_eq!(install_package(&succeeding, &good, 0).status, InstallStatus::Success);
    assert_eq!(install_package(&failing, &good, 0).status, InstallStatus::Error);
    assert_eq!(install_package(&succeeding, &incompatible, 0).status, InstallStatus::Corrupt);
    assert_eq!(install_package(&succeeding, &malformed, 0).status, InstallStatus::Corrupt);
}

#[test]
fn test_reject_path_traversal_dotdot() {
    let mut tar = TarBuilder::new(Vec::new());
    append_file(&mut tar, PAYLOAD_ENTRY, b"p");
    append_raw_path(&mut tar, "../../etc/passwd", b"root::0:0");
    let err = TarPackage::from_bytes(tar.into_inner().expect("tar")).expect_err("traversal");
    assert!(matches!(err, ArchiveError::UnsafePath(_)));
}

#[test]
fn test_reject_absolute_path() {
    let mut tar = TarBuilder::new(Vec::new());
    append_raw_path(&mut tar, "/etc/passwd", b"root::0:0");
    let err = TarPackage::from_bytes(tar.into_inner().expect("tar")).expect_err("absolute");
    assert!(matches!(err, ArchiveError::UnsafePath(_)));
}

#[test]
fn test_truncated_package_is_rejected() {
    let mut bytes = PackageBuilder::streaming(&[1u8; 4096]).build();
    bytes.truncate(3000);
    assert!(TarPackage::from_bytes(bytes).is_err());
}

#[test]
fn test_transfer_list_from_package() {
    let list = "4\n12\n1\n2\nerase 2,10,12\nstash a1 2,0,2\nnew 2,2,10\nfree a1\n";
    let package = TarPackage::from_bytes(
        PackageBuilder::new().file("system.transfer.list", list).build(),
    )
    .expect("open");
    let entry = package.find_entry("system.transfer.list").expect("entry");
    let text = String::from_utf8(package.read_entry(entry).expect("read")).expect("utf8");
    let parsed = TransferList::parse(&text, ParseOptions::default()).expect("parse");
    assert_eq!(parsed.total_blocks, 12);
    assert_eq!(parsed.commands.len(), 4);
    assert_eq!(parsed.commands[2].target().blocks(), 8);
}
