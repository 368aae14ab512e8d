// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Package metadata (`META-INF/nexus/metadata`) key/value view

use std::collections::BTreeMap;

/// `key=value` lines from the package metadata entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    values: BTreeMap<String, String>,
}

impl PackageMetadata {
    /// Lines without `=` are ignored; later duplicates win.
    pub fn parse(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        let values = text
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .filter(|(key, _)| !key.is_empty())
            .collect();
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// `ota-type`, e.g. `AB` for streaming packages.
    pub fn ota_type(&self) -> Option<&str> {
        self.get("ota-type")
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
