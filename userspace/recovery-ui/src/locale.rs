// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Locale directionality and resource lookup

use std::path::{Path, PathBuf};

/// Used when the caller passes an empty locale.
pub const DEFAULT_LOCALE: &str = "en-US";

const RTL_LANGUAGES: &[&str] = &["ar", "fa", "he", "iw", "ur"];

/// Primary language subtag: `ar` for `ar`, `ar_EG` and `ar-Arab-EG`.
pub fn primary_language(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or(locale)
}

pub fn is_rtl(locale: &str) -> bool {
    let language = primary_language(locale);
    RTL_LANGUAGES.iter().any(|rtl| rtl.eq_ignore_ascii_case(language))
}

/// Finds the resource directory for `locale`, trying the full locale first
/// and then its primary language.
pub fn find_resources(resource_dir: &Path, locale: &str) -> Option<PathBuf> {
    let language = primary_language(locale);
    [locale, language]
        .into_iter()
        .filter(|name| !name.is_empty())
        .map(|name| resource_dir.join(name))
        .find(|candidate| candidate.is_dir())
}
