// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Selectable recovery menu (scroll window + selection cursor)
//! OWNERS: @ui
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: 10 unit tests + proptest window invariants
//!
//! Two navigation policies share one selection algorithm:
//!
//! - non-scrollable (phone class): only the first `max_display_items` items are
//!   kept, the window is always `[0, len)` and the cursor wraps.
//! - scrollable (wearable class): all items are kept, the cursor clamps at both
//!   ends and the window slides by the minimum needed to keep it visible.
//!
//! Invariant after construction and after every [`Menu::select`]:
//! `menu_start <= selection < menu_end <= len` and
//! `menu_end - menu_start == min(max_display_items, len)` for non-empty menus.

/// Immutable item set plus the mutable cursor/window state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    scrollable: bool,
    max_display_items: usize,
    menu_width: usize,
    headers: Vec<String>,
    items: Vec<String>,
    selection: usize,
    menu_start: usize,
}

impl Menu {
    /// `max_display_items` of zero is treated as one. `menu_width` of zero
    /// disables item truncation. The initial selection is clamped into range.
    pub fn new<H, I, S, T>(
        scrollable: bool,
        max_display_items: usize,
        menu_width: usize,
        headers: H,
        items: I,
        initial_selection: usize,
    ) -> Self
    where
        H: IntoIterator<Item = S>,
        S: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let max_display_items = max_display_items.max(1);
        let mut items: Vec<String> = items.into_iter().map(Into::into).collect();
        if !scrollable {
            items.truncate(max_display_items);
        }
        let selection = initial_selection.min(items.len().saturating_sub(1));
        let mut menu = Self {
            scrollable,
            max_display_items,
            menu_width,
            headers: headers.into_iter().map(Into::into).collect(),
            items,
            selection,
            menu_start: 0,
        };
        menu.keep_selection_visible();
        menu
    }

    pub fn scrollable(&self) -> bool {
        self.scrollable
    }

    pub fn text_headers(&self) -> &[String] {
        &self.headers
    }

    pub fn items_count(&self) -> usize {
        self.items.len()
    }

    pub fn selection(&self) -> usize {
        self.selection
    }

    pub fn max_display_items(&self) -> usize {
        self.max_display_items
    }

    /// Display text of item `index`, cut to `menu_width - 1` characters when it
    /// does not fit so the last column stays free.
    pub fn text_item(&self, index: usize) -> Option<&str> {
        let item = self.items.get(index)?;
        if self.menu_width == 0 {
            return Some(item);
        }
        match item.char_indices().nth(self.menu_width) {
            None => Some(item),
            Some(_) => {
                let end = item
                    .char_indices()
                    .nth(self.menu_width - 1)
                    .map_or(item.len(), |(at, _)| at);
                Some(&item[..end])
            }
        }
    }

    /// Position hint for menus that cannot show every item at once.
    pub fn items_overflow(&self) -> Option<String> {
        if self.items.len() <= self.max_display_items {
            return None;
        }
        Some(format!("Current item: {}/{}", self.selection + 1, self.items.len()))
    }

    pub fn menu_start(&self) -> usize {
        self.menu_start
    }

    pub fn menu_end(&self) -> usize {
        self.menu_start + self.visible_count()
    }

    /// Moves the cursor to `selection` under the menu's wrap or clamp policy
    /// and returns where it actually landed.
    pub fn select(&mut self, selection: isize) -> usize {
        let count = self.items.len();
        if count == 0 {
            return 0;
        }
        let last = count - 1;
        self.selection = if self.scrollable {
            usize::try_from(selection).map_or(0, |sel| sel.min(last))
        } else {
            // Item counts are bounded by memory, so they always fit in isize.
            let count = isize::try_from(count).unwrap_or(isize::MAX);
            usize::try_from(selection.rem_euclid(count)).unwrap_or(0)
        };
        self.keep_selection_visible();
        self.selection
    }

    fn visible_count(&self) -> usize {
        self.max_display_items.min(self.items.len())
    }

    fn keep_selection_visible(&mut self) {
        let visible = self.visible_count();
        if visible == 0 {
            self.menu_start = 0;
        } else if self.selection < self.menu_start {
            self.menu_start = self.selection;
        } else if self.selection >= self.menu_start + visible {
            self.menu_start = self.selection + 1 - visible;
        }
    }
}
