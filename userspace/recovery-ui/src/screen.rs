// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Recovery interaction loop and session state
//! OWNERS: @ui
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: 12 unit tests
//!   - navigation, confirm, pass-through and menu-only filtering
//!   - timeout handling with and without prior text display
//!   - closed key sources always end the menu
//!   - locale init, RTL detection, text visibility
//!
//! One `show_menu` call owns a fresh [`Menu`] and blocks on the key source once
//! per iteration. Session state outlives individual menus.

use std::path::PathBuf;

use log::{debug, info, warn};
use thiserror::Error;

use crate::device::{Action, KeyEvent, KeyHandler, KeySource, MenuSurface, NullSurface};
use crate::locale;
use crate::menu::Menu;

#[derive(Debug, Error)]
pub enum UiError {
    #[error("no locale resources for `{locale}` under {}", .dir.display())]
    LocaleResourceMissing { locale: String, dir: PathBuf },
}

/// Presentation parameters fixed per device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiConfig {
    /// Wearable-class devices scroll; phone-class devices wrap.
    pub scrollable: bool,
    pub max_menu_items: usize,
    /// Characters per menu row.
    pub menu_width: usize,
    pub resource_dir: PathBuf,
    /// Keep waiting on timeout once text was ever shown.
    pub ignore_timeout_after_text: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            scrollable: false,
            max_menu_items: 10,
            menu_width: 32,
            resource_dir: PathBuf::from("/res"),
            ignore_timeout_after_text: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    locale: String,
    rtl: bool,
    text_visible: bool,
    text_ever_visible: bool,
}

impl SessionState {
    fn new(locale: &str) -> Self {
        Self {
            locale: locale.to_string(),
            rtl: locale::is_rtl(locale),
            text_visible: false,
            text_ever_visible: false,
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn is_rtl(&self) -> bool {
        self.rtl
    }

    pub fn is_text_visible(&self) -> bool {
        self.text_visible
    }

    /// Once set, stays set for the rest of the session.
    pub fn was_text_ever_visible(&self) -> bool {
        self.text_ever_visible
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    Selected(usize),
    /// Device action code, only returned for menus that are not menu-only.
    Action(i32),
    TimedOut,
}

pub struct RecoveryUi<K, S = NullSurface> {
    config: UiConfig,
    session: SessionState,
    keys: K,
    surface: S,
}

impl<K: KeySource> RecoveryUi<K, NullSurface> {
    pub fn new(config: UiConfig, keys: K) -> Self {
        Self::with_surface(config, keys, NullSurface)
    }
}

impl<K: KeySource, S: MenuSurface> RecoveryUi<K, S> {
    pub fn with_surface(config: UiConfig, keys: K, surface: S) -> Self {
        Self { config, session: SessionState::new(locale::DEFAULT_LOCALE), keys, surface }
    }

    /// Switches the session locale. An empty locale selects the default one.
    /// The session is left untouched when no resources exist for the locale.
    pub fn init(&mut self, locale: &str) -> Result<(), UiError> {
        let locale = if locale.is_empty() { locale::DEFAULT_LOCALE } else { locale };
        let Some(resources) = locale::find_resources(&self.config.resource_dir, locale) else {
            warn!(
                "recovery-ui: no resources for locale {locale} in {}",
                self.config.resource_dir.display()
            );
            return Err(UiError::LocaleResourceMissing {
                locale: locale.to_string(),
                dir: self.config.resource_dir.clone(),
            });
        };
        self.session.locale = locale.to_string();
        self.session.rtl = locale::is_rtl(locale);
        info!(
            "recovery-ui: locale {locale} (rtl={}) from {}",
            self.session.rtl,
            resources.display()
        );
        Ok(())
    }

    pub fn show_text(&mut self, visible: bool) {
        self.session.text_visible = visible;
        if visible {
            self.session.text_ever_visible = true;
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn locale(&self) -> &str {
        self.session.locale()
    }

    pub fn is_rtl(&self) -> bool {
        self.session.is_rtl()
    }

    pub fn is_text_visible(&self) -> bool {
        self.session.is_text_visible()
    }

    pub fn was_text_ever_visible(&self) -> bool {
        self.session.was_text_ever_visible()
    }

    pub fn config(&self) -> &UiConfig {
        &self.config
    }

    pub fn keys_mut(&mut self) -> &mut K {
        &mut self.keys
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Shows a menu and blocks until an item is confirmed, a device action is
    /// returned, or the key source times out or closes.
    ///
    /// `InvokeItem` on a menu without items is ignored.
    pub fn show_menu<H, I, T, U>(
        &mut self,
        headers: H,
        items: I,
        initial_selection: usize,
        menu_only: bool,
        handler: &dyn KeyHandler,
    ) -> MenuOutcome
    where
        H: IntoIterator<Item = T>,
        T: Into<String>,
        I: IntoIterator<Item = U>,
        U: Into<String>,
    {
        self.keys.flush();
        let mut menu = Menu::new(
            self.config.scrollable,
            self.config.max_menu_items,
            self.config.menu_width,
            headers,
            items,
            initial_selection,
        );
        self.surface.draw_menu(&menu);

        let outcome = loop {
            let key = match self.keys.wait_key() {
                KeyEvent::Key(key) => key,
                KeyEvent::TimedOut => {
                    if self.config.ignore_timeout_after_text && self.session.text_ever_visible {
                        debug!("recovery-ui: timeout ignored, text was shown");
                        continue;
                    }
                    break MenuOutcome::TimedOut;
                }
                KeyEvent::Closed => {
                    warn!("recovery-ui: key source closed, leaving menu");
                    break MenuOutcome::TimedOut;
                }
            };

            match handler.handle_key(key, self.session.text_visible) {
                Action::NoAction => {}
                Action::HighlightUp => self.move_selection(&mut menu, -1),
                Action::HighlightDown => self.move_selection(&mut menu, 1),
                Action::InvokeItem if menu.items_count() > 0 => {
                    break MenuOutcome::Selected(menu.selection());
                }
                Action::InvokeItem => {}
                Action::Device(code) if !menu_only => break MenuOutcome::Action(code),
                Action::Device(code) => {
                    debug!("recovery-ui: action {code} ignored in menu-only mode");
                }
            }
        };

        self.surface.end_menu();
        debug!("recovery-ui: menu finished with {outcome:?}");
        outcome
    }

    fn move_selection(&mut self, menu: &mut Menu, delta: isize) {
        let before = menu.selection();
        // Selections index an in-memory Vec, so they fit in isize.
        let target = isize::try_from(before).unwrap_or(isize::MAX).saturating_add(delta);
        if menu.select(target) != before {
            self.surface.draw_menu(menu);
        }
    }
}
