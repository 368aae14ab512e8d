// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Recovery main menu over a line-based key stream
//! OWNERS: @ui
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 5 unit tests
//!
//! Host stand-in for the device input thread: each input line is one key
//! (`k` up, `j` down, empty line enter, `p` power). End of input closes the
//! channel, which ends the menu like a timeout.

use std::io::{BufRead, Write};
use std::sync::mpsc;
use std::thread;

use log::{debug, warn};
use recovery_ui::{Action, ChannelKeySource, Menu, MenuOutcome, MenuSurface, RecoveryUi};

use crate::config::RecoveryConfig;

pub const KEY_ENTER: i32 = 28;
pub const KEY_UP: i32 = 103;
pub const KEY_DOWN: i32 = 108;
pub const KEY_POWER: i32 = 116;

pub const MAIN_MENU_HEADERS: [&str; 2] = ["Nexus Recovery", "k/j to move, empty line to select"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    RebootSystem,
    ApplyUpdate,
    WipeData,
    ViewLogs,
    PowerOff,
}

const MAIN_MENU: [(&str, MenuAction); 5] = [
    ("Reboot system now", MenuAction::RebootSystem),
    ("Apply update from file", MenuAction::ApplyUpdate),
    ("Wipe data/factory reset", MenuAction::WipeData),
    ("View recovery logs", MenuAction::ViewLogs),
    ("Power off", MenuAction::PowerOff),
];

impl MenuAction {
    /// Device action code for actions reachable without the menu.
    pub fn code(self) -> i32 {
        MAIN_MENU.iter().position(|(_, action)| *action == self).map_or(0, |i| i as i32)
    }

    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code).ok().and_then(|i| MAIN_MENU.get(i)).map(|(_, action)| *action)
    }

    pub fn label(self) -> &'static str {
        MAIN_MENU.iter().find(|(_, action)| *action == self).map_or("", |(label, _)| *label)
    }
}

pub fn key_for_line(line: &str) -> Option<i32> {
    match line.trim() {
        "k" => Some(KEY_UP),
        "j" => Some(KEY_DOWN),
        "" => Some(KEY_ENTER),
        "p" => Some(KEY_POWER),
        other => {
            debug!("recoveryd: ignoring input `{other}`");
            None
        }
    }
}

pub fn key_handler(key: i32, _text_visible: bool) -> Action {
    match key {
        KEY_UP => Action::HighlightUp,
        KEY_DOWN => Action::HighlightDown,
        KEY_ENTER => Action::InvokeItem,
        KEY_POWER => Action::Device(MenuAction::PowerOff.code()),
        _ => Action::NoAction,
    }
}

/// Plain-text menu rendering.
pub struct TextSurface<W> {
    out: W,
}

impl<W: Write> TextSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn render(&mut self, menu: &Menu) -> std::io::Result<()> {
        for header in menu.text_headers() {
            writeln!(self.out, "{header}")?;
        }
        for index in menu.menu_start()..menu.menu_end() {
            let marker = if index == menu.selection() { '>' } else { ' ' };
            writeln!(self.out, "{marker} {}", menu.text_item(index).unwrap_or_default())?;
        }
        if let Some(overflow) = menu.items_overflow() {
            writeln!(self.out, "{overflow}")?;
        }
        writeln!(self.out)?;
        self.out.flush()
    }
}

impl<W: Write> MenuSurface for TextSurface<W> {
    fn draw_menu(&mut self, menu: &Menu) {
        if let Err(err) = self.render(menu) {
            warn!("recoveryd: failed to draw menu: {err}");
        }
    }
}

/// Runs the main menu until a choice is made; `None` on timeout.
pub fn run_main_menu<R, W>(config: &RecoveryConfig, input: R, out: W) -> Option<MenuAction>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in input.lines() {
            let Ok(line) = line else { break };
            if let Some(key) = key_for_line(&line) {
                if tx.send(key).is_err() {
                    break;
                }
            }
        }
    });

    // Piped lines are a script, not reactions to the screen: keep them across the flush.
    let keys = ChannelKeySource::new(rx, config.key_timeout()).keep_type_ahead();
    let mut ui = RecoveryUi::with_surface(config.ui_config(), keys, TextSurface::new(out));
    if let Err(err) = ui.init(&config.locale) {
        warn!("recoveryd: {err}; keeping {}", ui.locale());
    }

    let labels = MAIN_MENU.iter().map(|(label, _)| *label);
    match ui.show_menu(MAIN_MENU_HEADERS, labels, 0, false, &key_handler) {
        MenuOutcome::Selected(index) => MAIN_MENU.get(index).map(|(_, action)| *action),
        MenuOutcome::Action(code) => MenuAction::from_code(code),
        MenuOutcome::TimedOut => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn config(dir: &tempfile::TempDir) -> RecoveryConfig {
        std::fs::create_dir(dir.path().join("en-US")).expect("locale dir");
        let mut config =
            RecoveryConfig { resource_dir: dir.path().to_path_buf(), ..Default::default() };
        config.ui.key_timeout_secs = 5;
        config
    }

    #[test]
    fn action_codes_round_trip_through_menu_order() {
        for (_, action) in MAIN_MENU {
            assert_eq!(MenuAction::from_code(action.code()), Some(action));
        }
        assert_eq!(MenuAction::from_code(-1), None);
        assert_eq!(MenuAction::WipeData.label(), "Wipe data/factory reset");
    }

    #[test]
    fn selects_with_typed_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut out = Vec::new();
        let choice = run_main_menu(&config(&dir), Cursor::new("j\nj\nk\nj\n\n"), &mut out);
        assert_eq!(choice, Some(MenuAction::WipeData));

        let screen = String::from_utf8(out).expect("utf8");
        assert!(screen.starts_with("Nexus Recovery\n"));
        assert!(screen.contains("> Wipe data/factory reset"));
    }

    #[test]
    fn power_key_passes_through() {
        let dir = tempfile::tempdir().expect("tempdir");
        let choice = run_main_menu(&config(&dir), Cursor::new("j\np\n"), Vec::new());
        assert_eq!(choice, Some(MenuAction::PowerOff));
    }

    #[test]
    fn end_of_input_ends_menu_even_when_timeouts_are_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = config(&dir);
        config.ui.ignore_timeout_after_text = true;
        let choice = run_main_menu(&config, Cursor::new("j\n"), Vec::new());
        assert_eq!(choice, None);
    }

    #[test]
    fn end_of_input_times_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        let choice = run_main_menu(&config(&dir), Cursor::new("j\nx\n"), Vec::new());
        assert_eq!(choice, None);
    }
}
