// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Integration tests for the recovery menu and interaction loop
//! OWNERS: @ui
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: 7 tests
//!
//! TEST_SCENARIOS:
//!   - wrapping menu cycles through all items with a fixed window
//!   - scrolling menu slides and pins its window at the end
//!   - long items are cut to width - 1
//!   - timeout before any key ends the menu without consulting the mapper
//!   - device actions are returned only outside menu-only mode
//!   - text visibility stays sticky across menus
//!
//! ADR: DESIGN.md (host tests)

use std::cell::RefCell;

use recovery_ui::{Action, KeyEvent, Menu, MenuOutcome, QueuedKeys, RecoveryUi, UiConfig};

const HEADERS: [&str; 1] = ["Nexus Recovery"];
const ITEMS: [&str; 5] = ["item1", "item2", "item3", "item4", "1234567890"];

const UP: i32 = 1;
const DOWN: i32 = 2;
const ENTER: i32 = 3;
const POWER: i32 = 4;

fn mapper(key: i32, _visible: bool) -> Action {
    match key {
        UP => Action::HighlightUp,
        DOWN => Action::HighlightDown,
        ENTER => Action::InvokeItem,
        POWER => Action::Device(42),
        _ => Action::NoAction,
    }
}

fn ui_with(config: UiConfig, keys: &[KeyEvent]) -> RecoveryUi<QueuedKeys> {
    RecoveryUi::new(config, QueuedKeys::new(keys.iter().copied()))
}

#[test]
fn test_wrapping_menu_cycles() {
    let mut menu = Menu::new(false, 8, 20, HEADERS, ITEMS, 0);
    let mut seen = Vec::new();
    for _ in 0..ITEMS.len() * 2 {
        let next = menu.selection() as isize + 1;
        seen.push(menu.select(next));
        assert_eq!((menu.menu_start(), menu.menu_end()), (0, ITEMS.len()));
    }
    assert_eq!(seen, vec![1, 2, 3, 4, 0, 1, 2, 3, 4, 0]);
}

#[test]
fn test_scrolling_menu_pins_window() {
    let mut menu = Menu::new(true, 3, 20, HEADERS, ITEMS, 1);
    let mut windows = Vec::new();
    for _ in 0..4 {
        let next = menu.selection() as isize + 1;
        let selection = menu.select(next);
        windows.push((selection, menu.menu_start(), menu.menu_end()));
        assert_eq!(menu.menu_end() - menu.menu_start(), 3);
    }
    assert_eq!(windows, vec![(2, 0, 3), (3, 1, 4), (4, 2, 5), (4, 2, 5)]);
    assert_eq!(menu.items_overflow().as_deref(), Some("Current item: 5/5"));
}

#[test]
fn test_long_items_are_cut() {
    let menu = Menu::new(false, 10, 8, HEADERS, ITEMS, 0);
    assert_eq!(menu.text_item(4), Some("1234567"));
    assert_eq!(menu.text_item(0), Some("item1"));
    assert_eq!(menu.text_headers(), ["Nexus Recovery".to_string()]);
}

#[test]
fn test_timeout_skips_mapper() {
    let calls = RefCell::new(Vec::new());
    let recording = |key: i32, visible: bool| {
        calls.borrow_mut().push(key);
        mapper(key, visible)
    };
    for menu_only in [true, false] {
        let mut ui = ui_with(UiConfig::default(), &[KeyEvent::TimedOut, KeyEvent::Key(ENTER)]);
        let outcome = ui.show_menu(HEADERS, ITEMS, 0, menu_only, &recording);
        assert_eq!(outcome, MenuOutcome::TimedOut);
    }
    assert!(calls.borrow().is_empty());
}

#[test]
fn test_device_actions_respect_menu_only() {
    let keys = [KeyEvent::Key(POWER), KeyEvent::Key(DOWN), KeyEvent::Key(ENTER)];

    let mut ui = ui_with(UiConfig::default(), &keys);
    assert_eq!(ui.show_menu(HEADERS, ITEMS, 0, false, &mapper), MenuOutcome::Action(42));

    let mut ui = ui_with(UiConfig::default(), &keys);
    assert_eq!(ui.show_menu(HEADERS, ITEMS, 0, true, &mapper), MenuOutcome::Selected(1));
}

#[test]
fn test_scrollable_session_clamps_selection() {
    let config = UiConfig { scrollable: true, max_menu_items: 2, ..UiConfig::default() };
    let codes = [UP, UP, DOWN, DOWN, DOWN, DOWN, DOWN, DOWN, ENTER];
    let keys: Vec<KeyEvent> = codes.into_iter().map(KeyEvent::Key).collect();
    let mut ui = ui_with(config, &keys);
    assert_eq!(ui.show_menu(HEADERS, ITEMS, 0, true, &mapper), MenuOutcome::Selected(4));
}

#[test]
fn test_text_visibility_is_sticky_across_menus() {
    let visibility = RefCell::new(Vec::new());
    let recording = |key: i32, visible: bool| {
        visibility.borrow_mut().push(visible);
        mapper(key, visible)
    };
    let keys = [KeyEvent::Key(ENTER), KeyEvent::Key(ENTER)];
    let mut ui = ui_with(UiConfig::default(), &keys);

    ui.show_text(true);
    assert_eq!(ui.show_menu(HEADERS, ITEMS, 2, true, &recording), MenuOutcome::Selected(2));
    ui.show_text(false);
    assert_eq!(ui.show_menu(HEADERS, ITEMS, 3, true, &recording), MenuOutcome::Selected(3));

    assert_eq!(*visibility.borrow(), vec![true, false]);
    assert!(!ui.is_text_visible());
    assert!(ui.was_text_ever_visible());
}
