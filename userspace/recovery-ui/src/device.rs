// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Device capabilities consumed by the recovery interaction loop
//! OWNERS: @ui
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: 6 unit tests
//!
//! Key codes and action codes are plain integers at the device boundary. The
//! four reserved action codes are negative; every other code is an opaque
//! device action passed back to the caller.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use crate::menu::Menu;

/// Result of mapping a key while a menu is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NoAction,
    HighlightUp,
    HighlightDown,
    InvokeItem,
    /// Device-defined action, returned to the caller unless the menu is menu-only.
    Device(i32),
}

impl Action {
    pub const NO_ACTION: i32 = -1;
    pub const HIGHLIGHT_UP: i32 = -2;
    pub const HIGHLIGHT_DOWN: i32 = -3;
    pub const INVOKE_ITEM: i32 = -4;

    pub fn from_code(code: i32) -> Self {
        match code {
            Self::NO_ACTION => Action::NoAction,
            Self::HIGHLIGHT_UP => Action::HighlightUp,
            Self::HIGHLIGHT_DOWN => Action::HighlightDown,
            Self::INVOKE_ITEM => Action::InvokeItem,
            other => Action::Device(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Action::NoAction => Self::NO_ACTION,
            Action::HighlightUp => Self::HIGHLIGHT_UP,
            Action::HighlightDown => Self::HIGHLIGHT_DOWN,
            Action::InvokeItem => Self::INVOKE_ITEM,
            Action::Device(code) => code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Key(i32),
    TimedOut,
    /// The source can never deliver another key.
    Closed,
}

impl KeyEvent {
    /// Raw input codes use negative values as the timeout sentinel.
    pub fn from_raw(code: i32) -> Self {
        if code < 0 {
            KeyEvent::TimedOut
        } else {
            KeyEvent::Key(code)
        }
    }
}

/// Blocking key input.
pub trait KeySource {
    /// Blocks until a key arrives or the source's timeout fires.
    fn wait_key(&mut self) -> KeyEvent;

    /// Drops keys queued before a menu was shown.
    fn flush(&mut self) {}
}

/// Maps a key code to an action; `text_visible` reports whether the text
/// overlay is currently shown.
pub trait KeyHandler {
    fn handle_key(&self, key: i32, text_visible: bool) -> Action;
}

impl<F> KeyHandler for F
where
    F: Fn(i32, bool) -> Action,
{
    fn handle_key(&self, key: i32, text_visible: bool) -> Action {
        self(key, text_visible)
    }
}

/// Paints the menu. Rendering backends live outside this crate.
pub trait MenuSurface {
    fn draw_menu(&mut self, menu: &Menu);

    fn end_menu(&mut self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl MenuSurface for NullSurface {
    fn draw_menu(&mut self, _menu: &Menu) {}
}

/// Pre-recorded key stream. Reports [`KeyEvent::Closed`] once drained.
#[derive(Debug, Default, Clone)]
pub struct QueuedKeys {
    keys: VecDeque<KeyEvent>,
    served: usize,
}

impl QueuedKeys {
    pub fn new<I: IntoIterator<Item = KeyEvent>>(keys: I) -> Self {
        Self { keys: keys.into_iter().collect(), served: 0 }
    }

    /// Builds the queue from raw codes, negative codes being timeouts.
    pub fn from_codes<I: IntoIterator<Item = i32>>(codes: I) -> Self {
        Self::new(codes.into_iter().map(KeyEvent::from_raw))
    }

    pub fn push(&mut self, key: KeyEvent) {
        self.keys.push_back(key);
    }

    pub fn remaining(&self) -> usize {
        self.keys.len()
    }

    /// Number of `wait_key` calls answered so far.
    pub fn served(&self) -> usize {
        self.served
    }
}

impl KeySource for QueuedKeys {
    fn wait_key(&mut self) -> KeyEvent {
        self.served += 1;
        self.keys.pop_front().unwrap_or(KeyEvent::Closed)
    }
}

/// Keys delivered by an input thread over a channel.
///
/// A disconnected channel is reported as [`KeyEvent::Closed`], which ends a
/// menu even when timeouts are being ignored.
#[derive(Debug)]
pub struct ChannelKeySource {
    rx: Receiver<i32>,
    timeout: Duration,
    keep_type_ahead: bool,
}

impl ChannelKeySource {
    pub fn new(rx: Receiver<i32>, timeout: Duration) -> Self {
        Self { rx, timeout, keep_type_ahead: false }
    }

    /// Keeps keys queued before a menu is shown. Used when input is scripted
    /// (piped lines) rather than pressed in response to what is on screen.
    pub fn keep_type_ahead(mut self) -> Self {
        self.keep_type_ahead = true;
        self
    }
}

impl KeySource for ChannelKeySource {
    fn wait_key(&mut self) -> KeyEvent {
        match self.rx.recv_timeout(self.timeout) {
            Ok(code) => KeyEvent::from_raw(code),
            Err(RecvTimeoutError::Timeout) => KeyEvent::TimedOut,
            Err(RecvTimeoutError::Disconnected) => KeyEvent::Closed,
        }
    }

    fn flush(&mut self) {
        if self.keep_type_ahead {
            return;
        }
        while self.rx.try_recv().is_ok() {}
    }
}
