// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Recovery menu model and key-driven interaction loop
//! OWNERS: @ui
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: unit tests per module + proptest menu invariants
//!   - scroll window and selection wrap/clamp policies
//!   - timeout / pass-through action handling
//!   - locale directionality and text visibility tracking
//!
//! PUBLIC API:
//!   - Menu: items, scroll window, selection cursor
//!   - RecoveryUi: session state + `show_menu`
//!   - KeySource / KeyHandler / MenuSurface: injected device capabilities
//!
//! DEPENDENCIES:
//!   - thiserror: UiError
//!   - log: session diagnostics
//!
//! ADR: DESIGN.md (recovery interaction loop)

#![forbid(unsafe_code)]

pub mod device;
pub mod locale;
pub mod menu;
pub mod screen;

pub use device::{
    Action, ChannelKeySource, KeyEvent, KeyHandler, KeySource, MenuSurface, NullSurface,
    QueuedKeys,
};
pub use menu::Menu;
pub use screen::{MenuOutcome, RecoveryUi, SessionState, UiConfig, UiError};
