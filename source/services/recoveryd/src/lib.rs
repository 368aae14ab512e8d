// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Recovery daemon domain library (install + menu drivers)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: unit tests per module + CLI tests (tests/cli.rs)
//!
//! PUBLIC API:
//!   - execute(args): run one recoveryd command, returns the process exit code
//!   - RecoveryConfig: TOML configuration
//!
//! DEPENDENCIES:
//!   - updates: package verification and update dispatch
//!   - recovery-ui: menu and interaction loop
//!   - serde/toml: configuration
//!   - env_logger (binary only): log output
//!
//! ADR: DESIGN.md (recoveryd)

#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod installer;
pub mod menu;

use std::io::{self, BufReader};

use log::{error, info};

use crate::cli::Command;
use crate::config::RecoveryConfig;

/// Exit code for usage and configuration errors.
pub const EXIT_USAGE: i32 = 64;

pub fn execute(args: &[&str]) -> i32 {
    let invocation = match cli::parse(args) {
        Ok(invocation) => invocation,
        Err(err) => {
            eprintln!("recoveryd: {err}\n{}", cli::help());
            return EXIT_USAGE;
        }
    };
    if invocation.command == Command::Help {
        println!("{}", cli::help());
        return 0;
    }

    let config = match RecoveryConfig::load(invocation.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("recoveryd: {err}");
            eprintln!("recoveryd: {err}");
            return EXIT_USAGE;
        }
    };

    match invocation.command {
        Command::Install { package, retry_count } => {
            let dispatcher = config.dispatcher();
            let report = installer::install_package(dispatcher.as_ref(), &package, retry_count);
            if report.retry_requested {
                info!("recoveryd: rerun with --retry {} to retry", retry_count + 1);
            }
            report.status.code()
        }
        Command::Menu => {
            let input = BufReader::new(io::stdin());
            match menu::run_main_menu(&config, input, io::stdout()) {
                Some(action) => println!("selected: {}", action.label()),
                None => println!("timed out"),
            }
            0
        }
        Command::Help => 0,
    }
}

pub fn run() -> i32 {
    let owned: Vec<String> = std::env::args().skip(1).collect();
    let refs: Vec<&str> = owned.iter().map(|s| s.as_str()).collect();
    execute(&refs)
}
