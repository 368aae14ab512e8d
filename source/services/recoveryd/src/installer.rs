// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Package install driver (verify, dispatch, run the updater)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 6 unit tests + host tests (via tests/recovery_host)
//!
//! The updater reports progress on its status fd, one command per line. The
//! driver hands it the write end of the child's stdout (fd 1) and reads the
//! lines back as they arrive.

use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use log::{error, info, warn};
use updates::compat::verify_package_compatibility;
use updates::install::{InstallStatus, UpdateCommand, UpdateDispatcher};
use updates::package::TarPackage;

/// Status fd passed to updaters spawned by this driver.
pub const STATUS_FD: i32 = 1;

/// One line of updater status output.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusLine {
    /// Advance the bar by `fraction` over `seconds`.
    Progress { fraction: f32, seconds: u32 },
    SetProgress(f32),
    UiPrint(String),
    Log(String),
    /// The updater asks to be run again with a retry marker.
    RetryUpdate,
    Unknown(String),
}

impl StatusLine {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "progress" => {
                let mut parts = rest.split_whitespace();
                let fraction = parts.next().and_then(|v| v.parse().ok());
                let seconds = parts.next().and_then(|v| v.parse().ok());
                match (fraction, seconds) {
                    (Some(fraction), Some(seconds)) => StatusLine::Progress { fraction, seconds },
                    _ => StatusLine::Unknown(line.to_string()),
                }
            }
            "set_progress" => rest
                .trim()
                .parse()
                .map_or_else(|_| StatusLine::Unknown(line.to_string()), StatusLine::SetProgress),
            "ui_print" => StatusLine::UiPrint(rest.to_string()),
            "log" => StatusLine::Log(rest.to_string()),
            "retry_update" => StatusLine::RetryUpdate,
            _ => StatusLine::Unknown(line.to_string()),
        }
    }
}

/// Outcome of one install attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub status: InstallStatus,
    pub retry_requested: bool,
}

impl InstallReport {
    fn failed(status: InstallStatus) -> Self {
        Self { status, retry_requested: false }
    }
}

/// Verifies `package_path`, builds the updater command and runs it.
pub fn install_package(
    dispatcher: &dyn UpdateDispatcher,
    package_path: &Path,
    retry_count: u32,
) -> InstallReport {
    let package = match TarPackage::open(package_path) {
        Ok(package) => package,
        Err(err) => {
            error!("recoveryd: failed to open {}: {err}", package_path.display());
            return InstallReport::failed(InstallStatus::Corrupt);
        }
    };
    if !verify_package_compatibility(&package) {
        error!("recoveryd: {} is not compatible with this device", package_path.display());
        return InstallReport::failed(InstallStatus::Corrupt);
    }

    let path = package_path.to_string_lossy();
    let plan = match dispatcher.build_command(&path, &package, retry_count, STATUS_FD) {
        Ok(plan) => plan,
        Err(err) => {
            error!("recoveryd: {err}");
            return InstallReport::failed(err.status());
        }
    };

    let mut retry_requested = false;
    let result = run_updater(plan.command(), |line| {
        if line == StatusLine::RetryUpdate {
            retry_requested = true;
        }
        report_status(&line);
    });
    match result {
        Ok(exit) if exit.success() => {
            info!("recoveryd: update from {} finished", package_path.display());
            InstallReport { status: InstallStatus::Success, retry_requested }
        }
        Ok(exit) => {
            error!("recoveryd: updater exited with {exit}");
            InstallReport { status: InstallStatus::Error, retry_requested }
        }
        Err(err) => {
            error!("recoveryd: failed to run {}: {err}", plan.command().program());
            InstallReport::failed(InstallStatus::Error)
        }
    }
}

/// Spawns the updater and feeds each status line to `on_status`.
///
/// The child is always waited on once spawned. Lines that are not valid UTF-8
/// are decoded lossily; a failed read stops status reporting only.
pub fn run_updater(
    command: &UpdateCommand,
    mut on_status: impl FnMut(StatusLine),
) -> io::Result<ExitStatus> {
    let mut child = Command::new(command.program())
        .args(command.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .spawn()?;
    if let Some(stdout) = child.stdout.take() {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => on_status(StatusLine::parse(&String::from_utf8_lossy(&buf))),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    warn!("recoveryd: lost updater status stream: {err}");
                    break;
                }
            }
        }
    }
    child.wait()
}

fn report_status(line: &StatusLine) {
    match line {
        StatusLine::Progress { fraction, seconds } => {
            info!("recoveryd: progress {fraction} over {seconds}s");
        }
        StatusLine::SetProgress(fraction) => info!("recoveryd: progress at {fraction}"),
        StatusLine::UiPrint(text) => println!("{text}"),
        StatusLine::Log(text) => info!("recoveryd: updater: {text}"),
        StatusLine::RetryUpdate => warn!("recoveryd: updater requested a retry"),
        StatusLine::Unknown(text) => warn!("recoveryd: unknown status line `{text}`"),
    }
}
