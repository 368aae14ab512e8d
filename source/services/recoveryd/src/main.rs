// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: recoveryd entrypoint
//! USAGE: recoveryd [--config <path>] install <package> [--retry <n>] | menu | help
//! LOGGING: RUST_LOG (env_logger)

fn main() {
    env_logger::init();
    std::process::exit(recoveryd::run());
}
