// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: recoveryd argument parsing

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("missing command")]
    MissingCommand,
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("missing value for {0}")]
    MissingValue(&'static str),
    #[error("invalid retry count `{0}`")]
    InvalidRetry(String),
    #[error("unexpected argument `{0}`")]
    UnexpectedArgument(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Install { package: PathBuf, retry_count: u32 },
    Menu,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub config: Option<PathBuf>,
    pub command: Command,
}

pub fn help() -> &'static str {
    "recoveryd installs update packages and runs the recovery menu.\n\
     Usage: recoveryd [--config <path>] <command>\n\
     Commands:\n\
     \x20 install <package> [--retry <n>]  verify and apply an update package\n\
     \x20 menu                             show the recovery menu (k/j move, empty line selects)\n\
     \x20 help                             print this message"
}

pub fn parse(args: &[&str]) -> Result<Invocation, Error> {
    let mut config = None;
    let mut rest = args;
    while let [flag, tail @ ..] = rest {
        match *flag {
            "--config" => {
                let (path, tail) = tail.split_first().ok_or(Error::MissingValue("--config"))?;
                config = Some(PathBuf::from(path));
                rest = tail;
            }
            "--help" | "-h" => return Ok(Invocation { config, command: Command::Help }),
            _ => break,
        }
    }

    let (command, tail) = rest.split_first().ok_or(Error::MissingCommand)?;
    let command = match *command {
        "help" => Command::Help,
        "menu" => {
            if let Some(extra) = tail.first() {
                return Err(Error::UnexpectedArgument((*extra).to_string()));
            }
            Command::Menu
        }
        "install" => parse_install(tail)?,
        other => return Err(Error::UnknownCommand(other.to_string())),
    };
    Ok(Invocation { config, command })
}

fn parse_install(args: &[&str]) -> Result<Command, Error> {
    let mut package = None;
    let mut retry_count = 0;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match *arg {
            "--retry" => {
                let value = iter.next().ok_or(Error::MissingValue("--retry"))?;
                retry_count = value.parse().map_err(|_| Error::InvalidRetry((*value).to_string()))?;
            }
            path if package.is_none() && !path.starts_with("--") => {
                package = Some(PathBuf::from(path));
            }
            other => return Err(Error::UnexpectedArgument(other.to_string())),
        }
    }
    let package = package.ok_or(Error::MissingValue("install <package>"))?;
    Ok(Command::Install { package, retry_count })
}
