// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Block-based update commands (transfer list v3/v4) parsing
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: 12 unit tests
//!   - every command type, argument count checks
//!   - source info from image blocks, stashes, or both
//!   - block-count cross-checks
//!   - transfer list header parsing
//!
//! Command grammar:
//!
//!   zero|new|erase <tgt_ranges>
//!   stash <stash_id> <src_ranges>
//!   free <stash_id>
//!   move <hash> <src/tgt args>
//!   bsdiff|imgdiff <patch_offset> <patch_len> <src_hash> <tgt_hash> <src/tgt args>
//!   compute_hash_tree <hash_tree_ranges> <source_ranges> <hash_algorithm> <salt_hex> <root_hash>
//!   abort                       (test builds only)
//!
//! where <src/tgt args> is one of
//!
//!   <tgt_ranges> <src_block_count> - <stash_id:stash_location>...
//!   <tgt_ranges> <src_block_count> <src_ranges>
//!   <tgt_ranges> <src_block_count> <src_ranges> <src_ranges_location> <stash_id:stash_location>...

use core::fmt;

use thiserror::Error;

use crate::rangeset::{RangeSet, RangeSetError};

const UNKNOWN_HASH: &str = "unknown-hash";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("invalid command type `{0}`")]
    InvalidType(String),
    #[error("abort is only allowed in test builds")]
    AbortDisallowed,
    #[error("invalid number of args: {actual} (expected {expected})")]
    ArgCount { expected: &'static str, actual: usize },
    #[error("invalid {field}: {source}")]
    InvalidRanges {
        field: &'static str,
        #[source]
        source: RangeSetError,
    },
    #[error("invalid {field} `{token}`")]
    InvalidNumber { field: &'static str, token: String },
    #[error("invalid stash info `{0}`")]
    InvalidStash(String),
    #[error("mismatching block count: {actual} ({ranges}) vs {declared}")]
    BlockCountMismatch { actual: u64, ranges: String, declared: u64 },
    #[error("invalid transfer list: {0}")]
    InvalidTransferList(&'static str),
    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<CommandError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Abort,
    Bsdiff,
    ComputeHashTree,
    Erase,
    Free,
    Imgdiff,
    Move,
    New,
    Stash,
    Zero,
}

impl CommandType {
    pub fn parse(token: &str) -> Option<Self> {
        let ty = match token {
            "abort" => Self::Abort,
            "bsdiff" => Self::Bsdiff,
            "compute_hash_tree" => Self::ComputeHashTree,
            "erase" => Self::Erase,
            "free" => Self::Free,
            "imgdiff" => Self::Imgdiff,
            "move" => Self::Move,
            "new" => Self::New,
            "stash" => Self::Stash,
            "zero" => Self::Zero,
            _ => return None,
        };
        Some(ty)
    }
}

/// Where a command writes and the expected hash of the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetInfo {
    pub hash: String,
    pub ranges: RangeSet,
}

impl TargetInfo {
    pub fn blocks(&self) -> u64 {
        self.ranges.blocks()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StashInfo {
    pub id: String,
    pub ranges: RangeSet,
}

/// Source data for a command, loaded from the source image, from stashes, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceInfo {
    pub hash: String,
    /// Blocks read from the source image; empty when everything comes from stashes.
    pub ranges: RangeSet,
    /// Where `ranges` land in the command buffer; empty when `ranges` alone cover it.
    pub location: RangeSet,
    pub stashes: Vec<StashInfo>,
}

impl SourceInfo {
    pub fn blocks(&self) -> u64 {
        self.ranges.blocks() + self.stashes.iter().map(|stash| stash.ranges.blocks()).sum::<u64>()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchInfo {
    pub offset: u64,
    pub length: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashTreeInfo {
    pub hash_tree_ranges: RangeSet,
    pub source_ranges: RangeSet,
    pub hash_algorithm: String,
    pub salt_hex: String,
    pub root_hash: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub allow_abort: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    ty: CommandType,
    index: usize,
    cmdline: String,
    patch: PatchInfo,
    target: TargetInfo,
    source: SourceInfo,
    stash: StashInfo,
    hash_tree: HashTreeInfo,
}

impl Command {
    pub fn parse(line: &str, index: usize) -> Result<Self, CommandError> {
        Self::parse_with(line, index, ParseOptions::default())
    }

    /// Parses one transfer list line; `index` is chosen by the caller.
    pub fn parse_with(
        line: &str,
        index: usize,
        options: ParseOptions,
    ) -> Result<Self, CommandError> {
        let tokens: Vec<&str> = line.split(' ').collect();
        let (first, args) = tokens.split_first().ok_or(CommandError::Empty)?;
        if first.is_empty() {
            return Err(CommandError::Empty);
        }
        let ty = CommandType::parse(first)
            .ok_or_else(|| CommandError::InvalidType(first.to_string()))?;

        let mut command = Command {
            ty,
            index,
            cmdline: line.to_string(),
            patch: PatchInfo::default(),
            target: TargetInfo::default(),
            source: SourceInfo::default(),
            stash: StashInfo::default(),
            hash_tree: HashTreeInfo::default(),
        };

        match ty {
            CommandType::Zero | CommandType::New | CommandType::Erase => {
                expect_args(args, 1, "1")?;
                command.target = TargetInfo {
                    hash: UNKNOWN_HASH.to_string(),
                    ranges: ranges(args[0], "target ranges")?,
                };
            }
            CommandType::Stash => {
                expect_args(args, 2, "2")?;
                command.stash = StashInfo {
                    id: args[0].to_string(),
                    ranges: ranges(args[1], "source ranges")?,
                };
            }
            CommandType::Free => {
                expect_args(args, 1, "1")?;
                command.stash = StashInfo { id: args[0].to_string(), ranges: RangeSet::default() };
            }
            CommandType::Move => {
                let (hash, rest) = args
                    .split_first()
                    .ok_or(CommandError::ArgCount { expected: "1+", actual: 0 })?;
                let (target, source) = parse_target_and_source(rest, hash, hash)?;
                command.target = target;
                command.source = source;
            }
            CommandType::Bsdiff | CommandType::Imgdiff => {
                if args.len() < 4 {
                    return Err(CommandError::ArgCount { expected: "4+", actual: args.len() });
                }
                command.patch = PatchInfo {
                    offset: number(args[0], "patch offset")?,
                    length: number(args[1], "patch length")?,
                };
                let (target, source) = parse_target_and_source(&args[4..], args[3], args[2])?;
                command.target = target;
                command.source = source;
            }
            CommandType::ComputeHashTree => {
                expect_args(args, 5, "5")?;
                command.hash_tree = HashTreeInfo {
                    hash_tree_ranges: ranges(args[0], "hash tree ranges")?,
                    source_ranges: ranges(args[1], "source ranges")?,
                    hash_algorithm: args[2].to_string(),
                    salt_hex: args[3].to_string(),
                    root_hash: args[4].to_string(),
                };
            }
            CommandType::Abort => {
                if !options.allow_abort {
                    return Err(CommandError::AbortDisallowed);
                }
            }
        }

        Ok(command)
    }

    pub fn command_type(&self) -> CommandType {
        self.ty
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn cmdline(&self) -> &str {
        &self.cmdline
    }

    pub fn patch(&self) -> &PatchInfo {
        &self.patch
    }

    pub fn target(&self) -> &TargetInfo {
        &self.target
    }

    pub fn source(&self) -> &SourceInfo {
        &self.source
    }

    pub fn stash(&self) -> &StashInfo {
        &self.stash
    }

    pub fn hash_tree(&self) -> &HashTreeInfo {
        &self.hash_tree
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cmdline)
    }
}

/// Parsed transfer list: four header lines followed by one command per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferList {
    pub version: u32,
    pub total_blocks: u64,
    pub stash_max_entries: u64,
    pub stash_max_blocks: u64,
    pub commands: Vec<Command>,
}

impl TransferList {
    pub fn parse(text: &str, options: ParseOptions) -> Result<Self, CommandError> {
        let mut lines = text.lines();
        let mut header = |what: &'static str| {
            lines.next().ok_or(CommandError::InvalidTransferList(what)).map(str::trim)
        };
        let version: u32 = header("missing version")?
            .parse()
            .map_err(|_| CommandError::InvalidTransferList("invalid version"))?;
        if !(3..=4).contains(&version) {
            return Err(CommandError::InvalidTransferList("unsupported version"));
        }
        let total_blocks = number(header("missing total blocks")?, "total blocks")?;
        let stash_max_entries = number(header("missing stash entries")?, "stash entries")?;
        let stash_max_blocks = number(header("missing stash blocks")?, "stash blocks")?;

        let mut commands = Vec::new();
        for (offset, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let command = Command::parse_with(line, commands.len(), options).map_err(|err| {
                CommandError::AtLine { line: offset + 5, source: Box::new(err) }
            })?;
            commands.push(command);
        }

        Ok(Self { version, total_blocks, stash_max_entries, stash_max_blocks, commands })
    }
}

fn expect_args(args: &[&str], count: usize, expected: &'static str) -> Result<(), CommandError> {
    if args.len() != count {
        return Err(CommandError::ArgCount { expected, actual: args.len() });
    }
    Ok(())
}

fn ranges(token: &str, field: &'static str) -> Result<RangeSet, CommandError> {
    RangeSet::parse(token).map_err(|source| CommandError::InvalidRanges { field, source })
}

fn number(token: &str, field: &'static str) -> Result<u64, CommandError> {
    token
        .parse()
        .map_err(|_| CommandError::InvalidNumber { field, token: token.to_string() })
}

fn parse_target_and_source(
    args: &[&str],
    tgt_hash: &str,
    src_hash: &str,
) -> Result<(TargetInfo, SourceInfo), CommandError> {
    if args.len() < 3 {
        return Err(CommandError::ArgCount { expected: "3+", actual: args.len() });
    }
    let target =
        TargetInfo { hash: tgt_hash.to_string(), ranges: ranges(args[0], "target ranges")? };
    let src_blocks = number(args[1], "src_block_count")?;

    let mut source = SourceInfo { hash: src_hash.to_string(), ..SourceInfo::default() };
    let mut pos = 2;
    if args[pos] == "-" {
        pos += 1;
    } else {
        source.ranges = ranges(args[pos], "source ranges")?;
        pos += 1;
        if pos < args.len() {
            source.location = ranges(args[pos], "source ranges location")?;
            pos += 1;
        }
    }

    for token in &args[pos..] {
        let (id, location) =
            token.split_once(':').ok_or_else(|| CommandError::InvalidStash(token.to_string()))?;
        if location.contains(':') {
            return Err(CommandError::InvalidStash(token.to_string()));
        }
        source
            .stashes
            .push(StashInfo { id: id.to_string(), ranges: ranges(location, "stash location")? });
    }

    if source.blocks() != src_blocks {
        return Err(CommandError::BlockCountMismatch {
            actual: source.blocks(),
            ranges: source.ranges.to_string(),
            declared: src_blocks,
        });
    }
    Ok((target, source))
}
