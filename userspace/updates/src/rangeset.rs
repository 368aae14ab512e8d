// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Block range sets used by block-based update commands
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable (v1.0)
//! TEST_COVERAGE: 5 unit tests
//!
//! Text form: `<count>,<start0>,<end0>,<start1>,<end1>...` where `count` is the
//! number of values that follow and every range is half-open.

use core::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeSetError {
    #[error("invalid range set token `{0}`")]
    InvalidToken(String),
    #[error("range set needs a non-zero, even value count")]
    InvalidCount,
    #[error("range set declares {declared} values but has {actual}")]
    CountMismatch { declared: usize, actual: usize },
    #[error("empty or inverted range {start}..{end}")]
    InvalidRange { start: u64, end: u64 },
    #[error("range set block count overflows")]
    Overflow,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<(u64, u64)>,
    blocks: u64,
}

impl RangeSet {
    pub fn parse(text: &str) -> Result<Self, RangeSetError> {
        let tokens: Vec<&str> = text.split(',').collect();
        let values = tokens
            .iter()
            .map(|token| {
                token.parse::<u64>().map_err(|_| RangeSetError::InvalidToken((*token).to_string()))
            })
            .collect::<Result<Vec<u64>, _>>()?;

        let (declared, pairs) = values.split_first().ok_or(RangeSetError::InvalidCount)?;
        let declared = usize::try_from(*declared).map_err(|_| RangeSetError::InvalidCount)?;
        if declared == 0 || declared % 2 != 0 {
            return Err(RangeSetError::InvalidCount);
        }
        if declared != pairs.len() {
            return Err(RangeSetError::CountMismatch { declared, actual: pairs.len() });
        }

        let mut ranges = Vec::with_capacity(declared / 2);
        let mut blocks: u64 = 0;
        for pair in pairs.chunks_exact(2) {
            let (start, end) = (pair[0], pair[1]);
            if start >= end {
                return Err(RangeSetError::InvalidRange { start, end });
            }
            blocks = blocks.checked_add(end - start).ok_or(RangeSetError::Overflow)?;
            ranges.push((start, end));
        }
        Ok(Self { ranges, blocks })
    }

    /// Total number of blocks covered.
    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    pub fn ranges(&self) -> &[(u64, u64)] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn overlaps(&self, other: &RangeSet) -> bool {
        self.ranges
            .iter()
            .any(|(a0, a1)| other.ranges.iter().any(|(b0, b1)| a0 < b1 && b0 < a1))
    }
}

impl fmt::Display for RangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ranges.is_empty() {
            return Ok(());
        }
        write!(f, "{}", self.ranges.len() * 2)?;
        for (start, end) in &self.ranges {
            write!(f, ",{start},{end}")?;
        }
        Ok(())
    }
}
