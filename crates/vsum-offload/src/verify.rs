//! Comparison of accelerator output against the host reference.

use crate::error::{OffloadError, Result};
use std::fmt;

/// First index at which the two arrays disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub index: usize,
    pub expected: i32,
    pub actual: i32,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "i = {}: CPU result = {} Krnl Result = {}",
            self.index, self.expected, self.actual
        )
    }
}

/// Outcome of a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(Mismatch),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn mismatch(&self) -> Option<&Mismatch> {
        match self {
            Verdict::Pass => None,
            Verdict::Fail(m) => Some(m),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASSED"),
            Verdict::Fail(_) => write!(f, "FAILED"),
        }
    }
}

/// Compare the first `length` elements in index order, stopping at the
/// first difference.
///
/// # Errors
///
/// [`OffloadError::InvalidWorkload`] if either slice is shorter than
/// `length`.
pub fn compare(expected: &[i32], actual: &[i32], length: usize) -> Result<Verdict> {
    if expected.len() < length || actual.len() < length {
        return Err(OffloadError::InvalidWorkload {
            reason: format!(
                "cannot verify {length} elements (expected holds {}, actual holds {})",
                expected.len(),
                actual.len()
            ),
        });
    }

    let verdict = expected[..length]
        .iter()
        .zip(&actual[..length])
        .position(|(e, a)| e != a)
        .map_or(Verdict::Pass, |index| {
            Verdict::Fail(Mismatch { index, expected: expected[index], actual: actual[index] })
        });
    Ok(verdict)
}
