//! Packed indexing of unordered variable pairs.
//!
//! The pair `(x, y)` with `y < x < n` maps to the 1-based index
//! `1 + y + x(x-1)/2` (row-major lower triangle). Column `k` of the LP is the
//! pair with packed index `k + 1`.

use std::fmt;

/// Failure of the pair/index mapping. Always a caller contract violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexError {
    SelfPair { x: usize },
    VarOutOfRange { x: usize, y: usize, n: usize },
    PackedOutOfRange { index: usize, len: usize },
    Inconsistent { index: usize, x: usize, y: usize },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfPair { x } => write!(f, "self-pair ({x}, {x}) has no packed index"),
            Self::VarOutOfRange { x, y, n } => {
                write!(f, "pair ({x}, {y}) out of range for {n} variables")
            }
            Self::PackedOutOfRange { index, len } => {
                write!(f, "packed index {index} outside 1..={len}")
            }
            Self::Inconsistent { index, x, y } => {
                write!(f, "packed index {index} decoded to invalid pair ({x}, {y})")
            }
        }
    }
}

impl std::error::Error for IndexError {}

/// Bijection between unordered pairs over `0..n` and packed indices `1..=n(n-1)/2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairIndex {
    n: usize,
}

impl PairIndex {
    #[inline]
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of pairwise variables, `n(n-1)/2`.
    #[inline]
    pub fn len(&self) -> usize {
        pair_count(self.n)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Packed index of the unordered pair `{x, y}`.
    pub fn to_packed(&self, x: usize, y: usize) -> Result<usize, IndexError> {
        if x == y {
            return Err(IndexError::SelfPair { x });
        }
        let (x, y) = if y > x { (y, x) } else { (x, y) };
        if x >= self.n {
            return Err(IndexError::VarOutOfRange { x, y, n: self.n });
        }
        Ok(1 + y + pair_count(x))
    }

    /// Pair `(x, y)` with `x > y` for a packed index.
    pub fn to_pair(&self, index: usize) -> Result<(usize, usize), IndexError> {
        let len = self.len();
        if index == 0 || index > len {
            return Err(IndexError::PackedOutOfRange { index, len });
        }
        let mut x = ((2.0 * index as f64).sqrt() + 0.5).floor() as usize;
        // Integer correction: x is the unique value with x(x-1)/2 < index <= x(x+1)/2.
        while x > 0 && pair_count(x) >= index {
            x -= 1;
        }
        while pair_count(x + 1) < index {
            x += 1;
        }
        let y = index
            .checked_sub(1 + pair_count(x))
            .ok_or(IndexError::Inconsistent { index, x, y: 0 })?;
        if y >= x {
            return Err(IndexError::Inconsistent { index, x, y });
        }
        Ok((x, y))
    }

    /// Zero-based LP column of the pair `{x, y}`.
    #[inline]
    pub fn column(&self, x: usize, y: usize) -> Result<usize, IndexError> {
        self.to_packed(x, y).map(|k| k - 1)
    }
}

/// `n(n-1)/2`.
#[inline]
pub fn pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}
