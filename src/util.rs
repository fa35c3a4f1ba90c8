use std::fmt;

use bitcoin::{OutPoint, TxOut};
use serde::ser::{Serialize, Serializer};

/// Where an output was created on chain: block height, then the index of the
/// creating transaction inside that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChainPosition {
    pub height: u32,
    pub tx_index: u32,
}

impl ChainPosition {
    pub fn new(height: u32, tx_index: u32) -> Self {
        Self { height, tx_index }
    }
}

/// TxOut spent by a transaction input, together with the OutPoint that
/// references it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpentOutput {
    pub outpoint: OutPoint,
    pub txout: TxOut,
    /// Creation position of the output, when the data source knows it
    pub position: Option<ChainPosition>,
}

impl SpentOutput {
    pub fn new(outpoint: OutPoint, txout: TxOut) -> Self {
        Self {
            outpoint,
            txout,
            position: None,
        }
    }

    pub fn with_position(mut self, position: ChainPosition) -> Self {
        self.position = Some(position);
        self
    }

    /// Sort key for the historical input order: creation position, then vout.
    pub(crate) fn historical_key(&self) -> Option<(ChainPosition, u32)> {
        self.position.map(|position| (position, self.outpoint.vout))
    }
}

/// Small fixed-capacity set that remembers insertion order.
///
/// `N` is the number of variants of `T`, so a deduplicated set can never
/// overflow.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagSet<T, const N: usize> {
    tags: [Option<T>; N],
    len: usize,
}

impl<T: Copy + PartialEq, const N: usize> TagSet<T, N> {
    pub fn new() -> Self {
        Self {
            tags: [None; N],
            len: 0,
        }
    }

    pub fn single(tag: T) -> Self {
        let mut set = Self::new();
        set.insert(tag);
        set
    }

    /// Appends `tag` unless it is already present. Returns whether it was added.
    pub fn insert(&mut self, tag: T) -> bool {
        if self.contains(&tag) {
            return false;
        }
        debug_assert!(self.len < N, "TagSet capacity exceeded");
        if self.len == N {
            return false;
        }
        self.tags[self.len] = Some(tag);
        self.len += 1;
        true
    }

    pub fn contains(&self, tag: &T) -> bool {
        self.iter().any(|t| t == *tag)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Tags in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.tags[..self.len].iter().flatten().copied()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<T: Copy + PartialEq, const N: usize> Default for TagSet<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + PartialEq, const N: usize> FromIterator<T> for TagSet<T, N> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl<T: Copy + PartialEq + fmt::Debug, const N: usize> fmt::Debug for TagSet<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Copy + PartialEq + Serialize, const N: usize> Serialize for TagSet<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
