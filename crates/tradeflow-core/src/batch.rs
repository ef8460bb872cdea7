//! Order-preserving grouping of validated records into bounded batches.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::{TradeRecord, ValidationError};

/// Maximum number of records per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct BatchSize(NonZeroUsize);

impl BatchSize {
    pub const DEFAULT: usize = 1000;

    pub fn new(size: usize) -> Result<Self, ValidationError> {
        NonZeroUsize::new(size)
            .map(Self)
            .ok_or(ValidationError::ZeroBatchSize)
    }

    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        Self(NonZeroUsize::new(Self::DEFAULT).unwrap_or(NonZeroUsize::MIN))
    }
}

impl TryFrom<usize> for BatchSize {
    type Error = ValidationError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BatchSize> for usize {
    fn from(value: BatchSize) -> Self {
        value.get()
    }
}

/// An ordered, non-empty run of consecutive records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    seq: u64,
    records: Vec<TradeRecord>,
}

impl Batch {
    /// Zero-based position of the batch in the run.
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<TradeRecord> {
        self.records
    }
}

/// Accumulates records and cuts a [`Batch`] every `size` records.
#[derive(Debug)]
pub struct Batcher {
    size: BatchSize,
    current: Vec<TradeRecord>,
    next_seq: u64,
}

impl Batcher {
    pub fn new(size: BatchSize) -> Self {
        Self {
            size,
            current: Vec::with_capacity(size.get()),
            next_seq: 0,
        }
    }

    /// Add a record, returning the completed batch once it reaches full size.
    pub fn push(&mut self, record: TradeRecord) -> Option<Batch> {
        self.current.push(record);
        if self.current.len() >= self.size.get() {
            let full = std::mem::replace(&mut self.current, Vec::with_capacity(self.size.get()));
            return Some(self.seal(full));
        }
        None
    }

    /// Emit whatever remains; `None` when nothing is pending.
    pub fn finish(&mut self) -> Option<Batch> {
        if self.current.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.current);
        Some(self.seal(rest))
    }

    /// Records accumulated but not yet emitted.
    pub fn pending(&self) -> usize {
        self.current.len()
    }

    /// Number of batches emitted so far.
    pub const fn emitted(&self) -> u64 {
        self.next_seq
    }

    fn seal(&mut self, records: Vec<TradeRecord>) -> Batch {
        let seq = self.next_seq;
        self.next_seq += 1;
        Batch { seq, records }
    }
}
