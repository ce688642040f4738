//! Append-only transcript buffer for the request session.
//!
//! Every line the user submits is appended here. A submission cursor marks
//! how much of the transcript has already been sent to the child, so the
//! bytes between the cursor and the end form the next pending request.
//! Positions are plain indices and stay valid across reallocation.

use std::ops::Range;

use thiserror::Error;

use crate::config::BufferConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    /// Growth would pass the advisory bound.
    #[error("Session buffer limit reached: {requested} bytes requested, limit is {limit}")]
    CapacityExceeded { requested: usize, limit: usize },
}

pub struct SessionBuffer {
    data: Vec<u8>,
    capacity: usize,
    limit: usize,
    cursor: usize,
}

impl SessionBuffer {
    /// Create a buffer with `initial_capacity` bytes reserved and growth
    /// refused past `limit`.
    pub fn new(initial_capacity: usize, limit: usize) -> Self {
        let capacity = initial_capacity.max(1);
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            limit: limit.max(capacity),
            cursor: 0,
        }
    }

    pub fn from_config(config: &BufferConfig) -> Self {
        Self::new(config.initial_capacity, config.max_capacity)
    }

    /// Append `bytes`, doubling the capacity as many times as needed.
    ///
    /// On error the buffer is left untouched.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        let required = self.data.len().saturating_add(bytes.len());
        if required > self.capacity {
            self.grow(required)?;
        }
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    fn grow(&mut self, required: usize) -> Result<(), BufferError> {
        if required > self.limit {
            return Err(BufferError::CapacityExceeded {
                requested: required,
                limit: self.limit,
            });
        }
        let mut capacity = self.capacity;
        while capacity < required {
            capacity = capacity.saturating_mul(2);
        }
        let capacity = capacity.min(self.limit);
        self.data.reserve_exact(capacity - self.data.len());
        tracing::debug!(from = self.capacity, to = capacity, "session buffer grew");
        self.capacity = capacity;
        Ok(())
    }

    /// Bytes appended since the last submission.
    pub fn pending(&self) -> &[u8] {
        &self.data[self.cursor..]
    }

    pub fn pending_range(&self) -> Range<usize> {
        self.cursor..self.data.len()
    }

    /// Move the submission cursor to the current end of the transcript.
    pub fn mark_submitted(&mut self) {
        self.cursor = self.data.len();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn slice(&self, range: Range<usize>) -> &[u8] {
        &self.data[range]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
