/// Accumulates the child's output for one response and looks for the prompt.
///
/// Each `feed` only rescans the tail that could contain a new match: the
/// fresh bytes plus the last `sentinel.len() - 1` bytes seen before them, so a
/// prompt split across reads is still found.
pub struct SentinelScanner {
    sentinel: Vec<u8>,
    accumulated: Vec<u8>,
    scanned: usize,
}

impl SentinelScanner {
    pub fn new(sentinel: impl Into<Vec<u8>>) -> Self {
        Self {
            sentinel: sentinel.into(),
            accumulated: Vec::new(),
            scanned: 0,
        }
    }

    /// Append a chunk and return the offset of the first sentinel, if any.
    pub fn feed(&mut self, chunk: &[u8]) -> Option<usize> {
        self.accumulated.extend_from_slice(chunk);
        let start = self
            .scanned
            .saturating_sub(self.sentinel.len().saturating_sub(1));
        let found = find(&self.accumulated[start..], &self.sentinel).map(|pos| start + pos);
        if found.is_none() {
            self.scanned = self.accumulated.len();
        }
        found
    }

    /// Number of bytes accumulated so far.
    pub fn len(&self) -> usize {
        self.accumulated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accumulated.is_empty()
    }

    /// Split at `offset`: returns the response body and the number of bytes
    /// that followed the sentinel (discarded).
    pub fn finish(mut self, offset: usize) -> (Vec<u8>, usize) {
        let trailing = self
            .accumulated
            .len()
            .saturating_sub(offset + self.sentinel.len());
        self.accumulated.truncate(offset);
        (self.accumulated, trailing)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
