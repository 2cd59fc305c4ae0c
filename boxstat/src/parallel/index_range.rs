//! Half-open index ranges used to chunk parallel loops

use std::{iter, ops::Range};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexRange {
    pub start: usize,
    pub end: usize
}

impl IndexRange {
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end);
        Self {
            start, end
        }
    }

    /// Split range into (at most) n roughly equal, non-empty subranges
    pub fn split(&self, n: usize) -> Vec<IndexRange> {
        let len = self.len();
        if len == 0 {
            return vec![];
        }
        let n = n.clamp(1, len);
        let newlen = (len + n - 1)/n;
        // Rounding up might leave fewer than n chunks worth of indices
        let n = (len + newlen - 1)/newlen;
        (0..(n-1))
            .map(|i| IndexRange::new(self.start+i*newlen, self.start+(i+1)*newlen))
            .chain(iter::once(IndexRange::new(self.start+(n-1)*newlen, self.end)))
            .collect::<Vec<_>>()
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn to_range(&self) -> Range<usize> {
        self.start..self.end
    }
}
