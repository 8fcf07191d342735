//! Identifier generation strategies for adapters that assign ids themselves.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::base62::encode_u64;
use crate::{IdGenerator, ProfileId};

/// Base62 encoder-based id generator backed by a process-local counter.
/// If `min_width` is set, left-pads with '0' to reach the minimal length.
#[derive(Debug)]
pub struct Base62IdGenerator {
    min_width: usize,
    next: AtomicU64,
}

impl Base62IdGenerator {
    pub fn new(min_width: usize) -> Self {
        Self::starting_at(min_width, 0)
    }

    pub fn starting_at(min_width: usize, first: u64) -> Self {
        Self {
            min_width,
            next: AtomicU64::new(first),
        }
    }

    fn encode(&self, n: u64) -> String {
        let s = encode_u64(n);
        if s.len() >= self.min_width {
            return s;
        }
        let mut buf = "0".repeat(self.min_width - s.len());
        buf.push_str(&s);
        buf
    }
}

impl Default for Base62IdGenerator {
    fn default() -> Self {
        Self::new(8)
    }
}

impl IdGenerator for Base62IdGenerator {
    fn next_id(&self) -> ProfileId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        // base62 output is never empty
        ProfileId(self.encode(n))
    }
}
