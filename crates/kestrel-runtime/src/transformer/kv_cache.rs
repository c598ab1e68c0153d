//! Per-layer key/value cache for incremental attention.

use kestrel_core::Tensor;

/// Cached keys and values for one decoder layer.
///
/// Both tensors are `[seq_len, n_kv_heads * head_dim]`, preallocated to the
/// full context and written one row per position. The attention pass at
/// position `p` writes row `p` and reads rows `0..=p`; rows beyond `p` are
/// stale and never read, so there is no occupancy counter.
#[derive(Debug, Clone)]
pub struct KVCache {
    pub keys: Tensor<2>,
    pub values: Tensor<2>,
}

impl KVCache {
    pub fn new(seq_len: usize, kv_dim: usize) -> Self {
        Self {
            keys: Tensor::zeros([seq_len, kv_dim]),
            values: Tensor::zeros([seq_len, kv_dim]),
        }
    }

    /// Context length the cache was sized for.
    pub fn seq_len(&self) -> usize {
        self.keys.shape()[0]
    }

    /// Width of one cached row.
    pub fn kv_dim(&self) -> usize {
        self.keys.shape()[1]
    }

    /// Zeroes both tensors so a sequence can be replayed from scratch.
    pub fn reset(&mut self) {
        self.keys.as_mut_slice().fill(0.0);
        self.values.as_mut_slice().fill(0.0);
    }
}
