//! Grouped-query self-attention with rotary embeddings.

use kestrel_core::{LayerWeights, ModelConfig, Tensor};
use kestrel_cpu::{dot, matvec, matvec_into, rope, softmax};

use super::KVCache;

/// Causal self-attention over one token at a time.
///
/// Keys and values for every visited position live in the layer's cache;
/// queries are recomputed per call. With `n_kv_heads < n_heads` each cached
/// head serves a group of query heads.
pub struct SelfAttention {
    config: ModelConfig,
    pub cache: KVCache,
}

impl SelfAttention {
    pub fn new(config: &ModelConfig) -> Self {
        Self { config: *config, cache: KVCache::new(config.seq_len, config.kv_dim()) }
    }

    pub fn reset(&mut self) {
        self.cache.reset();
    }

    /// Attends the token at `position` over cache rows `0..=position`.
    ///
    /// Writes the projected key and value into cache row `position`, rotates
    /// queries and the fresh key row, then scores each query head against
    /// its kv group and mixes cached values by softmaxed score. Consumes `x`
    /// as scratch for the mixed heads and returns the output projection.
    pub fn forward(
        &mut self,
        mut x: Tensor<1>,
        position: usize,
        weights: &LayerWeights<'_>,
    ) -> Tensor<1> {
        let head_dim = self.config.head_dim();
        let n_heads = self.config.n_heads;
        let n_kv_heads = self.config.n_kv_heads;
        let group = self.config.group();
        let seq_len = self.config.seq_len;
        assert!(position < seq_len, "position {} out of range (seq len {})", position, seq_len);

        let mut queries = matvec(weights.wq, x.view());
        matvec_into(weights.wk, x.view(), &mut self.cache.keys.row_mut(position));
        matvec_into(weights.wv, x.view(), &mut self.cache.values.row_mut(position));

        let q = queries.as_mut_slice();
        for head in 0..n_heads {
            rope(&mut q[head * head_dim..(head + 1) * head_dim], position, head_dim);
        }
        // Earlier rows were rotated during their own step; only the fresh
        // key row turns here.
        let mut key_row = self.cache.keys.row_mut(position);
        let fresh = key_row.as_mut_slice();
        for head in 0..n_kv_heads {
            rope(&mut fresh[head * head_dim..(head + 1) * head_dim], position, head_dim);
        }

        let q_heads = queries.view_as([n_heads, head_dim]);
        let keys = self.cache.keys.view_as([seq_len, n_kv_heads, head_dim]);
        let values = self.cache.values.view_as([seq_len, n_kv_heads, head_dim]);
        let scale = (head_dim as f32).sqrt();

        let mixed = x.as_mut_slice();
        for head in 0..n_heads {
            let query = q_heads.row(head);
            let kv = head / group;

            let mut scores = vec![0.0; position + 1];
            for (past, score) in scores.iter_mut().enumerate() {
                *score = dot(query, keys.row(past).row(kv)) / scale;
            }
            softmax(&mut scores);

            let out = &mut mixed[head * head_dim..(head + 1) * head_dim];
            out.fill(0.0);
            for (past, &score) in scores.iter().enumerate() {
                let value = values.row(past).row(kv);
                for (acc, &v) in out.iter_mut().zip(value.as_slice()) {
                    *acc += score * v;
                }
            }
        }

        matvec(weights.wo, x.view())
    }
}
