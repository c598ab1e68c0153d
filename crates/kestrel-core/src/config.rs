use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Model hyperparameters, as carried in a weight-bundle header.
///
/// Shapes of every weight table and activation derive from these seven
/// values, so a config is validated once at load time and treated as
/// trusted afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Width of token embeddings and residual activations
    pub embedding_dim: usize,
    /// Width of the feed-forward hidden layer
    pub hidden_dim: usize,
    /// Number of decoder layers
    pub n_layers: usize,
    /// Number of query heads
    pub n_heads: usize,
    /// Number of key/value heads (grouped-query attention)
    pub n_kv_heads: usize,
    /// Number of token ids the model knows
    pub vocab_size: usize,
    /// Maximum context length
    pub seq_len: usize,
}

impl ModelConfig {
    /// Width of a single attention head.
    pub fn head_dim(&self) -> usize {
        self.embedding_dim / self.n_heads
    }

    /// Query heads served by each key/value head.
    pub fn group(&self) -> usize {
        self.n_heads / self.n_kv_heads
    }

    /// Width of one cached key or value row across all kv heads.
    pub fn kv_dim(&self) -> usize {
        self.n_kv_heads * self.head_dim()
    }

    /// Checks the structural constraints the rest of the engine relies on.
    pub fn validate(&self) -> Result<()> {
        if self.embedding_dim == 0
            || self.hidden_dim == 0
            || self.n_layers == 0
            || self.n_heads == 0
            || self.n_kv_heads == 0
            || self.vocab_size == 0
            || self.seq_len == 0
        {
            return Err(Error::InvalidFormat(format!(
                "model config has a zero dimension: {:?}",
                self
            )));
        }
        if self.embedding_dim % self.n_heads != 0 {
            return Err(Error::InvalidFormat(format!(
                "embedding dim {} is not divisible by {} heads",
                self.embedding_dim, self.n_heads
            )));
        }
        if self.n_heads % self.n_kv_heads != 0 {
            return Err(Error::InvalidFormat(format!(
                "{} heads are not divisible by {} kv heads",
                self.n_heads, self.n_kv_heads
            )));
        }
        if self.head_dim() % 2 != 0 {
            return Err(Error::InvalidFormat(format!(
                "head dim {} must be even for rotary embedding",
                self.head_dim()
            )));
        }
        Ok(())
    }
}
