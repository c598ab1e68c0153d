//! Transformer architecture implementation
//!
//! Single-token decoder stack: embedding lookup, grouped-query attention
//! with per-layer KV caches, SwiGLU feed-forward, and tied unembedding.

mod attention;
mod ffn;
mod kv_cache;
mod layer;
mod model;

pub use attention::SelfAttention;
pub use kv_cache::KVCache;
pub use layer::DecoderLayer;
pub use model::Model;
