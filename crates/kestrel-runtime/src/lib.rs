//! kestrel inference runtime
//!
//! Single-token decoder loop over the kestrel transformer: model assembly,
//! KV-cached attention, nucleus sampling, and streaming generation sessions.

pub mod inference;
pub mod sampling;
pub mod transformer;

pub use inference::{GenerationConfig, GenerationState, GenerationStats, InferenceSession};
pub use sampling::Sampler;
pub use transformer::{DecoderLayer, KVCache, Model, SelfAttention};

/// Runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
