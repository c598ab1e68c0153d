//! Core inference primitives for kestrel
//!
//! This crate provides the fundamental building blocks for transformer
//! inference:
//! - Rank-typed tensor types and views
//! - Weight-bundle parsing and the per-layer weights registry
//! - BPE tokenization over a scored vocabulary

pub mod config;
pub mod error;
pub mod formats;
pub mod tensor;
pub mod tokenizer;

pub use config::ModelConfig;
pub use error::{Error, Result};
pub use formats::bundle::{BundleReader, LayerWeights, WeightTables};
pub use tensor::{Tensor, TensorView, TensorViewMut};
pub use tokenizer::{SpecialTokens, Tokenizer};

/// Core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
