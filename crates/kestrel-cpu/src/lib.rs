//! CPU backend for kestrel
//!
//! Scalar kernels for single-token transformer inference: matrix-vector
//! products over rank-typed views plus the normalization, activation and
//! rotary-embedding primitives the decoder stack is built from.

pub mod gemm;
pub mod kernels;

pub use gemm::{dot, matvec, matvec_into};
pub use kernels::{rmsnorm, rope, silu, softmax, RMS_EPS, ROPE_THETA};
