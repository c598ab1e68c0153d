//! On-disk model formats.

pub mod bundle;
