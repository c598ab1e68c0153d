//! Integration tests for weight-bundle parsing and the weights registry.
//!
//! Bundles are synthesized in memory with a distinct fill value per table
//! and per layer, so any slicing or ordering mistake shows up as the wrong
//! constant in a view.

use kestrel_core::{BundleReader, Error, ModelConfig, WeightTables};
use std::io::Cursor;

const CONFIG: ModelConfig = ModelConfig {
    embedding_dim: 4,
    hidden_dim: 8,
    n_layers: 2,
    n_heads: 2,
    n_kv_heads: 1,
    vocab_size: 16,
    seq_len: 8,
};

fn push_f32(data: &mut Vec<u8>, value: f32, count: usize) {
    for _ in 0..count {
        data.extend_from_slice(&value.to_le_bytes());
    }
}

/// Builds a bundle whose table `t` (1-based, in file order) is filled with
/// `t + 0.1 * layer` for per-layer tables and `t` for shared ones.
fn build_bundle(config: &ModelConfig) -> Vec<u8> {
    let emb = config.embedding_dim;
    let hidden = config.hidden_dim;
    let head_dim = config.head_dim();
    let q_dim = config.n_heads * head_dim;
    let kv_dim = config.n_kv_heads * head_dim;

    let mut data = Vec::new();
    for field in [
        config.embedding_dim,
        config.hidden_dim,
        config.n_layers,
        config.n_heads,
        config.n_kv_heads,
        config.vocab_size,
        config.seq_len,
    ] {
        data.extend_from_slice(&(field as i32).to_le_bytes());
    }

    push_f32(&mut data, 1.0, config.vocab_size * emb);
    let per_layer_tables = [
        (2, emb),
        (3, q_dim * emb),
        (4, kv_dim * emb),
        (5, kv_dim * emb),
        (6, emb * emb),
        (7, emb),
        (8, hidden * emb),
        (9, emb * hidden),
        (10, hidden * emb),
    ];
    for (ordinal, count) in per_layer_tables {
        for layer in 0..config.n_layers {
            push_f32(&mut data, ordinal as f32 + 0.1 * layer as f32, count);
        }
    }
    push_f32(&mut data, 11.0, emb);

    data
}

fn load(data: Vec<u8>) -> kestrel_core::Result<WeightTables> {
    let mut reader = BundleReader::new(Cursor::new(data));
    let config = reader.read_header()?;
    reader.load_weights(&config)
}

fn assert_filled(values: &[f32], expected: f32) {
    assert!(
        values.iter().all(|&v| v == expected),
        "expected uniform fill {}, got {:?}",
        expected,
        &values[..values.len().min(8)]
    );
}

#[test]
fn header_round_trips_through_parser() {
    let weights = load(build_bundle(&CONFIG)).unwrap();
    assert_eq!(*weights.config(), CONFIG);
}

#[test]
fn tables_arrive_in_file_order() {
    let weights = load(build_bundle(&CONFIG)).unwrap();

    let embedding = weights.token_embedding();
    assert_eq!(embedding.shape(), [16, 4]);
    assert_filled(embedding.as_slice(), 1.0);
    assert_filled(weights.rms_out().as_slice(), 11.0);

    let layer = weights.layer(0);
    assert_filled(layer.rms_att.as_slice(), 2.0);
    assert_filled(layer.wq.as_slice(), 3.0);
    assert_filled(layer.wk.as_slice(), 4.0);
    assert_filled(layer.wv.as_slice(), 5.0);
    assert_filled(layer.wo.as_slice(), 6.0);
    assert_filled(layer.rms_ffn.as_slice(), 7.0);
    assert_filled(layer.w1.as_slice(), 8.0);
    assert_filled(layer.w2.as_slice(), 9.0);
    assert_filled(layer.w3.as_slice(), 10.0);
}

#[test]
fn layer_slices_are_offset_per_layer() {
    let weights = load(build_bundle(&CONFIG)).unwrap();

    let layer = weights.layer(1);
    assert_filled(layer.rms_att.as_slice(), 2.1);
    assert_filled(layer.wq.as_slice(), 3.1);
    assert_filled(layer.wk.as_slice(), 4.1);
    assert_filled(layer.wv.as_slice(), 5.1);
    assert_filled(layer.wo.as_slice(), 6.1);
    assert_filled(layer.rms_ffn.as_slice(), 7.1);
    assert_filled(layer.w1.as_slice(), 8.1);
    assert_filled(layer.w2.as_slice(), 9.1);
    assert_filled(layer.w3.as_slice(), 10.1);
}

#[test]
fn layer_views_carry_projection_shapes() {
    let weights = load(build_bundle(&CONFIG)).unwrap();
    let layer = weights.layer(0);

    assert_eq!(layer.rms_att.shape(), [4]);
    assert_eq!(layer.wq.shape(), [4, 4]);
    assert_eq!(layer.wk.shape(), [2, 4]);
    assert_eq!(layer.wv.shape(), [2, 4]);
    assert_eq!(layer.wo.shape(), [4, 4]);
    assert_eq!(layer.w1.shape(), [8, 4]);
    assert_eq!(layer.w2.shape(), [4, 8]);
    assert_eq!(layer.w3.shape(), [8, 4]);
}

#[test]
fn truncated_bundle_is_an_io_error() {
    let mut data = build_bundle(&CONFIG);
    data.truncate(data.len() - 2);
    assert!(matches!(load(data), Err(Error::Io(_))));
}

#[test]
fn trailing_bytes_are_rejected() {
    let mut data = build_bundle(&CONFIG);
    data.extend_from_slice(&[0, 0, 0, 0]);
    assert!(matches!(load(data), Err(Error::InvalidFormat(_))));
}

#[test]
fn invalid_header_is_rejected_before_tables() {
    let mut data = build_bundle(&CONFIG);
    // Overwrite n_heads with a value vocab-sized tables cannot satisfy.
    data[12..16].copy_from_slice(&3i32.to_le_bytes());
    assert!(matches!(load(data), Err(Error::InvalidFormat(_))));
}

#[test]
fn oversized_header_dimensions_are_rejected() {
    // Divisibility checks pass; the wq element count overflows instead.
    let mut data = Vec::new();
    for field in [1 << 22, 4, 1 << 22, 2, 2, 4, 4i32] {
        data.extend_from_slice(&field.to_le_bytes());
    }
    assert!(matches!(load(data), Err(Error::InvalidFormat(_))));
}

#[test]
#[should_panic(expected = "out of range")]
fn layer_index_is_bounds_checked() {
    let weights = load(build_bundle(&CONFIG)).unwrap();
    weights.layer(2);
}
