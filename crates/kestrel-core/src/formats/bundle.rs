//! Streaming parser for the flat llama2.c-style weight bundle.
//!
//! A bundle is a 28-byte header of seven little-endian `i32` hyperparameters
//! followed by eleven `f32` tables in a fixed order:
//!
//! 1. token embedding        `[vocab_size, embedding_dim]`
//! 2. attention norm weights `[n_layers, embedding_dim]`
//! 3. wq                     `[n_layers, n_heads * head_dim, embedding_dim]`
//! 4. wk                     `[n_layers, n_kv_heads * head_dim, embedding_dim]`
//! 5. wv                     `[n_layers, n_kv_heads * head_dim, embedding_dim]`
//! 6. wo                     `[n_layers, embedding_dim, embedding_dim]`
//! 7. ffn norm weights       `[n_layers, embedding_dim]`
//! 8. w1                     `[n_layers, hidden_dim, embedding_dim]`
//! 9. w2                     `[n_layers, embedding_dim, hidden_dim]`
//! 10. w3                    `[n_layers, hidden_dim, embedding_dim]`
//! 11. output norm weights   `[embedding_dim]`
//!
//! Matrices are row-major with shape `[out_rows, in_cols]`. There is no
//! separate unembedding table; the token embedding is reused for logits.

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::tensor::TensorView;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Streaming reader over a weight bundle.
pub struct BundleReader<R: Read> {
    reader: R,
}

impl<R: Read> BundleReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Parses and validates the seven-field header.
    pub fn read_header(&mut self) -> Result<ModelConfig> {
        let mut fields = [0i32; 7];
        for field in fields.iter_mut() {
            *field = self.read_i32()?;
        }
        let names = [
            "embedding_dim",
            "hidden_dim",
            "n_layers",
            "n_heads",
            "n_kv_heads",
            "vocab_size",
            "seq_len",
        ];
        for (name, &value) in names.iter().zip(fields.iter()) {
            if value < 0 {
                return Err(Error::InvalidFormat(format!(
                    "header field {} is negative: {}",
                    name, value
                )));
            }
        }
        let config = ModelConfig {
            embedding_dim: fields[0] as usize,
            hidden_dim: fields[1] as usize,
            n_layers: fields[2] as usize,
            n_heads: fields[3] as usize,
            n_kv_heads: fields[4] as usize,
            vocab_size: fields[5] as usize,
            seq_len: fields[6] as usize,
        };
        config.validate()?;
        log::debug!("parsed bundle header: {:?}", config);
        Ok(config)
    }

    /// Reads the eleven weight tables for `config` and verifies the stream
    /// ends exactly after them.
    pub fn load_weights(&mut self, config: &ModelConfig) -> Result<WeightTables> {
        let emb = config.embedding_dim;
        let head_dim = config.head_dim();
        let q_dim = config.n_heads * head_dim;
        let kv_dim = config.n_kv_heads * head_dim;
        let layers = config.n_layers;

        // Table sizes come from an untrusted header; reject any that
        // overflow before touching the stream.
        let n_embedding = table_len(&[config.vocab_size, emb])?;
        let n_norm = table_len(&[layers, emb])?;
        let n_wq = table_len(&[layers, q_dim, emb])?;
        let n_wkv = table_len(&[layers, kv_dim, emb])?;
        let n_wo = table_len(&[layers, emb, emb])?;
        let n_ffn = table_len(&[layers, config.hidden_dim, emb])?;

        let token_embedding = self.read_table(n_embedding)?;
        let rms_att = self.read_table(n_norm)?;
        let wq = self.read_table(n_wq)?;
        let wk = self.read_table(n_wkv)?;
        let wv = self.read_table(n_wkv)?;
        let wo = self.read_table(n_wo)?;
        let rms_ffn = self.read_table(n_norm)?;
        let w1 = self.read_table(n_ffn)?;
        let w2 = self.read_table(n_ffn)?;
        let w3 = self.read_table(n_ffn)?;
        let rms_out = self.read_table(emb)?;

        let mut probe = [0u8; 1];
        match self.reader.read(&mut probe)? {
            0 => {}
            _ => {
                return Err(Error::InvalidFormat(
                    "trailing data after the last weight table".into(),
                ));
            }
        }

        log::debug!(
            "loaded weight tables for {} layers, vocab {}",
            layers,
            config.vocab_size
        );

        Ok(WeightTables {
            config: *config,
            token_embedding,
            rms_att,
            wq,
            wk,
            wv,
            wo,
            rms_ffn,
            w1,
            w2,
            w3,
            rms_out,
        })
    }

    fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.reader.read_exact(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    fn read_table(&mut self, count: usize) -> Result<Vec<f32>> {
        let byte_len = count.checked_mul(4).ok_or_else(|| {
            Error::InvalidFormat(format!("weight table of {count} floats overflows"))
        })?;
        let mut bytes = vec![0u8; byte_len];
        self.reader.read_exact(&mut bytes)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}

fn table_len(dims: &[usize]) -> Result<usize> {
    dims.iter()
        .try_fold(1usize, |len, &dim| len.checked_mul(dim))
        .ok_or_else(|| Error::InvalidFormat(format!("weight table shape {dims:?} overflows")))
}

/// All model parameters, held as flat per-table storage and sliced into
/// typed views on demand.
pub struct WeightTables {
    config: ModelConfig,
    token_embedding: Vec<f32>,
    rms_att: Vec<f32>,
    wq: Vec<f32>,
    wk: Vec<f32>,
    wv: Vec<f32>,
    wo: Vec<f32>,
    rms_ffn: Vec<f32>,
    w1: Vec<f32>,
    w2: Vec<f32>,
    w3: Vec<f32>,
    rms_out: Vec<f32>,
}

/// Borrowed weight views for one decoder layer.
pub struct LayerWeights<'a> {
    pub rms_att: TensorView<'a, 1>,
    pub wq: TensorView<'a, 2>,
    pub wk: TensorView<'a, 2>,
    pub wv: TensorView<'a, 2>,
    pub wo: TensorView<'a, 2>,
    pub rms_ffn: TensorView<'a, 1>,
    pub w1: TensorView<'a, 2>,
    pub w2: TensorView<'a, 2>,
    pub w3: TensorView<'a, 2>,
}

impl WeightTables {
    /// Loads a bundle from disk: header then tables.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BundleReader::new(BufReader::new(file));
        let config = reader.read_header()?;
        reader.load_weights(&config)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Token embedding matrix `[vocab_size, embedding_dim]`. Also serves
    /// as the unembedding matrix through weight tying.
    pub fn token_embedding(&self) -> TensorView<'_, 2> {
        TensorView::new(
            &self.token_embedding,
            [self.config.vocab_size, self.config.embedding_dim],
        )
    }

    /// Norm weights applied before the logits projection.
    pub fn rms_out(&self) -> TensorView<'_, 1> {
        TensorView::new(&self.rms_out, [self.config.embedding_dim])
    }

    /// Weight views for decoder layer `layer`.
    pub fn layer(&self, layer: usize) -> LayerWeights<'_> {
        assert!(
            layer < self.config.n_layers,
            "layer {} out of range ({} layers)",
            layer,
            self.config.n_layers
        );
        let emb = self.config.embedding_dim;
        let hidden = self.config.hidden_dim;
        let head_dim = self.config.head_dim();
        let q_dim = self.config.n_heads * head_dim;
        let kv_dim = self.config.n_kv_heads * head_dim;

        LayerWeights {
            rms_att: TensorView::sub(&self.rms_att, layer * emb, [emb]),
            wq: TensorView::sub(&self.wq, layer * q_dim * emb, [q_dim, emb]),
            wk: TensorView::sub(&self.wk, layer * kv_dim * emb, [kv_dim, emb]),
            wv: TensorView::sub(&self.wv, layer * kv_dim * emb, [kv_dim, emb]),
            wo: TensorView::sub(&self.wo, layer * emb * emb, [emb, emb]),
            rms_ffn: TensorView::sub(&self.rms_ffn, layer * emb, [emb]),
            w1: TensorView::sub(&self.w1, layer * hidden * emb, [hidden, emb]),
            w2: TensorView::sub(&self.w2, layer * emb * hidden, [emb, hidden]),
            w3: TensorView::sub(&self.w3, layer * hidden * emb, [hidden, emb]),
        }
    }
}
