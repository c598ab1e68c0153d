//! Complete transformer model: embedding, decoder stack, unembedding.

use kestrel_core::{ModelConfig, Tensor, TensorView, WeightTables};
use kestrel_cpu::{matvec, rmsnorm};

use super::DecoderLayer;

/// Auto-regressive decoder over a loaded weight bundle.
///
/// Holds the weight tables and one `DecoderLayer` (with its KV cache) per
/// layer. `forward` is single-token: the caller walks positions `0, 1, …`
/// and the caches accumulate the visited prefix.
pub struct Model {
    pub config: ModelConfig,
    weights: WeightTables,
    pub layers: Vec<DecoderLayer>,
}

impl Model {
    pub fn new(weights: WeightTables) -> Self {
        let config = *weights.config();
        let layers = (0..config.n_layers).map(|_| DecoderLayer::new(&config)).collect();
        log::debug!(
            "built model: {} layers, {} heads ({} kv), embedding {}, context {}",
            config.n_layers,
            config.n_heads,
            config.n_kv_heads,
            config.embedding_dim,
            config.seq_len
        );
        Self { config, weights, layers }
    }

    /// Copies the embedding row for `token` into a fresh activation.
    pub fn embed(&self, token: u32) -> Tensor<1> {
        assert!(
            (token as usize) < self.config.vocab_size,
            "token id {} out of range (vocab {})",
            token,
            self.config.vocab_size
        );
        let table = self.weights.token_embedding();
        Tensor::from_vec(
            table.row(token as usize).as_slice().to_vec(),
            [self.config.embedding_dim],
        )
    }

    /// Projects an activation onto the tied embedding table, giving one
    /// logit per vocabulary entry.
    pub fn unembed(&self, x: TensorView<'_, 1>) -> Tensor<1> {
        matvec(self.weights.token_embedding(), x)
    }

    /// Runs the decoder stack for the token embedded in `x` at `position`
    /// and returns raw logits.
    pub fn forward(&mut self, x: Tensor<1>, position: usize) -> Tensor<1> {
        assert_eq!(
            x.shape()[0],
            self.config.embedding_dim,
            "activation of {} against embedding dim {}",
            x.shape()[0],
            self.config.embedding_dim
        );

        let weights = &self.weights;
        let mut x = x;
        for (index, layer) in self.layers.iter_mut().enumerate() {
            x = layer.forward(x, position, &weights.layer(index));
        }

        let mut normed = Tensor::zeros([self.config.embedding_dim]);
        rmsnorm(x.as_slice(), weights.rms_out().as_slice(), normed.as_mut_slice());
        self.unembed(normed.view())
    }

    /// Clears every layer's KV cache so a new sequence starts from scratch.
    pub fn reset_caches(&mut self) {
        for layer in &mut self.layers {
            layer.attention.reset();
        }
    }
}
