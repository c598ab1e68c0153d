//! One decoder layer: pre-norm attention and feed-forward with residuals.

use kestrel_core::{LayerWeights, ModelConfig, Tensor};
use kestrel_cpu::rmsnorm;

use super::{ffn, SelfAttention};

/// Single decoder layer.
pub struct DecoderLayer {
    pub attention: SelfAttention,
}

impl DecoderLayer {
    pub fn new(config: &ModelConfig) -> Self {
        Self { attention: SelfAttention::new(config) }
    }

    /// `h = x + attn(norm(x)); y = h + ffn(norm(h))`.
    pub fn forward(
        &mut self,
        x: Tensor<1>,
        position: usize,
        weights: &LayerWeights<'_>,
    ) -> Tensor<1> {
        let shape = x.shape();

        let mut normed = Tensor::zeros(shape);
        rmsnorm(x.as_slice(), weights.rms_att.as_slice(), normed.as_mut_slice());
        let mut h = self.attention.forward(normed, position, weights);
        for (acc, &residual) in h.as_mut_slice().iter_mut().zip(x.as_slice()) {
            *acc += residual;
        }

        let mut normed = Tensor::zeros(shape);
        rmsnorm(h.as_slice(), weights.rms_ffn.as_slice(), normed.as_mut_slice());
        let mut y = ffn::forward(normed.view(), weights);
        for (acc, &residual) in y.as_mut_slice().iter_mut().zip(h.as_slice()) {
            *acc += residual;
        }

        y
    }
}
