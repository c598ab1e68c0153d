//! SwiGLU feed-forward network.

use kestrel_core::{LayerWeights, Tensor, TensorView};
use kestrel_cpu::{matvec, silu};

/// Gated feed-forward: `w2 · (silu(w1·x) * (w3·x))`.
///
/// Stateless; both intermediate activations are `hidden_dim` wide.
pub(crate) fn forward(x: TensorView<'_, 1>, weights: &LayerWeights<'_>) -> Tensor<1> {
    let mut gate = matvec(weights.w1, x);
    silu(gate.as_mut_slice());

    let mut hidden = matvec(weights.w3, x);
    for (h, &g) in hidden.as_mut_slice().iter_mut().zip(gate.as_slice()) {
        *h *= g;
    }

    matvec(weights.w2, hidden.view())
}
