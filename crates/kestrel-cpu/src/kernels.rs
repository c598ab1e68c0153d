//! Normalization, activation and rotary-embedding kernels.
//!
//! Free functions over plain `f32` slices. Preconditions are checked with
//! assertions; all arithmetic is single precision in the natural
//! accumulation order, so results are bit-stable across calls.

/// Epsilon added inside the RMS square root.
pub const RMS_EPS: f32 = 1e-5;

/// Base of the rotary embedding frequency ladder.
pub const ROPE_THETA: f32 = 10000.0;

/// RMS normalization: `output[i] = weight[i] * input[i] / rms(input)`.
pub fn rmsnorm(input: &[f32], weight: &[f32], output: &mut [f32]) {
    assert!(!input.is_empty(), "rmsnorm over an empty slice");
    assert_eq!(
        input.len(),
        weight.len(),
        "input of {} against weights of {}",
        input.len(),
        weight.len()
    );
    assert_eq!(
        input.len(),
        output.len(),
        "input of {} against output of {}",
        input.len(),
        output.len()
    );

    let sum_sq: f32 = input.iter().map(|&v| v * v).sum();
    let rms = (sum_sq / input.len() as f32 + RMS_EPS).sqrt();
    for (out, (&x, &w)) in output.iter_mut().zip(input.iter().zip(weight.iter())) {
        *out = x * w / rms;
    }
}

/// Softmax in place: subtract the max, exponentiate, divide by the sum.
pub fn softmax(x: &mut [f32]) {
    assert!(!x.is_empty(), "softmax over an empty slice");

    let max = x.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in x.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in x.iter_mut() {
        *v /= sum;
    }
}

/// SwiGLU gate activation in place: `x[i] = x[i] / (1 + exp(-x[i]))`.
pub fn silu(x: &mut [f32]) {
    for v in x.iter_mut() {
        *v /= 1.0 + (-*v).exp();
    }
}

/// Rotary position embedding in place on one head's slice.
///
/// Consecutive pairs `(x[i], x[i+1])` rotate by `position * theta_i` with
/// `theta_i = 10000^(-i / head_dim)`. The divisor is always the full head
/// dimension regardless of the slice length, so partial rotations keep the
/// same frequency ladder.
pub fn rope(x: &mut [f32], position: usize, head_dim: usize) {
    assert!(head_dim > 0, "head dim must be positive");
    assert_eq!(x.len() % 2, 0, "slice of {} cannot be paired", x.len());

    for i in (0..x.len()).step_by(2) {
        let theta = ROPE_THETA.powf(-(i as f32) / head_dim as f32);
        let phi = position as f32 * theta;
        let (sin, cos) = phi.sin_cos();
        let a = x[i];
        let b = x[i + 1];
        x[i] = a * cos - b * sin;
        x[i + 1] = a * sin + b * cos;
    }
}
