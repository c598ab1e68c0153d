//! Matrix-vector products over rank-typed views.
//!
//! Weight matrices are row-major `[out_rows, in_cols]`, so every projection
//! in the model is one `matvec` against a contiguous row. Shapes are
//! aligned by the type system per rank and by assertions per extent.

use kestrel_core::tensor::{Tensor, TensorView, TensorViewMut};

/// `out = left · right` into freshly allocated storage.
pub fn matvec(left: TensorView<'_, 2>, right: TensorView<'_, 1>) -> Tensor<1> {
    let [rows, _] = left.shape();
    let mut out = Tensor::zeros([rows]);
    matvec_into(left, right, &mut out.view_mut());
    out
}

/// `out = left · right` into an existing buffer, zeroing it first.
pub fn matvec_into(left: TensorView<'_, 2>, right: TensorView<'_, 1>, out: &mut TensorViewMut<'_, 1>) {
    let [rows, cols] = left.shape();
    assert_eq!(
        cols,
        right.len(),
        "matrix of {} columns against vector of {}",
        cols,
        right.len()
    );
    assert_eq!(
        rows,
        out.len(),
        "matrix of {} rows against output of {}",
        rows,
        out.len()
    );

    let matrix = left.as_slice();
    let x = right.as_slice();
    let y = out.as_mut_slice();
    y.fill(0.0);
    for (i, out_val) in y.iter_mut().enumerate() {
        let row = &matrix[i * cols..(i + 1) * cols];
        for (l, r) in row.iter().zip(x) {
            *out_val += l * r;
        }
    }
}

/// Inner product of two equal-length vectors.
pub fn dot(a: TensorView<'_, 1>, b: TensorView<'_, 1>) -> f32 {
    assert_eq!(a.len(), b.len(), "dot of lengths {} and {}", a.len(), b.len());
    a.as_slice().iter().zip(b.as_slice()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matvec_identity() {
        let identity = Tensor::from_vec(vec![1.0, 0.0, 0.0, 1.0], [2, 2]);
        let x = Tensor::from_vec(vec![5.0, 7.0], [2]);
        let y = matvec(identity.view(), x.view());
        assert_eq!(y.as_slice(), &[5.0, 7.0]);
    }

    #[test]
    fn matvec_simple() {
        // [2, 3] · [3]
        let m = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]);
        let x = Tensor::from_vec(vec![1.0, 2.0, 3.0], [3]);
        let y = matvec(m.view(), x.view());
        // y[0] = 1*1 + 2*2 + 3*3 = 14
        // y[1] = 4*1 + 5*2 + 6*3 = 32
        assert_eq!(y.as_slice(), &[14.0, 32.0]);
    }

    #[test]
    fn matvec_into_overwrites_stale_output() {
        let m = Tensor::from_vec(vec![1.0, 0.0, 0.0, 0.0], [2, 2]);
        let x = Tensor::from_vec(vec![3.0, 4.0], [2]);
        let mut y = Tensor::from_vec(vec![100.0, 100.0], [2]);
        matvec_into(m.view(), x.view(), &mut y.view_mut());
        assert_eq!(y.as_slice(), &[3.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "columns against vector")]
    fn matvec_checks_inner_dimension() {
        let m = Tensor::zeros([2, 3]);
        let x = Tensor::zeros([2]);
        matvec(m.view(), x.view());
    }

    #[test]
    #[should_panic(expected = "rows against output")]
    fn matvec_into_checks_output_length() {
        let m = Tensor::zeros([2, 3]);
        let x = Tensor::zeros([3]);
        let mut y = Tensor::zeros([3]);
        matvec_into(m.view(), x.view(), &mut y.view_mut());
    }

    #[test]
    fn dot_product() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0], [3]);
        let b = Tensor::from_vec(vec![4.0, 5.0, 6.0], [3]);
        assert_eq!(dot(a.view(), b.view()), 32.0);
    }

    #[test]
    #[should_panic(expected = "dot of lengths")]
    fn dot_checks_lengths() {
        let a = Tensor::zeros([3]);
        let b = Tensor::zeros([4]);
        dot(a.view(), b.view());
    }
}
