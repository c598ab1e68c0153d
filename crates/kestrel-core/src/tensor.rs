//! Numeric substrate: rank-typed `f32` tensors over flat row-major storage.
//!
//! Owning tensors hold a `Vec<f32>`; views borrow a slice of some other
//! tensor's storage. Rank is a const parameter, so mixing up a matrix and
//! a vector is a compile error while extents stay runtime values checked
//! by assertions.

use std::ops::{Index, IndexMut};

/// Rank-`R` array of `f32` that owns its storage.
#[derive(Debug, Clone)]
pub struct Tensor<const R: usize> {
    data: Vec<f32>,
    shape: [usize; R],
}

impl<const R: usize> Tensor<R> {
    /// Zero-filled tensor of the given shape.
    pub fn zeros(shape: [usize; R]) -> Self {
        let len = shape.iter().product();
        Self { data: vec![0.0; len], shape }
    }

    /// Wraps existing storage. The element count must match the shape.
    pub fn from_vec(data: Vec<f32>, shape: [usize; R]) -> Self {
        assert_eq!(
            data.len(),
            shape.iter().product::<usize>(),
            "storage of {} elements does not fill shape {:?}",
            data.len(),
            shape
        );
        Self { data, shape }
    }

    pub fn shape(&self) -> [usize; R] {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn view(&self) -> TensorView<'_, R> {
        TensorView { data: &self.data, shape: self.shape }
    }

    pub fn view_mut(&mut self) -> TensorViewMut<'_, R> {
        TensorViewMut { data: &mut self.data, shape: self.shape }
    }

    /// Reinterprets the storage under a different shape of any rank.
    pub fn view_as<const R2: usize>(&self, shape: [usize; R2]) -> TensorView<'_, R2> {
        TensorView::new(&self.data, shape)
    }

    /// Mutable reinterpretation of the storage under a different shape.
    pub fn view_as_mut<const R2: usize>(&mut self, shape: [usize; R2]) -> TensorViewMut<'_, R2> {
        TensorViewMut::new(&mut self.data, shape)
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

impl Tensor<2> {
    /// Borrows row `i` as a rank-1 view.
    pub fn row(&self, i: usize) -> TensorView<'_, 1> {
        self.view().row(i)
    }

    /// Mutably borrows row `i` as a rank-1 view.
    pub fn row_mut(&mut self, i: usize) -> TensorViewMut<'_, 1> {
        let [rows, cols] = self.shape;
        assert!(i < rows, "row {} out of range ({} rows)", i, rows);
        TensorViewMut { data: &mut self.data[i * cols..(i + 1) * cols], shape: [cols] }
    }
}

impl Index<usize> for Tensor<1> {
    type Output = f32;

    fn index(&self, i: usize) -> &f32 {
        &self.data[i]
    }
}

impl IndexMut<usize> for Tensor<1> {
    fn index_mut(&mut self, i: usize) -> &mut f32 {
        &mut self.data[i]
    }
}

/// Borrowed rank-`R` view over another tensor's storage.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a, const R: usize> {
    data: &'a [f32],
    shape: [usize; R],
}

impl<'a, const R: usize> TensorView<'a, R> {
    /// Wraps a slice. The element count must match the shape.
    pub fn new(data: &'a [f32], shape: [usize; R]) -> Self {
        assert_eq!(
            data.len(),
            shape.iter().product::<usize>(),
            "storage of {} elements does not fill shape {:?}",
            data.len(),
            shape
        );
        Self { data, shape }
    }

    /// View of `shape` starting `offset` elements into `source`.
    pub fn sub(source: &'a [f32], offset: usize, shape: [usize; R]) -> Self {
        let len = shape.iter().product::<usize>();
        assert!(
            offset + len <= source.len(),
            "sub-view of {} elements at offset {} exceeds storage of {}",
            len,
            offset,
            source.len()
        );
        Self { data: &source[offset..offset + len], shape }
    }

    pub fn shape(&self) -> [usize; R] {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }
}

impl<'a> TensorView<'a, 2> {
    /// Row `i` as a rank-1 view with the parent lifetime.
    pub fn row(&self, i: usize) -> TensorView<'a, 1> {
        let [rows, cols] = self.shape;
        assert!(i < rows, "row {} out of range ({} rows)", i, rows);
        TensorView { data: &self.data[i * cols..(i + 1) * cols], shape: [cols] }
    }
}

impl<'a> TensorView<'a, 3> {
    /// Index along the leading axis, yielding a rank-2 view.
    pub fn row(&self, i: usize) -> TensorView<'a, 2> {
        let [d0, d1, d2] = self.shape;
        assert!(i < d0, "index {} out of range ({} rows)", i, d0);
        TensorView { data: &self.data[i * d1 * d2..(i + 1) * d1 * d2], shape: [d1, d2] }
    }
}

impl<'a> Index<usize> for TensorView<'a, 1> {
    type Output = f32;

    fn index(&self, i: usize) -> &f32 {
        &self.data[i]
    }
}

/// Mutable rank-`R` view over another tensor's storage.
#[derive(Debug)]
pub struct TensorViewMut<'a, const R: usize> {
    data: &'a mut [f32],
    shape: [usize; R],
}

impl<'a, const R: usize> TensorViewMut<'a, R> {
    /// Wraps a mutable slice. The element count must match the shape.
    pub fn new(data: &'a mut [f32], shape: [usize; R]) -> Self {
        assert_eq!(
            data.len(),
            shape.iter().product::<usize>(),
            "storage of {} elements does not fill shape {:?}",
            data.len(),
            shape
        );
        Self { data, shape }
    }

    pub fn shape(&self) -> [usize; R] {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        self.data
    }
}

impl<'a> Index<usize> for TensorViewMut<'a, 1> {
    type Output = f32;

    fn index(&self, i: usize) -> &f32 {
        &self.data[i]
    }
}

impl<'a> IndexMut<usize> for TensorViewMut<'a, 1> {
    fn index_mut(&mut self, i: usize) -> &mut f32 {
        &mut self.data[i]
    }
}
