//! Owned dense container and the dense stepper shared with strided views.

use std::ops::{Index, IndexMut};

use crate::broadcast::promote_strides;
use crate::element::{Element, NumericCast};
use crate::expression::{Container, Expression, ExpressionMut};
use crate::layout::{backstrides, compute_strides, total_len, Layout};
use crate::stepper::{Cursor, SVec, Stepper, StepperMut};
use crate::view::{ArrayView, ArrayViewMut};
use crate::{ExprError, Result};

// ============================================================================
// Dense cursor
// ============================================================================

/// Storage position bookkeeping for a strided region seen through a
/// broadcast shape.
///
/// Strides are stored per broadcast dimension. Dimensions the region does
/// not have, and dimensions of extent 1, get stride 0, so stepping along them
/// leaves the position untouched.
#[derive(Debug, Clone)]
pub(crate) struct DenseCursor {
    strides: SVec<isize>,
    backstrides: SVec<isize>,
    start: isize,
    end: isize,
    pos: isize,
}

impl DenseCursor {
    pub(crate) fn new(target: &[usize], dims: &[usize], strides: &[isize], offset: usize) -> Self {
        let strides: SVec<isize> = promote_strides(target, dims, strides).into_iter().collect();
        let backstrides: SVec<isize> = backstrides(target, &strides).into_iter().collect();
        let start = offset as isize;
        let last = start + backstrides.iter().sum::<isize>();
        Self {
            strides,
            backstrides,
            start,
            end: last + 1,
            pos: start,
        }
    }

    #[inline]
    pub(crate) fn pos(&self) -> usize {
        self.pos as usize
    }

    #[inline]
    pub(crate) fn advance(&mut self, n: usize) {
        self.pos += n as isize;
    }
}

impl Cursor for DenseCursor {
    #[inline]
    fn step(&mut self, dim: usize, n: usize) {
        self.pos += self.strides[dim] * n as isize;
    }

    #[inline]
    fn step_back(&mut self, dim: usize, n: usize) {
        self.pos -= self.strides[dim] * n as isize;
    }

    #[inline]
    fn reset(&mut self, dim: usize) {
        self.pos -= self.backstrides[dim];
    }

    #[inline]
    fn to_begin(&mut self) {
        self.pos = self.start;
    }

    #[inline]
    fn to_end(&mut self) {
        self.pos = self.end;
    }
}

/// Read-only stepper over strided storage.
#[derive(Debug, Clone)]
pub struct DenseStepper<'a, T> {
    data: &'a [T],
    cursor: DenseCursor,
}

impl<'a, T> DenseStepper<'a, T> {
    pub(crate) fn new(data: &'a [T], cursor: DenseCursor) -> Self {
        Self { data, cursor }
    }
}

impl<T> Cursor for DenseStepper<'_, T> {
    #[inline]
    fn step(&mut self, dim: usize, n: usize) {
        self.cursor.step(dim, n);
    }

    #[inline]
    fn step_back(&mut self, dim: usize, n: usize) {
        self.cursor.step_back(dim, n);
    }

    #[inline]
    fn reset(&mut self, dim: usize) {
        self.cursor.reset(dim);
    }

    #[inline]
    fn to_begin(&mut self) {
        self.cursor.to_begin();
    }

    #[inline]
    fn to_end(&mut self) {
        self.cursor.to_end();
    }
}

impl<T: Element> Stepper for DenseStepper<'_, T> {
    type Item = T;

    #[inline]
    fn get(&self) -> T {
        self.data[self.cursor.pos()]
    }

    #[inline]
    fn step_leading(&mut self) {
        self.cursor.advance(1);
    }

    #[inline]
    fn load_packet(&mut self, out: &mut [T]) {
        let p = self.cursor.pos();
        out.copy_from_slice(&self.data[p..p + out.len()]);
        self.cursor.advance(out.len());
    }
}

/// Writing stepper over strided storage.
#[derive(Debug)]
pub struct DenseStepperMut<'a, T> {
    data: &'a mut [T],
    cursor: DenseCursor,
}

impl<'a, T> DenseStepperMut<'a, T> {
    pub(crate) fn new(data: &'a mut [T], cursor: DenseCursor) -> Self {
        Self { data, cursor }
    }
}

impl<T> Cursor for DenseStepperMut<'_, T> {
    #[inline]
    fn step(&mut self, dim: usize, n: usize) {
        self.cursor.step(dim, n);
    }

    #[inline]
    fn step_back(&mut self, dim: usize, n: usize) {
        self.cursor.step_back(dim, n);
    }

    #[inline]
    fn reset(&mut self, dim: usize) {
        self.cursor.reset(dim);
    }

    #[inline]
    fn to_begin(&mut self) {
        self.cursor.to_begin();
    }

    #[inline]
    fn to_end(&mut self) {
        self.cursor.to_end();
    }
}

impl<T: Element> Stepper for DenseStepperMut<'_, T> {
    type Item = T;

    #[inline]
    fn get(&self) -> T {
        self.data[self.cursor.pos()]
    }

    #[inline]
    fn step_leading(&mut self) {
        self.cursor.advance(1);
    }

    #[inline]
    fn load_packet(&mut self, out: &mut [T]) {
        let p = self.cursor.pos();
        out.copy_from_slice(&self.data[p..p + out.len()]);
        self.cursor.advance(out.len());
    }
}

impl<T: Element> StepperMut for DenseStepperMut<'_, T> {
    #[inline]
    fn set(&mut self, value: T) {
        let p = self.cursor.pos();
        self.data[p] = value;
    }

    #[inline]
    fn store_packet(&mut self, values: &[T]) {
        let p = self.cursor.pos();
        self.data[p..p + values.len()].copy_from_slice(values);
        self.cursor.advance(values.len());
    }
}

/// Linear storage position of `index` under `strides`.
#[inline]
pub(crate) fn linear_offset(offset: usize, shape: &[usize], strides: &[isize], index: &[usize]) -> usize {
    assert_eq!(index.len(), shape.len(), "index rank mismatch");
    let mut pos = offset as isize;
    for ((&i, &d), &s) in index.iter().zip(shape.iter()).zip(strides.iter()) {
        assert!(i < d, "index out of bounds");
        pos += i as isize * s;
    }
    pos as usize
}

// ============================================================================
// Array
// ============================================================================

/// Owned dense N-dimensional container.
///
/// Elements are stored contiguously in row-major or column-major order.
/// An array is the usual destination of an assignment: it can be resized
/// by the engine when the source is larger than its current shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Array<T> {
    data: Vec<T>,
    shape: Vec<usize>,
    strides: Vec<isize>,
    layout: Layout,
}

/// A rank-0 array holding one default element.
impl<T: Element> Default for Array<T> {
    fn default() -> Self {
        Self::zeros(&[], Layout::RowMajor)
    }
}

fn storage_layout(layout: Layout) -> Layout {
    match layout {
        Layout::ColumnMajor => Layout::ColumnMajor,
        _ => Layout::RowMajor,
    }
}

impl<T: Element> Array<T> {
    /// Default-filled row-major array.
    pub fn new(shape: &[usize]) -> Self {
        Self::zeros(shape, Layout::RowMajor)
    }

    /// Default-filled array with the given storage order.
    ///
    /// `Dynamic` and `Any` are stored row-major.
    pub fn zeros(shape: &[usize], layout: Layout) -> Self {
        let layout = storage_layout(layout);
        Self {
            data: vec![T::default(); total_len(shape)],
            shape: shape.to_vec(),
            strides: compute_strides(shape, layout),
            layout,
        }
    }

    /// Wrap a buffer already laid out in `layout` order.
    pub fn from_vec(shape: &[usize], data: Vec<T>, layout: Layout) -> Result<Self> {
        let expected = total_len(shape);
        if data.len() != expected {
            return Err(ExprError::DataLength {
                len: data.len(),
                expected,
            });
        }
        let layout = storage_layout(layout);
        Ok(Self {
            data,
            shape: shape.to_vec(),
            strides: compute_strides(shape, layout),
            layout,
        })
    }

    /// Build an array by calling `f` for every multi-index in row-major order.
    pub fn from_fn<F>(shape: &[usize], layout: Layout, mut f: F) -> Self
    where
        F: FnMut(&[usize]) -> T,
    {
        let mut out = Self::zeros(shape, layout);
        if out.data.is_empty() {
            return out;
        }
        let mut index: SVec<usize> = SVec::from_elem(0, shape.len());
        for _ in 0..out.data.len() {
            let pos = linear_offset(0, &out.shape, &out.strides, &index);
            out.data[pos] = f(&index);
            for d in (0..shape.len()).rev() {
                index[d] += 1;
                if index[d] < shape[d] {
                    break;
                }
                index[d] = 0;
            }
        }
        out
    }

    /// Evaluate an expression into a fresh row-major array.
    pub fn from_expr<E>(expr: &E) -> Self
    where
        E: Expression + ?Sized,
        E::Item: NumericCast<T>,
    {
        let mut out = Self::new(expr.shape());
        crate::assign::assign_data(&mut out, expr, true);
        out
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Storage in layout order.
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Element at `index`.
    ///
    /// # Panics
    /// Panics if the index is out of bounds or has the wrong rank.
    #[inline]
    pub fn get(&self, index: &[usize]) -> T {
        self.data[linear_offset(0, &self.shape, &self.strides, index)]
    }

    #[inline]
    pub fn set(&mut self, index: &[usize], value: T) {
        let pos = linear_offset(0, &self.shape, &self.strides, index);
        self.data[pos] = value;
    }

    /// Elements in row-major logical order, regardless of storage order.
    pub fn to_row_major_vec(&self) -> Vec<T> {
        Expression::iter(self).collect()
    }

    pub fn view(&self) -> ArrayView<'_, T> {
        ArrayView::from_parts(&self.data, &self.shape, &self.strides, 0)
    }

    pub fn view_mut(&mut self) -> ArrayViewMut<'_, T> {
        ArrayViewMut::from_parts(&mut self.data, &self.shape, &self.strides, 0)
    }

    /// View with the axis order reversed.
    pub fn transpose(&self) -> ArrayView<'_, T> {
        self.view().transpose()
    }
}

impl<T: Element> Index<&[usize]> for Array<T> {
    type Output = T;

    fn index(&self, index: &[usize]) -> &T {
        &self.data[linear_offset(0, &self.shape, &self.strides, index)]
    }
}

impl<T: Element> IndexMut<&[usize]> for Array<T> {
    fn index_mut(&mut self, index: &[usize]) -> &mut T {
        let pos = linear_offset(0, &self.shape, &self.strides, index);
        &mut self.data[pos]
    }
}

impl<T: Element> Expression for Array<T> {
    type Item = T;
    type Stepper<'s> = DenseStepper<'s, T> where Self: 's;

    const STRIDED_LOOP: bool = true;

    #[inline]
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    fn get(&self, index: &[usize]) -> T {
        Array::get(self, index)
    }

    fn stepper_begin(&self, shape: &[usize]) -> DenseStepper<'_, T> {
        DenseStepper::new(&self.data, DenseCursor::new(shape, &self.shape, &self.strides, 0))
    }

    fn layout(&self) -> Layout {
        self.layout
    }

    fn strides(&self) -> Option<&[isize]> {
        Some(&self.strides)
    }

    fn is_trivial_broadcast(&self, layout: Layout, shape: &[usize]) -> bool {
        self.layout == layout && self.shape == shape
    }

    #[inline]
    fn data_element(&self, i: usize) -> T {
        self.data[i]
    }

    #[inline]
    fn load_elements(&self, start: usize, out: &mut [T]) {
        out.copy_from_slice(&self.data[start..start + out.len()]);
    }
}

impl<T: Element> ExpressionMut for Array<T> {
    type StepperMut<'s> = DenseStepperMut<'s, T> where Self: 's;

    fn stepper_begin_mut(&mut self, shape: &[usize]) -> DenseStepperMut<'_, T> {
        let cursor = DenseCursor::new(shape, &self.shape, &self.strides, 0);
        DenseStepperMut::new(&mut self.data, cursor)
    }

    fn contiguous_data_mut(&mut self) -> Option<&mut [T]> {
        Some(&mut self.data)
    }
}

impl<T: Element> Container for Array<T> {
    fn resize(&mut self, shape: &[usize]) {
        if self.shape != shape {
            *self = Self::zeros(shape, self.layout);
        }
    }

    fn temporary(&self, shape: &[usize]) -> Self {
        Self::zeros(shape, self.layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_rank0_with_one_element() {
        let a = Array::<f64>::default();
        assert!(a.shape().is_empty());
        assert_eq!(a.len(), 1);
        assert_eq!(a.get(&[]), 0.0);
    }

    #[test]
    fn test_stepper_end_matches_begin_then_to_end() {
        let a = Array::<f64>::zeros(&[2, 3], Layout::ColumnMajor);
        let mut s = a.stepper_begin(&[4, 2, 3]);
        s.to_end();
        assert_eq!(a.stepper_end(&[4, 2, 3]).cursor.pos(), s.cursor.pos());
    }

    #[test]
    fn test_from_vec_checks_length() {
        let err = Array::from_vec(&[2, 3], vec![1.0; 5], Layout::RowMajor).unwrap_err();
        assert_eq!(err, ExprError::DataLength { len: 5, expected: 6 });
    }

    #[test]
    fn test_column_major_indexing() {
        let a = Array::from_vec(&[2, 3], vec![0, 1, 2, 3, 4, 5], Layout::ColumnMajor).unwrap();
        assert_eq!(a.strides(), &[1, 2]);
        assert_eq!(a.get(&[1, 0]), 1);
        assert_eq!(a.get(&[0, 2]), 4);
        assert_eq!(a.to_row_major_vec(), vec![0, 2, 4, 1, 3, 5]);
    }

    #[test]
    fn test_from_fn_visits_row_major() {
        let mut seen = Vec::new();
        let a = Array::from_fn(&[2, 2], Layout::ColumnMajor, |idx| {
            seen.push(idx.to_vec());
            (idx[0] * 10 + idx[1]) as i32
        });
        assert_eq!(seen, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
        assert_eq!(a.data(), &[0, 10, 1, 11]);
    }

    #[test]
    fn test_dense_stepper_broadcasts_missing_dims() {
        let a = Array::from_vec(&[3], vec![1, 2, 3], Layout::RowMajor).unwrap();
        let values: Vec<i32> = a.iter_broadcast(&[2, 3]).unwrap().collect();
        assert_eq!(values, vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn test_dense_stepper_unit_dim_stays() {
        let a = Array::from_vec(&[2, 1], vec![7, 8], Layout::RowMajor).unwrap();
        let values: Vec<i32> = a.iter_broadcast(&[2, 3]).unwrap().collect();
        assert_eq!(values, vec![7, 7, 7, 8, 8, 8]);
    }

    #[test]
    fn test_step_back_and_to_end() {
        let a = Array::from_vec(&[2, 3], vec![0, 1, 2, 3, 4, 5], Layout::RowMajor).unwrap();
        let mut s = a.stepper_begin(&[2, 3]);
        s.step(0, 1);
        s.step(1, 2);
        assert_eq!(s.get(), 5);
        s.step_back(1, 1);
        assert_eq!(s.get(), 4);
        s.to_begin();
        assert_eq!(s.get(), 0);
        s.to_end();
        assert_eq!(s.cursor.pos(), 6);
    }

    #[test]
    fn test_packet_store_and_load() {
        let mut a = Array::<f32>::new(&[8]);
        {
            let mut s = a.stepper_begin_mut(&[8]);
            s.store_packet(&[1.0, 2.0, 3.0, 4.0]);
            s.set(9.0);
        }
        assert_eq!(&a.data()[..5], &[1.0, 2.0, 3.0, 4.0, 9.0]);
        let mut out = [0.0f32; 3];
        let mut s = a.stepper_begin(&[8]);
        s.step(0, 2);
        s.load_packet(&mut out);
        assert_eq!(out, [3.0, 4.0, 9.0]);
    }

    #[test]
    fn test_resize_reallocates_only_on_change() {
        let mut a = Array::from_vec(&[2], vec![1, 2], Layout::ColumnMajor).unwrap();
        a.resize(&[2]);
        assert_eq!(a.data(), &[1, 2]);
        a.resize(&[2, 2]);
        assert_eq!(a.shape(), &[2, 2]);
        assert_eq!(a.layout(), Layout::ColumnMajor);
        assert_eq!(a.data(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_index_ops() {
        let mut a = Array::<i64>::new(&[2, 2]);
        a[&[1, 0][..]] = 4;
        assert_eq!(a[&[1, 0][..]], 4);
        assert_eq!(a.data(), &[0, 0, 4, 0]);
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn test_get_out_of_bounds_panics() {
        let a = Array::<i64>::new(&[2, 2]);
        a.get(&[2, 0]);
    }
}
