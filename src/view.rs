//! Strided views and broadcast scalars.
//!
//! `ArrayView` and `ArrayViewMut` are zero-copy windows onto a buffer with
//! an arbitrary shape, per-dimension strides (in elements, possibly negative
//! or zero) and a starting offset. Axis permutation, slicing and broadcasting
//! only rewrite that geometry.

use std::ops::Range;

use crate::array::{linear_offset, DenseCursor, DenseStepper, DenseStepperMut};
use crate::broadcast::{broadcastable, promote_strides};
use crate::element::Element;
use crate::expression::{Expression, ExpressionMut};
use crate::layout::{detect_layout, total_len, unravel_index, Layout};
use crate::stepper::{Cursor, SVec, Stepper};
use crate::{ExprError, Result};

// ============================================================================
// Geometry
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct Geometry {
    shape: SVec<usize>,
    strides: SVec<isize>,
    offset: usize,
    layout: Layout,
}

impl Geometry {
    fn new(shape: &[usize], strides: &[isize], offset: usize) -> Self {
        Self {
            shape: SVec::from_slice(shape),
            strides: SVec::from_slice(strides),
            offset,
            layout: detect_layout(shape, strides),
        }
    }

    fn len(&self) -> usize {
        total_len(&self.shape)
    }

    /// The covered range of the buffer, when the view is dense.
    fn contiguous_range(&self) -> Option<Range<usize>> {
        if !self.layout.is_contiguous() {
            return None;
        }
        let len = self.len();
        if len == 0 {
            return Some(0..0);
        }
        Some(self.offset..self.offset + len)
    }

    fn position(&self, index: &[usize]) -> usize {
        linear_offset(self.offset, &self.shape, &self.strides, index)
    }

    /// Storage position of the `i`-th element in row-major logical order.
    fn row_major_position(&self, i: usize) -> usize {
        let mut index: SVec<usize> = SVec::from_elem(0, self.shape.len());
        unravel_index(i, &self.shape, Layout::RowMajor, &mut index);
        self.position(&index)
    }

    fn check_axis(&self, axis: usize) -> Result<()> {
        if axis >= self.shape.len() {
            return Err(ExprError::InvalidAxis {
                axis,
                rank: self.shape.len(),
            });
        }
        Ok(())
    }

    fn permute(&self, perm: &[usize]) -> Result<Self> {
        if !is_permutation(perm, self.shape.len()) {
            return Err(ExprError::InvalidPermutation(perm.to_vec()));
        }
        let shape: SVec<usize> = perm.iter().map(|&p| self.shape[p]).collect();
        let strides: SVec<isize> = perm.iter().map(|&p| self.strides[p]).collect();
        Ok(Self::new(&shape, &strides, self.offset))
    }

    fn transpose(&self) -> Self {
        let shape: SVec<usize> = self.shape.iter().rev().copied().collect();
        let strides: SVec<isize> = self.strides.iter().rev().copied().collect();
        Self::new(&shape, &strides, self.offset)
    }

    fn slice_axis(&self, axis: usize, range: Range<usize>, step: isize) -> Result<Self> {
        self.check_axis(axis)?;
        if step == 0 {
            return Err(ExprError::ZeroStep { axis });
        }
        let extent = self.shape[axis];
        if range.start > range.end || range.end > extent {
            return Err(ExprError::InvalidRange {
                axis,
                start: range.start,
                end: range.end,
                extent,
            });
        }
        let abs = step.unsigned_abs();
        let len = (range.end - range.start + abs - 1) / abs;
        let first = if step > 0 { range.start } else { range.end.saturating_sub(1) };

        let mut shape = self.shape.clone();
        let mut strides = self.strides.clone();
        let mut offset = self.offset;
        if len > 0 {
            offset = (offset as isize + first as isize * strides[axis]) as usize;
        }
        shape[axis] = len;
        strides[axis] *= step;
        Ok(Self::new(&shape, &strides, offset))
    }

    fn index_axis(&self, axis: usize, index: usize) -> Result<Self> {
        self.check_axis(axis)?;
        let extent = self.shape[axis];
        if index >= extent {
            return Err(ExprError::InvalidRange {
                axis,
                start: index,
                end: index + 1,
                extent,
            });
        }
        let offset = (self.offset as isize + index as isize * self.strides[axis]) as usize;
        let mut shape = self.shape.clone();
        let mut strides = self.strides.clone();
        shape.remove(axis);
        strides.remove(axis);
        Ok(Self::new(&shape, &strides, offset))
    }

    fn insert_axis(&self, axis: usize) -> Result<Self> {
        if axis > self.shape.len() {
            return Err(ExprError::InvalidAxis {
                axis,
                rank: self.shape.len(),
            });
        }
        let mut shape = self.shape.clone();
        let mut strides = self.strides.clone();
        shape.insert(axis, 1);
        strides.insert(axis, 0);
        Ok(Self::new(&shape, &strides, self.offset))
    }

    fn broadcast_to(&self, shape: &[usize]) -> Result<Self> {
        if !broadcastable(&self.shape, shape) {
            return Err(ExprError::Broadcast {
                from: self.shape.to_vec(),
                to: shape.to_vec(),
            });
        }
        let strides = promote_strides(shape, &self.shape, &self.strides);
        Ok(Self::new(shape, &strides, self.offset))
    }
}

fn is_permutation(perm: &[usize], rank: usize) -> bool {
    if perm.len() != rank {
        return false;
    }
    let mut seen: SVec<bool> = SVec::from_elem(false, rank);
    for &p in perm {
        if p >= rank || seen[p] {
            return false;
        }
        seen[p] = true;
    }
    true
}

fn validate_bounds(data_len: usize, shape: &[usize], strides: &[isize], offset: usize) -> Result<()> {
    if shape.len() != strides.len() {
        return Err(ExprError::StrideLengthMismatch);
    }
    if shape.contains(&0) {
        // Empty array, no bounds to check
        return Ok(());
    }

    let start = isize::try_from(offset).map_err(|_| ExprError::OffsetOverflow)?;
    let mut min_offset = start;
    let mut max_offset = start;
    for (&d, &s) in shape.iter().zip(strides.iter()) {
        if d > 1 {
            let end = s
                .checked_mul(d as isize - 1)
                .ok_or(ExprError::OffsetOverflow)?;
            if end >= 0 {
                max_offset = max_offset.checked_add(end).ok_or(ExprError::OffsetOverflow)?;
            } else {
                min_offset = min_offset.checked_add(end).ok_or(ExprError::OffsetOverflow)?;
            }
        }
    }

    if min_offset < 0 || max_offset as usize >= data_len {
        return Err(ExprError::OffsetOverflow);
    }
    Ok(())
}

// ============================================================================
// ArrayView
// ============================================================================

/// An immutable strided view.
///
/// # Example
/// ```
/// use strided_expr::ArrayView;
///
/// let data = [0, 1, 2, 3, 4, 5];
/// let v = ArrayView::new(&data, &[2, 3], &[3, 1], 0).unwrap();
/// let t = v.transpose();
/// assert_eq!(t.shape(), &[3, 2]);
/// assert_eq!(t.get(&[2, 1]), 5);
/// ```
#[derive(Debug, Clone)]
pub struct ArrayView<'a, T> {
    data: &'a [T],
    geom: Geometry,
}

impl<'a, T: Element> ArrayView<'a, T> {
    /// Create a view of `data`.
    ///
    /// # Errors
    /// Returns an error if `strides` and `shape` differ in length, or if some
    /// index would address memory outside of `data`.
    pub fn new(data: &'a [T], shape: &[usize], strides: &[isize], offset: usize) -> Result<Self> {
        validate_bounds(data.len(), shape, strides, offset)?;
        Ok(Self::from_parts(data, shape, strides, offset))
    }

    pub(crate) fn from_parts(data: &'a [T], shape: &[usize], strides: &[isize], offset: usize) -> Self {
        Self {
            data,
            geom: Geometry::new(shape, strides, offset),
        }
    }

    fn with_geometry(&self, geom: Geometry) -> Self {
        Self {
            data: self.data,
            geom,
        }
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.geom.shape
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.geom.strides
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.geom.offset
    }

    /// Contiguous order of the viewed elements, `Dynamic` if none.
    #[inline]
    pub fn layout(&self) -> Layout {
        self.geom.layout
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.geom.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.geom.shape.contains(&0)
    }

    /// # Panics
    /// Panics if the index is out of bounds.
    #[inline]
    pub fn get(&self, index: &[usize]) -> T {
        self.data[self.geom.position(index)]
    }

    /// Reorder axes: axis `i` of the result is axis `perm[i]` of `self`.
    pub fn permute(&self, perm: &[usize]) -> Result<Self> {
        Ok(self.with_geometry(self.geom.permute(perm)?))
    }

    /// Reverse the axis order.
    pub fn transpose(&self) -> Self {
        self.with_geometry(self.geom.transpose())
    }

    /// Keep `range` of `axis`, taking every `step`-th element.
    ///
    /// A negative step walks the range backward from `range.end - 1`.
    pub fn slice_axis(&self, axis: usize, range: Range<usize>, step: isize) -> Result<Self> {
        Ok(self.with_geometry(self.geom.slice_axis(axis, range, step)?))
    }

    /// Fix `axis` at `index` and drop it.
    pub fn index_axis(&self, axis: usize, index: usize) -> Result<Self> {
        Ok(self.with_geometry(self.geom.index_axis(axis, index)?))
    }

    /// Insert a new axis of extent 1 before `axis`.
    pub fn insert_axis(&self, axis: usize) -> Result<Self> {
        Ok(self.with_geometry(self.geom.insert_axis(axis)?))
    }

    /// Broadcast to `shape` with zero strides on the expanded axes.
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Self> {
        Ok(self.with_geometry(self.geom.broadcast_to(shape)?))
    }
}

impl<T: Element> Expression for ArrayView<'_, T> {
    type Item = T;
    type Stepper<'s> = DenseStepper<'s, T> where Self: 's;

    const STRIDED_LOOP: bool = true;

    #[inline]
    fn shape(&self) -> &[usize] {
        &self.geom.shape
    }

    #[inline]
    fn get(&self, index: &[usize]) -> T {
        ArrayView::get(self, index)
    }

    fn stepper_begin(&self, shape: &[usize]) -> DenseStepper<'_, T> {
        let g = &self.geom;
        DenseStepper::new(self.data, DenseCursor::new(shape, &g.shape, &g.strides, g.offset))
    }

    fn layout(&self) -> Layout {
        self.geom.layout
    }

    fn strides(&self) -> Option<&[isize]> {
        Some(&self.geom.strides)
    }

    fn is_trivial_broadcast(&self, layout: Layout, shape: &[usize]) -> bool {
        self.geom.layout == layout && self.geom.shape.as_slice() == shape
    }

    #[inline]
    fn data_element(&self, i: usize) -> T {
        if self.geom.layout.is_contiguous() {
            self.data[self.geom.offset + i]
        } else {
            self.data[self.geom.row_major_position(i)]
        }
    }
}

// ============================================================================
// ArrayViewMut
// ============================================================================

/// A mutable strided view.
///
/// Geometry operations consume the view, so at most one writer exists for
/// any element.
#[derive(Debug)]
pub struct ArrayViewMut<'a, T> {
    data: &'a mut [T],
    geom: Geometry,
}

impl<'a, T: Element> ArrayViewMut<'a, T> {
    /// Create a mutable view of `data`.
    ///
    /// Zero strides on axes of extent > 1 are accepted; writes through such a
    /// view land on the same element more than once.
    pub fn new(data: &'a mut [T], shape: &[usize], strides: &[isize], offset: usize) -> Result<Self> {
        validate_bounds(data.len(), shape, strides, offset)?;
        Ok(Self::from_parts(data, shape, strides, offset))
    }

    pub(crate) fn from_parts(data: &'a mut [T], shape: &[usize], strides: &[isize], offset: usize) -> Self {
        Self {
            data,
            geom: Geometry::new(shape, strides, offset),
        }
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.geom.shape
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.geom.strides
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.geom.offset
    }

    #[inline]
    pub fn layout(&self) -> Layout {
        self.geom.layout
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.geom.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.geom.shape.contains(&0)
    }

    #[inline]
    pub fn get(&self, index: &[usize]) -> T {
        self.data[self.geom.position(index)]
    }

    #[inline]
    pub fn set(&mut self, index: &[usize], value: T) {
        let pos = self.geom.position(index);
        self.data[pos] = value;
    }

    /// Read-only view of the same elements.
    pub fn view(&self) -> ArrayView<'_, T> {
        ArrayView {
            data: &*self.data,
            geom: self.geom.clone(),
        }
    }

    /// Shorter-lived mutable view of the same elements.
    pub fn reborrow(&mut self) -> ArrayViewMut<'_, T> {
        ArrayViewMut {
            data: &mut *self.data,
            geom: self.geom.clone(),
        }
    }

    pub fn permute(self, perm: &[usize]) -> Result<Self> {
        let geom = self.geom.permute(perm)?;
        Ok(Self { data: self.data, geom })
    }

    pub fn transpose(self) -> Self {
        let geom = self.geom.transpose();
        Self { data: self.data, geom }
    }

    pub fn slice_axis(self, axis: usize, range: Range<usize>, step: isize) -> Result<Self> {
        let geom = self.geom.slice_axis(axis, range, step)?;
        Ok(Self { data: self.data, geom })
    }

    pub fn index_axis(self, axis: usize, index: usize) -> Result<Self> {
        let geom = self.geom.index_axis(axis, index)?;
        Ok(Self { data: self.data, geom })
    }

    pub fn insert_axis(self, axis: usize) -> Result<Self> {
        let geom = self.geom.insert_axis(axis)?;
        Ok(Self { data: self.data, geom })
    }
}

impl<T: Element> Expression for ArrayViewMut<'_, T> {
    type Item = T;
    type Stepper<'s> = DenseStepper<'s, T> where Self: 's;

    const STRIDED_LOOP: bool = true;

    #[inline]
    fn shape(&self) -> &[usize] {
        &self.geom.shape
    }

    #[inline]
    fn get(&self, index: &[usize]) -> T {
        ArrayViewMut::get(self, index)
    }

    fn stepper_begin(&self, shape: &[usize]) -> DenseStepper<'_, T> {
        let g = &self.geom;
        DenseStepper::new(&*self.data, DenseCursor::new(shape, &g.shape, &g.strides, g.offset))
    }

    fn layout(&self) -> Layout {
        self.geom.layout
    }

    fn strides(&self) -> Option<&[isize]> {
        Some(&self.geom.strides)
    }

    fn is_trivial_broadcast(&self, layout: Layout, shape: &[usize]) -> bool {
        self.geom.layout == layout && self.geom.shape.as_slice() == shape
    }

    #[inline]
    fn data_element(&self, i: usize) -> T {
        if self.geom.layout.is_contiguous() {
            self.data[self.geom.offset + i]
        } else {
            self.data[self.geom.row_major_position(i)]
        }
    }
}

impl<T: Element> ExpressionMut for ArrayViewMut<'_, T> {
    type StepperMut<'s> = DenseStepperMut<'s, T> where Self: 's;

    fn stepper_begin_mut(&mut self, shape: &[usize]) -> DenseStepperMut<'_, T> {
        let g = &self.geom;
        let cursor = DenseCursor::new(shape, &g.shape, &g.strides, g.offset);
        DenseStepperMut::new(&mut *self.data, cursor)
    }

    fn contiguous_data_mut(&mut self) -> Option<&mut [T]> {
        let range = self.geom.contiguous_range()?;
        Some(&mut self.data[range])
    }
}

// ============================================================================
// Scalar
// ============================================================================

/// A single value acting as an expression of any shape.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Scalar<T>(pub T);

impl<T: Element> Scalar<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn value(&self) -> T {
        self.0
    }
}

/// Stepper that never moves.
#[derive(Debug, Clone, Copy)]
pub struct ScalarStepper<T> {
    value: T,
}

impl<T> Cursor for ScalarStepper<T> {
    #[inline]
    fn step(&mut self, _dim: usize, _n: usize) {}

    #[inline]
    fn step_back(&mut self, _dim: usize, _n: usize) {}

    #[inline]
    fn reset(&mut self, _dim: usize) {}

    #[inline]
    fn to_begin(&mut self) {}

    #[inline]
    fn to_end(&mut self) {}
}

impl<T: Element> Stepper for ScalarStepper<T> {
    type Item = T;

    #[inline]
    fn get(&self) -> T {
        self.value
    }

    #[inline]
    fn step_leading(&mut self) {}

    #[inline]
    fn load_packet(&mut self, out: &mut [T]) {
        out.fill(self.value);
    }
}

impl<T: Element> Expression for Scalar<T> {
    type Item = T;
    type Stepper<'s> = ScalarStepper<T> where Self: 's;

    const STRIDED_LOOP: bool = true;

    #[inline]
    fn shape(&self) -> &[usize] {
        &[]
    }

    #[inline]
    fn get(&self, _index: &[usize]) -> T {
        self.0
    }

    fn stepper_begin(&self, _shape: &[usize]) -> ScalarStepper<T> {
        ScalarStepper { value: self.0 }
    }

    /// A scalar never expands anything.
    fn broadcast_shape(&self, _shape: &mut Vec<usize>) -> Result<bool> {
        Ok(true)
    }

    fn is_trivial_broadcast(&self, _layout: Layout, _shape: &[usize]) -> bool {
        true
    }

    #[inline]
    fn data_element(&self, _i: usize) -> T {
        self.0
    }

    #[inline]
    fn load_elements(&self, _start: usize, out: &mut [T]) {
        out.fill(self.0);
    }
}
