//! Cursor contract shared by every expression kind.
//!
//! A stepper is bound to one expression and one broadcast shape. It is moved
//! along dimensions of that shape; dimensions the expression does not have
//! (or has with extent 1) leave it in place.

use std::iter::FusedIterator;

use smallvec::SmallVec;

use crate::element::Element;

/// Stack-allocated index / shape storage; 8 covers nearly every real rank.
pub(crate) type SVec<T> = SmallVec<[T; 8]>;

/// Positioning half of the stepper contract.
///
/// Separate from [`Stepper`] so that a group of steppers (for example the two
/// sides of an assignment) can be driven as one by [`increment_stepper`].
pub trait Cursor {
    /// Advance `n` positions along `dim`.
    fn step(&mut self, dim: usize, n: usize);

    /// Move back `n` positions along `dim`.
    fn step_back(&mut self, dim: usize, n: usize);

    /// Rewind `dim` from its last index to index 0.
    fn reset(&mut self, dim: usize);

    /// Return to the first element.
    fn to_begin(&mut self);

    /// Jump to the one-past-the-end position.
    fn to_end(&mut self);
}

/// Read access at the cursor position.
pub trait Stepper: Cursor {
    type Item: Element;

    /// Value at the current position.
    fn get(&self) -> Self::Item;

    /// Advance one element in storage order.
    ///
    /// Only meaningful inside a run that the strided-loop planner verified to
    /// be contiguous for every operand.
    fn step_leading(&mut self);

    /// Read `out.len()` consecutive elements of a contiguous run and advance
    /// past them.
    #[inline]
    fn load_packet(&mut self, out: &mut [Self::Item]) {
        for slot in out.iter_mut() {
            *slot = self.get();
            self.step_leading();
        }
    }
}

/// Write access at the cursor position (destinations only).
pub trait StepperMut: Stepper {
    /// Overwrite the value at the current position.
    fn set(&mut self, value: Self::Item);

    /// Write `values` to consecutive elements of a contiguous run and advance
    /// past them.
    #[inline]
    fn store_packet(&mut self, values: &[Self::Item]) {
        for &v in values {
            self.set(v);
            self.step_leading();
        }
    }
}

/// Advance `stepper` to the next position in row-major order.
///
/// Starting from the trailing dimension, increments `index`. A dimension that
/// reaches its extent is wrapped to 0 (with [`Cursor::reset`]) and the carry
/// moves to the next more significant dimension. When the carry passes the
/// leading dimension the stepper is moved to the end; `index[0]` then equals
/// `shape[0]`.
pub fn increment_stepper<C: Cursor + ?Sized>(stepper: &mut C, index: &mut [usize], shape: &[usize]) {
    let mut i = index.len();
    while i != 0 {
        i -= 1;
        index[i] += 1;
        if index[i] != shape[i] {
            stepper.step(i, 1);
            return;
        } else if i != 0 {
            index[i] = 0;
            stepper.reset(i);
        }
    }
    stepper.to_end();
}

/// Row-major iterator over a stepper, broadcast to a fixed shape.
pub struct StepperIter<S> {
    stepper: S,
    index: SVec<usize>,
    shape: SVec<usize>,
    remaining: usize,
}

impl<S: Stepper> StepperIter<S> {
    /// Iterate `stepper`, which must have been created for `shape`.
    pub fn new(stepper: S, shape: &[usize]) -> Self {
        Self {
            stepper,
            index: SVec::from_elem(0, shape.len()),
            shape: SVec::from_slice(shape),
            remaining: shape.iter().product(),
        }
    }

    /// Multi-index of the next element to be returned.
    pub fn index(&self) -> &[usize] {
        &self.index
    }
}

impl<S: Stepper> Iterator for StepperIter<S> {
    type Item = S::Item;

    #[inline]
    fn next(&mut self) -> Option<S::Item> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.stepper.get();
        self.remaining -= 1;
        increment_stepper(&mut self.stepper, &mut self.index, &self.shape);
        Some(value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<S: Stepper> ExactSizeIterator for StepperIter<S> {}

impl<S: Stepper> FusedIterator for StepperIter<S> {}

impl<S> std::fmt::Debug for StepperIter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepperIter")
            .field("index", &self.index)
            .field("shape", &self.shape)
            .field("remaining", &self.remaining)
            .finish()
    }
}
