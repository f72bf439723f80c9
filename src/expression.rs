//! The expression contract consumed by the assignment engine.
//!
//! Capabilities are expressed structurally: every expression exposes a shape,
//! a stepper factory and element access; storage-backed expressions also
//! report a layout and strides. Packet eligibility is the associated constant
//! [`Expression::STRIDED_LOOP`], fixed per type.

use crate::broadcast;
use crate::element::Element;
use crate::layout::Layout;
use crate::stepper::{Cursor, Stepper, StepperIter, StepperMut};
use crate::{ExprError, Result};

/// A lazily evaluated array-like value.
pub trait Expression {
    type Item: Element;

    /// Cursor type over this expression.
    type Stepper<'s>: Stepper<Item = Self::Item>
    where
        Self: 's;

    /// Steppers support packet loads over runs the planner proves contiguous.
    ///
    /// For compositions this is the conjunction over all operands and the
    /// function's own batched-apply capability.
    const STRIDED_LOOP: bool;

    fn shape(&self) -> &[usize];

    #[inline]
    fn dimension(&self) -> usize {
        self.shape().len()
    }

    #[inline]
    fn size(&self) -> usize {
        self.shape().iter().product()
    }

    /// Element at `index`, which has exactly `dimension()` components.
    fn get(&self, index: &[usize]) -> Self::Item;

    /// Stepper positioned on the first element of a traversal of `shape`.
    ///
    /// `shape` must be a broadcast of `self.shape()`.
    fn stepper_begin(&self, shape: &[usize]) -> Self::Stepper<'_>;

    /// Stepper positioned one past the last element of a traversal of `shape`.
    fn stepper_end(&self, shape: &[usize]) -> Self::Stepper<'_> {
        let mut stepper = self.stepper_begin(shape);
        stepper.to_end();
        stepper
    }

    /// Broadcast this expression's shape into `shape`.
    ///
    /// Returns whether no operand needed expansion. Compositions override this
    /// to fold over their operands.
    fn broadcast_shape(&self, shape: &mut Vec<usize>) -> Result<bool> {
        broadcast::broadcast_shape(self.shape(), shape)
    }

    /// Storage order, `Layout::Any` when not backed by storage.
    fn layout(&self) -> Layout {
        Layout::Any
    }

    /// Element strides, for storage-backed expressions.
    fn strides(&self) -> Option<&[isize]> {
        None
    }

    /// Whether the linear storage order of this expression maps one-to-one
    /// onto a contiguous destination with the given layout and shape.
    fn is_trivial_broadcast(&self, _layout: Layout, _shape: &[usize]) -> bool {
        false
    }

    /// Element at linear position `i` of storage order.
    ///
    /// Storage order is `self.layout()` for contiguous expressions and
    /// row-major otherwise.
    fn data_element(&self, i: usize) -> Self::Item;

    /// Read `out.len()` elements starting at linear position `start`.
    fn load_elements(&self, start: usize, out: &mut [Self::Item]) {
        for (k, slot) in out.iter_mut().enumerate() {
            *slot = self.data_element(start + k);
        }
    }

    /// Report the shape and strides of every storage-backed leaf.
    ///
    /// Scalars report nothing; compositions recurse into their operands.
    fn visit_strides(&self, f: &mut dyn FnMut(&[usize], &[isize])) {
        if let Some(strides) = self.strides() {
            f(self.shape(), strides);
        }
    }

    /// Iterate the elements in row-major order.
    fn iter(&self) -> StepperIter<Self::Stepper<'_>> {
        StepperIter::new(self.stepper_begin(self.shape()), self.shape())
    }

    /// Iterate the elements broadcast to `shape`, in row-major order.
    fn iter_broadcast(&self, shape: &[usize]) -> Result<StepperIter<Self::Stepper<'_>>> {
        if !broadcast::broadcastable(self.shape(), shape) {
            return Err(ExprError::Broadcast {
                from: self.shape().to_vec(),
                to: shape.to_vec(),
            });
        }
        Ok(StepperIter::new(self.stepper_begin(shape), shape))
    }
}

/// An expression that can be written through.
pub trait ExpressionMut: Expression {
    type StepperMut<'s>: StepperMut<Item = Self::Item>
    where
        Self: 's;

    /// Writing stepper over a traversal of `shape`.
    fn stepper_begin_mut(&mut self, shape: &[usize]) -> Self::StepperMut<'_>;

    /// The whole storage as one slice in `self.layout()` order, when the
    /// expression is contiguous.
    fn contiguous_data_mut(&mut self) -> Option<&mut [Self::Item]> {
        None
    }
}

/// An owning destination that can be reallocated by the engine.
pub trait Container: ExpressionMut + Sized {
    /// Reshape to `shape`, reallocating storage filled with defaults.
    fn resize(&mut self, shape: &[usize]);

    /// A fresh default-filled container of `shape` with the same layout.
    fn temporary(&self, shape: &[usize]) -> Self;

    /// Replace the contents with a fully evaluated temporary.
    fn assign_temporary(&mut self, tmp: Self) {
        *self = tmp;
    }
}

// ============================================================================
// Borrowed operands
// ============================================================================

impl<E: Expression + ?Sized> Expression for &E {
    type Item = E::Item;
    type Stepper<'s> = E::Stepper<'s> where Self: 's;

    const STRIDED_LOOP: bool = E::STRIDED_LOOP;

    #[inline]
    fn shape(&self) -> &[usize] {
        (**self).shape()
    }

    #[inline]
    fn get(&self, index: &[usize]) -> E::Item {
        (**self).get(index)
    }

    #[inline]
    fn stepper_begin(&self, shape: &[usize]) -> Self::Stepper<'_> {
        (**self).stepper_begin(shape)
    }

    fn broadcast_shape(&self, shape: &mut Vec<usize>) -> Result<bool> {
        (**self).broadcast_shape(shape)
    }

    fn layout(&self) -> Layout {
        (**self).layout()
    }

    fn strides(&self) -> Option<&[isize]> {
        (**self).strides()
    }

    fn is_trivial_broadcast(&self, layout: Layout, shape: &[usize]) -> bool {
        (**self).is_trivial_broadcast(layout, shape)
    }

    #[inline]
    fn data_element(&self, i: usize) -> E::Item {
        (**self).data_element(i)
    }

    #[inline]
    fn load_elements(&self, start: usize, out: &mut [E::Item]) {
        (**self).load_elements(start, out)
    }

    fn visit_strides(&self, f: &mut dyn FnMut(&[usize], &[isize])) {
        (**self).visit_strides(f)
    }
}
