//! Expressions computed from the multi-index, and the builders based on them.

use std::marker::PhantomData;

use num_traits::{Float, Num, NumCast, One, Zero};

use crate::element::Element;
use crate::expression::Expression;
use crate::layout::{unravel_index, Layout};
use crate::stepper::{Cursor, SVec, Stepper};
use crate::{ExprError, Result};

/// An expression whose element at `index` is `f(index)`.
///
/// Nothing is stored; every access calls the function. The index passed to
/// `f` always has exactly the rank of the expression's own shape.
#[derive(Clone)]
pub struct IndexFunction<F, R> {
    shape: Vec<usize>,
    f: F,
    _marker: PhantomData<fn() -> R>,
}

impl<F, R> IndexFunction<F, R>
where
    F: Fn(&[usize]) -> R,
    R: Element,
{
    pub fn new(shape: &[usize], f: F) -> Self {
        Self {
            shape: shape.to_vec(),
            f,
            _marker: PhantomData,
        }
    }
}

impl<F, R> std::fmt::Debug for IndexFunction<F, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexFunction").field("shape", &self.shape).finish()
    }
}

/// Stepper of an [`IndexFunction`]: a multi-index in the function's own rank.
pub struct IndexFunctionStepper<'a, F, R> {
    f: &'a F,
    shape: &'a [usize],
    index: SVec<usize>,
    /// Own rank minus broadcast rank.
    shift: isize,
    _marker: PhantomData<fn() -> R>,
}

impl<F, R> IndexFunctionStepper<'_, F, R> {
    /// Own dimension addressed by broadcast dimension `dim`, if it moves.
    #[inline]
    fn own_dim(&self, dim: usize) -> Option<usize> {
        let k = dim as isize + self.shift;
        if k < 0 {
            return None;
        }
        let k = k as usize;
        (k < self.shape.len() && self.shape[k] != 1).then_some(k)
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }
}

impl<F, R> std::fmt::Debug for IndexFunctionStepper<'_, F, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexFunctionStepper")
            .field("shape", &self.shape)
            .field("index", &self.index)
            .field("shift", &self.shift)
            .finish()
    }
}

impl<F, R> Cursor for IndexFunctionStepper<'_, F, R> {
    #[inline]
    fn step(&mut self, dim: usize, n: usize) {
        if let Some(k) = self.own_dim(dim) {
            self.index[k] += n;
        }
    }

    #[inline]
    fn step_back(&mut self, dim: usize, n: usize) {
        if let Some(k) = self.own_dim(dim) {
            self.index[k] -= n;
        }
    }

    #[inline]
    fn reset(&mut self, dim: usize) {
        if let Some(k) = self.own_dim(dim) {
            self.index[k] = 0;
        }
    }

    fn to_begin(&mut self) {
        self.index.iter_mut().for_each(|i| *i = 0);
    }

    fn to_end(&mut self) {
        self.index.copy_from_slice(self.shape);
    }
}

impl<F, R> Stepper for IndexFunctionStepper<'_, F, R>
where
    F: Fn(&[usize]) -> R,
    R: Element,
{
    type Item = R;

    #[inline]
    fn get(&self) -> R {
        (self.f)(&self.index)
    }

    #[inline]
    fn step_leading(&mut self) {
        if let Some(last) = self.index.last_mut() {
            *last += 1;
        }
    }
}

impl<F, R> Expression for IndexFunction<F, R>
where
    F: Fn(&[usize]) -> R,
    R: Element,
{
    type Item = R;
    type Stepper<'s> = IndexFunctionStepper<'s, F, R> where Self: 's;

    const STRIDED_LOOP: bool = false;

    #[inline]
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    fn get(&self, index: &[usize]) -> R {
        (self.f)(index)
    }

    fn stepper_begin(&self, shape: &[usize]) -> Self::Stepper<'_> {
        IndexFunctionStepper {
            f: &self.f,
            shape: &self.shape,
            index: SVec::from_elem(0, self.shape.len()),
            shift: self.shape.len() as isize - shape.len() as isize,
            _marker: PhantomData,
        }
    }

    fn data_element(&self, i: usize) -> R {
        let mut index: SVec<usize> = SVec::from_elem(0, self.shape.len());
        unravel_index(i, &self.shape, Layout::RowMajor, &mut index);
        (self.f)(&index)
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Lazy expression of `shape` with elements `f(index)`.
pub fn from_indices<F, R>(shape: &[usize], f: F) -> IndexFunction<F, R>
where
    F: Fn(&[usize]) -> R,
    R: Element,
{
    IndexFunction::new(shape, f)
}

/// All elements equal to `value`.
pub fn full<T: Element>(shape: &[usize], value: T) -> IndexFunction<impl Fn(&[usize]) -> T, T> {
    IndexFunction::new(shape, move |_: &[usize]| value)
}

pub fn zeros<T: Element + Zero>(shape: &[usize]) -> IndexFunction<impl Fn(&[usize]) -> T, T> {
    full(shape, T::zero())
}

pub fn ones<T: Element + One>(shape: &[usize]) -> IndexFunction<impl Fn(&[usize]) -> T, T> {
    full(shape, T::one())
}

/// `start, start + step, ...` up to but excluding `stop`.
///
/// # Errors
/// Returns `ZeroStep` if `step` is zero.
pub fn arange<T>(start: T, stop: T, step: T) -> Result<IndexFunction<impl Fn(&[usize]) -> T, T>>
where
    T: Element + Num + NumCast + PartialOrd,
{
    if step == T::zero() {
        return Err(ExprError::ZeroStep { axis: 0 });
    }
    let count = if (step > T::zero()) != (stop > start) {
        0
    } else {
        // f64 span: unsigned endpoints are never subtracted
        let span = stop.to_f64().unwrap_or(0.0) - start.to_f64().unwrap_or(0.0);
        let stride = step.to_f64().unwrap_or(1.0);
        (span / stride).ceil().max(0.0) as usize
    };
    Ok(IndexFunction::new(&[count], move |i: &[usize]| {
        start + step * T::from(i[0]).unwrap_or_else(T::zero)
    }))
}

/// `num` evenly spaced values over `[start, stop]`, or `[start, stop)` when
/// `endpoint` is false.
pub fn linspace<T>(start: T, stop: T, num: usize, endpoint: bool) -> IndexFunction<impl Fn(&[usize]) -> T, T>
where
    T: Element + Float,
{
    let intervals = if endpoint { num.saturating_sub(1) } else { num };
    let step = if intervals == 0 {
        T::zero()
    } else {
        (stop - start) / T::from(intervals).unwrap_or_else(T::one)
    };
    IndexFunction::new(&[num], move |i: &[usize]| {
        if endpoint && num > 1 && i[0] == num - 1 {
            stop
        } else {
            start + step * T::from(i[0]).unwrap_or_else(T::zero)
        }
    })
}

/// `n × n` matrix with ones on the `k`-th diagonal.
///
/// `k > 0` selects a diagonal above the main one, `k < 0` one below.
pub fn eye<T: Element + Zero + One>(n: usize, k: isize) -> IndexFunction<impl Fn(&[usize]) -> T, T> {
    IndexFunction::new(&[n, n], move |i: &[usize]| {
        if i[1] as isize - i[0] as isize == k {
            T::one()
        } else {
            T::zero()
        }
    })
}
