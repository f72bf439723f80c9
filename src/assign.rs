//! The assignment engine.
//!
//! Assigning an expression into a destination runs in two phases:
//!
//! 1. **Shape phase**: the source shape is broadcast against the destination
//!    shape. A resizable destination is reallocated when the result is larger;
//!    otherwise the source must broadcast into the destination as it is.
//!    Shape errors are reported before anything is written.
//! 2. **Traversal phase**: one of three strategies writes every destination
//!    element, with the element conversion of [`NumericCast`] applied
//!    uniformly:
//!    - [`Strategy::Trivial`]: both sides share a contiguous layout and shape;
//!      a linear walk over storage in packets.
//!    - [`Strategy::StridedLoop`]: the trailing dimensions form a contiguous
//!      run in every operand; packets over the inner run, a multi-index over
//!      the outer dimensions.
//!    - [`Strategy::Generic`]: lockstep steppers advanced by
//!      [`increment_stepper`], one element per step.

use std::any::TypeId;

use crate::array::Array;
use crate::broadcast::broadcastable;
use crate::element::{Element, NumericCast};
use crate::expression::{Container, Expression, ExpressionMut};
use crate::function::zip_map;
use crate::planner::loop_sizes;
use crate::simd;
use crate::stepper::{increment_stepper, Cursor, SVec, Stepper, StepperMut};
use crate::{ExprError, Result, MAX_LANES, SIMD_WIDTH_BYTES};

/// Traversal strategy of an assignment, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Linear copy over contiguous storage.
    Trivial,
    /// Packet copy over contiguous inner runs.
    StridedLoop,
    /// Element-by-element lockstep stepping.
    Generic,
}

// ============================================================================
// Entry points
// ============================================================================

/// Assign `src` into `dest`, resizing `dest` if the source is larger.
///
/// The working shape starts from the destination shape and adopts every
/// source extent that the destination holds as 1 (or lacks). If the result
/// has a higher rank or a larger extent, `dest` is replaced by a freshly
/// evaluated temporary. Otherwise `src` is broadcast into `dest` in place.
///
/// # Errors
/// `ShapeMismatch` if the shapes cannot be broadcast together. `dest` is
/// unchanged on error.
///
/// # Example
/// ```
/// use strided_expr::{assign, Array, Layout};
///
/// let row = Array::from_vec(&[3], vec![1, 2, 3], Layout::RowMajor).unwrap();
/// let mut out = Array::<i64>::new(&[2, 3]);
/// assign(&mut out, &row).unwrap();
/// assert_eq!(out.data(), &[1, 2, 3, 1, 2, 3]);
/// ```
pub fn assign<D, S>(dest: &mut D, src: &S) -> Result<()>
where
    D: Container,
    S: Expression + ?Sized,
    S::Item: NumericCast<D::Item>,
{
    let mut shape = dest.shape().to_vec();
    let trivial = src.broadcast_shape(&mut shape)?;

    let grows = shape.len() > dest.dimension()
        || shape.iter().zip(dest.shape().iter()).any(|(s, d)| s > d);
    if grows {
        let mut tmp = dest.temporary(&shape);
        let trivial = trivial || src.shape() == shape.as_slice();
        assign_data(&mut tmp, src, trivial);
        dest.assign_temporary(tmp);
        return Ok(());
    }

    assert_compatible_shape(dest, src)?;
    assign_data(dest, src, trivial);
    Ok(())
}

/// Assign `src` into the fixed shape of `dest`.
///
/// # Errors
/// `Broadcast` if `src` cannot be broadcast into `dest.shape()`. Nothing is
/// written in that case.
pub fn assign_into<D, S>(dest: &mut D, src: &S) -> Result<()>
where
    D: ExpressionMut + ?Sized,
    S: Expression + ?Sized,
    S::Item: NumericCast<D::Item>,
{
    let trivial = fixed_shape_trivial(dest.shape(), src)?;
    assign_data(dest, src, trivial);
    Ok(())
}

/// Assign `src` into the fixed shape of `dest` with a given strategy.
///
/// When `strategy` does not apply, the next lower one that does is used.
/// Returns the strategy that ran.
pub fn assign_with<D, S>(dest: &mut D, src: &S, strategy: Strategy) -> Result<Strategy>
where
    D: ExpressionMut + ?Sized,
    S: Expression + ?Sized,
    S::Item: NumericCast<D::Item>,
{
    let trivial = fixed_shape_trivial(dest.shape(), src)?;
    let strategy = match strategy {
        Strategy::Trivial if !trivial => Strategy::StridedLoop,
        s => s,
    };
    Ok(execute(dest, src, strategy))
}

/// Evaluate `src` into a temporary first, then assign the temporary.
///
/// Safe when `src` reads storage that `dest` also owns.
pub fn noalias_assign<D, S>(dest: &mut D, src: &S) -> Result<()>
where
    D: Container,
    S: Expression + ?Sized,
    S::Item: NumericCast<S::Item> + NumericCast<D::Item>,
{
    let tmp: Array<S::Item> = Array::from_expr(src);
    assign(dest, &tmp)
}

/// `dest[i] = f(dest[i], src[i])` for every element, broadcasting `src`.
///
/// The combined values are evaluated before `dest` is touched, so `dest` may
/// grow to the broadcast shape.
pub fn computed_assign<D, S, F>(dest: &mut D, src: &S, f: F) -> Result<()>
where
    D: Container,
    S: Expression + ?Sized,
    D::Item: NumericCast<D::Item>,
    F: Fn(D::Item, S::Item) -> D::Item,
{
    let tmp: Array<D::Item> = Array::from_expr(&zip_map(&*dest, src, f)?);
    assign(dest, &tmp)
}

/// `dest[i] = f(dest[i], value)` for every element, in place.
pub fn scalar_computed_assign<D, T, F>(dest: &mut D, value: T, f: F)
where
    D: ExpressionMut + ?Sized,
    T: Copy,
    F: Fn(D::Item, T) -> D::Item,
{
    if let Some(data) = dest.contiguous_data_mut() {
        for x in data.iter_mut() {
            *x = f(*x, value);
        }
        return;
    }
    let shape: SVec<usize> = SVec::from_slice(dest.shape());
    let size = dest.size();
    let mut stepper = dest.stepper_begin_mut(&shape);
    let mut index: SVec<usize> = SVec::from_elem(0, shape.len());
    for _ in 0..size {
        let v = stepper.get();
        stepper.set(f(v, value));
        increment_stepper(&mut stepper, &mut index, &shape);
    }
}

/// Check that `src` can be broadcast into the current shape of `dest`.
pub fn assert_compatible_shape<D, S>(dest: &D, src: &S) -> Result<()>
where
    D: Expression + ?Sized,
    S: Expression + ?Sized,
{
    if broadcastable(src.shape(), dest.shape()) {
        Ok(())
    } else {
        Err(ExprError::Broadcast {
            from: src.shape().to_vec(),
            to: dest.shape().to_vec(),
        })
    }
}

/// Evaluate an expression into a row-major array.
pub fn eval<E>(expr: &E) -> Array<E::Item>
where
    E: Expression + ?Sized,
    E::Item: NumericCast<E::Item>,
{
    Array::from_expr(expr)
}

fn fixed_shape_trivial<S: Expression + ?Sized>(shape: &[usize], src: &S) -> Result<bool> {
    if !broadcastable(src.shape(), shape) {
        return Err(ExprError::Broadcast {
            from: src.shape().to_vec(),
            to: shape.to_vec(),
        });
    }
    let mut working = shape.to_vec();
    src.broadcast_shape(&mut working)
}

// ============================================================================
// Strategy selection
// ============================================================================

/// Whether the types of `D` and `S` allow packet execution along strided
/// runs. Fixed per type pair.
#[inline]
fn strided_loop_types<D, S>() -> bool
where
    D: Expression + ?Sized,
    S: Expression + ?Sized,
{
    D::STRIDED_LOOP
        && S::STRIDED_LOOP
        && TypeId::of::<D::Item>() == TypeId::of::<S::Item>()
        && <D::Item as Element>::LANES > 1
}

/// The strategy [`assign_data`] would run for this pair.
///
/// `trivial` is the broadcast triviality from the shape phase.
pub fn select_strategy<D, S>(dest: &D, src: &S, trivial: bool) -> Strategy
where
    D: ExpressionMut + ?Sized,
    S: Expression + ?Sized,
{
    let layout = dest.layout();
    if trivial && layout.is_contiguous() && src.is_trivial_broadcast(layout, dest.shape()) {
        return Strategy::Trivial;
    }
    if strided_loop_types::<D, S>() {
        if let Some(plan) = loop_sizes(dest, src) {
            if plan.is_applicable(dest.dimension()) {
                return Strategy::StridedLoop;
            }
        }
    }
    Strategy::Generic
}

/// Write `src` into `dest`, whose shape is already the broadcast shape.
///
/// Returns the strategy that ran.
pub fn assign_data<D, S>(dest: &mut D, src: &S, trivial: bool) -> Strategy
where
    D: ExpressionMut + ?Sized,
    S: Expression + ?Sized,
    S::Item: NumericCast<D::Item>,
{
    let strategy = select_strategy(&*dest, src, trivial);
    execute(dest, src, strategy)
}

fn execute<D, S>(dest: &mut D, src: &S, strategy: Strategy) -> Strategy
where
    D: ExpressionMut + ?Sized,
    S: Expression + ?Sized,
    S::Item: NumericCast<D::Item>,
{
    if strategy == Strategy::Trivial && trivial_assign(dest, src) {
        return Strategy::Trivial;
    }
    if strategy != Strategy::Generic && strided_assign(dest, src) {
        return Strategy::StridedLoop;
    }
    generic_assign(dest, src);
    Strategy::Generic
}

// ============================================================================
// Trivial strategy
// ============================================================================

fn trivial_assign<D, S>(dest: &mut D, src: &S) -> bool
where
    D: ExpressionMut + ?Sized,
    S: Expression + ?Sized,
    S::Item: NumericCast<D::Item>,
{
    let layout = dest.layout();
    if !layout.is_contiguous() || !src.is_trivial_broadcast(layout, dest.shape()) {
        return false;
    }
    let size = dest.size();
    let Some(data) = dest.contiguous_data_mut() else {
        return false;
    };
    assert_eq!(data.len(), size, "trivial assignment over a non-contiguous destination");

    let lanes = <D::Item as Element>::LANES;
    if lanes > 1 && TypeId::of::<D::Item>() == TypeId::of::<S::Item>() {
        simd::dispatch_if_large(size, || copy_packets(data, src, lanes));
    } else {
        for (i, d) in data.iter_mut().enumerate() {
            *d = src.data_element(i).cast();
        }
    }
    true
}

/// Unaligned head element-wise, aligned body in packets, tail element-wise.
#[inline(always)]
fn copy_packets<T, S>(data: &mut [T], src: &S, lanes: usize)
where
    T: Element,
    S: Expression + ?Sized,
    S::Item: NumericCast<T>,
{
    let n = data.len();
    let head = data.as_ptr().align_offset(SIMD_WIDTH_BYTES).min(n);
    for (i, d) in data[..head].iter_mut().enumerate() {
        *d = src.data_element(i).cast();
    }

    let mut buf = [<S::Item as Default>::default(); MAX_LANES];
    let mut i = head;
    while i + lanes <= n {
        src.load_elements(i, &mut buf[..lanes]);
        for (d, &s) in data[i..i + lanes].iter_mut().zip(buf[..lanes].iter()) {
            *d = s.cast();
        }
        i += lanes;
    }

    for (k, d) in data[i..].iter_mut().enumerate() {
        *d = src.data_element(i + k).cast();
    }
}

// ============================================================================
// Strided-loop strategy
// ============================================================================

fn strided_assign<D, S>(dest: &mut D, src: &S) -> bool
where
    D: ExpressionMut + ?Sized,
    S: Expression + ?Sized,
    S::Item: NumericCast<D::Item>,
{
    if !strided_loop_types::<D, S>() {
        return false;
    }
    let Some(plan) = loop_sizes(&*dest, src) else {
        return false;
    };
    if !plan.is_applicable(dest.dimension()) {
        return false;
    }

    let shape: SVec<usize> = SVec::from_slice(dest.shape());
    let size = dest.size();
    let lanes = <D::Item as Element>::LANES;
    let packets = plan.inner_loop_size / lanes;
    let rest = plan.inner_loop_size % lanes;

    let mut rhs = src.stepper_begin(&shape);
    let mut lhs = dest.stepper_begin_mut(&shape);
    let outer = &shape[..plan.cut];
    let mut index: SVec<usize> = SVec::from_elem(0, plan.cut);

    simd::dispatch_if_large(size, || {
        let mut src_buf = [<S::Item as Default>::default(); MAX_LANES];
        let mut dst_buf = [<D::Item as Default>::default(); MAX_LANES];
        for _ in 0..plan.outer_loop_size {
            for _ in 0..packets {
                rhs.load_packet(&mut src_buf[..lanes]);
                for (d, &s) in dst_buf[..lanes].iter_mut().zip(src_buf[..lanes].iter()) {
                    *d = s.cast();
                }
                lhs.store_packet(&dst_buf[..lanes]);
            }
            for _ in 0..rest {
                lhs.set(rhs.get().cast());
                lhs.step_leading();
                rhs.step_leading();
            }

            next_outer_index(&mut index, outer);
            lhs.to_begin();
            rhs.to_begin();
            for (dim, &i) in index.iter().enumerate() {
                if i != 0 {
                    lhs.step(dim, i);
                    rhs.step(dim, i);
                }
            }
        }
    });
    true
}

/// Row-major increment of `index` within `shape`, wrapping to all zeros.
#[inline]
fn next_outer_index(index: &mut [usize], shape: &[usize]) {
    for d in (0..index.len()).rev() {
        index[d] += 1;
        if index[d] < shape[d] {
            return;
        }
        index[d] = 0;
    }
}

// ============================================================================
// Generic strategy
// ============================================================================

/// Both sides of an assignment, moved as one cursor.
struct DataAssigner<L, R> {
    lhs: L,
    rhs: R,
}

impl<L: Cursor, R: Cursor> Cursor for DataAssigner<L, R> {
    #[inline]
    fn step(&mut self, dim: usize, n: usize) {
        self.lhs.step(dim, n);
        self.rhs.step(dim, n);
    }

    #[inline]
    fn step_back(&mut self, dim: usize, n: usize) {
        self.lhs.step_back(dim, n);
        self.rhs.step_back(dim, n);
    }

    #[inline]
    fn reset(&mut self, dim: usize) {
        self.lhs.reset(dim);
        self.rhs.reset(dim);
    }

    #[inline]
    fn to_begin(&mut self) {
        self.lhs.to_begin();
        self.rhs.to_begin();
    }

    #[inline]
    fn to_end(&mut self) {
        self.lhs.to_end();
        self.rhs.to_end();
    }
}

fn generic_assign<D, S>(dest: &mut D, src: &S)
where
    D: ExpressionMut + ?Sized,
    S: Expression + ?Sized,
    S::Item: NumericCast<D::Item>,
{
    let shape: SVec<usize> = SVec::from_slice(dest.shape());
    let size = dest.size();
    let mut assigner = DataAssigner {
        lhs: dest.stepper_begin_mut(&shape),
        rhs: src.stepper_begin(&shape),
    };
    let mut index: SVec<usize> = SVec::from_elem(0, shape.len());
    for _ in 0..size {
        assigner.lhs.set(assigner.rhs.get().cast());
        increment_stepper(&mut assigner, &mut index, &shape);
    }
}
