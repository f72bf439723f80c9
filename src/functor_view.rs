//! Lazy per-element transforms of another expression.
//!
//! A [`FunctorView`] reads through a transform without materializing
//! anything. A [`FunctorViewMut`] additionally writes through a
//! [`ProxyFunctor`], which knows how to store a transformed value back into
//! the underlying element (for example the imaginary part of a complex
//! number).

use std::marker::PhantomData;

use num_complex::Complex;
use num_traits::{Num, Zero};

use crate::element::{Element, NumericCast};
use crate::expression::{Expression, ExpressionMut};
use crate::function::Lambda;
use crate::layout::Layout;
use crate::stepper::{Cursor, Stepper, StepperMut};
use crate::{Result, MAX_LANES};

// ============================================================================
// Functors
// ============================================================================

/// A unary transform applied on read.
pub trait ViewFunctor<In> {
    type Output: Element;

    /// Whether the transform can be applied to whole packets.
    const BATCHED: bool = false;

    fn apply(&self, value: In) -> Self::Output;
}

/// A transform that can also write a value back into the source element.
pub trait ProxyFunctor<In>: ViewFunctor<In> {
    fn store(&self, slot: &mut In, value: Self::Output);
}

/// Real part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Real;

/// Imaginary part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Imag;

/// Complex conjugate (identity on real numbers).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Conj;

/// Numeric conversion to `T`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cast<T>(PhantomData<T>);

impl<T: Element + Num> ViewFunctor<Complex<T>> for Real {
    type Output = T;
    const BATCHED: bool = true;

    #[inline(always)]
    fn apply(&self, value: Complex<T>) -> T {
        value.re
    }
}

impl<T: Element + Num> ProxyFunctor<Complex<T>> for Real {
    #[inline(always)]
    fn store(&self, slot: &mut Complex<T>, value: T) {
        slot.re = value;
    }
}

impl<T: Element + Num> ViewFunctor<Complex<T>> for Imag {
    type Output = T;
    const BATCHED: bool = true;

    #[inline(always)]
    fn apply(&self, value: Complex<T>) -> T {
        value.im
    }
}

impl<T: Element + Num> ProxyFunctor<Complex<T>> for Imag {
    #[inline(always)]
    fn store(&self, slot: &mut Complex<T>, value: T) {
        slot.im = value;
    }
}

impl<T: Element + Num + std::ops::Neg<Output = T>> ViewFunctor<Complex<T>> for Conj {
    type Output = Complex<T>;
    const BATCHED: bool = true;

    #[inline(always)]
    fn apply(&self, value: Complex<T>) -> Complex<T> {
        value.conj()
    }
}

macro_rules! impl_real_functors {
    ($($t:ty),*) => {
        $(
            impl ViewFunctor<$t> for Real {
                type Output = $t;
                const BATCHED: bool = true;

                #[inline(always)]
                fn apply(&self, value: $t) -> $t {
                    value
                }
            }

            impl ProxyFunctor<$t> for Real {
                #[inline(always)]
                fn store(&self, slot: &mut $t, value: $t) {
                    *slot = value;
                }
            }

            impl ViewFunctor<$t> for Imag {
                type Output = $t;
                const BATCHED: bool = true;

                #[inline(always)]
                fn apply(&self, _value: $t) -> $t {
                    <$t>::zero()
                }
            }

            impl ViewFunctor<$t> for Conj {
                type Output = $t;
                const BATCHED: bool = true;

                #[inline(always)]
                fn apply(&self, value: $t) -> $t {
                    value
                }
            }
        )*
    };
}

impl_real_functors!(f32, f64);

impl<In, T> ViewFunctor<In> for Cast<T>
where
    In: NumericCast<T>,
    T: Element,
{
    type Output = T;
    const BATCHED: bool = true;

    #[inline(always)]
    fn apply(&self, value: In) -> T {
        value.cast()
    }
}

impl<In, R, Func> ViewFunctor<In> for Lambda<Func>
where
    Func: Fn(In) -> R,
    R: Element,
{
    type Output = R;

    #[inline(always)]
    fn apply(&self, value: In) -> R {
        (self.0)(value)
    }
}

// ============================================================================
// Steppers
// ============================================================================

/// Stepper of a [`FunctorView`].
#[derive(Debug, Clone)]
pub struct FunctorStepper<'a, S, F> {
    inner: S,
    f: &'a F,
}

/// Writing stepper of a [`FunctorViewMut`].
#[derive(Debug)]
pub struct FunctorStepperMut<'a, S, F> {
    inner: S,
    f: &'a F,
}

macro_rules! forward_cursor {
    ($name:ident) => {
        impl<S: Cursor, F> Cursor for $name<'_, S, F> {
            #[inline]
            fn step(&mut self, dim: usize, n: usize) {
                self.inner.step(dim, n);
            }

            #[inline]
            fn step_back(&mut self, dim: usize, n: usize) {
                self.inner.step_back(dim, n);
            }

            #[inline]
            fn reset(&mut self, dim: usize) {
                self.inner.reset(dim);
            }

            #[inline]
            fn to_begin(&mut self) {
                self.inner.to_begin();
            }

            #[inline]
            fn to_end(&mut self) {
                self.inner.to_end();
            }
        }

        impl<S, F> Stepper for $name<'_, S, F>
        where
            S: Stepper,
            F: ViewFunctor<S::Item>,
        {
            type Item = F::Output;

            #[inline]
            fn get(&self) -> F::Output {
                self.f.apply(self.inner.get())
            }

            #[inline]
            fn step_leading(&mut self) {
                self.inner.step_leading();
            }

            #[inline]
            fn load_packet(&mut self, out: &mut [F::Output]) {
                debug_assert!(out.len() <= MAX_LANES);
                let mut buf = [<S::Item as Default>::default(); MAX_LANES];
                self.inner.load_packet(&mut buf[..out.len()]);
                for (slot, &v) in out.iter_mut().zip(buf.iter()) {
                    *slot = self.f.apply(v);
                }
            }
        }
    };
}

forward_cursor!(FunctorStepper);
forward_cursor!(FunctorStepperMut);

impl<S, F> StepperMut for FunctorStepperMut<'_, S, F>
where
    S: StepperMut,
    F: ProxyFunctor<S::Item>,
{
    #[inline]
    fn set(&mut self, value: Self::Item) {
        let mut current = self.inner.get();
        self.f.store(&mut current, value);
        self.inner.set(current);
    }
}

// ============================================================================
// Views
// ============================================================================

/// Read-only lazy transform of `E`.
#[derive(Debug, Clone)]
pub struct FunctorView<E, F> {
    e: E,
    f: F,
}

impl<E: Expression, F: ViewFunctor<E::Item>> FunctorView<E, F> {
    pub fn new(e: E, f: F) -> Self {
        Self { e, f }
    }

    pub fn inner(&self) -> &E {
        &self.e
    }
}

impl<E, F> Expression for FunctorView<E, F>
where
    E: Expression,
    F: ViewFunctor<E::Item>,
{
    type Item = F::Output;
    type Stepper<'s> = FunctorStepper<'s, E::Stepper<'s>, F> where Self: 's;

    const STRIDED_LOOP: bool = E::STRIDED_LOOP && F::BATCHED;

    #[inline]
    fn shape(&self) -> &[usize] {
        self.e.shape()
    }

    #[inline]
    fn get(&self, index: &[usize]) -> F::Output {
        self.f.apply(self.e.get(index))
    }

    fn stepper_begin(&self, shape: &[usize]) -> Self::Stepper<'_> {
        FunctorStepper {
            inner: self.e.stepper_begin(shape),
            f: &self.f,
        }
    }

    fn broadcast_shape(&self, shape: &mut Vec<usize>) -> Result<bool> {
        self.e.broadcast_shape(shape)
    }

    fn layout(&self) -> Layout {
        self.e.layout()
    }

    fn strides(&self) -> Option<&[isize]> {
        self.e.strides()
    }

    fn is_trivial_broadcast(&self, layout: Layout, shape: &[usize]) -> bool {
        self.e.is_trivial_broadcast(layout, shape)
    }

    #[inline]
    fn data_element(&self, i: usize) -> F::Output {
        self.f.apply(self.e.data_element(i))
    }

    fn visit_strides(&self, f: &mut dyn FnMut(&[usize], &[isize])) {
        self.e.visit_strides(f)
    }
}

/// Writable lazy transform of a borrowed `E`.
///
/// Assigning into it stores through the proxy functor, element by element.
#[derive(Debug)]
pub struct FunctorViewMut<'a, E: ?Sized, F> {
    e: &'a mut E,
    f: F,
}

impl<'a, E, F> FunctorViewMut<'a, E, F>
where
    E: ExpressionMut + ?Sized,
    F: ProxyFunctor<E::Item>,
{
    pub fn new(e: &'a mut E, f: F) -> Self {
        Self { e, f }
    }
}

impl<E, F> Expression for FunctorViewMut<'_, E, F>
where
    E: ExpressionMut + ?Sized,
    F: ProxyFunctor<E::Item>,
{
    type Item = F::Output;
    type Stepper<'s> = FunctorStepper<'s, E::Stepper<'s>, F> where Self: 's;

    const STRIDED_LOOP: bool = E::STRIDED_LOOP && F::BATCHED;

    #[inline]
    fn shape(&self) -> &[usize] {
        self.e.shape()
    }

    #[inline]
    fn get(&self, index: &[usize]) -> F::Output {
        self.f.apply(self.e.get(index))
    }

    fn stepper_begin(&self, shape: &[usize]) -> Self::Stepper<'_> {
        FunctorStepper {
            inner: self.e.stepper_begin(shape),
            f: &self.f,
        }
    }

    fn strides(&self) -> Option<&[isize]> {
        self.e.strides()
    }

    #[inline]
    fn data_element(&self, i: usize) -> F::Output {
        self.f.apply(self.e.data_element(i))
    }
}

impl<E, F> ExpressionMut for FunctorViewMut<'_, E, F>
where
    E: ExpressionMut + ?Sized,
    F: ProxyFunctor<E::Item>,
{
    type StepperMut<'s> = FunctorStepperMut<'s, E::StepperMut<'s>, F> where Self: 's;

    fn stepper_begin_mut(&mut self, shape: &[usize]) -> Self::StepperMut<'_> {
        FunctorStepperMut {
            inner: self.e.stepper_begin_mut(shape),
            f: &self.f,
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

/// Lazy real part of `e`.
pub fn real<E>(e: E) -> FunctorView<E, Real>
where
    E: Expression,
    Real: ViewFunctor<E::Item>,
{
    FunctorView::new(e, Real)
}

/// Lazy imaginary part of `e`.
pub fn imag<E>(e: E) -> FunctorView<E, Imag>
where
    E: Expression,
    Imag: ViewFunctor<E::Item>,
{
    FunctorView::new(e, Imag)
}

/// Lazy complex conjugate of `e`.
pub fn conj<E>(e: E) -> FunctorView<E, Conj>
where
    E: Expression,
    Conj: ViewFunctor<E::Item>,
{
    FunctorView::new(e, Conj)
}

/// Lazy numeric conversion of `e` to `T`.
pub fn cast<T, E>(e: E) -> FunctorView<E, Cast<T>>
where
    T: Element,
    E: Expression,
    E::Item: NumericCast<T>,
{
    FunctorView::new(e, Cast(PhantomData))
}

/// Writable real part of `e`.
pub fn real_mut<E>(e: &mut E) -> FunctorViewMut<'_, E, Real>
where
    E: ExpressionMut + ?Sized,
    Real: ProxyFunctor<E::Item>,
{
    FunctorViewMut::new(e, Real)
}

/// Writable imaginary part of `e`.
pub fn imag_mut<E>(e: &mut E) -> FunctorViewMut<'_, E, Imag>
where
    E: ExpressionMut + ?Sized,
    Imag: ProxyFunctor<E::Item>,
{
    FunctorViewMut::new(e, Imag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Array, Layout};

    type C64 = Complex<f64>;

    fn complex_array() -> Array<C64> {
        Array::from_vec(
            &[2, 2],
            vec![
                C64::new(1.0, 2.0),
                C64::new(3.0, 4.0),
                C64::new(5.0, 6.0),
                C64::new(7.0, 8.0),
            ],
            Layout::RowMajor,
        )
        .unwrap()
    }

    #[test]
    fn test_real_imag_read() {
        let a = complex_array();
        assert_eq!(real(&a).iter().collect::<Vec<_>>(), vec![1.0, 3.0, 5.0, 7.0]);
        assert_eq!(imag(&a).get(&[1, 0]), 6.0);
        assert_eq!(conj(&a).get(&[0, 1]), C64::new(3.0, -4.0));
    }

    #[test]
    fn test_real_of_real_and_imag_of_real() {
        let a = Array::from_vec(&[2], vec![1.5f64, -2.0], Layout::RowMajor).unwrap();
        assert_eq!(real(&a).iter().collect::<Vec<_>>(), vec![1.5, -2.0]);
        assert_eq!(imag(&a).iter().collect::<Vec<_>>(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_functor_view_forwards_storage_properties() {
        let a = complex_array();
        let r = real(&a);
        assert_eq!(r.layout(), Layout::RowMajor);
        assert_eq!(r.strides(), Some(&[2isize, 1][..]));
        assert!(r.is_trivial_broadcast(Layout::RowMajor, &[2, 2]));
        assert_eq!(r.data_element(3), 7.0);
        assert!(<FunctorView<&Array<C64>, Real> as Expression>::STRIDED_LOOP);
        assert!(!<FunctorView<&Array<C64>, Lambda<fn(C64) -> f64>> as Expression>::STRIDED_LOOP);
    }

    #[test]
    fn test_proxy_stepper_writes_through() {
        let mut a = complex_array();
        {
            let mut v = imag_mut(&mut a);
            let mut s = v.stepper_begin_mut(&[2, 2]);
            s.set(-1.0);
            s.step(1, 1);
            s.set(-2.0);
        }
        assert_eq!(a.get(&[0, 0]), C64::new(1.0, -1.0));
        assert_eq!(a.get(&[0, 1]), C64::new(3.0, -2.0));
        assert_eq!(a.get(&[1, 0]), C64::new(5.0, 6.0));
    }

    #[test]
    fn test_cast_view() {
        let a = Array::from_vec(&[3], vec![1.9f64, -0.5, 300.0], Layout::RowMajor).unwrap();
        let c = cast::<u8, _>(&a);
        assert_eq!(c.iter().collect::<Vec<_>>(), vec![1, 0, 255]);
    }

    #[test]
    fn test_packet_load_applies_transform() {
        let a = complex_array();
        let r = real(&a);
        let mut s = r.stepper_begin(&[2, 2]);
        let mut out = [0.0; 3];
        s.load_packet(&mut out);
        assert_eq!(out, [1.0, 3.0, 5.0]);
    }
}
