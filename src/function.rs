//! Element-wise functions over operand expressions.
//!
//! A [`Function`] holds a functor and a tuple of operands. Its shape is the
//! broadcast of the operand shapes, computed once at construction. Operands
//! are held by value: pass an expression to move it into the composition, or
//! a reference (`&a`) to borrow it for the composition's lifetime.

use std::ops;

use crate::element::Element;
use crate::expression::Expression;
use crate::layout::Layout;
use crate::stepper::{Cursor, SVec, Stepper};
use crate::{Result, MAX_LANES};

// ============================================================================
// Functors
// ============================================================================

/// A function applied to one element of every operand.
///
/// `Args` is the tuple of operand element types.
pub trait ElementFn<Args> {
    type Output: Element;

    /// Whether the functor can be applied to whole packets.
    ///
    /// Only batched functors let a composition take the strided-loop path.
    const BATCHED: bool = false;

    fn call(&self, args: Args) -> Self::Output;
}

/// `a + b`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Add;

/// `a - b`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sub;

/// `a * b`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mul;

/// `a / b`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Div;

/// `-a`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Neg;

/// `a`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity;

macro_rules! impl_binary_fn {
    ($name:ident, $trait:ident, $op:tt) => {
        impl<A, B> ElementFn<(A, B)> for $name
        where
            A: ops::$trait<B>,
            <A as ops::$trait<B>>::Output: Element,
        {
            type Output = <A as ops::$trait<B>>::Output;
            const BATCHED: bool = true;

            #[inline(always)]
            fn call(&self, (a, b): (A, B)) -> Self::Output {
                a $op b
            }
        }
    };
}

impl_binary_fn!(Add, Add, +);
impl_binary_fn!(Sub, Sub, -);
impl_binary_fn!(Mul, Mul, *);
impl_binary_fn!(Div, Div, /);

impl<A> ElementFn<(A,)> for Neg
where
    A: ops::Neg,
    <A as ops::Neg>::Output: Element,
{
    type Output = <A as ops::Neg>::Output;
    const BATCHED: bool = true;

    #[inline(always)]
    fn call(&self, (a,): (A,)) -> Self::Output {
        -a
    }
}

impl<A: Element> ElementFn<(A,)> for Identity {
    type Output = A;
    const BATCHED: bool = true;

    #[inline(always)]
    fn call(&self, (a,): (A,)) -> A {
        a
    }
}

/// Wraps a closure as a functor.
///
/// Closures are applied one element at a time, so compositions built from
/// them are evaluated by the generic strategy.
#[derive(Debug, Clone, Copy)]
pub struct Lambda<F>(pub F);

macro_rules! impl_lambda {
    ($($A:ident $a:ident),+) => {
        impl<Func, R, $($A),+> ElementFn<($($A,)+)> for Lambda<Func>
        where
            Func: Fn($($A),+) -> R,
            R: Element,
        {
            type Output = R;

            #[inline(always)]
            fn call(&self, ($($a,)+): ($($A,)+)) -> R {
                (self.0)($($a),+)
            }
        }
    };
}

impl_lambda!(A0 a0);
impl_lambda!(A0 a0, A1 a1);
impl_lambda!(A0 a0, A1 a1, A2 a2);
impl_lambda!(A0 a0, A1 a1, A2 a2, A3 a3);

// ============================================================================
// Function expression
// ============================================================================

/// Operand tuples of a [`Function`].
pub trait Operands {
    /// Largest operand rank.
    fn max_rank(&self) -> usize;

    /// Broadcast every operand shape into `shape`; true if none was expanded.
    fn broadcast_shape(&self, shape: &mut Vec<usize>) -> Result<bool>;
}

/// Lazy element-wise application of `F` over the operand tuple `Args`.
#[derive(Debug, Clone)]
pub struct Function<F, Args> {
    f: F,
    args: Args,
    shape: Vec<usize>,
}

impl<F, Args: Operands> Function<F, Args> {
    /// Compose `f` over `args`.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if the operand shapes cannot be broadcast
    /// together.
    pub fn new(f: F, args: Args) -> Result<Self> {
        let mut shape = vec![1; args.max_rank()];
        args.broadcast_shape(&mut shape)?;
        Ok(Self { f, args, shape })
    }
}

impl<F, Args> Function<F, Args> {
    pub fn functor(&self) -> &F {
        &self.f
    }

    pub fn args(&self) -> &Args {
        &self.args
    }
}

/// Stepper of a [`Function`]: one sub-stepper per operand.
#[derive(Debug, Clone)]
pub struct FunctionStepper<'a, F, S> {
    f: &'a F,
    steppers: S,
}

/// Trailing components of `index` for an operand of `shape`, with broadcast
/// axes pinned to 0.
#[inline]
fn operand_index(index: &[usize], shape: &[usize]) -> SVec<usize> {
    let skip = index.len() - shape.len();
    index[skip..]
        .iter()
        .zip(shape.iter())
        .map(|(&i, &d)| if d == 1 { 0 } else { i })
        .collect()
}

macro_rules! impl_function {
    ($($E:ident $S:ident $buf:ident $idx:tt),+) => {
        impl<$($E: Expression),+> Operands for ($($E,)+) {
            fn max_rank(&self) -> usize {
                0usize $(.max(self.$idx.dimension()))+
            }

            fn broadcast_shape(&self, shape: &mut Vec<usize>) -> Result<bool> {
                let mut trivial = true;
                $(trivial &= self.$idx.broadcast_shape(shape)?;)+
                Ok(trivial)
            }
        }

        impl<F, $($S: Cursor),+> Cursor for FunctionStepper<'_, F, ($($S,)+)> {
            #[inline]
            fn step(&mut self, dim: usize, n: usize) {
                $(self.steppers.$idx.step(dim, n);)+
            }

            #[inline]
            fn step_back(&mut self, dim: usize, n: usize) {
                $(self.steppers.$idx.step_back(dim, n);)+
            }

            #[inline]
            fn reset(&mut self, dim: usize) {
                $(self.steppers.$idx.reset(dim);)+
            }

            #[inline]
            fn to_begin(&mut self) {
                $(self.steppers.$idx.to_begin();)+
            }

            #[inline]
            fn to_end(&mut self) {
                $(self.steppers.$idx.to_end();)+
            }
        }

        impl<F, $($S: Stepper),+> Stepper for FunctionStepper<'_, F, ($($S,)+)>
        where
            F: ElementFn<($(<$S as Stepper>::Item,)+)>,
        {
            type Item = F::Output;

            #[inline]
            fn get(&self) -> F::Output {
                self.f.call(($(self.steppers.$idx.get(),)+))
            }

            #[inline]
            fn step_leading(&mut self) {
                $(self.steppers.$idx.step_leading();)+
            }

            #[inline]
            fn load_packet(&mut self, out: &mut [F::Output]) {
                let n = out.len();
                debug_assert!(n <= MAX_LANES);
                $(
                    let mut $buf = [<<$S as Stepper>::Item as Default>::default(); MAX_LANES];
                    self.steppers.$idx.load_packet(&mut $buf[..n]);
                )+
                for (k, slot) in out.iter_mut().enumerate() {
                    *slot = self.f.call(($($buf[k],)+));
                }
            }
        }

        impl<F, $($E),+> Expression for Function<F, ($($E,)+)>
        where
            $($E: Expression,)+
            F: ElementFn<($(<$E as Expression>::Item,)+)>,
        {
            type Item = F::Output;
            type Stepper<'s> = FunctionStepper<'s, F, ($(<$E as Expression>::Stepper<'s>,)+)>
            where
                Self: 's;

            const STRIDED_LOOP: bool = F::BATCHED $(&& <$E as Expression>::STRIDED_LOOP)+;

            #[inline]
            fn shape(&self) -> &[usize] {
                &self.shape
            }

            fn get(&self, index: &[usize]) -> F::Output {
                self.f.call(($(
                    self.args.$idx.get(&operand_index(index, self.args.$idx.shape())),
                )+))
            }

            fn stepper_begin(&self, shape: &[usize]) -> Self::Stepper<'_> {
                FunctionStepper {
                    f: &self.f,
                    steppers: ($(self.args.$idx.stepper_begin(shape),)+),
                }
            }

            fn broadcast_shape(&self, shape: &mut Vec<usize>) -> Result<bool> {
                Operands::broadcast_shape(&self.args, shape)
            }

            fn layout(&self) -> Layout {
                Layout::Any
            }

            fn is_trivial_broadcast(&self, layout: Layout, shape: &[usize]) -> bool {
                true $(&& self.args.$idx.is_trivial_broadcast(layout, shape))+
            }

            #[inline]
            fn data_element(&self, i: usize) -> F::Output {
                self.f.call(($(self.args.$idx.data_element(i),)+))
            }

            fn load_elements(&self, start: usize, out: &mut [F::Output]) {
                for (c, chunk) in out.chunks_mut(MAX_LANES).enumerate() {
                    let base = start + c * MAX_LANES;
                    let n = chunk.len();
                    $(
                        let mut $buf = [<<$E as Expression>::Item as Default>::default(); MAX_LANES];
                        self.args.$idx.load_elements(base, &mut $buf[..n]);
                    )+
                    for (k, slot) in chunk.iter_mut().enumerate() {
                        *slot = self.f.call(($($buf[k],)+));
                    }
                }
            }

            fn visit_strides(&self, f: &mut dyn FnMut(&[usize], &[isize])) {
                $(self.args.$idx.visit_strides(f);)+
            }
        }
    };
}

impl_function!(E0 S0 b0 0);
impl_function!(E0 S0 b0 0, E1 S1 b1 1);
impl_function!(E0 S0 b0 0, E1 S1 b1 1, E2 S2 b2 2);
impl_function!(E0 S0 b0 0, E1 S1 b1 1, E2 S2 b2 2, E3 S3 b3 3);

// ============================================================================
// Constructors
// ============================================================================

fn unary<F, E: Expression>(f: F, e: E) -> Function<F, (E,)> {
    let shape = e.shape().to_vec();
    Function {
        f,
        args: (e,),
        shape,
    }
}

/// Element-wise `a + b`.
pub fn add<A: Expression, B: Expression>(a: A, b: B) -> Result<Function<Add, (A, B)>> {
    Function::new(Add, (a, b))
}

/// Element-wise `a - b`.
pub fn sub<A: Expression, B: Expression>(a: A, b: B) -> Result<Function<Sub, (A, B)>> {
    Function::new(Sub, (a, b))
}

/// Element-wise `a * b`.
pub fn mul<A: Expression, B: Expression>(a: A, b: B) -> Result<Function<Mul, (A, B)>> {
    Function::new(Mul, (a, b))
}

/// Element-wise `a / b`.
pub fn div<A: Expression, B: Expression>(a: A, b: B) -> Result<Function<Div, (A, B)>> {
    Function::new(Div, (a, b))
}

/// Element-wise `-e`.
pub fn neg<E: Expression>(e: E) -> Function<Neg, (E,)> {
    unary(Neg, e)
}

/// Apply `f` to every element of `e`.
pub fn map<E, F, R>(e: E, f: F) -> Function<Lambda<F>, (E,)>
where
    E: Expression,
    F: Fn(E::Item) -> R,
    R: Element,
{
    unary(Lambda(f), e)
}

/// Apply `f` to the broadcast pairs of `a` and `b`.
pub fn zip_map<A, B, F, R>(a: A, b: B, f: F) -> Result<Function<Lambda<F>, (A, B)>>
where
    A: Expression,
    B: Expression,
    F: Fn(A::Item, B::Item) -> R,
    R: Element,
{
    Function::new(Lambda(f), (a, b))
}

/// Apply `f` to the broadcast triples of `a`, `b` and `c`.
pub fn zip_map3<A, B, C, F, R>(a: A, b: B, c: C, f: F) -> Result<Function<Lambda<F>, (A, B, C)>>
where
    A: Expression,
    B: Expression,
    C: Expression,
    F: Fn(A::Item, B::Item, C::Item) -> R,
    R: Element,
{
    Function::new(Lambda(f), (a, b, c))
}
