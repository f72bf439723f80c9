//! Lazy multidimensional array expressions with a layout-aware assignment engine.
//!
//! Expressions (dense containers, strided views, element-wise compositions,
//! index-parameterized generators, functor views) are composed without
//! computing anything. Work happens when an expression is assigned into a
//! destination container: the engine broadcasts shapes, resizes the
//! destination if needed, then picks one of three traversal strategies.
//!
//! # Core Types
//!
//! - [`Array`]: Owned dense container (row-major or column-major)
//! - [`ArrayView`] / [`ArrayViewMut`]: Zero-copy strided views
//! - [`Scalar`]: A value broadcast to any shape
//! - [`Function`]: Element-wise function applied over operand expressions
//! - [`IndexFunction`]: Expression computed from the multi-index
//! - [`FunctorView`] / [`FunctorViewMut`]: Lazy per-element transform of another expression
//!
//! # Assignment
//!
//! - [`assign`]: Resize-or-broadcast assignment into a container
//! - [`assign_into`]: In-place assignment into a fixed-shape destination
//! - [`assign_with`]: Run a specific [`Strategy`] (falls back when not applicable)
//! - [`noalias_assign`]: Materialize the source first, then assign
//! - [`computed_assign`] / [`scalar_computed_assign`]: Update in place with a binary function
//!
//! Strategies, in priority order:
//! 1. [`Strategy::Trivial`]: both sides contiguous in the same layout, same shape;
//!    linear storage copy in packets of [`Element::LANES`] elements
//! 2. [`Strategy::StridedLoop`]: the trailing dimensions form a contiguous run
//!    in every operand; packets over the inner run, multi-index over the rest
//! 3. [`Strategy::Generic`]: lockstep steppers driven by [`increment_stepper`]
//!
//! All three produce identical results.
//!
//! # Example
//!
//! ```rust
//! use strided_expr::{add, assign, Array, Layout};
//!
//! let a = Array::from_vec(&[2, 3], vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], Layout::RowMajor).unwrap();
//! let b = Array::from_vec(&[3], vec![10.0, 20.0, 30.0], Layout::RowMajor).unwrap();
//!
//! let mut out = Array::<f64>::default();
//! assign(&mut out, &add(&a, &b).unwrap()).unwrap();
//!
//! assert_eq!(out.shape(), &[2, 3]);
//! assert_eq!(out.get(&[1, 2]), 35.0);
//! ```

mod array;
pub mod assign;
pub mod broadcast;
mod element;
mod expression;
mod function;
mod functor_view;
mod index_function;
pub mod layout;
pub mod pad;
pub mod planner;
pub mod random;
mod simd;
mod stepper;
mod view;

// ============================================================================
// Expression model
// ============================================================================
pub use element::{Element, NumericCast};
pub use expression::{Container, Expression, ExpressionMut};
pub use stepper::{increment_stepper, Cursor, Stepper, StepperIter, StepperMut};

// ============================================================================
// Containers and views
// ============================================================================
pub use array::{Array, DenseStepper, DenseStepperMut};
pub use layout::Layout;
pub use view::{ArrayView, ArrayViewMut, Scalar, ScalarStepper};

// ============================================================================
// Lazy compositions
// ============================================================================
pub use function::{
    add, div, map, mul, neg, sub, zip_map, zip_map3, Add, Div, ElementFn, Function,
    FunctionStepper, Identity, Lambda, Mul, Neg, Operands, Sub,
};
pub use functor_view::{
    cast, conj, imag, imag_mut, real, real_mut, Cast, Conj, FunctorStepper, FunctorStepperMut,
    FunctorView, FunctorViewMut, Imag, ProxyFunctor, Real, ViewFunctor,
};
pub use index_function::{
    arange, eye, from_indices, full, linspace, ones, zeros, IndexFunction, IndexFunctionStepper,
};

// ============================================================================
// Assignment engine
// ============================================================================
pub use assign::{
    assert_compatible_shape, assign, assign_data, assign_into, assign_with, computed_assign,
    eval, noalias_assign, scalar_computed_assign, select_strategy, Strategy,
};
pub use broadcast::{broadcast_shape, broadcast_shapes, broadcastable};
pub use pad::{pad, pad_uniform, PadMode};
pub use planner::{loop_sizes, stride_cut, LoopSizes};

// ============================================================================
// Constants
// ============================================================================

/// Width in bytes of the vector registers packets are sized for.
///
/// [`Element::LANES`] defaults to `SIMD_WIDTH_BYTES / size_of::<T>()`.
pub const SIMD_WIDTH_BYTES: usize = 32;

/// Upper bound on the number of elements in one packet.
///
/// Steppers stage packets in stack buffers of this length.
pub const MAX_LANES: usize = 64;

// ============================================================================
// Error types
// ============================================================================

/// Errors raised while building or assigning expressions.
///
/// Shape errors are always detected before the destination is written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    /// Two shapes cannot be broadcast together.
    #[error("incompatible dimension of arrays: {0:?} and {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// The source cannot be broadcast into the fixed shape of the destination.
    #[error("cannot broadcast shape {from:?} into destination shape {to:?}")]
    Broadcast { from: Vec<usize>, to: Vec<usize> },

    /// Stride array length doesn't match dimensions.
    #[error("stride and dims length mismatch")]
    StrideLengthMismatch,

    /// A view would address memory outside of its buffer.
    #[error("offset overflow while computing view bounds")]
    OffsetOverflow,

    /// Buffer length does not match the element count of the shape.
    #[error("data length {len} does not match expected element count {expected}")]
    DataLength { len: usize, expected: usize },

    /// Invalid axis index for the given rank.
    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    /// The axes passed to `permute` are not a permutation of `0..rank`.
    #[error("invalid permutation {0:?}")]
    InvalidPermutation(Vec<usize>),

    /// A padding width exceeds what the padding mode can mirror.
    #[error("invalid pad width ({before}, {after}) for axis {axis} of extent {extent}")]
    InvalidPadWidth {
        axis: usize,
        before: usize,
        after: usize,
        extent: usize,
    },

    /// A slice range lies outside of the axis.
    #[error("range {start}..{end} out of bounds for axis {axis} of extent {extent}")]
    InvalidRange {
        axis: usize,
        start: usize,
        end: usize,
        extent: usize,
    },

    /// Slice step of zero.
    #[error("zero step for axis {axis}")]
    ZeroStep { axis: usize },

    /// Parameters rejected by a random distribution.
    #[error("invalid distribution parameters: {0}")]
    Distribution(String),
}

/// Result type for expression operations.
pub type Result<T> = std::result::Result<T, ExprError>;
