//! Padding of an expression along every axis.
//!
//! The padded result is an [`IndexFunction`] over the source that is
//! evaluated once into a fresh array.

use crate::array::Array;
use crate::element::NumericCast;
use crate::expression::Expression;
use crate::index_function::IndexFunction;
use crate::stepper::SVec;
use crate::{ExprError, Result};

/// How the border values of [`pad`] are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PadMode {
    /// A fixed value.
    #[default]
    Constant,
    /// Mirror including the edge element: `c b a | a b c | c b a`.
    Symmetric,
    /// Mirror excluding the edge element: `d c b | a b c d | c b a`.
    Reflect,
    /// Continue from the opposite edge: `b c | a b c | a b`.
    Wrap,
    /// Same as [`PadMode::Wrap`].
    Periodic,
}

impl PadMode {
    /// Largest width this mode can fill from an axis of `extent`.
    fn max_width(self, extent: usize) -> usize {
        match self {
            PadMode::Constant => usize::MAX,
            PadMode::Symmetric | PadMode::Wrap | PadMode::Periodic => extent,
            PadMode::Reflect => extent.saturating_sub(1),
        }
    }

    /// Source position on an axis of `extent` for padded offset `m`
    /// (`m < 0` before the data, `m >= extent` after it). `None` for
    /// constant fill.
    fn source_index(self, m: isize, extent: usize) -> Option<usize> {
        let n = extent as isize;
        if (0..n).contains(&m) {
            return Some(m as usize);
        }
        let i = match self {
            PadMode::Constant => return None,
            PadMode::Wrap | PadMode::Periodic => m.rem_euclid(n),
            PadMode::Symmetric => {
                let r = m.rem_euclid(2 * n);
                if r < n {
                    r
                } else {
                    2 * n - 1 - r
                }
            }
            PadMode::Reflect => {
                if n == 1 {
                    0
                } else {
                    let r = m.rem_euclid(2 * n - 2);
                    if r < n {
                        r
                    } else {
                        2 * n - 2 - r
                    }
                }
            }
        };
        Some(i as usize)
    }
}

/// Pad `expr` by `widths[axis] = (before, after)` elements on every axis.
///
/// `value` fills the border in [`PadMode::Constant`] and is ignored by the
/// other modes.
///
/// # Errors
/// - `InvalidAxis` if `widths` does not have one entry per axis.
/// - `InvalidPadWidth` if a width exceeds the source extent for a mirroring
///   or wrapping mode (reflect allows one element less).
///
/// # Example
/// ```
/// use strided_expr::{pad, Array, Layout, PadMode};
///
/// let a = Array::from_vec(&[3], vec![1, 2, 3], Layout::RowMajor).unwrap();
/// let p = pad(&a, &[(2, 2)], PadMode::Reflect, 0).unwrap();
/// assert_eq!(p.data(), &[3, 2, 1, 2, 3, 2, 1]);
/// ```
pub fn pad<E>(expr: &E, widths: &[(usize, usize)], mode: PadMode, value: E::Item) -> Result<Array<E::Item>>
where
    E: Expression + ?Sized,
    E::Item: NumericCast<E::Item>,
{
    let src_shape = expr.shape();
    let rank = src_shape.len();
    if widths.len() != rank {
        return Err(ExprError::InvalidAxis {
            axis: widths.len(),
            rank,
        });
    }

    let mut shape = Vec::with_capacity(rank);
    for (axis, (&(before, after), &extent)) in widths.iter().zip(src_shape.iter()).enumerate() {
        let limit = mode.max_width(extent);
        if before > limit || after > limit {
            return Err(ExprError::InvalidPadWidth {
                axis,
                before,
                after,
                extent,
            });
        }
        shape.push(before + extent + after);
    }

    let padded = IndexFunction::new(&shape, |index: &[usize]| {
        let mut src: SVec<usize> = SVec::with_capacity(rank);
        for ((&i, &(before, _)), &extent) in index.iter().zip(widths.iter()).zip(src_shape.iter()) {
            match mode.source_index(i as isize - before as isize, extent) {
                Some(j) => src.push(j),
                None => return value,
            }
        }
        expr.get(&src)
    });
    Ok(Array::from_expr(&padded))
}

/// Pad every axis by `width` on both sides.
pub fn pad_uniform<E>(expr: &E, width: usize, mode: PadMode, value: E::Item) -> Result<Array<E::Item>>
where
    E: Expression + ?Sized,
    E::Item: NumericCast<E::Item>,
{
    let widths = vec![(width, width); expr.dimension()];
    pad(expr, &widths, mode, value)
}
