//! Loop geometry for the strided-loop strategy.
//!
//! The destination shape is split at a cut point: dimensions from the cut to
//! the end form an inner run that is contiguous in every operand, dimensions
//! before it are covered by an outer multi-index loop.

use crate::broadcast::promote_strides;
use crate::expression::Expression;
use crate::layout::row_major_strides;

/// Inner/outer loop sizes of a strided assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSizes {
    /// Elements per contiguous inner run.
    pub inner_loop_size: usize,
    /// Number of inner runs.
    pub outer_loop_size: usize,
    /// First dimension of the inner run. Equal to the rank when no trailing
    /// dimension is shared, in which case the strategy does not apply.
    pub cut: usize,
}

impl LoopSizes {
    /// Whether the plan has a non-empty contiguous inner run.
    #[inline]
    pub fn is_applicable(&self, rank: usize) -> bool {
        self.cut < rank
    }
}

/// Cut point between two stride sequences of equal length.
///
/// Walks both sequences from the last dimension backward while the strides
/// agree and returns the index where the walk stopped: 0 when every stride
/// matches, the full length when the last strides already differ.
///
/// # Example
/// ```
/// use strided_expr::stride_cut;
///
/// assert_eq!(stride_cut(&[12, 4, 1], &[12, 4, 1]), 0);
/// assert_eq!(stride_cut(&[12, 4, 1], &[1, 2, 6]), 3);
/// assert_eq!(stride_cut(&[12, 4, 1], &[24, 4, 1]), 1);
/// ```
pub fn stride_cut(dest_strides: &[isize], strides: &[isize]) -> usize {
    debug_assert_eq!(dest_strides.len(), strides.len());
    let mut i = dest_strides.len();
    while i > 0 && dest_strides[i - 1] == strides[i - 1] {
        i -= 1;
    }
    i
}

/// Like [`stride_cut`], with dimensions of `shape` of extent 1 matching any
/// stride (they are never stepped along).
fn broadcast_stride_cut(shape: &[usize], dest_strides: &[isize], strides: &[isize]) -> usize {
    let mut i = shape.len();
    while i > 0 && (shape[i - 1] == 1 || dest_strides[i - 1] == strides[i - 1]) {
        i -= 1;
    }
    i
}

/// Plan the strided loop for assigning `src` into `dest`.
///
/// Every storage-backed operand of `src` (scalars excluded) is compared with
/// the destination strides, seen through the destination shape. The inner
/// run is further required to be dense row-major so that it can be walked
/// one element at a time. Returns `None` when `dest` has no strides.
pub fn loop_sizes<D, S>(dest: &D, src: &S) -> Option<LoopSizes>
where
    D: Expression + ?Sized,
    S: Expression + ?Sized,
{
    let shape = dest.shape();
    let dest_strides = promote_strides(shape, shape, dest.strides()?);

    let dense = promote_strides(shape, shape, &row_major_strides(shape));
    let mut cut = broadcast_stride_cut(shape, &dest_strides, &dense);

    src.visit_strides(&mut |dims, strides| {
        let promoted = promote_strides(shape, dims, strides);
        cut = cut.max(broadcast_stride_cut(shape, &dest_strides, &promoted));
    });

    let outer_loop_size = shape[..cut].iter().product();
    let inner_loop_size = shape[cut..].iter().product();
    Some(LoopSizes {
        inner_loop_size,
        outer_loop_size,
        cut,
    })
}
