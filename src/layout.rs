//! Memory layout tags and stride arithmetic.

/// Memory order of an expression's elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Layout {
    /// Last index varies fastest (C order).
    #[default]
    RowMajor,
    /// First index varies fastest (Fortran order).
    ColumnMajor,
    /// Strided, with an order only known at runtime.
    Dynamic,
    /// No meaningful storage order (generators, compositions).
    Any,
}

impl Layout {
    /// Whether this tag names a contiguous storage order.
    #[inline]
    pub fn is_contiguous(self) -> bool {
        matches!(self, Layout::RowMajor | Layout::ColumnMajor)
    }
}

/// Compute row-major strides (C default: last index varies fastest).
pub fn row_major_strides(dims: &[usize]) -> Vec<isize> {
    let rank = dims.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in (0..rank - 1).rev() {
        strides[i] = strides[i + 1] * dims[i + 1] as isize;
    }
    strides
}

/// Compute column-major strides (first index varies fastest).
pub fn col_major_strides(dims: &[usize]) -> Vec<isize> {
    let rank = dims.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in 1..rank {
        strides[i] = strides[i - 1] * dims[i - 1] as isize;
    }
    strides
}

/// Strides of a contiguous buffer in the given layout.
///
/// `Dynamic` and `Any` fall back to row-major.
pub fn compute_strides(dims: &[usize], layout: Layout) -> Vec<isize> {
    match layout {
        Layout::ColumnMajor => col_major_strides(dims),
        _ => row_major_strides(dims),
    }
}

/// Per-dimension offset that rewinds a cursor to index 0 along that dimension.
///
/// `backstride[i] = stride[i] * (dims[i] - 1)`, zero for empty dimensions.
pub fn backstrides(dims: &[usize], strides: &[isize]) -> Vec<isize> {
    dims.iter()
        .zip(strides.iter())
        .map(|(&d, &s)| if d == 0 { 0 } else { s * (d as isize - 1) })
        .collect()
}

pub fn total_len(dims: &[usize]) -> usize {
    dims.iter().product()
}

/// Whether `strides` describe a dense row-major buffer of shape `dims`.
///
/// Strides of size-1 dimensions are ignored.
pub fn is_row_major(dims: &[usize], strides: &[isize]) -> bool {
    if dims.len() != strides.len() {
        return false;
    }
    let mut expected = 1isize;
    for (&dim, &stride) in dims.iter().rev().zip(strides.iter().rev()) {
        if dim <= 1 {
            continue;
        }
        if stride != expected {
            return false;
        }
        expected = expected.saturating_mul(dim as isize);
    }
    true
}

/// Whether `strides` describe a dense column-major buffer of shape `dims`.
pub fn is_col_major(dims: &[usize], strides: &[isize]) -> bool {
    if dims.len() != strides.len() {
        return false;
    }
    let mut expected = 1isize;
    for (&dim, &stride) in dims.iter().zip(strides.iter()) {
        if dim <= 1 {
            continue;
        }
        if stride != expected {
            return false;
        }
        expected = expected.saturating_mul(dim as isize);
    }
    true
}

/// Classify a strided region: the contiguous layout it matches, if any.
///
/// A region matching both orders (rank <= 1, or all but one extent equal to 1)
/// reports `RowMajor`.
pub fn detect_layout(dims: &[usize], strides: &[isize]) -> Layout {
    if is_row_major(dims, strides) {
        Layout::RowMajor
    } else if is_col_major(dims, strides) {
        Layout::ColumnMajor
    } else {
        Layout::Dynamic
    }
}

/// Convert a linear position in `layout` storage order into a multi-index.
pub(crate) fn unravel_index(mut linear: usize, dims: &[usize], layout: Layout, out: &mut [usize]) {
    match layout {
        Layout::ColumnMajor => {
            for (o, &d) in out.iter_mut().zip(dims.iter()) {
                *o = linear % d;
                linear /= d;
            }
        }
        _ => {
            for (o, &d) in out.iter_mut().zip(dims.iter()).rev() {
                *o = linear % d;
                linear /= d;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_strides() {
        assert_eq!(row_major_strides(&[3, 4]), vec![4, 1]);
        assert_eq!(row_major_strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert!(row_major_strides(&[]).is_empty());
    }

    #[test]
    fn test_col_major_strides() {
        assert_eq!(col_major_strides(&[3, 4]), vec![1, 3]);
        assert_eq!(col_major_strides(&[2, 3, 4]), vec![1, 2, 6]);
    }

    #[test]
    fn test_backstrides() {
        assert_eq!(backstrides(&[2, 3, 4], &[12, 4, 1]), vec![12, 8, 3]);
        assert_eq!(backstrides(&[0, 1], &[1, 1]), vec![0, 0]);
    }

    #[test]
    fn test_detect_layout() {
        assert_eq!(detect_layout(&[2, 3], &[3, 1]), Layout::RowMajor);
        assert_eq!(detect_layout(&[2, 3], &[1, 2]), Layout::ColumnMajor);
        assert_eq!(detect_layout(&[2, 3], &[1, 4]), Layout::Dynamic);
        // unit dimensions do not constrain the order
        assert_eq!(detect_layout(&[1, 4], &[100, 1]), Layout::RowMajor);
    }

    #[test]
    fn test_unravel_index() {
        let mut idx = [0usize; 3];
        unravel_index(17, &[2, 3, 4], Layout::RowMajor, &mut idx);
        assert_eq!(idx, [1, 1, 1]);
        unravel_index(17, &[2, 3, 4], Layout::ColumnMajor, &mut idx);
        // 17 = 1 + 2*(2 + 3*2)
        assert_eq!(idx, [1, 2, 2]);
    }
}
