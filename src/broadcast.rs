//! NumPy-style broadcasting rules.
//!
//! Shapes are right-aligned: the shorter shape is padded with leading
//! size-1 dimensions. Two aligned extents are compatible if they are equal
//! or one of them is 1.

use crate::{ExprError, Result};

/// Broadcast `input` into `output`, updating `output` in place.
///
/// Walks both shapes from the trailing dimension backward. Where `output`
/// holds 1 it adopts the extent of `input`; where both extents differ and
/// `input` is not 1, the shapes are incompatible. If `input` has the higher
/// rank, `output` first gets leading 1s.
///
/// Returns whether the broadcast was trivial: same rank, and every paired
/// extent equal after adoption. On error `output` is left untouched.
///
/// # Example
/// ```
/// use strided_expr::broadcast_shape;
///
/// let mut out = vec![2, 1];
/// let trivial = broadcast_shape(&[3], &mut out).unwrap();
/// assert_eq!(out, vec![2, 3]);
/// assert!(!trivial);
/// ```
pub fn broadcast_shape(input: &[usize], output: &mut Vec<usize>) -> Result<bool> {
    let same_rank = input.len() == output.len();

    let mut result = output.clone();
    if input.len() > result.len() {
        let pad = input.len() - result.len();
        result.splice(0..0, std::iter::repeat(1).take(pad));
    }

    let offset = result.len() - input.len();
    for (i, &in_dim) in input.iter().enumerate().rev() {
        let out_dim = &mut result[offset + i];
        if *out_dim == 1 {
            *out_dim = in_dim;
        } else if in_dim != 1 && in_dim != *out_dim {
            return Err(ExprError::ShapeMismatch(input.to_vec(), output.clone()));
        }
    }

    let trivial = same_rank && input == result.as_slice();
    *output = result;
    Ok(trivial)
}

/// Whether `source` can be broadcast into the fixed shape `target`.
///
/// Every aligned extent of `source` must be 1 or equal to the `target`
/// extent. Leading dimensions of `source` beyond the rank of `target` must
/// be 1. `target` is never modified, so this is the pre-check for in-place
/// assignment.
pub fn broadcastable(source: &[usize], target: &[usize]) -> bool {
    if source.len() > target.len() {
        let extra = source.len() - target.len();
        if source[..extra].iter().any(|&d| d != 1) {
            return false;
        }
        return broadcastable(&source[extra..], target);
    }
    source
        .iter()
        .rev()
        .zip(target.iter().rev())
        .all(|(&s, &t)| s == t || s == 1)
}

/// Common broadcast shape of several shapes.
///
/// Returns the shape and whether every input already had that exact shape.
pub fn broadcast_shapes(shapes: &[&[usize]]) -> Result<(Vec<usize>, bool)> {
    let rank = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut out = vec![1usize; rank];
    let mut trivial = true;
    for shape in shapes {
        trivial &= broadcast_shape(shape, &mut out)?;
    }
    // An early operand may look trivial before a later one widened the shape.
    trivial &= shapes.iter().all(|s| *s == out.as_slice());
    Ok((out, trivial))
}

/// Strides of a `src` region as seen from a broadcast to `target`.
///
/// The result has one entry per target dimension. Dimensions missing from
/// `src` (leading padding) and size-1 dimensions get stride 0. Extra leading
/// dimensions of `src` (which must be size 1) are dropped.
pub fn promote_strides(target: &[usize], src_dims: &[usize], src_strides: &[isize]) -> Vec<isize> {
    let mut out = vec![0isize; target.len()];
    let common = target.len().min(src_dims.len());
    for k in 1..=common {
        let t = target.len() - k;
        let s = src_dims.len() - k;
        out[t] = if src_dims[s] == 1 { 0 } else { src_strides[s] };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_shape_adopts_unit_extents() {
        let mut out = vec![1usize, 1];
        let trivial = broadcast_shape(&[2, 3], &mut out).unwrap();
        assert_eq!(out, vec![2, 3]);
        assert!(trivial);
    }

    #[test]
    fn test_broadcast_shape_lower_rank_input() {
        let mut out = vec![2usize, 3];
        let trivial = broadcast_shape(&[3], &mut out).unwrap();
        assert_eq!(out, vec![2, 3]);
        assert!(!trivial);
    }

    #[test]
    fn test_broadcast_shape_higher_rank_input() {
        let mut out = vec![3usize];
        let trivial = broadcast_shape(&[4, 1, 3], &mut out).unwrap();
        assert_eq!(out, vec![4, 1, 3]);
        assert!(!trivial);
    }

    #[test]
    fn test_broadcast_shape_input_unit_kept() {
        let mut out = vec![2usize, 3];
        let trivial = broadcast_shape(&[2, 1], &mut out).unwrap();
        assert_eq!(out, vec![2, 3]);
        assert!(!trivial);
    }

    #[test]
    fn test_broadcast_shape_incompatible_leaves_output() {
        let mut out = vec![2usize, 3];
        let err = broadcast_shape(&[4], &mut out).unwrap_err();
        match err {
            ExprError::ShapeMismatch(input, output) => {
                assert_eq!(input, vec![4]);
                assert_eq!(output, vec![2, 3]);
            }
            _ => panic!("unexpected error: {err:?}"),
        }
        assert_eq!(out, vec![2, 3]);
    }

    #[test]
    fn test_broadcastable() {
        assert!(broadcastable(&[3], &[2, 3]));
        assert!(broadcastable(&[1, 3], &[2, 3]));
        assert!(broadcastable(&[1, 2, 3], &[2, 3]));
        assert!(!broadcastable(&[4], &[3]));
        // a fixed destination cannot grow
        assert!(!broadcastable(&[2, 3], &[1, 3]));
        assert!(!broadcastable(&[2, 2, 3], &[2, 3]));
    }

    #[test]
    fn test_broadcast_shapes() {
        let (shape, trivial) = broadcast_shapes(&[&[1], &[3]]).unwrap();
        assert_eq!(shape, vec![3]);
        assert!(!trivial);

        let (shape, trivial) = broadcast_shapes(&[&[2, 3], &[2, 3]]).unwrap();
        assert_eq!(shape, vec![2, 3]);
        assert!(trivial);

        assert!(broadcast_shapes(&[&[2, 3], &[3, 2]]).is_err());
    }

    #[test]
    fn test_promote_strides() {
        assert_eq!(promote_strides(&[2, 3], &[3], &[1]), vec![0, 1]);
        assert_eq!(promote_strides(&[2, 3], &[1, 3], &[3, 1]), vec![0, 1]);
        assert_eq!(promote_strides(&[3], &[1, 3], &[3, 1]), vec![1]);
    }
}
