use approx::assert_relative_eq;
use num_complex::Complex64;
use strided_expr::{
    add, assign, cast, conj, div, eval, from_indices, imag, map, neg, real, sub, zip_map3, Array,
    ArrayView, ExprError, Expression, Layout, Scalar,
};

fn make_tensor(shape: &[usize]) -> Array<f64> {
    let mut k = 0.0;
    Array::from_fn(shape, Layout::RowMajor, |_| {
        k += 1.0;
        k
    })
}

#[test]
fn test_nested_functions_with_scalars() {
    let a = make_tensor(&[3, 4]);
    let b = make_tensor(&[4]);
    // (a - b) / 2 + (-a)
    let expr = add(div(sub(&a, &b).unwrap(), Scalar(2.0)).unwrap(), neg(&a)).unwrap();
    assert_eq!(expr.shape(), &[3, 4]);

    let out = eval(&expr);
    for i in 0..3 {
        for j in 0..4 {
            let x = a.get(&[i, j]);
            let expected = (x - b.get(&[j])) / 2.0 - x;
            assert_relative_eq!(out.get(&[i, j]), expected, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_incompatible_operands_rejected_at_build_time() {
    let a = make_tensor(&[2, 3]);
    let b = make_tensor(&[2]);
    assert!(matches!(add(&a, &b), Err(ExprError::ShapeMismatch(_, _))));
}

#[test]
fn test_three_operand_broadcast() {
    let col = Array::from_vec(&[3, 1], vec![1.0, 2.0, 3.0], Layout::RowMajor).unwrap();
    let row = Array::from_vec(&[1, 2], vec![10.0, 20.0], Layout::RowMajor).unwrap();
    let w = Array::from_vec(&[2], vec![0.5, 0.25], Layout::RowMajor).unwrap();
    let expr = zip_map3(&col, &row, &w, |c, r, w| (c + r) * w).unwrap();
    assert_eq!(expr.shape(), &[3, 2]);
    let out = eval(&expr);
    assert_eq!(out.data(), &[5.5, 5.25, 6.0, 5.5, 6.5, 5.75]);
}

#[test]
fn test_iterate_broadcast_view() {
    let a = make_tensor(&[3]);
    let values: Vec<f64> = a.iter_broadcast(&[2, 3]).unwrap().collect();
    assert_eq!(values, vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
    assert!(a.iter_broadcast(&[2, 4]).is_err());
}

#[test]
fn test_index_function_mixed_with_array() {
    let a = make_tensor(&[2, 3]);
    let ramp = from_indices(&[3], |i: &[usize]| i[0] as f64 * 100.0);
    let mut out = Array::<f64>::default();
    assign(&mut out, &add(&a, &ramp).unwrap()).unwrap();
    assert_eq!(out.data(), &[1.0, 102.0, 203.0, 4.0, 105.0, 206.0]);
}

#[test]
fn test_functor_views_read_complex() {
    let z = Array::from_vec(
        &[2],
        vec![Complex64::new(1.0, 2.0), Complex64::new(-3.0, 0.5)],
        Layout::RowMajor,
    )
    .unwrap();
    assert_eq!(eval(&real(&z)).data(), &[1.0, -3.0]);
    assert_eq!(eval(&imag(&z)).data(), &[2.0, 0.5]);
    assert_eq!(eval(&conj(&z)).get(&[1]), Complex64::new(-3.0, -0.5));
}

#[test]
fn test_cast_view_truncates() {
    let a = Array::from_vec(&[3], vec![1.9, -1.9, 2.5], Layout::RowMajor).unwrap();
    let ints = eval(&cast::<i64, _>(&a));
    assert_eq!(ints.data(), &[1, -1, 2]);
}

#[test]
fn test_map_over_view_geometry() {
    let a = make_tensor(&[2, 3, 4]);
    let view = a.view().permute(&[2, 0, 1]).unwrap();
    let squared = eval(&map(&view, |x| x * x));
    assert_eq!(squared.shape(), &[4, 2, 3]);
    assert_eq!(squared.get(&[3, 1, 2]), a.get(&[1, 2, 3]).powi(2));
}

#[test]
fn test_sliced_and_inserted_axes() {
    let a = make_tensor(&[4, 4]);
    let diag_block = a.view().slice_axis(0, 1..3, 1).unwrap().slice_axis(1, 1..3, 1).unwrap();
    assert_eq!(eval(&diag_block).data(), &[6.0, 7.0, 10.0, 11.0]);

    let col = a.view().index_axis(1, 0).unwrap().insert_axis(1).unwrap();
    assert_eq!(col.shape(), &[4, 1]);
    let out = eval(&add(&col, &a).unwrap());
    assert_eq!(out.get(&[2, 3]), a.get(&[2, 0]) + a.get(&[2, 3]));
}

#[test]
fn test_reversed_slice() {
    let a = make_tensor(&[5]);
    let rev = a.view().slice_axis(0, 0..5, -1).unwrap();
    assert_eq!(eval(&rev).data(), &[5.0, 4.0, 3.0, 2.0, 1.0]);
}

#[test]
fn test_slice_out_of_range_is_error() {
    let a = make_tensor(&[3]);
    assert!(matches!(
        a.view().slice_axis(0, 1..5, 1),
        Err(ExprError::InvalidRange { axis: 0, .. })
    ));
    assert!(matches!(a.view().slice_axis(0, 0..2, 0), Err(ExprError::ZeroStep { axis: 0 })));
}

#[test]
fn test_view_over_foreign_buffer() {
    let data = [1i32, 2, 3, 4, 5, 6];
    let v = ArrayView::new(&data, &[3, 2], &[1, 3], 0).unwrap();
    assert_eq!(v.iter().collect::<Vec<_>>(), vec![1, 4, 2, 5, 3, 6]);
    assert!(ArrayView::new(&data, &[3, 3], &[1, 3], 0).is_err());
}
