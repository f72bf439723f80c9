use approx::assert_relative_eq;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strided_expr::{
    add, assign, assign_into, assign_with, eval, imag_mut, mul, random, real_mut, stride_cut, Array,
    ArrayView, ExprError, Expression, Layout, Scalar, Strategy,
};

fn make_tensor(rows: usize, cols: usize) -> Array<f64> {
    Array::from_fn(&[rows, cols], Layout::RowMajor, |idx| (idx[0] * cols + idx[1]) as f64)
}

const STRATEGIES: [Strategy; 3] = [Strategy::Trivial, Strategy::StridedLoop, Strategy::Generic];

#[test]
fn test_strategies_agree_on_random_broadcasts() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..25 {
        let rank = rng.gen_range(1..=4);
        let shape: Vec<usize> = (0..rank).map(|_| rng.gen_range(1..=9)).collect();
        // each operand drops a random number of leading axes and pins some to 1
        let operand_shape = |rng: &mut StdRng| -> Vec<usize> {
            let skip = rng.gen_range(0..=rank);
            shape[skip..]
                .iter()
                .map(|&d| if rng.gen_bool(0.3) { 1 } else { d })
                .collect()
        };
        let sa = operand_shape(&mut rng);
        let sb = operand_shape(&mut rng);
        let a = random::uniform(&sa, -1.0f64, 1.0, &mut rng).unwrap();
        let b = random::uniform(&sb, -1.0f64, 1.0, &mut rng).unwrap();
        let full = random::uniform(&shape, -1.0f64, 1.0, &mut rng).unwrap();
        let expr = add(mul(&a, &b).unwrap(), &full).unwrap();

        let mut results = Vec::new();
        for strategy in STRATEGIES {
            let mut out = Array::<f64>::new(&shape);
            assign_with(&mut out, &expr, strategy).unwrap();
            results.push(out);
        }
        for pair in results.windows(2) {
            for (x, y) in pair[0].data().iter().zip(pair[1].data().iter()) {
                assert_relative_eq!(x, y, epsilon = 1e-12);
            }
        }
    }
}

#[test]
fn test_strategies_agree_on_column_major_destination() {
    let a = make_tensor(7, 9);
    let mut expected = None;
    for strategy in STRATEGIES {
        let mut out = Array::<f64>::zeros(&[7, 9], Layout::ColumnMajor);
        assign_with(&mut out, &a, strategy).unwrap();
        assert_eq!(out.to_row_major_vec(), a.data());
        if let Some(prev) = expected.replace(out.clone()) {
            assert_eq!(prev, out);
        }
    }
}

#[test]
fn test_broadcast_row_into_matrix() {
    let row = Array::from_vec(&[3], vec![1.0, 2.0, 3.0], Layout::RowMajor).unwrap();
    let mut out = Array::<f64>::new(&[2, 3]);
    assign(&mut out, &row).unwrap();
    assert_eq!(out.data(), &[1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
}

#[test]
fn test_transpose_round_trip() {
    let a = make_tensor(4, 6);
    let mut t = Array::<f64>::default();
    assign(&mut t, &a.transpose()).unwrap();
    assert_eq!(t.shape(), &[6, 4]);

    let mut back = Array::<f64>::default();
    assign(&mut back, &t.transpose()).unwrap();
    assert_eq!(back, a);
}

#[test]
fn test_fixed_destination_rejects_larger_source() {
    let src = Array::from_vec(&[4], vec![1, 2, 3, 4], Layout::RowMajor).unwrap();
    let mut out = Array::from_vec(&[3], vec![7, 8, 9], Layout::RowMajor).unwrap();
    let err = assign_into(&mut out, &src).unwrap_err();
    assert_eq!(
        err,
        ExprError::Broadcast {
            from: vec![4],
            to: vec![3]
        }
    );
    assert_eq!(out.data(), &[7, 8, 9]);
}

#[test]
fn test_float_to_int_truncates_in_every_strategy() {
    let src = Array::from_vec(&[2, 5], vec![3.9999999f64; 10], Layout::RowMajor).unwrap();
    for strategy in STRATEGIES {
        let mut out = Array::<i32>::new(&[2, 5]);
        assign_with(&mut out, &src, strategy).unwrap();
        assert!(out.data().iter().all(|&x| x == 3));
    }
}

#[test]
fn test_round_trip_through_second_destination() {
    let a = make_tensor(3, 5);
    let row = Array::from_vec(&[5], vec![0.5, 1.5, 2.5, 3.5, 4.5], Layout::RowMajor).unwrap();
    let expr = add(&a, &row).unwrap();

    let mut d = Array::<f64>::default();
    assign(&mut d, &expr).unwrap();
    let mut d2 = Array::<f64>::new(&[3, 5]);
    assign(&mut d2, &d).unwrap();

    let materialized = eval(&expr);
    assert_eq!(d2, d);
    assert_eq!(d, materialized);
    assert_eq!(d2.get(&[2, 4]), a.get(&[2, 4]) + 4.5);
}

#[test]
fn test_reassign_is_idempotent() {
    let a = make_tensor(3, 5);
    let mut out = Array::<f64>::default();
    assign(&mut out, &a).unwrap();
    let first = out.clone();
    assign(&mut out, &a).unwrap();
    assert_eq!(out, first);
}

#[test]
fn test_assign_into_strided_view() {
    let mut a = Array::<f64>::new(&[4, 6]);
    let src = make_tensor(4, 3);
    let mut every_other = a.view_mut().slice_axis(1, 0..6, 2).unwrap();
    assign_into(&mut every_other, &src).unwrap();
    for i in 0..4 {
        for j in 0..3 {
            assert_eq!(a.get(&[i, 2 * j]), src.get(&[i, j]));
            assert_eq!(a.get(&[i, 2 * j + 1]), 0.0);
        }
    }
}

#[test]
fn test_padded_rows_take_strided_loop() {
    let data: Vec<f32> = (0..5 * 12).map(|x| x as f32).collect();
    let src = ArrayView::new(&data, &[5, 10], &[12, 1], 0).unwrap();
    let mut out = Array::<f32>::new(&[5, 10]);
    assert_eq!(stride_cut(out.strides(), src.strides()), 1);
    let ran = assign_with(&mut out, &src, Strategy::Trivial).unwrap();
    assert_eq!(ran, Strategy::StridedLoop);
    for i in 0..5 {
        for j in 0..10 {
            assert_eq!(out.get(&[i, j]), (i * 12 + j) as f32);
        }
    }
}

#[test]
fn test_scalar_broadcast_into_rank3() {
    let mut out = Array::<u8>::new(&[2, 3, 4]);
    assign(&mut out, &Scalar(5u8)).unwrap();
    assert_eq!(out.size(), 24);
    assert!(out.data().iter().all(|&x| x == 5));
}

#[test]
fn test_write_complex_parts_through_proxies() {
    let mut z = Array::<Complex64>::new(&[2, 2]);
    let re = make_tensor(2, 2);
    assign_into(&mut real_mut(&mut z), &re).unwrap();
    assign_into(&mut imag_mut(&mut z), &Scalar(-1.0)).unwrap();
    assert_eq!(z.get(&[1, 0]), Complex64::new(2.0, -1.0));
    assert_eq!(z.get(&[0, 1]), Complex64::new(1.0, -1.0));
}

#[test]
fn test_empty_destination() {
    let src = Array::<f64>::new(&[0, 3]);
    let mut out = Array::<f64>::default();
    assign(&mut out, &src).unwrap();
    assert_eq!(out.shape(), &[0, 3]);
    assert!(out.is_empty());
}
