use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use strided_expr::{
    arange, assign, eval, eye, full, linspace, mul, ones, pad, pad_uniform, random, Array,
    ExprError, Expression, Layout, PadMode,
};

#[test]
fn test_builders_compose_with_arrays() {
    let x = arange(0.0f64, 3.0, 1.0).unwrap();
    let scale = full(&[2, 1], 10.0f64);
    let mut out = Array::<f64>::default();
    assign(&mut out, &mul(&scale, &x).unwrap()).unwrap();
    assert_eq!(out.shape(), &[2, 3]);
    assert_eq!(out.data(), &[0.0, 10.0, 20.0, 0.0, 10.0, 20.0]);
}

#[test]
fn test_eye_times_ones() {
    let m = eval(&mul(eye::<i32>(3, 0), ones::<i32>(&[3])).unwrap());
    assert_eq!(m.data(), &[1, 0, 0, 0, 1, 0, 0, 0, 1]);
    let lower = eval(&eye::<u8>(3, -1));
    assert_eq!(lower.get(&[1, 0]), 1);
    assert_eq!(lower.get(&[0, 1]), 0);
}

#[test]
fn test_linspace_endpoints() {
    let l = eval(&linspace(-1.0f64, 1.0, 9, true));
    assert_relative_eq!(l.get(&[0]), -1.0);
    assert_relative_eq!(l.get(&[4]), 0.0, epsilon = 1e-15);
    assert_eq!(l.get(&[8]), 1.0);
}

#[test]
fn test_pad_every_mode_on_matrix() {
    let a = Array::from_vec(&[2, 3], vec![1, 2, 3, 4, 5, 6], Layout::RowMajor).unwrap();
    let widths = [(1, 0), (0, 2)];

    let c = pad(&a, &widths, PadMode::Constant, -1).unwrap();
    assert_eq!(c.shape(), &[3, 5]);
    assert_eq!(c.data(), &[-1, -1, -1, -1, -1, 1, 2, 3, -1, -1, 4, 5, 6, -1, -1]);

    let s = pad(&a, &widths, PadMode::Symmetric, 0).unwrap();
    assert_eq!(s.data(), &[1, 2, 3, 3, 2, 1, 2, 3, 3, 2, 4, 5, 6, 6, 5]);

    let r = pad(&a, &widths, PadMode::Reflect, 0).unwrap();
    assert_eq!(r.data(), &[4, 5, 6, 5, 4, 1, 2, 3, 2, 1, 4, 5, 6, 5, 4]);

    let w = pad(&a, &widths, PadMode::Wrap, 0).unwrap();
    assert_eq!(w.data(), &[4, 5, 6, 4, 5, 1, 2, 3, 1, 2, 4, 5, 6, 4, 5]);
}

#[test]
fn test_pad_lazy_source() {
    let p = pad_uniform(&arange(1i32, 4, 1).unwrap(), 1, PadMode::Symmetric, 0).unwrap();
    assert_eq!(p.data(), &[1, 1, 2, 3, 3]);
}

#[test]
fn test_pad_width_rejected_before_evaluation() {
    let a = Array::from_vec(&[2, 2], vec![1.0, 2.0, 3.0, 4.0], Layout::RowMajor).unwrap();
    assert_eq!(
        pad(&a, &[(0, 0), (2, 0)], PadMode::Reflect, 0.0).unwrap_err(),
        ExprError::InvalidPadWidth {
            axis: 1,
            before: 2,
            after: 0,
            extent: 2
        }
    );
}

#[test]
fn test_seeded_random_is_reproducible() {
    let a = random::normal(&[3, 3], 0.0f64, 1.0, &mut StdRng::seed_from_u64(99)).unwrap();
    let b = random::normal(&[3, 3], 0.0f64, 1.0, &mut StdRng::seed_from_u64(99)).unwrap();
    let c = random::normal(&[3, 3], 0.0f64, 1.0, &mut StdRng::seed_from_u64(100)).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.size(), 9);
}

#[test]
fn test_random_arrays_feed_expressions() {
    let mut rng = StdRng::seed_from_u64(5);
    let a = random::randint(&[4, 4], 0i32, 10, &mut rng).unwrap();
    let doubled = eval(&mul(&a, full(&[], 2i32)).unwrap());
    for (x, y) in a.data().iter().zip(doubled.data().iter()) {
        assert_eq!(2 * x, *y);
    }
}
