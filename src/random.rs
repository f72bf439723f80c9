//! Random array builders.
//!
//! Every builder draws from a generator owned by the caller, so results are
//! reproducible by seeding that generator.

use rand::distributions::uniform::SampleUniform;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use rand_distr::{Normal, StandardNormal};

use crate::array::Array;
use crate::element::Element;
use crate::layout::Layout;
use crate::{ExprError, Result};

fn check_interval<T: PartialOrd + std::fmt::Debug>(low: &T, high: &T) -> Result<()> {
    if low < high {
        Ok(())
    } else {
        Err(ExprError::Distribution(format!(
            "empty interval [{low:?}, {high:?})"
        )))
    }
}

/// Samples from the half-open interval `[low, high)`.
///
/// # Errors
/// Returns `Distribution` if `low >= high`.
///
/// # Example
/// ```
/// use rand::{rngs::StdRng, SeedableRng};
/// use strided_expr::random;
///
/// let mut rng = StdRng::seed_from_u64(42);
/// let a = random::uniform(&[2, 3], 0.0f64, 1.0, &mut rng).unwrap();
/// assert!(a.data().iter().all(|&x| (0.0..1.0).contains(&x)));
/// ```
pub fn uniform<T, R>(shape: &[usize], low: T, high: T, rng: &mut R) -> Result<Array<T>>
where
    T: Element + SampleUniform + PartialOrd + std::fmt::Debug,
    R: Rng + ?Sized,
{
    check_interval(&low, &high)?;
    let dist = Uniform::new(low, high);
    Ok(Array::from_fn(shape, Layout::RowMajor, |_| dist.sample(&mut *rng)))
}

/// Integers from the half-open interval `[low, high)`.
///
/// # Errors
/// Returns `Distribution` if `low >= high`.
pub fn randint<T, R>(shape: &[usize], low: T, high: T, rng: &mut R) -> Result<Array<T>>
where
    T: Element + SampleUniform + num_traits::PrimInt + std::fmt::Debug,
    R: Rng + ?Sized,
{
    uniform(shape, low, high, rng)
}

/// Samples from a normal distribution.
///
/// # Errors
/// Returns `Distribution` if `std_dev` is negative or NaN.
pub fn normal<T, R>(shape: &[usize], mean: T, std_dev: T, rng: &mut R) -> Result<Array<T>>
where
    T: Element + num_traits::Float,
    StandardNormal: Distribution<T>,
    R: Rng + ?Sized,
{
    let dist = Normal::new(mean, std_dev).map_err(|e| ExprError::Distribution(e.to_string()))?;
    Ok(Array::from_fn(shape, Layout::RowMajor, |_| dist.sample(&mut *rng)))
}
