//! Element types and the numeric conversion policy.

use num_complex::Complex;
use num_traits::AsPrimitive;

use crate::{MAX_LANES, SIMD_WIDTH_BYTES};

const fn lanes_for(size: usize) -> usize {
    if size == 0 || size >= SIMD_WIDTH_BYTES {
        1
    } else if SIMD_WIDTH_BYTES / size > MAX_LANES {
        MAX_LANES
    } else {
        SIMD_WIDTH_BYTES / size
    }
}

/// Values that can live in an expression.
///
/// `LANES` is the packet width used by the bulk strategies. A width of 1
/// disables packet execution for the type.
pub trait Element: Copy + Default + 'static {
    /// Number of elements moved per packet (`1..=MAX_LANES`).
    const LANES: usize = lanes_for(std::mem::size_of::<Self>());
}

macro_rules! impl_element {
    ($($t:ty),*) => {
        $(impl Element for $t {})*
    };
}

impl_element!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl Element for bool {
    const LANES: usize = 1;
}

impl<T: Element> Element for Complex<T> {}

/// Explicit per-element conversion applied when assigning between element types.
///
/// Primitive numeric pairs follow `as` semantics: float to integer truncates
/// toward zero and saturates, integer narrowing wraps, widening is exact.
/// The conversion is applied identically by every assignment strategy.
pub trait NumericCast<D>: Copy {
    fn cast(self) -> D;
}

macro_rules! impl_numeric_cast_from {
    ($src:ty => $($dst:ty),*) => {
        $(
            impl NumericCast<$dst> for $src {
                #[inline(always)]
                fn cast(self) -> $dst {
                    AsPrimitive::<$dst>::as_(self)
                }
            }
        )*
    };
}

macro_rules! impl_numeric_cast {
    ($($src:ty),*) => {
        $(
            impl_numeric_cast_from!($src => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);
        )*
    };
}

impl_numeric_cast!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl NumericCast<bool> for bool {
    #[inline(always)]
    fn cast(self) -> bool {
        self
    }
}

impl_numeric_cast_from!(bool => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl<T, U> NumericCast<Complex<U>> for Complex<T>
where
    T: NumericCast<U>,
{
    #[inline(always)]
    fn cast(self) -> Complex<U> {
        Complex::new(self.re.cast(), self.im.cast())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lanes() {
        assert_eq!(<f64 as Element>::LANES, 4);
        assert_eq!(<f32 as Element>::LANES, 8);
        assert_eq!(<u8 as Element>::LANES, 32);
        assert_eq!(<bool as Element>::LANES, 1);
        assert_eq!(<Complex<f64> as Element>::LANES, 2);
        assert_eq!(<Complex<f32> as Element>::LANES, 4);
        assert_eq!(<u128 as Element>::LANES, 2);
    }

    #[test]
    fn test_float_to_int_truncates() {
        let x: i32 = 3.9999999f64.cast();
        assert_eq!(x, 3);
        let y: i32 = (-2.7f64).cast();
        assert_eq!(y, -2);
    }

    #[test]
    fn test_float_to_int_saturates() {
        let x: u8 = 300.0f64.cast();
        assert_eq!(x, 255);
        let y: u8 = (-1.0f64).cast();
        assert_eq!(y, 0);
    }

    #[test]
    fn test_int_narrowing_wraps() {
        let x: u8 = 257i32.cast();
        assert_eq!(x, 1);
    }

    #[test]
    fn test_complex_cast() {
        let z: Complex<f32> = Complex::new(1.5f64, -2.25).cast();
        assert_eq!(z, Complex::new(1.5f32, -2.25));
    }
}
