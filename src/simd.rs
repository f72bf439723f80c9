/// Run `f` under the best instruction set detected at runtime.
///
/// Without the `simd` feature this is a plain call. Packet kernels are
/// written as straight loops over fixed-width buffers, so running them inside
/// the dispatched context is enough for the compiler to vectorize them.
#[inline(always)]
pub(crate) fn dispatch<R>(f: impl FnOnce() -> R) -> R {
    #[cfg(feature = "simd")]
    {
        pulp::Arch::new().dispatch(f)
    }
    #[cfg(not(feature = "simd"))]
    {
        f()
    }
}

/// [`dispatch`] for loops of at least `len >= 64` elements, a plain call otherwise.
#[inline(always)]
pub(crate) fn dispatch_if_large<R>(len: usize, f: impl FnOnce() -> R) -> R {
    // Runtime dispatch costs more than it saves on tiny loops.
    if len >= 64 {
        dispatch(f)
    } else {
        f()
    }
}
