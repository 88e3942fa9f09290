//! Order-preserving per-index mapping on the rayon pool
//!
//! Every frame-parallel stage goes through [`map_indices`], which evaluates a
//! pure function per index and collects in index order, so sequential and
//! parallel runs give identical buffers.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Evaluate `f(i)` for `i in 0..n`, in parallel when requested and available
pub(crate) fn map_indices<T, F>(n: usize, parallel: bool, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        if parallel {
            return (0..n).into_par_iter().map(f).collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    (0..n).map(f).collect()
}
