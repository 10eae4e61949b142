//! Optional rayon parallelism for the per-(event, unit) loops.
//!
//! With the `parallel` feature (on by default) these macros expand to rayon
//! parallel iterators; without it they fall back to the sequential std
//! iterators. Both expansions yield items in index order, so results do not
//! depend on the feature.
//!
//! ```ignore
//! use crate::parallel::iter_maybe_parallel;
//!
//! let per_event: Vec<_> = iter_maybe_parallel!((0..n_events))
//!     .map(|e| extract_event(e))
//!     .collect();
//! ```

/// Conditionally parallel iteration over an owned range or collection.
///
/// Callers need `rayon::iter::ParallelIterator` in scope under the
/// `parallel` feature to chain adapters.
macro_rules! iter_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::iter::IntoParallelIterator;

            IntoParallelIterator::into_par_iter($expr)
        }
        #[cfg(not(feature = "parallel"))]
        {
            IntoIterator::into_iter($expr)
        }
    }};
}

/// Enumerated chunk iteration over a mutable slice.
///
/// Each chunk is handed to the closure together with its index; chunks never
/// overlap, so the closure can write without synchronization.
macro_rules! maybe_par_chunks_mut_enumerate {
    ($slice:expr, $chunk_size:expr, $closure:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            $slice
                .par_chunks_mut($chunk_size)
                .enumerate()
                .for_each($closure);
        }
        #[cfg(not(feature = "parallel"))]
        {
            $slice
                .chunks_mut($chunk_size)
                .enumerate()
                .for_each($closure);
        }
    }};
}

pub(crate) use iter_maybe_parallel;
pub(crate) use maybe_par_chunks_mut_enumerate;
