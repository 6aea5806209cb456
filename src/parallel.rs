use crate::errors::{AnalysisError, Result};
use rayon::prelude::*;

/// How per-group work is scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Run independent groups on the rayon pool
    pub parallel: bool,
    /// Dedicated pool size; `None` uses the global rayon pool
    pub num_threads: Option<usize>,
}

impl ExecutionOptions {
    pub fn sequential() -> Self {
        Self::default()
    }

    pub fn parallel() -> Self {
        Self {
            parallel: true,
            num_threads: None,
        }
    }

    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            parallel: true,
            num_threads: Some(num_threads),
        }
    }
}

/// Apply `f` to every item, preserving input order in the output
///
/// Groups are disjoint and `f` is pure, so the parallel path returns
/// exactly what the sequential path would.
pub fn map_ordered<I, T, F>(items: &[I], options: &ExecutionOptions, f: F) -> Result<Vec<T>>
where
    I: Sync,
    T: Send,
    F: Fn(&I) -> Result<T> + Sync + Send,
{
    if !options.parallel || items.len() < 2 {
        return items.iter().map(&f).collect();
    }

    match options.num_threads {
        Some(threads) => compute_with_custom_threads(threads, || {
            items.par_iter().map(&f).collect::<Result<Vec<T>>>()
        })?,
        None => items.par_iter().map(&f).collect(),
    }
}

/// Run `work` inside a dedicated rayon pool of `num_threads` threads
pub fn compute_with_custom_threads<R, W>(num_threads: usize, work: W) -> Result<R>
where
    R: Send,
    W: FnOnce() -> R + Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| AnalysisError::Config(format!("Failed to build thread pool: {}", e)))?;

    log::debug!("Running grouped work on a dedicated pool of {} threads", num_threads);
    Ok(pool.install(work))
}
