//! Dataset-wide operations: materialize, lint, mask export.

use std::{
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use rayon::prelude::*;

use crate::foundation::error::{LimboError, LimboResult};

pub(crate) mod lint;
pub(crate) mod masks;
pub(crate) mod materialize;

/// How a batch spreads samples over threads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchThreading {
    /// Process samples on a rayon pool, one worker per sample.
    pub parallel: bool,
    /// Pool size; `None` lets rayon decide. `Some(0)` is rejected.
    pub threads: Option<usize>,
}

/// Outcome of one sample inside a batch.
#[derive(Debug)]
pub(crate) enum Step<T> {
    Done(T),
    Failed(LimboError),
    Interrupted,
}

fn build_thread_pool(threads: Option<usize>) -> LimboResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(LimboError::validation(
            "batch threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| LimboError::validation(format!("failed to build rayon thread pool: {e}")))
}

/// Run `work` over `paths`, checking `interrupt` before each sample.
///
/// Results keep the order of `paths`. Once the flag is seen, no further sample
/// starts; samples already running finish.
pub(crate) fn run_batch<T, F>(
    paths: &[PathBuf],
    threading: BatchThreading,
    interrupt: &AtomicBool,
    work: F,
) -> LimboResult<Vec<(PathBuf, Step<T>)>>
where
    T: Send,
    F: Fn(&PathBuf) -> LimboResult<T> + Sync,
{
    let step = |path: &PathBuf| -> (PathBuf, Step<T>) {
        if interrupt.load(Ordering::SeqCst) {
            return (path.clone(), Step::Interrupted);
        }
        match work(path) {
            Ok(v) => (path.clone(), Step::Done(v)),
            Err(e) => (path.clone(), Step::Failed(e)),
        }
    };

    if !threading.parallel {
        let mut out = Vec::with_capacity(paths.len());
        for path in paths {
            let result = step(path);
            let stop = matches!(result.1, Step::Interrupted);
            out.push(result);
            if stop {
                break;
            }
        }
        return Ok(out);
    }

    let pool = build_thread_pool(threading.threads)?;
    Ok(pool.install(|| paths.par_iter().map(step).collect()))
}

#[cfg(test)]
#[path = "../tests/unit/batch/batch.rs"]
mod tests;
