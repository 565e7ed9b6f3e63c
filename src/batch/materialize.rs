use std::{path::Path, sync::atomic::AtomicBool};

use crate::{
    batch::{BatchThreading, Step, run_batch},
    dataset::Dataset,
    foundation::error::LimboResult,
    sample::Sample,
};

/// What [`materialize_dataset`] derives for each sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaterializeOptions {
    /// Contour and bbox annotations from the cryptomatte.
    pub bounds: bool,
    /// 8-bit reference PNG from the synthetic render.
    pub images: bool,
    pub threading: BatchThreading,
}

impl MaterializeOptions {
    pub fn all() -> Self {
        Self {
            bounds: true,
            images: true,
            threading: BatchThreading::default(),
        }
    }
}

/// Counts from one [`materialize_dataset`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Samples that completed without error.
    pub processed: usize,
    /// Samples whose failure was logged and skipped.
    pub skipped: usize,
    /// The interrupt flag stopped the batch early.
    pub interrupted: bool,
}

/// Materialize every sample of `dataset`.
///
/// A failing sample is logged and skipped. `interrupt` is checked between samples;
/// once set, the batch stops and the report says so.
#[tracing::instrument(skip_all, fields(samples = dataset.len()))]
pub fn materialize_dataset(
    dataset: &Dataset,
    options: &MaterializeOptions,
    interrupt: &AtomicBool,
) -> LimboResult<MaterializeReport> {
    let results = run_batch(dataset.paths(), options.threading, interrupt, |path| {
        let mut sample = Sample::open_with(path, dataset.service())?;
        materialize_sample(&mut sample, options)
    })?;

    let mut report = MaterializeReport::default();
    for (path, step) in results {
        match step {
            Step::Done(()) => report.processed += 1,
            Step::Failed(err) => {
                tracing::warn!(sample = %sample_name(&path), error = %err, "skipping sample");
                report.skipped += 1;
            }
            Step::Interrupted => report.interrupted = true,
        }
    }
    if report.interrupted {
        tracing::warn!(processed = report.processed, "materialize interrupted");
    }
    tracing::info!(
        processed = report.processed,
        skipped = report.skipped,
        "materialize finished"
    );
    Ok(report)
}

/// Materialize one sample: bounds first, then the reference image.
pub fn materialize_sample(sample: &mut Sample, options: &MaterializeOptions) -> LimboResult<()> {
    if options.bounds
        && let Some(mut cryptomatte) = sample.cryptomatte()?
    {
        cryptomatte.materialize_bounds()?;
    }
    if options.images
        && let Some(mut synthetic) = sample.synthetic()?
    {
        synthetic.materialize_image()?;
    }
    Ok(())
}

pub(crate) fn sample_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
