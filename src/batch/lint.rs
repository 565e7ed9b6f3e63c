use std::sync::atomic::AtomicBool;

use crate::{
    batch::{BatchThreading, Step, materialize::sample_name, run_batch},
    dataset::Dataset,
    foundation::error::LimboResult,
    metadata::store::Record,
    sample::Sample,
};

/// Which repairs [`lint_dataset`] applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LintOptions {
    /// Drop bbox annotations whose width and height are both exactly zero.
    pub delete_empty_bboxes: bool,
    /// Delete samples without a `<name>.cryptomatte.exr` sibling.
    pub delete_missing_cryptomatte: bool,
    /// Delete samples without a `<name>.png` sibling.
    pub delete_missing_image: bool,
    /// Delete samples without a `<name>.exr` sibling.
    pub delete_missing_synthetic: bool,
    /// Report problems without changing anything on disk.
    pub dry_run: bool,
}

/// Findings from one [`lint_dataset`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LintReport {
    pub inspected: usize,
    /// Empty bbox annotations found (and removed unless dry run).
    pub empty_bboxes: usize,
    /// Samples whose metadata was rewritten (or would be, on a dry run).
    pub updated: usize,
    /// Samples deleted (or that would be, on a dry run).
    pub deleted: usize,
    /// Samples that could not be inspected.
    pub skipped: usize,
}

#[derive(Debug, Default)]
struct SampleLint {
    empty_bboxes: usize,
    updated: bool,
    deleted: bool,
}

/// Check every sample of `dataset` and apply the repairs `options` enables.
#[tracing::instrument(skip_all, fields(samples = dataset.len(), dry_run = options.dry_run))]
pub fn lint_dataset(dataset: &Dataset, options: &LintOptions) -> LimboResult<LintReport> {
    let never = AtomicBool::new(false);
    let results = run_batch(dataset.paths(), BatchThreading::default(), &never, |path| {
        let sample = Sample::open_with(path, dataset.service())?;
        lint_sample(sample, options)
    })?;

    let mut report = LintReport::default();
    for (path, step) in results {
        match step {
            Step::Done(found) => {
                report.inspected += 1;
                report.empty_bboxes += found.empty_bboxes;
                report.updated += usize::from(found.updated);
                report.deleted += usize::from(found.deleted);
            }
            Step::Failed(err) => {
                tracing::warn!(sample = %sample_name(&path), error = %err, "skipping sample");
                report.skipped += 1;
            }
            Step::Interrupted => {}
        }
    }
    Ok(report)
}

fn lint_sample(mut sample: Sample, options: &LintOptions) -> LimboResult<SampleLint> {
    let mut found = SampleLint::default();

    if options.delete_empty_bboxes && sample.metadata().contains_key("annotations") {
        let annotations = sample.annotations()?;
        let raw = match sample.metadata().get("annotations") {
            Some(serde_json::Value::Array(raw)) => raw.clone(),
            _ => Vec::new(),
        };
        let total = raw.len();
        let kept = raw
            .into_iter()
            .zip(&annotations)
            .filter(|(_, a)| {
                let empty = a.bbox.is_some_and(|b| b.is_empty());
                if empty {
                    tracing::error!(path = %sample.path().display(), "found empty bounding box");
                }
                !empty
            })
            .map(|(value, _)| value)
            .collect::<Vec<_>>();
        found.empty_bboxes = total - kept.len();
        if found.empty_bboxes > 0 {
            tracing::info!(path = %sample.path().display(), "updating metadata");
            if !options.dry_run {
                sample.update_metadata(Record::from_iter([(
                    "annotations".to_string(),
                    serde_json::Value::Array(kept),
                )]))?;
            }
            found.updated = true;
        }
    }

    let checks = [
        (
            options.delete_missing_cryptomatte,
            sample.default_cryptomatte_path(),
            "cryptomatte image",
        ),
        (
            options.delete_missing_image,
            sample.default_image_path(),
            "reference image",
        ),
        (
            options.delete_missing_synthetic,
            sample.default_synthetic_path(),
            "synthetic image",
        ),
    ];
    for (enabled, path, what) in checks {
        if enabled && !path.exists() {
            tracing::error!(path = %path.display(), "missing {what}");
            found.deleted = true;
        }
    }

    if found.deleted {
        tracing::info!(path = %sample.path().display(), "deleting sample");
        if !options.dry_run {
            sample.delete()?;
        }
    }
    Ok(found)
}

#[cfg(test)]
#[path = "../../tests/unit/batch/lint.rs"]
mod tests;
