use std::{path::PathBuf, sync::atomic::AtomicBool};

use regex::Regex;

use crate::{
    batch::{BatchThreading, Step, materialize::sample_name, run_batch},
    cryptomatte::manifest::Instances,
    dataset::Dataset,
    foundation::error::{LimboError, LimboResult},
    imaging::quantize::quantize_gray8,
    sample::Sample,
};

/// A named mask: the union of every instance whose label matches `pattern`.
#[derive(Clone, Debug)]
pub struct MaskSpec {
    pub name: String,
    pub pattern: Regex,
}

impl MaskSpec {
    pub fn new(name: &str, pattern: &str) -> LimboResult<Self> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(LimboError::malformed_request(format!(
                "mask name '{name}' must be a non-empty file name fragment"
            )));
        }
        let pattern = Regex::new(pattern).map_err(|e| {
            LimboError::malformed_request(format!("mask '{name}' pattern: {e}"))
        })?;
        Ok(Self {
            name: name.to_string(),
            pattern,
        })
    }

    /// Parse `[name, pattern, name, pattern, ...]`.
    pub fn parse_pairs<S: AsRef<str>>(args: &[S]) -> LimboResult<Vec<Self>> {
        if args.len() % 2 != 0 {
            return Err(LimboError::malformed_request(format!(
                "masks need <name> <pattern> pairs, got {} argument(s)",
                args.len()
            )));
        }
        args.chunks_exact(2)
            .map(|pair| Self::new(pair[0].as_ref(), pair[1].as_ref()))
            .collect()
    }

    /// Labels matched anywhere by the pattern, in input order.
    pub fn select<'a>(&self, labels: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        labels
            .into_iter()
            .filter(|label| self.pattern.is_match(label))
            .map(str::to_string)
            .collect()
    }
}

/// Counts from one [`export_masks`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaskReport {
    /// Mask files written.
    pub written: usize,
    /// Samples without a cryptomatte.
    pub without_cryptomatte: usize,
    /// Samples that failed and were skipped.
    pub skipped: usize,
}

/// File a mask is exported to: `<sample>.mask-<mask>.png` beside the metadata.
pub fn mask_path(sample: &Sample, mask: &MaskSpec) -> PathBuf {
    sample
        .dir()
        .join(format!("{}.mask-{}.png", sample.name(), mask.name))
}

/// Write one 8-bit gray PNG per sample and mask.
#[tracing::instrument(skip_all, fields(samples = dataset.len(), masks = specs.len()))]
pub fn export_masks(dataset: &Dataset, specs: &[MaskSpec]) -> LimboResult<MaskReport> {
    let never = AtomicBool::new(false);
    let results = run_batch(dataset.paths(), BatchThreading::default(), &never, |path| {
        let mut sample = Sample::open_with(path, dataset.service())?;
        let targets = specs
            .iter()
            .map(|spec| (mask_path(&sample, spec), spec))
            .collect::<Vec<_>>();
        let Some(mut cryptomatte) = sample.cryptomatte()? else {
            return Ok(None);
        };
        let labels = cryptomatte.instances();
        let mut written = 0usize;
        for (target, spec) in targets {
            let selected = spec.select(labels.iter().map(String::as_str));
            let matte = cryptomatte.matte(Instances::Only(selected))?;
            dataset.service().save(&target, &quantize_gray8(&matte))?;
            tracing::debug!(path = %target.display(), mask = %spec.name, "wrote mask");
            written += 1;
        }
        Ok(Some(written))
    })?;

    let mut report = MaskReport::default();
    for (path, step) in results {
        match step {
            Step::Done(Some(n)) => report.written += n,
            Step::Done(None) => report.without_cryptomatte += 1,
            Step::Failed(err) => {
                tracing::warn!(sample = %sample_name(&path), error = %err, "skipping sample");
                report.skipped += 1;
            }
            Step::Interrupted => {}
        }
    }
    tracing::info!(written = report.written, "exported masks");
    Ok(report)
}

#[cfg(test)]
#[path = "../../tests/unit/batch/masks.rs"]
mod tests;
