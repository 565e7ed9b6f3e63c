use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use walkdir::WalkDir;

use crate::{
    foundation::error::{LimboError, LimboResult},
    imaging::service::{FsImageService, ImageService},
    sample::Sample,
};

/// Union of one or more dataset directories.
///
/// Every `*.json` file below a root is one sample. Hidden files and directories are
/// skipped. Samples are opened lazily, so a malformed sample only fails when it is
/// requested.
pub struct Dataset {
    roots: Vec<PathBuf>,
    samples: Vec<PathBuf>,
    service: Arc<dyn ImageService>,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("roots", &self.roots)
            .field("samples", &self.samples.len())
            .finish_non_exhaustive()
    }
}

impl Dataset {
    pub fn open<I, P>(roots: I) -> LimboResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self::open_with(roots, Arc::new(FsImageService::new()))
    }

    pub fn open_with<I, P>(roots: I, service: Arc<dyn ImageService>) -> LimboResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let roots = roots
            .into_iter()
            .map(|root| {
                let root = root.as_ref();
                std::path::absolute(root).map_err(|e| LimboError::io_at(root, e))
            })
            .collect::<LimboResult<Vec<_>>>()?;

        let mut samples = Vec::new();
        for root in &roots {
            samples.extend(scan(root)?);
        }
        samples.sort();
        tracing::debug!(roots = roots.len(), samples = samples.len(), "scanned dataset");

        Ok(Self {
            roots,
            samples,
            service,
        })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Metadata paths of every sample, sorted.
    pub fn paths(&self) -> &[PathBuf] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn service(&self) -> Arc<dyn ImageService> {
        self.service.clone()
    }

    pub fn get(&self, index: usize) -> Option<LimboResult<Sample>> {
        let path = self.samples.get(index)?;
        Some(Sample::open_with(path, self.service.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = LimboResult<Sample>> + '_ {
        self.samples
            .iter()
            .map(|path| Sample::open_with(path, self.service.clone()))
    }
}

fn scan(root: &Path) -> LimboResult<Vec<PathBuf>> {
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

    let mut out = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            LimboError::io(format!("scan '{}': {e}", root.display()))
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "json")
        {
            out.push(entry.into_path());
        }
    }
    Ok(out)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

#[cfg(test)]
#[path = "../tests/unit/dataset.rs"]
mod tests;
