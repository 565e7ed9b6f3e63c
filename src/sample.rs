use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    cryptomatte::manifest::{Instances, Manifest},
    foundation::core::{BoundingBox, Contour, instance_category},
    foundation::error::{LimboError, LimboResult},
    imaging::layers::{CryptomatteImage, LayeredImage, Matte},
    imaging::service::{FsImageService, ImageService},
    metadata::model::{Annotation, ImageRef, PNG_CONTENT_TYPE, SyntheticRef},
    metadata::store::{MetadataStore, Record},
};

pub(crate) mod pipeline;

use pipeline::Pipeline;

/// One dataset sample: a JSON metadata file plus the images it references.
///
/// The derivation graph is built on first use of a derived property and lives as
/// long as the sample. Derived reads take `&mut self` because they fill caches.
pub struct Sample {
    store: MetadataStore,
    service: Arc<dyn ImageService>,
    pipeline: Option<Pipeline>,
}

impl std::fmt::Debug for Sample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sample")
            .field("path", &self.store.path())
            .finish_non_exhaustive()
    }
}

impl Sample {
    /// Open the metadata file at `path`, reading pixels from the filesystem.
    pub fn open(path: impl AsRef<Path>) -> LimboResult<Self> {
        Self::open_with(path, Arc::new(FsImageService::new()))
    }

    /// Open the metadata file at `path` with a caller-provided image service.
    pub fn open_with(path: impl AsRef<Path>, service: Arc<dyn ImageService>) -> LimboResult<Self> {
        let path = path.as_ref();
        let path = std::path::absolute(path).map_err(|e| LimboError::io_at(path, e))?;
        Ok(Self {
            store: MetadataStore::load(&path)?,
            service,
            pipeline: None,
        })
    }

    /// File stem of the metadata file.
    pub fn name(&self) -> String {
        self.store
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Absolute path of the metadata file.
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Directory holding the metadata file; referenced filenames resolve against it.
    pub fn dir(&self) -> &Path {
        self.store.path().parent().unwrap_or(Path::new(""))
    }

    pub fn metadata(&self) -> &Record {
        self.store.record()
    }

    pub fn annotations(&self) -> LimboResult<Vec<Annotation>> {
        self.store.annotations()
    }

    /// Every category named by an annotation, whatever its kind.
    pub fn categories(&self) -> LimboResult<BTreeSet<String>> {
        Ok(self
            .store
            .annotations()?
            .into_iter()
            .map(|a| a.category)
            .collect())
    }

    /// Path of the reference image, when the metadata names one.
    pub fn image_path(&self) -> LimboResult<Option<PathBuf>> {
        Ok(self
            .store
            .block::<ImageRef>("image")?
            .map(|image| self.dir().join(image.filename)))
    }

    pub fn default_image_path(&self) -> PathBuf {
        self.dir().join(format!("{}.png", self.name()))
    }

    pub fn default_synthetic_path(&self) -> PathBuf {
        self.dir().join(format!("{}.exr", self.name()))
    }

    pub fn default_cryptomatte_path(&self) -> PathBuf {
        self.dir().join(format!(
            "{}.cryptomatte.exr",
            self.name().replace("image", "cryptomatte")
        ))
    }

    /// Remove the metadata file and any default sibling images that exist.
    pub fn delete(self) -> LimboResult<()> {
        for path in [
            self.default_cryptomatte_path(),
            self.default_image_path(),
            self.default_synthetic_path(),
            self.path().to_path_buf(),
        ] {
            if path.exists() {
                std::fs::remove_file(&path).map_err(|e| LimboError::io_at(&path, e))?;
                tracing::debug!(path = %path.display(), "deleted");
            }
        }
        Ok(())
    }

    /// Merge `updates` into the metadata and persist it.
    ///
    /// Changing `image` or `synthetic` drops the derivation graph; it is rebuilt
    /// from the new metadata on next use.
    pub fn update_metadata(&mut self, updates: Record) -> LimboResult<()> {
        let rewires = updates.contains_key("image") || updates.contains_key("synthetic");
        self.store.update(updates)?;
        if rewires {
            self.pipeline = None;
        }
        Ok(())
    }

    /// The reference image, `None` when the metadata names none.
    pub fn image(&mut self) -> LimboResult<Option<Arc<LayeredImage>>> {
        self.pipeline()?.reference_image()
    }

    /// Synthetic render accessors, `None` for samples without a `synthetic` block.
    pub fn synthetic(&mut self) -> LimboResult<Option<Synthetic<'_>>> {
        let Some(block) = self.store.block::<SyntheticRef>("synthetic")? else {
            return Ok(None);
        };
        Ok(Some(Synthetic {
            sample: self,
            block,
        }))
    }

    /// Shortcut for the cryptomatte of the synthetic render, if any.
    pub fn cryptomatte(&mut self) -> LimboResult<Option<Cryptomatte<'_>>> {
        let manifest = match self.store.block::<SyntheticRef>("synthetic")? {
            Some(SyntheticRef {
                cryptomatte: Some(crypto),
                ..
            }) => crypto.manifest,
            _ => return Ok(None),
        };
        Ok(Some(Cryptomatte {
            sample: self,
            manifest,
        }))
    }

    fn pipeline(&mut self) -> LimboResult<&mut Pipeline> {
        match &mut self.pipeline {
            Some(pipeline) => Ok(pipeline),
            slot => {
                tracing::debug!(path = %self.store.path().display(), "building derivation graph");
                Ok(slot.insert(Pipeline::build(&self.store, self.service.clone())?))
            }
        }
    }
}

/// Accessors for a sample's synthetic render.
#[derive(Debug)]
pub struct Synthetic<'a> {
    sample: &'a mut Sample,
    block: SyntheticRef,
}

impl<'a> Synthetic<'a> {
    /// Metadata reference to the high-dynamic-range render.
    pub fn image_ref(&self) -> &ImageRef {
        &self.block.image
    }

    /// Color channels of the render, full floating point range.
    pub fn image(&mut self) -> LimboResult<Arc<LayeredImage>> {
        self.sample.pipeline()?.render_image()
    }

    /// Depth channel of the render.
    pub fn depth(&mut self) -> LimboResult<Arc<LayeredImage>> {
        self.sample.pipeline()?.render_depth()
    }

    pub fn cryptomatte(self) -> Option<Cryptomatte<'a>> {
        let manifest = self.block.cryptomatte?.manifest;
        Some(Cryptomatte {
            sample: self.sample,
            manifest,
        })
    }

    /// Write a clipped 8-bit PNG of the render beside the metadata file and record it
    /// as the sample's reference `image`.
    #[tracing::instrument(skip(self), fields(sample = %self.sample.name()))]
    pub fn materialize_image(&mut self) -> LimboResult<PathBuf> {
        let image = self.image()?;
        let filename = format!("{}.png", self.sample.name());
        let path = self.sample.dir().join(&filename);
        self.sample.pipeline()?.save_render_image(&path)?;

        let image_ref = ImageRef {
            filename,
            res: Some(image.res()),
            content_type: Some(PNG_CONTENT_TYPE.to_string()),
        };
        self.sample.update_metadata(Record::from_iter([(
            "image".to_string(),
            to_json(&image_ref)?,
        )]))?;
        tracing::info!(path = %path.display(), "materialized reference image");
        Ok(path)
    }
}

/// Accessors for a sample's cryptomatte: mattes, contours, boxes, segmentations.
///
/// Queries take an instance selection (`"car/0"`, a list of labels, or
/// [`Instances::All`]); labels missing from the manifest select nothing.
#[derive(Debug)]
pub struct Cryptomatte<'a> {
    sample: &'a mut Sample,
    manifest: Manifest,
}

impl Cryptomatte<'_> {
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Instance labels present in the manifest, sorted.
    pub fn instances(&self) -> Vec<String> {
        self.manifest.labels().map(str::to_string).collect()
    }

    /// The encoded cryptomatte pass.
    pub fn image(&mut self) -> LimboResult<Arc<CryptomatteImage>> {
        self.sample.pipeline()?.cryptomatte_image()
    }

    pub fn matte(&mut self, instances: impl Into<Instances>) -> LimboResult<Arc<Matte>> {
        self.sample.pipeline()?.matte(instances.into())
    }

    /// Contours of the combined matte; `None` when it has no coverage at all.
    pub fn contours(
        &mut self,
        instances: impl Into<Instances>,
    ) -> LimboResult<Option<Arc<Vec<Contour>>>> {
        self.sample.pipeline()?.contours(instances.into())
    }

    /// Bounding box of the contours; `None` when there are none.
    pub fn bbox(&mut self, instances: impl Into<Instances>) -> LimboResult<Option<BoundingBox>> {
        self.sample.pipeline()?.bbox(instances.into())
    }

    pub fn segmentation(
        &mut self,
        instances: impl Into<Instances>,
    ) -> LimboResult<Arc<LayeredImage>> {
        self.sample.pipeline()?.segmentation(instances.into())
    }

    /// Replace every bbox/contour annotation with freshly derived ones and persist.
    ///
    /// Instances are visited in manifest order; each one with geometry contributes a
    /// contour annotation followed by a bbox annotation. Other annotations keep their
    /// relative order ahead of the new entries.
    #[tracing::instrument(skip(self), fields(sample = %self.sample.name()))]
    pub fn materialize_bounds(&mut self) -> LimboResult<()> {
        let mut annotations = self
            .sample
            .annotations()?
            .into_iter()
            .filter(|a| !a.has_geometry())
            .collect::<Vec<_>>();
        let kept = annotations.len();

        for label in self.instances() {
            let category = instance_category(&label).to_string();
            let Some(contours) = self.contours(label.as_str())? else {
                continue;
            };
            if contours.is_empty() {
                continue;
            }
            let Some(bbox) = self.bbox(label.as_str())? else {
                continue;
            };
            annotations.push(Annotation::with_contours(
                category.clone(),
                contours.as_ref().clone(),
            ));
            annotations.push(Annotation::with_bbox(category, bbox));
        }

        let derived = annotations.len() - kept;
        self.sample.update_metadata(Record::from_iter([(
            "annotations".to_string(),
            to_json(&annotations)?,
        )]))?;
        tracing::info!(annotations = derived, "materialized bounds");
        Ok(())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> LimboResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| LimboError::validation(format!("serialize: {e}")))
}

#[cfg(test)]
#[path = "../tests/unit/sample/sample.rs"]
mod tests;
