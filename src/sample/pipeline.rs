use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    cryptomatte::{
        decode::{decode_matte, decode_segmentation},
        manifest::{Instances, Manifest},
    },
    foundation::core::{BoundingBox, Contour},
    foundation::error::{LimboError, LimboResult},
    geometry::{bbox::compute_bbox, contours::extract_contours},
    graph::evaluator::DerivationGraph,
    graph::stage::{NodeId, Slot, StageKind},
    imaging::layers::{Channel, CryptomatteImage, LayeredImage, Matte},
    imaging::quantize::quantize_rgb8,
    imaging::service::ImageService,
    metadata::model::{ImageRef, SyntheticRef},
    metadata::store::MetadataStore,
};

/// Value flowing along the edges of a sample's derivation graph.
#[derive(Clone, Debug)]
pub enum Artifact {
    Path(PathBuf),
    Manifest(Arc<Manifest>),
    Instances(Instances),
    Image(Arc<LayeredImage>),
    Cryptomatte(Arc<CryptomatteImage>),
    Matte(Arc<Matte>),
    /// `None` when the source matte was identically zero.
    Contours(Option<Arc<Vec<Contour>>>),
    BBox(Option<BoundingBox>),
    /// Output of a persist stage: where the artifact was written.
    Saved(PathBuf),
}

impl Artifact {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Path(_) => "path",
            Self::Manifest(_) => "manifest",
            Self::Instances(_) => "instances",
            Self::Image(_) => "image",
            Self::Cryptomatte(_) => "cryptomatte",
            Self::Matte(_) => "matte",
            Self::Contours(_) => "contours",
            Self::BBox(_) => "bbox",
            Self::Saved(_) => "saved",
        }
    }

    fn mismatch(&self, expected: &str) -> LimboError {
        LimboError::validation(format!(
            "expected {expected} artifact, found {}",
            self.kind()
        ))
    }

    pub fn as_path(&self) -> LimboResult<&Path> {
        match self {
            Self::Path(p) | Self::Saved(p) => Ok(p),
            other => Err(other.mismatch("path")),
        }
    }

    pub fn as_manifest(&self) -> LimboResult<&Manifest> {
        match self {
            Self::Manifest(m) => Ok(m),
            other => Err(other.mismatch("manifest")),
        }
    }

    pub fn as_instances(&self) -> LimboResult<&Instances> {
        match self {
            Self::Instances(i) => Ok(i),
            other => Err(other.mismatch("instances")),
        }
    }

    pub fn as_image(&self) -> LimboResult<&Arc<LayeredImage>> {
        match self {
            Self::Image(i) => Ok(i),
            other => Err(other.mismatch("image")),
        }
    }

    pub fn as_cryptomatte(&self) -> LimboResult<&Arc<CryptomatteImage>> {
        match self {
            Self::Cryptomatte(c) => Ok(c),
            other => Err(other.mismatch("cryptomatte")),
        }
    }

    pub fn as_matte(&self) -> LimboResult<&Arc<Matte>> {
        match self {
            Self::Matte(m) => Ok(m),
            other => Err(other.mismatch("matte")),
        }
    }

    pub fn as_contours(&self) -> LimboResult<Option<&Arc<Vec<Contour>>>> {
        match self {
            Self::Contours(c) => Ok(c.as_ref()),
            other => Err(other.mismatch("contours")),
        }
    }

    pub fn as_bbox(&self) -> LimboResult<Option<BoundingBox>> {
        match self {
            Self::BBox(b) => Ok(*b),
            other => Err(other.mismatch("bbox")),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct RenderNodes {
    image: NodeId,
    depth: NodeId,
    save: NodeId,
}

#[derive(Clone, Copy, Debug)]
struct CryptoNodes {
    load: NodeId,
    matte: NodeId,
    segmentation: NodeId,
    contours: NodeId,
    bbox: NodeId,
}

/// Derivation graph of one sample plus the handles of its well-known nodes.
pub(crate) struct Pipeline {
    graph: DerivationGraph<Artifact>,
    reference: Option<NodeId>,
    render: Option<RenderNodes>,
    crypto: Option<CryptoNodes>,
    selected: HashMap<NodeId, Instances>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Wire the nodes a sample's metadata calls for.
    ///
    /// Filenames resolve against the directory holding the metadata file.
    pub(crate) fn build(store: &MetadataStore, service: Arc<dyn ImageService>) -> LimboResult<Self> {
        let dir = store.path().parent().unwrap_or(Path::new("")).to_path_buf();
        let mut graph = DerivationGraph::new();
        let mut selected = HashMap::new();

        let reference = match store.block::<ImageRef>("image")? {
            Some(image) => {
                let load = add_load_image(&mut graph, "/load-image", service.clone())?;
                graph.set_input(load, Slot::Path, Artifact::Path(dir.join(&image.filename)))?;
                Some(load)
            }
            None => None,
        };

        let synthetic = store.block::<SyntheticRef>("synthetic")?;
        let mut render = None;
        let mut crypto = None;
        if let Some(synthetic) = synthetic {
            let load = add_load_image(&mut graph, "/load-render-image", service.clone())?;
            graph.set_input(
                load,
                Slot::Path,
                Artifact::Path(dir.join(&synthetic.image.filename)),
            )?;
            let image = add_remap(&mut graph, "/remap-render-image", Channel::Color)?;
            let depth = add_remap(&mut graph, "/remap-render-depth", Channel::Depth)?;
            let save = add_save_image(&mut graph, "/save-image", service.clone())?;
            graph.link(load, image, Slot::Image)?;
            graph.link(load, depth, Slot::Image)?;
            graph.link(image, save, Slot::Image)?;
            render = Some(RenderNodes { image, depth, save });

            if let Some(cryptomatte) = synthetic.cryptomatte {
                let manifest = Artifact::Manifest(Arc::new(cryptomatte.manifest));
                let svc = service.clone();
                let load = graph.add_node("/load-cryptomatte", StageKind::Load, move |i| {
                    let path = i.get(Slot::Path)?.as_path()?;
                    Ok(Artifact::Cryptomatte(Arc::new(svc.load_cryptomatte(path)?)))
                })?;
                graph.set_input(
                    load,
                    Slot::Path,
                    Artifact::Path(dir.join(&cryptomatte.filename)),
                )?;

                let matte = graph.add_node("/cryptomatte", StageKind::Decode, |i| {
                    let matte = decode_matte(
                        i.get(Slot::Image)?.as_cryptomatte()?,
                        i.get(Slot::Manifest)?.as_manifest()?,
                        i.get(Slot::Instances)?.as_instances()?,
                    );
                    Ok(Artifact::Matte(Arc::new(matte)))
                })?;
                let segmentation =
                    graph.add_node("/cryptomatte-segmentation", StageKind::Decode, |i| {
                        let image = decode_segmentation(
                            i.get(Slot::Image)?.as_cryptomatte()?,
                            i.get(Slot::Manifest)?.as_manifest()?,
                            i.get(Slot::Instances)?.as_instances()?,
                        )?;
                        Ok(Artifact::Image(Arc::new(image)))
                    })?;
                let contours = graph.add_node("/contours", StageKind::Extract, |i| {
                    let contours = extract_contours(i.get(Slot::Matte)?.as_matte()?);
                    Ok(Artifact::Contours(contours.map(Arc::new)))
                })?;
                let bbox = graph.add_node("/bbox", StageKind::Reduce, |i| {
                    let bbox = i
                        .get(Slot::Contours)?
                        .as_contours()?
                        .and_then(|c| compute_bbox(c));
                    Ok(Artifact::BBox(bbox))
                })?;

                for decoder in [matte, segmentation] {
                    graph.link(load, decoder, Slot::Image)?;
                    graph.set_input(decoder, Slot::Manifest, manifest.clone())?;
                    graph.set_input(
                        decoder,
                        Slot::Instances,
                        Artifact::Instances(Instances::All),
                    )?;
                    selected.insert(decoder, Instances::All);
                }
                graph.link(matte, contours, Slot::Matte)?;
                graph.link(contours, bbox, Slot::Contours)?;
                crypto = Some(CryptoNodes {
                    load,
                    matte,
                    segmentation,
                    contours,
                    bbox,
                });
            }
        }

        Ok(Self {
            graph,
            reference,
            render,
            crypto,
            selected,
        })
    }

    #[cfg(test)]
    pub(crate) fn graph(&self) -> &DerivationGraph<Artifact> {
        &self.graph
    }

    pub(crate) fn reference_image(&mut self) -> LimboResult<Option<Arc<LayeredImage>>> {
        let Some(node) = self.reference else {
            return Ok(None);
        };
        Ok(Some(self.graph.output(node)?.as_image()?.clone()))
    }

    fn render(&self) -> LimboResult<RenderNodes> {
        self.render
            .ok_or_else(|| LimboError::validation("sample has no synthetic render"))
    }

    fn crypto(&self) -> LimboResult<CryptoNodes> {
        self.crypto
            .ok_or_else(|| LimboError::validation("sample has no cryptomatte"))
    }

    pub(crate) fn render_image(&mut self) -> LimboResult<Arc<LayeredImage>> {
        let node = self.render()?.image;
        Ok(self.graph.output(node)?.as_image()?.clone())
    }

    pub(crate) fn render_depth(&mut self) -> LimboResult<Arc<LayeredImage>> {
        let node = self.render()?.depth;
        Ok(self.graph.output(node)?.as_image()?.clone())
    }

    /// Quantize the render's color channels and write them to `path`.
    pub(crate) fn save_render_image(&mut self, path: &Path) -> LimboResult<()> {
        let node = self.render()?.save;
        self.graph
            .set_input(node, Slot::Path, Artifact::Path(path.to_path_buf()))?;
        self.graph.update(node)
    }

    pub(crate) fn cryptomatte_image(&mut self) -> LimboResult<Arc<CryptomatteImage>> {
        let node = self.crypto()?.load;
        Ok(self.graph.output(node)?.as_cryptomatte()?.clone())
    }

    pub(crate) fn matte(&mut self, instances: Instances) -> LimboResult<Arc<Matte>> {
        let nodes = self.crypto()?;
        self.select(nodes.matte, instances)?;
        Ok(self.graph.output(nodes.matte)?.as_matte()?.clone())
    }

    pub(crate) fn contours(
        &mut self,
        instances: Instances,
    ) -> LimboResult<Option<Arc<Vec<Contour>>>> {
        let nodes = self.crypto()?;
        self.select(nodes.matte, instances)?;
        Ok(self.graph.output(nodes.contours)?.as_contours()?.cloned())
    }

    pub(crate) fn bbox(&mut self, instances: Instances) -> LimboResult<Option<BoundingBox>> {
        let nodes = self.crypto()?;
        self.select(nodes.matte, instances)?;
        self.graph.output(nodes.bbox)?.as_bbox()
    }

    pub(crate) fn segmentation(&mut self, instances: Instances) -> LimboResult<Arc<LayeredImage>> {
        let nodes = self.crypto()?;
        self.select(nodes.segmentation, instances)?;
        Ok(self.graph.output(nodes.segmentation)?.as_image()?.clone())
    }

    /// Point a decoder at `instances`, leaving caches alone when nothing changed.
    fn select(&mut self, decoder: NodeId, instances: Instances) -> LimboResult<()> {
        if self.selected.get(&decoder) == Some(&instances) {
            return Ok(());
        }
        self.graph.set_input(
            decoder,
            Slot::Instances,
            Artifact::Instances(instances.clone()),
        )?;
        self.selected.insert(decoder, instances);
        Ok(())
    }
}

fn add_load_image(
    graph: &mut DerivationGraph<Artifact>,
    name: &str,
    service: Arc<dyn ImageService>,
) -> LimboResult<NodeId> {
    graph.add_node(name, StageKind::Load, move |i| {
        let path = i.get(Slot::Path)?.as_path()?;
        Ok(Artifact::Image(Arc::new(service.load(path)?)))
    })
}

fn add_remap(
    graph: &mut DerivationGraph<Artifact>,
    name: &str,
    channel: Channel,
) -> LimboResult<NodeId> {
    graph.add_node(name, StageKind::Remap, move |i| {
        let image = i.get(Slot::Image)?.as_image()?.select(&[channel])?;
        Ok(Artifact::Image(Arc::new(image)))
    })
}

fn add_save_image(
    graph: &mut DerivationGraph<Artifact>,
    name: &str,
    service: Arc<dyn ImageService>,
) -> LimboResult<NodeId> {
    graph.add_node(name, StageKind::Persist, move |i| {
        let path = i.get(Slot::Path)?.as_path()?;
        let bytes = quantize_rgb8(i.get(Slot::Image)?.as_image()?)?;
        service.save(path, &bytes)?;
        tracing::info!(path = %path.display(), width = bytes.width, height = bytes.height, "saved image");
        Ok(Artifact::Saved(path.to_path_buf()))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/sample/pipeline.rs"]
mod tests;
