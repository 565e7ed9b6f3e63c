//! Limbo manages computer-vision training datasets.
//!
//! A dataset is a directory tree of per-sample JSON metadata files with sibling images.
//! Synthetic samples carry a cryptomatte: a multi-rank render pass that encodes, per
//! pixel, which object instances contribute and how much. Limbo turns that pass into
//! coverage mattes, sub-pixel contours and bounding boxes, and writes them back into the
//! metadata as annotations.
//!
//! # Pipeline overview
//!
//! Each [`Sample`] lazily builds a [`DerivationGraph`] over [`Artifact`] values:
//!
//! 1. **Load**: read the render and the cryptomatte through an [`ImageService`]
//! 2. **Decode**: `cryptomatte + manifest + instances -> Matte` ([`decode_matte`])
//! 3. **Extract**: `Matte -> contours` at coverage 0.5 ([`extract_contours`])
//! 4. **Reduce**: `contours -> BoundingBox` ([`compute_bbox`])
//! 5. **Persist**: annotations and an 8-bit reference PNG back to disk
//!
//! Reading a node evaluates its uncached ancestors once; changing an input drops the
//! caches downstream of it, so one decode/extract/reduce chain serves every instance
//! query on a sample.
//!
//! Dataset-wide operations live in [`materialize_dataset`], [`lint_dataset`] and
//! [`export_masks`]; the `limbo` binary wraps them.
#![forbid(unsafe_code)]

mod batch;
mod cryptomatte;
mod dataset;
mod foundation;
mod geometry;
mod graph;
mod imaging;
mod metadata;
mod sample;

pub use batch::BatchThreading;
pub use batch::lint::{LintOptions, LintReport, lint_dataset};
pub use batch::masks::{MaskReport, MaskSpec, export_masks, mask_path};
pub use batch::materialize::{
    MaterializeOptions, MaterializeReport, materialize_dataset, materialize_sample,
};
pub use cryptomatte::decode::{SET1, category_colors, decode_matte, decode_segmentation};
pub use cryptomatte::manifest::{CryptoHash, Instances, Manifest};
pub use dataset::Dataset;
pub use foundation::core::{BoundingBox, Contour, Point, Rect, instance_category};
pub use foundation::error::{LimboError, LimboResult};
pub use geometry::bbox::compute_bbox;
pub use geometry::contours::{ISO_LEVEL, ccw, extract_contours, signed_area};
pub use graph::evaluator::{DerivationGraph, Inputs, Task};
pub use graph::stage::{NodeId, Slot, StageKind};
pub use imaging::layers::{Channel, CryptomatteImage, Layer, LayeredImage, Matte, RankPlane};
pub use imaging::quantize::{ByteImage, quantize_gray8, quantize_rgb8, quantize_unit};
pub use imaging::service::{FsImageService, ImageService, MemoryImageService};
pub use metadata::model::{
    Annotation, BBOX_MODE_XYWH_ABS, CONTOUR_MODE_XY_ABS, CryptomatteRef, ImageRef,
    PNG_CONTENT_TYPE, Provenance, SyntheticRef,
};
pub use metadata::store::{MetadataStore, Record};
pub use sample::pipeline::Artifact;
pub use sample::{Cryptomatte, Sample, Synthetic};
