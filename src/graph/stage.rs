/// Index of a node inside a [`crate::DerivationGraph`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Fixed set of stage kinds a derivation node can belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Reads pixels from disk through the image service.
    Load,
    /// Selects channel groups out of a loaded image.
    Remap,
    /// Decodes cryptomatte ranks into a coverage matte or segmentation.
    Decode,
    /// Traces iso-level contours from a matte.
    Extract,
    /// Reduces contours to a bounding box.
    Reduce,
    /// Writes a derived artifact back to disk.
    Persist,
}

impl StageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Remap => "remap",
            Self::Decode => "decode",
            Self::Extract => "extract",
            Self::Reduce => "reduce",
            Self::Persist => "persist",
        }
    }
}

/// Named input slot of a derivation node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Path,
    Image,
    Manifest,
    Instances,
    Matte,
    Contours,
}

impl Slot {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Image => "image",
            Self::Manifest => "manifest",
            Self::Instances => "instances",
            Self::Matte => "matte",
            Self::Contours => "contours",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
