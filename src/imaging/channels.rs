use std::{collections::BTreeMap, path::Path};

use crate::{
    foundation::error::{LimboError, LimboResult},
    imaging::layers::{Channel, CryptomatteImage, LayeredImage, RankPlane},
};

#[derive(Debug)]
struct Plane {
    values: Vec<f32>,
    full_float: bool,
}

/// Every channel of an OpenEXR file, keyed by its full dotted name.
///
/// Channels of named layers are prefixed with the layer name, so a Blender render
/// yields names like `ViewLayer.Combined.R` and `ViewLayer.CryptoObject00.R`.
#[derive(Debug)]
pub(crate) struct ExrChannels {
    path: String,
    width: u32,
    height: u32,
    channels: BTreeMap<String, Plane>,
}

/// Split `name` into its group prefix and upper-cased component (`"A.b.Z"` gives
/// `("A.b", "Z")`).
fn split_name(name: &str) -> (&str, String) {
    match name.rsplit_once('.') {
        Some((group, component)) => (group, component.to_ascii_uppercase()),
        None => ("", name.to_ascii_uppercase()),
    }
}

/// Trailing two-digit rank index of a cryptomatte layer name (`CryptoObject01`).
fn rank_suffix(group: &str) -> Option<(&str, u32)> {
    let split = group.len().checked_sub(2)?;
    let (stem, digits) = group.split_at_checked(split)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((stem, digits.parse().ok()?))
}

impl ExrChannels {
    /// Read all channels of the largest resolution level.
    ///
    /// Layers whose size differs from the first layer are ignored.
    pub(crate) fn read(path: &Path) -> LimboResult<Self> {
        use exr::prelude::*;

        let image = read()
            .no_deep_data()
            .largest_resolution_level()
            .all_channels()
            .all_layers()
            .all_attributes()
            .from_file(path)
            .map_err(|e| match e {
                exr::error::Error::Io(err) => LimboError::io_at(path, err),
                other => LimboError::decode(format!("exr '{}': {other}", path.display())),
            })?;

        let shown = path.display().to_string();
        let Some(first) = image.layer_data.first() else {
            return Err(LimboError::decode(format!("exr '{shown}' has no layers")));
        };
        let size = first.size;
        let width = u32::try_from(size.0)
            .map_err(|_| LimboError::decode(format!("exr '{shown}' is too wide")))?;
        let height = u32::try_from(size.1)
            .map_err(|_| LimboError::decode(format!("exr '{shown}' is too tall")))?;

        let mut channels = BTreeMap::new();
        for layer in image.layer_data.iter().filter(|l| l.size == size) {
            let prefix = layer.attributes.layer_name.as_ref().map(|n| n.to_string());
            for channel in &layer.channel_data.list {
                let name = match &prefix {
                    Some(prefix) => format!("{prefix}.{}", channel.name),
                    None => channel.name.to_string(),
                };
                let samples = Plane {
                    values: channel.sample_data.values_as_f32().collect(),
                    full_float: matches!(channel.sample_data, FlatSamples::F32(_)),
                };
                channels.insert(name, samples);
            }
        }
        tracing::trace!(path = %shown, channels = channels.len(), "read exr channels");

        Ok(Self {
            path: shown,
            width,
            height,
            channels,
        })
    }

    /// Components of each channel group, grouped by dotted prefix.
    fn groups(&self) -> BTreeMap<&str, BTreeMap<String, &Plane>> {
        let mut groups: BTreeMap<&str, BTreeMap<String, &Plane>> = BTreeMap::new();
        for (name, samples) in &self.channels {
            let (group, component) = split_name(name);
            groups.entry(group).or_default().insert(component, samples);
        }
        groups
    }

    /// The group holding `components`, preferring unprefixed channels and skipping
    /// cryptomatte rank layers.
    fn find<'a>(
        groups: &'a BTreeMap<&str, BTreeMap<String, &'a Plane>>,
        components: &[&str],
    ) -> Option<Vec<&'a Plane>> {
        let pick = |members: &BTreeMap<String, &'a Plane>| {
            components
                .iter()
                .map(|c| members.get(*c).copied())
                .collect::<Option<Vec<_>>>()
        };
        if let Some(found) = groups.get("").and_then(pick) {
            return Some(found);
        }
        groups
            .iter()
            .filter(|(group, _)| !group.is_empty() && rank_suffix(group).is_none())
            .find_map(|(_, members)| pick(members))
    }

    fn interleave(planes: &[&Plane]) -> Vec<f32> {
        let n = planes.first().map_or(0, |p| p.values.len());
        let mut out = Vec::with_capacity(n * planes.len());
        for i in 0..n {
            out.extend(planes.iter().map(|p| p.values[i]));
        }
        out
    }

    /// Color (`R`,`G`,`B`), luminance (`Y`), depth (`Z`) and matte (`A`) layers.
    pub(crate) fn layered(&self) -> LimboResult<LayeredImage> {
        let groups = self.groups();
        let mut out = LayeredImage::new(self.width, self.height);
        if let Some(rgb) = Self::find(&groups, &["R", "G", "B"]) {
            out = out.with_layer(Channel::Color, Self::interleave(&rgb))?;
        } else if let Some(y) = Self::find(&groups, &["Y"]) {
            out = out.with_layer(Channel::Luminance, Self::interleave(&y))?;
        }
        if let Some(z) = Self::find(&groups, &["Z"]) {
            out = out.with_layer(Channel::Depth, Self::interleave(&z))?;
        }
        if let Some(a) = Self::find(&groups, &["A"]) {
            out = out.with_layer(Channel::Matte, Self::interleave(&a))?;
        }
        if out.layers.is_empty() {
            return Err(LimboError::decode(format!(
                "exr '{}' has no color, luminance, depth or matte channels",
                self.path
            )));
        }
        Ok(out)
    }

    /// Cryptomatte ranks from `<Name>00`, `<Name>01`, ... RGBA layers.
    ///
    /// Each rank layer holds two ranks: `R`,`G` are id and coverage of the first,
    /// `B`,`A` of the second. When several cryptomatte types are present the one
    /// named `CryptoObject` wins, then the first by name. Files without rank layers
    /// are read from their unprefixed `R`,`G`(,`B`,`A`) channels.
    pub(crate) fn cryptomatte(&self) -> LimboResult<CryptomatteImage> {
        let groups = self.groups();
        let mut stems: BTreeMap<&str, BTreeMap<u32, &BTreeMap<String, &Plane>>> =
            BTreeMap::new();
        for (group, members) in &groups {
            if let Some((stem, rank)) = rank_suffix(group) {
                stems.entry(stem).or_default().insert(rank, members);
            }
        }

        let layers = match stems
            .iter()
            .find(|(stem, _)| stem.ends_with("CryptoObject"))
            .or_else(|| stems.iter().next())
        {
            Some((_, layers)) => layers.values().copied().collect::<Vec<_>>(),
            None => match groups.get("") {
                Some(members) => vec![members],
                None => Vec::new(),
            },
        };

        let mut ranks = Vec::new();
        for members in layers {
            for (id, coverage) in [("R", "G"), ("B", "A")] {
                let (Some(id), Some(coverage)) = (members.get(id), members.get(coverage)) else {
                    continue;
                };
                if !id.full_float {
                    return Err(LimboError::decode(format!(
                        "cryptomatte '{}' stores ids below 32-bit float precision",
                        self.path
                    )));
                }
                ranks.push(RankPlane {
                    ids: id.values.clone(),
                    coverage: coverage.values.clone(),
                });
            }
        }
        if ranks.is_empty() {
            return Err(LimboError::decode(format!(
                "cryptomatte '{}' has no rank channels",
                self.path
            )));
        }
        CryptomatteImage::new(self.width, self.height, ranks)
    }
}
