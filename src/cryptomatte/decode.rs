use std::collections::{BTreeMap, HashMap};

use crate::{
    cryptomatte::manifest::{CryptoHash, Instances, Manifest},
    foundation::core::instance_category,
    foundation::error::LimboResult,
    imaging::layers::{Channel, CryptomatteImage, LayeredImage, Matte},
};

/// ColorBrewer "Set1" qualitative palette.
pub const SET1: [[u8; 3]; 9] = [
    [228, 26, 28],
    [55, 126, 184],
    [77, 175, 74],
    [152, 78, 163],
    [255, 127, 0],
    [255, 255, 51],
    [166, 86, 40],
    [247, 129, 191],
    [153, 153, 153],
];

/// Combined coverage of `instances`.
///
/// Each pixel sums the coverage of every rank whose id matches a requested hash,
/// clamped to `[0, 1]`. Labels missing from the manifest contribute nothing.
pub fn decode_matte(
    image: &CryptomatteImage,
    manifest: &Manifest,
    instances: &Instances,
) -> Matte {
    let wanted = instances.hashes(manifest);
    let mut data = vec![0.0f32; image.pixel_count()];
    if !wanted.is_empty() {
        for rank in &image.ranks {
            for (px, (id, cov)) in data.iter_mut().zip(rank.ids.iter().zip(&rank.coverage)) {
                if wanted.contains(&CryptoHash::from_id(*id)) {
                    *px += cov;
                }
            }
        }
    }
    for v in &mut data {
        *v = v.max(0.0).min(1.0);
    }
    Matte {
        width: image.width,
        height: image.height,
        data,
    }
}

/// Palette color for every manifest category, assigned in category order and cycled.
pub fn category_colors(manifest: &Manifest) -> BTreeMap<String, [u8; 3]> {
    manifest
        .categories()
        .into_iter()
        .zip(SET1.iter().cycle())
        .map(|(category, color)| (category.to_string(), *color))
        .collect()
}

/// Per-pixel segmentation of `instances` as a [`Channel::Color`] image.
///
/// A pixel takes the color of the category of the requested instance with the
/// greatest coverage there (first rank wins ties), or black when none contributes.
pub fn decode_segmentation(
    image: &CryptomatteImage,
    manifest: &Manifest,
    instances: &Instances,
) -> LimboResult<LayeredImage> {
    let palette = category_colors(manifest);
    let colors = instances
        .labels(manifest)
        .into_iter()
        .filter_map(|label| {
            let hash = manifest.get(label)?;
            let rgb = palette.get(instance_category(label))?;
            Some((hash, rgb.map(|c| f32::from(c) / 255.0)))
        })
        .collect::<HashMap<_, _>>();

    let n = image.pixel_count();
    let mut totals: Vec<Vec<(CryptoHash, f32)>> = vec![Vec::new(); n];
    for rank in &image.ranks {
        for (pixel, (id, cov)) in totals.iter_mut().zip(rank.ids.iter().zip(&rank.coverage)) {
            let hash = CryptoHash::from_id(*id);
            if !colors.contains_key(&hash) {
                continue;
            }
            match pixel.iter_mut().find(|(h, _)| *h == hash) {
                Some((_, c)) => *c += cov,
                None => pixel.push((hash, *cov)),
            }
        }
    }

    let mut data = vec![0.0f32; n * 3];
    for (px, pixel) in data.chunks_exact_mut(3).zip(&totals) {
        let best = pixel
            .iter()
            .fold(None::<(CryptoHash, f32)>, |best, &(h, c)| match best {
                Some((_, bc)) if bc >= c => best,
                _ => Some((h, c)),
            });
        if let Some((hash, cov)) = best
            && cov > 0.0
            && let Some(rgb) = colors.get(&hash)
        {
            px.copy_from_slice(rgb);
        }
    }
    LayeredImage::new(image.width, image.height).with_layer(Channel::Color, data)
}

#[cfg(test)]
#[path = "../../tests/unit/cryptomatte/decode.rs"]
mod tests;
