use crate::{
    foundation::error::LimboResult,
    imaging::layers::{Channel, LayeredImage, Matte},
};

#[derive(Clone, Debug, PartialEq, Eq)]
/// Interleaved 8-bit pixels ready to be written by an image service.
pub struct ByteImage {
    pub width: u32,
    pub height: u32,
    /// 1 (gray) or 3 (RGB).
    pub channels: u8,
    pub data: Vec<u8>,
}

/// Clip to `[0, 1]` and map to `0..=255`, rounding to nearest.
pub fn quantize_unit(v: f32) -> u8 {
    let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
    (v * 255.0).round() as u8
}

/// Byte-quantize the color layer of a high-dynamic-range image.
pub fn quantize_rgb8(image: &LayeredImage) -> LimboResult<ByteImage> {
    let layer = image.layer(Channel::Color)?;
    Ok(ByteImage {
        width: image.width,
        height: image.height,
        channels: 3,
        data: layer.data.iter().copied().map(quantize_unit).collect(),
    })
}

/// Byte-quantize a coverage matte.
pub fn quantize_gray8(matte: &Matte) -> ByteImage {
    ByteImage {
        width: matte.width,
        height: matte.height,
        channels: 1,
        data: matte.data.iter().copied().map(quantize_unit).collect(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/imaging/quantize.rs"]
mod tests;
