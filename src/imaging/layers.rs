use std::collections::BTreeMap;

use crate::foundation::error::{LimboError, LimboResult};

/// Channel groups an image can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    /// Linear RGB, three components.
    Color,
    /// Single-component gray.
    Luminance,
    /// Single-component distance from the camera.
    Depth,
    /// Single-component coverage / alpha.
    Matte,
}

impl Channel {
    pub fn components(self) -> usize {
        match self {
            Self::Color => 3,
            Self::Luminance | Self::Depth | Self::Matte => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Luminance => "luminance",
            Self::Depth => "depth",
            Self::Matte => "matte",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
/// One channel group: `components` interleaved `f32` values per pixel, row-major.
pub struct Layer {
    pub components: usize,
    pub data: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq)]
/// Floating point image addressed by [`Channel`].
pub struct LayeredImage {
    pub width: u32,
    pub height: u32,
    pub layers: BTreeMap<Channel, Layer>,
}

impl LayeredImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            layers: BTreeMap::new(),
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Add `channel`, checking the buffer length against the image size.
    pub fn with_layer(mut self, channel: Channel, data: Vec<f32>) -> LimboResult<Self> {
        let components = channel.components();
        if data.len() != self.pixel_count() * components {
            return Err(LimboError::decode(format!(
                "{} layer has {} values, expected {}x{}x{}",
                channel.as_str(),
                data.len(),
                self.width,
                self.height,
                components
            )));
        }
        self.layers.insert(channel, Layer { components, data });
        Ok(self)
    }

    pub fn layer(&self, channel: Channel) -> LimboResult<&Layer> {
        self.layers.get(&channel).ok_or_else(|| {
            LimboError::decode(format!("image has no {} channel", channel.as_str()))
        })
    }

    pub fn has(&self, channel: Channel) -> bool {
        self.layers.contains_key(&channel)
    }

    /// Copy of this image restricted to `channels`; every channel must be present.
    pub fn select(&self, channels: &[Channel]) -> LimboResult<LayeredImage> {
        let mut out = LayeredImage::new(self.width, self.height);
        for &channel in channels {
            out.layers.insert(channel, self.layer(channel)?.clone());
        }
        Ok(out)
    }

    pub fn res(&self) -> [u32; 2] {
        [self.width, self.height]
    }
}

#[derive(Clone, Debug, PartialEq)]
/// Single-channel coverage image, values in `[0, 1]`, row-major.
pub struct Matte {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl Matte {
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> LimboResult<Self> {
        if data.len() != width as usize * height as usize {
            return Err(LimboError::decode(format!(
                "matte has {} values, expected {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn zeros(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width as usize * height as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&v| v == 0.0)
    }

    pub fn into_layered(self) -> LayeredImage {
        let mut out = LayeredImage::new(self.width, self.height);
        out.layers.insert(
            Channel::Matte,
            Layer {
                components: 1,
                data: self.data,
            },
        );
        out
    }
}

#[derive(Clone, Debug, PartialEq)]
/// One cryptomatte rank: per-pixel instance id (a float whose bits are the hash) and coverage.
pub struct RankPlane {
    pub ids: Vec<f32>,
    pub coverage: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq)]
/// Multi-rank encoded render pass, ranks ordered from most to least coverage.
pub struct CryptomatteImage {
    pub width: u32,
    pub height: u32,
    pub ranks: Vec<RankPlane>,
}

impl CryptomatteImage {
    pub fn new(width: u32, height: u32, ranks: Vec<RankPlane>) -> LimboResult<Self> {
        let n = width as usize * height as usize;
        for (i, rank) in ranks.iter().enumerate() {
            if rank.ids.len() != n || rank.coverage.len() != n {
                return Err(LimboError::decode(format!(
                    "cryptomatte rank {i} does not match {width}x{height}"
                )));
            }
        }
        Ok(Self {
            width,
            height,
            ranks,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[cfg(test)]
#[path = "../../tests/unit/imaging/layers.rs"]
mod tests;
