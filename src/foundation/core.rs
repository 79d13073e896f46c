use crate::foundation::error::{NinjaError, NinjaResult};
use crate::foundation::math::stealth_channel;

/// Rectangular straight-alpha RGBA8 pixel buffer.
///
/// Invariant: `data.len() == width * height * 4`, row-major, channel order R,G,B,A.
/// Zero-area rasters are representable; the pipeline rejects them where they matter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterImage {
    /// Wrap an existing RGBA8 buffer, validating its length against the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> NinjaResult<Self> {
        let expected = byte_len(width, height)?;
        if data.len() != expected {
            return Err(NinjaError::validation(format!(
                "raster {width}x{height} expects {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create a raster with every pixel set to `px`.
    pub fn filled(width: u32, height: u32, px: [u8; 4]) -> NinjaResult<Self> {
        let len = byte_len(width, height)?;
        let data = px.repeat(len / 4);
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create a fully transparent raster.
    pub fn transparent(width: u32, height: u32) -> NinjaResult<Self> {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `true` when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Borrow the raw RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutably borrow the raw RGBA8 bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the raster and return its RGBA8 bytes.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Byte offset of pixel `(x, y)`, or `None` when outside the raster.
    pub fn pixel_offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(((y as usize) * (self.width as usize) + (x as usize)) * 4)
    }

    /// Read pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let i = self.pixel_offset(x, y)?;
        let d = &self.data;
        Some([d[i], d[i + 1], d[i + 2], d[i + 3]])
    }

    /// Overwrite pixel `(x, y)`. Returns `false` when outside the raster.
    pub fn set_pixel(&mut self, x: u32, y: u32, px: [u8; 4]) -> bool {
        match self.pixel_offset(x, y) {
            Some(i) => {
                self.data[i..i + 4].copy_from_slice(&px);
                true
            }
            None => false,
        }
    }
}

impl From<image::RgbaImage> for RasterImage {
    fn from(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}

fn byte_len(width: u32, height: u32) -> NinjaResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| NinjaError::validation(format!("raster {width}x{height} size overflow")))
}

/// Top-left offset of the QR origin in photo pixel space.
///
/// Any value is legal; QR pixels landing outside the photo are skipped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Placement {
    /// Horizontal offset in pixels.
    pub x: i64,
    /// Vertical offset in pixels.
    pub y: i64,
}

impl Placement {
    /// Create a placement at `(x, y)`.
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// How a transformed channel value outside `0..=255` is narrowed to a byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelPolicy {
    /// Round to nearest (ties to even), then saturate to `0..=255`.
    #[default]
    Clamp,
    /// Truncate toward zero, then wrap modulo 256.
    Wrap,
}

/// Constants of the stealth channel transform `c' = (c - mid_gray) * gain`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StealthParams {
    /// Gray level subtracted before amplification.
    pub mid_gray: u8,
    /// Gain in tenths (`17` is a gain of 1.7).
    pub gain_tenths: u16,
    /// Alpha forced onto every touched pixel.
    pub overlay_alpha: u8,
    /// Narrowing policy for out-of-range results.
    pub policy: ChannelPolicy,
}

impl Default for StealthParams {
    fn default() -> Self {
        Self {
            mid_gray: 105,
            gain_tenths: 17,
            overlay_alpha: 150,
            policy: ChannelPolicy::Clamp,
        }
    }
}

impl StealthParams {
    /// Same constants with a different narrowing policy.
    pub fn with_policy(self, policy: ChannelPolicy) -> Self {
        Self { policy, ..self }
    }

    /// Apply the channel transform to one color channel.
    pub fn transform_channel(&self, c: u8) -> u8 {
        stealth_channel(c, self.mid_gray, self.gain_tenths, self.policy)
    }

    /// Apply the full pixel rewrite: RGB transformed, alpha forced.
    pub fn transform_pixel(&self, px: [u8; 4]) -> [u8; 4] {
        [
            self.transform_channel(px[0]),
            self.transform_channel(px[1]),
            self.transform_channel(px[2]),
            self.overlay_alpha,
        ]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
