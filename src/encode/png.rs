use anyhow::Context;
use image::ImageEncoder as _;

use crate::encode::sink::SaveSink;
use crate::foundation::{
    core::RasterImage,
    error::{NinjaError, NinjaResult},
};

/// Losslessly encode `raster` as an RGBA8 PNG.
pub fn encode_png(raster: &RasterImage) -> NinjaResult<Vec<u8>> {
    if raster.is_empty() {
        return Err(NinjaError::encode(format!(
            "cannot encode empty raster ({}x{})",
            raster.width(),
            raster.height()
        )));
    }

    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(
            raster.data(),
            raster.width(),
            raster.height(),
            image::ExtendedColorType::Rgba8,
        )
        .context("encode png")
        .map_err(NinjaError::encode_from)?;
    Ok(buf)
}

/// Encode `photo` and hand the bytes to `sink` under `filename`.
///
/// Returns the encoded size. The sink is not called when encoding fails.
#[tracing::instrument(skip(photo, sink), fields(width = photo.width(), height = photo.height()))]
pub fn export_and_save(
    photo: &RasterImage,
    filename: &str,
    sink: &mut dyn SaveSink,
) -> NinjaResult<usize> {
    let bytes = encode_png(photo)?;
    tracing::debug!(bytes = bytes.len(), "encoded png");
    sink.save(filename, &bytes)?;
    Ok(bytes.len())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/png.rs"]
mod tests;
