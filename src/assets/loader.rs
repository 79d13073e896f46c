use std::{fmt, path::PathBuf};

use anyhow::Context;
use url::Url;

use crate::foundation::{
    core::RasterImage,
    error::{NinjaError, NinjaResult},
};

/// Reference to the photograph to composite onto.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhotoSource {
    /// Local file.
    Path(PathBuf),
    /// `http://` or `https://` URL (requires the `http` feature).
    Url(String),
    /// Encoded image bytes already in memory.
    Bytes(Vec<u8>),
    /// Pixels decoded elsewhere; taken as-is.
    Raster(RasterImage),
}

impl PhotoSource {
    /// Classify a textual reference: `http(s)://` is a URL, `file://` and anything else a path.
    ///
    /// `file://` URLs are percent-decoded (`file:///tmp/my%20photo.png` names
    /// `/tmp/my photo.png`). Plain paths are taken verbatim.
    pub fn parse(reference: &str) -> Self {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Self::Url(reference.to_string());
        }
        let Some(raw) = reference.strip_prefix("file://") else {
            return Self::Path(PathBuf::from(reference));
        };
        // Unparseable or host-qualified file URLs keep the undecoded remainder so the
        // load error names what the caller wrote.
        match Url::parse(reference).ok().and_then(|u| u.to_file_path().ok()) {
            Some(path) => Self::Path(path),
            None => Self::Path(PathBuf::from(raw)),
        }
    }
}

impl fmt::Display for PhotoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Url(u) => f.write_str(u),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Raster(r) => write!(f, "<raster {}x{}>", r.width(), r.height()),
        }
    }
}

/// Caller-owned surface holding already rendered QR pixels (straight RGBA8, row-major).
pub trait RasterSurface {
    /// `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);
    /// Pixel bytes.
    fn rgba8(&self) -> &[u8];
}

impl RasterSurface for RasterImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn rgba8(&self) -> &[u8] {
        self.data()
    }
}

impl RasterSurface for image::RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        image::RgbaImage::dimensions(self)
    }

    fn rgba8(&self) -> &[u8] {
        self.as_raw()
    }
}

/// Fetch and decode a photo into a straight-alpha RGBA8 raster.
#[tracing::instrument(skip_all, fields(source = %source))]
pub fn load_photo(source: &PhotoSource) -> NinjaResult<RasterImage> {
    if let PhotoSource::Raster(raster) = source {
        return Ok(raster.clone());
    }

    let bytes = fetch_bytes(source)?;
    if bytes.is_empty() {
        return Err(NinjaError::load(format!(
            "photo reference '{source}' returned zero bytes"
        )));
    }

    let dyn_img = image::load_from_memory(&bytes)
        .with_context(|| format!("decode photo '{source}'"))
        .map_err(NinjaError::load_from)?;
    let raster = RasterImage::from(dyn_img.to_rgba8());
    tracing::debug!(
        width = raster.width(),
        height = raster.height(),
        "decoded photo"
    );
    Ok(raster)
}

/// Copy the pixels out of an already rendered QR surface.
pub fn read_qr_raster<S: RasterSurface + ?Sized>(surface: &S) -> NinjaResult<RasterImage> {
    let (width, height) = surface.dimensions();
    if width == 0 || height == 0 {
        return Err(NinjaError::read(format!(
            "qr surface has zero area ({width}x{height})"
        )));
    }
    RasterImage::new(width, height, surface.rgba8().to_vec())
        .map_err(|e| NinjaError::read(format!("qr surface: {e}")))
}

/// Decode an already rendered QR code stored as encoded image bytes.
pub fn read_qr_png(bytes: &[u8]) -> NinjaResult<RasterImage> {
    let dyn_img = image::load_from_memory(bytes)
        .context("decode qr raster")
        .map_err(NinjaError::read_from)?;
    read_qr_raster(&dyn_img.to_rgba8())
}

fn fetch_bytes(source: &PhotoSource) -> NinjaResult<Vec<u8>> {
    match source {
        PhotoSource::Path(p) => std::fs::read(p)
            .with_context(|| format!("read photo '{}'", p.display()))
            .map_err(NinjaError::load_from),
        PhotoSource::Url(url) => fetch_url(url),
        PhotoSource::Bytes(b) => Ok(b.clone()),
        PhotoSource::Raster(_) => Err(NinjaError::load("decoded raster has no encoded bytes")),
    }
}

#[cfg(feature = "http")]
fn fetch_url(url: &str) -> NinjaResult<Vec<u8>> {
    let resp = reqwest::blocking::get(url)
        .and_then(reqwest::blocking::Response::error_for_status)
        .with_context(|| format!("fetch photo '{url}'"))
        .map_err(NinjaError::load_from)?;
    let bytes = resp
        .bytes()
        .with_context(|| format!("read body of '{url}'"))
        .map_err(NinjaError::load_from)?;
    Ok(bytes.to_vec())
}

#[cfg(not(feature = "http"))]
fn fetch_url(url: &str) -> NinjaResult<Vec<u8>> {
    Err(NinjaError::load(format!(
        "cannot fetch '{url}': built without the `http` feature"
    )))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
