//! ninja-qr blends a QR code pattern into a photograph so the result still looks like the
//! photo but remains machine-decodable.
//!
//! # Pipeline overview
//!
//! 1. **Load**: photo reference (path, URL or bytes) -> straight-alpha [`RasterImage`]
//! 2. **Stage**: the photo is attached to the process-wide [`StagingArea`] and passed through
//!    the settle barrier before its dimensions are read
//! 3. **Composite**: every opaque QR pixel rewrites the photo pixel under it, in place
//! 4. **Export**: the mutated raster is PNG-encoded and handed to a [`SaveSink`]
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic**: channel math is exact integer arithmetic with an explicit
//!   [`ChannelPolicy`] for values outside `0..=255`.
//! - **All or nothing**: a sink only ever receives fully encoded bytes.
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(missing_docs_in_private_items)]

mod assets;
mod composite;
mod encode;
mod foundation;
mod pipeline;

pub use assets::loader::{PhotoSource, RasterSurface, load_photo, read_qr_png, read_qr_raster};
pub use assets::staging::{
    PendingSurface, STAGING_AREA_ID, SettledSurface, StagingArea, StagingSession, StagingStats,
    SurfaceId,
};
pub use composite::stealth::{CompositeStats, composite};
pub use encode::png::{encode_png, export_and_save};
pub use encode::sink::{DEFAULT_FILENAME, DirectorySink, InMemorySink, SaveSink, SavedFile};
pub use foundation::core::{ChannelPolicy, Placement, RasterImage, StealthParams};
pub use foundation::error::{NinjaError, NinjaResult};
pub use pipeline::job::NinjaJob;
pub use pipeline::run::{PipelineOpts, create_ninja_qr_image, create_ninja_qr_image_with};
