use crate::assets::loader::{PhotoSource, RasterSurface, load_photo, read_qr_raster};
use crate::assets::staging::StagingArea;
use crate::composite::stealth::{CompositeStats, composite};
use crate::encode::png::export_and_save;
use crate::encode::sink::{DEFAULT_FILENAME, SaveSink, validate_filename};
use crate::foundation::core::{Placement, StealthParams};
use crate::foundation::error::NinjaResult;

/// Options for one pipeline run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineOpts {
    /// Channel transform constants and narrowing policy.
    pub params: StealthParams,
    /// Name handed to the sink.
    pub filename: String,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self {
            params: StealthParams::default(),
            filename: DEFAULT_FILENAME.to_string(),
        }
    }
}

/// Load `photo`, blend `qr_surface` in at `placement` and save `ninja.png` into `sink`.
///
/// Uses the process-wide [`StagingArea`] and default [`PipelineOpts`].
pub fn create_ninja_qr_image<S: RasterSurface + ?Sized>(
    photo: &PhotoSource,
    qr_surface: &S,
    placement: Placement,
    sink: &mut dyn SaveSink,
) -> NinjaResult<CompositeStats> {
    create_ninja_qr_image_with(
        StagingArea::global(),
        photo,
        qr_surface,
        placement,
        sink,
        &PipelineOpts::default(),
    )
}

/// [`create_ninja_qr_image`] with an injected staging area and explicit options.
///
/// Either the whole pipeline succeeds and the sink receives one file, or the first error
/// is returned and the sink is never called. Scratch surfaces are detached on every path.
#[tracing::instrument(
    skip_all,
    fields(
        area = staging.id(),
        photo = %photo,
        x = placement.x,
        y = placement.y,
        filename = %opts.filename
    )
)]
pub fn create_ninja_qr_image_with<S: RasterSurface + ?Sized>(
    staging: &StagingArea,
    photo: &PhotoSource,
    qr_surface: &S,
    placement: Placement,
    sink: &mut dyn SaveSink,
    opts: &PipelineOpts,
) -> NinjaResult<CompositeStats> {
    validate_filename(&opts.filename)?;

    let mut session = staging.enter()?;
    let decoded = load_photo(photo)?;

    let mut surface = session.attach(decoded).settle();
    let (width, height) = surface.dimensions();
    tracing::debug!(width, height, "staged photo");

    let qr = read_qr_raster(qr_surface)?;
    let stats = composite(surface.raster_mut(), &qr, placement, &opts.params);

    let result = export_and_save(surface.raster(), &opts.filename, sink);
    session.detach(surface.id());
    let bytes = result?;

    tracing::info!(touched = stats.touched, bytes, "created ninja qr image");
    Ok(stats)
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/run.rs"]
mod tests;
