use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::assets::loader::{PhotoSource, read_qr_png};
use crate::assets::staging::StagingArea;
use crate::composite::stealth::CompositeStats;
use crate::encode::sink::{DEFAULT_FILENAME, DirectorySink};
use crate::foundation::core::{Placement, StealthParams};
use crate::foundation::error::{NinjaError, NinjaResult};
use crate::pipeline::run::{PipelineOpts, create_ninja_qr_image_with};

/// JSON job description for one composite.
///
/// Relative `photo`, `qr` and `out_dir` are resolved against the job file's directory.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NinjaJob {
    /// Photo reference: path, `file://` or `http(s)://` URL.
    pub photo: String,
    /// Already rendered QR code image.
    pub qr: PathBuf,
    /// QR origin in photo space.
    #[serde(default)]
    pub placement: Placement,
    /// Output directory (defaults to the job file's directory).
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
    /// Output file name (defaults to `ninja.png`).
    #[serde(default)]
    pub filename: Option<String>,
    /// Transform constants.
    #[serde(default)]
    pub params: StealthParams,
    /// Refuse to replace an existing output file.
    #[serde(default)]
    pub no_overwrite: bool,
}

impl NinjaJob {
    /// Parse a job from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> NinjaResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| NinjaError::validation(format!("parse job JSON: {e}")))
    }

    /// Parse a job from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> NinjaResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            NinjaError::validation(format!("open job JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Pipeline options described by this job.
    pub fn opts(&self) -> PipelineOpts {
        PipelineOpts {
            params: self.params,
            filename: self
                .filename
                .clone()
                .unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
        }
    }

    /// Photo reference with relative paths anchored at `root`.
    pub fn photo_source(&self, root: &Path) -> PhotoSource {
        match PhotoSource::parse(&self.photo) {
            PhotoSource::Path(p) => PhotoSource::Path(resolve(root, &p)),
            other => other,
        }
    }

    /// Run the job, writing into its output directory. Returns the written path and counters.
    pub fn run(&self, root: &Path) -> NinjaResult<(PathBuf, CompositeStats)> {
        self.run_in(StagingArea::global(), root)
    }

    /// [`NinjaJob::run`] with an injected staging area.
    #[tracing::instrument(skip_all, fields(root = %root.display()))]
    pub fn run_in(
        &self,
        staging: &StagingArea,
        root: &Path,
    ) -> NinjaResult<(PathBuf, CompositeStats)> {
        let qr_path = resolve(root, &self.qr);
        let qr_bytes = std::fs::read(&qr_path).map_err(|e| {
            NinjaError::read(format!("read qr image '{}': {e}", qr_path.display()))
        })?;
        let qr = read_qr_png(&qr_bytes)?;

        let out_dir = match &self.out_dir {
            Some(d) => resolve(root, d),
            None => root.to_path_buf(),
        };
        let mut sink = DirectorySink::new(out_dir).overwrite(!self.no_overwrite);

        let opts = self.opts();
        let stats = create_ninja_qr_image_with(
            staging,
            &self.photo_source(root),
            &qr,
            self.placement,
            &mut sink,
            &opts,
        )?;

        let path = sink
            .last_path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| sink.dir().join(&opts.filename));
        Ok((path, stats))
    }
}

fn resolve(root: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/job.rs"]
mod tests;
