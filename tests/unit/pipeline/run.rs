use std::io::Cursor;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use super::*;
use crate::assets::staging::StagingStats;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::{ChannelPolicy, RasterImage};
use crate::foundation::error::NinjaError;

fn png_photo(w: u32, h: u32, px: [u8; 4]) -> PhotoSource {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(px));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    PhotoSource::Bytes(buf)
}

fn decode(bytes: &[u8]) -> image::RgbaImage {
    image::load_from_memory(bytes).unwrap().to_rgba8()
}

#[test]
fn end_to_end_writes_ninja_png() {
    let area = StagingArea::new("test");
    let qr = RasterImage::filled(2, 2, [0, 0, 0, 255]).unwrap();
    let mut sink = InMemorySink::new();

    let stats = create_ninja_qr_image_with(
        &area,
        &png_photo(4, 4, [0, 0, 0, 255]),
        &qr,
        Placement::new(1, 1),
        &mut sink,
        &PipelineOpts::default(),
    )
    .unwrap();
    assert_eq!(stats.touched, 4);

    assert_eq!(sink.files().len(), 1);
    assert_eq!(sink.files()[0].filename, "ninja.png");
    let out = decode(&sink.files()[0].bytes);
    assert_eq!(out.dimensions(), (4, 4));
    assert_eq!(out.get_pixel(1, 1).0, [0, 0, 0, 150]);
    assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 255]);

    let st = area.stats();
    assert_eq!(st.attached, 1);
    assert_eq!(st.settles, 1);
    assert_eq!(st.live, 0);
}

#[test]
fn wrap_policy_and_custom_filename_flow_through() {
    let area = StagingArea::new("test");
    let qr = RasterImage::filled(1, 1, [0, 0, 0, 255]).unwrap();
    let mut sink = InMemorySink::new();
    let opts = PipelineOpts {
        params: StealthParams::default().with_policy(ChannelPolicy::Wrap),
        filename: "stealth.png".to_string(),
    };

    create_ninja_qr_image_with(
        &area,
        &png_photo(2, 2, [0, 0, 0, 255]),
        &qr,
        Placement::new(0, 0),
        &mut sink,
        &opts,
    )
    .unwrap();

    assert_eq!(sink.files()[0].filename, "stealth.png");
    let out = decode(&sink.files()[0].bytes);
    assert_eq!(out.get_pixel(0, 0).0, [78, 78, 78, 150]);
}

#[test]
fn out_of_bounds_placement_still_saves_unchanged_photo() {
    let area = StagingArea::new("test");
    let qr = RasterImage::filled(3, 3, [0, 0, 0, 255]).unwrap();
    let mut sink = InMemorySink::new();

    let stats = create_ninja_qr_image_with(
        &area,
        &png_photo(2, 2, [9, 8, 7, 255]),
        &qr,
        Placement::new(-10, 50),
        &mut sink,
        &PipelineOpts::default(),
    )
    .unwrap();
    assert_eq!(stats.touched, 0);
    let out = decode(&sink.files()[0].bytes);
    assert!(out.pixels().all(|p| p.0 == [9, 8, 7, 255]));
}

#[test]
fn load_error_saves_nothing_and_releases_staging() {
    let area = StagingArea::new("test");
    let qr = RasterImage::filled(1, 1, [0, 0, 0, 255]).unwrap();
    let mut sink = InMemorySink::new();

    let err = create_ninja_qr_image_with(
        &area,
        &PhotoSource::Bytes(b"nope".to_vec()),
        &qr,
        Placement::default(),
        &mut sink,
        &PipelineOpts::default(),
    )
    .unwrap_err();
    assert!(matches!(err, NinjaError::Load(_)));
    assert!(sink.files().is_empty());
    assert_eq!(area.stats().live, 0);
}

#[test]
fn empty_qr_surface_is_read_error_and_releases_staging() {
    let area = StagingArea::new("test");
    let qr = RasterImage::new(0, 5, Vec::new()).unwrap();
    let mut sink = InMemorySink::new();

    let err = create_ninja_qr_image_with(
        &area,
        &png_photo(2, 2, [0, 0, 0, 255]),
        &qr,
        Placement::default(),
        &mut sink,
        &PipelineOpts::default(),
    )
    .unwrap_err();
    assert!(matches!(err, NinjaError::Read(_)));
    assert!(sink.files().is_empty());

    let st = area.stats();
    assert_eq!(st.attached, 1);
    assert_eq!(st.detached, 1);
    assert_eq!(st.live, 0);
}

#[test]
fn invalid_filename_fails_before_loading() {
    let area = StagingArea::new("test");
    let qr = RasterImage::filled(1, 1, [0, 0, 0, 255]).unwrap();
    let mut sink = InMemorySink::new();
    let opts = PipelineOpts {
        filename: "../escape.png".to_string(),
        ..PipelineOpts::default()
    };

    let err = create_ninja_qr_image_with(
        &area,
        &png_photo(1, 1, [0, 0, 0, 255]),
        &qr,
        Placement::default(),
        &mut sink,
        &opts,
    )
    .unwrap_err();
    assert!(matches!(err, NinjaError::Validation(_)));
    assert_eq!(area.stats().attached, 0);
}

#[test]
fn empty_photo_is_encode_error_and_releases_staging() {
    let area = StagingArea::new("test");
    let qr = RasterImage::filled(1, 1, [0, 0, 0, 255]).unwrap();
    let photo = PhotoSource::Raster(RasterImage::new(0, 0, Vec::new()).unwrap());
    let mut sink = InMemorySink::new();

    let err = create_ninja_qr_image_with(
        &area,
        &photo,
        &qr,
        Placement::default(),
        &mut sink,
        &PipelineOpts::default(),
    )
    .unwrap_err();
    assert!(matches!(err, NinjaError::Encode(_)));
    assert!(sink.files().is_empty());

    let st = area.stats();
    assert_eq!(st.settles, 1);
    assert_eq!(st.live, 0);
}

struct StatsReadingSink {
    area: Arc<StagingArea>,
    seen: Option<StagingStats>,
    inner: InMemorySink,
}

impl SaveSink for StatsReadingSink {
    fn save(&mut self, filename: &str, bytes: &[u8]) -> NinjaResult<()> {
        self.seen = Some(self.area.stats());
        self.inner.save(filename, bytes)
    }
}

#[test]
fn sink_can_read_area_stats_during_save() {
    let area = Arc::new(StagingArea::new("test"));
    let (tx, rx) = mpsc::channel();

    let worker_area = Arc::clone(&area);
    std::thread::spawn(move || {
        let qr = RasterImage::filled(1, 1, [0, 0, 0, 255]).unwrap();
        let mut sink = StatsReadingSink {
            area: Arc::clone(&worker_area),
            seen: None,
            inner: InMemorySink::new(),
        };
        let result = create_ninja_qr_image_with(
            &worker_area,
            &png_photo(2, 2, [0, 0, 0, 255]),
            &qr,
            Placement::default(),
            &mut sink,
            &PipelineOpts::default(),
        );
        let _ = tx.send((result.is_ok(), sink.seen, sink.inner.files().len()));
    });

    let (ok, seen, files) = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("pipeline did not finish");
    assert!(ok);
    assert_eq!(files, 1);
    let seen = seen.unwrap();
    assert_eq!(seen.attached, 1);
    assert_eq!(seen.live, 1);
    assert_eq!(area.stats().live, 0);
}

struct NestedPipelineSink<'a> {
    area: &'a StagingArea,
    nested: Option<NinjaError>,
}

impl SaveSink for NestedPipelineSink<'_> {
    fn save(&mut self, _filename: &str, _bytes: &[u8]) -> NinjaResult<()> {
        let qr = RasterImage::filled(1, 1, [0, 0, 0, 255]).unwrap();
        let mut inner = InMemorySink::new();
        let err = create_ninja_qr_image_with(
            self.area,
            &png_photo(1, 1, [0, 0, 0, 255]),
            &qr,
            Placement::default(),
            &mut inner,
            &PipelineOpts::default(),
        )
        .unwrap_err();
        assert!(inner.files().is_empty());
        self.nested = Some(err);
        Err(NinjaError::save("nested pipeline rejected"))
    }
}

#[test]
fn nested_pipeline_on_the_same_area_is_rejected() {
    let area = StagingArea::new("test");
    let qr = RasterImage::filled(1, 1, [0, 0, 0, 255]).unwrap();
    let mut sink = NestedPipelineSink {
        area: &area,
        nested: None,
    };

    let err = create_ninja_qr_image_with(
        &area,
        &png_photo(2, 2, [0, 0, 0, 255]),
        &qr,
        Placement::default(),
        &mut sink,
        &PipelineOpts::default(),
    )
    .unwrap_err();
    assert!(matches!(err, NinjaError::Save(_)));

    let nested = sink.nested.unwrap();
    assert!(matches!(nested, NinjaError::Validation(_)));
    assert!(nested.to_string().contains("already in use by this call"));

    let st = area.stats();
    assert_eq!(st.attached, 1);
    assert_eq!(st.live, 0);
}
