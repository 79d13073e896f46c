use std::io::Cursor;

use super::*;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "ninja_qr_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn write_png(path: &Path, img: image::RgbaImage) {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(path, buf).unwrap();
}

#[test]
fn minimal_job_uses_defaults() {
    let job = NinjaJob::from_reader(r#"{"photo":"p.png","qr":"q.png"}"#.as_bytes()).unwrap();
    assert_eq!(job.placement, Placement::default());
    assert_eq!(job.opts(), PipelineOpts::default());
    assert!(!job.no_overwrite);
}

#[test]
fn unknown_fields_are_rejected() {
    let err = NinjaJob::from_reader(r#"{"photo":"p","qr":"q","pos":1}"#.as_bytes()).unwrap_err();
    assert!(matches!(err, NinjaError::Validation(msg) if msg.contains("parse job JSON")));
}

#[test]
fn photo_source_resolves_relative_paths_only() {
    let root = Path::new("/jobs");
    let mut job =
        NinjaJob::from_reader(r#"{"photo":"img/p.png","qr":"q.png"}"#.as_bytes()).unwrap();
    assert_eq!(
        job.photo_source(root),
        PhotoSource::Path(PathBuf::from("/jobs/img/p.png"))
    );

    job.photo = "https://example.com/p.png".to_string();
    assert_eq!(
        job.photo_source(root),
        PhotoSource::Url("https://example.com/p.png".to_string())
    );
}

#[test]
fn run_writes_into_out_dir() {
    let root = temp_dir("job_run");
    std::fs::create_dir_all(&root).unwrap();
    write_png(
        &root.join("photo.png"),
        image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 255, 255, 255])),
    );
    write_png(
        &root.join("qr.png"),
        image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 255])),
    );
    std::fs::write(
        root.join("job.json"),
        r#"{"photo":"photo.png","qr":"qr.png","placement":{"x":3,"y":3},"out_dir":"out"}"#,
    )
    .unwrap();

    let job = NinjaJob::from_path(root.join("job.json")).unwrap();
    let area = StagingArea::new("test");
    let (path, stats) = job.run_in(&area, &root).unwrap();
    assert_eq!(path, root.join("out").join(DEFAULT_FILENAME));
    assert_eq!(stats.touched, 1);

    let out = image::open(&path).unwrap().to_rgba8();
    assert_eq!(out.get_pixel(3, 3).0, [255, 255, 255, 150]);
    assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255, 255]);
    assert_eq!(area.stats().live, 0);

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn run_with_missing_qr_is_read_error() {
    let root = temp_dir("job_missing_qr");
    let job = NinjaJob::from_reader(r#"{"photo":"p.png","qr":"q.png"}"#.as_bytes()).unwrap();
    let err = job.run_in(&StagingArea::new("test"), &root).unwrap_err();
    assert!(matches!(err, NinjaError::Read(_)));
}
