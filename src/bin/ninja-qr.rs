use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ninja-qr", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Blend a rendered QR code into a photo and write the PNG.
    Compose(ComposeArgs),
    /// Run a JSON job file.
    Job(JobArgs),
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Photo path, `file://` or `http(s)://` URL.
    #[arg(long)]
    photo: String,

    /// Already rendered QR code image (PNG).
    #[arg(long)]
    qr: PathBuf,

    /// Horizontal QR offset in photo pixels.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    x: i64,

    /// Vertical QR offset in photo pixels.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    y: i64,

    /// Output directory.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Output file name.
    #[arg(long, default_value = ninja_qr::DEFAULT_FILENAME)]
    filename: String,

    /// How out-of-range channel values are narrowed.
    #[arg(long, value_enum, default_value_t = PolicyChoice::Clamp)]
    policy: PolicyChoice,

    /// Refuse to replace an existing output file.
    #[arg(long, default_value_t = false)]
    no_overwrite: bool,
}

#[derive(Parser, Debug)]
struct JobArgs {
    /// Input job JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyChoice {
    Clamp,
    Wrap,
}

impl From<PolicyChoice> for ninja_qr::ChannelPolicy {
    fn from(c: PolicyChoice) -> Self {
        match c {
            PolicyChoice::Clamp => ninja_qr::ChannelPolicy::Clamp,
            PolicyChoice::Wrap => ninja_qr::ChannelPolicy::Wrap,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Compose(args) => cmd_compose(args),
        Command::Job(args) => cmd_job(args),
    }
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let qr_bytes = std::fs::read(&args.qr)
        .with_context(|| format!("read qr image '{}'", args.qr.display()))?;
    let qr = ninja_qr::read_qr_png(&qr_bytes)?;

    let opts = ninja_qr::PipelineOpts {
        params: ninja_qr::StealthParams::default().with_policy(args.policy.into()),
        filename: args.filename,
    };
    let mut sink = ninja_qr::DirectorySink::new(&args.out_dir).overwrite(!args.no_overwrite);

    ninja_qr::create_ninja_qr_image_with(
        ninja_qr::StagingArea::global(),
        &ninja_qr::PhotoSource::parse(&args.photo),
        &qr,
        ninja_qr::Placement::new(args.x, args.y),
        &mut sink,
        &opts,
    )?;

    let out = sink
        .last_path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| args.out_dir.join(&opts.filename));
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_job(args: JobArgs) -> anyhow::Result<()> {
    let job = ninja_qr::NinjaJob::from_path(&args.in_path)?;
    let root = args.in_path.parent().unwrap_or_else(|| Path::new("."));

    let (out, _stats) = job.run(root)?;
    eprintln!("wrote {}", out.display());
    Ok(())
}
