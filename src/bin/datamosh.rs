use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "datamosh", version)]
struct Cli {
    /// Log pipeline lifecycle events to stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Datamosh a directory of image frames.
    Run(RunArgs),
    /// Write the default parameter set as JSON, or list the parameters.
    Params(ParamsArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Directory of input frames (png/jpg/jpeg), processed in name order.
    #[arg(long = "in")]
    in_dir: PathBuf,

    /// Output directory for `frame_XXXXX.png`.
    #[arg(long)]
    out: PathBuf,

    /// Parameter set JSON.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Override `block_size`.
    #[arg(long)]
    block_size: Option<u32>,

    /// Override `displace`.
    #[arg(long)]
    displace: Option<f32>,

    /// Override `diffusion`.
    #[arg(long)]
    diffusion: Option<f32>,

    /// Keep the composited buffer at half precision.
    #[arg(long, default_value_t = false)]
    half: bool,

    /// Disable the derivative stage (plain luma differences, no contrast weighting).
    #[arg(long, default_value_t = false)]
    no_derivative: bool,

    /// Disable the structure-tensor confidence gate.
    #[arg(long, default_value_t = false)]
    no_gate: bool,

    /// Disable the level-of-detail blur.
    #[arg(long, default_value_t = false)]
    no_lod: bool,
}

#[derive(Parser, Debug)]
struct ParamsArgs {
    /// Write defaults to this JSON file instead of printing the table.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        })
        .init();

    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Params(args) => cmd_params(args),
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let mut params = match &args.params {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("read params '{}'", path.display()))?;
            datamosh::ParamSet::from_json_str(&json)?
        }
        None => datamosh::ParamSet::default(),
    };
    if let Some(v) = args.block_size {
        params.set("block_size", f64::from(v))?;
    }
    if let Some(v) = args.displace {
        params.set("displace", f64::from(v))?;
    }
    if let Some(v) = args.diffusion {
        params.set("diffusion", f64::from(v))?;
    }

    let opts = datamosh::PipelineOpts {
        composite_format: if args.half {
            datamosh::PixelFormat::RgbaF16
        } else {
            datamosh::PixelFormat::RgbaF32
        },
        features: datamosh::StageFeatures {
            derivative_stage: !args.no_derivative,
            confidence_gate: !args.no_gate,
            lod_blur: !args.no_lod,
        },
        ..datamosh::PipelineOpts::default()
    };
    let mut pipeline = datamosh::Pipeline::new(opts)?;

    let inputs = list_frames(&args.in_dir)?;
    if inputs.is_empty() {
        anyhow::bail!("no png/jpg frames in '{}'", args.in_dir.display());
    }
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;

    for (i, path) in inputs.iter().enumerate() {
        let rgba = image::open(path)
            .with_context(|| format!("decode frame '{}'", path.display()))?
            .to_rgba8();
        let (w, h) = rgba.dimensions();
        let source = datamosh::Image::from_rgba8(w, h, rgba.as_raw())?;

        let out = pipeline.process(datamosh::FrameIndex(i as u64), &source, &params)?;

        let out_path = args.out.join(format!("frame_{i:05}.png"));
        image::save_buffer_with_format(
            &out_path,
            &out.to_rgba8(),
            out.width(),
            out.height(),
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", out_path.display()))?;
    }

    let stats = pipeline.stats();
    eprintln!(
        "wrote {} frames to {} ({} initializations)",
        stats.frames_processed,
        args.out.display(),
        stats.initializations
    );
    Ok(())
}

fn cmd_params(args: ParamsArgs) -> anyhow::Result<()> {
    match args.out {
        Some(path) => {
            let json = datamosh::ParamSet::default().to_json_pretty()?;
            std::fs::write(&path, json)
                .with_context(|| format!("write params '{}'", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => {
            let table = datamosh::ParamTable::builtin()?;
            for d in table.descs() {
                let range = match d.kind {
                    datamosh::ParamKind::Int { min, max } => format!("int {min}..={max}"),
                    datamosh::ParamKind::Float { min, max } => format!("float {min}..={max}"),
                };
                println!("{:<18} {:<16} {:>8}  {}", d.name, range, d.default, d.doc);
            }
        }
    }
    Ok(())
}

fn list_frames(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("read input dir '{}'", dir.display()))?
    {
        let path = entry?.path();
        let is_frame = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"));
        if is_frame && path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}
