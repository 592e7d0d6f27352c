use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use gpuport::color::{self, BLACK};
use gpuport::{
    Canvas, CanvasOpts, ChannelType, CharlieplexEncoder, EncoderConfig, NUM_LOADS, PaintOpts,
    SignalEncoder, WIDTH, decode_display_list,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gpuport", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode one test frame and write the frame buffer as a PNG.
    Encode(EncodeArgs),
    /// Drive a headless canvas and print its statistics as JSON.
    Run(RunArgs),
    /// Print the charlieplex display list for a set of brightness values.
    Chplex(ChplexArgs),
}

#[derive(Parser, Debug)]
struct EncodeArgs {
    /// Number of channels (1..=24).
    #[arg(long, default_value_t = 24)]
    channels: usize,

    /// Nodes per channel (= frame-buffer rows).
    #[arg(long, default_value_t = 50)]
    nodes: usize,

    /// Channel type for every channel, e.g. `ws281x`, `ws281x+rg_swap`, `chplex+checksum`.
    #[arg(long, default_value = "ws281x")]
    protocol: ChannelType,

    /// Test pattern.
    #[arg(long, value_enum, default_value_t = Pattern::Ramp)]
    pattern: Pattern,

    /// Pattern color as `0xAARRGGBB`, `RRGGBB` or `#RRGGBB`.
    #[arg(long, default_value = "0xFFFFFFFF", value_parser = parse_color)]
    color: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Canvas options JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Number of channels (1..=24).
    #[arg(long, default_value_t = 24)]
    channels: usize,

    /// Nodes per channel.
    #[arg(long, default_value_t = 50)]
    nodes: usize,

    /// Channel type for every channel.
    #[arg(long, default_value = "ws281x")]
    protocol: ChannelType,

    /// Frames to submit.
    #[arg(long, default_value_t = 120)]
    frames: u64,

    /// Submission rate; each frame is throttled to `index / fps` seconds.
    #[arg(long, default_value_t = 20.0)]
    fps: f64,

    /// Present without vsync pacing.
    #[arg(long)]
    no_vsync: bool,

    /// Canvas options JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ChplexArgs {
    /// Up to 56 brightness values, comma separated.
    #[arg(long, value_delimiter = ',', required = true)]
    values: Vec<u8>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Pattern {
    /// Every node the same color.
    Solid,
    /// Brightness rising along each channel.
    Ramp,
    /// One lit node per channel, offset by channel and frame.
    Chase,
}

impl Pattern {
    fn fill(self, pixels: &mut [u32], nodes: usize, base: u32, frame: u64) {
        for (x, column) in pixels.chunks_exact_mut(nodes).enumerate() {
            for (y, px) in column.iter_mut().enumerate() {
                *px = match self {
                    Self::Solid => base,
                    Self::Ramp => color::dim(base, (y + 1) as u32, nodes as u32),
                    Self::Chase => {
                        let lit = (frame as usize + x) % nodes;
                        if y == lit { base } else { BLACK }
                    }
                };
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Encode(args) => cmd_encode(args),
        Command::Run(args) => cmd_run(args),
        Command::Chplex(args) => cmd_chplex(args),
    }
}

fn parse_color(s: &str) -> Result<u32, String> {
    let hex = s
        .trim()
        .trim_start_matches('#')
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    let value = u32::from_str_radix(hex, 16).map_err(|e| format!("bad color '{s}': {e}"))?;
    match hex.len() {
        6 => Ok(BLACK | value),
        8 => Ok(value),
        _ => Err(format!("bad color '{s}': expected 6 or 8 hex digits")),
    }
}

fn load_opts(path: Option<&Path>) -> anyhow::Result<CanvasOpts> {
    let Some(path) = path else {
        return Ok(CanvasOpts::default());
    };
    CanvasOpts::from_json_file(path).with_context(|| format!("load config '{}'", path.display()))
}

fn cmd_encode(args: EncodeArgs) -> anyhow::Result<()> {
    let opts = load_opts(args.config.as_deref())?;
    let mut encoder =
        SignalEncoder::new(args.channels, args.nodes, EncoderConfig::from(&opts))?;
    for x in 0..args.channels {
        encoder.set_channel_type(x, args.protocol);
    }

    let mut pixels = vec![BLACK; args.channels * args.nodes];
    args.pattern.fill(&mut pixels, args.nodes, args.color, 0);
    let (frame, report) = encoder.encode_frame(&pixels)?;
    for x in report.skipped_channels() {
        eprintln!("channel {x} skipped ({})", args.protocol);
    }

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &frame.to_rgba8(),
        WIDTH as u32,
        frame.height() as u32,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        args.fps.is_finite() && args.fps > 0.0,
        "--fps must be > 0, got {}",
        args.fps
    );
    let mut opts = load_opts(args.config.as_deref())?;
    if args.no_vsync {
        opts.headless.refresh_hz = None;
    }

    let mut canvas = Canvas::new("gpuport-run", args.channels, args.nodes, opts)?;
    for x in 0..args.channels {
        canvas.set_channel_type(x, args.protocol);
    }

    let mut pixels = vec![BLACK; args.channels * args.nodes];
    for frame in 0..args.frames {
        Pattern::Chase.fill(&mut pixels, args.nodes, color::WHITE, frame);
        let target = Duration::from_secs_f64(frame as f64 / args.fps);
        canvas.paint(Some(&pixels), PaintOpts::at(target))?;
    }
    canvas.close();

    let stats = canvas.stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn cmd_chplex(args: ChplexArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        args.values.len() <= NUM_LOADS,
        "at most {NUM_LOADS} values, got {}",
        args.values.len()
    );
    let mut enc = CharlieplexEncoder::new();
    enc.encode(&args.values);

    println!("entries:");
    for e in enc.entries() {
        println!(
            "  delay {:3}  rows {}  row_map 0x{:02x}",
            e.delay,
            e.num_rows,
            e.row_map()
        );
    }
    println!("display list ({} bytes, checksum 0x{:02x}):", enc.display_len(), enc.checksum());
    let list = &enc.display_list()[..enc.display_len()];
    for (triple, row) in list.chunks_exact(3).zip(decode_display_list(list)) {
        println!(
            "  lead {:3}  row 0x{:02x}  cols 0x{:02x}  -> delay {}",
            triple[0], triple[1], triple[2], row.delay
        );
    }
    Ok(())
}
