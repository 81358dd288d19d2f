use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser};
use flv::TagType;
use tracing::{debug, info, warn};

use flvrec::config::Config;
use flvrec::helper;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Verbose mode [default: config log level, -v "info", -vv "debug", -vvv "trace"]
    #[arg(short = 'v', action = ArgAction::Count, default_value_t = 0)]
    verbose: u8,
    /// Set config file path
    #[arg(short, long)]
    config: Option<String>,
    /// FLV stream to record, "-" reads stdin
    #[arg(short, long, default_value_t = String::from("-"))]
    input: String,
    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Output file name prefix
    #[arg(short, long)]
    name: Option<String>,
    /// Keyframe index capacity of one file
    #[arg(long)]
    max_keyframes: Option<u32>,
    /// Minimum milliseconds between two indexed keyframes
    #[arg(long)]
    min_keyframe_interval: Option<i32>,
    /// Print the structure of recorded files and exit
    #[arg(long, num_args = 1.., value_name = "FILE")]
    probe: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut cfg: Config = helper::load("flvrec", args.config.clone())?;
    if let Some(dir) = args.output.clone() {
        cfg.output.dir = dir;
    }
    if let Some(name) = args.name.clone() {
        cfg.output.name = name;
    }
    if let Some(n) = args.max_keyframes {
        cfg.remux.max_keyframes = n;
    }
    if let Some(ms) = args.min_keyframe_interval {
        cfg.remux.min_keyframe_interval_ms = ms;
    }
    cfg.validate()?;

    let level = utils::verbose_level(args.verbose)
        .map(|l| l.to_string().to_lowercase())
        .unwrap_or_else(|| cfg.log.level.clone());
    utils::set_log(utils::filter_for(&["flvrec", "flvremux", "flv"], &level));
    debug!("config : {:?}", cfg);

    if !args.probe.is_empty() {
        for path in &args.probe {
            probe_file(path)?;
        }
        return Ok(());
    }

    let summary = if args.input == "-" {
        flvrec::record(cfg, tokio::io::stdin(), helper::shutdown_signal()).await?
    } else {
        let file = tokio::fs::File::open(&args.input)
            .await
            .with_context(|| format!("failed to open input {}", args.input))?;
        flvrec::record(cfg, file, helper::shutdown_signal()).await?
    };

    info!(
        "[flvrec] done: read {} bytes, recorded {:.1}s",
        summary.read_bytes,
        summary.duration_ms as f64 / 1000.0
    );
    for path in &summary.files {
        info!("[flvrec] wrote {}", path.display());
    }
    match summary.error {
        Some(kind) => Err(anyhow::anyhow!("recording stopped: {}", kind)),
        None => Ok(()),
    }
}

fn probe_file(path: &Path) -> anyhow::Result<()> {
    let data = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let probe = flv::probe::probe(&data).with_context(|| format!("invalid FLV {}", path.display()))?;

    let count = |tag_type: TagType| {
        probe
            .tags
            .iter()
            .filter(|t| t.header.tag_type() == tag_type)
            .count()
    };
    println!("{}", path.display());
    println!("  duration:  {:.3}s", probe.duration().unwrap_or_default());
    println!(
        "  tags:      {} audio, {} video, {} script",
        count(TagType::Audio),
        count(TagType::Video),
        count(TagType::Script)
    );

    let positions = probe.keyframe_positions().unwrap_or_default();
    let times = probe.keyframe_times().unwrap_or_default();
    println!("  keyframes: {}", times.len());
    if positions.len() != times.len() {
        warn!(
            "{}: {} keyframe positions but {} times",
            path.display(),
            positions.len(),
            times.len()
        );
    }
    if let Some(comment) = probe
        .metadata_properties()
        .and_then(|p| p.get("Comment"))
        .and_then(|v| v.as_bytes())
    {
        println!("  comment:   {}", String::from_utf8_lossy(comment));
    }
    Ok(())
}
