pub mod controller;
pub mod sink;

use anyhow::{bail, Context, Result};
use clap::Parser;
use controller::{ControllerConfig, VideoController};
use serde::{Deserialize, Serialize};
use sink::JsonLinesSink;
use smash_capture::{FrameSource, ImageSequenceSource, StoppableSource};
use smash_data::{HudLayout, TemplateDir};
use smash_vision::DirectoryPreview;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything tunable without recompiling, loaded from one JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub layout: HudLayout,
    pub controller: ControllerConfig,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings {}", path.display()))
    }
}

/// Read damage percents from fighting-game footage and write one JSON line
/// per sampled frame.
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(name = "smash-stats")]
#[command(version)]
pub struct CliArgs {
    /// Video file, or a directory of still frames.
    pub input: PathBuf,

    /// Root of the template tree (`<root>/<game>/<height>/<glyph>.png`).
    #[arg(long, default_value = "templates")]
    pub templates: PathBuf,

    /// Game whose HUD templates to use.
    #[arg(long, default_value = TemplateDir::DEFAULT_GAME)]
    pub game: String,

    /// JSON settings file with `layout` and `controller` sections.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Frames skipped after each analyzed frame (overrides the settings file).
    #[arg(long)]
    pub cluster_size: Option<usize>,

    /// Frame rate reported for frame directories.
    #[arg(long, default_value = "60", value_parser = parse_fps)]
    pub fps: f64,

    /// Directory to dump analyzed frames and digit crops into.
    #[arg(long)]
    pub preview_dir: Option<PathBuf>,

    /// File to write snapshots to (stdout when absent).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_fps(s: &str) -> std::result::Result<f64, String> {
    let fps: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if fps > 0.0 && fps.is_finite() {
        Ok(fps)
    } else {
        Err(format!("must be positive, got {}", s))
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "smash_stats=debug,smash_vision=debug,smash_capture=debug"
    } else {
        "smash_stats=info,smash_vision=info,smash_capture=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();
    init_tracing(cli.verbose);

    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(n) = cli.cluster_size {
        settings.controller.cluster_size = n;
    }

    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, finishing the current frame");
            flag.store(true, Ordering::Relaxed);
        }
    });

    tokio::task::spawn_blocking(move || analyze_video(&cli, settings, stop))
        .await
        .context("Analysis task failed")?
}

/// Run one video through the controller, streaming snapshots to `--output`
/// (stdout when absent). Blocks until the video ends or `stop` is raised.
pub fn analyze_video(cli: &CliArgs, settings: Settings, stop: Arc<AtomicBool>) -> Result<()> {
    let source = StoppableSource::new(open_source(&cli.input, cli.fps)?, stop);
    let templates = TemplateDir::new(&cli.templates, &cli.game);

    let mut controller =
        match VideoController::new(source, &templates, settings.layout, settings.controller) {
            Ok(c) => c,
            Err(e) => {
                warn!(
                    "Templates available for heights {:?} in {}",
                    templates.available_heights(),
                    cli.templates.join(&cli.game).display()
                );
                return Err(e);
            }
        };

    if let Some(dir) = &cli.preview_dir {
        controller = controller.with_preview(Arc::new(DirectoryPreview::new(dir)?));
    }

    let out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout()),
    };
    controller = controller.with_sink(JsonLinesSink::new(out));

    controller.analyze()?;

    for (i, game) in controller.games().iter().enumerate() {
        info!(
            "Game {}: {} players, {} snapshots",
            i + 1,
            game.player_count(),
            game.stats().len()
        );
    }
    Ok(())
}

fn open_source(input: &Path, fps: f64) -> Result<Box<dyn FrameSource>> {
    if input.is_dir() {
        return Ok(Box::new(ImageSequenceSource::open(input, fps)?));
    }
    if !input.exists() {
        bail!("Input {} does not exist", input.display());
    }
    open_video_file(input)
}

#[cfg(feature = "video")]
fn open_video_file(input: &Path) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(smash_capture::video::VideoFileSource::open(input)?))
}

#[cfg(not(feature = "video"))]
fn open_video_file(input: &Path) -> Result<Box<dyn FrameSource>> {
    bail!(
        "{} is a video file, but this build has no decoder (enable the `video` feature) \
         or pass a directory of frames",
        input.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::{bar_digit, hud_frame, percent_glyph, ANCHORS, HEIGHT};

    #[test]
    fn test_cli_defaults() {
        let cli = CliArgs::try_parse_from(["smash-stats", "match.mp4"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("match.mp4"));
        assert_eq!(cli.templates, PathBuf::from("templates"));
        assert_eq!(cli.game, "ultimate");
        assert_eq!(cli.fps, 60.0);
        assert_eq!(cli.cluster_size, None);
        assert_eq!(cli.output, None);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_options() {
        let cli = CliArgs::try_parse_from([
            "smash-stats",
            "--templates",
            "/t",
            "frames",
            "--cluster-size",
            "4",
            "--fps",
            "29.97",
            "-o",
            "out.jsonl",
            "--verbose",
        ])
        .unwrap();
        assert_eq!(cli.input, PathBuf::from("frames"));
        assert_eq!(cli.templates, PathBuf::from("/t"));
        assert_eq!(cli.cluster_size, Some(4));
        assert_eq!(cli.fps, 29.97);
        assert_eq!(cli.output, Some(PathBuf::from("out.jsonl")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_rejects_bad_input() {
        let parse = |args: &[&str]| {
            CliArgs::try_parse_from(std::iter::once("smash-stats").chain(args.iter().copied()))
        };
        assert!(parse(&[]).is_err());
        assert!(parse(&["a", "b"]).is_err());
        assert!(parse(&["a", "--cluster-size"]).is_err());
        assert!(parse(&["a", "--cluster-size", "ten"]).is_err());
        assert!(parse(&["a", "--fps", "0"]).is_err());
        assert!(parse(&["a", "--fps", "-5"]).is_err());
        assert!(parse(&["a", "--bogus"]).is_err());
    }

    #[test]
    fn test_settings_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"layout": {"threshold": 60}, "controller": {"confirm_frames": 5}}"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.layout.threshold, 60);
        assert_eq!(settings.layout.size, HudLayout::default().size);
        assert_eq!(settings.controller.confirm_frames, 5);
        assert_eq!(settings.controller.cluster_size, 10);

        std::fs::write(&path, "not json").unwrap();
        assert!(Settings::load(&path).is_err());
    }

    fn frame_dir_args(frames: &Path) -> CliArgs {
        CliArgs::try_parse_from([std::ffi::OsStr::new("smash-stats"), frames.as_os_str()]).unwrap()
    }

    fn write_templates(root: &Path) {
        let dir = root.join("ultimate").join(HEIGHT.to_string());
        std::fs::create_dir_all(&dir).unwrap();
        percent_glyph().save(dir.join("percent.png")).unwrap();
        for d in 0..10 {
            bar_digit(d).save(dir.join(format!("{}.png", d))).unwrap();
        }
    }

    #[test]
    fn test_analyze_frame_directory_to_json_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let templates = tmp.path().join("templates");
        write_templates(&templates);

        let frames = tmp.path().join("frames");
        std::fs::create_dir_all(&frames).unwrap();
        for i in 0..30 {
            let frame = if i < 16 {
                hud_frame(&[(ANCHORS[0], None), (ANCHORS[1], None)])
            } else {
                hud_frame(&[(ANCHORS[0], Some(i)), (ANCHORS[1], Some(100 + i))])
            };
            frame.save(frames.join(format!("{:04}.png", i))).unwrap();
        }

        let output = tmp.path().join("out.jsonl");
        let mut cli = CliArgs::try_parse_from([
            "smash-stats".to_string(),
            frames.display().to_string(),
            "--cluster-size".to_string(),
            "10".to_string(),
        ])
        .unwrap();
        cli.templates = templates;
        cli.output = Some(output.clone());

        analyze_video(&cli, Settings::default(), Arc::new(AtomicBool::new(false))).unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"game":0,"frame":16,"players":[{"percent":16},{"percent":116}]}"#,
                r#"{"game":0,"frame":27,"players":[{"percent":27},{"percent":127}]}"#,
            ]
        );
    }

    #[test]
    fn test_stop_flag_ends_analysis_early() {
        let tmp = tempfile::tempdir().unwrap();
        let templates = tmp.path().join("templates");
        write_templates(&templates);
        let frames = tmp.path().join("frames");
        std::fs::create_dir_all(&frames).unwrap();
        for i in 0..20 {
            hud_frame(&[(ANCHORS[0], Some(1))])
                .save(frames.join(format!("{:04}.png", i)))
                .unwrap();
        }

        let output = tmp.path().join("out.jsonl");
        let mut cli = frame_dir_args(&frames);
        cli.templates = templates;
        cli.output = Some(output.clone());

        analyze_video(&cli, Settings::default(), Arc::new(AtomicBool::new(true))).unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "");
    }

    #[test]
    fn test_missing_templates_fail() {
        let tmp = tempfile::tempdir().unwrap();
        let frames = tmp.path().join("frames");
        std::fs::create_dir_all(&frames).unwrap();
        hud_frame(&[]).save(frames.join("0000.png")).unwrap();

        let mut cli = frame_dir_args(&frames);
        cli.templates = tmp.path().join("nowhere");
        let result = analyze_video(&cli, Settings::default(), Arc::new(AtomicBool::new(false)));
        assert!(result.is_err());
    }
}
