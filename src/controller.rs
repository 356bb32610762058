use crate::sink::SnapshotSink;
use anyhow::{Context, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use smash_capture::{FrameSource, VideoInfo};
use smash_data::{HudLayout, TemplateRepository};
use smash_state::Game;
use smash_vision::{DigitTemplates, LocatorConfig, NoopPreview, PercentLocator, Player, PreviewSink};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Frame sampling and session-detection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Frames skipped without analysis after each analyzed frame
    pub cluster_size: usize,
    /// Consecutive frames with an unchanged player count needed to start a game
    pub confirm_frames: usize,
    pub locator: LocatorConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cluster_size: 10,
            confirm_frames: 15,
            locator: LocatorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Waiting for a stable set of player HUDs
    Searching,
    /// Sampling frames into the latest game
    InGame,
}

/// Drives a frame source through game detection and per-frame analysis.
pub struct VideoController<S> {
    source: S,
    info: VideoInfo,
    config: ControllerConfig,
    layout: HudLayout,
    locator: PercentLocator,
    digits: Arc<DigitTemplates>,
    preview: Arc<dyn PreviewSink>,
    sink: Option<Box<dyn SnapshotSink>>,
    state: ControllerState,
    games: Vec<Game>,
    frame: Option<RgbImage>,
    frames_read: u64,
    exhausted: bool,
}

impl<S: FrameSource> VideoController<S> {
    /// Fails immediately when `templates` has nothing for the source's resolution.
    pub fn new<R: TemplateRepository + ?Sized>(
        source: S,
        templates: &R,
        layout: HudLayout,
        config: ControllerConfig,
    ) -> Result<Self> {
        let info = source.info();
        let locator = PercentLocator::load(templates, info.height, config.locator.clone())
            .with_context(|| format!("Unsupported video resolution {}x{}", info.width, info.height))?;
        let digits = DigitTemplates::load(templates, info.height)
            .with_context(|| format!("Unsupported video resolution {}x{}", info.width, info.height))?;

        Ok(Self {
            source,
            info,
            config,
            layout,
            locator,
            digits: Arc::new(digits),
            preview: Arc::new(NoopPreview),
            sink: None,
            state: ControllerState::Searching,
            games: Vec::new(),
            frame: None,
            frames_read: 0,
            exhausted: false,
        })
    }

    pub fn with_preview(mut self, preview: Arc<dyn PreviewSink>) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_sink(mut self, sink: impl SnapshotSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn info(&self) -> VideoInfo {
        self.info
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Whether the frame source has run dry.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Process the whole video: search for a game, then sample it until the
    /// frames run out.
    pub fn analyze(&mut self) -> Result<()> {
        info!(
            "Analysing game footage: {}x{} @ {:.2} fps",
            self.info.width, self.info.height, self.info.fps
        );
        while !self.exhausted {
            match self.state {
                ControllerState::Searching => {
                    self.start_game()?;
                }
                ControllerState::InGame => {
                    self.analyze_game();
                }
            }
        }
        info!(
            "Finished after {} frame(s): {} game(s) recorded",
            self.frames_read,
            self.games.len()
        );
        Ok(())
    }

    /// Read frames until the number of percent glyphs on screen has held
    /// steady for `confirm_frames` consecutive frames, then start a game with
    /// one player per glyph.
    ///
    /// Frames without any glyph are ignored. Returns `Ok(false)` if the video
    /// ended first.
    pub fn start_game(&mut self) -> Result<bool> {
        let mut player_count = 0;
        let mut confirmed = 0;
        let mut percents = Vec::new();

        while confirmed < self.config.confirm_frames || percents.is_empty() {
            if !self.next_frame() {
                return Ok(false);
            }
            if !self.frame_fits() {
                continue;
            }
            let Some(frame) = self.frame.as_ref() else {
                continue;
            };
            let found = match self.locator.find_percents(frame) {
                Ok(found) => found,
                Err(e) => {
                    warn!("Skipping frame {}: {:#}", self.frames_read - 1, e);
                    continue;
                }
            };
            if found.is_empty() {
                continue;
            }
            debug!(
                "{} players found, confirming {}/{}",
                found.len(),
                confirmed,
                self.config.confirm_frames
            );
            if found.len() == player_count {
                confirmed += 1;
            } else {
                confirmed = 0;
            }
            player_count = found.len();
            percents = found;
        }

        let Some(frame) = self.frame.as_ref() else {
            return Ok(false);
        };
        let players = percents
            .iter()
            .map(|&point| {
                Player::new(frame, point, &self.layout, self.digits.clone())
                    .map(|p| p.with_preview(self.preview.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        self.games.push(Game::new(players));
        self.state = ControllerState::InGame;
        info!(
            "Starting game {} with {} players at frame {}",
            self.games.len(),
            player_count,
            self.frames_read.saturating_sub(1)
        );
        Ok(true)
    }

    /// Analyze the next frame into the current game, then skip
    /// `cluster_size` frames. Returns `false` if no frame was left to analyze.
    ///
    /// A frame whose size differs from the video's records no snapshot.
    pub fn analyze_game(&mut self) -> bool {
        if !self.next_frame() {
            return false;
        }
        let frame_index = self.frames_read - 1;
        let game_index = self.games.len().saturating_sub(1);

        if self.frame_fits() {
            if let (Some(frame), Some(game)) = (self.frame.as_ref(), self.games.last_mut()) {
                self.preview.show_frame("frame", frame);
                game.update_frame(frame);
                let snapshot = game.analyze();
                info!("Frame {}: {}", frame_index, snapshot);
                if let Some(sink) = self.sink.as_mut() {
                    sink.record(game_index, frame_index, snapshot);
                }
            }
        }

        for _ in 0..self.config.cluster_size {
            if !self.next_frame() {
                break;
            }
        }
        true
    }

    /// Whether the current frame has the size the source announced. Frames
    /// that differ are logged and skipped.
    fn frame_fits(&self) -> bool {
        let Some(frame) = self.frame.as_ref() else {
            return false;
        };
        let expected = (self.info.width, self.info.height);
        if frame.dimensions() == expected {
            return true;
        }
        warn!(
            "Skipping frame {}: {}x{} does not match the video's {}x{}",
            self.frames_read.saturating_sub(1),
            frame.width(),
            frame.height(),
            expected.0,
            expected.1
        );
        false
    }

    fn next_frame(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        match self.source.next_frame() {
            Some(frame) => {
                self.frame = Some(frame);
                self.frames_read += 1;
                true
            }
            None => {
                info!("No more frames after {}", self.frames_read);
                self.exhausted = true;
                false
            }
        }
    }
}
