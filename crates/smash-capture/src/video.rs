use crate::{FrameSource, VideoInfo};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Video file decoded with ffmpeg on a background thread.
///
/// Frames cross a bounded channel in decode order, so the consumer sees
/// them strictly sequentially.
pub struct VideoFileSource {
    info: VideoInfo,
    rx: mpsc::Receiver<RgbImage>,
    stop: Arc<AtomicBool>,
    decode_handle: Option<JoinHandle<anyhow::Result<()>>>,
}

impl VideoFileSource {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        ffmpeg_next::init()?;
        let info = read_stream_info(path)?;
        info!(
            "Video opened: {} ({}x{} @ {:.2} fps)",
            path.display(),
            info.width,
            info.height,
            info.fps
        );

        let (tx, rx) = mpsc::channel::<RgbImage>(2);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_decode = stop.clone();
        let path_owned: PathBuf = path.to_path_buf();
        let decode_handle =
            std::thread::spawn(move || decode_video(&path_owned, tx, stop_decode));

        Ok(Self {
            info,
            rx,
            stop,
            decode_handle: Some(decode_handle),
        })
    }

    fn join_decoder(&mut self) {
        if let Some(handle) = self.decode_handle.take() {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Video decode error: {}", e),
                Err(_) => warn!("Video decode thread panicked"),
            }
        }
    }
}

impl FrameSource for VideoFileSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Option<RgbImage> {
        match self.rx.blocking_recv() {
            Some(frame) => Some(frame),
            None => {
                // Channel closed: decoding finished or failed
                self.join_decoder();
                None
            }
        }
    }
}

impl Drop for VideoFileSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
        self.join_decoder();
    }
}

fn read_stream_info(path: &Path) -> anyhow::Result<VideoInfo> {
    let ictx = ffmpeg_next::format::input(&path)?;
    let stream = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .ok_or_else(|| anyhow::anyhow!("No video stream found in {}", path.display()))?;
    let fps = f64::from(stream.avg_frame_rate());
    let decoder_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
    let decoder = decoder_ctx.decoder().video()?;

    Ok(VideoInfo {
        width: decoder.width(),
        height: decoder.height(),
        fps,
    })
}

/// Blocking video decode using ffmpeg-next.
/// Sends decoded RGB frames through the mpsc channel.
fn decode_video(
    path: &Path,
    tx: mpsc::Sender<RgbImage>,
    stop: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let mut ictx = ffmpeg_next::format::input(&path)?;

    let video_stream = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .ok_or_else(|| anyhow::anyhow!("No video stream found"))?;

    let stream_index = video_stream.index();
    let decoder_ctx =
        ffmpeg_next::codec::context::Context::from_parameters(video_stream.parameters())?;
    let mut decoder = decoder_ctx.decoder().video()?;

    let mut scaler = ffmpeg_next::software::scaling::Context::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        ffmpeg_next::format::Pixel::RGB24,
        decoder.width(),
        decoder.height(),
        ffmpeg_next::software::scaling::Flags::BILINEAR,
    )?;

    let width = decoder.width();
    let height = decoder.height();
    let mut decoded_frame = ffmpeg_next::frame::Video::empty();

    for (stream, packet) in ictx.packets() {
        if stop.load(Ordering::Relaxed) {
            return Ok(());
        }
        if stream.index() != stream_index {
            continue;
        }

        decoder.send_packet(&packet)?;
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            if !forward_frame(&mut scaler, &decoded_frame, width, height, &tx, &stop)? {
                return Ok(());
            }
        }
    }

    // Flush decoder
    decoder.send_eof()?;
    while decoder.receive_frame(&mut decoded_frame).is_ok() {
        if !forward_frame(&mut scaler, &decoded_frame, width, height, &tx, &stop)? {
            return Ok(());
        }
    }

    info!("Video decode complete");
    Ok(())
}

/// Convert one decoded frame to RGB and send it. Returns `false` once the
/// consumer has gone away or a stop was requested.
fn forward_frame(
    scaler: &mut ffmpeg_next::software::scaling::Context,
    decoded: &ffmpeg_next::frame::Video,
    width: u32,
    height: u32,
    tx: &mpsc::Sender<RgbImage>,
    stop: &AtomicBool,
) -> anyhow::Result<bool> {
    if stop.load(Ordering::Relaxed) {
        return Ok(false);
    }

    let mut rgb_frame = ffmpeg_next::frame::Video::empty();
    scaler.run(decoded, &mut rgb_frame)?;

    let data = rgb_frame.data(0);
    let stride = rgb_frame.stride(0);

    // Copy row-by-row in case stride != width*3
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height as usize {
        let row_start = y * stride;
        let row_end = row_start + (width as usize * 3);
        pixels.extend_from_slice(&data[row_start..row_end]);
    }

    match RgbImage::from_raw(width, height, pixels) {
        Some(img) => Ok(tx.blocking_send(img).is_ok()),
        None => {
            warn!("Decoded frame had unexpected size, skipping");
            Ok(true)
        }
    }
}
