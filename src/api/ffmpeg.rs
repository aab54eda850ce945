//! FFmpeg adapters: raw RGBA decoding, audio extraction and recompilation.

use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use log::{debug, error, info};

use crate::core::error::{ClipError, ClipResult};
use crate::core::video::frame::Frame;
use crate::core::video::sequence::FrameSource;

const FFMPEG: &str = "ffmpeg";
const FFPROBE: &str = "ffprobe";

fn base_args() -> Vec<String> {
    ["-hide_banner", "-loglevel", "error"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Decode `video` to raw RGBA frames on stdout.
pub fn decode_args(video: &Path) -> Vec<String> {
    let mut args = base_args();
    args.extend([
        "-i".to_string(),
        video.to_string_lossy().into_owned(),
        "-an".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgba".to_string(),
        "-".to_string(),
    ]);
    args
}

/// Extract the audio track of `video` as 16-bit PCM WAV.
pub fn extract_audio_args(video: &Path, wav: &Path) -> Vec<String> {
    let mut args = base_args();
    args.extend([
        "-y".to_string(),
        "-i".to_string(),
        video.to_string_lossy().into_owned(),
        "-vn".to_string(),
        "-acodec".to_string(),
        "pcm_s16le".to_string(),
        wav.to_string_lossy().into_owned(),
    ]);
    args
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub video_codec: String,
    pub video_bitrate: String,
    pub audio_codec: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            video_codec: "libx264".into(),
            video_bitrate: "16M".into(),
            audio_codec: "aac".into(),
        }
    }
}

/// Merge numbered frames (printf pattern such as `frames/%05d.jpg`) with the
/// trimmed audio into `output`.
pub fn compile_args(
    frame_pattern: &Path,
    start_number: u64,
    frame_rate: f64,
    audio: &Path,
    output: &Path,
    options: &CompileOptions,
) -> Vec<String> {
    let mut args = base_args();
    args.extend([
        "-y".to_string(),
        "-framerate".to_string(),
        frame_rate.to_string(),
        "-start_number".to_string(),
        start_number.to_string(),
        "-i".to_string(),
        frame_pattern.to_string_lossy().into_owned(),
        "-i".to_string(),
        audio.to_string_lossy().into_owned(),
        "-c:v".to_string(),
        options.video_codec.clone(),
        "-b:v".to_string(),
        options.video_bitrate.clone(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:a".to_string(),
        options.audio_codec.clone(),
        output.to_string_lossy().into_owned(),
    ]);
    args
}

pub fn run_ffmpeg(args: &[String]) -> ClipResult<()> {
    debug!("Running {} {}", FFMPEG, args.join(" "));
    let output = Command::new(FFMPEG).args(args).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!("❌ FFmpeg exited with {}: {}", output.status, stderr);
        return Err(ClipError::Ffmpeg(format!("{}: {}", output.status, stderr)));
    }
    Ok(())
}

pub fn extract_audio(video: &Path, wav: &Path) -> ClipResult<()> {
    info!("🎵 Extracting audio from {:?} to {:?}", video, wav);
    run_ffmpeg(&extract_audio_args(video, wav))
}

pub fn compile(
    frame_pattern: &Path,
    start_number: u64,
    frame_rate: f64,
    audio: &Path,
    output: &Path,
    options: &CompileOptions,
) -> ClipResult<()> {
    info!(
        "🎬 Merging {:?} and {:?} into {:?}",
        frame_pattern, audio, output
    );
    run_ffmpeg(&compile_args(
        frame_pattern,
        start_number,
        frame_rate,
        audio,
        output,
        options,
    ))
}

/// `ffprobe` query for the first video stream's size, printed as `WxH`.
pub fn probe_args(video: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-select_streams".to_string(),
        "v:0".to_string(),
        "-show_entries".to_string(),
        "stream=width,height".to_string(),
        "-of".to_string(),
        "csv=s=x:p=0".to_string(),
        video.to_string_lossy().into_owned(),
    ]
}

/// Parses `ffprobe` output such as `1920x1080`.
pub fn parse_dimensions(output: &str) -> Option<(u32, u32)> {
    let line = output.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (w, h) = line.split_once('x')?;
    let (w, h) = (w.trim().parse().ok()?, h.trim().trim_end_matches('x').parse().ok()?);
    (w > 0 && h > 0).then_some((w, h))
}

pub fn probe_dimensions(video: &Path) -> ClipResult<(u32, u32)> {
    let output = Command::new(FFPROBE).args(probe_args(video)).output()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(ClipError::Ffmpeg(format!("ffprobe {}: {}", output.status, stderr)));
    }
    parse_dimensions(&stdout).ok_or_else(|| {
        ClipError::Ffmpeg(format!("no video stream size in ffprobe output {:?}", stdout.trim()))
    })
}

/// Frames are never rescaled, so the stream must already have the
/// configured size.
pub fn check_dimensions(actual: (u32, u32), expected: (u32, u32)) -> ClipResult<()> {
    if actual != expected {
        return Err(ClipError::FrameSize {
            index: 0,
            width: actual.0,
            height: actual.1,
            expected_width: expected.0,
            expected_height: expected.1,
        });
    }
    Ok(())
}

/// Splits a raw RGBA byte stream into frames of a fixed size.
///
/// A clean end of stream ends the clip. A partial frame is a read failure
/// for that frame's index; nothing is read after it.
pub struct RawFrameReader<R> {
    reader: R,
    width: u32,
    height: u32,
    frame_rate: f64,
    next: u64,
    done: bool,
}

impl<R: Read> RawFrameReader<R> {
    pub fn new(reader: R, width: u32, height: u32, frame_rate: f64) -> Self {
        Self {
            reader,
            width,
            height,
            frame_rate,
            next: 0,
            done: false,
        }
    }

    pub fn frames_read(&self) -> u64 {
        self.next
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// Reads until `buf` is full or EOF; returns the number of bytes read.
    fn fill(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<R: Read> FrameSource for RawFrameReader<R> {
    fn read_frame(&mut self) -> ClipResult<Option<Frame>> {
        if self.done {
            return Ok(None);
        }

        let index = self.next;
        let mut data = vec![0u8; self.frame_len()];
        let filled = self.fill(&mut data).map_err(|e| {
            self.done = true;
            ClipError::FrameRead {
                index,
                reason: e.to_string(),
            }
        })?;

        if filled == 0 {
            self.done = true;
            return Ok(None);
        }
        if filled < data.len() {
            self.done = true;
            return Err(ClipError::FrameRead {
                index,
                reason: format!("truncated frame ({} of {} bytes)", filled, data.len()),
            });
        }

        self.next += 1;
        Ok(Some(Frame::at_rate(
            self.width,
            self.height,
            data,
            index,
            self.frame_rate,
        )))
    }
}

/// Decodes a video through an `ffmpeg` child process. The stream must
/// already be `width` x `height`; frames are never rescaled.
pub struct FfmpegFrameSource {
    child: Child,
    frames: RawFrameReader<BufReader<ChildStdout>>,
    reaped: bool,
}

impl FfmpegFrameSource {
    pub fn open(video: &Path, width: u32, height: u32, frame_rate: f64) -> ClipResult<Self> {
        check_dimensions(probe_dimensions(video)?, (width, height)).map_err(|e| {
            error!("❌ {:?}: {}", video, e);
            e
        })?;

        info!("🎞️ Decoding {:?} at {}x{}", video, width, height);
        // only stdout is read; stderr must not be an undrained pipe
        let mut child = Command::new(FFMPEG)
            .args(decode_args(video))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ClipError::Ffmpeg("stdout was not captured".into()));
            }
        };

        Ok(Self {
            child,
            frames: RawFrameReader::new(BufReader::new(stdout), width, height, frame_rate),
            reaped: false,
        })
    }

    fn reap(&mut self) -> ClipResult<()> {
        self.reaped = true;
        let status = self.child.wait()?;
        if !status.success() {
            return Err(ClipError::Ffmpeg(format!("decoder exited with {}", status)));
        }
        Ok(())
    }

    fn kill_and_reap(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
            self.reaped = true;
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn read_frame(&mut self) -> ClipResult<Option<Frame>> {
        match self.frames.read_frame() {
            Ok(Some(frame)) => Ok(Some(frame)),
            Ok(None) => {
                if !self.reaped {
                    self.reap()?;
                    debug!("Decoder finished after {} frames", self.frames.frames_read());
                }
                Ok(None)
            }
            Err(e) => {
                self.kill_and_reap();
                Err(e)
            }
        }
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        self.kill_and_reap();
    }
}
