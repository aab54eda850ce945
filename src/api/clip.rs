//! Clip enhancer - one frame pass, then the audio trim

use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::api::ffmpeg::{self, CompileOptions, FfmpegFrameSource};
use crate::core::audio::{AudioCutApplier, AudioSink, AudioSource, CutReport, WavFile};
use crate::core::config::FilterConfig;
use crate::core::error::{ClipError, ClipResult};
use crate::core::video::{Frame, FrameSink, FrameSource, ImageSequenceSink};
use crate::frame_filter::{FrameClassifier, FrameFilter, MenuFrameClassifier, PassSummary};

/// Removes menu and blurry frames from a clip and cuts the matching audio.
///
/// ```no_run
/// use std::path::Path;
/// use clip_enhancer::api::clip::ClipEnhancer;
/// use clip_enhancer::core::audio::WavFile;
/// use clip_enhancer::core::config::FilterConfig;
/// use clip_enhancer::core::video::{ImageSequenceSink, ImageSequenceSource};
///
/// let enhancer = ClipEnhancer::new(FilterConfig::default())?;
/// let mut frames = ImageSequenceSource::open(Path::new("Frames/raw"), 60.0)?;
/// let mut kept = ImageSequenceSink::new("Frames/kept")?;
/// let (summary, report) = enhancer.run(
///     &mut frames,
///     &mut kept,
///     &WavFile::new("Audio/clip.wav"),
///     &WavFile::new("Audio/clipTRIMMED.wav"),
/// )?;
/// # Ok::<(), clip_enhancer::core::error::ClipError>(())
/// ```
/// Intermediate files of one `process_video` run.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkLayout {
    pub frames_dir: PathBuf,
    pub audio: PathBuf,
    pub trimmed_audio: PathBuf,
}

impl WorkLayout {
    pub fn new(work_dir: &Path, video: &Path) -> Self {
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "clip".to_string());
        Self {
            frames_dir: work_dir.join("frames").join(&stem),
            audio: work_dir.join("audio").join(format!("{}.wav", stem)),
            trimmed_audio: work_dir.join("audio").join(format!("{}_trimmed.wav", stem)),
        }
    }
}

pub struct ClipEnhancer {
    config: FilterConfig,
    classifier: Box<dyn FrameClassifier>,
}

impl ClipEnhancer {
    /// Validates `config` and loads every UI template it names.
    pub fn new(config: FilterConfig) -> ClipResult<Self> {
        let classifier = MenuFrameClassifier::load(&config)?;
        info!(
            "🎬 ClipEnhancer: created ({} UI checks, {:.3} fps)",
            classifier.checks().len(),
            config.frame_rate
        );
        Ok(Self {
            config,
            classifier: Box::new(classifier),
        })
    }

    pub fn with_classifier(
        config: FilterConfig,
        classifier: Box<dyn FrameClassifier>,
    ) -> ClipResult<Self> {
        config.validate()?;
        Ok(Self { config, classifier })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Classifies every frame of `source` and writes the retained ones to
    /// `sink` under gapless sequence numbers.
    pub fn run_pass(
        &self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
    ) -> ClipResult<PassSummary> {
        let mut filter = FrameFilter::with_config(&self.config)?;
        let batch_size = self.config.batch_size.max(1);
        let interval = self.config.progress_interval.max(1);
        let hint = source.frame_count_hint();
        let mut next_report = interval;

        info!("▶️ Frame pass started (batch size {})", batch_size);
        loop {
            let batch = Self::read_batch(source, batch_size, filter.frame_count())?;
            if batch.is_empty() {
                break;
            }

            let outcomes = filter
                .process_batch(&batch, self.classifier.as_ref())
                .map_err(|e| {
                    error!("❌ Frame pass failed after {} frames: {}", filter.frame_count(), e);
                    e
                })?;

            for (frame, outcome) in batch.iter().zip(&outcomes) {
                if let Some(sequence) = outcome.sequence() {
                    sink.write_frame(sequence, frame).map_err(|e| {
                        error!(
                            "❌ Writing frame {} as {} failed: {}",
                            frame.frame_number, sequence, e
                        );
                        e
                    })?;
                }
            }

            let processed = filter.frame_count();
            if processed >= next_report {
                match hint {
                    Some(total) if total > 0 => info!(
                        "⏳ Processed {}/{} frames ({:.1}%), {} discarded",
                        processed,
                        total,
                        processed as f64 / total as f64 * 100.0,
                        filter.discarded_count()
                    ),
                    _ => info!(
                        "⏳ Processed {} frames, {} discarded",
                        processed,
                        filter.discarded_count()
                    ),
                }
                next_report = (processed / interval + 1) * interval;
            }
        }

        filter.finish()
    }

    fn read_batch(
        source: &mut dyn FrameSource,
        batch_size: usize,
        processed: u64,
    ) -> ClipResult<Vec<Frame>> {
        let mut batch = Vec::with_capacity(batch_size);
        while batch.len() < batch_size {
            match source.read_frame() {
                Ok(Some(frame)) => batch.push(frame),
                Ok(None) => break,
                Err(e) => {
                    error!(
                        "❌ Reading frame {} failed: {}",
                        processed + batch.len() as u64,
                        e
                    );
                    return Err(e);
                }
            }
        }
        Ok(batch)
    }

    /// Loads the clip audio, removes every cut of `summary` and stores the
    /// result. The source track is never modified.
    pub fn trim_audio(
        &self,
        summary: &PassSummary,
        audio_source: &dyn AudioSource,
        audio_sink: &dyn AudioSink,
    ) -> ClipResult<CutReport> {
        let mut track = audio_source.load()?;
        let report = AudioCutApplier::apply(&mut track, &summary.cuts)?;
        audio_sink.store(&track)?;
        info!(
            "💾 Trimmed audio stored ({} cuts applied, {} skipped)",
            report.intervals_applied, report.intervals_skipped
        );
        Ok(report)
    }

    /// Frame pass followed by the audio trim. Audio is left alone when the
    /// pass fails.
    pub fn run(
        &self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        audio_source: &dyn AudioSource,
        audio_sink: &dyn AudioSink,
    ) -> ClipResult<(PassSummary, CutReport)> {
        let summary = self.run_pass(source, sink)?;
        let report = self.trim_audio(&summary, audio_source, audio_sink)?;
        Ok((summary, report))
    }

    /// Whole-clip flow through `ffmpeg`: extract the audio, run the frame
    /// pass on the decoded video, trim the audio, then merge the retained
    /// frames and the trimmed audio into `output`.
    pub fn process_video(
        &self,
        video: &Path,
        work_dir: &Path,
        output: &Path,
        options: &CompileOptions,
    ) -> ClipResult<(PassSummary, CutReport)> {
        let layout = WorkLayout::new(work_dir, video);
        if let Some(audio_dir) = layout.audio.parent() {
            fs::create_dir_all(audio_dir)?;
        }
        info!("🎬 Processing {:?} in {:?}", video, work_dir);

        ffmpeg::extract_audio(video, &layout.audio)?;
        let mut source = FfmpegFrameSource::open(
            video,
            self.config.frame_width,
            self.config.frame_height,
            self.config.frame_rate,
        )?;
        let mut sink = ImageSequenceSink::new(&layout.frames_dir)?;
        let (summary, report) = self.run(
            &mut source,
            &mut sink,
            &WavFile::new(&layout.audio),
            &WavFile::new(&layout.trimmed_audio),
        )?;

        if summary.kept_frames == 0 {
            warn!("⚠️ Every frame of {:?} was discarded, nothing to compile", video);
            return Err(ClipError::Ffmpeg(format!(
                "no frames of {:?} were retained",
                video
            )));
        }

        ffmpeg::compile(
            &sink.printf_pattern(),
            self.config.sequence_start,
            self.config.frame_rate,
            &layout.trimmed_audio,
            output,
            options,
        )?;
        info!("✅ {:?} written", output);
        Ok((summary, report))
    }
}

impl Drop for ClipEnhancer {
    fn drop(&mut self) {
        info!("🗑️ ClipEnhancer: released");
    }
}
