use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::info;

use super::error::AudioError;

/// Interleaved 16-bit PCM held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub spec: WavSpec,
    pub samples: Vec<i16>,
}

impl AudioTrack {
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<i16>) -> Self {
        Self {
            spec: WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 16,
                sample_format: SampleFormat::Int,
            },
            samples,
        }
    }

    pub fn channels(&self) -> usize {
        self.spec.channels.max(1) as usize
    }

    pub fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    /// Samples per channel.
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.spec.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.spec.sample_rate as f64
    }
}

pub trait AudioSource {
    fn load(&self) -> Result<AudioTrack, AudioError>;
}

pub trait AudioSink {
    fn store(&self, track: &AudioTrack) -> Result<(), AudioError>;
}

/// 16-bit PCM WAV file on disk.
#[derive(Debug, Clone)]
pub struct WavFile {
    path: PathBuf,
}

impl WavFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioSource for WavFile {
    fn load(&self) -> Result<AudioTrack, AudioError> {
        info!("📖 Reading WAV file: {:?}", self.path);
        let mut reader = WavReader::open(&self.path)?;
        let spec = reader.spec();

        info!(
            "📊 WAV spec: {} Hz, {} channels, {} bits",
            spec.sample_rate, spec.channels, spec.bits_per_sample
        );

        if spec.sample_rate == 0 {
            return Err(AudioError::Wav(hound::Error::FormatError(
                "invalid sample rate",
            )));
        }
        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(AudioError::UnsupportedFormat(format!(
                "{:?} {}-bit (expected 16-bit integer PCM)",
                spec.sample_format, spec.bits_per_sample
            )));
        }

        let samples = reader.samples::<i16>().collect::<Result<Vec<_>, _>>()?;
        info!("✓ Loaded {} samples from file", samples.len());
        Ok(AudioTrack { spec, samples })
    }
}

impl AudioSink for WavFile {
    fn store(&self, track: &AudioTrack) -> Result<(), AudioError> {
        info!("💾 Writing WAV file: {:?}", self.path);
        let mut writer = WavWriter::create(&self.path, track.spec)?;
        for &sample in &track.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let track = AudioTrack::new(8_000, 2, vec![0; 16_000]);
        assert_eq!(track.frame_count(), 8_000);
        assert!((track.duration_secs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_wav_file_preserves_interleaving() {
        let dir = tempfile::tempdir().unwrap();
        let wav = WavFile::new(dir.path().join("clip.wav"));
        let samples: Vec<i16> = (0..200).map(|i| if i % 2 == 0 { i } else { -i }).collect();
        let track = AudioTrack::new(4_000, 2, samples);

        wav.store(&track).unwrap();
        let loaded = wav.load().unwrap();
        assert_eq!(loaded, track);
    }

    #[test]
    fn test_rejects_float_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.5f32).unwrap();
        writer.finalize().unwrap();

        let err = WavFile::new(&path).load().unwrap_err();
        assert!(matches!(err, AudioError::UnsupportedFormat(_)));
    }
}
