use anyhow::{Context, Result};
use rodio::Source;
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
#[cfg(unix)]
use std::ffi::CString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// The playback primitive the controller drives.
///
/// Commands are fire-and-forget from the caller's side: a returned error is
/// reported, never retried. Assigning a source always leaves the engine
/// paused at the start of the new media.
pub trait AudioEngine {
    /// Replaces the current media. `path` is `None` when the reference could
    /// not be resolved to a local file; the engine then holds no media but
    /// still remembers `source_ref`.
    fn set_source(&mut self, path: Option<&Path>, source_ref: &str) -> Result<()>;
    fn source(&self) -> Option<&str>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn set_volume(&mut self, volume: f32);
    /// Reports a finished track once. Subsequent calls return `false` until
    /// the media is restarted or replaced.
    fn take_ended(&mut self) -> bool;
    fn output_name(&self) -> Option<String>;
}

pub struct RodioAudioEngine {
    stream: OutputStream,
    sink: Sink,
    source_ref: Option<String>,
    media: Option<PathBuf>,
    volume: f32,
    ended_reported: bool,
}

impl RodioAudioEngine {
    pub fn new() -> Result<Self> {
        let stream = Self::open_output_stream()?;
        let sink = Sink::connect_new(stream.mixer());
        sink.pause();

        Ok(Self {
            stream,
            sink,
            source_ref: None,
            media: None,
            volume: 1.0,
            ended_reported: false,
        })
    }

    fn open_output_stream() -> Result<OutputStream> {
        let mut stream = with_silenced_stderr(|| {
            match OutputStreamBuilder::from_default_device()
                .context("failed to open default system output stream")
                .and_then(|builder| {
                    builder
                        .with_error_callback(|_| {})
                        .open_stream_or_fallback()
                        .context("failed to start default output stream")
                }) {
                Ok(stream) => Ok(stream),
                Err(default_err) => {
                    let host = rodio::cpal::default_host();
                    let mut candidates: Vec<String> = host
                        .output_devices()
                        .ok()
                        .into_iter()
                        .flatten()
                        .filter_map(|device| device.name().ok())
                        .collect();
                    candidates.sort_by_cached_key(|name| {
                        let lower = name.to_ascii_lowercase();
                        let rank = if lower.contains("pulse") {
                            0_u8
                        } else if lower.contains("pipewire") {
                            1_u8
                        } else {
                            2_u8
                        };
                        (rank, lower)
                    });
                    candidates.dedup();

                    for candidate in candidates {
                        let Some(device) = host.output_devices().ok().into_iter().flatten().find(
                            |entry| entry.name().ok().as_deref() == Some(candidate.as_str()),
                        ) else {
                            continue;
                        };
                        let opened = OutputStreamBuilder::from_device(device)
                            .context("failed to open fallback output device")
                            .and_then(|builder| {
                                builder
                                    .with_error_callback(|_| {})
                                    .open_stream_or_fallback()
                                    .context("failed to start fallback output stream")
                            });
                        if let Ok(stream) = opened {
                            return Ok(stream);
                        }
                    }

                    Err(default_err.context("unable to start any audio output stream"))
                }
            }
        })?;
        stream.log_on_drop(false);
        Ok(stream)
    }

    fn load_media(&self, path: &Path) -> Result<()> {
        let file =
            File::open(path).with_context(|| format!("failed to open track {}", path.display()))?;
        let source = Decoder::try_from(file)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        self.sink.append(source);
        Ok(())
    }
}

impl AudioEngine for RodioAudioEngine {
    fn set_source(&mut self, path: Option<&Path>, source_ref: &str) -> Result<()> {
        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());
        self.sink.pause();
        self.sink.set_volume(self.volume);
        self.source_ref = Some(source_ref.to_string());
        self.media = None;
        self.ended_reported = false;

        let Some(path) = path else {
            anyhow::bail!("no local media for {source_ref}");
        };
        self.load_media(path)?;
        self.media = Some(path.to_path_buf());
        Ok(())
    }

    fn source(&self) -> Option<&str> {
        self.source_ref.as_deref()
    }

    fn play(&mut self) -> Result<()> {
        let Some(media) = self.media.clone() else {
            anyhow::bail!("no playable media loaded");
        };

        if self.sink.empty() {
            self.load_media(&media)?;
        }
        self.sink.play();
        self.ended_reported = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.sink.set_volume(self.volume);
    }

    fn take_ended(&mut self) -> bool {
        if self.ended_reported
            || self.media.is_none()
            || self.sink.is_paused()
            || !self.sink.empty()
        {
            return false;
        }
        self.ended_reported = true;
        true
    }

    fn output_name(&self) -> Option<String> {
        Some(String::from("System default output"))
    }
}

#[cfg(unix)]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved < 0 {
        return operation();
    }

    let devnull = CString::new("/dev/null")
        .ok()
        .map(|path| unsafe { libc::open(path.as_ptr(), libc::O_WRONLY) })
        .unwrap_or(-1);

    if devnull >= 0 {
        unsafe {
            libc::dup2(devnull, libc::STDERR_FILENO);
            libc::close(devnull);
        }
    }

    let result = operation();

    unsafe {
        libc::dup2(saved, libc::STDERR_FILENO);
        libc::close(saved);
    }

    result
}

#[cfg(not(unix))]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    operation()
}

/// Clock-only engine used when no output device is available. Media is
/// opened and decoded like a real engine, only the output is skipped.
pub struct NullAudioEngine {
    source_ref: Option<String>,
    has_media: bool,
    paused: bool,
    started_at: Option<Instant>,
    position_offset: Duration,
    track_duration: Option<Duration>,
    ended_reported: bool,
}

impl NullAudioEngine {
    pub fn new() -> Self {
        Self {
            source_ref: None,
            has_media: false,
            paused: true,
            started_at: None,
            position_offset: Duration::ZERO,
            track_duration: None,
            ended_reported: false,
        }
    }

    fn position(&self) -> Duration {
        let mut position = self.position_offset;
        if !self.paused
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed());
        }
        if let Some(duration) = self.track_duration {
            return position.min(duration);
        }
        position
    }

    fn at_end(&self) -> bool {
        self.track_duration
            .is_some_and(|duration| self.position() >= duration)
    }
}

impl Default for NullAudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine for NullAudioEngine {
    fn set_source(&mut self, path: Option<&Path>, source_ref: &str) -> Result<()> {
        self.source_ref = Some(source_ref.to_string());
        self.has_media = false;
        self.paused = true;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = None;
        self.ended_reported = false;

        let Some(path) = path else {
            anyhow::bail!("no local media for {source_ref}");
        };
        let file =
            File::open(path).with_context(|| format!("failed to open track {}", path.display()))?;
        let source = Decoder::try_from(file)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        self.track_duration = source
            .total_duration()
            .filter(|duration| !duration.is_zero());
        self.has_media = true;
        Ok(())
    }

    fn source(&self) -> Option<&str> {
        self.source_ref.as_deref()
    }

    fn play(&mut self) -> Result<()> {
        if !self.has_media {
            anyhow::bail!("no playable media loaded");
        }
        if self.at_end() {
            self.position_offset = Duration::ZERO;
        }
        self.started_at = Some(Instant::now());
        self.paused = false;
        self.ended_reported = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.position_offset = self.position();
        self.started_at = None;
        self.paused = true;
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn take_ended(&mut self) -> bool {
        if self.ended_reported || self.paused || !self.at_end() {
            return false;
        }
        self.ended_reported = true;
        true
    }

    fn output_name(&self) -> Option<String> {
        Some(String::from("Null audio engine"))
    }
}

#[cfg(test)]
mod tests {
    use super::{AudioEngine, NullAudioEngine};
    use std::fs;
    use std::path::Path;
    use std::thread;
    use std::time::Duration;

    fn write_test_wav(path: &Path, duration_ms: u32) {
        let sample_rate: u32 = 44_100;
        let channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let bytes_per_sample = u32::from(bits_per_sample / 8);
        let total_samples = (u64::from(sample_rate) * u64::from(duration_ms) / 1_000) as u32;
        let data_size = total_samples * u32::from(channels) * bytes_per_sample;
        let byte_rate = sample_rate * u32::from(channels) * bytes_per_sample;
        let block_align = channels * (bits_per_sample / 8);
        let riff_chunk_size = 36_u32.saturating_add(data_size);

        let mut bytes = Vec::with_capacity((44_u32 + data_size) as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&riff_chunk_size.to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16_u32.to_le_bytes());
        bytes.extend_from_slice(&1_u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&byte_rate.to_le_bytes());
        bytes.extend_from_slice(&block_align.to_le_bytes());
        bytes.extend_from_slice(&bits_per_sample.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_size.to_le_bytes());
        bytes.resize((44_u32 + data_size) as usize, 0_u8);

        fs::write(path, bytes).expect("wav fixture should be written");
    }

    #[test]
    fn null_engine_holds_position_after_source_assignment() {
        let dir = tempfile::tempdir().expect("tempdir");
        let track = dir.path().join("fixture.wav");
        write_test_wav(&track, 500);

        let mut engine = NullAudioEngine::new();
        engine
            .set_source(Some(&track), "fixture.wav")
            .expect("wav fixture should load");
        thread::sleep(Duration::from_millis(20));
        assert_eq!(engine.position(), Duration::ZERO);
        assert_eq!(engine.source(), Some("fixture.wav"));
    }

    #[test]
    fn null_engine_rejects_missing_media_like_a_device() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut engine = NullAudioEngine::new();

        let err = engine
            .set_source(Some(&dir.path().join("missing.mp3")), "missing.mp3")
            .expect_err("missing file should fail");
        assert!(format!("{err:#}").contains("failed to open track"));
        assert_eq!(engine.source(), Some("missing.mp3"));
        assert!(engine.play().is_err());
    }

    #[test]
    fn null_engine_rejects_undecodable_and_unresolved_media() {
        let dir = tempfile::tempdir().expect("tempdir");
        let junk = dir.path().join("junk.mp3");
        fs::write(&junk, b"not audio").expect("junk fixture");

        let mut engine = NullAudioEngine::new();
        assert!(engine.set_source(Some(&junk), "junk.mp3").is_err());
        assert!(engine.set_source(None, "https://example.com/a.mp3").is_err());
        assert!(engine.play().is_err());
    }

    #[test]
    fn null_engine_play_without_source_fails() {
        let mut engine = NullAudioEngine::new();
        assert!(engine.play().is_err());
        assert!(!engine.take_ended());
    }

    #[test]
    fn null_engine_pause_freezes_position() {
        let dir = tempfile::tempdir().expect("tempdir");
        let track = dir.path().join("long.wav");
        write_test_wav(&track, 5_000);

        let mut engine = NullAudioEngine::new();
        engine
            .set_source(Some(&track), "long.wav")
            .expect("wav fixture should load");
        engine.play().expect("play");
        thread::sleep(Duration::from_millis(20));

        engine.pause();
        let paused = engine.position();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(engine.position(), paused, "position should freeze while paused");
        assert!(paused > Duration::ZERO);
    }

    #[test]
    fn null_engine_reports_end_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let track = dir.path().join("fixture.wav");
        write_test_wav(&track, 60);

        let mut engine = NullAudioEngine::new();
        engine
            .set_source(Some(&track), "fixture.wav")
            .expect("wav fixture should load");
        engine.play().expect("play");

        thread::sleep(Duration::from_millis(120));
        assert!(engine.take_ended(), "known-duration playback should end");
        assert!(!engine.take_ended(), "end is reported once");
    }
}
