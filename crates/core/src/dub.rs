//! Offline dub rendering: one synthesized clip per subtitle line, mixed into a
//! single fixed-length audio track.
//!
//! Lines are synthesized strictly one at a time. Keeping a single synthesis in
//! flight bounds peak memory and remote-call concurrency, and makes the output
//! deterministic in subtitle order; this is the intended policy, not an
//! accident of the loop shape.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::{
    client::SpeechSynthesizer,
    error::{LingokitError, Result},
    format::timestamp_seconds,
    types::Subtitle,
};

/// Sample rate of synthesized speech and of the rendered track.
pub const DUB_SAMPLE_RATE: u32 = 24_000;

/// Silence appended after the last subtitle's end.
pub const TRAILING_MARGIN_SECS: f64 = 1.0;

/// Render a complete dub track for the subtitle list.
///
/// The track covers the last subtitle's end time plus a fixed trailing margin.
/// Each line's audio is placed at the line's start offset. A line that fails
/// to synthesize is logged and skipped, leaving silence in its place; the
/// batch proceeds. `progress` receives `(completed, total)` after every line,
/// successful or not, so it always reaches `(total, total)`.
pub async fn render_dub_track(
    subtitles: &[Subtitle],
    synth: &dyn SpeechSynthesizer,
    cancel: &CancellationToken,
    progress: impl Fn(usize, usize),
) -> Result<Vec<f32>> {
    let total = subtitles.len();
    let duration = subtitles
        .iter()
        .filter_map(|s| timestamp_seconds(&s.end))
        .fold(0.0_f64, f64::max)
        + TRAILING_MARGIN_SECS;
    let mut track = vec![0.0_f32; (duration * DUB_SAMPLE_RATE as f64).ceil() as usize];

    for (done, subtitle) in subtitles.iter().enumerate() {
        let Some(offset_secs) = timestamp_seconds(&subtitle.start) else {
            log::warn!(
                "line {}: unparseable start timestamp {:?}, skipping",
                subtitle.id,
                subtitle.start
            );
            progress(done + 1, total);
            continue;
        };

        // The token must also abort a synthesis already in flight, so each
        // line's call is raced against it rather than checked between lines.
        let synthesized = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LingokitError::Cancelled),
            res = synth.synthesize(&subtitle.translation) => res,
        };

        match synthesized {
            Ok(samples) => {
                let offset = (offset_secs * DUB_SAMPLE_RATE as f64) as usize;
                mix_at(&mut track, &samples, offset);
            }
            Err(e) => {
                log::warn!("line {}: synthesis failed, leaving silence: {e}", subtitle.id);
            }
        }

        progress(done + 1, total);
    }

    Ok(track)
}

/// Add `clip` into `track` starting at `offset`, clamping at the track end.
fn mix_at(track: &mut [f32], clip: &[f32], offset: usize) {
    if offset >= track.len() {
        return;
    }
    let end = (offset + clip.len()).min(track.len());
    for (dst, src) in track[offset..end].iter_mut().zip(clip) {
        *dst = (*dst + *src).clamp(-1.0, 1.0);
    }
}

/// Write the rendered track as a mono 16-bit PCM WAV file.
pub fn write_wav(path: &Path, samples: &[f32]) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: DUB_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Synthesizer returning a constant-amplitude clip, with optional failures
    /// and a configurable per-line latency.
    struct FakeSynth {
        clip_len: usize,
        fail_on: Option<&'static str>,
        latency: std::time::Duration,
    }

    impl FakeSynth {
        fn instant(clip_len: usize, fail_on: Option<&'static str>) -> Self {
            Self {
                clip_len,
                fail_on,
                latency: std::time::Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeSynth {
        async fn synthesize(&self, text: &str) -> Result<Vec<f32>> {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if self.fail_on == Some(text) {
                return Err(LingokitError::SynthesisFailed {
                    reason: "boom".to_string(),
                });
            }
            Ok(vec![0.5; self.clip_len])
        }
    }

    fn sub(id: u32, start: &str, end: &str, translation: &str) -> Subtitle {
        Subtitle {
            id,
            start: start.to_string(),
            end: end.to_string(),
            text: format!("original {id}"),
            translation: translation.to_string(),
        }
    }

    #[tokio::test]
    async fn failed_line_leaves_silence_and_progress_completes() {
        let subtitles = vec![
            sub(1, "00:00:00", "00:00:01", "one"),
            sub(2, "00:00:02", "00:00:03", "two"),
            sub(3, "00:00:04", "00:00:05", "three"),
        ];
        let synth = FakeSynth::instant(100, Some("two"));
        let progress = Mutex::new(Vec::new());
        let cancel = CancellationToken::new();

        let track = render_dub_track(&subtitles, &synth, &cancel, |done, total| {
            progress.lock().unwrap().push((done, total));
        })
        .await
        .unwrap();

        let rate = DUB_SAMPLE_RATE as usize;
        // Lines 1 and 3 present at their offsets.
        assert_eq!(track[0], 0.5);
        assert_eq!(track[4 * rate], 0.5);
        // Line 2's slot stayed silent.
        assert_eq!(track[2 * rate], 0.0);

        let progress = progress.lock().unwrap();
        assert_eq!(progress.len(), 3);
        assert_eq!(*progress.last().unwrap(), (3, 3));
    }

    #[tokio::test]
    async fn track_length_covers_last_end_plus_margin() {
        let subtitles = vec![sub(1, "00:00:01", "00:00:03", "line")];
        let synth = FakeSynth::instant(10, None);
        let cancel = CancellationToken::new();

        let track = render_dub_track(&subtitles, &synth, &cancel, |_, _| {})
            .await
            .unwrap();

        let expected = ((3.0 + TRAILING_MARGIN_SECS) * DUB_SAMPLE_RATE as f64).ceil() as usize;
        assert_eq!(track.len(), expected);
    }

    #[tokio::test]
    async fn cancellation_stops_the_batch() {
        let subtitles = vec![
            sub(1, "00:00:00", "00:00:01", "one"),
            sub(2, "00:00:01", "00:00:02", "two"),
        ];
        let synth = FakeSynth::instant(10, None);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = render_dub_track(&subtitles, &synth, &cancel, |_, _| {}).await;
        assert!(matches!(result, Err(LingokitError::Cancelled)));
    }

    #[tokio::test]
    async fn cancellation_mid_synthesis_rejects_promptly() {
        let subtitles = vec![sub(1, "00:00:00", "00:00:01", "one")];
        let synth = FakeSynth {
            clip_len: 10,
            fail_on: None,
            latency: std::time::Duration::from_millis(300),
        };
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        let result = render_dub_track(&subtitles, &synth, &cancel, |_, _| {}).await;

        assert!(matches!(result, Err(LingokitError::Cancelled)));
        // The in-flight synthesis must be aborted, not awaited to completion.
        assert!(started.elapsed() < std::time::Duration::from_millis(250));
    }

    #[test]
    fn mix_clamps_to_track_bounds() {
        let mut track = vec![0.0; 10];
        mix_at(&mut track, &[0.5; 8], 5);
        assert_eq!(track[5], 0.5);
        assert_eq!(track[9], 0.5);

        // Entirely past the end is a no-op.
        mix_at(&mut track, &[0.5; 4], 20);
        assert_eq!(track.len(), 10);
    }

    #[test]
    fn wav_round_trip_preserves_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dub.wav");
        let samples = vec![0.0, 0.25, -0.25, 1.0, -1.0];

        write_wav(&path, &samples).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, DUB_SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);

        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded.len(), samples.len());
        assert_eq!(decoded[0], 0);
        assert_eq!(decoded[3], i16::MAX);
    }
}
