//! Subtitle export formatting and the media mux command string.

use std::path::Path;

use crate::types::Subtitle;

/// Which text lines an exported SRT block carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SrtMode {
    /// Original line followed by the translated line.
    #[default]
    Bilingual,
    Original,
    Translated,
}

/// Normalize a timestamp for SRT: timestamps without a millisecond component
/// get `,000` appended; timestamps already containing a comma pass through
/// unmodified.
pub fn normalize_srt_timestamp(ts: &str) -> String {
    if ts.contains(',') {
        ts.to_string()
    } else {
        format!("{ts},000")
    }
}

/// Parse `"HH:MM:SS"` or `"HH:MM:SS,mmm"` into seconds. Returns `None` for
/// anything else; the model's timestamps are text and arrive unvalidated.
pub fn timestamp_seconds(ts: &str) -> Option<f64> {
    let (hms, millis) = match ts.split_once(',') {
        Some((hms, ms)) => (hms, ms.parse::<u32>().ok()?),
        None => (ts, 0),
    };

    let mut parts = hms.split(':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;
    let seconds: u32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    Some(f64::from(hours * 3600 + minutes * 60 + seconds) + f64::from(millis) / 1000.0)
}

/// Render the subtitle list as SRT text: sequential blocks of
/// `<index>\n<start> --> <end>\n<line(s)>\n\n`.
pub fn format_srt(subtitles: &[Subtitle], mode: SrtMode) -> String {
    let mut output = String::new();

    for (index, subtitle) in subtitles.iter().enumerate() {
        output.push_str(&format!("{}\n", index + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            normalize_srt_timestamp(&subtitle.start),
            normalize_srt_timestamp(&subtitle.end)
        ));
        match mode {
            SrtMode::Bilingual => {
                output.push_str(&subtitle.text);
                output.push('\n');
                output.push_str(&subtitle.translation);
                output.push('\n');
            }
            SrtMode::Original => {
                output.push_str(&subtitle.text);
                output.push('\n');
            }
            SrtMode::Translated => {
                output.push_str(&subtitle.translation);
                output.push('\n');
            }
        }
        output.push('\n');
    }

    output
}

/// Build the ffmpeg command that overlays the dubbed audio track onto the
/// source video. The string is for the user to run; it is never executed here.
pub fn mux_command(video: &Path, dubbed_audio: &Path, output: &Path) -> String {
    format!(
        "ffmpeg -i \"{}\" -i \"{}\" -map 0:v -map 1:a -c:v copy -shortest \"{}\"",
        video.display(),
        dubbed_audio.display(),
        output.display()
    )
}
