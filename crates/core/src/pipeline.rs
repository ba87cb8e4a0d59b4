//! Export surface: everything the CLI writes to disk.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::{
    dub,
    error::{LingokitError, Result},
    format::{SrtMode, format_srt},
    types::{StudyKit, Subtitle},
};

/// Write the subtitle list as an SRT file in the given mode.
pub async fn export_srt(subtitles: &[Subtitle], mode: SrtMode, path: &Path) -> Result<()> {
    fs::write(path, format_srt(subtitles, mode)).await?;
    Ok(())
}

/// Write the rendered dub track as a WAV file.
pub fn export_dub_audio(samples: &[f32], path: &Path) -> Result<()> {
    dub::write_wav(path, samples)
}

/// Copy the source media into the output directory, byte-identical, under its
/// original file name.
pub async fn export_source_media(source: &Path, out_dir: &Path) -> Result<PathBuf> {
    let file_name = source
        .file_name()
        .ok_or_else(|| LingokitError::MediaNotFound {
            path: source.to_path_buf(),
        })?;
    let dest = out_dir.join(file_name);
    fs::copy(source, &dest).await?;
    Ok(dest)
}

/// Save the whole kit as pretty JSON.
pub async fn save_study_kit(kit: &StudyKit, path: &Path) -> Result<()> {
    let pretty_json = serde_json::to_string_pretty(kit)?;
    fs::write(path, &pretty_json).await?;
    Ok(())
}

/// Load a previously saved kit.
pub async fn load_study_kit(path: &Path) -> Result<StudyKit> {
    let json_content = fs::read_to_string(path).await?;
    let kit: StudyKit = serde_json::from_str(&json_content)?;
    Ok(kit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kit() -> StudyKit {
        StudyKit {
            subtitles: vec![Subtitle {
                id: 1,
                start: "00:00:01".to_string(),
                end: "00:00:03".to_string(),
                text: "你好".to_string(),
                translation: "Hello".to_string(),
            }],
            notes: vec![],
            flashcards: vec![],
        }
    }

    #[tokio::test]
    async fn kit_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kit.json");

        let original = kit();
        save_study_kit(&original, &path).await.unwrap();
        let loaded = load_study_kit(&path).await.unwrap();

        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn srt_export_writes_normalized_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subs.srt");

        export_srt(&kit().subtitles, SrtMode::Bilingual, &path)
            .await
            .unwrap();

        let text = fs::read_to_string(&path).await.unwrap();
        assert!(text.starts_with("1\n00:00:01,000 --> 00:00:03,000\n你好\nHello\n"));
    }

    #[tokio::test]
    async fn source_media_copy_is_byte_identical_under_original_name() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("lesson.mp4");
        fs::write(&source, b"fake media bytes").await.unwrap();

        let dest = export_source_media(&source, out_dir.path()).await.unwrap();

        assert_eq!(dest.file_name().unwrap(), "lesson.mp4");
        assert_eq!(fs::read(&dest).await.unwrap(), b"fake media bytes");
    }
}
