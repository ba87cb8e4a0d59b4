//! Local best-effort speech playback via the platform speech tool.
//!
//! Unlike the remote dub path this produces no audio data; it just speaks a
//! line out loud. The returned [`SpeechHandle`] lets callers await actual
//! completion instead of pretending playback finished the moment it started.

use tokio::process::{Child, Command};

use crate::error::{LingokitError, Result};

/// Handle to an in-progress local speech playback.
pub struct SpeechHandle {
    program: &'static str,
    child: Child,
}

impl SpeechHandle {
    /// Wait for playback to finish.
    pub async fn wait(mut self) -> Result<()> {
        let status = self.child.wait().await?;
        if !status.success() {
            return Err(LingokitError::PlaybackFailed {
                program: self.program.to_string(),
                reason: format!("exited with {status}"),
            });
        }
        Ok(())
    }
}

/// Program and arguments for speaking `text` in `language`.
fn speech_invocation(text: &str, language: &str) -> (&'static str, Vec<String>) {
    if cfg!(target_os = "macos") {
        ("say", vec![text.to_string()])
    } else {
        (
            "espeak-ng",
            vec!["-v".to_string(), language.to_string(), text.to_string()],
        )
    }
}

/// Start speaking one line. A missing speech binary surfaces as a normal
/// error; playback quality is whatever the platform provides.
pub fn speak(text: &str, language: &str) -> Result<SpeechHandle> {
    let (program, args) = speech_invocation(text, language);
    let child = Command::new(program)
        .args(&args)
        .spawn()
        .map_err(|e| LingokitError::PlaybackFailed {
            program: program.to_string(),
            reason: e.to_string(),
        })?;
    Ok(SpeechHandle { program, child })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_carries_text_and_language() {
        let (program, args) = speech_invocation("hello there", "en");
        if cfg!(target_os = "macos") {
            assert_eq!(program, "say");
            assert_eq!(args, vec!["hello there"]);
        } else {
            assert_eq!(program, "espeak-ng");
            assert_eq!(args, vec!["-v", "en", "hello there"]);
        }
    }
}
