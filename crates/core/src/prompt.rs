//! Instruction prompt and response schema for the study-kit generation call.
//!
//! The schema uses deliberately short field names (`subs`, `nts`, `cards`,
//! single-letter keys) so that almost all of the model's output budget goes to
//! the transcript itself rather than to JSON scaffolding. The expansion back
//! into the full data model lives in [`crate::types`].

use serde_json::{Value, json};

use crate::types::KitOptions;

const TRANSCRIPTION_RULES: &str = "\
Rules for the transcript:
1. Transcribe VERBATIM. Do not paraphrase, summarize, censor, or skip any \
spoken content, including filler words and false starts.
2. Cover the ENTIRE duration of the media from the first second to the last. \
Leave no gaps: every stretch of speech must appear in some subtitle line.
3. Split the speech into natural subtitle lines of roughly 3-8 seconds each. \
Timestamps are \"HH:MM:SS\", zero-padded, and lines must be ordered by start \
time with each line's end at or before the next line's start.
4. For every line, provide both the original-language text (o) and its \
translation (t).";

/// Rule 5 names only the sections that are actually enabled, so a disabled
/// section is never mentioned anywhere in the prompt.
fn budget_rule(opts: &KitOptions) -> &'static str {
    match (opts.notes, opts.flashcards) {
        (true, true) => {
            "5. If the output budget becomes tight, ALWAYS prioritize \
             transcript completeness: shorten or drop notes and flashcards \
             before omitting any subtitle line."
        }
        (true, false) => {
            "5. If the output budget becomes tight, ALWAYS prioritize \
             transcript completeness: shorten or drop notes before omitting \
             any subtitle line."
        }
        (false, true) => {
            "5. If the output budget becomes tight, ALWAYS prioritize \
             transcript completeness: shorten or drop flashcards before \
             omitting any subtitle line."
        }
        (false, false) => {
            "5. If the output budget becomes tight, never omit or shorten any \
             subtitle line."
        }
    }
}

/// Build the full instruction prompt for one generation request.
pub fn build_instruction(opts: &KitOptions) -> String {
    let mut prompt = String::new();

    match &opts.source_language {
        Some(lang) => prompt.push_str(&format!(
            "You are a language-learning assistant. The media is in {lang}. \
             Produce a complete, verbatim, time-coded transcript of all speech, \
             translated into {target}.\n\n",
            lang = lang,
            target = opts.target_language
        )),
        None => prompt.push_str(&format!(
            "You are a language-learning assistant. Detect the spoken language \
             of the media, then produce a complete, verbatim, time-coded \
             transcript of all speech, translated into {target}.\n\n",
            target = opts.target_language
        )),
    }

    prompt.push_str(TRANSCRIPTION_RULES);
    prompt.push('\n');
    prompt.push_str(budget_rule(opts));
    prompt.push('\n');

    if opts.notes {
        prompt.push_str(
            "\nAlso produce study notes (nts): for each key grammar point, \
             idiom, or cultural reference, one note with the timestamp where it \
             occurs (ts), a short title (ti), and an explanation (c).\n",
        );
    }
    if opts.flashcards {
        prompt.push_str(
            "\nAlso produce vocabulary flashcards (cards): for each word or \
             phrase worth memorizing, the term (t), its definition (d), and the \
             sentence it appeared in (c).\n",
        );
    }

    prompt.push_str(
        "\nRespond with JSON matching the provided schema and nothing else.",
    );

    prompt
}

/// The structured-output schema sent alongside the prompt. Sections the user
/// disabled are omitted entirely so the model does not spend tokens on them.
pub fn response_schema(opts: &KitOptions) -> Value {
    let mut properties = json!({
        "subs": {
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "i": { "type": "INTEGER" },
                    "s": { "type": "STRING" },
                    "e": { "type": "STRING" },
                    "o": { "type": "STRING" },
                    "t": { "type": "STRING" }
                },
                "required": ["i", "s", "e", "o", "t"]
            }
        }
    });
    let mut required = vec!["subs"];

    if opts.notes {
        properties["nts"] = json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "ts": { "type": "STRING" },
                    "ti": { "type": "STRING" },
                    "c": { "type": "STRING" }
                },
                "required": ["ts", "ti", "c"]
            }
        });
        required.push("nts");
    }
    if opts.flashcards {
        properties["cards"] = json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "i": { "type": "STRING" },
                    "t": { "type": "STRING" },
                    "d": { "type": "STRING" },
                    "c": { "type": "STRING" }
                },
                "required": ["t", "d"]
            }
        });
        required.push("cards");
    }

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_detect_prompt_mentions_detection() {
        let opts = KitOptions::default();
        let prompt = build_instruction(&opts);
        assert!(prompt.contains("Detect the spoken language"));
        assert!(prompt.contains("VERBATIM"));
    }

    #[test]
    fn explicit_language_is_named() {
        let opts = KitOptions {
            source_language: Some("Japanese".to_string()),
            ..KitOptions::default()
        };
        let prompt = build_instruction(&opts);
        assert!(prompt.contains("The media is in Japanese"));
    }

    #[test]
    fn disabled_sections_are_absent_from_prompt_and_schema() {
        let opts = KitOptions {
            notes: false,
            flashcards: false,
            ..KitOptions::default()
        };
        let prompt = build_instruction(&opts);
        assert!(!prompt.contains("study notes"));
        assert!(!prompt.contains("flashcards"));

        let schema = response_schema(&opts);
        assert!(schema["properties"]["nts"].is_null());
        assert!(schema["properties"]["cards"].is_null());
        assert_eq!(schema["required"], json!(["subs"]));
    }

    #[test]
    fn budget_rule_tracks_enabled_sections() {
        let opts = KitOptions {
            flashcards: false,
            ..KitOptions::default()
        };
        let prompt = build_instruction(&opts);
        assert!(prompt.contains("shorten or drop notes before"));
        assert!(!prompt.contains("flashcards"));

        let neither = KitOptions {
            notes: false,
            flashcards: false,
            ..KitOptions::default()
        };
        let prompt = build_instruction(&neither);
        assert!(prompt.contains("never omit or shorten any subtitle line"));
    }

    #[test]
    fn full_schema_requires_all_sections() {
        let schema = response_schema(&KitOptions::default());
        assert_eq!(schema["required"], json!(["subs", "nts", "cards"]));
        assert!(schema["properties"]["subs"]["items"]["properties"]["o"].is_object());
    }
}
