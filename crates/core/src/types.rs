use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One time-coded subtitle line. Timestamps are `"HH:MM:SS"` text, exactly as
/// the model emits them; they are normalized only at export time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtitle {
    pub id: u32,
    pub start: String,
    pub end: String,
    pub text: String,
    pub translation: String,
}

/// A study note. The timestamp is free text and is not validated against the
/// subtitle timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub timestamp: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: String,
    pub term: String,
    pub definition: String,
    pub context: String,
}

/// The full study kit produced by one generation call. Created atomically from
/// a single AI response and never partially updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyKit {
    pub subtitles: Vec<Subtitle>,
    pub notes: Vec<Note>,
    pub flashcards: Vec<Flashcard>,
}

/// User-selected generation options.
#[derive(Debug, Clone)]
pub struct KitOptions {
    /// Source language of the media, or `None` for auto-detect.
    pub source_language: Option<String>,
    /// Language the subtitles are translated into.
    pub target_language: String,
    pub notes: bool,
    pub flashcards: bool,
}

impl Default for KitOptions {
    fn default() -> Self {
        Self {
            source_language: None,
            target_language: "en".to_string(),
            notes: true,
            flashcards: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Compact wire schema
// ---------------------------------------------------------------------------

/// The token-compact response payload. Field names are deliberately short to
/// leave as much of the output budget as possible to the transcript itself.
#[derive(Debug, Deserialize)]
pub struct RawKit {
    #[serde(default)]
    pub subs: Vec<RawSubtitle>,
    #[serde(default)]
    pub nts: Vec<RawNote>,
    #[serde(default)]
    pub cards: Vec<RawFlashcard>,
}

#[derive(Debug, Deserialize)]
pub struct RawSubtitle {
    /// Sequence number.
    pub i: u32,
    /// Start timestamp, "HH:MM:SS".
    pub s: String,
    /// End timestamp, "HH:MM:SS".
    pub e: String,
    /// Original-language text.
    pub o: String,
    /// Translated text.
    pub t: String,
}

#[derive(Debug, Deserialize)]
pub struct RawNote {
    pub ts: String,
    pub ti: String,
    pub c: String,
}

#[derive(Debug, Deserialize)]
pub struct RawFlashcard {
    /// Identifier; generated locally when the model omits it.
    #[serde(default)]
    pub i: Option<String>,
    pub t: String,
    pub d: String,
    #[serde(default)]
    pub c: Option<String>,
}

impl From<RawKit> for StudyKit {
    fn from(raw: RawKit) -> Self {
        let subtitles = raw
            .subs
            .into_iter()
            .map(|s| Subtitle {
                id: s.i,
                start: s.s,
                end: s.e,
                text: s.o,
                translation: s.t,
            })
            .collect();

        let notes = raw
            .nts
            .into_iter()
            .map(|n| Note {
                timestamp: n.ts,
                title: n.ti,
                content: n.c,
            })
            .collect();

        let flashcards = raw
            .cards
            .into_iter()
            .map(|c| Flashcard {
                id: c.i.unwrap_or_else(|| Uuid::new_v4().to_string()),
                term: c.t,
                definition: c.d,
                context: c.c.unwrap_or_default(),
            })
            .collect();

        StudyKit {
            subtitles,
            notes,
            flashcards,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_payload_expands_with_no_data_dropped() {
        let json = r#"{
            "subs": [
                {"i": 1, "s": "00:00:01", "e": "00:00:04", "o": "你好世界", "t": "Hello world"},
                {"i": 2, "s": "00:00:04", "e": "00:00:07", "o": "再见", "t": "Goodbye"}
            ],
            "nts": [
                {"ts": "00:00:01", "ti": "Greeting", "c": "A common opening phrase."}
            ],
            "cards": [
                {"i": "c1", "t": "你好", "d": "hello", "c": "你好世界"}
            ]
        }"#;

        let raw: RawKit = serde_json::from_str(json).unwrap();
        let kit = StudyKit::from(raw);

        assert_eq!(kit.subtitles.len(), 2);
        assert_eq!(kit.subtitles[0].id, 1);
        assert_eq!(kit.subtitles[0].start, "00:00:01");
        assert_eq!(kit.subtitles[0].end, "00:00:04");
        assert_eq!(kit.subtitles[0].text, "你好世界");
        assert_eq!(kit.subtitles[0].translation, "Hello world");

        assert_eq!(kit.notes.len(), 1);
        assert_eq!(kit.notes[0].timestamp, "00:00:01");
        assert_eq!(kit.notes[0].title, "Greeting");
        assert_eq!(kit.notes[0].content, "A common opening phrase.");

        assert_eq!(kit.flashcards.len(), 1);
        assert_eq!(kit.flashcards[0].id, "c1");
        assert_eq!(kit.flashcards[0].term, "你好");
        assert_eq!(kit.flashcards[0].definition, "hello");
        assert_eq!(kit.flashcards[0].context, "你好世界");
    }

    #[test]
    fn missing_card_id_is_generated() {
        let json = r#"{"cards": [{"t": "term", "d": "definition"}]}"#;
        let kit = StudyKit::from(serde_json::from_str::<RawKit>(json).unwrap());

        assert_eq!(kit.flashcards.len(), 1);
        assert!(!kit.flashcards[0].id.is_empty());
        assert_eq!(kit.flashcards[0].context, "");
    }

    #[test]
    fn absent_sections_default_to_empty() {
        let json = r#"{"subs": []}"#;
        let kit = StudyKit::from(serde_json::from_str::<RawKit>(json).unwrap());

        assert!(kit.subtitles.is_empty());
        assert!(kit.notes.is_empty());
        assert!(kit.flashcards.is_empty());
    }
}
