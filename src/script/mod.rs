//! Dialogue script engine: structured turns parsed from generated text.
//!
//! [`Script::parse`] turns raw model output into an ordered sequence of
//! [`DialogueTurn`]s bound to the two speaker roles. Lines matching neither
//! speaker prefix are dropped, never rejected: the engine is total over
//! arbitrary input. [`Script::render_transcript`] is the inverse in spirit,
//! producing the final-view/clipboard form that `parse` can read back.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Speakers and turns
// ---------------------------------------------------------------------------

/// One of the two fixed speaker roles.
///
/// Roles are interchangeable labels bound to concrete personas per dialogue
/// session; turns strictly alternate between them in well-formed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    /// The first role; generated dialogues open with it.
    A,
    /// The second role.
    B,
}

impl Speaker {
    /// The literal label used in prompts and parsing.
    pub fn label(self) -> &'static str {
        match self {
            Self::A => "Speaker A",
            Self::B => "Speaker B",
        }
    }

    /// The alternation partner: the role that speaks next.
    pub fn partner(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Unique turn identifier within one dialogue session.
///
/// Allocated from a monotonic per-script counter; ordering of turns is by
/// position in the script, not by id value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(u64);

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

/// One line of dialogue attributed to a speaker role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueTurn {
    /// Identifier, stable for the lifetime of the script.
    pub id: TurnId,
    /// The speaker role. Immutable after creation.
    pub speaker: Speaker,
    /// Snapshot of the owning persona's name at turn-creation time.
    pub persona_name: String,
    /// The line content. Replaced in place by a refine operation.
    pub text: String,
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

/// The ordered sequence of turns constituting one dialogue session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    turns: Vec<DialogueTurn>,
    next_turn: u64,
}

impl Script {
    /// An empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse raw generated dialogue into a script.
    ///
    /// Each non-blank line is matched against the two speaker prefixes: the
    /// literal role label, an optional parenthesized persona annotation (as
    /// written by [`render_transcript`](Self::render_transcript)), then a
    /// colon. Matching is case-sensitive. A line matching role one binds to
    /// `persona_a`, role two to `persona_b`; anything else is silently
    /// dropped. Never fails: empty input or input with no matching lines
    /// yields an empty script.
    pub fn parse(raw: &str, persona_a: &str, persona_b: &str) -> Self {
        let mut script = Self::new();
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(text) = match_speaker_line(line, Speaker::A) {
                script.push_turn(Speaker::A, persona_a.to_owned(), text);
            } else if let Some(text) = match_speaker_line(line, Speaker::B) {
                script.push_turn(Speaker::B, persona_b.to_owned(), text);
            }
        }
        script
    }

    /// Append a turn with a freshly allocated id. Returns the new id.
    pub fn push_turn(
        &mut self,
        speaker: Speaker,
        persona_name: String,
        text: impl Into<String>,
    ) -> TurnId {
        let id = TurnId(self.next_turn);
        self.next_turn = self.next_turn.saturating_add(1);
        self.turns.push(DialogueTurn {
            id,
            speaker,
            persona_name,
            text: text.into(),
        });
        id
    }

    /// Replace the text of the matching turn, preserving id, speaker, and
    /// persona name. Returns whether a turn matched.
    pub fn replace_text(&mut self, id: TurnId, text: impl Into<String>) -> bool {
        match self.turns.iter_mut().find(|t| t.id == id) {
            Some(turn) => {
                turn.text = text.into();
                true
            }
            None => false,
        }
    }

    /// All turns in order.
    pub fn turns(&self) -> &[DialogueTurn] {
        &self.turns
    }

    /// Look up a turn by id.
    pub fn get(&self, id: TurnId) -> Option<&DialogueTurn> {
        self.turns.iter().find(|t| t.id == id)
    }

    /// The most recent turn.
    pub fn last(&self) -> Option<&DialogueTurn> {
        self.turns.last()
    }

    /// The trailing `window` turns (all of them when fewer exist).
    pub fn tail(&self, window: usize) -> &[DialogueTurn] {
        let start = self.turns.len().saturating_sub(window);
        &self.turns[start..]
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the script has no turns.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Render the human-readable transcript used for the final view and
    /// clipboard export.
    ///
    /// Each turn becomes `"{speaker} ({persona_name}): {text}"`, joined by
    /// blank lines. Deterministic, and re-parseable by [`parse`](Self::parse)
    /// when persona names are consistent with the supplied pair.
    pub fn render_transcript(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("{} ({}): {}", turn.speaker, turn.persona_name, turn.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Match one line against a speaker prefix, returning the trimmed remainder.
///
/// Accepts `"Speaker A: text"` and the transcript form
/// `"Speaker A (Name): text"`. The label match is literal and
/// case-sensitive; no other leniency.
fn match_speaker_line(line: &str, speaker: Speaker) -> Option<&str> {
    let rest = line.strip_prefix(speaker.label())?;
    let rest = strip_persona_annotation(rest);
    let text = rest.strip_prefix(':')?;
    Some(text.trim())
}

/// Drop a leading `" (Name)"` annotation if present, else return the input.
fn strip_persona_annotation(rest: &str) -> &str {
    if let Some(after) = rest
        .trim_start()
        .strip_prefix('(')
        .and_then(|inner| inner.split_once(')'))
        .map(|(_, after)| after)
    {
        return after;
    }
    rest
}
