//! Dialogue session orchestration.
//!
//! The [`DialogueDirector`] owns the [`Script`] for one dialogue session and
//! coordinates the three asynchronous generation operations: whole-script
//! generation, single-turn refinement, and next-turn continuation. Each
//! operation is gated by its own in-flight marker (a second request for the
//! same target is rejected, never queued), and every in-flight result is
//! committed only if the session epoch it captured is still current.
//! Results that resolve after the script was replaced wholesale are
//! discarded, not spliced.
//!
//! Locks are held only across synchronous state transitions, never across a
//! model call.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::persona::Persona;
use crate::providers::{GenerateOptions, ProviderError, TextGenerator};
use crate::script::{DialogueTurn, Script, Speaker, TurnId};
use crate::view::ScriptView;

pub mod prompt;

/// Temperature for whole-script generation. Higher: dialogue wants variety.
const DIALOGUE_TEMPERATURE: f32 = 0.75;
/// Temperature for single-line refinement.
const REFINE_TEMPERATURE: f32 = 0.6;
/// Temperature for next-line continuation.
const NEXT_LINE_TEMPERATURE: f32 = 0.7;
/// Trailing turns supplied as continuation context.
const HISTORY_WINDOW: usize = 4;

// ---------------------------------------------------------------------------
// Request and error types
// ---------------------------------------------------------------------------

/// User inputs for whole-script generation.
#[derive(Debug, Clone)]
pub struct DialogueRequest {
    /// What the dialogue is about. Required.
    pub topic: String,
    /// Contextual material to weave in. May be empty.
    pub context: String,
    /// Length hint passed verbatim to the model.
    pub length: String,
}

impl Default for DialogueRequest {
    fn default() -> Self {
        Self {
            topic: String::new(),
            context: String::new(),
            length: "Short (1-3 mins)".to_owned(),
        }
    }
}

/// Errors surfaced by dialogue operations.
#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    /// Invalid user input, caught before any model call.
    #[error("{0}")]
    Validation(String),
    /// The same mutation target already has a request in flight.
    #[error("a {0} request is already in flight")]
    Busy(&'static str),
    /// The referenced turn does not exist in the current script.
    #[error("no {0} in the current script")]
    TurnNotFound(TurnId),
    /// The model call failed or produced no usable text.
    #[error(transparent)]
    Generation(#[from] ProviderError),
}

/// Where the dialogue surface is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialoguePhase {
    /// No script yet.
    #[default]
    Empty,
    /// Whole-script generation in flight.
    Generating,
    /// A script is present, displayed in the given view.
    Populated(ScriptView),
}

// ---------------------------------------------------------------------------
// Surface state
// ---------------------------------------------------------------------------

/// Mutable dialogue surface, guarded by the director's mutex.
#[derive(Debug, Default)]
struct Surface {
    script: Script,
    phase: DialoguePhase,
    /// Bumped on every whole-script generation; in-flight operations
    /// compare against it before splicing.
    epoch: u64,
    /// Turn whose refine editor is open.
    refine_target: Option<TurnId>,
    /// Turn with a refinement request in flight.
    refining: Option<TurnId>,
    /// Whether the add-line editor is open.
    add_line_open: bool,
    /// Whether a next-line request is in flight.
    adding_line: bool,
}

/// Point-in-time copy of the dialogue surface for display and gating.
#[derive(Debug, Clone)]
pub struct SurfaceSnapshot {
    /// The turns, in order.
    pub turns: Vec<DialogueTurn>,
    /// Lifecycle phase.
    pub phase: DialoguePhase,
    /// Turn whose refine editor is open.
    pub refine_target: Option<TurnId>,
    /// Turn currently being refined, exposed so callers can block redundant
    /// submissions.
    pub refining: Option<TurnId>,
    /// Whether the add-line editor is open.
    pub add_line_open: bool,
    /// Whether a next-line request is in flight.
    pub adding_line: bool,
}

// ---------------------------------------------------------------------------
// Director
// ---------------------------------------------------------------------------

/// Coordinates generation operations against one dialogue session.
pub struct DialogueDirector {
    provider: Arc<dyn TextGenerator>,
    thinking_budget: Option<u32>,
    surface: Mutex<Surface>,
}

impl DialogueDirector {
    /// Create a director with an empty surface.
    pub fn new(provider: Arc<dyn TextGenerator>, thinking_budget: Option<u32>) -> Self {
        Self {
            provider,
            thinking_budget,
            surface: Mutex::new(Surface::default()),
        }
    }

    fn options(&self, temperature: f32) -> GenerateOptions {
        GenerateOptions {
            temperature,
            thinking_budget: self.thinking_budget,
            json_response: false,
        }
    }

    /// Snapshot the surface for display.
    pub async fn snapshot(&self) -> SurfaceSnapshot {
        let s = self.surface.lock().await;
        SurfaceSnapshot {
            turns: s.script.turns().to_vec(),
            phase: s.phase,
            refine_target: s.refine_target,
            refining: s.refining,
            add_line_open: s.add_line_open,
            adding_line: s.adding_line,
        }
    }

    /// Render the final transcript of the current script.
    pub async fn transcript(&self) -> String {
        self.surface.lock().await.script.render_transcript()
    }

    /// Switch between the editor and final views.
    ///
    /// # Errors
    ///
    /// Returns [`DialogueError::Validation`] when no script is populated.
    pub async fn set_view(&self, view: ScriptView) -> Result<(), DialogueError> {
        let mut s = self.surface.lock().await;
        match s.phase {
            DialoguePhase::Populated(_) => {
                s.phase = DialoguePhase::Populated(view);
                Ok(())
            }
            _ => Err(DialogueError::Validation(
                "there is no script to view yet".to_owned(),
            )),
        }
    }

    /// Generate a complete two-speaker script, replacing any current one.
    ///
    /// Resets all per-turn edit state on entry and bumps the session epoch so
    /// stale refine/append results from the previous script are discarded
    /// when they resolve. On failure the surface returns to empty; no
    /// partial script is ever committed.
    ///
    /// # Errors
    ///
    /// [`DialogueError::Validation`] when the topic is blank (no model call
    /// is made), [`DialogueError::Busy`] when a generation is already in
    /// flight, [`DialogueError::Generation`] when the model call fails or
    /// returns no text.
    pub async fn generate_script(
        &self,
        persona_a: &Persona,
        persona_b: &Persona,
        request: &DialogueRequest,
    ) -> Result<(), DialogueError> {
        if request.topic.trim().is_empty() {
            return Err(DialogueError::Validation(
                "enter a dialogue topic first".to_owned(),
            ));
        }

        let epoch = {
            let mut s = self.surface.lock().await;
            if s.phase == DialoguePhase::Generating {
                return Err(DialogueError::Busy("script generation"));
            }
            s.phase = DialoguePhase::Generating;
            s.script = Script::new();
            s.refine_target = None;
            s.refining = None;
            s.add_line_open = false;
            s.adding_line = false;
            s.epoch = s.epoch.wrapping_add(1);
            s.epoch
        };

        info!(topic = %request.topic, "generating dialogue script");
        let prompt = prompt::initial_script(
            persona_a.configuration(),
            persona_b.configuration(),
            request,
        );
        let result = self
            .provider
            .generate(&prompt, &self.options(DIALOGUE_TEMPERATURE))
            .await
            .and_then(require_text);

        let mut s = self.surface.lock().await;
        if s.epoch != epoch {
            warn!("discarding stale script generation result");
            return Ok(());
        }
        match result {
            Ok(text) => {
                s.script = Script::parse(&text, &persona_a.name, &persona_b.name);
                s.phase = DialoguePhase::Populated(ScriptView::Editor);
                info!(turns = s.script.len(), "dialogue script committed");
                Ok(())
            }
            Err(e) => {
                s.phase = DialoguePhase::Empty;
                Err(e.into())
            }
        }
    }

    /// Open the refine editor on a turn.
    ///
    /// # Errors
    ///
    /// [`DialogueError::TurnNotFound`] when the turn does not exist.
    pub async fn open_refine_editor(&self, turn_id: TurnId) -> Result<(), DialogueError> {
        let mut s = self.surface.lock().await;
        if s.script.get(turn_id).is_none() {
            return Err(DialogueError::TurnNotFound(turn_id));
        }
        s.refine_target = Some(turn_id);
        Ok(())
    }

    /// Close the refine editor without refining.
    ///
    /// # Errors
    ///
    /// [`DialogueError::Busy`] while a refinement is in flight.
    pub async fn cancel_refine(&self) -> Result<(), DialogueError> {
        let mut s = self.surface.lock().await;
        if s.refining.is_some() {
            return Err(DialogueError::Busy("turn refinement"));
        }
        s.refine_target = None;
        Ok(())
    }

    /// Regenerate one turn's text under a user instruction.
    ///
    /// The persona configuration is resolved from the turn's speaker binding
    /// at request time; edits saved while the request is in flight do not
    /// retroactively affect it. Only the matching turn's text changes; id,
    /// speaker, and persona name are preserved. On failure the turn is
    /// untouched and the refine editor stays open for retry.
    ///
    /// # Errors
    ///
    /// [`DialogueError::Validation`] when the instruction is blank,
    /// [`DialogueError::TurnNotFound`] when the turn does not exist (the
    /// script is untouched), [`DialogueError::Busy`] while another
    /// refinement is in flight, [`DialogueError::Generation`] when the model
    /// call fails.
    pub async fn refine_turn(
        &self,
        turn_id: TurnId,
        instruction: &str,
        persona_a: &Persona,
        persona_b: &Persona,
    ) -> Result<(), DialogueError> {
        if instruction.trim().is_empty() {
            return Err(DialogueError::Validation(
                "enter a refinement instruction".to_owned(),
            ));
        }

        let (epoch, speaker, original_text) = {
            let mut s = self.surface.lock().await;
            let turn = s
                .script
                .get(turn_id)
                .ok_or(DialogueError::TurnNotFound(turn_id))?;
            let speaker = turn.speaker;
            let original_text = turn.text.clone();
            if s.refining.is_some() {
                return Err(DialogueError::Busy("turn refinement"));
            }
            s.refining = Some(turn_id);
            s.refine_target = Some(turn_id);
            (s.epoch, speaker, original_text)
        };

        let config = match speaker {
            Speaker::A => persona_a.configuration(),
            Speaker::B => persona_b.configuration(),
        };
        let prompt = prompt::refine_line(&original_text, config, instruction);
        let result = self
            .provider
            .generate(&prompt, &self.options(REFINE_TEMPERATURE))
            .await
            .and_then(require_text);

        let mut s = self.surface.lock().await;
        if s.epoch != epoch {
            warn!(%turn_id, "discarding stale refinement result");
            return Ok(());
        }
        match result {
            Ok(text) => {
                if !s.script.replace_text(turn_id, text.trim()) {
                    warn!(%turn_id, "refined turn no longer present");
                }
                s.refining = None;
                s.refine_target = None;
                info!(%turn_id, "turn refined");
                Ok(())
            }
            Err(e) => {
                // The refine editor stays open so the user may retry.
                s.refining = None;
                Err(e.into())
            }
        }
    }

    /// Open the add-line editor.
    ///
    /// # Errors
    ///
    /// [`DialogueError::Validation`] when the script is empty.
    pub async fn open_add_line(&self) -> Result<(), DialogueError> {
        let mut s = self.surface.lock().await;
        if s.script.is_empty() {
            return Err(DialogueError::Validation(
                "generate a script before adding lines".to_owned(),
            ));
        }
        s.add_line_open = true;
        Ok(())
    }

    /// Close the add-line editor without generating.
    ///
    /// # Errors
    ///
    /// [`DialogueError::Busy`] while a next-line request is in flight.
    pub async fn cancel_add_line(&self) -> Result<(), DialogueError> {
        let mut s = self.surface.lock().await;
        if s.adding_line {
            return Err(DialogueError::Busy("next-line generation"));
        }
        s.add_line_open = false;
        Ok(())
    }

    /// Generate and append exactly one turn to the end of the script.
    ///
    /// The next speaker is the alternation partner of the last turn's
    /// speaker, resolved to its bound persona. Only the trailing
    /// [`HISTORY_WINDOW`] turns are supplied as context. On success the
    /// add-line editor closes; on failure it stays open for retry and the
    /// script is unchanged.
    ///
    /// # Errors
    ///
    /// [`DialogueError::Validation`] when the script or instruction is
    /// empty, [`DialogueError::Busy`] while a next-line request is in
    /// flight, [`DialogueError::Generation`] when the model call fails.
    pub async fn append_next_turn(
        &self,
        instruction: &str,
        persona_a: &Persona,
        persona_b: &Persona,
    ) -> Result<(), DialogueError> {
        if instruction.trim().is_empty() {
            return Err(DialogueError::Validation(
                "enter an instruction for the next line".to_owned(),
            ));
        }

        let (epoch, next_speaker, history) = {
            let mut s = self.surface.lock().await;
            let Some(last) = s.script.last() else {
                return Err(DialogueError::Validation(
                    "the script is empty; generate a dialogue first".to_owned(),
                ));
            };
            let next_speaker = last.speaker.partner();
            if s.adding_line {
                return Err(DialogueError::Busy("next-line generation"));
            }
            let history = s.script.tail(HISTORY_WINDOW).to_vec();
            s.adding_line = true;
            s.add_line_open = true;
            (s.epoch, next_speaker, history)
        };

        let persona = match next_speaker {
            Speaker::A => persona_a,
            Speaker::B => persona_b,
        };
        let prompt = prompt::next_line(&history, next_speaker, persona.configuration(), instruction);
        let result = self
            .provider
            .generate(&prompt, &self.options(NEXT_LINE_TEMPERATURE))
            .await
            .and_then(require_text);

        let mut s = self.surface.lock().await;
        if s.epoch != epoch {
            warn!("discarding stale next-line result");
            return Ok(());
        }
        match result {
            Ok(text) => {
                let id = s
                    .script
                    .push_turn(next_speaker, persona.name.clone(), text.trim());
                s.adding_line = false;
                s.add_line_open = false;
                info!(%id, speaker = %next_speaker, "turn appended");
                Ok(())
            }
            Err(e) => {
                // The add-line editor stays open so the user may retry.
                s.adding_line = false;
                Err(e.into())
            }
        }
    }
}

/// Reject blank model output before it reaches the script.
fn require_text(text: String) -> Result<String, ProviderError> {
    if text.trim().is_empty() {
        return Err(ProviderError::Empty(
            "the model returned no text".to_owned(),
        ));
    }
    Ok(text)
}
