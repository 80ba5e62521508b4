//! The interactive studio surface.
//!
//! A line-oriented command loop that owns the persona store, the view
//! state, and the dialogue director, and maps user commands onto core
//! operations. Every operation failure is converted here into a single
//! user-facing message naming the operation and the reason; no error leaves
//! the store or the script partially updated.

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use crate::analysis::analyze_document;
use crate::dialogue::{DialogueDirector, DialoguePhase, DialogueRequest, SurfaceSnapshot};
use crate::extract::extract_text;
use crate::persona::store::PersonaStore;
use crate::persona::{Persona, PersonaConfiguration, PersonaId, QuestioningFrequency};
use crate::providers::{ModelCatalog, TextGenerator};
use crate::script::TurnId;
use crate::view::{PersonaPanel, ScriptView, ViewState};

/// Result of dispatching one command line.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Text to show the user.
    Reply(String),
    /// The user asked to leave the studio.
    Quit,
}

/// The interactive studio session: all state lives for the process lifetime.
pub struct Studio {
    generator: Arc<dyn TextGenerator>,
    catalog: Arc<dyn ModelCatalog>,
    thinking_budget: Option<u32>,
    store: PersonaStore,
    view: ViewState,
    director: DialogueDirector,
    request: DialogueRequest,
    /// Personas bound to speaker roles one and two by the last successful
    /// script generation.
    bound_pair: Option<(PersonaId, PersonaId)>,
}

impl Studio {
    /// Create an empty studio session on top of the given collaborators.
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        catalog: Arc<dyn ModelCatalog>,
        thinking_budget: Option<u32>,
    ) -> Self {
        Self {
            director: DialogueDirector::new(Arc::clone(&generator), thinking_budget),
            generator,
            catalog,
            thinking_budget,
            store: PersonaStore::new(),
            view: ViewState::new(),
            request: DialogueRequest::default(),
            bound_pair: None,
        }
    }

    /// Dispatch one command line.
    pub async fn handle_line(&mut self, line: &str) -> Outcome {
        let line = line.trim();
        if line.is_empty() {
            return Outcome::Reply(String::new());
        }
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "help" => Outcome::Reply(help_text()),
            "quit" | "exit" => Outcome::Quit,
            "analyze" => Outcome::Reply(self.cmd_analyze(rest).await),
            "personas" => Outcome::Reply(self.cmd_personas()),
            "show" => Outcome::Reply(self.cmd_show(rest)),
            "select" => Outcome::Reply(self.cmd_select(rest)),
            "edit" => Outcome::Reply(self.cmd_edit(rest)),
            "details" => Outcome::Reply(self.cmd_details(rest)),
            "set" => Outcome::Reply(self.cmd_set(rest)),
            "name" => Outcome::Reply(self.cmd_name(rest)),
            "desc" => Outcome::Reply(self.cmd_desc(rest)),
            "save" => Outcome::Reply(self.cmd_save()),
            "cancel" => Outcome::Reply(self.cmd_cancel()),
            "delete" => Outcome::Reply(self.cmd_delete(rest)),
            "move" => Outcome::Reply(self.cmd_move(rest)),
            "topic" => Outcome::Reply(self.cmd_topic(rest)),
            "context" => Outcome::Reply(self.cmd_context(rest)),
            "length" => Outcome::Reply(self.cmd_length(rest)),
            "generate" => Outcome::Reply(self.cmd_generate().await),
            "script" => Outcome::Reply(self.cmd_script().await),
            "view" => Outcome::Reply(self.cmd_view(rest).await),
            "refine" => Outcome::Reply(self.cmd_refine(rest).await),
            "add" => Outcome::Reply(self.cmd_add(rest).await),
            "export" => Outcome::Reply(self.cmd_export().await),
            "models" => Outcome::Reply(self.cmd_models().await),
            other => Outcome::Reply(format!(
                "Unknown command {other:?}. Type `help` for the command list."
            )),
        }
    }

    // ── Personas ──

    async fn cmd_analyze(&mut self, rest: &str) -> String {
        if rest.is_empty() {
            return "Usage: analyze <path-to-.txt-or-.md>".to_owned();
        }
        let text = match extract_text(Path::new(rest)) {
            Ok(text) => text,
            Err(e) => return format!("Analysis failed: {e}"),
        };
        match analyze_document(self.generator.as_ref(), &text, self.thinking_budget).await {
            Ok(result) => {
                let id = self.store.create(result);
                let persona = self.store.get(id).map(|p| p.name.clone()).unwrap_or_default();
                info!(%id, "persona created from analysis");
                format!("Created {persona}. Use `show`, `edit`, or `select` to work with it.")
            }
            Err(e) => format!("Analysis failed: {e}"),
        }
    }

    fn cmd_personas(&self) -> String {
        if self.store.is_empty() {
            return "No personas yet. Use `analyze <file>` to create one.".to_owned();
        }
        let selection = self.store.selection().to_vec();
        let open_panel = self.view.open_panel().map(|(id, _)| id);
        let mut lines = Vec::new();
        for (persona, index) in self.store.personas().iter().zip(1usize..) {
            let selected = if selection.contains(&persona.id) {
                " [selected]"
            } else {
                ""
            };
            let editing = if open_panel == Some(persona.id) {
                " [editing]"
            } else {
                ""
            };
            lines.push(format!("{index}. {}{selected}{editing}", persona.name));
        }
        lines.join("\n")
    }

    fn cmd_show(&self, rest: &str) -> String {
        let persona = match self.persona_at(rest) {
            Ok(p) => p,
            Err(msg) => return msg,
        };
        render_persona(persona)
    }

    fn cmd_select(&mut self, rest: &str) -> String {
        let id = match self.persona_at(rest) {
            Ok(p) => p.id,
            Err(msg) => return msg,
        };
        self.store.toggle_selection(id);
        let names: Vec<&str> = self
            .store
            .selection()
            .iter()
            .filter_map(|id| self.store.get(*id))
            .map(|p| p.name.as_str())
            .collect();
        match names.as_slice() {
            [] => "Selection cleared.".to_owned(),
            [one] => format!("Selected: {one}. Select one more to enable dialogue."),
            pair => format!("Selected: {}. Ready to `generate`.", pair.join(" and ")),
        }
    }

    fn cmd_edit(&mut self, rest: &str) -> String {
        let persona = match self.persona_at(rest) {
            Ok(p) => p.clone(),
            Err(msg) => return msg,
        };
        self.view.open_config_editor(&persona);
        format!(
            "Editing {}'s configuration. Use `set <field> <value>`, then `save` or `cancel`.\n\
             Generation is disabled while this editor is open.",
            persona.name
        )
    }

    fn cmd_details(&mut self, rest: &str) -> String {
        let persona = match self.persona_at(rest) {
            Ok(p) => p.clone(),
            Err(msg) => return msg,
        };
        self.view.open_details_editor(&persona);
        format!(
            "Editing {}'s details. Use `name <text>` and `desc <text>`, then `save` or `cancel`.",
            persona.name
        )
    }

    fn cmd_set(&mut self, rest: &str) -> String {
        let Some((key, value)) = rest.split_once(char::is_whitespace) else {
            return "Usage: set <field> <value>".to_owned();
        };
        let Some((_, draft)) = self.view.config_draft_mut() else {
            return "No configuration editor open. Use `edit <n>` first.".to_owned();
        };
        match apply_config_field(draft, key, value.trim()) {
            Ok(()) => {
                let status = if draft.is_saveable() {
                    "configuration is saveable"
                } else {
                    "percentage groups do not total 100 yet"
                };
                format!("Set {key}. ({status})")
            }
            Err(msg) => msg,
        }
    }

    fn cmd_name(&mut self, rest: &str) -> String {
        match self.view.details_draft_mut() {
            Some((_, name, _)) => {
                *name = rest.to_owned();
                format!("Name staged as {rest:?}. `save` to apply.")
            }
            None => "No details editor open. Use `details <n>` first.".to_owned(),
        }
    }

    fn cmd_desc(&mut self, rest: &str) -> String {
        match self.view.details_draft_mut() {
            Some((_, _, description)) => {
                *description = rest.to_owned();
                "Description staged. `save` to apply.".to_owned()
            }
            None => "No details editor open. Use `details <n>` first.".to_owned(),
        }
    }

    fn cmd_save(&mut self) -> String {
        let Some((id, panel)) = self.view.open_panel() else {
            return "Nothing to save: no editor is open.".to_owned();
        };
        match panel.clone() {
            PersonaPanel::EditingConfig { draft } => {
                if !draft.is_saveable() {
                    return "Cannot save: process shares and speech-function shares must each total 100.".to_owned();
                }
                self.store.update_configuration(id, draft);
                self.view.close();
                "Configuration saved.".to_owned()
            }
            PersonaPanel::EditingDetails { name, description } => {
                if !self.store.update_details(id, &name, &description) {
                    return "Cannot save: the name must not be empty.".to_owned();
                }
                self.view.close();
                "Details saved.".to_owned()
            }
        }
    }

    fn cmd_cancel(&mut self) -> String {
        if self.view.open_panel().is_none() {
            return "No editor open.".to_owned();
        }
        self.view.close();
        "Editor closed, changes discarded.".to_owned()
    }

    fn cmd_delete(&mut self, rest: &str) -> String {
        let mut parts = rest.split_whitespace();
        let index = parts.next().unwrap_or("");
        let confirmed = parts.next() == Some("--yes");
        let persona = match self.persona_at(index) {
            Ok(p) => p,
            Err(msg) => return msg,
        };
        let (id, name) = (persona.id, persona.name.clone());
        if !confirmed {
            return format!(
                "This permanently deletes {name}. Run `delete {index} --yes` to confirm."
            );
        }
        if let Some((open_id, _)) = self.view.open_panel() {
            if open_id == id {
                self.view.close();
            }
        }
        self.store.delete(id);
        format!("{name} deleted.")
    }

    fn cmd_move(&mut self, rest: &str) -> String {
        let mut parts = rest.split_whitespace();
        let (Some(from), Some(to)) = (parts.next(), parts.next()) else {
            return "Usage: move <from> <to>".to_owned();
        };
        let drag = match self.persona_at(from) {
            Ok(p) => p.id,
            Err(msg) => return msg,
        };
        let drop = match self.persona_at(to) {
            Ok(p) => p.id,
            Err(msg) => return msg,
        };
        self.store.reorder(drag, drop);
        self.cmd_personas()
    }

    // ── Dialogue inputs ──

    fn cmd_topic(&mut self, rest: &str) -> String {
        self.request.topic = rest.to_owned();
        format!("Topic set to {rest:?}.")
    }

    fn cmd_context(&mut self, rest: &str) -> String {
        self.request.context = rest.to_owned();
        "Context material set.".to_owned()
    }

    fn cmd_length(&mut self, rest: &str) -> String {
        self.request.length = rest.to_owned();
        format!("Length hint set to {rest:?}.")
    }

    // ── Generation ──

    async fn cmd_generate(&mut self) -> String {
        if !self.view.generation_allowed() {
            return "Close the configuration editor (`save` or `cancel`) before generating."
                .to_owned();
        }
        let Some((a, b)) = self.store.selected_pair() else {
            return "Select exactly two personas (`select <n>`) before generating.".to_owned();
        };
        let pair = (a.id, b.id);
        match self.director.generate_script(a, b, &self.request).await {
            Ok(()) => {
                self.bound_pair = Some(pair);
                let turns = self.director.snapshot().await.turns.len();
                format!("Generated a script with {turns} turns. Use `script` to review it.")
            }
            Err(e) => format!("Dialogue generation failed: {e}"),
        }
    }

    async fn cmd_refine(&mut self, rest: &str) -> String {
        if rest == "cancel" {
            return match self.director.cancel_refine().await {
                Ok(()) => "Refine editor closed.".to_owned(),
                Err(e) => format!("Cannot cancel: {e}"),
            };
        }
        let Some((index, instruction)) = rest.split_once(char::is_whitespace) else {
            return "Usage: refine <turn#> <instruction>  |  refine cancel".to_owned();
        };
        let turn_id = match self.turn_at(index).await {
            Ok(id) => id,
            Err(msg) => return msg,
        };
        let (a, b) = match self.bound_personas() {
            Ok(pair) => pair,
            Err(msg) => return msg,
        };
        if self.director.open_refine_editor(turn_id).await.is_err() {
            return format!("No turn {index} in the current script.");
        }
        match self
            .director
            .refine_turn(turn_id, instruction.trim(), &a, &b)
            .await
        {
            Ok(()) => format!("Turn {index} refined."),
            Err(e) => format!("Refinement failed: {e}"),
        }
    }

    async fn cmd_add(&mut self, rest: &str) -> String {
        if rest == "cancel" {
            return match self.director.cancel_add_line().await {
                Ok(()) => "Add-line editor closed.".to_owned(),
                Err(e) => format!("Cannot cancel: {e}"),
            };
        }
        if rest.is_empty() {
            return "Usage: add <instruction>  |  add cancel".to_owned();
        }
        if !self.view.generation_allowed() {
            return "Close the configuration editor (`save` or `cancel`) before adding lines."
                .to_owned();
        }
        let (a, b) = match self.bound_personas() {
            Ok(pair) => pair,
            Err(msg) => return msg,
        };
        if let Err(e) = self.director.open_add_line().await {
            return format!("Failed to add line: {e}");
        }
        match self.director.append_next_turn(rest, &a, &b).await {
            Ok(()) => {
                let snapshot = self.director.snapshot().await;
                match snapshot.turns.last() {
                    Some(turn) => format!("Added: {} ({}): {}", turn.speaker, turn.persona_name, turn.text),
                    None => "Line added.".to_owned(),
                }
            }
            Err(e) => format!("Failed to add line: {e}"),
        }
    }

    // ── Script display ──

    async fn cmd_script(&self) -> String {
        let snapshot = self.director.snapshot().await;
        match snapshot.phase {
            DialoguePhase::Empty => {
                "No script yet. Set a `topic`, `select` two personas, then `generate`.".to_owned()
            }
            DialoguePhase::Generating => "Script generation is in flight.".to_owned(),
            DialoguePhase::Populated(ScriptView::Final) => self.director.transcript().await,
            DialoguePhase::Populated(ScriptView::Editor) => render_editor(&snapshot),
        }
    }

    async fn cmd_view(&self, rest: &str) -> String {
        let view = match rest {
            "final" => ScriptView::Final,
            "editor" => ScriptView::Editor,
            _ => return "Usage: view final | view editor".to_owned(),
        };
        match self.director.set_view(view).await {
            Ok(()) => self.cmd_script().await,
            Err(e) => format!("Cannot switch view: {e}"),
        }
    }

    async fn cmd_export(&self) -> String {
        let transcript = self.director.transcript().await;
        if transcript.is_empty() {
            "Nothing to export yet.".to_owned()
        } else {
            transcript
        }
    }

    async fn cmd_models(&self) -> String {
        match self.catalog.list_models().await {
            Ok(models) if models.is_empty() => "No generation-capable models reported.".to_owned(),
            Ok(models) => {
                let current = self.generator.model_id();
                models
                    .iter()
                    .map(|m| {
                        if m.as_str() == current {
                            format!("* {m} (current)")
                        } else {
                            format!("  {m}")
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            // Listing failure is non-fatal; the studio works with no list.
            Err(e) => format!("Failed to load models: {e}"),
        }
    }

    // ── Lookups ──

    fn persona_at(&self, token: &str) -> Result<&Persona, String> {
        let index: usize = token
            .parse()
            .map_err(|_| format!("Expected a persona number, got {token:?}."))?;
        index
            .checked_sub(1)
            .and_then(|i| self.store.personas().get(i))
            .ok_or_else(|| format!("No persona {index}. Use `personas` to list them."))
    }

    async fn turn_at(&self, token: &str) -> Result<TurnId, String> {
        let index: usize = token
            .parse()
            .map_err(|_| format!("Expected a turn number, got {token:?}."))?;
        let snapshot = self.director.snapshot().await;
        index
            .checked_sub(1)
            .and_then(|i| snapshot.turns.get(i))
            .map(|turn| turn.id)
            .ok_or_else(|| format!("No turn {index} in the current script."))
    }

    /// The personas bound to the speaker roles by the last generation.
    ///
    /// Returned by value: configurations are read at request time, so edits
    /// saved while a refine/append is in flight do not retroactively apply.
    fn bound_personas(&self) -> Result<(Persona, Persona), String> {
        let Some((a_id, b_id)) = self.bound_pair else {
            return Err("No dialogue session yet. `generate` a script first.".to_owned());
        };
        match (self.store.get(a_id), self.store.get(b_id)) {
            (Some(a), Some(b)) => Ok((a.clone(), b.clone())),
            _ => Err(
                "A persona bound to this dialogue was deleted. `generate` a new script.".to_owned(),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering and field parsing
// ---------------------------------------------------------------------------

fn help_text() -> String {
    [
        "Commands:",
        "",
        "  analyze <file>        analyze a .txt/.md document into a persona",
        "  personas              list personas",
        "  show <n>              show a persona's analysis and configuration",
        "  select <n>            toggle a persona for dialogue (max 2)",
        "  edit <n>              open the configuration editor",
        "  set <field> <value>   change a draft field (see `show` for fields)",
        "  details <n>           open the name/description editor",
        "  name <text>           stage a new name",
        "  desc <text>           stage a new description",
        "  save | cancel         apply or discard the open editor",
        "  delete <n> [--yes]    delete a persona (asks for confirmation)",
        "  move <from> <to>      reorder personas",
        "  topic <text>          set the dialogue topic",
        "  context <text>        set contextual material",
        "  length <text>         set the length hint",
        "  generate              generate the dialogue script",
        "  script                show the current script",
        "  refine <turn#> <how>  regenerate one turn  |  refine cancel",
        "  add <how>             append the next turn |  add cancel",
        "  view final|editor     switch script views",
        "  export                print the final transcript",
        "  models                list available models",
        "  quit                  leave the studio",
    ]
    .join("\n")
}

fn render_persona(persona: &Persona) -> String {
    let analysis = &persona.analysis;
    let config = persona.configuration();
    let saveable = if config.is_saveable() {
        "valid"
    } else {
        "percentages do not total 100"
    };
    format!(
        "{name}\n\
         {description}\n\
         Mapping: {style}; {confidence} confidence; {stance} stance; {organization} organization\n\
         Ideational: material {material}%, mental {mental}%, relational {relational}%, verbal {verbal}%; technicality {technicality}/10; logical relations: {logical}\n\
         Interpersonal: statements {statements}%, questions {questions}%, offers/commands {offers}%; probability {probability}/10; usuality {usuality}/10; questioning {qfreq:?}; appraisal: {appraisal}\n\
         Textual: density {density}/10; intricacy {intricacy}/10; references: {references}; conjunctives: {conjunctives}; progression: {progression}; question sequences: {sequences}\n\
         Configuration: {saveable}",
        name = persona.name,
        description = if persona.description.is_empty() {
            "(no description)"
        } else {
            &persona.description
        },
        style = analysis.persona_mapping.style,
        confidence = analysis.persona_mapping.confidence,
        stance = analysis.persona_mapping.stance,
        organization = analysis.persona_mapping.organization,
        material = config.ideational.material_processes,
        mental = config.ideational.mental_processes,
        relational = config.ideational.relational_processes,
        verbal = config.ideational.verbal_processes,
        technicality = config.ideational.technicality_level,
        logical = config.ideational.logical_relations,
        statements = config.interpersonal.statements,
        questions = config.interpersonal.questions,
        offers = config.interpersonal.offers_commands,
        probability = config.interpersonal.probability_modality,
        usuality = config.interpersonal.usuality_modality,
        qfreq = config.interpersonal.questioning_frequency,
        appraisal = config.interpersonal.appraisal,
        density = config.textual.lexical_density,
        intricacy = config.textual.grammatical_intricacy,
        references = config.textual.reference_chains,
        conjunctives = config.textual.conjunctive_adverbs,
        progression = config.textual.thematic_progression,
        sequences = config.textual.question_sequences,
    )
}

fn render_editor(snapshot: &SurfaceSnapshot) -> String {
    let mut lines = Vec::new();
    for (turn, index) in snapshot.turns.iter().zip(1usize..) {
        let mut markers = String::new();
        if snapshot.refining == Some(turn.id) {
            markers.push_str(" [refining]");
        } else if snapshot.refine_target == Some(turn.id) {
            markers.push_str(" [refine editor open]");
        }
        lines.push(format!(
            "{index}. {} ({}): {}{markers}",
            turn.speaker, turn.persona_name, turn.text
        ));
    }
    if snapshot.add_line_open {
        lines.push("   [add-line editor open]".to_owned());
    }
    lines.join("\n")
}

fn apply_config_field(
    draft: &mut PersonaConfiguration,
    key: &str,
    value: &str,
) -> Result<(), String> {
    fn number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
        value
            .parse()
            .map_err(|_| format!("{key} expects a number, got {value:?}."))
    }

    match key {
        "material" => draft.ideational.material_processes = number(key, value)?,
        "mental" => draft.ideational.mental_processes = number(key, value)?,
        "relational" => draft.ideational.relational_processes = number(key, value)?,
        "verbal" => draft.ideational.verbal_processes = number(key, value)?,
        "technicality" => draft.ideational.technicality_level = number(key, value)?,
        "logical" => draft.ideational.logical_relations = value.to_owned(),
        "statements" => draft.interpersonal.statements = number(key, value)?,
        "questions" => draft.interpersonal.questions = number(key, value)?,
        "offers" => draft.interpersonal.offers_commands = number(key, value)?,
        "probability" => draft.interpersonal.probability_modality = number(key, value)?,
        "usuality" => draft.interpersonal.usuality_modality = number(key, value)?,
        "qfreq" => {
            draft.interpersonal.questioning_frequency = match value {
                "low" | "Low" => QuestioningFrequency::Low,
                "medium" | "Medium" => QuestioningFrequency::Medium,
                "high" | "High" => QuestioningFrequency::High,
                _ => return Err("qfreq expects low, medium, or high.".to_owned()),
            }
        }
        "appraisal" => draft.interpersonal.appraisal = value.to_owned(),
        "density" => draft.textual.lexical_density = number(key, value)?,
        "intricacy" => draft.textual.grammatical_intricacy = number(key, value)?,
        "references" => draft.textual.reference_chains = value.to_owned(),
        "conjunctives" => draft.textual.conjunctive_adverbs = value.to_owned(),
        "progression" => draft.textual.thematic_progression = value.to_owned(),
        "sequences" => draft.textual.question_sequences = value.to_owned(),
        other => return Err(format!("Unknown field {other:?}.")),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Command loop
// ---------------------------------------------------------------------------

/// Run the interactive command loop until the user quits or stdin closes.
///
/// # Errors
///
/// Returns an error only when stdin/stdout themselves fail.
pub async fn run(studio: &mut Studio) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(b"sflcast studio. Type `help` for commands.\n")
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"sflcast> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match studio.handle_line(&line).await {
            Outcome::Quit => break,
            Outcome::Reply(reply) => {
                if !reply.is_empty() {
                    stdout.write_all(reply.as_bytes()).await?;
                    stdout.write_all(b"\n").await?;
                }
            }
        }
    }
    Ok(())
}
