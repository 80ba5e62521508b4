//! View-state coordination for the editing surfaces.
//!
//! One discriminated [`PersonaPanel`] value per open persona replaces the
//! parallel "which editor is open" flags a UI tends to accumulate, so
//! impossible combinations (both editors open for one persona) cannot be
//! represented. At most one persona panel is open at a time in the
//! single-pane studio.

use crate::persona::{Persona, PersonaConfiguration, PersonaId};

/// How the dialogue script is being displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptView {
    /// Turn-by-turn editor with refine/continue controls.
    #[default]
    Editor,
    /// Read-only final transcript.
    Final,
}

/// The editing surface open for one persona.
#[derive(Debug, Clone, PartialEq)]
pub enum PersonaPanel {
    /// Configuration editor, holding the draft being edited. The stored
    /// configuration is untouched until the draft is saved.
    EditingConfig {
        /// Working copy of the configuration.
        draft: PersonaConfiguration,
    },
    /// Name/description editor with its staged values.
    EditingDetails {
        /// Staged name.
        name: String,
        /// Staged description.
        description: String,
    },
}

/// Tracks which editing surface is open and the exclusion rules between
/// them.
#[derive(Debug, Default)]
pub struct ViewState {
    open_panel: Option<(PersonaId, PersonaPanel)>,
}

impl ViewState {
    /// No editor open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the configuration editor for a persona, seeding the draft from
    /// its current configuration. Closes any other open panel, including the
    /// details editor for the same persona.
    pub fn open_config_editor(&mut self, persona: &Persona) {
        self.open_panel = Some((
            persona.id,
            PersonaPanel::EditingConfig {
                draft: persona.configuration().clone(),
            },
        ));
    }

    /// Open the name/description editor for a persona. Closes any other open
    /// panel, including the configuration editor for the same persona.
    pub fn open_details_editor(&mut self, persona: &Persona) {
        self.open_panel = Some((
            persona.id,
            PersonaPanel::EditingDetails {
                name: persona.name.clone(),
                description: persona.description.clone(),
            },
        ));
    }

    /// Close whatever panel is open, discarding any draft.
    pub fn close(&mut self) {
        self.open_panel = None;
    }

    /// The open panel, if any.
    pub fn open_panel(&self) -> Option<(PersonaId, &PersonaPanel)> {
        self.open_panel.as_ref().map(|(id, panel)| (*id, panel))
    }

    /// Mutable access to the open configuration draft.
    pub fn config_draft_mut(&mut self) -> Option<(PersonaId, &mut PersonaConfiguration)> {
        match self.open_panel.as_mut() {
            Some((id, PersonaPanel::EditingConfig { draft })) => Some((*id, draft)),
            _ => None,
        }
    }

    /// Mutable access to the open details draft as `(name, description)`.
    pub fn details_draft_mut(&mut self) -> Option<(PersonaId, &mut String, &mut String)> {
        match self.open_panel.as_mut() {
            Some((id, PersonaPanel::EditingDetails { name, description })) => {
                Some((*id, name, description))
            }
            _ => None,
        }
    }

    /// Whether dialogue generation and next-turn continuation are permitted.
    ///
    /// False while a configuration editor is open: generation reads persona
    /// configurations, and interleaving it with an edit about to be saved
    /// would generate against a value mid-change.
    pub fn generation_allowed(&self) -> bool {
        !matches!(
            self.open_panel,
            Some((_, PersonaPanel::EditingConfig { .. }))
        )
    }
}
