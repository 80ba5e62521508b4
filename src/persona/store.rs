//! Ordered persona collection with a bounded comparison/dialogue selection.
//!
//! The store exclusively owns every [`Persona`]; consumers get read
//! references and submit whole-configuration replacements. All mutations are
//! synchronous and immediately visible. Deletion confirmation is the
//! caller's concern.

use tracing::debug;

use super::{AnalysisResult, Persona, PersonaConfiguration, PersonaId};

/// Maximum number of personas that can be selected at once.
const SELECTION_CAP: usize = 2;

/// Ordered collection of personas plus the 0-2 element selection set.
#[derive(Debug, Default)]
pub struct PersonaStore {
    personas: Vec<Persona>,
    selection: Vec<PersonaId>,
}

impl PersonaStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a persona from a completed analysis and append it.
    ///
    /// The default name is positional: `"Persona N"` where N is the store
    /// size at call time plus one. Names are not renumbered on deletion, so
    /// deleting "Persona 1" and creating again yields "Persona 2" a second
    /// time. Returns the new persona's id.
    pub fn create(&mut self, analysis: AnalysisResult) -> PersonaId {
        let id = PersonaId::new();
        let name = format!("Persona {}", self.personas.len().saturating_add(1));
        debug!(%id, name, "persona created");
        self.personas.push(Persona {
            id,
            name,
            description: String::new(),
            analysis,
        });
        id
    }

    /// All personas in display order.
    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    /// Look up a persona by id.
    pub fn get(&self, id: PersonaId) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    /// Number of stored personas.
    pub fn len(&self) -> usize {
        self.personas.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    /// Replace the configuration of the matching persona.
    ///
    /// Silent no-op when `id` is unknown. Only
    /// `analysis.persona_configuration` changes; the rest of the analysis
    /// record is immutable.
    pub fn update_configuration(&mut self, id: PersonaId, configuration: PersonaConfiguration) {
        if let Some(persona) = self.personas.iter_mut().find(|p| p.id == id) {
            persona.analysis.persona_configuration = configuration;
            debug!(%id, "persona configuration replaced");
        }
    }

    /// Replace a persona's name and description.
    ///
    /// Rejects an empty or whitespace-only name as a no-op. Returns whether
    /// the update was applied.
    pub fn update_details(&mut self, id: PersonaId, name: &str, description: &str) -> bool {
        if name.trim().is_empty() {
            return false;
        }
        match self.personas.iter_mut().find(|p| p.id == id) {
            Some(persona) => {
                persona.name = name.trim().to_owned();
                persona.description = description.to_owned();
                true
            }
            None => false,
        }
    }

    /// Remove a persona, also clearing it from the selection set.
    ///
    /// Returns whether anything was removed. The user-confirmation step
    /// happens before this call, at the surface layer.
    pub fn delete(&mut self, id: PersonaId) -> bool {
        let before = self.personas.len();
        self.personas.retain(|p| p.id != id);
        self.selection.retain(|s| *s != id);
        let removed = self.personas.len() < before;
        if removed {
            debug!(%id, "persona deleted");
        }
        removed
    }

    /// Move the persona at `drag`'s position to `drop`'s position.
    ///
    /// List splice, not a swap: the dragged entry is removed and reinserted
    /// at the index the drop target occupied. No-op when either id is absent
    /// or they are equal.
    pub fn reorder(&mut self, drag: PersonaId, drop: PersonaId) {
        if drag == drop {
            return;
        }
        let Some(from) = self.personas.iter().position(|p| p.id == drag) else {
            return;
        };
        let Some(to) = self.personas.iter().position(|p| p.id == drop) else {
            return;
        };
        let persona = self.personas.remove(from);
        self.personas.insert(to.min(self.personas.len()), persona);
    }

    /// Toggle a persona in or out of the selection set.
    ///
    /// Removes the id when present; otherwise adds it only while fewer than
    /// two are selected. A third selection attempt is a no-op. Unknown ids
    /// are ignored.
    pub fn toggle_selection(&mut self, id: PersonaId) {
        if let Some(pos) = self.selection.iter().position(|s| *s == id) {
            self.selection.remove(pos);
            return;
        }
        if self.get(id).is_some() && self.selection.len() < SELECTION_CAP {
            self.selection.push(id);
        }
    }

    /// Currently selected persona ids, in selection order.
    pub fn selection(&self) -> &[PersonaId] {
        &self.selection
    }

    /// The selected pair, when exactly two personas are selected.
    ///
    /// Selection order is preserved: the first selected persona becomes
    /// speaker role one in a dialogue session.
    pub fn selected_pair(&self) -> Option<(&Persona, &Persona)> {
        match self.selection.as_slice() {
            [first, second] => Some((self.get(*first)?, self.get(*second)?)),
            _ => None,
        }
    }
}
