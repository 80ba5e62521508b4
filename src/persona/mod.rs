//! Persona model: SFL analysis records and the editable persona configuration.
//!
//! A [`Persona`] is created from a completed document analysis and owned by
//! the [`store::PersonaStore`]. Its [`PersonaConfiguration`] is the editable
//! part; the surrounding [`AnalysisResult`] is an immutable record of the
//! originating analysis.
//!
//! Field names serialize as camelCase so the JSON schema sent to the model
//! and the payload it returns use the same vocabulary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod store;

// ---------------------------------------------------------------------------
// Analysis record
// ---------------------------------------------------------------------------

/// Distribution of process types found in the source document (percentages).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessDistribution {
    /// Material (doing/happening) processes.
    pub material: f64,
    /// Mental (sensing/thinking) processes.
    pub mental: f64,
    /// Relational (being/having) processes.
    pub relational: f64,
    /// Verbal (saying) processes.
    pub verbal: f64,
}

/// Technicality score with a short justification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technicality {
    /// Score from 1 to 10.
    pub score: f64,
    /// Why the document earned this score.
    pub description: String,
}

/// Summary of the document along the three SFL metafunctions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SflAnalysis {
    /// Process type distribution (ideational metafunction).
    pub process_distribution: ProcessDistribution,
    /// Technicality of the vocabulary.
    pub technicality: Technicality,
    /// Modality profile (interpersonal metafunction).
    pub modality_profile: String,
    /// Use of evaluative language.
    pub appraisal_summary: String,
    /// Primary cohesive devices (textual metafunction).
    pub cohesion_summary: String,
}

/// Human-readable persona characterisation synthesised from the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaMapping {
    /// Communication style, e.g. "Definitional".
    pub style: String,
    /// Confidence level.
    pub confidence: String,
    /// Stance toward the subject matter.
    pub stance: String,
    /// Organisational approach to communication.
    pub organization: String,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Ideational settings: what the persona talks about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeationalSettings {
    /// Share of material processes (percentage).
    pub material_processes: f64,
    /// Share of mental processes (percentage).
    pub mental_processes: f64,
    /// Share of relational processes (percentage).
    pub relational_processes: f64,
    /// Share of verbal processes (percentage).
    pub verbal_processes: f64,
    /// Technicality of vocabulary, 1-10.
    pub technicality_level: u8,
    /// Preferred logical relations, free text (e.g. "causal chains").
    pub logical_relations: String,
}

/// How often the persona asks questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestioningFrequency {
    /// Rarely asks questions.
    Low,
    /// Occasionally asks questions.
    Medium,
    /// Frequently asks questions.
    High,
}

/// Interpersonal settings: how the persona interacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpersonalSettings {
    /// Share of statements among speech functions (percentage).
    pub statements: f64,
    /// Share of questions (percentage).
    pub questions: f64,
    /// Share of offers and commands (percentage).
    pub offers_commands: f64,
    /// Probability/certainty modality, 1-10.
    pub probability_modality: u8,
    /// Usuality modality, 1-10.
    pub usuality_modality: u8,
    /// Questioning frequency band.
    pub questioning_frequency: QuestioningFrequency,
    /// Appraisal tone, free text (e.g. "measured and appreciative").
    pub appraisal: String,
}

/// Textual settings: how the persona organises text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextualSettings {
    /// Lexical density, 1-10.
    pub lexical_density: u8,
    /// Grammatical intricacy, 1-10.
    pub grammatical_intricacy: u8,
    /// Reference chain usage, free text.
    pub reference_chains: String,
    /// Conjunctive adverb usage, free text.
    pub conjunctive_adverbs: String,
    /// Thematic progression pattern, free text.
    pub thematic_progression: String,
    /// Question sequence usage, free text.
    pub question_sequences: String,
}

/// The editable three-metafunction persona configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaConfiguration {
    /// Ideational metafunction settings.
    pub ideational: IdeationalSettings,
    /// Interpersonal metafunction settings.
    pub interpersonal: InterpersonalSettings,
    /// Textual metafunction settings.
    pub textual: TextualSettings,
}

impl PersonaConfiguration {
    /// Whether the configuration satisfies both percentage invariants and may
    /// be saved.
    ///
    /// The four ideational process shares and the three interpersonal speech
    /// function shares must each total 100, with the sum rounded to the
    /// nearest integer before comparison. Every other field, including slider
    /// values outside 1-10, is accepted as-is.
    pub fn is_saveable(&self) -> bool {
        let process_total = rounded_sum(&[
            self.ideational.material_processes,
            self.ideational.mental_processes,
            self.ideational.relational_processes,
            self.ideational.verbal_processes,
        ]);
        let speech_total = rounded_sum(&[
            self.interpersonal.statements,
            self.interpersonal.questions,
            self.interpersonal.offers_commands,
        ]);
        process_total == 100 && speech_total == 100
    }
}

/// Sum a percentage group and round the total to the nearest integer.
#[allow(clippy::cast_possible_truncation)] // percentage totals are far below i64 range
fn rounded_sum(shares: &[f64]) -> i64 {
    shares.iter().sum::<f64>().round() as i64
}

// ---------------------------------------------------------------------------
// Full analysis result and the persona entity
// ---------------------------------------------------------------------------

/// Everything the analysis collaborator produces for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// SFL metafunction summary.
    pub sfl_analysis: SflAnalysis,
    /// Persona characterisation.
    pub persona_mapping: PersonaMapping,
    /// Derived configuration, the editable part.
    pub persona_configuration: PersonaConfiguration,
}

/// Unique persona identifier.
///
/// Random UUIDs rather than wall-clock timestamps, so rapid sequential
/// creation cannot collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonaId(Uuid);

impl PersonaId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PersonaId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PersonaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A named, editable persona derived from one document analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    /// Unique identifier assigned at creation.
    pub id: PersonaId,
    /// User-editable display name. Defaults to a positional label.
    pub name: String,
    /// User-editable description. May be empty.
    pub description: String,
    /// The originating analysis. Only `persona_configuration` inside it is
    /// replaced after creation; the rest is an immutable record.
    pub analysis: AnalysisResult,
}

impl Persona {
    /// The persona's current configuration.
    pub fn configuration(&self) -> &PersonaConfiguration {
        &self.analysis.persona_configuration
    }
}
