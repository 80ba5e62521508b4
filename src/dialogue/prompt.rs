//! Prompt construction for the three dialogue operations.
//!
//! Initial generation gets the full two-persona SFL profiles; refinement and
//! continuation get a compact single-persona profile. Output-format rules
//! keep the model's text parseable by the script engine.

use crate::persona::PersonaConfiguration;
use crate::script::{DialogueTurn, Speaker};

use super::DialogueRequest;

/// Full profile block for one speaker in the initial-dialogue prompt.
fn speaker_profile(label: &str, config: &PersonaConfiguration) -> String {
    format!(
        r#"**{label} PERSONA PROFILE:**

**1. IDEATIONAL (What {label} talks about):**
*   **Process Mix:** Material: {material}%, Mental: {mental}%, Relational: {relational}%, Verbal: {verbal}%.
*   **Technicality Level:** {technicality}/10.
*   **Logical Relations:** Prefers {logical}.

**2. INTERPERSONAL (How {label} interacts):**
*   **Speech Functions (Overall Turn Mix):** {statements}% Statements, {questions}% Questions, {offers}% Offers/Commands.
*   **Modality Profile:**
    *   Probability/Certainty Score: {probability}/10.
    *   Usuality Score: {usuality}/10.
*   **Appraisal:** Adopts a tone that is {appraisal}.

**3. TEXTUAL (How {label} organizes text):**
*   **Linguistic Style:** Lexical density is {density}/10; Grammatical intricacy is {intricacy}/10.
*   **Cohesion:** Uses {references} and {conjunctives}.
*   **Thematic Progression:** Follows a pattern of {progression}."#,
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
        appraisal = config.interpersonal.appraisal,
        density = config.textual.lexical_density,
        intricacy = config.textual.grammatical_intricacy,
        references = config.textual.reference_chains,
        conjunctives = config.textual.conjunctive_adverbs,
        progression = config.textual.thematic_progression,
    )
}

/// Compact profile used by refine and continuation prompts.
fn compact_profile(config: &PersonaConfiguration) -> String {
    format!(
        r#"*   **Ideational Profile:** Process Mix (Mat: {material}%, Men: {mental}%, Rel: {relational}%, Ver: {verbal}%); Technicality: {technicality}/10.
*   **Interpersonal Profile:** Speech Mix (Stmt: {statements}%, Qst: {questions}%, Off/Cmd: {offers}%); Modality (Prob: {probability}/10, Usu: {usuality}/10); Appraisal: {appraisal}.
*   **Textual Profile:** Lexical Density: {density}/10; Grammatical Intricacy: {intricacy}/10."#,
        material = config.ideational.material_processes,
        mental = config.ideational.mental_processes,
        relational = config.ideational.relational_processes,
        verbal = config.ideational.verbal_processes,
        technicality = config.ideational.technicality_level,
        statements = config.interpersonal.statements,
        questions = config.interpersonal.questions,
        offers = config.interpersonal.offers_commands,
        probability = config.interpersonal.probability_modality,
        usuality = config.interpersonal.usuality_modality,
        appraisal = config.interpersonal.appraisal,
        density = config.textual.lexical_density,
        intricacy = config.textual.grammatical_intricacy,
    )
}

/// Prompt for generating a complete two-speaker dialogue.
pub fn initial_script(
    config_a: &PersonaConfiguration,
    config_b: &PersonaConfiguration,
    request: &DialogueRequest,
) -> String {
    let context = if request.context.trim().is_empty() {
        "No specific context provided."
    } else {
        request.context.as_str()
    };
    format!(
        r#"You are an expert dialogue writer. Your task is to generate an engaging podcast-style dialogue between two speakers (Speaker A and Speaker B), each with a distinct Systemic Functional Linguistics (SFL) persona configuration.

**Core Instructions:**
1.  **Topic:** The dialogue MUST be about: "{topic}".
2.  **Context:** The dialogue should incorporate and reference the following contextual material: "{context}".
3.  **Length:** The dialogue should be of a "{length}" length.
4.  **Adherence:** Strictly adhere to the linguistic specifications for EACH speaker provided below.

---

{profile_a}

---

{profile_b}

---

**OUTPUT INSTRUCTIONS:**
*   Generate a dialogue starting with Speaker A.
*   Format the output with "Speaker A:" and "Speaker B:" prefixes for each turn.
*   Ensure each speaker's dialogue strictly adheres to their specified linguistic profile.
*   Do NOT include any other text, explanations, or analysis. Only the dialogue itself."#,
        topic = request.topic,
        length = request.length,
        profile_a = speaker_profile("SPEAKER A", config_a),
        profile_b = speaker_profile("SPEAKER B", config_b),
    )
}

/// Prompt for rewriting a single line under a user instruction.
pub fn refine_line(
    original_text: &str,
    config: &PersonaConfiguration,
    instruction: &str,
) -> String {
    format!(
        r#"You are an AI assistant helping a user refine a single line of dialogue.

**Your Persona:**
You must adopt the following SFL persona configuration for your response.
{profile}

**Task:**
Rewrite the following line of dialogue based *only* on the user's instruction.

**Original Dialogue Line:**
"{original_text}"

**User's Instruction:**
"{instruction}"

**Output Rules:**
1.  Return **only the rewritten dialogue line**.
2.  Do **not** add any prefixes like "Speaker A:" or explanations.
3.  Ensure the rewritten line maintains the core persona defined above."#,
        profile = compact_profile(config),
    )
}

/// Prompt for generating the next line after the trailing history window.
pub fn next_line(
    history: &[DialogueTurn],
    next_speaker: Speaker,
    config: &PersonaConfiguration,
    instruction: &str,
) -> String {
    let history_text = history
        .iter()
        .map(|turn| format!("{}: {}", turn.speaker, turn.text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an AI assistant generating the next line in a dialogue.

**Your Persona (for the new line):**
You are {next_speaker}. You must adopt the following SFL persona configuration.
{profile}

**Task:**
Based on the dialogue history below and the following user instruction, generate a single, logical next line for your character ({next_speaker}).

**Dialogue History:**
{history_text}

**User Instruction:**
"{instruction}"

**Output Rules:**
1.  Return **only the new dialogue line**.
2.  Do **not** add any prefixes like "Speaker A:" or explanations.
3.  Ensure the new line is a natural continuation of the conversation and strictly adheres to your persona and the user instruction."#,
        profile = compact_profile(config),
    )
}
