//! Document analysis: turning source text into an [`AnalysisResult`].
//!
//! The linguistic analysis itself is delegated entirely to the generative
//! model; this module builds the SFL analysis prompt, requests a JSON
//! response, and deserializes the payload. Models occasionally wrap JSON in
//! markdown code fences despite instructions, so the payload is unfenced
//! before parsing.

use tracing::{debug, instrument};

use crate::persona::AnalysisResult;
use crate::providers::{GenerateOptions, ProviderError, TextGenerator};

/// Temperature for analysis calls. Low: the output is a structured profile,
/// not prose.
const ANALYSIS_TEMPERATURE: f32 = 0.2;

/// Errors surfaced by document analysis.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The document contained no analyzable text.
    #[error("the document appears to be empty")]
    EmptyDocument,
    /// The model call failed.
    #[error("analysis failed: {0}")]
    Provider(#[from] ProviderError),
    /// The model responded, but not with a valid analysis payload.
    #[error("the model returned a malformed analysis: {0}")]
    Malformed(String),
}

/// Analyze a document and derive a persona configuration from it.
///
/// # Errors
///
/// Returns [`AnalysisError::EmptyDocument`] before any model call when the
/// text is blank, [`AnalysisError::Provider`] when generation fails, and
/// [`AnalysisError::Malformed`] when the response is not a valid analysis
/// payload.
#[instrument(skip_all, fields(chars = text.len()))]
pub async fn analyze_document(
    provider: &dyn TextGenerator,
    text: &str,
    thinking_budget: Option<u32>,
) -> Result<AnalysisResult, AnalysisError> {
    if text.trim().is_empty() {
        return Err(AnalysisError::EmptyDocument);
    }

    let options = GenerateOptions {
        temperature: ANALYSIS_TEMPERATURE,
        thinking_budget,
        json_response: true,
    };
    let raw = provider.generate(&analysis_prompt(text), &options).await?;

    let payload = strip_code_fences(&raw);
    let result: AnalysisResult =
        serde_json::from_str(payload).map_err(|e| AnalysisError::Malformed(e.to_string()))?;
    debug!(model = provider.model_id(), "document analysis parsed");
    Ok(result)
}

/// Build the SFL analysis prompt for a source document.
fn analysis_prompt(text: &str) -> String {
    format!(
        r#"Analyze the following source document from the perspective of Systemic Functional Linguistics (SFL).
Based on your analysis, generate a single, valid JSON object with exactly this shape:

{{
  "sflAnalysis": {{
    "processDistribution": {{"material": number, "mental": number, "relational": number, "verbal": number}},
    "technicality": {{"score": number, "description": string}},
    "modalityProfile": string,
    "appraisalSummary": string,
    "cohesionSummary": string
  }},
  "personaMapping": {{"style": string, "confidence": string, "stance": string, "organization": string}},
  "personaConfiguration": {{
    "ideational": {{"materialProcesses": number, "mentalProcesses": number, "relationalProcesses": number, "verbalProcesses": number, "technicalityLevel": integer, "logicalRelations": string}},
    "interpersonal": {{"statements": number, "questions": number, "offersCommands": number, "probabilityModality": integer, "usualityModality": integer, "questioningFrequency": "Low" | "Medium" | "High", "appraisal": string}},
    "textual": {{"lexicalDensity": integer, "grammaticalIntricacy": integer, "referenceChains": string, "conjunctiveAdverbs": string, "thematicProgression": string, "questionSequences": string}}
  }}
}}

**Source Document:**
"""
{text}
"""

**Instructions:**
1. processDistribution: calculate the percentage of Material, Mental, Relational, and Verbal processes. The sum must be 100.
2. technicality: score from 1-10 with a brief justification.
3. modalityProfile, appraisalSummary, cohesionSummary: concise summaries based on the document's language.
4. personaMapping: synthesize a communication style, confidence level, stance, and organization approach from the SFL analysis.
5. personaConfiguration: translate the SFL analysis into the configuration profile. All integer scores are 1-10. Percentage groups must each sum to 100.

The output must be ONLY the JSON object, without any surrounding text or markdown."#
    )
}

/// Strip a leading/trailing markdown code fence from a JSON payload.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the first newline, then the
    // closing fence.
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.strip_suffix("```").unwrap_or(body).trim()
}
