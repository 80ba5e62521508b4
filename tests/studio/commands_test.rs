//! Command-loop tests: the studio surface driving the core end-to-end.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;

use sflcast::providers::{GenerateOptions, ModelCatalog, ProviderError, TextGenerator};
use sflcast::studio::{Outcome, Studio};

// ---------------------------------------------------------------------------
// Mock collaborator
// ---------------------------------------------------------------------------

/// Serves queued generation responses and a fixed model listing.
struct StudioProvider {
    responses: StdMutex<VecDeque<String>>,
    models: Vec<String>,
    fail_models: bool,
}

impl StudioProvider {
    fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: StdMutex::new(responses.iter().map(|s| (*s).to_owned()).collect()),
            models: vec!["gemini-2.5-flash".to_owned(), "gemini-2.0-flash".to_owned()],
            fail_models: false,
        })
    }

    fn with_failing_catalog() -> Arc<Self> {
        Arc::new(Self {
            responses: StdMutex::new(VecDeque::new()),
            models: Vec::new(),
            fail_models: true,
        })
    }
}

#[async_trait]
impl TextGenerator for StudioProvider {
    async fn generate(
        &self,
        _prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<String, ProviderError> {
        self.responses
            .lock()
            .expect("response queue")
            .pop_front()
            .ok_or_else(|| ProviderError::Empty("queue exhausted".to_owned()))
    }

    fn model_id(&self) -> &str {
        "gemini-2.5-flash"
    }
}

#[async_trait]
impl ModelCatalog for StudioProvider {
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        if self.fail_models {
            return Err(ProviderError::HttpStatus {
                status: 403,
                body: "forbidden".to_owned(),
            });
        }
        Ok(self.models.clone())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn analysis_json() -> String {
    serde_json::json!({
        "sflAnalysis": {
            "processDistribution": {"material": 40.0, "mental": 30.0, "relational": 20.0, "verbal": 10.0},
            "technicality": {"score": 6.0, "description": "specialist"},
            "modalityProfile": "confident",
            "appraisalSummary": "restrained",
            "cohesionSummary": "tight"
        },
        "personaMapping": {"style": "Definitional", "confidence": "High", "stance": "Neutral", "organization": "Linear"},
        "personaConfiguration": {
            "ideational": {"materialProcesses": 40.0, "mentalProcesses": 30.0, "relationalProcesses": 20.0, "verbalProcesses": 10.0, "technicalityLevel": 6, "logicalRelations": "causal"},
            "interpersonal": {"statements": 70.0, "questions": 20.0, "offersCommands": 10.0, "probabilityModality": 6, "usualityModality": 5, "questioningFrequency": "Medium", "appraisal": "measured"},
            "textual": {"lexicalDensity": 7, "grammaticalIntricacy": 4, "referenceChains": "pronouns", "conjunctiveAdverbs": "however", "thematicProgression": "linear", "questionSequences": "rare"}
        }
    })
    .to_string()
}

fn document_file(dir: &tempfile::TempDir) -> String {
    let path = dir.path().join("doc.txt");
    let mut file = std::fs::File::create(&path).expect("create doc");
    write!(file, "A short document about rivers and tides.").expect("write doc");
    path.display().to_string()
}

async fn reply(studio: &mut Studio, line: &str) -> String {
    match studio.handle_line(line).await {
        Outcome::Reply(text) => text,
        Outcome::Quit => panic!("unexpected quit for {line:?}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn a_full_studio_session_flows_from_document_to_transcript() {
    let analysis = analysis_json();
    let provider = StudioProvider::new(&[
        &analysis,
        &analysis,
        "Speaker A: Rivers shape coastlines.\nSpeaker B: And tides shape rivers.",
        "Rivers quietly shape entire coastlines.",
        "Which is why estuaries fascinate me.",
    ]);
    let dir = tempfile::tempdir().expect("tempdir");
    let doc = document_file(&dir);
    let mut studio = Studio::new(provider.clone(), provider, None);

    assert!(reply(&mut studio, &format!("analyze {doc}")).await.contains("Persona 1"));
    assert!(reply(&mut studio, &format!("analyze {doc}")).await.contains("Persona 2"));

    reply(&mut studio, "select 1").await;
    assert!(reply(&mut studio, "select 2").await.contains("Ready to `generate`"));

    // Validation precedes generation: no topic yet.
    assert!(reply(&mut studio, "generate")
        .await
        .contains("Dialogue generation failed"));

    reply(&mut studio, "topic how rivers meet the sea").await;
    assert!(reply(&mut studio, "generate").await.contains("2 turns"));

    let listing = reply(&mut studio, "script").await;
    assert!(listing.contains("1. Speaker A (Persona 1): Rivers shape coastlines."));
    assert!(listing.contains("2. Speaker B (Persona 2): And tides shape rivers."));

    assert!(reply(&mut studio, "refine 1 make it quieter")
        .await
        .contains("Turn 1 refined"));

    // Last turn is Speaker B, so the added line binds Speaker A / Persona 1.
    let added = reply(&mut studio, "add bring up estuaries").await;
    assert!(added.contains("Speaker A (Persona 1): Which is why estuaries fascinate me."));

    let transcript = reply(&mut studio, "view final").await;
    assert!(transcript.contains("Speaker A (Persona 1): Rivers quietly shape entire coastlines."));
    assert!(transcript.contains("Speaker B (Persona 2): And tides shape rivers."));

    assert_eq!(reply(&mut studio, "export").await, transcript);
    assert_eq!(studio.handle_line("quit").await, Outcome::Quit);
}

#[tokio::test]
async fn generation_is_gated_while_the_config_editor_is_open() {
    let analysis = analysis_json();
    let provider = StudioProvider::new(&[
        &analysis,
        &analysis,
        "Speaker A: once\nSpeaker B: twice",
    ]);
    let dir = tempfile::tempdir().expect("tempdir");
    let doc = document_file(&dir);
    let mut studio = Studio::new(provider.clone(), provider, None);

    reply(&mut studio, &format!("analyze {doc}")).await;
    reply(&mut studio, &format!("analyze {doc}")).await;
    reply(&mut studio, "select 1").await;
    reply(&mut studio, "select 2").await;
    reply(&mut studio, "topic anything").await;

    reply(&mut studio, "edit 1").await;
    assert!(reply(&mut studio, "generate")
        .await
        .contains("Close the configuration editor"));
    assert!(reply(&mut studio, "add more")
        .await
        .contains("Close the configuration editor"));

    // The details editor does not gate generation.
    reply(&mut studio, "cancel").await;
    reply(&mut studio, "details 1").await;
    assert!(reply(&mut studio, "generate").await.contains("2 turns"));
}

#[tokio::test]
async fn config_editor_enforces_the_percentage_invariant_on_save() {
    let analysis = analysis_json();
    let provider = StudioProvider::new(&[&analysis]);
    let dir = tempfile::tempdir().expect("tempdir");
    let doc = document_file(&dir);
    let mut studio = Studio::new(provider.clone(), provider, None);

    reply(&mut studio, &format!("analyze {doc}")).await;
    reply(&mut studio, "edit 1").await;

    assert!(reply(&mut studio, "set material 55")
        .await
        .contains("do not total 100"));
    assert!(reply(&mut studio, "save").await.contains("Cannot save"));

    reply(&mut studio, "set material 40").await;
    reply(&mut studio, "set technicality 9").await;
    assert_eq!(reply(&mut studio, "save").await, "Configuration saved.");
    assert!(reply(&mut studio, "show 1").await.contains("technicality 9/10"));
}

#[tokio::test]
async fn details_editor_renames_and_rejects_blank_names() {
    let analysis = analysis_json();
    let provider = StudioProvider::new(&[&analysis]);
    let dir = tempfile::tempdir().expect("tempdir");
    let doc = document_file(&dir);
    let mut studio = Studio::new(provider.clone(), provider, None);

    reply(&mut studio, &format!("analyze {doc}")).await;

    reply(&mut studio, "details 1").await;
    reply(&mut studio, "name  ").await;
    assert!(reply(&mut studio, "save").await.contains("must not be empty"));

    reply(&mut studio, "name Ada").await;
    reply(&mut studio, "desc A measured analyst.").await;
    assert_eq!(reply(&mut studio, "save").await, "Details saved.");
    assert!(reply(&mut studio, "personas").await.contains("1. Ada"));
    assert!(reply(&mut studio, "show 1").await.contains("A measured analyst."));
}

#[tokio::test]
async fn delete_requires_explicit_confirmation() {
    let analysis = analysis_json();
    let provider = StudioProvider::new(&[&analysis, &analysis]);
    let dir = tempfile::tempdir().expect("tempdir");
    let doc = document_file(&dir);
    let mut studio = Studio::new(provider.clone(), provider, None);

    reply(&mut studio, &format!("analyze {doc}")).await;
    reply(&mut studio, &format!("analyze {doc}")).await;
    reply(&mut studio, "select 1").await;

    let warning = reply(&mut studio, "delete 1").await;
    assert!(warning.contains("--yes"));
    assert!(reply(&mut studio, "personas").await.contains("Persona 1"));

    assert!(reply(&mut studio, "delete 1 --yes").await.contains("deleted"));
    let listing = reply(&mut studio, "personas").await;
    assert!(!listing.contains("Persona 1"));
    assert!(!listing.contains("[selected]"), "selection was cleared");
}

#[tokio::test]
async fn models_command_lists_and_marks_the_current_model() {
    let provider = StudioProvider::new(&[]);
    let mut studio = Studio::new(provider.clone(), provider, None);

    let listing = reply(&mut studio, "models").await;
    assert!(listing.contains("* gemini-2.5-flash (current)"));
    assert!(listing.contains("gemini-2.0-flash"));
}

#[tokio::test]
async fn models_failure_degrades_to_a_message() {
    let provider = StudioProvider::with_failing_catalog();
    let mut studio = Studio::new(provider.clone(), provider, None);

    assert!(reply(&mut studio, "models")
        .await
        .contains("Failed to load models"));
    // The rest of the studio still works with no model list.
    assert!(reply(&mut studio, "personas").await.contains("No personas yet"));
}
