//! End-to-end flow over one dialogue session: generate, refine, continue,
//! export, regenerate.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;

use sflcast::dialogue::{DialogueDirector, DialoguePhase, DialogueRequest};
use sflcast::persona::{AnalysisResult, Persona, PersonaId};
use sflcast::providers::{GenerateOptions, ProviderError, TextGenerator};
use sflcast::script::{Script, Speaker};
use sflcast::view::ScriptView;

struct SequenceGenerator {
    responses: StdMutex<VecDeque<String>>,
}

impl SequenceGenerator {
    fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: StdMutex::new(responses.iter().map(|s| (*s).to_owned()).collect()),
        })
    }
}

#[async_trait]
impl TextGenerator for SequenceGenerator {
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
        "sequence"
    }
}

fn persona(name: &str) -> Persona {
    let analysis: AnalysisResult = serde_json::from_value(serde_json::json!({
        "sflAnalysis": {
            "processDistribution": {"material": 25.0, "mental": 25.0, "relational": 25.0, "verbal": 25.0},
            "technicality": {"score": 4.0, "description": "conversational"},
            "modalityProfile": "hedged",
            "appraisalSummary": "generous",
            "cohesionSummary": "chained"
        },
        "personaMapping": {"style": "Exploratory", "confidence": "Medium", "stance": "Open", "organization": "Spiral"},
        "personaConfiguration": {
            "ideational": {"materialProcesses": 25.0, "mentalProcesses": 25.0, "relationalProcesses": 25.0, "verbalProcesses": 25.0, "technicalityLevel": 4, "logicalRelations": "contrastive"},
            "interpersonal": {"statements": 50.0, "questions": 40.0, "offersCommands": 10.0, "probabilityModality": 4, "usualityModality": 6, "questioningFrequency": "High", "appraisal": "generous"},
            "textual": {"lexicalDensity": 4, "grammaticalIntricacy": 6, "referenceChains": "dense", "conjunctiveAdverbs": "though, still", "thematicProgression": "zig-zag", "questionSequences": "frequent"}
        }
    }))
    .expect("valid analysis json");
    Persona {
        id: PersonaId::new(),
        name: name.to_owned(),
        description: String::new(),
        analysis,
    }
}

#[tokio::test]
async fn a_full_session_stays_consistent_end_to_end() {
    let provider = SequenceGenerator::new(&[
        // Initial script: a malformed line the parser must drop.
        "Speaker A: Welcome back to the show.\nSpeaker B: Glad to be here.\n(stage direction)\nSpeaker A: Let's dig in.",
        // Refinement of the second turn.
        "Delighted to be here.",
        // Continuation. Last turn is Speaker A, so this binds Speaker B.
        "Then let's start with the basics.",
    ]);
    let director = DialogueDirector::new(provider, None);
    let ada = persona("Ada");
    let bo = persona("Bo");
    let request = DialogueRequest {
        topic: "maritime navigation".to_owned(),
        context: "a listener letter about sextants".to_owned(),
        length: "Short (1-3 mins)".to_owned(),
    };

    // Generate: three turns survive parsing, the stage direction is dropped.
    director
        .generate_script(&ada, &bo, &request)
        .await
        .expect("generation");
    let snapshot = director.snapshot().await;
    assert_eq!(snapshot.phase, DialoguePhase::Populated(ScriptView::Editor));
    assert_eq!(snapshot.turns.len(), 3);

    // Refine turn two; identity is stable across the splice.
    let target = snapshot.turns[1].clone();
    director
        .refine_turn(target.id, "more delighted", &ada, &bo)
        .await
        .expect("refinement");
    let refined = director.snapshot().await;
    assert_eq!(refined.turns[1].id, target.id);
    assert_eq!(refined.turns[1].text, "Delighted to be here.");

    // Continue: alternation partner of Speaker A is Speaker B / Bo.
    director
        .append_next_turn("move to specifics", &ada, &bo)
        .await
        .expect("append");
    let appended = director.snapshot().await;
    assert_eq!(appended.turns.len(), 4);
    assert_eq!(appended.turns[3].speaker, Speaker::B);
    assert_eq!(appended.turns[3].persona_name, "Bo");

    // The exported transcript re-parses into an equivalent script.
    director.set_view(ScriptView::Final).await.expect("final view");
    let transcript = director.transcript().await;
    let reparsed = Script::parse(&transcript, "Ada", "Bo");
    assert_eq!(reparsed.len(), 4);
    for (exported, reparsed) in appended.turns.iter().zip(reparsed.turns()) {
        assert_eq!(exported.speaker, reparsed.speaker);
        assert_eq!(exported.persona_name, reparsed.persona_name);
        assert_eq!(exported.text, reparsed.text);
    }
}

#[tokio::test]
async fn exhausted_provider_surfaces_a_generation_error_and_resets() {
    let provider = SequenceGenerator::new(&[]);
    let director = DialogueDirector::new(provider, None);
    let ada = persona("Ada");
    let bo = persona("Bo");
    let request = DialogueRequest {
        topic: "anything".to_owned(),
        ..DialogueRequest::default()
    };

    let err = director
        .generate_script(&ada, &bo, &request)
        .await
        .expect_err("generation fails");
    assert!(err.to_string().contains("empty response"));
    assert_eq!(director.snapshot().await.phase, DialoguePhase::Empty);
}
