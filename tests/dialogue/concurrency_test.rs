//! In-flight gating and stale-result discarding.
//!
//! These tests hold a generation call open with a [`Notify`] gate so a
//! second operation can be attempted while the first is suspended at the
//! collaborator boundary.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use sflcast::dialogue::{DialogueDirector, DialogueError, DialogueRequest};
use sflcast::persona::{AnalysisResult, Persona, PersonaId};
use sflcast::providers::{GenerateOptions, ProviderError, TextGenerator};

// ---------------------------------------------------------------------------
// Gated mock provider
// ---------------------------------------------------------------------------

struct QueuedResponse {
    text: Result<String, String>,
    /// Suspend this call until the test releases it.
    wait: bool,
}

/// Pops one queued response per call; signals entry and optionally blocks.
struct GatedGenerator {
    responses: StdMutex<VecDeque<QueuedResponse>>,
    entered: Notify,
    release: Notify,
}

impl GatedGenerator {
    fn new(responses: Vec<QueuedResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: StdMutex::new(responses.into_iter().collect()),
            entered: Notify::new(),
            release: Notify::new(),
        })
    }
}

fn ready(text: &str) -> QueuedResponse {
    QueuedResponse {
        text: Ok(text.to_owned()),
        wait: false,
    }
}

fn gated(text: &str) -> QueuedResponse {
    QueuedResponse {
        text: Ok(text.to_owned()),
        wait: true,
    }
}

#[async_trait]
impl TextGenerator for GatedGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<String, ProviderError> {
        let response = self
            .responses
            .lock()
            .expect("response queue")
            .pop_front()
            .expect("a queued response for every call");
        self.entered.notify_one();
        if response.wait {
            self.release.notified().await;
        }
        response.text.map_err(ProviderError::Parse)
    }

    fn model_id(&self) -> &str {
        "gated"
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn persona(name: &str) -> Persona {
    let analysis: AnalysisResult = serde_json::from_value(serde_json::json!({
        "sflAnalysis": {
            "processDistribution": {"material": 40.0, "mental": 30.0, "relational": 20.0, "verbal": 10.0},
            "technicality": {"score": 5.0, "description": "plain"},
            "modalityProfile": "median",
            "appraisalSummary": "warm",
            "cohesionSummary": "loose"
        },
        "personaMapping": {"style": "Narrative", "confidence": "Medium", "stance": "Curious", "organization": "Episodic"},
        "personaConfiguration": {
            "ideational": {"materialProcesses": 40.0, "mentalProcesses": 30.0, "relationalProcesses": 20.0, "verbalProcesses": 10.0, "technicalityLevel": 5, "logicalRelations": "additive"},
            "interpersonal": {"statements": 60.0, "questions": 30.0, "offersCommands": 10.0, "probabilityModality": 5, "usualityModality": 5, "questioningFrequency": "Low", "appraisal": "warm"},
            "textual": {"lexicalDensity": 5, "grammaticalIntricacy": 5, "referenceChains": "sparse", "conjunctiveAdverbs": "and", "thematicProgression": "constant", "questionSequences": "none"}
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

fn topic_request() -> DialogueRequest {
    DialogueRequest {
        topic: "tidal power".to_owned(),
        ..DialogueRequest::default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_refine_is_rejected_while_one_is_in_flight() {
    let provider = GatedGenerator::new(vec![
        ready("Speaker A: one\nSpeaker B: two"),
        gated("one, reworded"),
    ]);
    let director = Arc::new(DialogueDirector::new(provider.clone(), None));
    let ada = persona("Ada");
    let bo = persona("Bo");

    director
        .generate_script(&ada, &bo, &topic_request())
        .await
        .expect("generation");
    let snapshot = director.snapshot().await;
    let (first, second) = (snapshot.turns[0].id, snapshot.turns[1].id);

    let task = {
        let director = Arc::clone(&director);
        let (ada, bo) = (ada.clone(), bo.clone());
        tokio::spawn(async move { director.refine_turn(first, "reword", &ada, &bo).await })
    };
    provider.entered.notified().await;

    // The controller exposes the in-flight turn id, and rejects both the
    // same target and a different one.
    assert_eq!(director.snapshot().await.refining, Some(first));
    let err = director
        .refine_turn(second, "also reword", &ada, &bo)
        .await
        .expect_err("must be rejected");
    assert!(matches!(err, DialogueError::Busy(_)));
    let err = director
        .refine_turn(first, "again", &ada, &bo)
        .await
        .expect_err("same target rejected too");
    assert!(matches!(err, DialogueError::Busy(_)));

    provider.release.notify_one();
    task.await.expect("join").expect("refinement succeeds");

    let after = director.snapshot().await;
    assert_eq!(after.turns[0].text, "one, reworded");
    assert_eq!(after.turns[1].text, "two", "other turn untouched");
    assert_eq!(after.refining, None);
}

#[tokio::test]
async fn second_append_is_rejected_while_one_is_in_flight() {
    let provider = GatedGenerator::new(vec![
        ready("Speaker A: one\nSpeaker B: two"),
        gated("three"),
    ]);
    let director = Arc::new(DialogueDirector::new(provider.clone(), None));
    let ada = persona("Ada");
    let bo = persona("Bo");

    director
        .generate_script(&ada, &bo, &topic_request())
        .await
        .expect("generation");

    let task = {
        let director = Arc::clone(&director);
        let (ada, bo) = (ada.clone(), bo.clone());
        tokio::spawn(async move { director.append_next_turn("go on", &ada, &bo).await })
    };
    provider.entered.notified().await;

    let err = director
        .append_next_turn("go on more", &ada, &bo)
        .await
        .expect_err("must be rejected");
    assert!(matches!(err, DialogueError::Busy(_)));

    provider.release.notify_one();
    task.await.expect("join").expect("append succeeds");
    assert_eq!(director.snapshot().await.turns.len(), 3);
}

#[tokio::test]
async fn stale_refinement_is_discarded_after_script_replacement() {
    let provider = GatedGenerator::new(vec![
        ready("Speaker A: old opening\nSpeaker B: old reply"),
        gated("refined old opening"),
        ready("Speaker A: brand new opening"),
    ]);
    let director = Arc::new(DialogueDirector::new(provider.clone(), None));
    let ada = persona("Ada");
    let bo = persona("Bo");

    director
        .generate_script(&ada, &bo, &topic_request())
        .await
        .expect("first generation");
    let stale_target = director.snapshot().await.turns[0].id;

    // Suspend a refinement at the collaborator boundary.
    let task = {
        let director = Arc::clone(&director);
        let (ada, bo) = (ada.clone(), bo.clone());
        tokio::spawn(async move {
            director
                .refine_turn(stale_target, "polish it", &ada, &bo)
                .await
        })
    };
    provider.entered.notified().await;

    // Replace the whole script while the refinement is in flight.
    director
        .generate_script(&ada, &bo, &topic_request())
        .await
        .expect("second generation");

    // Let the stale refinement resolve; it must be discarded, not spliced.
    provider.release.notify_one();
    task.await.expect("join").expect("stale result is dropped silently");

    let snapshot = director.snapshot().await;
    assert_eq!(snapshot.turns.len(), 1);
    assert_eq!(snapshot.turns[0].text, "brand new opening");
    assert!(
        !snapshot.turns.iter().any(|t| t.text.contains("refined")),
        "stale text must not appear in the new script"
    );
    assert_eq!(snapshot.refine_target, None);
    assert_eq!(snapshot.refining, None);
}

#[tokio::test]
async fn stale_append_is_discarded_after_script_replacement() {
    let provider = GatedGenerator::new(vec![
        ready("Speaker A: old opening\nSpeaker B: old reply"),
        gated("a third line for the old script"),
        ready("Speaker A: brand new opening\nSpeaker B: brand new reply"),
    ]);
    let director = Arc::new(DialogueDirector::new(provider.clone(), None));
    let ada = persona("Ada");
    let bo = persona("Bo");

    director
        .generate_script(&ada, &bo, &topic_request())
        .await
        .expect("first generation");

    let task = {
        let director = Arc::clone(&director);
        let (ada, bo) = (ada.clone(), bo.clone());
        tokio::spawn(async move { director.append_next_turn("continue", &ada, &bo).await })
    };
    provider.entered.notified().await;

    director
        .generate_script(&ada, &bo, &topic_request())
        .await
        .expect("second generation");

    provider.release.notify_one();
    task.await.expect("join").expect("stale result is dropped silently");

    let snapshot = director.snapshot().await;
    assert_eq!(snapshot.turns.len(), 2, "no stale third turn appended");
    assert!(!snapshot.add_line_open);
    assert!(!snapshot.adding_line);
}
