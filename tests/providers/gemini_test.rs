//! Gemini wire format tests.

use serde_json::json;
use sflcast::providers::gemini::{build_request, parse_models_response, parse_response};
use sflcast::providers::{GenerateOptions, ProviderError};

fn options(temperature: f32) -> GenerateOptions {
    GenerateOptions {
        temperature,
        thinking_budget: None,
        json_response: false,
    }
}

#[test]
fn build_request_wraps_the_prompt_in_one_user_part() {
    let req = build_request("analyze this", &options(0.2));
    assert_eq!(req.contents.len(), 1);
    assert_eq!(req.contents[0].parts.len(), 1);
    assert_eq!(req.contents[0].parts[0].text, "analyze this");
    assert_eq!(req.generation_config.temperature, 0.2);
}

#[test]
fn build_request_requests_json_only_when_asked() {
    let plain = build_request("p", &options(0.7));
    assert!(plain.generation_config.response_mime_type.is_none());

    let schema_call = build_request(
        "p",
        &GenerateOptions {
            temperature: 0.2,
            thinking_budget: None,
            json_response: true,
        },
    );
    assert_eq!(
        schema_call.generation_config.response_mime_type.as_deref(),
        Some("application/json")
    );
}

#[test]
fn build_request_passes_the_thinking_budget_through() {
    let req = build_request(
        "p",
        &GenerateOptions {
            temperature: 0.7,
            thinking_budget: Some(2048),
            json_response: false,
        },
    );
    let thinking = req
        .generation_config
        .thinking_config
        .expect("thinking config present");
    assert_eq!(thinking.thinking_budget, 2048);

    let without = build_request("p", &options(0.7));
    assert!(without.generation_config.thinking_config.is_none());
}

#[test]
fn request_serializes_with_camel_case_keys() {
    let req = build_request(
        "p",
        &GenerateOptions {
            temperature: 0.5,
            thinking_budget: Some(64),
            json_response: true,
        },
    );
    let value = serde_json::to_value(&req).expect("serializes");
    assert!(value["generationConfig"]["responseMimeType"].is_string());
    assert_eq!(value["generationConfig"]["thinkingConfig"]["thinkingBudget"], 64);
}

#[test]
fn parse_response_joins_candidate_parts() {
    let body = json!({
        "candidates": [{
            "content": {"parts": [{"text": "Speaker A: hi"}, {"text": "\nSpeaker B: hello"}]}
        }]
    });
    let text = parse_response(&body.to_string()).expect("parses");
    assert_eq!(text, "Speaker A: hi\nSpeaker B: hello");
}

#[test]
fn parse_response_reports_safety_blocks_distinctly() {
    let body = json!({
        "candidates": [],
        "promptFeedback": {"blockReason": "SAFETY"}
    });
    let err = parse_response(&body.to_string()).expect_err("blocked");
    assert!(matches!(err, ProviderError::Blocked(reason) if reason.contains("SAFETY")));
}

#[test]
fn parse_response_reports_empty_output_distinctly() {
    let no_candidates = json!({"candidates": []});
    assert!(matches!(
        parse_response(&no_candidates.to_string()),
        Err(ProviderError::Empty(_))
    ));

    let blank_text = json!({
        "candidates": [{"content": {"parts": [{"text": "   "}]}}]
    });
    assert!(matches!(
        parse_response(&blank_text.to_string()),
        Err(ProviderError::Empty(_))
    ));
}

#[test]
fn parse_response_rejects_malformed_bodies() {
    assert!(matches!(
        parse_response("not json at all"),
        Err(ProviderError::Parse(_))
    ));
}

#[test]
fn parse_models_filters_and_strips_prefixes() {
    let body = json!({
        "models": [
            {"name": "models/gemini-2.5-flash", "supportedGenerationMethods": ["generateContent", "countTokens"]},
            {"name": "models/embedding-001", "supportedGenerationMethods": ["embedContent"]},
            {"name": "models/gemini-2.0-flash", "supportedGenerationMethods": ["generateContent"]}
        ]
    });
    let models = parse_models_response(&body.to_string()).expect("parses");
    assert_eq!(models, vec!["gemini-2.5-flash", "gemini-2.0-flash"]);
}

#[test]
fn parse_models_tolerates_an_empty_listing() {
    let models = parse_models_response("{}").expect("parses");
    assert!(models.is_empty());
}
