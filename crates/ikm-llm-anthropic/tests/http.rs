//! Anthropic adapter tests against a local HTTP server.

use std::sync::Arc;

use ikm_llm::mock::MockTool;
use ikm_llm::test_helpers::{collect_events, content_text, sse_named_body, system_msg, user_msg};
use ikm_llm::{
    rollup, CancellationToken, Event, LlmError, Model, ReasoningEffort, Role, StreamConfig,
    ThinkingDelta,
};
use ikm_llm_anthropic::{AnthropicAdapter, AnthropicConfig, AnthropicModel};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn model(server: &MockServer) -> AnthropicModel {
    AnthropicModel::new(
        AnthropicAdapter::new(AnthropicConfig {
            api_key: "sk-ant-test".into(),
            base_url: server.uri(),
            ..Default::default()
        })
        .unwrap(),
    )
}

fn sse(frames: &[(&str, Value)]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(sse_named_body(frames), "text/event-stream")
}

fn text_turn(text: &str) -> Vec<(&'static str, Value)> {
    vec![
        (
            "message_start",
            json!({"type": "message_start", "message": {"usage": {"input_tokens": 10, "output_tokens": 1}}}),
        ),
        (
            "content_block_start",
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
        ),
        (
            "content_block_delta",
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": text}}),
        ),
        ("content_block_stop", json!({"type": "content_block_stop", "index": 0})),
        (
            "message_delta",
            json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"}, "usage": {"output_tokens": 4}}),
        ),
        ("message_stop", json!({"type": "message_stop"})),
    ]
}

async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

#[tokio::test]
async fn test_sends_vendor_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(header("anthropic-beta", "interleaved-thinking-2025-05-14"))
        .and(header("content-type", "application/json"))
        .respond_with(sse(&text_turn("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let events = model(&server).stream(
        &[user_msg("hi")],
        StreamConfig::default(),
        CancellationToken::new(),
    );
    let events = collect_events(events).await;
    assert_eq!(content_text(&events), "ok");
}

#[tokio::test]
async fn test_request_body_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(sse(&text_turn("ok")))
        .mount(&server)
        .await;

    let events = model(&server).stream(
        &[system_msg("Be terse."), user_msg("hi")],
        StreamConfig::default()
            .with_max_tokens(1000)
            .with_reasoning_effort(ReasoningEffort::High),
        CancellationToken::new(),
    );
    collect_events(events).await;

    let body = &request_bodies(&server).await[0];
    assert_eq!(body["model"], "claude-sonnet-4-20250514");
    assert_eq!(body["system"], "Be terse.");
    assert_eq!(body["stream"], true);
    assert_eq!(body["max_tokens"], 1000);
    assert_eq!(body["thinking"], json!({"type": "enabled", "budget_tokens": 800}));
    assert_eq!(
        body["messages"],
        json!([{"role": "user", "content": [
            {"type": "text", "text": "hi", "cache_control": {"type": "ephemeral"}}
        ]}])
    );
}

#[tokio::test]
async fn test_full_stream_roll_up() {
    let server = MockServer::start().await;
    let frames = vec![
        (
            "message_start",
            json!({"type": "message_start", "message": {"usage": {"input_tokens": 100, "cache_read_input_tokens": 50, "cache_creation_input_tokens": 25, "output_tokens": 1}}}),
        ),
        (
            "content_block_delta",
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "thinking_delta", "thinking": "Need ls."}}),
        ),
        (
            "content_block_delta",
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "signature_delta", "signature": "sig=="}}),
        ),
        (
            "content_block_delta",
            json!({"type": "content_block_delta", "index": 1, "delta": {"type": "text_delta", "text": "Listing."}}),
        ),
        (
            "content_block_start",
            json!({"type": "content_block_start", "index": 2, "content_block": {"type": "tool_use", "id": "toolu_1", "name": "bash"}}),
        ),
        (
            "content_block_delta",
            json!({"type": "content_block_delta", "index": 2, "delta": {"type": "input_json_delta", "partial_json": "{\"cmd\":\"ls\"}"}}),
        ),
        ("ping", json!({"type": "ping"})),
        (
            "message_delta",
            json!({"type": "message_delta", "delta": {"stop_reason": "tool_use"}, "usage": {"output_tokens": 20}}),
        ),
        ("message_stop", json!({"type": "message_stop"})),
    ];
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(sse(&frames))
        .mount(&server)
        .await;

    let mut model = model(&server);
    model.register(Arc::new(MockTool::new("bash", "a.txt")));
    let events = model.stream(
        &[user_msg("list")],
        StreamConfig::default(),
        CancellationToken::new(),
    );
    let events = collect_events(events).await;
    assert!(events.contains(&Event::ThinkingDelta(ThinkingDelta::Signature("sig==".into()))));

    let usage = events
        .iter()
        .find_map(|e| match e {
            Event::Usage(u) => Some(*u),
            _ => None,
        })
        .unwrap();
    assert_eq!(usage.prompt_tokens, 175);
    assert_eq!(usage.completion_tokens, 21);
    let expected = (100.0 * 3.0 + 50.0 * 0.3 + 25.0 * 3.75 + 21.0 * 15.0) / 1_000_000.0;
    assert!((usage.total_cost - expected).abs() < 1e-12);

    let rollup = rollup(futures::stream::iter(events)).await.unwrap();
    // One turn: the assistant message and its tool result.
    assert_eq!(rollup.messages.len(), 2);
    assert_eq!(rollup.messages[1].role, Role::Tool);
    let message = &rollup.messages[0];
    assert_eq!(message.role, Role::Assistant);
    assert_eq!(message.text(), "Listing.");
    assert_eq!(message.tool_calls[0].id, "toolu_1");
    assert_eq!(message.tool_calls[0].function.arguments, "{\"cmd\":\"ls\"}");
}

#[tokio::test]
async fn test_tool_round_trip_marks_cache() {
    let server = MockServer::start().await;
    let tool_turn = vec![
        (
            "content_block_start",
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "tool_use", "id": "toolu_1", "name": "bash"}}),
        ),
        (
            "content_block_delta",
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "input_json_delta", "partial_json": "{}"}}),
        ),
        ("message_stop", json!({"type": "message_stop"})),
    ];
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(sse(&tool_turn))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(sse(&text_turn("Done.")))
        .mount(&server)
        .await;

    let bash = MockTool::new("bash", "a.txt");
    let mut model = model(&server);
    model.register(Arc::new(bash.clone()));

    let events = model.stream(
        &[user_msg("list")],
        StreamConfig::default().with_max_turns(3),
        CancellationToken::new(),
    );
    let events = collect_events(events).await;
    assert_eq!(content_text(&events), "Done.");
    assert_eq!(bash.calls(), ["{}"]);

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["tools"][0]["name"], "bash");
    let messages = bodies[1]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0]["content"][0]["cache_control"]["type"], "ephemeral");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(
        messages[1]["content"][0],
        json!({"type": "tool_use", "id": "toolu_1", "name": "bash", "input": {}})
    );
    assert_eq!(messages[2]["role"], "user");
    assert_eq!(
        messages[2]["content"][0],
        json!({
            "type": "tool_result",
            "tool_use_id": "toolu_1",
            "content": "a.txt",
            "cache_control": {"type": "ephemeral"}
        })
    );
}

#[tokio::test]
async fn test_in_band_error_ends_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(sse(&[(
            "error",
            json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}),
        )]))
        .mount(&server)
        .await;

    let events = model(&server).stream(
        &[user_msg("hi")],
        StreamConfig::default(),
        CancellationToken::new(),
    );
    let events = collect_events(events).await;
    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::Error(LlmError::Stream(err)) => assert_eq!(err.code, "overloaded_error"),
        other => panic!("expected stream error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(r#"{"type":"error","error":{"type":"invalid_request_error"}}"#),
        )
        .mount(&server)
        .await;

    let events = model(&server).stream(
        &[user_msg("hi")],
        StreamConfig::default(),
        CancellationToken::new(),
    );
    let events = collect_events(events).await;
    match &events[..] {
        [Event::Error(LlmError::Http {
            status, message, ..
        })] => {
            assert_eq!(*status, Some(http::StatusCode::BAD_REQUEST));
            assert!(message.contains("invalid_request_error"));
        }
        other => panic!("expected http error, got {other:?}"),
    }
}
