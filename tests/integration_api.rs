#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Exercises the blocking API client against a local mock of the OpenAI HTTP API

use serde_json::{Value, json};
use study_assistant::AssistantError;
use study_assistant::client::{OpenAiClient, ServiceError};
use study_assistant::config::{ApiKey, Config, OpenAiConfig, RetrievalConfig};
use study_assistant::session::Assistant;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer, embedding_dimension: u32) -> Config {
    Config {
        openai: OpenAiConfig {
            base_url: format!("{}/v1", server.uri()),
            embedding_dimension,
            timeout_seconds: 5,
            ..OpenAiConfig::default()
        },
        retrieval: RetrievalConfig {
            chunk_size: 5,
            tree_count: 4,
            top_k: 3,
        },
        api_key: ApiKey::new("sk-test"),
        ..Config::default()
    }
}

fn test_client(server: &MockServer, embedding_dimension: u32) -> OpenAiClient {
    OpenAiClient::new(&test_config(server, embedding_dimension)).expect("client is created")
}

fn embedding_body(embedding: &[f32]) -> Value {
    json!({
        "object": "list",
        "data": [{ "object": "embedding", "index": 0, "embedding": embedding }],
        "model": "text-embedding-3-small"
    })
}

fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

async fn mount_embedding(server: &MockServer, input: &str, embedding: &[f32]) {
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({ "input": input })))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(embedding)))
        .mount(server)
        .await;
}

async fn request_bodies(server: &MockServer, endpoint: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == endpoint)
        .map(|request| serde_json::from_slice(&request.body).expect("request body is JSON"))
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn embedding_request_and_response() {
    let server = MockServer::start().await;
    let vector: Vec<f32> = (0..1536).map(|i| i as f32 / 1536.0).collect();

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "text-embedding-3-small",
            "input": "cell biology"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(&vector)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server, 1536);
    let embedding = tokio::task::spawn_blocking(move || client.generate_embedding("cell biology"))
        .await
        .expect("task completes")
        .expect("embedding succeeds");

    assert_eq!(embedding.len(), 1536);
    assert_eq!(embedding, vector);
}

#[tokio::test(flavor = "multi_thread")]
async fn embedding_with_wrong_dimension_is_rejected() {
    let server = MockServer::start().await;
    mount_embedding(&server, "short", &[0.5, 0.5]).await;

    let client = test_client(&server, 1536);
    let result = tokio::task::spawn_blocking(move || client.generate_embedding("short"))
        .await
        .expect("task completes");

    assert_eq!(
        result,
        Err(ServiceError::DimensionMismatch {
            expected: 1536,
            actual: 2,
        })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn embedding_request_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server, 1536);
    let result = tokio::task::spawn_blocking(move || client.generate_embedding("anything"))
        .await
        .expect("task completes");

    assert_eq!(
        result,
        Err(ServiceError::Status {
            code: 500,
            message: "upstream exploded".to_string(),
        })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn completion_request_and_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Photosynthesis.")))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server, 1536);
    let answer = tokio::task::spawn_blocking(move || client.generate_completion("the prompt"))
        .await
        .expect("task completes")
        .expect("completion succeeds");

    assert_eq!(answer, "Photosynthesis.");

    let bodies = request_bodies(&server, "/v1/chat/completions").await;
    assert_eq!(
        bodies[0]["messages"],
        json!([{ "role": "user", "content": "the prompt" }])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn completion_without_choices_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let client = test_client(&server, 1536);
    let result = tokio::task::spawn_blocking(move || client.generate_completion("prompt"))
        .await
        .expect("task completes");

    assert_eq!(result, Err(ServiceError::NoChoices));
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_credential_reports_service_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error"
            }
        })))
        .mount(&server)
        .await;

    let client = test_client(&server, 1536);
    let result = tokio::task::spawn_blocking(move || client.generate_completion("prompt"))
        .await
        .expect("task completes");

    assert_eq!(
        result,
        Err(ServiceError::Status {
            code: 401,
            message: "Incorrect API key provided".to_string(),
        })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_credential_sends_nothing() {
    let server = MockServer::start().await;

    let client = test_client(&server, 1536).with_api_key(None);
    let result = tokio::task::spawn_blocking(move || client.generate_completion("prompt"))
        .await
        .expect("task completes");

    assert_eq!(result, Err(ServiceError::MissingCredential));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn connection_check_lists_models() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                { "id": "gpt-4o-mini", "object": "model", "owned_by": "system" },
                { "id": "text-embedding-3-small", "object": "model", "owned_by": "system" }
            ]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server, 1536);
    let models = tokio::task::spawn_blocking(move || client.check_connection())
        .await
        .expect("task completes")
        .expect("connection check succeeds");

    let ids: Vec<&str> = models.iter().map(|model| model.id.as_str()).collect();
    assert_eq!(ids, vec!["gpt-4o-mini", "text-embedding-3-small"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn session_answers_from_nearest_chunks() {
    let server = MockServer::start().await;

    mount_embedding(&server, "AAAAA", &[1.0, 0.1, 0.0]).await;
    mount_embedding(&server, "BBBBB", &[0.1, 1.0, 0.1]).await;
    mount_embedding(&server, "CCCCC", &[0.0, 0.1, 1.0]).await;
    mount_embedding(&server, "Tell me about C", &[0.0, 0.2, 1.0]).await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("C comes last.")))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server, 3);
    let client = OpenAiClient::new(&config).expect("client is created");
    let assistant = Assistant::new(client.clone(), client, config.retrieval).with_index_seed(3);

    let (assistant, outcome) = tokio::task::spawn_blocking(move || {
        let mut assistant = assistant;
        assistant
            .load_text("AAAAABBBBBCCCCC")
            .expect("document loads");
        let outcome = assistant.ask("Tell me about C").expect("ask succeeds");
        (assistant, outcome)
    })
    .await
    .expect("task completes");

    assert_eq!(outcome.answer, "C comes last.");
    assert_eq!(outcome.chunk_ids, vec![2, 1, 0]);
    assert_eq!(outcome.context, "CCCCC BBBBB AAAAA");
    assert_eq!(assistant.history().len(), 1);

    assert_eq!(request_bodies(&server, "/v1/embeddings").await.len(), 4);

    let completions = request_bodies(&server, "/v1/chat/completions").await;
    let prompt = completions[0]["messages"][0]["content"]
        .as_str()
        .expect("prompt is a string");
    assert!(prompt.contains("Context:\nCCCCC BBBBB AAAAA"));
    assert!(prompt.contains("Question:\nTell me about C"));
}

#[tokio::test(flavor = "multi_thread")]
async fn session_upload_failure_keeps_previous_document() {
    let server = MockServer::start().await;

    mount_embedding(&server, "AAAAA", &[1.0, 0.0, 0.0]).await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({ "input": "BBBBB" })))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "Rate limit reached" }
        })))
        .mount(&server)
        .await;

    let config = test_config(&server, 3);
    let client = OpenAiClient::new(&config).expect("client is created");
    let assistant = Assistant::new(client.clone(), client, config.retrieval);

    let (assistant, result) = tokio::task::spawn_blocking(move || {
        let mut assistant = assistant;
        assistant.load_text("AAAAA").expect("first document loads");
        let result = assistant.load_text("BBBBB");
        (assistant, result)
    })
    .await
    .expect("task completes");

    assert!(
        matches!(&result, Err(AssistantError::Service(message)) if message.contains("Rate limit reached"))
    );
    let document = assistant.session().document().expect("previous document remains");
    assert_eq!(document.chunks()[0].content, "AAAAA");
}
