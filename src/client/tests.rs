use super::*;
use crate::config::Config;

fn test_config() -> Config {
    let mut config = Config::default();
    config.openai.base_url = "http://test-host:1234/v1".to_string();
    config.openai.embedding_model = "test-embed".to_string();
    config.openai.completion_model = "test-chat".to_string();
    config.openai.embedding_dimension = 64;
    config
}

#[derive(Debug, Deserialize, PartialEq)]
struct Payload {
    value: u32,
}

#[test]
fn client_configuration() {
    let client = OpenAiClient::new(&test_config()).expect("Failed to create client");

    assert_eq!(client.embedding_model, "test-embed");
    assert_eq!(client.completion_model, "test-chat");
    assert_eq!(client.embedding_dimension, 64);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.base_url.path(), "/v1/");
    assert!(!client.has_api_key());
}

#[test]
fn client_builder_methods() {
    let client = OpenAiClient::new(&test_config())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(5))
        .with_api_key(ApiKey::new("sk-test"));

    assert!(client.has_api_key());
}

#[test]
fn missing_credential_fails_before_any_request() {
    let client = OpenAiClient::new(&test_config()).expect("Failed to create client");

    assert_eq!(
        client.check_connection().map(|models| models.len()),
        Err(ServiceError::MissingCredential)
    );
}

#[test]
fn decode_success_payload() {
    let payload: Payload = decode_response(200, r#"{"value": 7}"#).expect("decodes");
    assert_eq!(payload, Payload { value: 7 });
}

#[test]
fn decode_error_envelope() {
    let result = decode_response::<Payload>(
        401,
        r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#,
    );

    assert_eq!(
        result,
        Err(ServiceError::Status {
            code: 401,
            message: "Incorrect API key provided".to_string(),
        })
    );
}

#[test]
fn decode_error_with_plain_body() {
    let result = decode_response::<Payload>(503, "  upstream unavailable \n");

    assert_eq!(
        result,
        Err(ServiceError::Status {
            code: 503,
            message: "upstream unavailable".to_string(),
        })
    );
}

#[test]
fn decode_malformed_payload() {
    let result = decode_response::<Payload>(200, r#"{"unexpected": true}"#);
    assert!(matches!(result, Err(ServiceError::MalformedResponse(_))));
}

#[test]
fn service_error_converts_to_assistant_error() {
    let error: AssistantError = ServiceError::NoChoices.into();
    assert!(matches!(error, AssistantError::Service(_)));
    assert!(error.to_string().contains("no choices"));
}
