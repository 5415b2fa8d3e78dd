//! End-to-end walk through a first generation against a fresh server.

use ollama_client::{ModelState, Ollama};
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn first_generation_pulls_missing_model_then_generates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/pull"))
        .and(body_partial_json(serde_json::json!({"name": "llama2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let streamed = concat!(
        r#"{"model":"llama2","response":"Hi","done":false}"#,
        "\n",
        r#"{"model":"llama2","response":"!","done":false}"#,
        "\n",
        r#"{"model":"llama2","response":"","done":true}"#,
        "\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_json(serde_json::json!({
            "model": "llama2",
            "prompt": "Say hi",
            "options": {}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(streamed))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = Ollama::new().host("127.0.0.1").port(server.address().port());
    assert_eq!(client.active_model(), "");

    let answer = client
        .generate("Say hi", Some("llama2"))
        .await
        .expect("generation succeeds");

    assert_eq!(answer, streamed);
    assert_eq!(client.active_model(), "llama2");
    assert_eq!(client.state(), &ModelState::Reconciled("llama2".into()));

    let order: Vec<String> = server
        .received_requests()
        .await
        .expect("recording enabled")
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect();
    assert_eq!(
        order,
        vec!["GET /api/tags", "POST /api/pull", "POST /api/generate"]
    );
}
