//! End-to-end moderation flow against a mock homeserver and scorer.
//!
//! Wires the real HTTP adapters (MatrixTransport, HttpScorer) into the
//! pipeline and drives a message through extraction, classification and
//! dispatch, asserting on the actual wire traffic.

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::Value;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nsfw_sentinel::classify::ClassifierClient;
use nsfw_sentinel::config::{ActionConfig, Config};
use nsfw_sentinel::dispatch::ActionDispatcher;
use nsfw_sentinel::gate::AdmissionGate;
use nsfw_sentinel::pipeline::ModerationPipeline;
use nsfw_sentinel::scorer::HttpScorer;
use nsfw_sentinel::transport::MatrixTransport;
use nsfw_sentinel::types::MessageEvent;

/// Build a pipeline whose fetcher, scorer and outbound calls all hit the
/// given mock server.
fn pipeline_against(server: &MockServer, actions: ActionConfig) -> ModerationPipeline {
    let config = Arc::new(Config {
        via_servers: vec!["matrix.org".into()],
        actions,
        ..Config::default()
    });
    let transport = Arc::new(MatrixTransport::new(
        server.uri(),
        SecretString::from("syt_test_token"),
    ));
    let classifier = ClassifierClient::new(
        transport.clone(),
        Arc::new(HttpScorer::new(format!("{}/classify", server.uri()))),
        AdmissionGate::new(2),
        10 * 1024 * 1024,
    );
    ModerationPipeline::new(config, classifier, ActionDispatcher::new(transport))
}

async fn mount_media(server: &MockServer, media_id: &str, bytes: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!(
            "/_matrix/client/v1/media/download/matrix.org/{media_id}"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
        .mount(server)
        .await;
}

async fn mount_score(server: &MockServer, score: f64) {
    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"score": score})))
        .mount(server)
        .await;
}

async fn mount_send(server: &MockServer) {
    Mock::given(method("PUT"))
        .and(path_regex(r"^/_matrix/client/v3/rooms/.+/send/m\.room\.message/.+$"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"event_id": "$sent"})),
        )
        .mount(server)
        .await;
}

async fn mount_redact(server: &MockServer) {
    Mock::given(method("PUT"))
        .and(path_regex(r"^/_matrix/client/v3/rooms/.+/redact/.+/.+$"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"event_id": "$redaction"})),
        )
        .mount(server)
        .await;
}

/// Requests that hit message-send endpoints, with their JSON bodies.
async fn sent_messages(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().contains("/send/m.room.message/"))
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

#[tokio::test]
async fn nsfw_attachment_is_replied_to_and_redacted() {
    let server = MockServer::start().await;
    mount_media(&server, "abcd1234", vec![0xFF, 0xD8, 0xFF, 0xE0]).await;
    mount_score(&server, 0.8793).await;
    mount_send(&server).await;
    mount_redact(&server).await;

    let pipeline = pipeline_against(
        &server,
        ActionConfig {
            ignore_sfw: true,
            redact_nsfw: true,
            direct_reply: true,
            report_to_room: None,
        },
    );
    let event = MessageEvent::new(
        "!roomid:matrix.org",
        "$eventid",
        "@alice:matrix.org",
        "m.image",
        "holiday.jpg",
    )
    .with_attachment("mxc://matrix.org/abcd1234");

    let outcome = pipeline.handle_message(&event).await.unwrap();
    assert_eq!(
        outcome.report.as_deref(),
        Some(
            "mxc://matrix.org/abcd1234 in https://matrix.to/#/!roomid:matrix.org/$eventid?via=matrix.org appears NSFW with score 87.93%"
        )
    );

    let messages = sent_messages(&server).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["msgtype"], "m.notice");
    assert_eq!(
        messages[0]["m.relates_to"]["m.in_reply_to"]["event_id"],
        "$eventid"
    );

    let redactions = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().contains("/redact/"))
        .count();
    assert_eq!(redactions, 1);
}

#[tokio::test]
async fn report_goes_to_resolved_alias_room() {
    let server = MockServer::start().await;
    mount_media(&server, "abcd1234", vec![1, 2, 3]).await;
    mount_score(&server, 0.91).await;
    mount_send(&server).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/_matrix/client/v3/directory/room/.+$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"room_id": "!mods:matrix.org"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = pipeline_against(
        &server,
        ActionConfig {
            ignore_sfw: true,
            redact_nsfw: false,
            direct_reply: false,
            report_to_room: Some("#mods:matrix.org".into()),
        },
    );
    let event = MessageEvent::new("!r:matrix.org", "$e", "@a:x", "m.image", "pic.jpg")
        .with_attachment("mxc://matrix.org/abcd1234");

    let outcome = pipeline.handle_message(&event).await.unwrap();
    assert!(outcome.report.is_some());

    let sends: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().contains("/send/m.room.message/"))
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(sends.len(), 1);
    assert!(sends[0].contains(&urlencoding::encode("!mods:matrix.org").into_owned()));
}

#[tokio::test]
async fn sfw_images_stay_silent_when_ignored() {
    let server = MockServer::start().await;
    mount_media(&server, "kitten", vec![9, 9, 9]).await;
    mount_score(&server, 0.0245).await;

    let pipeline = pipeline_against(
        &server,
        ActionConfig {
            ignore_sfw: true,
            redact_nsfw: true,
            direct_reply: true,
            report_to_room: Some("#mods:matrix.org".into()),
        },
    );
    let event = MessageEvent::new("!r:matrix.org", "$e", "@a:x", "m.text", "cute")
        .with_formatted_body(r#"<img src="mxc://matrix.org/kitten">"#);

    let outcome = pipeline.handle_message(&event).await.unwrap();
    assert!(outcome.report.is_none());

    // Only the download and the scoring call reached the network.
    let paths: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert!(paths.iter().all(|p| p.contains("/media/download/") || p == "/classify"));
}

#[tokio::test]
async fn embedded_batch_renders_readme_example() {
    let server = MockServer::start().await;
    mount_media(&server, "one", b"one".to_vec()).await;
    mount_media(&server, "two", b"two".to_vec()).await;
    mount_send(&server).await;
    // Distinct scores keyed on the posted bytes.
    Mock::given(method("POST"))
        .and(path("/classify"))
        .and(wiremock::matchers::body_bytes(b"one".to_vec()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"score": 0.0245})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/classify"))
        .and(wiremock::matchers::body_bytes(b"two".to_vec()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"score": 0.9482})),
        )
        .mount(&server)
        .await;

    let pipeline = pipeline_against(
        &server,
        ActionConfig {
            ignore_sfw: false,
            redact_nsfw: false,
            direct_reply: true,
            report_to_room: None,
        },
    );
    let event = MessageEvent::new("!r:matrix.org", "$e", "@a:x", "m.text", "two images")
        .with_formatted_body(
            r#"<img src="mxc://matrix.org/one"><img src="mxc://matrix.org/two">"#,
        );

    let outcome = pipeline.handle_message(&event).await.unwrap();
    let report = outcome.report.unwrap();
    assert!(report.starts_with("- mxc://matrix.org/one"));
    assert!(report.contains("appears SFW with score 2.45%"));
    assert!(report.contains("\n- mxc://matrix.org/two"));
    assert!(report.contains("appears NSFW with score 94.82%"));
}
