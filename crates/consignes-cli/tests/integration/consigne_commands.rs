//! `consignes consigne ...` through the command-line entry point.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{TestHarness, consigne_json, ok};

async fn serve_list(harness: &TestHarness) {
    Mock::given(method("GET"))
        .and(query_param("action", "consignes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!([
            consigne_json("c-1", "Méditer", "Esprit"),
            consigne_json("c-2", "Courir", "Santé"),
        ]))))
        .mount(&harness.server)
        .await;
}

#[tokio::test]
async fn test_add_posts_draft() {
    let harness = TestHarness::new().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "action": "create_consigne",
            "consigne": {
                "label": "Instrument",
                "category": "Musique",
                "kind": { "type": "choice", "options": ["piano", "guitare"] },
                "frequency": { "type": "weekdays", "days": ["Mon", "Thu"] },
                "priority": 1
            }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok(consigne_json("c-9", "Instrument", "Musique"))),
        )
        .expect(1)
        .mount(&harness.server)
        .await;

    harness
        .run(&[
            "consigne", "add", "--label", "Instrument", "--category", "Musique", "--kind",
            "choice", "--options", "piano,guitare", "--frequency", "weekdays:mon,thu",
            "--priority", "1",
        ])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_add_invalid_never_reaches_backend() {
    let harness = TestHarness::new().await;

    let err = harness
        .run(&["consigne", "add", "--label", " ", "--category", "Esprit"])
        .await
        .unwrap_err();

    assert!(err.to_string().contains("must not be empty"));
    assert!(harness.posted_bodies().await.is_empty());
}

#[tokio::test]
async fn test_edit_merges_with_current_fields() {
    let harness = TestHarness::new().await;
    serve_list(&harness).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "update_consigne", "id": "c-2" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(ok(consigne_json("c-2", "Courir", "Santé"))),
        )
        .expect(1)
        .mount(&harness.server)
        .await;

    harness
        .run(&["consigne", "edit", "c-2", "--priority", "3", "--active", "false"])
        .await
        .unwrap();

    let bodies = harness.posted_bodies().await;
    let consigne = &bodies[0]["consigne"];
    assert_eq!(consigne["label"], "Courir");
    assert_eq!(consigne["category"], "Santé");
    assert_eq!(consigne["priority"], 3);
    assert_eq!(consigne["active"], false);
}

#[tokio::test]
async fn test_edit_unknown_consigne() {
    let harness = TestHarness::new().await;
    serve_list(&harness).await;

    let err = harness
        .run(&["consigne", "edit", "c-404", "--label", "Lire"])
        .await
        .unwrap_err();

    assert!(err.to_string().contains("c-404"));
    assert!(harness.posted_bodies().await.is_empty());
}

#[tokio::test]
async fn test_rm_and_list() {
    let harness = TestHarness::new().await;
    serve_list(&harness).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": "delete_consigne", "id": "c-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!({ "id": "c-1" }))))
        .expect(1)
        .mount(&harness.server)
        .await;

    harness.run(&["consigne", "rm", "c-1"]).await.unwrap();
    harness
        .run(&["consigne", "list", "--category", "esprit"])
        .await
        .unwrap();
    harness.run(&["consigne", "categories"]).await.unwrap();
}

#[tokio::test]
async fn test_config_commands_need_no_backend() {
    let harness = TestHarness::new().await;

    harness
        .run(&["config", "set", "autosave.debounce_ms", "900"])
        .await
        .unwrap();

    let content = std::fs::read_to_string(&harness.config_path).unwrap();
    assert!(content.contains("debounce_ms = 900"));
    assert!(harness.server.received_requests().await.unwrap().is_empty());
}
