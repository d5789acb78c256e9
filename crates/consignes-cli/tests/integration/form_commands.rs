//! `consignes form ...` against a mock backend.

use chrono::NaiveDate;
use consignes_cli::Error;
use consignes_cli::commands::{api_client, form};
use consignes_core::FormKey;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{EXEC_PATH, TestHarness, daily_form, failure, ok};

fn monday() -> FormKey {
    FormKey::daily(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap())
}

async fn serve_form(harness: &TestHarness, mood: Option<&str>) {
    Mock::given(method("GET"))
        .and(path(EXEC_PATH))
        .and(query_param("token", "cli-token"))
        .and(query_param("action", "form"))
        .respond_with(ResponseTemplate::new(200).set_body_json(daily_form(mood)))
        .mount(&harness.server)
        .await;
}

async fn accept(harness: &TestHarness, action: &str) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "action": action })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!({ "saved": 2 }))))
        .mount(&harness.server)
        .await;
}

async fn answer(harness: &TestHarness, answers: &[&str], submit: bool) -> consignes_cli::Result<String> {
    let client = api_client(&harness.config).unwrap();
    let answers: Vec<String> = answers.iter().map(|a| a.to_string()).collect();
    form::answer(&harness.config, client, monday(), &answers, submit).await
}

#[tokio::test]
async fn test_answer_saves_only_changed_fields() {
    let harness = TestHarness::new().await;
    serve_form(&harness, None).await;
    accept(&harness, "save_answers").await;

    let summary = answer(&harness, &["q-mood=2", "q-sleep=oui"], false).await.unwrap();

    assert_eq!(summary, "1 réponse(s) enregistrée(s).");
    let bodies = harness.posted_bodies().await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["action"], "save_answers");
    assert_eq!(bodies[0]["date"], "2026-10-19");
    assert_eq!(bodies[0]["mode"], "daily");
    assert_eq!(bodies[0]["answers"], json!({ "q-mood": "plutot_oui" }));
}

#[tokio::test]
async fn test_answer_clears_with_empty_value() {
    let harness = TestHarness::new().await;
    serve_form(&harness, Some("oui")).await;
    accept(&harness, "save_answers").await;

    answer(&harness, &["q-sleep="], false).await.unwrap();

    let bodies = harness.posted_bodies().await;
    assert_eq!(bodies[0]["answers"], json!({ "q-sleep": null }));
}

#[tokio::test]
async fn test_answer_unchanged_posts_nothing() {
    let harness = TestHarness::new().await;
    serve_form(&harness, Some("moyen")).await;

    let summary = answer(&harness, &["q-mood=moyen"], false).await.unwrap();

    assert_eq!(summary, "0 réponse(s) enregistrée(s).");
    assert!(harness.posted_bodies().await.is_empty());
}

#[tokio::test]
async fn test_submit_refused_while_required_missing() {
    let harness = TestHarness::new().await;
    serve_form(&harness, None).await;
    accept(&harness, "save_answers").await;

    let err = answer(&harness, &["q-sleep=non"], true).await.unwrap_err();

    let Error::Incomplete { labels } = err else {
        unreachable!("expected an incomplete form error")
    };
    assert_eq!(labels, vec!["Humeur"]);
    let bodies = harness.posted_bodies().await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["action"], "save_answers");
}

#[tokio::test]
async fn test_submit_sends_every_answer() {
    let harness = TestHarness::new().await;
    serve_form(&harness, None).await;
    accept(&harness, "save_answers").await;
    accept(&harness, "submit_answers").await;

    let summary = answer(&harness, &["q-mood=1"], true).await.unwrap();

    assert!(summary.contains("formulaire envoyé"));
    let bodies = harness.posted_bodies().await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[1]["action"], "submit_answers");
    assert_eq!(
        bodies[1]["answers"],
        json!({ "q-mood": "oui", "q-sleep": true })
    );
}

#[tokio::test]
async fn test_unknown_question_is_rejected_before_saving() {
    let harness = TestHarness::new().await;
    serve_form(&harness, None).await;

    let err = answer(&harness, &["q-mood=1", "q-nope=3"], false).await.unwrap_err();

    assert!(err.to_string().contains("q-nope"));
    assert!(harness.posted_bodies().await.is_empty());
}

#[tokio::test]
async fn test_backend_failure_surfaces() {
    let harness = TestHarness::new().await;
    serve_form(&harness, None).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(failure("sheet is protected")))
        .expect(1)
        .mount(&harness.server)
        .await;

    let err = answer(&harness, &["q-mood=3"], false).await.unwrap_err();

    assert!(err.to_string().contains("sheet is protected"));
}

#[tokio::test]
async fn test_cli_answer_and_week() {
    let harness = TestHarness::new().await;
    Mock::given(method("GET"))
        .and(query_param("action", "form"))
        .and(query_param("mode", "daily"))
        .respond_with(ResponseTemplate::new(200).set_body_json(daily_form(None)))
        .expect(8)
        .mount(&harness.server)
        .await;
    accept(&harness, "save_answers").await;

    harness
        .run(&["form", "answer", "--date", "2026-10-21", "q-mood=oui"])
        .await
        .unwrap();
    harness
        .run(&["form", "week", "--date", "2026-10-21"])
        .await
        .unwrap();

    let requests = harness.server.received_requests().await.unwrap();
    let dates: Vec<String> = requests
        .iter()
        .filter(|r| r.method.as_str() == "GET")
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "date")
                .map(|(_, v)| v.into_owned())
        })
        .collect();
    assert_eq!(dates[0], "2026-10-21");
    assert_eq!(dates[1], "2026-10-19");
    assert_eq!(dates[7], "2026-10-25");
}
