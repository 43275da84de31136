mod common;

use checkbot_core::agent::{MoveAgent, PredictRequest};
use checkbot_core::provider::ProviderOptions;
use checkbot_core::recorder::{OutcomeFact, OutcomeRecorder, SqliteOutcomeRecorder};
use checkbot_core::registry::ProviderRegistry;
use checkbot_core::tools::movement::SuggestedMove;
use common::MockUpstream;
use reqwest::Client;
use serde_json::json;

fn board() -> serde_json::Value {
    json!({
        "currentPlayer": "red",
        "gamePhase": "opening",
        "turnNumber": 1,
        "availableMoves": [
            {"from": {"notation": "C3"}, "to": {"notation": "D4"}},
            {"from": {"notation": "E3"}, "to": {"notation": "F4"}}
        ]
    })
}

#[tokio::test]
async fn test_predict_execute_record_cycle() {
    let mock = MockUpstream::start(|_, _| {
        (
            200,
            json!({
                "choices": [{
                    "message": {
                        "content": "D4 takes the center; F4 is a fine alternative.",
                        "tool_calls": [
                            {"id": "call_1", "type": "function",
                             "function": {"name": "move", "arguments": "{\"from_position\":\"C3\",\"to_position\":\"D4\"}"}},
                            {"id": "call_2", "type": "function",
                             "function": {"name": "move", "arguments": "{\"from_position\":\"E3\",\"to_position\":\"F4\"}"}}
                        ]
                    },
                    "finish_reason": "tool_calls"
                }]
            }),
        )
    })
    .await;

    let registry = ProviderRegistry::with_builtins(Client::new());
    let agent = MoveAgent::new(&registry);

    let mut request = PredictRequest::new("openai", board());
    request.credential = Some("sk-test".into());
    request.options = ProviderOptions {
        api_base: Some(mock.base_url.clone()),
        ..Default::default()
    };

    let prediction = agent.predict_move(request).await.unwrap();

    // The rendered board reached the provider.
    let sent = &mock.requests()[0].body;
    let prompt = sent["messages"][1]["content"].as_str().unwrap();
    assert!(prompt.contains("  • C3 → D4"));
    assert_eq!(sent["model"], "gpt-4o-mini");

    assert_eq!(prediction.provider, "openai");
    assert_eq!(prediction.tool_calls.len(), 2);
    assert_eq!(prediction.tool_results.len(), 2);
    assert!(prediction.tool_results.iter().all(|r| r.is_success()));
    assert_eq!(
        prediction.suggested_move,
        Some(SuggestedMove { from: "C3".into(), to: "D4".into() })
    );

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("data").join("outcomes.db");
    let recorder = SqliteOutcomeRecorder::new(&db).unwrap();

    let mut fact = OutcomeFact::new("game-42", "red", "ai", "no_pieces");
    fact.provider = Some(prediction.provider.clone());
    fact.model = Some(prediction.model.clone());
    fact.move_count = Some(37);
    assert!(recorder.record_once(&fact).unwrap());
    drop(recorder);

    // A fresh handle on the same file sees the fact and refuses a rewrite.
    let reopened = SqliteOutcomeRecorder::new(&db).unwrap();
    let stored = reopened.get("game-42").unwrap().unwrap();
    assert_eq!(stored.model.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(stored.move_count, Some(37));

    let rewrite = OutcomeFact::new("game-42", "white", "human", "resign");
    assert!(!reopened.record_once(&rewrite).unwrap());
    assert_eq!(reopened.get("game-42").unwrap().unwrap().winner, "red");
}

#[test]
fn test_concurrent_writers_on_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("outcomes.db");
    // Create the schema before the race.
    SqliteOutcomeRecorder::new(&db).unwrap();

    let handles: Vec<_> = ["red", "white"]
        .into_iter()
        .map(|winner| {
            let db = db.clone();
            std::thread::spawn(move || {
                let recorder = SqliteOutcomeRecorder::new(&db).unwrap();
                let fact = OutcomeFact::new("g1", winner, "ai", "no_moves");
                (winner, recorder.record_once(&fact).unwrap())
            })
        })
        .collect();

    let results: Vec<(&str, bool)> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<&str> = results.iter().filter(|(_, ok)| *ok).map(|(w, _)| *w).collect();
    assert_eq!(winners.len(), 1);

    let recorder = SqliteOutcomeRecorder::new(&db).unwrap();
    assert_eq!(recorder.get("g1").unwrap().unwrap().winner, winners[0]);
}
