//! End-to-end tests for the execute path: JSON parameter object in,
//! serialized JSON result out, without touching the network.

use serde_json::{json, Value};

use pingsim::error::PingError;
use pingsim::probe::SimProbe;
use pingsim::session::{ExecuteRequest, ExecuteResponse, Session};

fn offline_session() -> Session {
    Session::new(SimProbe::without_lookup())
}

fn run(session: &mut Session, params: Value) -> Result<Value, PingError> {
    let request = ExecuteRequest::from_value(&params)?;
    let response = session.execute(&request)?;
    Ok(serde_json::to_value(response).expect("response serializes"))
}

#[test]
fn single_shot_result_shape() {
    let mut session = offline_session();
    let out = run(&mut session, json!({"host": "example.com", "count": 4})).unwrap();

    assert_eq!(out["host"], "example.com");
    assert_eq!(out["transmitted"], 4);
    assert_eq!(out["received"], 3);
    assert_eq!(out["packetLoss"], 25.0);
    assert_eq!(out["timeMin"], 15.123);
    assert_eq!(out["timeAvg"], 16.345);
    assert_eq!(out["timeMax"], 17.678);
    assert_eq!(out["timeStdDev"], 0.789);
    assert_eq!(out["method"], "simulation (fallback)");
    assert!(out["timestamp"].as_str().unwrap().contains('T'));
    assert!(out["rawOutput"].as_str().unwrap().contains("ping statistics"));

    // No iteration metadata on a single-shot call, and no warning when
    // lookup is skipped.
    assert!(out.get("iterationCount").is_none());
    assert!(out.get("iteration_data").is_none());
    assert!(out.get("warning").is_none());
}

#[test]
fn missing_count_defaults_to_four() {
    let mut session = offline_session();
    let out = run(&mut session, json!({"host": "example.com"})).unwrap();

    assert_eq!(out["transmitted"], 4);
    assert_eq!(out["received"], 3);
}

#[test]
fn empty_host_fails_cleanly() {
    let mut session = offline_session();
    let err = run(&mut session, json!({"host": "", "count": 4})).unwrap_err();
    assert!(matches!(err, PingError::InvalidArgument(_)));
}

#[test]
fn missing_host_fails_cleanly() {
    let mut session = offline_session();
    let err = run(&mut session, json!({"count": 4})).unwrap_err();
    assert!(matches!(err, PingError::MissingField(_)));
}

#[test]
fn three_iterations_accumulate_history() {
    let mut session = offline_session();
    let params = json!({"host": "example.com", "count": 4, "continueToIterate": true});

    let first = run(&mut session, params.clone()).unwrap();
    assert_eq!(first["iterationCount"], 1);
    assert!(first.get("history").is_none());

    run(&mut session, params.clone()).unwrap();
    let third = run(&mut session, params).unwrap();

    assert_eq!(third["iterationCount"], 3);
    assert!(third["elapsedTime"].as_str().is_some());
    assert_eq!(third["iteration_data"]["can_iterate"], true);
    assert_eq!(third["iteration_data"]["supports_iteration"], true);
    assert!(third["iteration_data"]["iteration_summary"]
        .as_str()
        .unwrap()
        .contains("Iteration 3: example.com"));

    let history = third["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["iteration"], 1);
    assert_eq!(history[1]["iteration"], 2);
    assert_eq!(history[0]["host"], "example.com");
    assert_eq!(history[0]["packetLoss"], 25.0);
    assert_eq!(history[0]["timeAvg"], 16.345);
    assert_eq!(history[1]["timeAvg"], 17.345);
}

#[test]
fn iteration_values_drift_per_call() {
    let mut session = offline_session();
    let params = json!({"host": "example.com", "continueToIterate": true});

    let first = run(&mut session, params.clone()).unwrap();
    let second = run(&mut session, params).unwrap();

    assert_eq!(first["timeAvg"], 16.345);
    assert_eq!(second["timeAvg"], 17.345);
}

#[test]
fn single_shot_does_not_grow_session() {
    let mut session = offline_session();
    let params = json!({"host": "example.com", "count": 4});

    run(&mut session, params.clone()).unwrap();
    run(&mut session, params).unwrap();

    assert_eq!(session.iterations(), 0);
    assert!(session.history().is_empty());
}

#[test]
fn typed_request_survives_reuse() {
    // One parsed request drives both modes without revalidation.
    let request = ExecuteRequest::from_value(&json!({"host": "example.com", "count": 8})).unwrap();
    let mut session = offline_session();

    match session.execute(&request).unwrap() {
        ExecuteResponse::Single(m) => {
            assert_eq!(m.transmitted, 8);
            assert_eq!(m.received, 7);
        }
        _ => panic!("expected single-shot result"),
    }
}
