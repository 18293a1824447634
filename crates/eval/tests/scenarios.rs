//! End-to-end scenarios over the `Engine` boundary: loading, announcing,
//! enforcing, and the failure paths that must leave state untouched.

use std::collections::BTreeSet;

use acs_core::{LoadError, ValidationError};
use acs_eval::{Answer, DecodeError, Engine, EngineError, EvalError, Value};

const TASKS: &str = "\
[requests]
launch_task = task_id, participants

[terms]
task_creator = task_id, user_id
task_participant = task_id, user_id

[matchers]
launch_task = participants <= task_participant(task_id, _)
";

fn loaded(model: &str) -> Engine {
    let engine = Engine::new();
    engine.setup_model(model).unwrap();
    engine
}

fn with_participants(model: &str) -> Engine {
    let engine = loaded(model);
    engine.announce_fact("task_participant", "['T1', 'A']").unwrap();
    engine.announce_fact("task_participant", "['T1', 'B']").unwrap();
    engine
}

fn participants(engine: &Engine) -> BTreeSet<Vec<Value>> {
    engine
        .with_model(|m| m.facts("task_participant").cloned())
        .unwrap()
        .unwrap()
}

// ──────────────────────────────────────────────
// Launch checks
// ──────────────────────────────────────────────

#[test]
fn participants_must_all_be_announced() {
    let engine = with_participants(TASKS);
    assert!(engine.enforce_request("launch_task", "['T1', {'A', 'B'}]").unwrap());
    assert!(engine.enforce_request("launch_task", "['T1', {'A'}]").unwrap());
    assert!(!engine.enforce_request("launch_task", "['T1', {'A', 'C'}]").unwrap());
    assert!(!engine.enforce_request("launch_task", "['T2', {'A'}]").unwrap());
}

#[test]
fn empty_participants_pass_the_plain_subset_matcher() {
    // The empty set is a subset of every set.
    let engine = with_participants(TASKS);
    assert!(engine.enforce_request("launch_task", "['T1', {}]").unwrap());
    assert!(engine.enforce_request("launch_task", "['T1', set()]").unwrap());
    assert!(engine.enforce_request("launch_task", "['unknown', {}]").unwrap());
}

#[test]
fn empty_participants_fail_when_the_matcher_requires_some() {
    let model = TASKS.replace(
        "launch_task = participants <= task_participant(task_id, _)",
        "launch_task = participants != {} and participants <= task_participant(task_id, _)",
    );
    let engine = with_participants(&model);
    assert!(!engine.enforce_request("launch_task", "['T1', {}]").unwrap());
    assert!(engine.enforce_request("launch_task", "['T1', {'B'}]").unwrap());
    assert!(!engine.enforce_request("launch_task", "['T1', {'C'}]").unwrap());
}

// ──────────────────────────────────────────────
// Load failures
// ──────────────────────────────────────────────

#[test]
fn matcher_for_undeclared_request_type_is_rejected() {
    let engine = with_participants(TASKS);
    let bad = format!("{}ghost = true\n", TASKS);

    let err = engine.setup_model(&bad).unwrap_err();
    assert_eq!(
        err,
        EngineError::Load(LoadError::Validation(ValidationError::UnknownMatchers {
            request_types: vec!["ghost".into()],
        }))
    );
    assert!(err.to_string().contains("ghost"));

    // The previous model and its facts still answer.
    assert!(engine.enforce_request("launch_task", "['T1', {'A', 'B'}]").unwrap());
    assert!(!engine.enforce_request("launch_task", "['T1', {'C'}]").unwrap());
    assert_eq!(participants(&engine).len(), 2);
}

#[test]
fn failed_loads_leave_verdicts_unchanged() {
    let engine = with_participants(TASKS);
    let requests = [
        "['T1', {'A', 'B'}]",
        "['T1', {'A', 'C'}]",
        "['T1', {}]",
        "['T2', {'B'}]",
    ];
    let before: Vec<_> = requests
        .iter()
        .map(|r| engine.enforce_request("launch_task", r))
        .collect();

    let broken = [
        "",
        "[requests]\n",
        "[terms]\n[requests]\n[matchers]\n",
        "[requests]\nlaunch_task = a\n[terms]\n[matchers]\nlaunch_task = (a\n",
        "[requests]\nlaunch_task = a\n[terms]\n[matchers]\n",
        "[requests]\nlaunch_task = a\n[terms]\nlaunch_task = b\n[matchers]\nlaunch_task = a\n",
    ];
    for text in broken {
        assert!(
            matches!(engine.setup_model(text), Err(EngineError::Load(_))),
            "accepted: {:?}",
            text
        );
        let after: Vec<_> = requests
            .iter()
            .map(|r| engine.enforce_request("launch_task", r))
            .collect();
        assert_eq!(before, after);
    }
}

#[test]
fn name_declared_in_two_sections_names_both() {
    let engine = Engine::new();
    let text = "\
[requests]
launch_task = task_id
owner = data
[terms]
owner = data, user_id
[matchers]
launch_task = true
owner = true
";
    let err = engine.setup_model(text).unwrap_err();
    assert_eq!(
        err,
        EngineError::Load(LoadError::Validation(ValidationError::DuplicateIdentifier {
            identifiers: vec!["owner".into()],
            sections: ("[requests]".into(), "[terms]".into()),
        }))
    );
    let message = err.to_string();
    assert!(message.contains("[requests]"));
    assert!(message.contains("[terms]"));
    assert!(!engine.is_loaded());
}

#[test]
fn invalid_matcher_syntax_is_positioned() {
    let engine = Engine::new();
    let text = "\
[requests]
launch_task = task_id, participants
[terms]
task_participant = task_id, user_id
[matchers]
launch_task = participants ) x
";
    match engine.setup_model(text).unwrap_err() {
        EngineError::Load(LoadError::Parse(err)) => {
            assert_eq!(err.line, 6);
            assert_eq!(err.column, 28);
            assert!(err.message.contains("unexpected"), "{}", err.message);
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn long_field_chains_are_rejected_not_overflowed() {
    let engine = with_participants(TASKS);
    let chain = ".y".repeat(50_000);

    let model = TASKS.replace(
        "participants <= task_participant(task_id, _)",
        &format!("participants{} == 1", chain),
    );
    assert!(matches!(
        engine.setup_model(&model),
        Err(EngineError::Load(LoadError::Parse(_)))
    ));

    let content = format!("['T1', x{}]", chain);
    assert!(matches!(
        engine.enforce_request("launch_task", &content),
        Err(EngineError::Decode(DecodeError::Syntax(_)))
    ));
    assert!(matches!(
        engine.announce_fact("task_participant", &content),
        Err(EngineError::Decode(DecodeError::Syntax(_)))
    ));

    // The prior model and its facts are still in place.
    assert!(engine.enforce_request("launch_task", "['T1', {'A', 'B'}]").unwrap());
    assert_eq!(participants(&engine).len(), 2);
}

#[test]
fn oversized_decimal_in_matcher_fails_at_load() {
    let engine = Engine::new();
    let model = TASKS.replace(
        "participants <= task_participant(task_id, _)",
        "participants == 12345678901234567890123456789012345.5",
    );
    match engine.setup_model(&model).unwrap_err() {
        EngineError::Load(LoadError::Parse(err)) => {
            assert_eq!(err.line, 9);
            assert_eq!(err.column, 31);
            assert!(err.message.contains("out of range"), "{}", err.message);
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
}

// ──────────────────────────────────────────────
// Announcements
// ──────────────────────────────────────────────

#[test]
fn wrong_arity_fact_is_rejected_without_effect() {
    let engine = with_participants(TASKS);
    let err = engine.announce_fact("task_participant", "['T1']").unwrap_err();
    assert_eq!(
        err,
        EngineError::Eval(EvalError::ArityMismatch {
            name: "task_participant".into(),
            expected: 2,
            actual: 1,
        })
    );
    assert_eq!(participants(&engine).len(), 2);
    assert_eq!(
        engine.query_pattern("task_participant", "['T1', _]").unwrap(),
        Answer::Matches(vec![Value::str("A"), Value::str("B")])
    );
}

#[test]
fn unknown_term_and_request_type() {
    let engine = loaded(TASKS);
    assert_eq!(
        engine.announce_fact("owner", "['x']").unwrap_err(),
        EngineError::Eval(EvalError::UnknownTermType {
            name: "owner".into()
        })
    );
    assert_eq!(
        engine.enforce_request("delete_task", "['T1']").unwrap_err(),
        EngineError::Eval(EvalError::UnknownRequestType {
            name: "delete_task".into()
        })
    );
    assert_eq!(
        engine.enforce_request("launch_task", "['T1']").unwrap_err(),
        EngineError::Eval(EvalError::ArityMismatch {
            name: "launch_task".into(),
            expected: 2,
            actual: 1,
        })
    );
}

#[test]
fn setup_replaces_model_and_facts() {
    let engine = with_participants(TASKS);
    let open = "[requests]\nlaunch_task = task_id, participants\n[terms]\n[matchers]\nlaunch_task = true\n";
    engine.setup_model(open).unwrap();
    assert!(engine.enforce_request("launch_task", "['T1', {'Z'}]").unwrap());
    assert!(matches!(
        engine.announce_fact("task_participant", "['T1', 'A']"),
        Err(EngineError::Eval(EvalError::UnknownTermType { .. }))
    ));

    engine.setup_model(TASKS).unwrap();
    assert!(participants(&engine).is_empty());
    assert!(!engine.enforce_request("launch_task", "['T1', {'A'}]").unwrap());
}

#[test]
fn engine_shared_across_threads() {
    let engine = std::sync::Arc::new(loaded(TASKS));
    let writers: Vec<_> = (0..4)
        .map(|i| {
            let engine = engine.clone();
            std::thread::spawn(move || {
                for j in 0..25 {
                    let fact = format!("['T1', 'u{}_{}']", i, j);
                    engine.announce_fact("task_participant", &fact).unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }
    assert_eq!(participants(&engine).len(), 100);
    assert!(engine
        .enforce_request("launch_task", "['T1', {'u0_0', 'u3_24'}]")
        .unwrap());
}
