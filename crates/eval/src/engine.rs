//! The embedding boundary: an explicit engine handle with an
//! `Unloaded | Loaded` state machine.
//!
//! Setup and announcements take the write lock; enforcement and queries
//! take the read lock, so every enforcement sees an untorn snapshot.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use acs_core::{Limits, LoadError};
use serde::{Deserialize, Serialize};

use crate::decode::{decode_pattern, decode_value_list, DecodeError};
use crate::error::EvalError;
use crate::knowledge::{Answer, Fact, Slot};
use crate::model::Model;
use crate::value::Value;

/// Engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub limits: Limits,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("no model is loaded")]
    NotLoaded,

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Debug)]
enum EngineState {
    Unloaded,
    Loaded(Model),
}

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    state: RwLock<EngineState>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Engine {
            config,
            state: RwLock::new(EngineState::Unloaded),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // State is only replaced wholesale or extended by validated set
    // insertion, so a panic elsewhere cannot leave it torn.
    fn read(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.read(), EngineState::Loaded(_))
    }

    /// Run `f` against the loaded model under the read lock.
    pub fn with_model<R>(&self, f: impl FnOnce(&Model) -> R) -> Result<R, EngineError> {
        match &*self.read() {
            EngineState::Loaded(model) => Ok(f(model)),
            EngineState::Unloaded => Err(EngineError::NotLoaded),
        }
    }

    fn with_model_mut<R>(&self, f: impl FnOnce(&mut Model) -> R) -> Result<R, EngineError> {
        match &mut *self.write() {
            EngineState::Loaded(model) => Ok(f(model)),
            EngineState::Unloaded => Err(EngineError::NotLoaded),
        }
    }

    /// Load a model, replacing any current one and its facts. On failure
    /// the current model stays active.
    pub fn setup_model(&self, text: &str) -> Result<(), EngineError> {
        let model = Model::load(text, &self.config.limits).map_err(|err| {
            tracing::warn!(error = %err, "model rejected");
            err
        })?;
        *self.write() = EngineState::Loaded(model);
        Ok(())
    }

    /// Decide a request whose content is a serialized value list.
    pub fn enforce_request(&self, request_type: &str, content: &str) -> Result<bool, EngineError> {
        let values = decode_value_list(content, self.config.limits.max_value_depth)?;
        self.enforce(request_type, &values)
    }

    /// Announce a fact given as a serialized value list. Returns whether it
    /// was new.
    pub fn announce_fact(&self, term: &str, fact: &str) -> Result<bool, EngineError> {
        let values = decode_value_list(fact, self.config.limits.max_value_depth)?;
        self.add_fact(term, values)
    }

    pub fn enforce(&self, request_type: &str, values: &[Value]) -> Result<bool, EngineError> {
        Ok(self.with_model(|model| model.enforce(request_type, values))??)
    }

    pub fn add_fact(&self, term: &str, fact: Fact) -> Result<bool, EngineError> {
        Ok(self.with_model_mut(|model| model.add_fact(term, fact))??)
    }

    pub fn add_facts(&self, term: &str, facts: Vec<Fact>) -> Result<usize, EngineError> {
        Ok(self.with_model_mut(|model| model.add_facts(term, facts))??)
    }

    /// Run a pattern query, collecting the matches.
    pub fn query(&self, term: &str, pattern: &[Slot]) -> Result<Answer<Vec<Value>>, EngineError> {
        let answer = self.with_model(|model| {
            model.ask(term, pattern).map(|answer| match answer {
                Answer::Holds(found) => Answer::Holds(found),
                Answer::Matches(result) => Answer::Matches(result.collect()),
            })
        })??;
        Ok(answer)
    }

    /// [`Engine::query`] with a serialized pattern such as `['T1', _]`.
    pub fn query_pattern(&self, term: &str, pattern: &str) -> Result<Answer<Vec<Value>>, EngineError> {
        let slots = decode_pattern(pattern, self.config.limits.max_value_depth)?;
        self.query(term, &slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "\
[requests]
launch_task = task_id, participants

[terms]
task_participant = task_id, user_id

[matchers]
launch_task = participants <= task_participant(task_id, _)
";

    #[test]
    fn operations_need_a_model() {
        let engine = Engine::new();
        assert!(!engine.is_loaded());
        assert_eq!(
            engine.enforce_request("launch_task", "['T1', {}]"),
            Err(EngineError::NotLoaded)
        );
        assert_eq!(
            engine.announce_fact("task_participant", "['T1', 'A']"),
            Err(EngineError::NotLoaded)
        );
        assert!(matches!(
            engine.query_pattern("task_participant", "[_, _]"),
            Err(EngineError::NotLoaded)
        ));
    }

    #[test]
    fn setup_announce_enforce() {
        let engine = Engine::new();
        engine.setup_model(MODEL).unwrap();
        assert!(engine.is_loaded());
        assert!(engine.announce_fact("task_participant", "['T1', 'A']").unwrap());
        assert!(!engine.announce_fact("task_participant", "['T1', 'A']").unwrap());
        assert!(engine.enforce_request("launch_task", "['T1', {'A'}]").unwrap());
        assert!(!engine.enforce_request("launch_task", "['T1', {'B'}]").unwrap());
    }

    #[test]
    fn reload_starts_with_no_facts() {
        let engine = Engine::new();
        engine.setup_model(MODEL).unwrap();
        engine.announce_fact("task_participant", "['T1', 'A']").unwrap();
        engine.setup_model(MODEL).unwrap();
        let count = engine
            .with_model(|m| m.facts("task_participant").map(|f| f.len()))
            .unwrap()
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn decode_errors_are_typed() {
        let engine = Engine::new();
        engine.setup_model(MODEL).unwrap();
        assert!(matches!(
            engine.enforce_request("launch_task", "['T1', "),
            Err(EngineError::Decode(DecodeError::Syntax(_)))
        ));
    }

    #[test]
    fn query_collects_matches() {
        let engine = Engine::new();
        engine.setup_model(MODEL).unwrap();
        engine
            .add_facts(
                "task_participant",
                vec![
                    vec![Value::str("T1"), Value::str("A")],
                    vec![Value::str("T1"), Value::str("B")],
                ],
            )
            .unwrap();
        assert_eq!(
            engine.query_pattern("task_participant", "['T1', _]").unwrap(),
            Answer::Matches(vec![Value::str("A"), Value::str("B")])
        );
        assert_eq!(
            engine.query_pattern("task_participant", "[X, 'B']").unwrap(),
            Answer::Holds(true)
        );
    }

    #[test]
    fn value_depth_limit_applies_to_decoding() {
        let engine = Engine::with_config(EngineConfig {
            limits: Limits {
                max_value_depth: 2,
                ..Limits::default()
            },
        });
        engine.setup_model(MODEL).unwrap();
        assert!(engine
            .enforce_request("launch_task", "['T1', {'A'}]")
            .is_ok());
        assert!(matches!(
            engine.announce_fact("task_participant", "['T1', [['A']]]"),
            Err(EngineError::Decode(_))
        ));
    }

    #[test]
    fn engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }
}
