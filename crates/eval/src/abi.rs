//! Integer status codes over [`Engine`] for hosts that cannot carry typed
//! errors across the boundary.
//!
//! Success is `0` (for enforcement, `1` allow and `0` deny). Every error
//! class maps to its own negative code.

use acs_core::LoadError;

use crate::engine::{Engine, EngineError};
use crate::error::EvalError;

pub const STATUS_OK: i32 = 0;
pub const STATUS_ALLOW: i32 = 1;
pub const STATUS_DENY: i32 = 0;
pub const STATUS_PARSE_ERROR: i32 = -1;
pub const STATUS_VALIDATION_ERROR: i32 = -2;
pub const STATUS_UNKNOWN_NAME: i32 = -3;
pub const STATUS_ARITY_MISMATCH: i32 = -4;
pub const STATUS_ENFORCEMENT_DEFECT: i32 = -5;
pub const STATUS_DECODE_ERROR: i32 = -6;
pub const STATUS_NOT_LOADED: i32 = -7;
pub const STATUS_RESOURCE_LIMIT: i32 = -8;

pub fn status_of(err: &EngineError) -> i32 {
    match err {
        EngineError::NotLoaded => STATUS_NOT_LOADED,
        EngineError::Load(LoadError::SourceTooLarge { .. }) => STATUS_RESOURCE_LIMIT,
        EngineError::Load(LoadError::Parse(_)) => STATUS_PARSE_ERROR,
        EngineError::Load(LoadError::Validation(_)) => STATUS_VALIDATION_ERROR,
        EngineError::Eval(EvalError::UnknownRequestType { .. })
        | EngineError::Eval(EvalError::UnknownTermType { .. }) => STATUS_UNKNOWN_NAME,
        EngineError::Eval(EvalError::ArityMismatch { .. }) => STATUS_ARITY_MISMATCH,
        EngineError::Eval(EvalError::Enforcement { .. }) => STATUS_ENFORCEMENT_DEFECT,
        EngineError::Decode(_) => STATUS_DECODE_ERROR,
    }
}

fn status<T>(result: Result<T, EngineError>, ok: impl FnOnce(T) -> i32) -> i32 {
    match result {
        Ok(value) => ok(value),
        Err(err) => status_of(&err),
    }
}

pub fn acs_setup_model(engine: &Engine, text: &str) -> i32 {
    status(engine.setup_model(text), |()| STATUS_OK)
}

pub fn acs_enforce_request(engine: &Engine, request_type: &str, content: &str) -> i32 {
    status(engine.enforce_request(request_type, content), |allowed| {
        if allowed {
            STATUS_ALLOW
        } else {
            STATUS_DENY
        }
    })
}

/// Duplicates are not errors, so a repeated announcement is also `0`.
pub fn acs_announce_fact(engine: &Engine, term: &str, fact: &str) -> i32 {
    status(engine.announce_fact(term, fact), |_| STATUS_OK)
}
