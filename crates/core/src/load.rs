//! Model loading: text -> validated [`Policy`].
//!
//! A thin orchestrator over the stages: size check, preprocessing and
//! grammar, then structural validation.

use crate::error::LoadError;
use crate::grammar;
use crate::limits::Limits;
use crate::validate::{self, Policy};

/// Load model text, returning the validated policy or the first error.
pub fn load_policy(source: &str, limits: &Limits) -> Result<Policy, LoadError> {
    if source.len() > limits.max_source_bytes {
        return Err(LoadError::SourceTooLarge {
            size: source.len(),
            limit: limits.max_source_bytes,
        });
    }

    // Preprocessing + grammar
    let raw = grammar::parse_model(source, limits)?;

    // Declarations, fields and matcher coverage
    let policy = validate::validate(raw)?;
    Ok(policy)
}
