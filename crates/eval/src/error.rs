/// Errors raised while announcing facts or enforcing requests.
///
/// A legitimate deny is `Ok(false)`, never one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// The request type is not declared in the loaded model.
    #[error("unknown request type '{name}'")]
    UnknownRequestType { name: String },

    /// The term is not declared in the loaded model.
    #[error("unknown term '{name}'")]
    UnknownTermType { name: String },

    /// Wrong number of request fields, fact values or pattern slots.
    #[error("'{name}' takes {expected} value(s), got {actual}")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// The matcher could not be evaluated: a defect in the model, not a
    /// deny.
    #[error("matcher for '{request_type}' is defective: {message}")]
    Enforcement {
        request_type: String,
        message: String,
    },
}
