use serde::{Deserialize, Serialize};

/// Bounds applied while loading models and decoding values.
///
/// Every field has a default, so a partial configuration only overrides
/// what it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Model text larger than this is rejected before parsing.
    pub max_source_bytes: usize,
    /// Maximum nesting depth of a matcher expression. Brackets, calls,
    /// `not`, each field access, and each `and`/`or` in a chain count as
    /// one level.
    pub max_expression_depth: usize,
    /// Maximum nesting of lists, sets and field accesses in a decoded value.
    pub max_value_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_source_bytes: 1024 * 1024,
            max_expression_depth: 64,
            max_value_depth: 32,
        }
    }
}
