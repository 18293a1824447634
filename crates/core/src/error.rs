use serde::{Deserialize, Serialize};

/// Lines longer than this are windowed around the error column when
/// rendering a snippet.
const SNIPPET_WIDTH: usize = 80;

/// A positioned syntax error in model text or in a serialized value list.
///
/// `line` and `column` are 1-based and count characters; `offset` is the
/// byte offset into the (preprocessed) text. `snippet` holds the offending
/// source line with a caret under the column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (line {line}, column {column})")]
pub struct ParseError {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
    pub message: String,
    pub snippet: String,
}

impl ParseError {
    /// Build an error for `offset` in `text`, rendering the snippet.
    pub fn at(text: &str, offset: usize, message: impl Into<String>) -> Self {
        let offset = floor_char_boundary(text, offset.min(text.len()));
        let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
        let line_end = text[offset..]
            .find('\n')
            .map_or(text.len(), |i| offset + i);
        let line = text[..line_start].matches('\n').count() as u32 + 1;
        let column_chars = text[line_start..offset].chars().count();

        let line_text: Vec<char> = text[line_start..line_end].chars().collect();
        let (window_start, window_end) = if line_text.len() > SNIPPET_WIDTH {
            let start = column_chars.saturating_sub(SNIPPET_WIDTH / 2);
            (start, (start + SNIPPET_WIDTH).min(line_text.len()))
        } else {
            (0, line_text.len())
        };
        let shown: String = line_text[window_start..window_end].iter().collect();
        let snippet = format!(
            "{}\n{}^\nerror at character {}",
            shown,
            " ".repeat(column_chars - window_start),
            offset
        );

        ParseError {
            line,
            column: column_chars as u32 + 1,
            offset,
            message: message.into(),
            snippet,
        }
    }

    /// Multi-line rendering: message, then the snippet.
    pub fn render(&self) -> String {
        format!("{}\n{}", self, self.snippet)
    }

    /// Serialize to a JSON value for machine-readable diagnostics.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "column":  self.column,
            "line":    self.line,
            "message": self.message,
            "offset":  self.offset,
            "snippet": self.snippet,
        })
    }
}

fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// A model that parsed but violates a structural invariant.
///
/// Every variant lists all offending identifiers (sorted), so a model
/// author can fix every problem of that kind in one pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("identifier(s) {} declared more than once in section {section}", .identifiers.join(", "))]
    DuplicateInSection {
        section: String,
        identifiers: Vec<String>,
    },

    #[error(
        "multiple definition(s) of identifier(s) {} found in sections {} and {}",
        .identifiers.join(", "), .sections.0, .sections.1
    )]
    DuplicateIdentifier {
        identifiers: Vec<String>,
        sections: (String, String),
    },

    #[error("reserved name(s) {} cannot be declared", .identifiers.join(", "))]
    ReservedIdentifier { identifiers: Vec<String> },

    #[error("field(s) {} repeated in declaration of '{declaration}'", .fields.join(", "))]
    DuplicateField {
        declaration: String,
        fields: Vec<String>,
    },

    #[error(
        "field(s) {} of request type '{request_type}' shadow declared term(s)",
        .fields.join(", ")
    )]
    FieldShadowsTerm {
        request_type: String,
        fields: Vec<String>,
    },

    #[error("more than one matcher for request type(s): {}", .request_types.join(", "))]
    DuplicateMatcher { request_types: Vec<String> },

    #[error("missing matcher(s) for request type(s): {}", .request_types.join(", "))]
    MissingMatchers { request_types: Vec<String> },

    #[error("matcher(s) defined for unknown request type(s): {}", .request_types.join(", "))]
    UnknownMatchers { request_types: Vec<String> },
}

/// Any failure while turning model text into a validated policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("model text is {size} bytes, limit is {limit}")]
    SourceTooLarge { size: usize, limit: usize },

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("invalid model: {0}")]
    Validation(#[from] ValidationError),
}
