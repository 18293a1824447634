//! Facts files for the `enforce` and `query` subcommands.
//!
//! Two formats are accepted. A JSON object maps term names to arrays of
//! facts:
//!
//! ```json
//! { "task_participant": [["T1", "alice"], ["T1", "bob"]] }
//! ```
//!
//! A file with the `.facts` extension holds one fact per line in the
//! value-list syntax, with `#` comments:
//!
//! ```text
//! task_participant = ['T1', 'alice']
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use acs_eval::{decode_value_list, DecodeError, Engine, EngineError, Fact, Value};

#[derive(Debug, thiserror::Error)]
pub(crate) enum FactsError {
    #[error("error reading facts file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in '{}': {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{}: {message}", .path.display())]
    Shape { path: PathBuf, message: String },

    #[error("{}:{line}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        line: usize,
        source: DecodeError,
    },

    #[error("{}: term '{term}': {source}", .path.display())]
    Rejected {
        path: PathBuf,
        term: String,
        source: EngineError,
    },
}

/// Facts grouped by term, in file order within each term.
pub(crate) type FactTable = BTreeMap<String, Vec<Fact>>;

pub(crate) fn read_facts(path: &Path, max_depth: usize) -> Result<FactTable, FactsError> {
    let text = std::fs::read_to_string(path).map_err(|source| FactsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if path.extension().is_some_and(|ext| ext == "facts") {
        parse_fact_lines(path, &text, max_depth)
    } else {
        parse_fact_json(path, &text)
    }
}

/// Announce every fact in `path`. Returns the number of new facts.
pub(crate) fn announce_file(
    engine: &Engine,
    path: &Path,
) -> Result<usize, FactsError> {
    let table = read_facts(path, engine.config().limits.max_value_depth)?;
    let mut added = 0;
    for (term, facts) in table {
        added += engine
            .add_facts(&term, facts)
            .map_err(|source| FactsError::Rejected {
                path: path.to_path_buf(),
                term: term.clone(),
                source,
            })?;
    }
    tracing::debug!(path = %path.display(), added, "facts file announced");
    Ok(added)
}

fn parse_fact_lines(path: &Path, text: &str, max_depth: usize) -> Result<FactTable, FactsError> {
    let mut table = FactTable::new();
    for (index, raw) in text.lines().enumerate() {
        let line = acs_core::preprocess(raw);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (term, fact) = line.split_once('=').ok_or_else(|| FactsError::Shape {
            path: path.to_path_buf(),
            message: format!("line {}: expected `term = [values]`", index + 1),
        })?;
        let values = decode_value_list(fact.trim(), max_depth).map_err(|source| {
            FactsError::Decode {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            }
        })?;
        table.entry(term.trim().to_string()).or_default().push(values);
    }
    Ok(table)
}

fn parse_fact_json(path: &Path, text: &str) -> Result<FactTable, FactsError> {
    let shape = |message: String| FactsError::Shape {
        path: path.to_path_buf(),
        message,
    };
    let doc: serde_json::Value = serde_json::from_str(text).map_err(|source| FactsError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let terms = doc
        .as_object()
        .ok_or_else(|| shape("facts must be a JSON object of term names".to_string()))?;

    let mut table = FactTable::new();
    for (term, facts) in terms {
        let facts = facts
            .as_array()
            .ok_or_else(|| shape(format!("facts for '{}' must be an array", term)))?;
        let mut decoded = Vec::with_capacity(facts.len());
        for (i, fact) in facts.iter().enumerate() {
            let items = fact
                .as_array()
                .ok_or_else(|| shape(format!("{}[{}] must be an array of values", term, i)))?;
            let values = items
                .iter()
                .map(Value::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| shape(format!("{}[{}]: {}", term, i, e)))?;
            decoded.push(values);
        }
        table.insert(term.clone(), decoded);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fact_lines_skip_comments_and_blanks() {
        let text = "\
# owners
data_owner = ['d1', 'alice']   # first

data_owner = ('d2', 'bob')
is_public = ['d2']
";
        let table = parse_fact_lines(Path::new("x.facts"), text, 32).unwrap();
        assert_eq!(table["data_owner"].len(), 2);
        assert_eq!(table["is_public"], vec![vec![Value::str("d2")]]);
    }

    #[test]
    fn fact_line_errors_carry_line_numbers() {
        let err = parse_fact_lines(Path::new("x.facts"), "\nt = ['a'\n", 32).unwrap_err();
        assert!(matches!(err, FactsError::Decode { line: 2, .. }));
        let err = parse_fact_lines(Path::new("x.facts"), "t ['a']\n", 32).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn json_facts() {
        let text = r#"{"budget": [["alice", 10, "2.5"], ["bob", null, true]]}"#;
        let table = parse_fact_json(Path::new("f.json"), text).unwrap();
        assert_eq!(
            table["budget"][1],
            vec![Value::str("bob"), Value::Null, Value::Bool(true)]
        );
    }

    #[test]
    fn json_shape_errors() {
        for text in [r#"[]"#, r#"{"t": "a"}"#, r#"{"t": ["a"]}"#, r#"{"t": [[{"k": 1}]]}"#] {
            let err = parse_fact_json(Path::new("f.json"), text).unwrap_err();
            assert!(matches!(err, FactsError::Shape { .. }), "{}", text);
        }
    }
}
